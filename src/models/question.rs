use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 6;

/// Quem pode sortear a questão para um quiz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

/// Questão de múltipla escolha (armazenada no MongoDB)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// user_id do professor autor
    pub created_by: String,

    /// Tema (ex: "Frações", "Sistema Solar")
    pub theme: String,

    /// Enunciado
    pub text: String,

    /// Alternativas, na ordem exibida
    pub options: Vec<String>,

    /// Índice da alternativa correta em `options`
    pub correct_index: i32,

    #[serde(default)]
    pub visibility: Visibility,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub explanation: Option<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Question {
    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }

    /// Pública, do próprio usuário, ou privada de um professor vinculado ao aluno
    pub fn is_visible_to(&self, viewer_id: &str, linked_teacher_ids: &[String]) -> bool {
        self.created_by == viewer_id
            || self.visibility == Visibility::Public
            || linked_teacher_ids.iter().any(|t| *t == self.created_by)
    }

    /// Aplica um update parcial e valida o resultado
    pub fn apply_update(&mut self, update: UpdateQuestionRequest) -> Result<(), AppError> {
        if let Some(theme) = update.theme {
            self.theme = theme.trim().to_string();
        }
        if let Some(text) = update.text {
            self.text = text.trim().to_string();
        }
        if let Some(options) = update.options {
            self.options = options.into_iter().map(|o| o.trim().to_string()).collect();
        }
        if let Some(correct_index) = update.correct_index {
            self.correct_index = correct_index;
        }
        if let Some(visibility) = update.visibility {
            self.visibility = visibility;
        }
        if let Some(explanation) = update.explanation {
            let explanation = explanation.trim().to_string();
            self.explanation = if explanation.is_empty() { None } else { Some(explanation) };
        }

        validate_fields(&self.theme, &self.text, &self.options, self.correct_index)
    }
}

/// Regras compartilhadas entre criação e edição
pub fn validate_fields(
    theme: &str,
    text: &str,
    options: &[String],
    correct_index: i32,
) -> Result<(), AppError> {
    if theme.trim().is_empty() {
        return Err(AppError::InvalidRequest("Theme is required".to_string()));
    }
    if text.trim().is_empty() {
        return Err(AppError::InvalidRequest("Question text is required".to_string()));
    }
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(AppError::InvalidRequest(format!(
            "A question needs between {} and {} options",
            MIN_OPTIONS, MAX_OPTIONS
        )));
    }
    if options.iter().any(|o| o.trim().is_empty()) {
        return Err(AppError::InvalidRequest("Options cannot be blank".to_string()));
    }
    if correct_index < 0 || correct_index as usize >= options.len() {
        return Err(AppError::InvalidRequest(format!(
            "correct_index must be between 0 and {}",
            options.len() - 1
        )));
    }
    Ok(())
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateQuestionRequest {
    pub theme: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: i32,
    pub visibility: Option<Visibility>,
    pub explanation: Option<String>,
}

impl CreateQuestionRequest {
    /// Valida e monta o documento a ser inserido
    pub fn into_question(self, teacher_id: &str, now: i64) -> Result<Question, AppError> {
        let options: Vec<String> = self.options.into_iter().map(|o| o.trim().to_string()).collect();
        validate_fields(&self.theme, &self.text, &options, self.correct_index)?;

        Ok(Question {
            id: None,
            created_by: teacher_id.to_string(),
            theme: self.theme.trim().to_string(),
            text: self.text.trim().to_string(),
            options,
            correct_index: self.correct_index,
            visibility: self.visibility.unwrap_or_default(),
            explanation: self
                .explanation
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty()),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateQuestionRequest {
    pub theme: Option<String>,
    pub text: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_index: Option<i32>,
    pub visibility: Option<Visibility>,
    pub explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuestionFilter {
    pub theme: Option<String>,
    pub visibility: Option<Visibility>,
}

/// Questão como vista por um usuário; o gabarito só vai para o autor
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct QuestionResponse {
    pub id: String,
    pub created_by: String,
    pub theme: String,
    pub text: String,
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<i32>,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl QuestionResponse {
    pub fn for_viewer(question: Question, viewer_id: &str) -> Self {
        if question.created_by == viewer_id {
            Self::with_answer(question)
        } else {
            Self::without_answer(question)
        }
    }

    pub fn with_answer(question: Question) -> Self {
        let mut response = Self::without_answer(question.clone());
        response.correct_index = Some(question.correct_index);
        response.explanation = question.explanation;
        response
    }

    /// A explicação também fica de fora: ela entrega a resposta
    pub fn without_answer(question: Question) -> Self {
        QuestionResponse {
            id: question.id_hex(),
            created_by: question.created_by,
            theme: question.theme,
            text: question.text,
            options: question.options,
            correct_index: None,
            visibility: question.visibility,
            explanation: None,
            created_at: question.created_at,
            updated_at: question.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateQuestionRequest {
        CreateQuestionRequest {
            theme: " Frações ".into(),
            text: "Quanto é 1/2 + 1/4?".into(),
            options: vec!["3/4".into(), " 2/6 ".into(), "1/8".into()],
            correct_index: 0,
            visibility: None,
            explanation: Some("  ".into()),
        }
    }

    #[test]
    fn test_into_question_trims_and_defaults() {
        let q = request().into_question("prof-1", 1000).unwrap();
        assert_eq!(q.theme, "Frações");
        assert_eq!(q.options[1], "2/6");
        assert_eq!(q.visibility, Visibility::Public);
        assert_eq!(q.explanation, None);
        assert_eq!(q.created_by, "prof-1");
    }

    #[test]
    fn test_rejects_out_of_range_correct_index() {
        let mut req = request();
        req.correct_index = 3;
        assert!(matches!(req.into_question("p", 0), Err(AppError::InvalidRequest(_))));

        let mut req = request();
        req.correct_index = -1;
        assert!(req.into_question("p", 0).is_err());
    }

    #[test]
    fn test_rejects_option_counts() {
        let mut req = request();
        req.options = vec!["só uma".into()];
        assert!(req.into_question("p", 0).is_err());

        let mut req = request();
        req.options = (0..7).map(|i| i.to_string()).collect();
        assert!(req.into_question("p", 0).is_err());
    }

    #[test]
    fn test_rejects_blank_fields() {
        let mut req = request();
        req.options[2] = "   ".into();
        assert!(req.into_question("p", 0).is_err());

        let mut req = request();
        req.text = "".into();
        assert!(req.into_question("p", 0).is_err());
    }

    #[test]
    fn test_apply_update_revalidates_merged_result() {
        let mut q = request().into_question("p", 0).unwrap();

        // Reduzir as alternativas deixa o gabarito antigo fora do intervalo
        q.correct_index = 2;
        let update = UpdateQuestionRequest {
            options: Some(vec!["a".into(), "b".into()]),
            ..Default::default()
        };
        assert!(q.apply_update(update).is_err());

        let update = UpdateQuestionRequest {
            options: Some(vec!["a".into(), "b".into()]),
            correct_index: Some(1),
            visibility: Some(Visibility::Private),
            ..Default::default()
        };
        q.apply_update(update).unwrap();
        assert_eq!(q.correct_index, 1);
        assert_eq!(q.visibility, Visibility::Private);
    }

    #[test]
    fn test_visibility_rules() {
        let mut q = request().into_question("prof-1", 0).unwrap();
        q.visibility = Visibility::Private;

        assert!(q.is_visible_to("prof-1", &[]));
        assert!(!q.is_visible_to("prof-2", &[]));
        assert!(!q.is_visible_to("aluno-1", &["prof-2".to_string()]));
        assert!(q.is_visible_to("aluno-1", &["prof-2".to_string(), "prof-1".to_string()]));

        q.visibility = Visibility::Public;
        assert!(q.is_visible_to("aluno-sem-vinculo", &[]));
    }

    #[test]
    fn test_response_hides_answer_from_non_owner() {
        let mut q = request().into_question("prof-1", 0).unwrap();
        q.explanation = Some("1/2 = 2/4".into());

        let owner = QuestionResponse::for_viewer(q.clone(), "prof-1");
        assert_eq!(owner.correct_index, Some(0));
        assert!(owner.explanation.is_some());

        let student = QuestionResponse::for_viewer(q, "aluno-1");
        assert_eq!(student.correct_index, None);
        assert_eq!(student.explanation, None);

        let json = serde_json::to_value(&student).unwrap();
        assert!(json.get("correct_index").is_none());
    }
}
