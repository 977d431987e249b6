use crate::models::Question;
use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_QUIZ_SIZE: i64 = 10;
pub const MAX_QUIZ_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct DrawQuery {
    pub theme: Option<String>,
    pub limit: Option<i64>,
}

impl DrawQuery {
    pub fn size(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_QUIZ_SIZE).clamp(1, MAX_QUIZ_SIZE)
    }

    pub fn theme(&self) -> Option<&str> {
        self.theme.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: String,
    pub selected_index: i32,
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub theme: Option<String>,
    pub answers: Vec<SubmittedAnswer>,
}

impl SubmitQuizRequest {
    /// Valida as respostas e reescreve cada `question_id` no hex canônico do ObjectId,
    /// devolvendo os ids na ordem das respostas
    pub fn normalize(&mut self) -> Result<Vec<ObjectId>, AppError> {
        if self.answers.is_empty() {
            return Err(AppError::InvalidRequest("At least one answer is required".to_string()));
        }
        if self.answers.len() as i64 > MAX_QUIZ_SIZE {
            return Err(AppError::InvalidRequest(format!(
                "A quiz has at most {} questions",
                MAX_QUIZ_SIZE
            )));
        }

        let mut ids = Vec::with_capacity(self.answers.len());
        let mut seen = HashSet::new();
        for answer in &mut self.answers {
            let id = ObjectId::parse_str(answer.question_id.trim()).map_err(|_| {
                AppError::InvalidRequest(format!("Invalid question ID: {}", answer.question_id))
            })?;
            answer.question_id = id.to_hex();

            if !seen.insert(id) {
                return Err(AppError::InvalidRequest(format!(
                    "Question {} answered more than once",
                    answer.question_id
                )));
            }
            ids.push(id);
        }
        Ok(ids)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub question_id: String,
    pub selected_index: i32,
    pub correct_index: i32,
    pub is_correct: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub explanation: Option<String>,
}

/// Resultado de um quiz respondido (collection "quiz_results")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizResult {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub theme: Option<String>,
    pub total: i32,
    pub correct: i32,
    /// Percentual de acertos, 0..=100
    pub score: i32,
    pub answers: Vec<AnswerOutcome>,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
pub struct QuizResultResponse {
    pub id: String,
    pub student_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    pub total: i32,
    pub correct: i32,
    pub score: i32,
    pub answers: Vec<AnswerOutcome>,
    pub created_at: i64,
}

impl From<QuizResult> for QuizResultResponse {
    fn from(result: QuizResult) -> Self {
        QuizResultResponse {
            id: result.id.map(|id| id.to_hex()).unwrap_or_default(),
            student_id: result.student_id,
            theme: result.theme,
            total: result.total,
            correct: result.correct,
            score: result.score,
            answers: result.answers,
            created_at: result.created_at,
        }
    }
}

/// Corrige as respostas contra as questões (indexadas pelo id hex).
/// Toda resposta precisa ter a questão correspondente no mapa e um índice válido.
pub fn grade_answers(
    questions: &HashMap<String, Question>,
    answers: &[SubmittedAnswer],
) -> Result<Vec<AnswerOutcome>, AppError> {
    answers
        .iter()
        .map(|answer| {
            let question = questions.get(&answer.question_id).ok_or_else(|| {
                AppError::NotFound(format!("Question {} not found", answer.question_id))
            })?;

            if answer.selected_index < 0 || answer.selected_index as usize >= question.options.len() {
                return Err(AppError::InvalidRequest(format!(
                    "selected_index out of range for question {}",
                    answer.question_id
                )));
            }

            Ok(AnswerOutcome {
                question_id: answer.question_id.clone(),
                selected_index: answer.selected_index,
                correct_index: question.correct_index,
                is_correct: answer.selected_index == question.correct_index,
                explanation: question.explanation.clone(),
            })
        })
        .collect()
}

pub fn score_percent(correct: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as i32
}
