use crate::{
    database::{self, MongoDB},
    middleware::auth::Claims,
    models::{
        grade_answers, score_percent, DrawQuery, Question, QuestionResponse, QuizResult,
        QuizResultResponse, SubmitQuizRequest,
    },
    services::{link_service, question_service},
    utils::{now_ms, AppError},
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use std::collections::HashMap;

/// Pipeline de sorteio: filtra o que o aluno pode ver e amostra `size` questões
pub fn draw_pipeline(viewer_id: &str, linked_teacher_ids: &[String], theme: Option<&str>, size: i64) -> Vec<Document> {
    let mut filter = question_service::visibility_filter(viewer_id, linked_teacher_ids);
    if let Some(theme) = theme {
        filter.insert("theme", theme);
    }

    vec![doc! { "$match": filter }, doc! { "$sample": { "size": size } }]
}

/// Sorteia questões para um quiz, sem gabarito
pub async fn draw_quiz(db: &MongoDB, viewer: &Claims, query: &DrawQuery) -> Result<Vec<QuestionResponse>, AppError> {
    let linked = question_service::linked_teachers_of(db, viewer).await?;
    let pipeline = draw_pipeline(&viewer.sub, &linked, query.theme(), query.size());

    let questions: Vec<Question> = db
        .collection::<Question>(database::QUESTIONS)
        .aggregate(pipeline)
        .with_type::<Question>()
        .await?
        .try_collect()
        .await?;

    log::debug!("🎲 Drew {} questions for {}", questions.len(), viewer.sub);

    Ok(questions.into_iter().map(QuestionResponse::without_answer).collect())
}

pub async fn submit_quiz(
    db: &MongoDB,
    student: &Claims,
    mut request: SubmitQuizRequest,
) -> Result<QuizResultResponse, AppError> {
    student.require_student()?;
    let ids = request.normalize()?;

    let linked = link_service::linked_teacher_ids(db, &student.sub).await?;
    let questions: HashMap<String, Question> = db
        .collection::<Question>(database::QUESTIONS)
        .find(doc! { "_id": { "$in": ids } })
        .await?
        .try_collect::<Vec<Question>>()
        .await?
        .into_iter()
        .filter(|q| q.is_visible_to(&student.sub, &linked))
        .map(|q| (q.id_hex(), q))
        .collect();

    let outcomes = grade_answers(&questions, &request.answers)?;
    let total = outcomes.len() as i32;
    let correct = outcomes.iter().filter(|o| o.is_correct).count() as i32;

    let mut result = QuizResult {
        id: None,
        student_id: student.sub.clone(),
        theme: request.theme.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
        total,
        correct,
        score: score_percent(correct, total),
        answers: outcomes,
        created_at: now_ms(),
    };

    let inserted = db
        .collection::<QuizResult>(database::QUIZ_RESULTS)
        .insert_one(&result)
        .await?;
    result.id = inserted.inserted_id.as_object_id();

    log::info!("✅ Student {} scored {}/{} ({}%)", student.sub, correct, total, result.score);

    Ok(QuizResultResponse::from(result))
}

pub async fn list_results(db: &MongoDB, student_id: &str) -> Result<Vec<QuizResultResponse>, AppError> {
    let results: Vec<QuizResultResponse> = db
        .collection::<QuizResult>(database::QUIZ_RESULTS)
        .find(doc! { "student_id": student_id })
        .sort(doc! { "created_at": -1 })
        .await?
        .map_ok(QuizResultResponse::from)
        .try_collect()
        .await?;
    Ok(results)
}

/// Histórico de um aluno, visível apenas para professores vinculados
pub async fn list_student_results(
    db: &MongoDB,
    teacher: &Claims,
    student_id: &str,
) -> Result<Vec<QuizResultResponse>, AppError> {
    teacher.require_teacher()?;

    if !link_service::is_linked(db, &teacher.sub, student_id).await? {
        return Err(AppError::Forbidden("Student is not linked to you".to_string()));
    }

    list_results(db, student_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_pipeline_with_theme() {
        let pipeline = draw_pipeline("aluno-1", &["prof-1".to_string()], Some("Frações"), 5);
        assert_eq!(pipeline.len(), 2);

        let matcher = pipeline[0].get_document("$match").unwrap();
        assert_eq!(matcher.get_str("theme").unwrap(), "Frações");
        assert_eq!(matcher.get_array("$or").unwrap().len(), 3);

        let sample = pipeline[1].get_document("$sample").unwrap();
        assert_eq!(sample.get_i64("size").unwrap(), 5);
    }

    #[test]
    fn test_draw_pipeline_without_theme() {
        let pipeline = draw_pipeline("aluno-1", &[], None, 10);
        let matcher = pipeline[0].get_document("$match").unwrap();
        assert!(!matcher.contains_key("theme"));
        assert_eq!(matcher.get_array("$or").unwrap().len(), 2);
    }
}
