use crate::{
    database::{self, MongoDB},
    middleware::auth::Claims,
    models::{
        Comment, CreateQuestionRequest, Question, QuestionFilter, QuestionResponse,
        UpdateQuestionRequest, Visibility,
    },
    services::link_service,
    utils::{now_ms, AppError},
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Bson, Document};

pub fn parse_object_id(id: &str, what: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id.trim()).map_err(|_| AppError::InvalidRequest(format!("Invalid {} ID", what)))
}

/// Filtro do conjunto de questões que o usuário pode ver
pub fn visibility_filter(viewer_id: &str, linked_teacher_ids: &[String]) -> Document {
    let mut branches = vec![
        Bson::Document(doc! { "visibility": Visibility::Public.as_str() }),
        Bson::Document(doc! { "created_by": viewer_id }),
    ];
    if !linked_teacher_ids.is_empty() {
        branches.push(Bson::Document(doc! { "created_by": { "$in": linked_teacher_ids.to_vec() } }));
    }
    doc! { "$or": branches }
}

/// Professores vinculados ao aluno; professores só veem as próprias privadas
pub async fn linked_teachers_of(db: &MongoDB, viewer: &Claims) -> Result<Vec<String>, AppError> {
    if viewer.is_student() {
        link_service::linked_teacher_ids(db, &viewer.sub).await
    } else {
        Ok(Vec::new())
    }
}

pub async fn find_question(db: &MongoDB, question_id: &str) -> Result<Question, AppError> {
    let object_id = parse_object_id(question_id, "question")?;

    db.collection::<Question>(database::QUESTIONS)
        .find_one(doc! { "_id": object_id })
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
}

/// Busca a questão e confirma que o usuário pode vê-la.
/// Questões privadas de terceiros respondem 404 para não revelar que existem.
pub async fn find_visible_question(
    db: &MongoDB,
    viewer: &Claims,
    question_id: &str,
) -> Result<Question, AppError> {
    let question = find_question(db, question_id).await?;
    let linked = linked_teachers_of(db, viewer).await?;

    if question.is_visible_to(&viewer.sub, &linked) {
        Ok(question)
    } else {
        Err(AppError::NotFound("Question not found".to_string()))
    }
}

async fn find_owned_question(db: &MongoDB, teacher_id: &str, question_id: &str) -> Result<Question, AppError> {
    let question = find_question(db, question_id).await?;
    if question.created_by != teacher_id {
        return Err(AppError::Forbidden("Only the author can change this question".to_string()));
    }
    Ok(question)
}

pub async fn create_question(
    db: &MongoDB,
    teacher: &Claims,
    request: CreateQuestionRequest,
) -> Result<QuestionResponse, AppError> {
    teacher.require_teacher()?;

    let mut question = request.into_question(&teacher.sub, now_ms())?;
    let result = db
        .collection::<Question>(database::QUESTIONS)
        .insert_one(&question)
        .await?;

    question.id = result.inserted_id.as_object_id();
    log::info!("📝 Question {} created by {}", question.id_hex(), teacher.sub);

    Ok(QuestionResponse::with_answer(question))
}

pub async fn list_own_questions(
    db: &MongoDB,
    teacher: &Claims,
    filter: &QuestionFilter,
) -> Result<Vec<QuestionResponse>, AppError> {
    teacher.require_teacher()?;

    let mut query = doc! { "created_by": &teacher.sub };
    if let Some(theme) = filter.theme.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        query.insert("theme", theme);
    }
    if let Some(visibility) = filter.visibility {
        query.insert("visibility", visibility.as_str());
    }

    let questions: Vec<Question> = db
        .collection::<Question>(database::QUESTIONS)
        .find(query)
        .sort(doc! { "created_at": -1 })
        .await?
        .try_collect()
        .await?;

    Ok(questions.into_iter().map(QuestionResponse::with_answer).collect())
}

pub async fn list_themes(db: &MongoDB, viewer: &Claims) -> Result<Vec<String>, AppError> {
    let linked = linked_teachers_of(db, viewer).await?;

    let values = db
        .collection::<Question>(database::QUESTIONS)
        .distinct("theme", visibility_filter(&viewer.sub, &linked))
        .await?;

    let mut themes: Vec<String> = values
        .into_iter()
        .filter_map(|v| v.as_str().map(String::from))
        .collect();
    themes.sort_by_key(|t| t.to_lowercase());
    Ok(themes)
}

pub async fn update_question(
    db: &MongoDB,
    teacher: &Claims,
    question_id: &str,
    update: UpdateQuestionRequest,
) -> Result<QuestionResponse, AppError> {
    let mut question = find_owned_question(db, &teacher.sub, question_id).await?;
    question.apply_update(update)?;
    question.updated_at = now_ms();

    let update_doc = doc! {
        "theme": &question.theme,
        "text": &question.text,
        "options": &question.options,
        "correct_index": question.correct_index,
        "visibility": question.visibility.as_str(),
        "explanation": to_bson(&question.explanation)?,
        "updated_at": question.updated_at,
    };

    db.collection::<Question>(database::QUESTIONS)
        .update_one(
            doc! { "_id": question.id, "created_by": &teacher.sub },
            doc! { "$set": update_doc },
        )
        .await?;

    Ok(QuestionResponse::with_answer(question))
}

pub async fn delete_question(db: &MongoDB, teacher: &Claims, question_id: &str) -> Result<(), AppError> {
    let question = find_owned_question(db, &teacher.sub, question_id).await?;

    db.collection::<Question>(database::QUESTIONS)
        .delete_one(doc! { "_id": question.id, "created_by": &teacher.sub })
        .await?;

    let comments = db
        .collection::<Comment>(database::COMMENTS)
        .delete_many(doc! { "question_id": question.id_hex() })
        .await?;

    log::info!(
        "🗑️ Question {} deleted ({} comments removed)",
        question.id_hex(),
        comments.deleted_count
    );
    Ok(())
}
