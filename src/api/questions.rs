use actix_web::{web, HttpResponse};
use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{CreateQuestionRequest, QuestionFilter, QuestionResponse, UpdateQuestionRequest},
    services::question_service,
    utils::AppError,
};

#[utoipa::path(
    post,
    path = "/api/v1/questions",
    tag = "Questions",
    request_body = CreateQuestionRequest,
    responses(
        (status = 201, description = "Question created", body = QuestionResponse),
        (status = 400, description = "Invalid question"),
        (status = 403, description = "Only teachers can create questions")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_question(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<CreateQuestionRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /questions - teacher: {}, theme: {}", claims.sub, request.theme);

    let question = question_service::create_question(&db, &claims, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "question": question
    })))
}

pub async fn list_questions(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    filter: web::Query<QuestionFilter>,
) -> Result<HttpResponse, AppError> {
    log::info!("📚 GET /questions - teacher: {}", claims.sub);

    let questions = question_service::list_own_questions(&db, &claims, &filter).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": questions.len(),
        "questions": questions
    })))
}

pub async fn list_themes(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("🏷️ GET /questions/themes - user: {}", claims.sub);

    let themes = question_service::list_themes(&db, &claims).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "themes": themes
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/questions/{id}",
    tag = "Questions",
    params(
        ("id" = String, Path, description = "Question ID")
    ),
    responses(
        (status = 200, description = "Question found", body = QuestionResponse),
        (status = 400, description = "Invalid ID"),
        (status = 404, description = "Question not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_question(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let question_id = path.into_inner();
    log::info!("🔍 GET /questions/{} - user: {}", question_id, claims.sub);

    let question = question_service::find_visible_question(&db, &claims, &question_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "question": QuestionResponse::for_viewer(question, &claims.sub)
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/questions/{id}",
    tag = "Questions",
    params(
        ("id" = String, Path, description = "Question ID")
    ),
    request_body = UpdateQuestionRequest,
    responses(
        (status = 200, description = "Question updated", body = QuestionResponse),
        (status = 403, description = "Not the author")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_question(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<UpdateQuestionRequest>,
) -> Result<HttpResponse, AppError> {
    let question_id = path.into_inner();
    log::info!("✏️ PUT /questions/{} - user: {}", question_id, claims.sub);

    let question =
        question_service::update_question(&db, &claims, &question_id, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "question": question
    })))
}

pub async fn delete_question(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let question_id = path.into_inner();
    log::info!("🗑️ DELETE /questions/{} - user: {}", question_id, claims.sub);

    question_service::delete_question(&db, &claims, &question_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Question deleted"
    })))
}
