use actix_web::{web, HttpResponse};
use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{DrawQuery, SubmitQuizRequest},
    services::quiz_service,
    utils::AppError,
};

pub async fn draw_quiz(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    query: web::Query<DrawQuery>,
) -> Result<HttpResponse, AppError> {
    log::info!(
        "🎲 GET /quiz - user: {}, theme: {:?}, limit: {}",
        claims.sub,
        query.theme(),
        query.size()
    );

    let questions = quiz_service::draw_quiz(&db, &claims, &query).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": questions.len(),
        "questions": questions
    })))
}

pub async fn submit_quiz(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<SubmitQuizRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📨 POST /quiz/submit - student: {}, answers: {}", claims.sub, request.answers.len());

    match quiz_service::submit_quiz(&db, &claims, request.into_inner()).await {
        Ok(result) => Ok(HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "result": result
        }))),
        Err(e) => {
            log::warn!("❌ Quiz submission rejected for {}: {}", claims.sub, e);
            Err(e)
        }
    }
}

pub async fn my_results(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("📊 GET /quiz/results - student: {}", claims.sub);

    claims.require_student()?;
    let results = quiz_service::list_results(&db, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": results.len(),
        "results": results
    })))
}

pub async fn student_results(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let student_id = path.into_inner();
    log::info!("📊 GET /quiz/results/{} - teacher: {}", student_id, claims.sub);

    let results = quiz_service::list_student_results(&db, &claims, &student_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "student_id": student_id,
        "count": results.len(),
        "results": results
    })))
}
