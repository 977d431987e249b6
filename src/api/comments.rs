use actix_web::{web, HttpResponse};
use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::CreateCommentRequest,
    services::comment_service,
    utils::AppError,
};

pub async fn add_comment(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<CreateCommentRequest>,
) -> Result<HttpResponse, AppError> {
    let question_id = path.into_inner();
    log::info!("💬 POST /questions/{}/comments - user: {}", question_id, claims.sub);

    let comment = comment_service::add_comment(&db, &claims, &question_id, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "comment": comment
    })))
}

pub async fn list_comments(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let question_id = path.into_inner();
    log::info!("💬 GET /questions/{}/comments - user: {}", question_id, claims.sub);

    let threads = comment_service::list_threads(&db, &claims, &question_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": threads.len(),
        "comments": threads
    })))
}

pub async fn delete_comment(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let comment_id = path.into_inner();
    log::info!("🗑️ DELETE /comments/{} - user: {}", comment_id, claims.sub);

    comment_service::delete_comment(&db, &claims, &comment_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Comment deleted"
    })))
}
