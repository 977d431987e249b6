use actix_web::{web, HttpResponse};
use crate::{
    database::MongoDB,
    middleware::auth::Claims,
    models::{MessagesQuery, SendMessageRequest},
    services::chat_service,
    utils::AppError,
};

pub async fn send_message(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("✉️ POST /chat/messages - from: {}, to: {}", claims.sub, request.receiver_id);

    match chat_service::send_message(&db, &claims, request.into_inner()).await {
        Ok(message) => Ok(HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "message": message
        }))),
        Err(e) => {
            log::warn!("❌ Message from {} rejected: {}", claims.sub, e);
            Err(e)
        }
    }
}

// Chamado em polling pelo cliente, por isso loga em debug
pub async fn get_messages(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
    query: web::Query<MessagesQuery>,
) -> Result<HttpResponse, AppError> {
    let other_id = path.into_inner();
    log::debug!("📥 GET /chat/{}/messages - user: {}, since: {:?}", other_id, claims.sub, query.since);

    let messages = chat_service::fetch_conversation(&db, &claims, &other_id, &query).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": messages.len(),
        "messages": messages
    })))
}

pub async fn list_contacts(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("📇 GET /chat/contacts - user: {}", claims.sub);

    let contacts = chat_service::list_contacts(&db, &claims).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "contacts": contacts
    })))
}
