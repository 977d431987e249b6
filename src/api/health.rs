use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use crate::database::MongoDB;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: String,
    pub timestamp: i64,
}

impl HealthResponse {
    pub fn new(database_ok: bool) -> Self {
        HealthResponse {
            status: if database_ok { "healthy" } else { "degraded" }.to_string(),
            service: "aprender-em-movimento-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if database_ok { "connected" } else { "unreachable" }.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(db: web::Data<MongoDB>) -> impl Responder {
    let database_ok = db.health_check().await;
    if !database_ok {
        log::warn!("⚠️ Health check: MongoDB ping failed");
        return HttpResponse::ServiceUnavailable().json(HealthResponse::new(false));
    }
    HttpResponse::Ok().json(HealthResponse::new(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_fields() {
        let healthy = HealthResponse::new(true);
        assert_eq!(healthy.status, "healthy");
        assert_eq!(healthy.service, "aprender-em-movimento-api");
        assert_eq!(healthy.version, env!("CARGO_PKG_VERSION"));
        assert!(healthy.timestamp > 0);

        let degraded = HealthResponse::new(false);
        assert_eq!(degraded.status, "degraded");
        assert_eq!(degraded.database, "unreachable");
    }

    #[actix_web::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_health_endpoint() {
        use actix_web::{test, App};

        dotenv::dotenv().ok();
        let uri = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/aprender_test".to_string());
        let db = MongoDB::new(&uri).await.unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
    }
}
