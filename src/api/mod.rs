pub mod auth;
pub mod chat;
pub mod comments;
pub mod health;
pub mod links;
pub mod questions;
pub mod quiz;
pub mod swagger;

use actix_web::{error, web};
use crate::middleware::auth::AuthMiddleware;
use crate::utils::AppError;

/// JSON malformado vira 400 com o mesmo corpo de erro da API
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        log::warn!("❌ Invalid JSON body on {}: {}", req.path(), err);
        error::Error::from(AppError::InvalidRequest(format!("Invalid JSON body: {}", err)))
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, req| {
        log::warn!("❌ Invalid query string on {}: {}", req.path(), err);
        error::Error::from(AppError::InvalidRequest(format!("Invalid query string: {}", err)))
    })
}

/// Registra todas as rotas da API.
/// Cada prefixo protegido tem o próprio `AuthMiddleware`; caminhos desconhecidos caem no 404.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health_check)).service(
        web::scope("/api/v1")
            .service(
                web::scope("/auth")
                    // Public
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/verify", web::get().to(auth::verify_token))
                    // Authenticated
                    .service(
                        web::resource("/me")
                            .wrap(AuthMiddleware)
                            .route(web::get().to(auth::get_me))
                            .route(web::put().to(auth::update_me))
                            .route(web::delete().to(auth::delete_account)),
                    )
                    .service(
                        web::resource("/password")
                            .wrap(AuthMiddleware)
                            .route(web::put().to(auth::change_password)),
                    ),
            )
            .service(
                web::scope("/questions")
                    .wrap(AuthMiddleware)
                    .route("", web::post().to(questions::create_question))
                    .route("", web::get().to(questions::list_questions))
                    .route("/themes", web::get().to(questions::list_themes))
                    .route("/{id}", web::get().to(questions::get_question))
                    .route("/{id}", web::put().to(questions::update_question))
                    .route("/{id}", web::delete().to(questions::delete_question))
                    .route("/{id}/comments", web::post().to(comments::add_comment))
                    .route("/{id}/comments", web::get().to(comments::list_comments)),
            )
            .service(
                web::scope("/comments")
                    .wrap(AuthMiddleware)
                    .route("/{id}", web::delete().to(comments::delete_comment)),
            )
            .service(
                web::scope("/quiz")
                    .wrap(AuthMiddleware)
                    .route("", web::get().to(quiz::draw_quiz))
                    .route("/submit", web::post().to(quiz::submit_quiz))
                    .route("/results", web::get().to(quiz::my_results))
                    .route("/results/{student_id}", web::get().to(quiz::student_results)),
            )
            .service(
                web::scope("/teacher")
                    .wrap(AuthMiddleware)
                    .route("/code", web::post().to(links::generate_code))
                    .route("/code", web::get().to(links::get_code))
                    .route("/students", web::get().to(links::list_students))
                    .route("/students/{student_id}", web::delete().to(links::remove_student)),
            )
            .service(
                web::scope("/student")
                    .wrap(AuthMiddleware)
                    .route("/link", web::post().to(links::link_student))
                    .route("/teachers", web::get().to(links::list_teachers))
                    .route("/teachers/{teacher_id}", web::delete().to(links::remove_teacher)),
            )
            .service(
                web::scope("/chat")
                    .wrap(AuthMiddleware)
                    .route("/messages", web::post().to(chat::send_message))
                    .route("/contacts", web::get().to(chat::list_contacts))
                    .route("/{other_id}/messages", web::get().to(chat::get_messages)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::auth_service::{IdentityProvider, JwtIdentityProvider};
    use actix_web::{http::StatusCode, test, App, HttpResponse};
    use serde::Deserialize;
    use std::sync::Arc;

    fn provider() -> web::Data<dyn IdentityProvider> {
        let provider = Arc::new(JwtIdentityProvider::from_config(&Config::for_tests()));
        web::Data::from(provider as Arc<dyn IdentityProvider>)
    }

    #[actix_web::test]
    async fn test_protected_routes_require_token() {
        let app = test::init_service(App::new().app_data(provider()).configure(configure)).await;

        for uri in [
            "/api/v1/auth/me",
            "/api/v1/auth/password",
            "/api/v1/questions",
            "/api/v1/chat/contacts",
            "/api/v1/quiz",
            "/api/v1/teacher/students",
        ] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let err = test::try_call_service(&app, req).await.err().unwrap();
            assert_eq!(
                err.as_response_error().status_code(),
                StatusCode::UNAUTHORIZED,
                "{} should require a token",
                uri
            );
        }
    }

    #[actix_web::test]
    async fn test_unknown_paths_are_not_found() {
        let app = test::init_service(App::new().app_data(provider()).configure(configure)).await;

        for uri in ["/api/v1/nope", "/api/v1/auth/nope", "/nope"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{} should be 404", uri);
        }

        // Rota pública continua acessível sem token
        let req = test::TestRequest::post().uri("/api/v1/auth/login").to_request();
        let resp = test::call_service(&app, req).await;
        assert_ne!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_verify_without_token_is_unauthorized() {
        let app = test::init_service(App::new().app_data(provider()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v1/auth/verify").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[derive(Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    #[derive(Deserialize)]
    struct Paging {
        #[allow(dead_code)]
        limit: i64,
    }

    async fn echo(_: web::Json<Payload>) -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    async fn paged(_: web::Query<Paging>) -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_malformed_input_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(json_config())
                .app_data(query_config())
                .route("/echo", web::post().to(echo))
                .route("/paged", web::get().to(paged)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/echo")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);

        let req = test::TestRequest::get().uri("/paged?limit=abc").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
