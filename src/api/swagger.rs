use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Aprender em Movimento API",
        version = "1.0.0",
        description = "Backend da plataforma de quizzes Aprender em Movimento.\n\n**Authentication:** all `/api/v1` endpoints except register, login and verify require a JWT Bearer token.\n\n**Features:**\n- Student and teacher accounts\n- Question bank with public/private visibility\n- Random quizzes with server-side scoring\n- Teacher invite codes and student linking\n- Question comments and teacher/student chat"
    ),
    paths(
        // Auth
        crate::api::auth::register,
        crate::api::auth::login,
        crate::api::auth::verify_token,
        crate::api::auth::get_me,
        crate::api::auth::update_me,
        crate::api::auth::change_password,
        crate::api::auth::delete_account,

        // Health
        crate::api::health::health_check,

        // Questions
        crate::api::questions::create_question,
        crate::api::questions::get_question,
        crate::api::questions::update_question,

        // Links
        crate::api::links::generate_code,
        crate::api::links::get_code,
        crate::api::links::link_student,
    ),
    components(
        schemas(
            crate::services::auth_service::RegisterRequest,
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::UpdateProfileRequest,
            crate::services::auth_service::ChangePasswordRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::VerifyTokenResponse,
            crate::models::UserInfo,
            crate::models::Role,
            crate::models::Visibility,
            crate::models::CreateQuestionRequest,
            crate::models::UpdateQuestionRequest,
            crate::models::QuestionResponse,
            crate::models::TeacherCodeResponse,
            crate::models::LinkRequest,
            crate::api::health::HealthResponse,
        )
    ),
    tags(
        (name = "Auth", description = "Registration, login and profile endpoints for students and teachers."),
        (name = "Health", description = "Service and database health."),
        (name = "Questions", description = "Question bank managed by teachers."),
        (name = "Links", description = "Teacher invite codes and student linking."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token returned by /api/v1/auth/login"))
                        .build()
                ),
            );
        }
    }
}
