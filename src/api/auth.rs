use actix_web::{web, HttpRequest, HttpResponse};
use crate::{
    database::MongoDB,
    middleware::auth::{bearer_token, Claims},
    models::UserInfo,
    services::auth_service::{
        self, AuthResponse, ChangePasswordRequest, IdentityProvider, LoginRequest,
        RegisterRequest, UpdateProfileRequest, VerifyTokenResponse,
    },
    utils::AppError,
};

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    db: web::Data<MongoDB>,
    provider: web::Data<dyn IdentityProvider>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /auth/register - email: {}, role: {}", request.email, request.role);

    match auth_service::register(&db, provider.get_ref(), &request).await {
        Ok(response) => {
            log::info!("✅ Registration successful: {}", response.user.id);
            Ok(HttpResponse::Created().json(response))
        }
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", request.email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    db: web::Data<MongoDB>,
    provider: web::Data<dyn IdentityProvider>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&db, provider.get_ref(), &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.email);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid", body = VerifyTokenResponse),
        (status = 401, description = "Invalid or expired token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn verify_token(
    req: HttpRequest,
    provider: web::Data<dyn IdentityProvider>,
) -> Result<HttpResponse, AppError> {
    log::info!("✓ GET /auth/verify");

    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization token".to_string()))?;

    let claims = provider.verify_token(token).await.map_err(|e| {
        log::warn!("❌ Token verification failed: {}", e);
        e
    })?;

    log::info!("✅ Token valid for user: {}", claims.sub);
    Ok(HttpResponse::Ok().json(VerifyTokenResponse {
        success: true,
        valid: true,
        user_id: claims.sub,
        role: claims.role,
        exp: claims.exp,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user profile", body = UserInfo),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("👤 GET /auth/me - user: {}", claims.sub);

    let user = auth_service::find_user(&db, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": UserInfo::from(user)
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/me",
    tag = "Auth",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserInfo),
        (status = 400, description = "Invalid request")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_me(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("✏️ PUT /auth/me - user: {}", claims.sub);

    let user = auth_service::update_profile(&db, &claims.sub, &request).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": user
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/password",
    tag = "Auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Current password is wrong")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn change_password(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔑 PUT /auth/password - user: {}", claims.sub);

    auth_service::change_password(&db, &claims.sub, &request).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Password changed"
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Account deleted"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_account(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("🗑️ DELETE /auth/me - user: {}", claims.sub);

    match auth_service::delete_user_account(&db, &claims).await {
        Ok(()) => {
            log::info!("✅ Account deleted: {}", claims.sub);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "message": "Account deleted"
            })))
        }
        Err(e) => {
            log::error!("❌ Failed to delete account {}: {}", claims.sub, e);
            Err(e)
        }
    }
}
