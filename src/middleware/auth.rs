use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, AUTHORIZATION},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::models::Role;
use crate::services::auth_service::IdentityProvider;
use crate::utils::AppError;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,           // user_id
    pub email: String,
    pub name: String,
    pub role: Role,
    pub iat: usize,            // issued at
    pub exp: usize,            // expiration
    pub jti: String,           // JWT ID
    pub aud: String,           // audience
    pub iss: String,           // issuer
}

impl Claims {
    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    pub fn require_teacher(&self) -> Result<(), AppError> {
        if self.is_teacher() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Only teachers can do this".to_string()))
        }
    }

    pub fn require_student(&self) -> Result<(), AppError> {
        if self.is_student() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Only students can do this".to_string()))
        }
    }
}

/// Extrai o token de `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Valida o JWT e injeta `Claims` nas extensions (lidas via `web::ReqData<Claims>`)
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService { service: Rc::new(service) }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        let token = match bearer_token(req.headers()) {
            Some(token) => token.to_string(),
            None => {
                return Box::pin(async move {
                    Err(AppError::Unauthorized("Missing authorization token".to_string()).into())
                })
            }
        };

        let provider = match req.app_data::<web::Data<dyn IdentityProvider>>() {
            Some(provider) => provider.clone(),
            None => {
                log::error!("❌ Identity provider not registered in app data");
                return Box::pin(async move {
                    Err(AppError::Internal("Authentication unavailable".to_string()).into())
                });
            }
        };

        Box::pin(async move {
            let claims = provider.verify_token(&token).await.map_err(|e| {
                log::warn!("🔒 Rejected token on {}: {}", req.path(), e);
                Error::from(e)
            })?;

            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}
