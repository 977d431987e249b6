use crate::{
    config::Config,
    database::{self, MongoDB},
    middleware::auth::Claims,
    models::{ChatMessage, Comment, Question, Role, TeacherCode, TeacherStudent, User, UserInfo},
    utils::{is_duplicate_key, now_ms, AppError},
};
use actix_web::web;
use async_trait::async_trait;
use bcrypt::{hash, verify, DEFAULT_COST};
use futures::stream::TryStreamExt;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Emite e valida os bearer tokens da API
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn issue_token(&self, user: &User) -> Result<String, AppError>;
    async fn verify_token(&self, token: &str) -> Result<Claims, AppError>;
}

/// Provedor local: JWT HS256 assinado com `JWT_SECRET`
pub struct JwtIdentityProvider {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    ttl_hours: i64,
}

impl JwtIdentityProvider {
    pub fn from_config(config: &Config) -> Self {
        JwtIdentityProvider {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            ttl_hours: config.token_ttl_hours,
        }
    }

    fn claims_for(&self, user: &User) -> Claims {
        let now = chrono::Utc::now();
        Claims {
            sub: user.user_id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            iat: now.timestamp() as usize,
            exp: (now + chrono::Duration::hours(self.ttl_hours)).timestamp() as usize,
            jti: Uuid::new_v4().to_string(),
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn issue_token(&self, user: &User) -> Result<String, AppError> {
        encode(&Header::default(), &self.claims_for(user), &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
    }

    async fn verify_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

// Request/Response structures
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub school: Option<String>,
    pub grade: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct VerifyTokenResponse {
    pub success: bool,
    pub valid: bool,
    pub user_id: String,
    pub role: Role,
    pub exp: usize,
}

/// Campos de cadastro já validados e normalizados
#[derive(Debug, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub school: Option<String>,
    pub grade: Option<String>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Password must have at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub fn validate_registration(request: &RegisterRequest) -> Result<NewUser, AppError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidRequest("Name is required".to_string()));
    }

    let email = normalize_email(&request.email);
    let valid_email = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    };
    if !valid_email {
        return Err(AppError::InvalidRequest("Invalid email".to_string()));
    }

    validate_password(&request.password)?;

    let role = Role::parse(&request.role).ok_or_else(|| {
        AppError::InvalidRequest(format!(
            "Invalid role: {}. Supported: student, teacher",
            request.role
        ))
    })?;

    Ok(NewUser {
        name: name.to_string(),
        email,
        role,
        school: optional_text(request.school.as_deref()),
        grade: optional_text(request.grade.as_deref()),
    })
}

/// bcrypt é caro; roda fora das threads do actix
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    Ok(web::block(move || hash(password, DEFAULT_COST)).await??)
}

pub async fn verify_password(password: &str, hashed: &str) -> Result<bool, AppError> {
    let password = password.to_string();
    let hashed = hashed.to_string();
    Ok(web::block(move || verify(password, &hashed)).await??)
}

pub async fn find_user(db: &MongoDB, user_id: &str) -> Result<User, AppError> {
    db.collection::<User>(database::USERS)
        .find_one(doc! { "user_id": user_id })
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

// User registration
pub async fn register(
    db: &MongoDB,
    identity: &dyn IdentityProvider,
    request: &RegisterRequest,
) -> Result<AuthResponse, AppError> {
    let new_user = validate_registration(request)?;
    let collection = db.collection::<User>(database::USERS);

    if collection.find_one(doc! { "email": &new_user.email }).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let now = now_ms();
    let user = User {
        id: None,
        user_id: ObjectId::new().to_hex(),
        name: new_user.name,
        email: new_user.email,
        password: hash_password(&request.password).await?,
        role: new_user.role,
        school: new_user.school,
        grade: new_user.grade,
        avatar_url: None,
        created_at: now,
        updated_at: now,
    };

    // O índice único em users(email) cobre o cadastro concorrente
    collection.insert_one(&user).await.map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::Conflict("Email already registered".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    log::info!("✅ User registered: {} ({})", user.email, user.role);

    Ok(AuthResponse {
        success: true,
        token: identity.issue_token(&user).await?,
        user: UserInfo::from(user),
    })
}

// User login
pub async fn login(
    db: &MongoDB,
    identity: &dyn IdentityProvider,
    request: &LoginRequest,
) -> Result<AuthResponse, AppError> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let user = db
        .collection::<User>(database::USERS)
        .find_one(doc! { "email": normalize_email(&request.email) })
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&request.password, &user.password).await? {
        return Err(invalid());
    }

    Ok(AuthResponse {
        success: true,
        token: identity.issue_token(&user).await?,
        user: UserInfo::from(user),
    })
}

pub async fn update_profile(
    db: &MongoDB,
    user_id: &str,
    request: &UpdateProfileRequest,
) -> Result<UserInfo, AppError> {
    let mut update_doc = doc! { "updated_at": now_ms() };

    if let Some(name) = &request.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidRequest("Name cannot be blank".to_string()));
        }
        update_doc.insert("name", name);
    }
    if let Some(school) = &request.school {
        update_doc.insert("school", school.trim());
    }
    if let Some(grade) = &request.grade {
        update_doc.insert("grade", grade.trim());
    }
    if let Some(avatar_url) = &request.avatar_url {
        update_doc.insert("avatar_url", avatar_url.trim());
    }

    let result = db
        .collection::<User>(database::USERS)
        .update_one(doc! { "user_id": user_id }, doc! { "$set": update_doc })
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    find_user(db, user_id).await.map(UserInfo::from)
}

pub async fn change_password(
    db: &MongoDB,
    user_id: &str,
    request: &ChangePasswordRequest,
) -> Result<(), AppError> {
    let user = find_user(db, user_id).await?;

    if !verify_password(&request.current_password, &user.password).await? {
        return Err(AppError::Unauthorized("Current password is incorrect".to_string()));
    }
    validate_password(&request.new_password)?;

    let hashed = hash_password(&request.new_password).await?;
    db.collection::<User>(database::USERS)
        .update_one(
            doc! { "user_id": user_id },
            doc! { "$set": { "password": hashed, "updated_at": now_ms() } },
        )
        .await?;

    Ok(())
}

/// 🗑️ Remove a conta e os dados ligados a ela
pub async fn delete_user_account(db: &MongoDB, user: &Claims) -> Result<(), AppError> {
    let user_id = user.sub.as_str();
    log::info!("🗑️ Deleting account for user_id: {}", user_id);

    // Dependentes primeiro: se algo falhar, o usuário continua existindo e pode repetir
    find_user(db, user_id).await?;

    let links = db
        .collection::<TeacherStudent>(database::TEACHER_STUDENTS)
        .delete_many(doc! { "$or": [{ "teacher_id": user_id }, { "student_id": user_id }] })
        .await?;

    let messages = db
        .collection::<ChatMessage>(database::CHAT_MESSAGES)
        .delete_many(doc! { "$or": [{ "sender_id": user_id }, { "receiver_id": user_id }] })
        .await?;

    db.collection::<TeacherCode>(database::TEACHER_CODES)
        .delete_many(doc! { "teacher_id": user_id })
        .await?;

    if user.is_teacher() {
        let questions = db.collection::<Question>(database::QUESTIONS);
        let question_ids: Vec<String> = questions
            .find(doc! { "created_by": user_id })
            .await?
            .try_collect::<Vec<Question>>()
            .await?
            .iter()
            .map(Question::id_hex)
            .collect();

        db.collection::<Comment>(database::COMMENTS)
            .delete_many(doc! { "question_id": { "$in": question_ids.clone() } })
            .await?;
        questions.delete_many(doc! { "created_by": user_id }).await?;

        log::info!("✅ Deleted {} questions for teacher {}", question_ids.len(), user_id);
    }

    let deleted = db
        .collection::<User>(database::USERS)
        .delete_one(doc! { "user_id": user_id })
        .await?;

    if deleted.deleted_count == 0 {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    log::info!(
        "🎉 Account deleted for {} ({} links, {} messages)",
        user_id,
        links.deleted_count,
        messages.deleted_count
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> JwtIdentityProvider {
        JwtIdentityProvider::from_config(&Config::for_tests())
    }

    fn user(role: Role) -> User {
        User {
            id: None,
            user_id: "u-1".into(),
            name: "Bruno".into(),
            email: "bruno@escola.br".into(),
            password: String::new(),
            role,
            school: None,
            grade: None,
            avatar_url: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    async fn test_db() -> MongoDB {
        dotenv::dotenv().ok();
        let uri = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/aprender_test".to_string());
        MongoDB::new(&uri).await.unwrap()
    }

    fn registration() -> RegisterRequest {
        RegisterRequest {
            name: "  Bruno ".into(),
            email: " Bruno@Escola.BR ".into(),
            password: "segredo".into(),
            role: "student".into(),
            school: Some("  ".into()),
            grade: Some("8º ano".into()),
        }
    }

    #[tokio::test]
    async fn test_issue_and_verify_roundtrip() {
        let provider = provider();
        let token = provider.issue_token(&user(Role::Teacher)).await.unwrap();
        let claims = provider.verify_token(&token).await.unwrap();

        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.role, Role::Teacher);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn test_verify_rejects_other_secret() {
        let token = provider().issue_token(&user(Role::Student)).await.unwrap();

        let mut config = Config::for_tests();
        config.jwt_secret = "outro-segredo".into();
        let other = JwtIdentityProvider::from_config(&config);

        assert!(matches!(other.verify_token(&token).await, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_verify_rejects_wrong_audience() {
        let token = provider().issue_token(&user(Role::Student)).await.unwrap();

        let mut config = Config::for_tests();
        config.jwt_audience = "outra-api".into();
        let other = JwtIdentityProvider::from_config(&config);

        assert!(other.verify_token(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_verify_rejects_expired_token() {
        let mut config = Config::for_tests();
        config.token_ttl_hours = -2;
        let provider = JwtIdentityProvider::from_config(&config);

        let token = provider.issue_token(&user(Role::Student)).await.unwrap();
        assert!(provider.verify_token(&token).await.is_err());
    }

    #[test]
    fn test_validate_registration_normalizes() {
        let new_user = validate_registration(&registration()).unwrap();
        assert_eq!(new_user.name, "Bruno");
        assert_eq!(new_user.email, "bruno@escola.br");
        assert_eq!(new_user.role, Role::Student);
        assert_eq!(new_user.school, None);
        assert_eq!(new_user.grade.as_deref(), Some("8º ano"));
    }

    #[test]
    fn test_validate_registration_rejects() {
        let mut req = registration();
        req.email = "sem-arroba".into();
        assert!(validate_registration(&req).is_err());

        let mut req = registration();
        req.password = "12345".into();
        assert!(validate_registration(&req).is_err());

        let mut req = registration();
        req.role = "diretor".into();
        assert!(validate_registration(&req).is_err());

        let mut req = registration();
        req.name = " ".into();
        assert!(validate_registration(&req).is_err());
    }

    #[actix_web::test]
    async fn test_password_hash_roundtrip() {
        let hashed = hash_password("segredo").await.unwrap();
        assert_ne!(hashed, "segredo");
        assert!(verify_password("segredo", &hashed).await.unwrap());
        assert!(!verify_password("errado", &hashed).await.unwrap());
    }

    #[actix_web::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_delete_account_removes_dependents_and_user() {
        let db = test_db().await;
        let identity = provider();

        let mut request = registration();
        request.email = format!("{}@escola.br", ObjectId::new().to_hex());
        request.role = "teacher".into();
        let auth = register(&db, &identity, &request).await.unwrap();
        let claims = identity.verify_token(&auth.token).await.unwrap();

        let student = ObjectId::new().to_hex();
        let links = db.collection::<TeacherStudent>(database::TEACHER_STUDENTS);
        links
            .insert_one(TeacherStudent::new(&claims.sub, &student, now_ms()))
            .await
            .unwrap();

        delete_user_account(&db, &claims).await.unwrap();

        assert!(matches!(find_user(&db, &claims.sub).await, Err(AppError::NotFound(_))));
        let remaining = links
            .count_documents(doc! { "teacher_id": &claims.sub })
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        let again = delete_user_account(&db, &claims).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }
}
