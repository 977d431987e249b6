use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Sem 0/O e 1/I para evitar confusão ao ditar o código em sala
pub const CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LEN: usize = 6;

/// Código de convite do professor (um ativo por professor, uso único)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherCode {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub teacher_id: String,
    pub code: String,
    pub created_at: i64,
    pub expires_at: i64,
    #[serde(default)]
    pub used_by: Option<String>,
    #[serde(default)]
    pub used_at: Option<i64>,
}

impl TeacherCode {
    pub fn new(teacher_id: &str, code: String, now: i64, ttl_hours: i64) -> Self {
        TeacherCode {
            id: None,
            teacher_id: teacher_id.to_string(),
            code,
            created_at: now,
            expires_at: now + ttl_hours * 3_600_000,
            used_by: None,
            used_at: None,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    pub fn is_used(&self) -> bool {
        self.used_by.is_some()
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TeacherCodeResponse {
    pub code: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub expired: bool,
    pub used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_by: Option<String>,
}

impl TeacherCodeResponse {
    pub fn from_code(code: TeacherCode, now: i64) -> Self {
        TeacherCodeResponse {
            expired: code.is_expired(now),
            used: code.is_used(),
            code: code.code,
            created_at: code.created_at,
            expires_at: code.expires_at,
            used_by: code.used_by,
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LinkRequest {
    pub code: String,
}

/// Gera um código a partir dos bytes aleatórios de um UUID v4.
/// 256 é múltiplo de 32, então o módulo não enviesa o alfabeto.
pub fn generate_code() -> String {
    let uuid = uuid::Uuid::new_v4();
    uuid.as_bytes()
        .iter()
        .take(CODE_LEN)
        .map(|b| CODE_ALPHABET[(*b as usize) % CODE_ALPHABET.len()] as char)
        .collect()
}

/// Normaliza o código digitado pelo aluno
pub fn normalize_code(input: &str) -> Result<String, AppError> {
    let code: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect::<String>()
        .to_uppercase();

    if code.len() != CODE_LEN || !code.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
        return Err(AppError::InvalidRequest("Invalid teacher code format".to_string()));
    }
    Ok(code)
}
