use crate::models::UserInfo;
use crate::utils::AppError;
use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};

pub const MAX_MESSAGE_LEN: usize = 2000;
pub const DEFAULT_PAGE: i64 = 100;
pub const MAX_PAGE: i64 = 500;

/// Mensagem direta entre aluno e professor vinculados
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
    /// Unix timestamp em milissegundos (o cliente usa como cursor de polling)
    pub created_at: i64,
    #[serde(default)]
    pub read: bool,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub since: Option<i64>,
    pub limit: Option<i64>,
}

impl MessagesQuery {
    pub fn page_size(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageResponse {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub text: String,
    pub created_at: i64,
    pub read: bool,
}

impl From<ChatMessage> for ChatMessageResponse {
    fn from(message: ChatMessage) -> Self {
        ChatMessageResponse {
            id: message.id.map(|id| id.to_hex()).unwrap_or_default(),
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            text: message.text,
            created_at: message.created_at,
            read: message.read,
        }
    }
}

/// Contato da lista de conversas
#[derive(Debug, Serialize)]
pub struct ChatContact {
    pub user: UserInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<ChatMessageResponse>,
    pub unread: u64,
}

pub fn normalize_message_text(text: &str) -> Result<String, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidRequest("Message text is required".to_string()));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Message must have at most {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    Ok(text.to_string())
}

/// Filtro das mensagens trocadas entre `a` e `b`, nos dois sentidos
pub fn conversation_filter(a: &str, b: &str, since: Option<i64>) -> Document {
    let mut filter = doc! {
        "$or": [
            { "sender_id": a, "receiver_id": b },
            { "sender_id": b, "receiver_id": a }
        ]
    };
    if let Some(since) = since {
        filter.insert("created_at", doc! { "$gt": since });
    }
    filter
}
