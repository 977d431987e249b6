use crate::models::Role;
use crate::utils::AppError;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const MAX_COMMENT_LEN: usize = 1000;

/// Comentário de uma questão. Respostas têm `parent_id`; só existe um nível
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub question_id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_role: Role,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_id: Option<String>,
    pub created_at: i64,
}

impl Comment {
    pub fn id_hex(&self) -> String {
        self.id.map(|id| id.to_hex()).unwrap_or_default()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub text: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub question_id: String,
    pub author_id: String,
    pub author_name: String,
    pub author_role: Role,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: i64,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        CommentResponse {
            id: comment.id_hex(),
            question_id: comment.question_id,
            author_id: comment.author_id,
            author_name: comment.author_name,
            author_role: comment.author_role,
            text: comment.text,
            parent_id: comment.parent_id,
            created_at: comment.created_at,
        }
    }
}

/// Comentário raiz com suas respostas
#[derive(Debug, Serialize)]
pub struct CommentThread {
    #[serde(flatten)]
    pub comment: CommentResponse,
    pub responses: Vec<CommentResponse>,
}

pub fn normalize_comment_text(text: &str) -> Result<String, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::InvalidRequest("Comment text is required".to_string()));
    }
    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::InvalidRequest(format!(
            "Comment must have at most {} characters",
            MAX_COMMENT_LEN
        )));
    }
    Ok(text.to_string())
}

/// Agrupa os comentários de uma questão em threads, mais antigos primeiro.
/// Respostas cujo pai não está na lista são descartadas.
pub fn build_threads(mut comments: Vec<Comment>) -> Vec<CommentThread> {
    comments.sort_by_key(|c| c.created_at);

    let (roots, responses): (Vec<Comment>, Vec<Comment>) =
        comments.into_iter().partition(Comment::is_root);

    let mut threads: Vec<CommentThread> = roots
        .into_iter()
        .map(|root| CommentThread {
            comment: CommentResponse::from(root),
            responses: Vec::new(),
        })
        .collect();

    for response in responses {
        let parent = response.parent_id.as_deref().unwrap_or_default();
        if let Some(thread) = threads.iter_mut().find(|t| t.comment.id == parent) {
            thread.responses.push(CommentResponse::from(response));
        }
    }

    threads
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: ObjectId, parent: Option<ObjectId>, created_at: i64) -> Comment {
        Comment {
            id: Some(id),
            question_id: "q1".into(),
            author_id: "u1".into(),
            author_name: "Ana".into(),
            author_role: Role::Student,
            text: format!("comentário {}", created_at),
            parent_id: parent.map(|p| p.to_hex()),
            created_at,
        }
    }

    #[test]
    fn test_build_threads_groups_and_orders() {
        let root_a = ObjectId::new();
        let root_b = ObjectId::new();
        let orphan_parent = ObjectId::new();

        let comments = vec![
            comment(ObjectId::new(), Some(root_a), 40),
            comment(root_b, None, 20),
            comment(ObjectId::new(), Some(root_a), 30),
            comment(root_a, None, 10),
            comment(ObjectId::new(), Some(orphan_parent), 50),
        ];

        let threads = build_threads(comments);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].comment.id, root_a.to_hex());
        assert_eq!(threads[1].comment.id, root_b.to_hex());

        let times: Vec<i64> = threads[0].responses.iter().map(|r| r.created_at).collect();
        assert_eq!(times, vec![30, 40]);
        assert!(threads[1].responses.is_empty());
    }

    #[test]
    fn test_thread_serializes_flat() {
        let threads = build_threads(vec![comment(ObjectId::new(), None, 1)]);
        let json = serde_json::to_value(&threads[0]).unwrap();
        assert_eq!(json["text"], "comentário 1");
        assert!(json["responses"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_comment_text("  boa questão ").unwrap(), "boa questão");
        assert!(normalize_comment_text("   ").is_err());
        assert!(normalize_comment_text(&"a".repeat(MAX_COMMENT_LEN + 1)).is_err());
        assert!(normalize_comment_text(&"á".repeat(MAX_COMMENT_LEN)).is_ok());
    }
}
