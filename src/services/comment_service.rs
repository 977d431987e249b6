use crate::{
    database::{self, MongoDB},
    middleware::auth::Claims,
    models::{
        build_threads, normalize_comment_text, Comment, CommentResponse, CommentThread,
        CreateCommentRequest,
    },
    services::question_service,
    utils::{now_ms, AppError},
};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;

pub async fn add_comment(
    db: &MongoDB,
    author: &Claims,
    question_id: &str,
    request: CreateCommentRequest,
) -> Result<CommentResponse, AppError> {
    let text = normalize_comment_text(&request.text)?;
    let question = question_service::find_visible_question(db, author, question_id).await?;
    let question_id = question.id_hex();
    let comments = db.collection::<Comment>(database::COMMENTS);

    // Respostas só penduram em comentários raiz da mesma questão
    let parent_id = match request.parent_id.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(parent) => {
            let parent_oid = question_service::parse_object_id(parent, "comment")?;
            let parent = comments
                .find_one(doc! { "_id": parent_oid, "question_id": &question_id })
                .await?
                .ok_or_else(|| {
                    AppError::InvalidRequest(
                        "Parent comment must be a root comment of this question".to_string(),
                    )
                })?;

            if !parent.is_root() {
                return Err(AppError::InvalidRequest("Cannot reply to a reply".to_string()));
            }
            Some(parent.id_hex())
        }
        None => None,
    };

    let mut comment = Comment {
        id: None,
        question_id,
        author_id: author.sub.clone(),
        author_name: author.name.clone(),
        author_role: author.role,
        text,
        parent_id,
        created_at: now_ms(),
    };

    let result = comments.insert_one(&comment).await?;
    comment.id = result.inserted_id.as_object_id();

    log::info!("💬 {} commented on question {}", author.sub, comment.question_id);

    Ok(CommentResponse::from(comment))
}

pub async fn list_threads(db: &MongoDB, viewer: &Claims, question_id: &str) -> Result<Vec<CommentThread>, AppError> {
    let question = question_service::find_visible_question(db, viewer, question_id).await?;

    let comments: Vec<Comment> = db
        .collection::<Comment>(database::COMMENTS)
        .find(doc! { "question_id": question.id_hex() })
        .await?
        .try_collect()
        .await?;

    Ok(build_threads(comments))
}

/// Remove um comentário (autor ou dono da questão). Apagar a raiz leva junto as respostas.
pub async fn delete_comment(db: &MongoDB, user: &Claims, comment_id: &str) -> Result<(), AppError> {
    let oid = question_service::parse_object_id(comment_id, "comment")?;
    let comments = db.collection::<Comment>(database::COMMENTS);

    let comment = comments
        .find_one(doc! { "_id": oid })
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;

    if comment.author_id != user.sub {
        let question = question_service::find_question(db, &comment.question_id).await?;
        if question.created_by != user.sub {
            return Err(AppError::Forbidden("You cannot delete this comment".to_string()));
        }
    }

    comments.delete_one(doc! { "_id": oid }).await?;

    if comment.is_root() {
        let replies = comments
            .delete_many(doc! { "parent_id": comment.id_hex() })
            .await?;
        log::debug!("🧹 Removed {} replies of comment {}", replies.deleted_count, comment.id_hex());
    }

    log::info!("🗑️ Comment {} deleted by {}", comment.id_hex(), user.sub);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateQuestionRequest, Role};
    use mongodb::bson::oid::ObjectId;

    async fn test_db() -> MongoDB {
        dotenv::dotenv().ok();
        let uri = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/aprender_test".to_string());
        MongoDB::new(&uri).await.unwrap()
    }

    fn claims(role: Role) -> Claims {
        Claims {
            sub: ObjectId::new().to_hex(),
            email: "user@escola.br".into(),
            name: "Usuária".into(),
            role,
            iat: 0,
            exp: usize::MAX,
            jti: "jti".into(),
            aud: "aprender-api".into(),
            iss: "aprender-em-movimento".into(),
        }
    }

    async fn public_question(db: &MongoDB, teacher: &Claims) -> String {
        let request = CreateQuestionRequest {
            theme: "Ciências".into(),
            text: "Qual planeta é o maior?".into(),
            options: vec!["Terra".into(), "Júpiter".into()],
            correct_index: 1,
            visibility: None,
            explanation: None,
        };
        question_service::create_question(db, teacher, request).await.unwrap().id
    }

    fn comment(text: &str, parent_id: Option<String>) -> CreateCommentRequest {
        CreateCommentRequest { text: text.into(), parent_id }
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_reply_parent_from_other_question_is_rejected() {
        let db = test_db().await;
        let teacher = claims(Role::Teacher);
        let student = claims(Role::Student);
        let q1 = public_question(&db, &teacher).await;
        let q2 = public_question(&db, &teacher).await;

        let root_on_q2 = add_comment(&db, &student, &q2, comment("dúvida", None)).await.unwrap();

        let err = add_comment(&db, &student, &q1, comment("resposta", Some(root_on_q2.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let missing = add_comment(&db, &student, &q1, comment("resposta", Some(ObjectId::new().to_hex())))
            .await
            .unwrap_err();
        assert!(matches!(missing, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_threads_are_one_level_deep() {
        let db = test_db().await;
        let teacher = claims(Role::Teacher);
        let student = claims(Role::Student);
        let question = public_question(&db, &teacher).await;

        let root = add_comment(&db, &student, &question, comment("dúvida", None)).await.unwrap();
        let reply = add_comment(&db, &teacher, &question, comment("veja a aula 3", Some(root.id.clone())))
            .await
            .unwrap();
        assert_eq!(reply.author_role, Role::Teacher);

        let nested = add_comment(&db, &student, &question, comment("obrigada", Some(reply.id)))
            .await
            .unwrap_err();
        assert!(matches!(nested, AppError::InvalidRequest(_)));

        let threads = list_threads(&db, &student, &question).await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].comment.id, root.id);
        assert_eq!(threads[0].responses.len(), 1);
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_delete_permissions_and_reply_cascade() {
        let db = test_db().await;
        let teacher = claims(Role::Teacher);
        let student = claims(Role::Student);
        let stranger = claims(Role::Student);
        let question = public_question(&db, &teacher).await;

        let root = add_comment(&db, &student, &question, comment("dúvida", None)).await.unwrap();
        add_comment(&db, &stranger, &question, comment("também", Some(root.id.clone())))
            .await
            .unwrap();

        let err = delete_comment(&db, &stranger, &root.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // Dono da questão pode moderar
        delete_comment(&db, &teacher, &root.id).await.unwrap();

        let remaining = db
            .collection::<Comment>(database::COMMENTS)
            .count_documents(doc! { "question_id": &question })
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
