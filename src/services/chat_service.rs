use crate::{
    database::{self, MongoDB},
    middleware::auth::Claims,
    models::{
        conversation_filter, normalize_message_text, ChatContact, ChatMessage,
        ChatMessageResponse, MessagesQuery, SendMessageRequest,
    },
    services::link_service,
    utils::{now_ms, AppError},
};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;

async fn ensure_linked(db: &MongoDB, user_id: &str, other_id: &str) -> Result<(), AppError> {
    if user_id == other_id {
        return Err(AppError::InvalidRequest("Cannot chat with yourself".to_string()));
    }
    if !link_service::are_linked(db, user_id, other_id).await? {
        return Err(AppError::Forbidden("Chat is only available between linked users".to_string()));
    }
    Ok(())
}

pub async fn send_message(
    db: &MongoDB,
    sender: &Claims,
    request: SendMessageRequest,
) -> Result<ChatMessageResponse, AppError> {
    let text = normalize_message_text(&request.text)?;
    let receiver_id = request.receiver_id.trim().to_string();
    ensure_linked(db, &sender.sub, &receiver_id).await?;

    let mut message = ChatMessage {
        id: None,
        sender_id: sender.sub.clone(),
        receiver_id,
        text,
        created_at: now_ms(),
        read: false,
    };

    let result = db
        .collection::<ChatMessage>(database::CHAT_MESSAGES)
        .insert_one(&message)
        .await?;
    message.id = result.inserted_id.as_object_id();

    log::debug!("✉️ Message {} -> {}", message.sender_id, message.receiver_id);

    Ok(ChatMessageResponse::from(message))
}

/// Mensagens da conversa em ordem cronológica.
/// Sem `since` devolve as mais recentes; com `since` só as posteriores a ele.
/// As recebidas pelo usuário ficam marcadas como lidas.
pub async fn fetch_conversation(
    db: &MongoDB,
    user: &Claims,
    other_id: &str,
    query: &MessagesQuery,
) -> Result<Vec<ChatMessageResponse>, AppError> {
    ensure_linked(db, &user.sub, other_id).await?;

    let collection = db.collection::<ChatMessage>(database::CHAT_MESSAGES);
    let filter = conversation_filter(&user.sub, other_id, query.since);

    let mut messages: Vec<ChatMessage> = match query.since {
        Some(_) => {
            collection
                .find(filter)
                .sort(doc! { "created_at": 1 })
                .limit(query.page_size())
                .await?
                .try_collect()
                .await?
        }
        None => {
            let mut latest: Vec<ChatMessage> = collection
                .find(filter)
                .sort(doc! { "created_at": -1 })
                .limit(query.page_size())
                .await?
                .try_collect()
                .await?;
            latest.reverse();
            latest
        }
    };

    let unread: Vec<_> = messages
        .iter()
        .filter(|m| m.receiver_id == user.sub && !m.read)
        .filter_map(|m| m.id)
        .collect();

    if !unread.is_empty() {
        collection
            .update_many(doc! { "_id": { "$in": unread } }, doc! { "$set": { "read": true } })
            .await?;

        for message in messages.iter_mut().filter(|m| m.receiver_id == user.sub) {
            message.read = true;
        }
    }

    Ok(messages.into_iter().map(ChatMessageResponse::from).collect())
}

/// Usuários vinculados com a última mensagem e o total não lido de cada conversa
pub async fn list_contacts(db: &MongoDB, user: &Claims) -> Result<Vec<ChatContact>, AppError> {
    let collection = db.collection::<ChatMessage>(database::CHAT_MESSAGES);
    let users = link_service::list_counterparts(db, &user.sub, user.role).await?;

    let mut contacts = Vec::with_capacity(users.len());
    for other in users {
        let last_message = collection
            .find_one(conversation_filter(&user.sub, &other.id, None))
            .sort(doc! { "created_at": -1 })
            .await?
            .map(ChatMessageResponse::from);

        let unread = collection
            .count_documents(doc! { "sender_id": &other.id, "receiver_id": &user.sub, "read": false })
            .await?;

        contacts.push(ChatContact { user: other, last_message, unread });
    }

    // Conversas mais recentes primeiro; contatos sem mensagens no fim
    contacts.sort_by_key(|c| std::cmp::Reverse(c.last_message.as_ref().map(|m| m.created_at)));

    Ok(contacts)
}
