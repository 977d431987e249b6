pub mod auth_service;
pub mod chat_service;
pub mod comment_service;
pub mod link_service;
pub mod question_service;
pub mod quiz_service;
