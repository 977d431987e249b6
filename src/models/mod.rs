pub mod user;
pub mod question;
pub mod comment;
pub mod chat_message;
pub mod teacher_code;
pub mod teacher_student;
pub mod quiz_result;

pub use user::*;
pub use question::*;
pub use comment::*;
pub use chat_message::*;
pub use teacher_code::*;
pub use teacher_student::*;
pub use quiz_result::*;
