// Utility functions
pub mod error;

pub use error::*;

/// Timestamp atual em milissegundos (todas as collections usam esta unidade)
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
