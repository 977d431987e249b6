use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;

pub const USERS: &str = "users";
pub const QUESTIONS: &str = "questions";
pub const COMMENTS: &str = "comments";
pub const CHAT_MESSAGES: &str = "chat_messages";
pub const TEACHER_CODES: &str = "teacher_codes";
pub const TEACHER_STUDENTS: &str = "teacher_students";
pub const QUIZ_RESULTS: &str = "quiz_results";

const DEFAULT_DB_NAME: &str = "aprender_em_movimento";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.app_name = Some("aprender-em-movimento-api".to_string());
        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;
        let db = client.database(&database_name_from_uri(uri));

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Cria os índices usados pelas consultas pontuais e pelas restrições de unicidade
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        self.create_index(USERS, doc! { "email": 1 }, true).await?;
        self.create_index(USERS, doc! { "user_id": 1 }, true).await?;
        self.create_index(QUESTIONS, doc! { "created_by": 1 }, false).await?;
        self.create_index(QUESTIONS, doc! { "theme": 1, "visibility": 1 }, false).await?;
        self.create_index(COMMENTS, doc! { "question_id": 1, "created_at": 1 }, false).await?;
        self.create_index(
            CHAT_MESSAGES,
            doc! { "sender_id": 1, "receiver_id": 1, "created_at": 1 },
            false,
        )
        .await?;
        self.create_index(TEACHER_CODES, doc! { "teacher_id": 1 }, true).await?;
        self.create_index(TEACHER_CODES, doc! { "code": 1 }, true).await?;
        self.create_index(TEACHER_STUDENTS, doc! { "link_id": 1 }, true).await?;
        self.create_index(TEACHER_STUDENTS, doc! { "student_id": 1 }, false).await?;
        self.create_index(TEACHER_STUDENTS, doc! { "teacher_id": 1 }, false).await?;
        self.create_index(QUIZ_RESULTS, doc! { "student_id": 1, "created_at": -1 }, false).await?;

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    async fn create_index(
        &self,
        collection: &str,
        keys: Document,
        unique: bool,
    ) -> Result<(), Box<dyn Error>> {
        let description = format!("{}({})", collection, keys.keys().cloned().collect::<Vec<_>>().join(", "));
        let options = IndexOptions::builder().unique(unique).build();
        let index = IndexModel::builder().keys(keys).options(options).build();

        match self.collection::<Document>(collection).create_index(index).await {
            Ok(_) => log::info!("   ✅ Index created: {}", description),
            Err(e) => log::debug!("   ℹ️  Index already exists: {} ({})", description, e),
        }

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    /// Check if the connection is healthy
    pub async fn health_check(&self) -> bool {
        self.db.run_command(doc! { "ping": 1 }).await.is_ok()
    }
}

/// Extrai o nome do banco do path da URI (`mongodb://host/<db>?opts`)
fn database_name_from_uri(uri: &str) -> String {
    let without_scheme = uri.splitn(2, "://").nth(1).unwrap_or(uri);

    without_scheme
        .splitn(2, '/')
        .nth(1)
        .and_then(|path| path.split('?').next())
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DB_NAME)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name_from_uri() {
        assert_eq!(database_name_from_uri("mongodb://localhost:27017/escola"), "escola");
        assert_eq!(
            database_name_from_uri("mongodb+srv://u:p@cluster.mongodb.net/escola?retryWrites=true"),
            "escola"
        );
        assert_eq!(database_name_from_uri("mongodb://localhost:27017"), DEFAULT_DB_NAME);
        assert_eq!(database_name_from_uri("mongodb://localhost:27017/?tls=true"), DEFAULT_DB_NAME);
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_mongodb_connection() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/aprender_test".to_string());

        let db = MongoDB::new(&uri).await;
        assert!(db.is_ok());
        assert!(db.unwrap().health_check().await);
    }
}
