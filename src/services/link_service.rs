use crate::{
    database::{self, MongoDB},
    models::{
        generate_code, link_id, normalize_code, Role, TeacherCode, TeacherCodeResponse,
        TeacherStudent, User, UserInfo,
    },
    utils::{is_duplicate_key, now_ms, AppError},
};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, to_document};
use mongodb::options::ReturnDocument;

const MAX_CODE_ATTEMPTS: usize = 5;

/// Gera (ou substitui) o código ativo do professor
pub async fn generate_teacher_code(
    db: &MongoDB,
    teacher_id: &str,
    ttl_hours: i64,
) -> Result<TeacherCodeResponse, AppError> {
    let collection = db.collection::<TeacherCode>(database::TEACHER_CODES);

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let now = now_ms();
        let code = TeacherCode::new(teacher_id, generate_code(), now, ttl_hours);

        // Upsert por teacher_id: sempre um único código por professor
        let result = collection
            .find_one_and_replace(doc! { "teacher_id": teacher_id }, &code)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await;

        match result {
            Ok(saved) => {
                let saved = saved.unwrap_or(code);
                log::info!("🎟️ Teacher {} generated code {}", teacher_id, saved.code);
                return Ok(TeacherCodeResponse::from_code(saved, now));
            }
            Err(e) if is_duplicate_key(&e) => {
                log::debug!("🔁 Code collision on attempt {}, retrying", attempt);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal("Could not generate a unique code".to_string()))
}

pub async fn get_teacher_code(db: &MongoDB, teacher_id: &str) -> Result<TeacherCodeResponse, AppError> {
    db.collection::<TeacherCode>(database::TEACHER_CODES)
        .find_one(doc! { "teacher_id": teacher_id })
        .await?
        .map(|code| TeacherCodeResponse::from_code(code, now_ms()))
        .ok_or_else(|| AppError::NotFound("No active code".to_string()))
}

/// Aluno resgata o código do professor e os dois ficam vinculados
pub async fn link_with_code(db: &MongoDB, student_id: &str, raw_code: &str) -> Result<TeacherStudent, AppError> {
    let code = normalize_code(raw_code)?;
    let codes = db.collection::<TeacherCode>(database::TEACHER_CODES);
    let now = now_ms();

    let existing = codes
        .find_one(doc! { "code": &code })
        .await?
        .ok_or_else(|| AppError::NotFound("Teacher code not found".to_string()))?;

    if existing.is_expired(now) {
        return Err(AppError::Gone("Code expired".to_string()));
    }
    if is_linked(db, &existing.teacher_id, student_id).await? {
        return Err(AppError::Conflict("Already linked to this teacher".to_string()));
    }
    // Uso único, inclusive para quem já resgatou e foi desvinculado
    if existing.is_used() {
        return Err(AppError::Conflict("Code already used".to_string()));
    }

    // Só um aluno vence a disputa pelo mesmo código
    let claimed = codes
        .find_one_and_update(
            doc! {
                "code": &code,
                "expires_at": { "$gt": now },
                "used_by": null
            },
            doc! { "$set": { "used_by": student_id, "used_at": now } },
        )
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::Conflict("Code already used".to_string()))?;

    let link = TeacherStudent::new(&claimed.teacher_id, student_id, now);
    db.collection::<TeacherStudent>(database::TEACHER_STUDENTS)
        .update_one(
            doc! { "link_id": &link.link_id },
            doc! { "$setOnInsert": to_document(&link)? },
        )
        .upsert(true)
        .await?;

    log::info!("🔗 Student {} linked to teacher {}", student_id, claimed.teacher_id);

    Ok(link)
}

pub async fn is_linked(db: &MongoDB, teacher_id: &str, student_id: &str) -> Result<bool, AppError> {
    let found = db
        .collection::<TeacherStudent>(database::TEACHER_STUDENTS)
        .find_one(doc! { "link_id": link_id(teacher_id, student_id) })
        .await?;
    Ok(found.is_some())
}

/// Verifica o vínculo entre dois usuários em qualquer direção (professor/aluno)
pub async fn are_linked(db: &MongoDB, a: &str, b: &str) -> Result<bool, AppError> {
    Ok(is_linked(db, a, b).await? || is_linked(db, b, a).await?)
}

pub async fn linked_teacher_ids(db: &MongoDB, student_id: &str) -> Result<Vec<String>, AppError> {
    let links: Vec<TeacherStudent> = db
        .collection::<TeacherStudent>(database::TEACHER_STUDENTS)
        .find(doc! { "student_id": student_id })
        .await?
        .try_collect()
        .await?;
    Ok(links.into_iter().map(|l| l.teacher_id).collect())
}

pub async fn linked_student_ids(db: &MongoDB, teacher_id: &str) -> Result<Vec<String>, AppError> {
    let links: Vec<TeacherStudent> = db
        .collection::<TeacherStudent>(database::TEACHER_STUDENTS)
        .find(doc! { "teacher_id": teacher_id })
        .await?
        .try_collect()
        .await?;
    Ok(links.into_iter().map(|l| l.student_id).collect())
}

/// Ids dos usuários do outro lado dos vínculos, conforme o papel
pub async fn counterpart_ids(db: &MongoDB, user_id: &str, role: Role) -> Result<Vec<String>, AppError> {
    match role {
        Role::Teacher => linked_student_ids(db, user_id).await,
        Role::Student => linked_teacher_ids(db, user_id).await,
    }
}

pub async fn list_counterparts(db: &MongoDB, user_id: &str, role: Role) -> Result<Vec<UserInfo>, AppError> {
    let ids = counterpart_ids(db, user_id, role).await?;
    find_users(db, &ids).await
}

pub async fn unlink(db: &MongoDB, teacher_id: &str, student_id: &str) -> Result<(), AppError> {
    let result = db
        .collection::<TeacherStudent>(database::TEACHER_STUDENTS)
        .delete_one(doc! { "link_id": link_id(teacher_id, student_id) })
        .await?;

    if result.deleted_count == 0 {
        return Err(AppError::NotFound("Link not found".to_string()));
    }

    log::info!("✂️ Unlinked teacher {} and student {}", teacher_id, student_id);
    Ok(())
}

pub async fn find_users(db: &MongoDB, ids: &[String]) -> Result<Vec<UserInfo>, AppError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut users: Vec<UserInfo> = db
        .collection::<User>(database::USERS)
        .find(doc! { "user_id": { "$in": ids.to_vec() } })
        .await?
        .map_ok(UserInfo::from)
        .try_collect()
        .await?;

    users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(users)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> MongoDB {
        dotenv::dotenv().ok();
        let uri = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/aprender_test".to_string());
        MongoDB::new(&uri).await.unwrap()
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_code_is_single_use() {
        let db = test_db().await;
        let teacher = bson_id();
        let first = bson_id();
        let second = bson_id();

        let code = generate_teacher_code(&db, &teacher, 1).await.unwrap();
        assert!(!code.used);

        let link = link_with_code(&db, &first, &code.code).await.unwrap();
        assert_eq!(link.teacher_id, teacher);
        assert!(is_linked(&db, &teacher, &first).await.unwrap());
        assert!(are_linked(&db, &first, &teacher).await.unwrap());

        let err = link_with_code(&db, &second, &code.code).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_unlinked_student_cannot_reuse_code() {
        let db = test_db().await;
        let teacher = bson_id();
        let student = bson_id();

        let code = generate_teacher_code(&db, &teacher, 1).await.unwrap();
        link_with_code(&db, &student, &code.code).await.unwrap();
        unlink(&db, &teacher, &student).await.unwrap();

        let err = link_with_code(&db, &student, &code.code).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(!is_linked(&db, &teacher, &student).await.unwrap());
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_expired_code_is_gone() {
        let db = test_db().await;
        let teacher = bson_id();

        let expired = TeacherCode::new(&teacher, generate_code(), now_ms() - 10_000, 0);
        db.collection::<TeacherCode>(database::TEACHER_CODES)
            .insert_one(&expired)
            .await
            .unwrap();

        let err = link_with_code(&db, &bson_id(), &expired.code).await.unwrap_err();
        assert!(matches!(err, AppError::Gone(_)));
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn test_new_code_replaces_previous() {
        let db = test_db().await;
        let teacher = bson_id();

        let first = generate_teacher_code(&db, &teacher, 1).await.unwrap();
        let second = generate_teacher_code(&db, &teacher, 1).await.unwrap();
        assert_eq!(get_teacher_code(&db, &teacher).await.unwrap().code, second.code);

        if first.code != second.code {
            let err = link_with_code(&db, &bson_id(), &first.code).await.unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        }
    }

    fn bson_id() -> String {
        mongodb::bson::oid::ObjectId::new().to_hex()
    }
}
