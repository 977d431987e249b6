use actix_web::{web, HttpResponse};
use crate::{
    config::Config,
    database::MongoDB,
    middleware::auth::Claims,
    models::{LinkRequest, TeacherCodeResponse, UserInfo},
    services::{auth_service, link_service},
    utils::AppError,
};

#[utoipa::path(
    post,
    path = "/api/v1/teacher/code",
    tag = "Links",
    responses(
        (status = 201, description = "New invite code", body = TeacherCodeResponse),
        (status = 403, description = "Only teachers have invite codes")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn generate_code(
    db: web::Data<MongoDB>,
    config: web::Data<Config>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("🎟️ POST /teacher/code - teacher: {}", claims.sub);

    claims.require_teacher()?;
    let code = link_service::generate_teacher_code(&db, &claims.sub, config.teacher_code_ttl_hours).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "code": code
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/teacher/code",
    tag = "Links",
    responses(
        (status = 200, description = "Current invite code", body = TeacherCodeResponse),
        (status = 404, description = "No code generated yet")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_code(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("🎟️ GET /teacher/code - teacher: {}", claims.sub);

    claims.require_teacher()?;
    let code = link_service::get_teacher_code(&db, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "code": code
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/student/link",
    tag = "Links",
    request_body = LinkRequest,
    responses(
        (status = 200, description = "Linked to the teacher", body = UserInfo),
        (status = 404, description = "Unknown code"),
        (status = 409, description = "Code already used or already linked"),
        (status = 410, description = "Code expired")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn link_student(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    request: web::Json<LinkRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔗 POST /student/link - student: {}", claims.sub);

    claims.require_student()?;
    let link = match link_service::link_with_code(&db, &claims.sub, &request.code).await {
        Ok(link) => link,
        Err(e) => {
            log::warn!("❌ Link failed for {}: {}", claims.sub, e);
            return Err(e);
        }
    };

    let teacher = auth_service::find_user(&db, &link.teacher_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "teacher": UserInfo::from(teacher),
        "linked_at": link.created_at
    })))
}

pub async fn list_students(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("👥 GET /teacher/students - teacher: {}", claims.sub);

    claims.require_teacher()?;
    let students = link_service::list_counterparts(&db, &claims.sub, claims.role).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": students.len(),
        "students": students
    })))
}

pub async fn remove_student(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let student_id = path.into_inner();
    log::info!("✂️ DELETE /teacher/students/{} - teacher: {}", student_id, claims.sub);

    claims.require_teacher()?;
    link_service::unlink(&db, &claims.sub, &student_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Student unlinked"
    })))
}

pub async fn list_teachers(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AppError> {
    log::info!("👥 GET /student/teachers - student: {}", claims.sub);

    claims.require_student()?;
    let teachers = link_service::list_counterparts(&db, &claims.sub, claims.role).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "count": teachers.len(),
        "teachers": teachers
    })))
}

pub async fn remove_teacher(
    db: web::Data<MongoDB>,
    claims: web::ReqData<Claims>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let teacher_id = path.into_inner();
    log::info!("✂️ DELETE /student/teachers/{} - student: {}", teacher_id, claims.sub);

    claims.require_student()?;
    link_service::unlink(&db, &teacher_id, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Teacher unlinked"
    })))
}
