use crate::{
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    utils::file_store::{FileKind, FileStore},
};
use actix_web::{HttpResponse, http::header, web};
use std::str::FromStr;

/// Serves a stored photo or leave attachment to HR.
#[utoipa::path(
    get,
    path = "/api/files/{kind}/{name}",
    params(
        ("kind" = String, Path, description = "check_in, check_out or attachment"),
        ("name" = String, Path, description = "Stored file name")
    ),
    responses(
        (status = 200, description = "File content with its image or PDF content type"),
        (status = 400, description = "Unknown kind or invalid name"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Files"
)]
pub async fn get_file(
    auth: AuthUser,
    store: web::Data<FileStore>,
    path: web::Path<(String, String)>,
) -> AppResult<HttpResponse> {
    auth.require_hr_or_admin()?;

    let (kind, name) = path.into_inner();
    let kind = FileKind::from_str(&kind)
        .map_err(|_| AppError::BadRequest(format!("Unknown file kind '{kind}'")))?;

    let file_path = store.resolve(kind, &name)?;
    let (bytes, content_type) = store.read(file_path).await?;

    Ok(HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, content_type))
        .insert_header((header::CACHE_CONTROL, "private, max-age=3600"))
        .body(bytes))
}
