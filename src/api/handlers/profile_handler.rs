//! Profile image handlers.

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Json},
    routing::put,
    Router,
};
use utoipa::ToSchema;

use crate::api::extractors::Subject;
use crate::api::middleware::require_ownership;
use crate::api::AppState;
use crate::config::MAX_PROFILE_UPLOAD_BYTES;
use crate::errors::{AppError, AppResult};
use crate::types::{Created, MessageResponse};

/// Name of the multipart field carrying the image
const UPLOAD_FIELD: &str = "file";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Multipart body of a profile upload
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ProfileUpload {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

/// Create profile routes (all behind the access guard)
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/:username/profile",
            put(upload_profile).get(get_profile).delete(delete_profile),
        )
        // Leave room for the multipart framing around the file itself
        .layer(DefaultBodyLimit::max(MAX_PROFILE_UPLOAD_BYTES + 64 * 1024))
}

struct Upload {
    filename: Option<String>,
    content_type: String,
    bytes: Vec<u8>,
}

/// Pull the `file` field out of a multipart body, ignoring other fields.
async fn read_upload(multipart: &mut Multipart) -> AppResult<Upload> {
    let too_large = |e: axum::extract::multipart::MultipartError| {
        tracing::debug!(error = %e, "multipart read failed");
        AppError::BadRequest(e.body_text())
    };

    while let Some(field) = multipart.next_field().await.map_err(too_large)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_owned);
        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_owned();
        let bytes = field.bytes().await.map_err(too_large)?;
        if bytes.len() > MAX_PROFILE_UPLOAD_BYTES {
            return Err(AppError::BadRequest("File is too large".into()));
        }

        return Ok(Upload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(AppError::BadRequest("File upload is required".into()))
}

/// Upload or replace your profile image
#[utoipa::path(
    put,
    path = "/api/v1/users/{username}/profile",
    tag = "Profiles",
    security(("bearer_auth" = [])),
    params(("username" = String, Path, description = "Username")),
    request_body(content = ProfileUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Profile uploaded", body = MessageResponse),
        (status = 400, description = "Missing or oversized file"),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn upload_profile(
    State(state): State<AppState>,
    subject: Subject,
    Path(username): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Created<MessageResponse>> {
    require_ownership(&subject, &username)?;
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let upload = read_upload(&mut multipart).await?;
    state
        .user_service
        .upload_profile(&username, upload.filename, upload.content_type, upload.bytes)
        .await?;

    Ok(Created(MessageResponse::new("Profile uploaded successfully")))
}

/// Download a user's profile image
#[utoipa::path(
    get,
    path = "/api/v1/users/{username}/profile",
    tag = "Profiles",
    security(("bearer_auth" = [])),
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Image bytes with the stored content type"),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "User or profile not found")
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    _subject: Subject,
    Path(username): Path<String>,
) -> AppResult<impl IntoResponse> {
    let object = state.user_service.get_profile(&username).await?;
    Ok(([(header::CONTENT_TYPE, object.content_type)], object.bytes))
}

/// Delete your profile image
#[utoipa::path(
    delete,
    path = "/api/v1/users/{username}/profile",
    tag = "Profiles",
    security(("bearer_auth" = [])),
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "Profile deleted", body = MessageResponse),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "User or profile not found")
    )
)]
pub async fn delete_profile(
    State(state): State<AppState>,
    subject: Subject,
    Path(username): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    require_ownership(&subject, &username)?;
    state.user_service.delete_profile(&username).await?;

    Ok(Json(MessageResponse::new("Profile deleted successfully")))
}
