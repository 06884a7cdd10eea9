//! User handlers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::extractors::{Subject, ValidatedJson};
use crate::api::middleware::require_ownership;
use crate::api::AppState;
use crate::domain::UserResponse;
use crate::errors::{AppError, AppResult};
use crate::types::{Created, MessageResponse, PageRequest};

/// User creation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 64, message = "Username must be 1 to 64 characters"))]
    #[schema(example = "alice")]
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "SecurePass123!", min_length = 8)]
    pub password: String,
}

/// User update request. `username` must match the path.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[schema(example = "alice")]
    pub username: String,
    /// New password; omit to keep the current one
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

/// Pagination query
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersParams {
    /// Page size, 1 to 100 (default 20)
    pub limit: Option<u64>,
    /// Token from the previous page; empty or absent for the first page
    pub next_token: Option<String>,
}

impl From<ListUsersParams> for PageRequest {
    fn from(params: ListUsersParams) -> Self {
        PageRequest {
            limit: params.limit,
            next_token: params.next_token,
        }
    }
}

/// One page of users
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    /// Pass back as `next_token` for the next page; empty on the last page
    pub next_token: String,
}

/// Create user routes (all behind the access guard)
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user).get(list_users))
        .route("/:username", get(get_user).put(update_user).delete(delete_user))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Not authorized"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    _subject: Subject,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<Created<UserResponse>> {
    let user = state
        .user_service
        .create_user(&payload.username, &payload.password)
        .await?;

    Ok(Created(UserResponse::from(user)))
}

/// List users a page at a time
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(ListUsersParams),
    responses(
        (status = 200, description = "One page of users", body = UserListResponse),
        (status = 400, description = "Invalid pagination token"),
        (status = 401, description = "Not authorized")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    _subject: Subject,
    Query(params): Query<ListUsersParams>,
) -> AppResult<Json<UserListResponse>> {
    let page = state.user_service.list_users(&params.into()).await?;

    Ok(Json(UserListResponse {
        users: page.data.into_iter().map(UserResponse::from).collect(),
        next_token: page.next_token,
    }))
}

/// Get a user by username
#[utoipa::path(
    get,
    path = "/api/v1/users/{username}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    _subject: Subject,
    Path(username): Path<String>,
) -> AppResult<Json<UserResponse>> {
    let user = state.user_service.get_user(&username).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Update your own user
#[utoipa::path(
    put,
    path = "/api/v1/users/{username}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("username" = String, Path, description = "Username")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation error or username change"),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    subject: Subject,
    Path(username): Path<String>,
    body: Bytes,
) -> AppResult<Json<UserResponse>> {
    // Ownership is decided before the body is parsed
    require_ownership(&subject, &username)?;
    let ValidatedJson(payload) = ValidatedJson::<UpdateUserRequest>::from_bytes(&body)?;
    if payload.username != username {
        return Err(AppError::BadRequest("Username cannot be changed".into()));
    }

    let user = state
        .user_service
        .update_user(&username, payload.password)
        .await?;

    Ok(Json(UserResponse::from(user)))
}

/// Delete your own user
#[utoipa::path(
    delete,
    path = "/api/v1/users/{username}",
    tag = "Users",
    security(("bearer_auth" = [])),
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 401, description = "Not authorized"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    subject: Subject,
    Path(username): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    require_ownership(&subject, &username)?;
    state.user_service.delete_user(&username).await?;

    Ok(Json(MessageResponse::new("Successfully deleted")))
}
