//! OpenAPI documentation configuration.
//!
//! Provides Swagger UI for API exploration and testing.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::{auth_handler, profile_handler, user_handler};
use crate::domain::UserResponse;
use crate::services::TokenResponse;
use crate::types::MessageResponse;

/// OpenAPI documentation for the User Account API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "User Account API",
        version = "0.1.0",
        description = "User accounts with ES384 bearer tokens, paged listing and profile images",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Authentication endpoints
        auth_handler::login,
        // User endpoints
        user_handler::create_user,
        user_handler::list_users,
        user_handler::get_user,
        user_handler::update_user,
        user_handler::delete_user,
        // Profile endpoints
        profile_handler::upload_profile,
        profile_handler::get_profile,
        profile_handler::delete_profile,
    ),
    components(
        schemas(
            UserResponse,
            MessageResponse,
            auth_handler::LoginRequest,
            TokenResponse,
            user_handler::CreateUserRequest,
            user_handler::UpdateUserRequest,
            user_handler::UserListResponse,
            profile_handler::ProfileUpload,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login"),
        (name = "Users", description = "User management operations"),
        (name = "Profiles", description = "Profile images")
    )
)]
pub struct ApiDoc;

/// Security scheme modifier for bearer authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "ES384-signed token obtained from /api/v1/users/login",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for expected in [
            "/api/v1/users/login",
            "/api/v1/users",
            "/api/v1/users/{username}",
            "/api/v1/users/{username}/profile",
        ] {
            assert!(paths.contains(&expected), "missing {}", expected);
        }
        assert!(doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer_auth")));
    }
}
