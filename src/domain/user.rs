//! User domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{MAX_USERNAME_LENGTH, RESERVED_USERNAMES};
use crate::errors::{AppError, AppResult};

/// Check a username is usable as a storage key and an object-key prefix.
///
/// Allowed: ASCII letters, digits, `.`, `_` and `-`; not starting with `.`.
/// Names of static routes beside `/:username` are reserved.
pub fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() || username.len() > MAX_USERNAME_LENGTH as usize {
        return Err(AppError::validation(format!(
            "Username must be 1 to {} characters",
            MAX_USERNAME_LENGTH
        )));
    }

    let allowed = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !allowed || username.starts_with('.') {
        return Err(AppError::validation(
            "Username may only contain letters, digits, '.', '_' and '-'",
        ));
    }

    if RESERVED_USERNAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(username))
    {
        return Err(AppError::validation(format!(
            "Username '{}' is reserved",
            username
        )));
    }
    Ok(())
}

/// User domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Object-store key of the profile image, if one was uploaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with no profile image
    pub fn new(username: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            username,
            password_hash,
            profile_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the stored password hash
    pub fn set_password_hash(&mut self, password_hash: String) {
        self.password_hash = password_hash;
        self.updated_at = Utc::now();
    }

    /// Record or clear the profile image key
    pub fn set_profile_path(&mut self, profile_path: Option<String>) {
        self.profile_path = profile_path;
        self.updated_at = Utc::now();
    }

    pub fn has_profile(&self) -> bool {
        self.profile_path.is_some()
    }
}

/// User response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    /// Unique username
    #[schema(example = "alice")]
    pub username: String,
    /// Whether a profile image is stored
    #[schema(example = false)]
    pub has_profile: bool,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            has_profile: user.has_profile(),
            username: user.username,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_omits_password_hash() {
        let user = User::new("alice".into(), "$argon2id$secret".into());
        let json = serde_json::to_string(&UserResponse::from(user.clone())).unwrap();
        assert!(!json.contains("argon2"));

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn test_validate_username() {
        for ok in ["admin", "alice.smith", "bob_2", "x-y"] {
            assert!(validate_username(ok).is_ok(), "{} rejected", ok);
        }
        let long = "a".repeat(65);
        for bad in ["", "..", ".hidden", "a/b", "a b", "ünï", "login", "LOGIN", long.as_str()] {
            assert!(validate_username(bad).is_err(), "{} accepted", bad);
        }
    }

    #[test]
    fn test_profile_path_updates_timestamp() {
        let mut user = User::new("alice".into(), "hash".into());
        let before = user.updated_at;
        user.set_profile_path(Some("alice/profile/profile.png".into()));
        assert!(user.has_profile());
        assert!(user.updated_at >= before);
    }
}
