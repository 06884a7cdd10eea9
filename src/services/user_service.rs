//! User service - Handles user-related business logic.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DEFAULT_PROFILE_EXTENSION;
use crate::domain::{validate_username, Password, User};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{ProfileStore, StoredObject, UserRepository};
use crate::types::{Page, PageRequest};

/// Object key of a user's profile image: `<username>/profile/profile<ext>`.
///
/// `<ext>` is taken from the uploaded filename, lowercased; `.jpg` when the
/// filename has no usable extension.
pub fn profile_key(username: &str, filename: Option<&str>) -> String {
    let ext = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_PROFILE_EXTENSION.to_string());

    format!("{}/profile/profile{}", username, ext)
}

/// User service trait for dependency injection.
#[async_trait]
pub trait UserService: Send + Sync {
    /// Register a new user. [`AppError::Conflict`] if the username is taken.
    async fn create_user(&self, username: &str, password: &str) -> AppResult<User>;

    async fn get_user(&self, username: &str) -> AppResult<User>;

    /// Update a user. Only the password can change; `None` keeps it.
    async fn update_user(&self, username: &str, password: Option<String>) -> AppResult<User>;

    /// Delete a user and their profile image.
    async fn delete_user(&self, username: &str) -> AppResult<()>;

    async fn list_users(&self, page: &PageRequest) -> AppResult<Page<User>>;

    /// Store a profile image, replacing any previous one.
    async fn upload_profile(
        &self,
        username: &str,
        filename: Option<String>,
        content_type: String,
        bytes: Vec<u8>,
    ) -> AppResult<User>;

    async fn get_profile(&self, username: &str) -> AppResult<StoredObject>;

    async fn delete_profile(&self, username: &str) -> AppResult<()>;
}

/// Concrete implementation of UserService
pub struct UserManager {
    users: Arc<dyn UserRepository>,
    profiles: Arc<dyn ProfileStore>,
}

impl UserManager {
    pub fn new(users: Arc<dyn UserRepository>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { users, profiles }
    }

    async fn find(&self, username: &str) -> AppResult<User> {
        self.users.get_user(username).await?.ok_or_not_found()
    }
}

#[async_trait]
impl UserService for UserManager {
    async fn create_user(&self, username: &str, password: &str) -> AppResult<User> {
        validate_username(username)?;
        if self.users.get_user(username).await?.is_some() {
            return Err(AppError::conflict("User"));
        }

        let password_hash = Password::new(password)?.into_string();
        let user = self
            .users
            .create_user(User::new(username.to_string(), password_hash))
            .await?;
        tracing::info!(username, "user created");
        Ok(user)
    }

    async fn get_user(&self, username: &str) -> AppResult<User> {
        self.find(username).await
    }

    async fn update_user(&self, username: &str, password: Option<String>) -> AppResult<User> {
        let mut user = self.find(username).await?;

        if let Some(plain) = password {
            user.set_password_hash(Password::new(&plain)?.into_string());
        }

        self.users.update_user(user).await
    }

    async fn delete_user(&self, username: &str) -> AppResult<()> {
        let user = self.find(username).await?;
        if let Some(key) = user.profile_path.as_deref() {
            self.profiles.delete(key).await?;
        }

        self.users.delete_user(username).await?;
        tracing::info!(username, "user deleted");
        Ok(())
    }

    async fn list_users(&self, page: &PageRequest) -> AppResult<Page<User>> {
        self.users.list_users_page(page).await
    }

    async fn upload_profile(
        &self,
        username: &str,
        filename: Option<String>,
        content_type: String,
        bytes: Vec<u8>,
    ) -> AppResult<User> {
        let mut user = self.find(username).await?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("File upload is required".into()));
        }

        let key = profile_key(username, filename.as_deref());
        self.profiles.put(&key, bytes, &content_type).await?;

        if let Some(previous) = user.profile_path.as_deref().filter(|p| *p != key) {
            self.profiles.delete(previous).await?;
        }

        user.set_profile_path(Some(key));
        self.users.update_user(user).await
    }

    async fn get_profile(&self, username: &str) -> AppResult<StoredObject> {
        let user = self.find(username).await?;
        let key = user.profile_path.as_deref().ok_or(AppError::NotFound)?;
        self.profiles.get(key).await?.ok_or_not_found()
    }

    async fn delete_profile(&self, username: &str) -> AppResult<()> {
        let mut user = self.find(username).await?;
        let Some(key) = user.profile_path.take() else {
            return Err(AppError::NotFound);
        };

        self.profiles.delete(&key).await?;
        user.set_profile_path(None);
        self.users.update_user(user).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::infra::{MemoryProfileStore, MockUserRepository};

    fn manager(repo: MockUserRepository) -> UserManager {
        UserManager::new(Arc::new(repo), Arc::new(MemoryProfileStore::new()))
    }

    #[test]
    fn test_profile_key_extension() {
        assert_eq!(profile_key("alice", Some("me.PNG")), "alice/profile/profile.png");
        assert_eq!(profile_key("alice", Some("photo")), "alice/profile/profile.jpg");
        assert_eq!(profile_key("alice", None), "alice/profile/profile.jpg");
        assert_eq!(profile_key("alice", Some("x.j/pg")), "alice/profile/profile.jpg");
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_user()
            .with(eq("alice"))
            .returning(|_| Ok(Some(User::new("alice".into(), "hash".into()))));
        repo.expect_create_user().never();

        let result = manager(repo).create_user("alice", "password123").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_hashes_password() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_user().returning(|_| Ok(None));
        repo.expect_create_user()
            .withf(|user| user.username == "bob" && user.password_hash.starts_with("$argon2"))
            .returning(Ok);

        let user = manager(repo).create_user("bob", "password123").await.unwrap();
        assert!(Password::from_hash(user.password_hash).verify("password123"));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_user().returning(|_| Ok(None));
        repo.expect_create_user().never();
        let service = manager(repo);

        assert!(matches!(
            service.create_user("../etc", "password123").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create_user("bob", "short").await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_user().returning(|_| Ok(None));

        assert!(matches!(
            manager(repo).get_user("ghost").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_changes_password_hash() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_user()
            .returning(|_| Ok(Some(User::new("alice".into(), "old-hash".into()))));
        repo.expect_update_user()
            .withf(|user| user.password_hash != "old-hash")
            .returning(Ok);

        let user = manager(repo)
            .update_user("alice", Some("new-password".into()))
            .await
            .unwrap();
        assert!(Password::from_hash(user.password_hash).verify("new-password"));
    }

    #[tokio::test]
    async fn test_update_with_empty_password_is_rejected() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_user()
            .returning(|_| Ok(Some(User::new("alice".into(), "old-hash".into()))));
        repo.expect_update_user().never();

        assert!(matches!(
            manager(repo).update_user("alice", Some(String::new())).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_without_password_keeps_hash() {
        let mut repo = MockUserRepository::new();
        repo.expect_get_user()
            .returning(|_| Ok(Some(User::new("alice".into(), "old-hash".into()))));
        repo.expect_update_user()
            .withf(|user| user.password_hash == "old-hash")
            .returning(Ok);

        manager(repo).update_user("alice", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_profile_lifecycle() {
        let mut repo = MockUserRepository::new();
        let stored = Arc::new(std::sync::Mutex::new(User::new("alice".into(), "h".into())));

        let current = stored.clone();
        repo.expect_get_user()
            .returning(move |_| Ok(Some(current.lock().unwrap().clone())));
        let target = stored.clone();
        repo.expect_update_user().returning(move |user| {
            *target.lock().unwrap() = user.clone();
            Ok(user)
        });

        let profiles = Arc::new(MemoryProfileStore::new());
        let service = UserManager::new(Arc::new(repo), profiles.clone());

        let user = service
            .upload_profile("alice", Some("me.png".into()), "image/png".into(), vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(user.profile_path.as_deref(), Some("alice/profile/profile.png"));

        let object = service.get_profile("alice").await.unwrap();
        assert_eq!(object.bytes, vec![1, 2, 3]);
        assert_eq!(object.content_type, "image/png");

        service.delete_profile("alice").await.unwrap();
        assert_eq!(profiles.len().await, 0);
        assert!(matches!(
            service.get_profile("alice").await,
            Err(AppError::NotFound)
        ));
    }
}
