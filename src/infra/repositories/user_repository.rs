//! User storage capability and its SQL adapter.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, SqlErr, Statement,
};

use super::entities::user::{self, ActiveModel, Entity as UserEntity};
use crate::config::USERS_KEY_ATTRIBUTE;
use crate::domain::User;
use crate::errors::{AppError, AppResult};
use crate::types::{AttributeValue, LastKey, Page, PageCursor, PageRequest};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Storage capability for user records.
///
/// Implemented once per backend; nothing above this trait sees a backend type.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. [`AppError::Conflict`] if the username is taken.
    async fn create_user(&self, user: User) -> AppResult<User>;

    async fn get_user(&self, username: &str) -> AppResult<Option<User>>;

    /// Replace a stored user. [`AppError::NotFound`] if it does not exist.
    async fn update_user(&self, user: User) -> AppResult<User>;

    /// [`AppError::NotFound`] if the user does not exist.
    async fn delete_user(&self, username: &str) -> AppResult<()>;

    /// One page of users ordered by username.
    ///
    /// [`AppError::InvalidCursor`] if `next_token` does not decode to a
    /// username key.
    async fn list_users_page(&self, page: &PageRequest) -> AppResult<Page<User>>;

    /// Check the backend is reachable
    async fn ping(&self) -> AppResult<()>;
}

/// Username to resume after, from a request's `next_token`.
pub(crate) fn start_after(token: &str) -> AppResult<Option<String>> {
    let key = PageCursor::decode(token)?;
    if key.is_empty() {
        return Ok(None);
    }

    match key.get(USERS_KEY_ATTRIBUTE).and_then(AttributeValue::as_s) {
        Some(username) if key.len() == 1 => Ok(Some(username.to_string())),
        _ => {
            tracing::debug!(attributes = ?key.keys().collect::<Vec<_>>(), "cursor key does not match users table");
            Err(AppError::InvalidCursor)
        }
    }
}

/// Build a page from up to `limit + 1` rows fetched in username order.
pub(crate) fn finish_page(mut users: Vec<User>, limit: u64) -> AppResult<Page<User>> {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    if users.len() <= limit {
        return Ok(Page::new(users, String::new()));
    }

    users.truncate(limit);
    let mut last_key = LastKey::new();
    if let Some(last) = users.last() {
        last_key.insert(
            USERS_KEY_ATTRIBUTE.to_string(),
            AttributeValue::S(last.username.clone()),
        );
    }

    let next_token = PageCursor::encode(&last_key)?;
    Ok(Page::new(users, next_token))
}

/// Postgres-backed user store
pub struct SqlUserStore {
    db: DatabaseConnection,
}

impl SqlUserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for SqlUserStore {
    async fn create_user(&self, user: User) -> AppResult<User> {
        let model = ActiveModel::from(user)
            .insert(&self.db)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::conflict("User"),
                _ => AppError::from(e),
            })?;

        Ok(User::from(model))
    }

    async fn get_user(&self, username: &str) -> AppResult<Option<User>> {
        let result = UserEntity::find_by_id(username.to_string())
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn update_user(&self, user: User) -> AppResult<User> {
        let model = ActiveModel::from(user)
            .update(&self.db)
            .await
            .map_err(|e| match e {
                DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => AppError::NotFound,
                other => AppError::from(other),
            })?;

        Ok(User::from(model))
    }

    async fn delete_user(&self, username: &str) -> AppResult<()> {
        let result = UserEntity::delete_by_id(username.to_string())
            .exec(&self.db)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    async fn list_users_page(&self, page: &PageRequest) -> AppResult<Page<User>> {
        let limit = page.limit();
        let mut query = UserEntity::find().order_by_asc(user::Column::Username);
        if let Some(after) = start_after(page.token())? {
            query = query.filter(user::Column::Username.gt(after));
        }

        let models = query.limit(limit + 1).all(&self.db).await?;
        finish_page(models.into_iter().map(User::from).collect(), limit)
    }

    async fn ping(&self) -> AppResult<()> {
        self.db
            .execute(Statement::from_string(
                self.db.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(names: &[&str]) -> Vec<User> {
        names
            .iter()
            .map(|name| User::new(name.to_string(), "hash".into()))
            .collect()
    }

    #[test]
    fn test_short_page_has_no_token() {
        let page = finish_page(users(&["a", "b"]), 2).unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.next_token, "");
    }

    #[test]
    fn test_full_page_token_resumes_after_last() {
        let page = finish_page(users(&["a", "b", "c"]), 2).unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(start_after(&page.next_token).unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_start_after_empty_token() {
        assert_eq!(start_after("").unwrap(), None);
    }

    #[test]
    fn test_start_after_rejects_foreign_key_schema() {
        let mut key = LastKey::new();
        key.insert("id".into(), AttributeValue::N("42".into()));
        let token = PageCursor::encode(&key).unwrap();
        assert!(matches!(start_after(&token), Err(AppError::InvalidCursor)));

        let mut key = LastKey::new();
        key.insert(USERS_KEY_ATTRIBUTE.into(), AttributeValue::B(vec![1]));
        let token = PageCursor::encode(&key).unwrap();
        assert!(matches!(start_after(&token), Err(AppError::InvalidCursor)));
    }
}
