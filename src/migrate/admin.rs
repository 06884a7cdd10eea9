//! Administrative storage interface used by migrations.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::MIGRATION_POLL_INTERVAL_MS;
use crate::errors::{AppError, AppResult};

/// Scalar type of a resource attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    String,
    Number,
    Binary,
    Timestamp,
}

/// One attribute (column) of a table-like resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
    pub nullable: bool,
}

impl Attribute {
    pub fn required(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
        }
    }

    pub fn optional(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: true,
        }
    }
}

/// Definition of a table-like resource: its name, hash key and other attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSchema {
    pub name: String,
    pub key: Attribute,
    pub attributes: Vec<Attribute>,
}

/// Lifecycle state reported by the store for a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Creating,
    Active,
    Deleting,
    Absent,
}

/// A key/value tag attached to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Provisioning and tagging operations on the backing store.
#[async_trait]
pub trait StorageAdmin: Send + Sync {
    /// Start creating a resource. May return before it is ready.
    async fn create_resource(&self, schema: &ResourceSchema) -> AppResult<()>;

    /// Start deleting a resource. May return before it is gone.
    async fn delete_resource(&self, name: &str) -> AppResult<()>;

    async fn describe_resource(&self, name: &str) -> AppResult<ResourceState>;

    /// Merge tags into the resource's tag set, replacing existing keys.
    async fn tag_resource(&self, name: &str, tags: &[Tag]) -> AppResult<()>;

    /// Names of all resources carrying `key=value`.
    async fn find_by_tag(&self, key: &str, value: &str) -> AppResult<Vec<String>>;

    /// Block until the resource reports [`ResourceState::Active`].
    async fn wait_until_ready(&self, name: &str, timeout: Duration) -> AppResult<()> {
        poll_until(
            &format!("{} to become active", name),
            timeout,
            Duration::from_millis(MIGRATION_POLL_INTERVAL_MS),
            move || async move { Ok(self.describe_resource(name).await? == ResourceState::Active) },
        )
        .await
    }

    /// Block until the resource reports [`ResourceState::Absent`].
    async fn wait_until_gone(&self, name: &str, timeout: Duration) -> AppResult<()> {
        poll_until(
            &format!("{} to be deleted", name),
            timeout,
            Duration::from_millis(MIGRATION_POLL_INTERVAL_MS),
            move || async move { Ok(self.describe_resource(name).await? == ResourceState::Absent) },
        )
        .await
    }
}

/// Run `probe` every `interval` until it returns `true`.
///
/// # Errors
/// Any probe error is returned as is. Running past `timeout` is an
/// [`AppError::Storage`] naming what was awaited.
pub async fn poll_until<F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> AppResult<()>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = AppResult<bool>> + Send,
{
    let polling = async {
        loop {
            if probe().await? {
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        }
    };

    match tokio::time::timeout(timeout, polling).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Storage(format!(
            "timed out after {:?} waiting for {}",
            timeout, what
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_poll_until_succeeds_after_retries() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        poll_until(
            "counter",
            Duration::from_secs(5),
            Duration::from_millis(1),
            move || async move { Ok(calls.fetch_add(1, Ordering::SeqCst) >= 2) },
        )
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_until_times_out() {
        let err = poll_until(
            "never",
            Duration::from_millis(30),
            Duration::from_millis(5),
            || async { Ok(false) },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Storage(ref msg) if msg.contains("never")));
    }

    #[tokio::test]
    async fn test_poll_until_propagates_probe_error() {
        let err = poll_until(
            "broken",
            Duration::from_secs(1),
            Duration::from_millis(1),
            || async { Err::<bool, _>(AppError::storage("describe failed")) },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Storage(ref msg) if msg == "describe failed"));
    }
}
