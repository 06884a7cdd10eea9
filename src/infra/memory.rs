//! In-process backend.
//!
//! Used with `STORAGE_BACKEND=memory` and by tests. Data lives as long as
//! the process.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use super::repositories::{finish_page, start_after, UserRepository};
use crate::domain::User;
use crate::errors::{AppError, AppResult};
use crate::migrate::{ResourceSchema, ResourceState, StorageAdmin, Tag};
use crate::types::{Page, PageRequest};

/// User store backed by an ordered map
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<BTreeMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserStore {
    async fn create_user(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(AppError::conflict("User"));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn update_user(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        let stored = users.get_mut(&user.username).ok_or(AppError::NotFound)?;
        *stored = user.clone();
        Ok(user)
    }

    async fn delete_user(&self, username: &str) -> AppResult<()> {
        self.users
            .write()
            .await
            .remove(username)
            .map(|_| ())
            .ok_or(AppError::NotFound)
    }

    async fn list_users_page(&self, page: &PageRequest) -> AppResult<Page<User>> {
        let limit = page.limit();
        let after = start_after(page.token())?;
        let lower = match after.as_deref() {
            Some(after) => Bound::Excluded(after),
            None => Bound::Unbounded,
        };

        let users = self.users.read().await;
        let rows = users
            .range::<str, _>((lower, Bound::Unbounded))
            .take(usize::try_from(limit + 1).unwrap_or(usize::MAX))
            .map(|(_, user)| user.clone())
            .collect();

        finish_page(rows, limit)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct MemoryResource {
    tags: BTreeMap<String, String>,
    polls_until_active: usize,
}

/// Storage administrator that keeps resources in memory and counts every
/// mutating call, so idempotency can be asserted.
#[derive(Debug, Default)]
pub struct MemoryStorageAdmin {
    resources: Mutex<HashMap<String, MemoryResource>>,
    failing_creates: HashSet<String>,
    activation_polls: usize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    tag_calls: AtomicUsize,
}

impl MemoryStorageAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report new resources as `Creating` for this many describes.
    pub fn with_activation_polls(mut self, polls: usize) -> Self {
        self.activation_polls = polls;
        self
    }

    /// Make `create_resource` fail for `name`.
    pub fn with_failing_create(mut self, name: impl Into<String>) -> Self {
        self.failing_creates.insert(name.into());
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn tag_calls(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }

    /// Total create, delete and tag calls
    pub fn mutating_calls(&self) -> usize {
        self.create_calls() + self.delete_calls() + self.tag_calls()
    }

    /// Current tags of a resource, `None` if it does not exist
    pub async fn tags(&self, name: &str) -> Option<BTreeMap<String, String>> {
        self.resources
            .lock()
            .await
            .get(name)
            .map(|resource| resource.tags.clone())
    }
}

#[async_trait]
impl StorageAdmin for MemoryStorageAdmin {
    async fn create_resource(&self, schema: &ResourceSchema) -> AppResult<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_creates.contains(&schema.name) {
            return Err(AppError::storage(format!(
                "create of {} rejected by the store",
                schema.name
            )));
        }

        let mut resources = self.resources.lock().await;
        if resources.contains_key(&schema.name) {
            return Err(AppError::storage(format!("{} already exists", schema.name)));
        }
        resources.insert(
            schema.name.clone(),
            MemoryResource {
                tags: BTreeMap::new(),
                polls_until_active: self.activation_polls,
            },
        );
        Ok(())
    }

    async fn delete_resource(&self, name: &str) -> AppResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.resources
            .lock()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AppError::storage(format!("{} does not exist", name)))
    }

    async fn describe_resource(&self, name: &str) -> AppResult<ResourceState> {
        let mut resources = self.resources.lock().await;
        let Some(resource) = resources.get_mut(name) else {
            return Ok(ResourceState::Absent);
        };

        if resource.polls_until_active > 0 {
            resource.polls_until_active -= 1;
            return Ok(ResourceState::Creating);
        }
        Ok(ResourceState::Active)
    }

    async fn tag_resource(&self, name: &str, tags: &[Tag]) -> AppResult<()> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        let mut resources = self.resources.lock().await;
        let resource = resources
            .get_mut(name)
            .ok_or_else(|| AppError::storage(format!("{} does not exist", name)))?;

        for tag in tags {
            resource.tags.insert(tag.key.clone(), tag.value.clone());
        }
        Ok(())
    }

    async fn find_by_tag(&self, key: &str, value: &str) -> AppResult<Vec<String>> {
        let resources = self.resources.lock().await;
        let mut names: Vec<String> = resources
            .iter()
            .filter(|(_, resource)| resource.tags.get(key).is_some_and(|v| v == value))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}
