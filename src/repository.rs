//! Item Repository
//!
//! In-memory stand-in for the hosted data service behind the handlers.
//! Every call is fallible and reports failures as [`OperationError`] so
//! handlers can wrap it in a [`RetryPolicy`](crate::retry::RetryPolicy).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::retry::OperationError;

/// A stored item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    items: BTreeMap<u64, Item>,
    next_id: u64,
    /// Calls left that fail with a transient error
    pending_failures: u32,
}

impl Inner {
    fn take_failure(&mut self, op: &str) -> Result<(), OperationError> {
        if self.pending_failures == 0 {
            return Ok(());
        }
        self.pending_failures -= 1;
        debug!(op, remaining = self.pending_failures, "Injected upstream failure");
        Err(OperationError::Transient(format!(
            "{op}: connection reset by upstream"
        )))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemRepository {
    inner: Arc<RwLock<Inner>>,
}

impl ItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls fail with a transient error, the way a
    /// flaky upstream connection would.
    pub async fn inject_failures(&self, count: u32) {
        self.inner.write().await.pending_failures = count;
    }

    /// Returns a page of items ordered by id, plus the total count.
    pub async fn list(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Item>, usize), OperationError> {
        let mut inner = self.inner.write().await;
        inner.take_failure("list")?;

        let page = inner
            .items
            .values()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((page, inner.items.len()))
    }

    pub async fn get(&self, id: u64) -> Result<Item, OperationError> {
        let mut inner = self.inner.write().await;
        inner.take_failure("get")?;

        inner
            .items
            .get(&id)
            .cloned()
            .ok_or_else(|| OperationError::NotFound(format!("Item {} not found", id)))
    }

    /// Stores a new item. Names are unique, compared case-insensitively.
    pub async fn create(
        &self,
        name: &str,
        description: Option<String>,
    ) -> Result<Item, OperationError> {
        let mut inner = self.inner.write().await;
        inner.take_failure("create")?;

        let name = name.trim();
        if name.is_empty() {
            return Err(OperationError::Validation("Name cannot be empty".to_string()));
        }
        if inner
            .items
            .values()
            .any(|item| item.name.eq_ignore_ascii_case(name))
        {
            return Err(OperationError::Duplicate(format!(
                "An item named '{}' already exists",
                name
            )));
        }

        inner.next_id += 1;
        let item = Item {
            id: inner.next_id,
            name: name.to_string(),
            description,
            created_at: Utc::now(),
        };
        inner.items.insert(item.id, item.clone());
        Ok(item)
    }

    pub async fn delete(&self, id: u64) -> Result<Item, OperationError> {
        let mut inner = self.inner.write().await;
        inner.take_failure("delete")?;

        inner
            .items
            .remove(&id)
            .ok_or_else(|| OperationError::NotFound(format!("Item {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = ItemRepository::new();
        let created = repo.create("poster", None).await.unwrap();

        assert_eq!(created.id, 1);
        assert_eq!(repo.get(1).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let repo = ItemRepository::new();
        assert!(matches!(repo.get(9).await, Err(OperationError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_name() {
        let repo = ItemRepository::new();
        repo.create("Poster", None).await.unwrap();

        let result = repo.create("poster", None).await;
        assert!(matches!(result, Err(OperationError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_empty_name() {
        let repo = ItemRepository::new();
        let result = repo.create("  ", None).await;
        assert!(matches!(result, Err(OperationError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_paging() {
        let repo = ItemRepository::new();
        for name in ["a", "b", "c", "d"] {
            repo.create(name, None).await.unwrap();
        }

        let (page, total) = repo.list(1, 2).await.unwrap();
        assert_eq!(total, 4);
        let names: Vec<_> = page.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, ["b", "c"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = ItemRepository::new();
        let item = repo.create("a", None).await.unwrap();

        assert_eq!(repo.delete(item.id).await.unwrap().name, "a");
        assert!(matches!(
            repo.delete(item.id).await,
            Err(OperationError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_failures_are_transient() {
        let repo = ItemRepository::new();
        repo.inject_failures(2).await;

        assert!(matches!(repo.get(1).await, Err(OperationError::Transient(_))));
        assert!(matches!(repo.get(1).await, Err(OperationError::Transient(_))));
        assert!(matches!(repo.get(1).await, Err(OperationError::NotFound(_))));
    }
}
