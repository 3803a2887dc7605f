//! InventoryStore - Kept Items and Delete/Undo Stack
//!
//! ## Responsibilities
//!
//! - Authoritative in-memory list of kept inventory items
//! - LIFO delete stack with undo (restore most recently deleted first)
//! - Uniqueness of ids among currently kept items
//!
//! State lives for the process lifetime only; there is no persistence
//! across restarts. An item id lives in exactly one of the kept list or
//! the delete stack at any time.

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// One kept inventory item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub added_at: DateTime<Utc>,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
}

/// Inner state guarded by one lock so add/remove/undo are atomic
struct InventoryState {
    /// Kept items in insertion order (display order)
    kept: Vec<InventoryItem>,
    /// Delete stack, most recently deleted first
    deleted: Vec<InventoryItem>,
}

/// InventoryStore instance
pub struct InventoryStore {
    state: RwLock<InventoryState>,
    /// Maximum delete stack depth; None = unbounded
    undo_capacity: Option<usize>,
}

impl InventoryStore {
    /// Create new InventoryStore with unbounded undo history
    pub fn new() -> Self {
        Self {
            state: RwLock::new(InventoryState {
                kept: Vec::new(),
                deleted: Vec::new(),
            }),
            undo_capacity: None,
        }
    }

    /// Create new InventoryStore with a bounded delete stack
    ///
    /// When the stack exceeds `capacity` the oldest deleted entry is
    /// discarded permanently.
    pub fn with_undo_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(InventoryState {
                kept: Vec::new(),
                deleted: Vec::new(),
            }),
            undo_capacity: Some(capacity),
        }
    }

    /// Add a confirmed item to the kept list
    pub async fn add(&self, item: InventoryItem) -> Result<()> {
        let mut state = self.state.write().await;

        if state.kept.iter().any(|i| i.id == item.id) {
            return Err(Error::DuplicateId(format!(
                "Item {} already in inventory",
                item.id
            )));
        }

        tracing::debug!(id = %item.id, name = %item.name, "Item added to inventory");
        state.kept.push(item);
        Ok(())
    }

    /// Move a kept item to the top of the delete stack
    pub async fn remove(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;

        let pos = state
            .kept
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| Error::NotFound(format!("Item {} not in inventory", id)))?;

        let item = state.kept.remove(pos);
        tracing::debug!(id = %item.id, name = %item.name, "Item moved to delete stack");
        state.deleted.insert(0, item);

        if let Some(cap) = self.undo_capacity {
            if state.deleted.len() > cap {
                let evicted = state.deleted.pop();
                if let Some(evicted) = evicted {
                    tracing::debug!(id = %evicted.id, "Oldest deleted entry evicted");
                }
            }
        }

        Ok(())
    }

    /// Restore the most recently deleted item to the tail of the kept
    /// list, returning its name; no-op on an empty stack
    pub async fn undo(&self) -> Option<String> {
        let mut state = self.state.write().await;

        if state.deleted.is_empty() {
            return None;
        }

        let item = state.deleted.remove(0);
        let name = item.name.clone();
        tracing::debug!(id = %item.id, name = %name, "Item restored from delete stack");
        state.kept.push(item);
        Some(name)
    }

    /// Whether an undo affordance should be offered
    pub async fn has_pending(&self) -> bool {
        let state = self.state.read().await;
        !state.deleted.is_empty()
    }

    /// Snapshot of kept items in display order
    pub async fn snapshot(&self) -> Vec<InventoryItem> {
        let state = self.state.read().await;
        state.kept.clone()
    }

    /// Number of kept items
    pub async fn count(&self) -> usize {
        let state = self.state.read().await;
        state.kept.len()
    }
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, name: &str) -> InventoryItem {
        InventoryItem {
            id: id.to_string(),
            name: name.to_string(),
            category: "dairy".to_string(),
            added_at: Utc::now(),
            expiration_date: None,
        }
    }

    #[tokio::test]
    async fn test_add_and_snapshot_order() {
        let store = InventoryStore::new();
        store.add(item("1", "Milk")).await.unwrap();
        store.add(item("2", "Eggs")).await.unwrap();

        let items = store.snapshot().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Milk");
        assert_eq!(items[1].name, "Eggs");
    }

    #[tokio::test]
    async fn test_duplicate_add_rejected_list_unchanged() {
        let store = InventoryStore::new();
        store.add(item("1", "Milk")).await.unwrap();

        let result = store.add(item("1", "Other Milk")).await;
        assert!(matches!(result, Err(Error::DuplicateId(_))));

        let items = store.snapshot().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Milk");
    }

    #[tokio::test]
    async fn test_remove_absent_id_rejected_lists_unchanged() {
        let store = InventoryStore::new();
        store.add(item("1", "Milk")).await.unwrap();

        let result = store.remove("2").await;
        assert!(matches!(result, Err(Error::NotFound(_))));

        assert_eq!(store.count().await, 1);
        assert!(!store.has_pending().await);
    }

    #[tokio::test]
    async fn test_undo_on_empty_stack_is_noop() {
        let store = InventoryStore::new();
        store.add(item("1", "Milk")).await.unwrap();

        assert_eq!(store.undo().await, None);
        assert_eq!(store.undo().await, None);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_remove_then_undo_restores_milk() {
        let store = InventoryStore::new();
        store.add(item("1", "Milk")).await.unwrap();

        store.remove("1").await.unwrap();
        assert!(store.has_pending().await);
        assert_eq!(store.count().await, 0);

        assert_eq!(store.undo().await, Some("Milk".to_string()));
        assert!(!store.has_pending().await);

        let items = store.snapshot().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "1");
        assert_eq!(items[0].name, "Milk");
    }

    #[tokio::test]
    async fn test_undo_is_lifo() {
        let store = InventoryStore::new();
        store.add(item("a", "Butter")).await.unwrap();
        store.add(item("b", "Cheese")).await.unwrap();

        store.remove("a").await.unwrap();
        store.remove("b").await.unwrap();

        // B deleted last, restored first
        assert_eq!(store.undo().await, Some("Cheese".to_string()));
        assert_eq!(store.undo().await, Some("Butter".to_string()));
        assert_eq!(store.undo().await, None);
    }

    #[tokio::test]
    async fn test_restored_item_appends_at_tail() {
        let store = InventoryStore::new();
        store.add(item("a", "Butter")).await.unwrap();
        store.add(item("b", "Cheese")).await.unwrap();
        store.add(item("c", "Yogurt")).await.unwrap();

        store.remove("a").await.unwrap();
        store.undo().await;

        let items = store.snapshot().await;
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_id_never_in_both_lists() {
        let store = InventoryStore::new();
        store.add(item("1", "Milk")).await.unwrap();
        store.add(item("2", "Eggs")).await.unwrap();
        store.remove("1").await.unwrap();

        // "1" is on the stack, not kept; "2" is kept, not on the stack
        let kept: Vec<String> = store.snapshot().await.iter().map(|i| i.id.clone()).collect();
        assert_eq!(kept, vec!["2"]);
        assert!(store.has_pending().await);

        // Restoring moves it back to exactly one place
        store.undo().await;
        assert_eq!(store.count().await, 2);
        assert!(!store.has_pending().await);
    }

    #[tokio::test]
    async fn test_deleted_id_may_be_reused() {
        // Uniqueness is among currently kept items, not across history
        let store = InventoryStore::new();
        store.add(item("1", "Milk")).await.unwrap();
        store.remove("1").await.unwrap();

        store.add(item("1", "New Milk")).await.unwrap();
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_bounded_undo_evicts_oldest() {
        let store = InventoryStore::with_undo_capacity(2);
        store.add(item("a", "Butter")).await.unwrap();
        store.add(item("b", "Cheese")).await.unwrap();
        store.add(item("c", "Yogurt")).await.unwrap();

        store.remove("a").await.unwrap();
        store.remove("b").await.unwrap();
        store.remove("c").await.unwrap();

        // "a" fell off the bottom of the stack
        assert_eq!(store.undo().await, Some("Yogurt".to_string()));
        assert_eq!(store.undo().await, Some("Cheese".to_string()));
        assert_eq!(store.undo().await, None);
    }
}
