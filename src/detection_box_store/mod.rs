//! DetectionBoxStore - Current Frame Box Set and Selection
//!
//! ## Responsibilities
//!
//! - Hold the detected boxes of the current frame (wholesale replace)
//! - Resolve a selected box into an inventory item draft
//! - Local (label-only) or remote (metadata lookup) resolution
//!
//! Boxes are frame-relative, so the set is never merged across frames;
//! a stale box overlapping a new frame is meaningless. A selection in
//! flight keeps its own clone of the box, so a concurrent replace does
//! not disturb it.

use crate::detector_client::DetectedBox;
use crate::error::Error;
use crate::metadata_client::MetadataClient;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// How a selected box becomes an item draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Build the draft from the detection label alone
    Local,
    /// Look the box id up in the product metadata backend
    Remote,
}

impl std::str::FromStr for ResolveMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(ResolveMode::Local),
            "remote" => Ok(ResolveMode::Remote),
            other => Err(Error::Config(format!(
                "Unknown resolve mode: {} (expected local|remote)",
                other
            ))),
        }
    }
}

/// Candidate inventory item built from a selected box
///
/// Becomes an [`crate::inventory_store::InventoryItem`] only after an
/// explicit confirm-add from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDraft {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub expiration_date: Option<NaiveDate>,
}

/// Why a selection did not produce a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No box with that id in the current set
    BoxNotFound,
    /// Metadata backend has no product for the box id
    ProductNotFound,
    /// Metadata backend unreachable or failing
    Connection,
}

/// Outcome of selecting a box
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SelectionOutcome {
    Resolved { draft: ItemDraft },
    Unresolved { reason: UnresolvedReason, message: String },
}

/// DetectionBoxStore instance
pub struct DetectionBoxStore {
    boxes: RwLock<Vec<DetectedBox>>,
    metadata: Arc<MetadataClient>,
    resolve_mode: ResolveMode,
}

impl DetectionBoxStore {
    /// Create new DetectionBoxStore
    pub fn new(metadata: Arc<MetadataClient>, resolve_mode: ResolveMode) -> Self {
        Self {
            boxes: RwLock::new(Vec::new()),
            metadata,
            resolve_mode,
        }
    }

    /// Atomically swap the current box set
    pub async fn replace(&self, boxes: Vec<DetectedBox>) {
        let count = boxes.len();
        let mut current = self.boxes.write().await;
        *current = boxes;
        tracing::debug!(count = count, "Detection box set replaced");
    }

    /// Snapshot of the current box set
    pub async fn snapshot(&self) -> Vec<DetectedBox> {
        let boxes = self.boxes.read().await;
        boxes.clone()
    }

    /// Number of boxes in the current set
    pub async fn count(&self) -> usize {
        let boxes = self.boxes.read().await;
        boxes.len()
    }

    /// Resolve a box into an item draft
    ///
    /// The box is cloned out of the set before any await, so a replace
    /// landing mid-resolution never affects the outcome.
    pub async fn select(&self, box_id: &str) -> SelectionOutcome {
        let selected = {
            let boxes = self.boxes.read().await;
            boxes.iter().find(|b| b.id == box_id).cloned()
        };

        let Some(selected) = selected else {
            return SelectionOutcome::Unresolved {
                reason: UnresolvedReason::BoxNotFound,
                message: format!("No box {} in current detections", box_id),
            };
        };

        match self.resolve_mode {
            ResolveMode::Local => SelectionOutcome::Resolved {
                draft: Self::draft_from_box(&selected),
            },
            ResolveMode::Remote => self.resolve_remote(&selected).await,
        }
    }

    /// Build a draft from the detection label alone
    fn draft_from_box(selected: &DetectedBox) -> ItemDraft {
        // Id derived from box coordinates plus capture time; unique
        // enough for a session-local inventory
        let id = format!(
            "{}-{}x{}",
            Utc::now().timestamp_millis(),
            selected.top_left.x as i64,
            selected.top_left.y as i64
        );

        ItemDraft {
            id,
            name: selected.label.clone(),
            category: "uncategorized".to_string(),
            expiration_date: None,
        }
    }

    /// Look the box up in the metadata backend
    async fn resolve_remote(&self, selected: &DetectedBox) -> SelectionOutcome {
        match self.metadata.product(&selected.id).await {
            Ok(record) => SelectionOutcome::Resolved {
                draft: ItemDraft {
                    id: record.id.as_string(),
                    name: record.name,
                    category: record.category,
                    expiration_date: record.expiration_date,
                },
            },
            Err(Error::NotFound(message)) => SelectionOutcome::Unresolved {
                reason: UnresolvedReason::ProductNotFound,
                message,
            },
            Err(e) => SelectionOutcome::Unresolved {
                reason: UnresolvedReason::Connection,
                message: e.to_string(),
            },
        }
    }
}
