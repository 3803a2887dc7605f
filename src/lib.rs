//! FridgeCam Server Library
//!
//! Detection polling and inventory state engine for a fridge camera.
//!
//! ## Architecture (6 Components)
//!
//! 1. FrameSource - JPEG frame capture with monotonic sequence ids
//! 2. DetectorClient - Remote object-detector adapter (multipart HTTP)
//! 3. CaptureScheduler - Fixed-cadence polling, single-flight guard
//! 4. DetectionBoxStore - Current frame box set + selection resolve
//! 5. InventoryStore - Kept items + LIFO delete/undo stack
//! 6. WebAPI - REST boundary consumed by the UI layer
//!
//! ## Design Principles
//!
//! - All state in-memory, mutated only through the store APIs
//! - Failures are values: a failed tick or lookup never corrupts state
//! - One in-flight detection at a time, stale results discarded

pub mod capture_scheduler;
pub mod detection_box_store;
pub mod detector_client;
pub mod error;
pub mod frame_source;
pub mod inventory_store;
pub mod metadata_client;
pub mod models;
pub mod state;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
