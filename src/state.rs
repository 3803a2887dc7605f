//! Application state
//!
//! Holds all shared components and state

use crate::capture_scheduler::CaptureScheduler;
use crate::detection_box_store::{DetectionBoxStore, ResolveMode};
use crate::detector_client::DetectorClient;
use crate::frame_source::{FrameSource, HttpFrameSource};
use crate::inventory_store::InventoryStore;
use crate::metadata_client::MetadataClient;
use std::sync::Arc;
use std::time::Instant;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Detector endpoint URL (multipart POST)
    pub detector_url: String,
    /// Product metadata backend base URL
    pub metadata_url: String,
    /// Camera snapshot URL (JPEG GET)
    pub snapshot_url: String,
    /// Server port
    pub port: u16,
    /// Server host
    pub host: String,
    /// Detection tick interval in milliseconds
    pub poll_interval_ms: u64,
    /// Box selection resolve mode (local|remote)
    pub resolve_mode: ResolveMode,
    /// Start polling on boot
    pub poll_autostart: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            detector_url: std::env::var("DETECTOR_URL")
                .unwrap_or_else(|_| "http://192.168.1.20:5000/detect".to_string()),
            metadata_url: std::env::var("METADATA_URL")
                .unwrap_or_else(|_| "http://192.168.1.13:3000".to_string()),
            snapshot_url: std::env::var("SNAPSHOT_URL")
                .unwrap_or_else(|_| "http://192.168.1.10/snapshot.jpg".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(2000),
            resolve_mode: std::env::var("RESOLVE_MODE")
                .ok()
                .and_then(|m| m.parse().ok())
                .unwrap_or(ResolveMode::Remote),
            poll_autostart: std::env::var("POLL_AUTOSTART")
                .map(|v| v == "1" || v == "true")
                .unwrap_or(false),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Frame producer (camera snapshot)
    pub frame_source: Arc<dyn FrameSource>,
    /// Detector adapter
    pub detector: Arc<DetectorClient>,
    /// Product metadata backend adapter
    pub metadata: Arc<MetadataClient>,
    /// Current frame box set + selection
    pub box_store: Arc<DetectionBoxStore>,
    /// Kept items + delete/undo stack
    pub inventory: Arc<InventoryStore>,
    /// Detection polling loop
    pub scheduler: Arc<CaptureScheduler>,
    /// Process start time (for /healthz uptime)
    pub started_at: Instant,
}

impl AppState {
    /// Wire all components from config
    pub fn new(config: AppConfig) -> Self {
        let frame_source: Arc<dyn FrameSource> =
            Arc::new(HttpFrameSource::new(config.snapshot_url.clone()));
        let detector = Arc::new(DetectorClient::new(config.detector_url.clone()));
        let metadata = Arc::new(MetadataClient::new(config.metadata_url.clone()));
        let box_store = Arc::new(DetectionBoxStore::new(
            metadata.clone(),
            config.resolve_mode,
        ));
        let inventory = Arc::new(InventoryStore::new());
        let scheduler = Arc::new(CaptureScheduler::new(
            frame_source.clone(),
            detector.clone(),
            box_store.clone(),
        ));

        Self {
            config,
            frame_source,
            detector,
            metadata,
            box_store,
            inventory,
            scheduler,
            started_at: Instant::now(),
        }
    }
}
