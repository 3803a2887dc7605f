//! FrameSource - Image Capture for Detection Ticks
//!
//! ## Responsibilities
//!
//! - Produce one JPEG frame per detection tick
//! - Assign monotonically increasing sequence ids at capture time
//! - HTTP snapshot capture from an IP camera endpoint

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// One captured camera frame
///
/// Ephemeral: owned solely by the in-flight detection request that
/// produced it and discarded after the request resolves.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Monotonic sequence id assigned at capture
    pub sequence_id: u64,
    /// Capture timestamp
    pub captured_at: DateTime<Utc>,
    /// JPEG image data
    pub data: Vec<u8>,
}

/// Frame producer abstraction
///
/// The scheduler only depends on this trait, so tests can drive the
/// polling loop with synthetic frames.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Capture one frame
    async fn capture(&self) -> Result<CapturedFrame>;
}

/// FrameSource backed by an HTTP snapshot URL (IP camera style)
pub struct HttpFrameSource {
    client: reqwest::Client,
    snapshot_url: String,
    next_seq: AtomicU64,
}

impl HttpFrameSource {
    /// Create new HttpFrameSource
    pub fn new(snapshot_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            snapshot_url,
            next_seq: AtomicU64::new(1),
        }
    }

    /// Snapshot URL this source captures from
    pub fn snapshot_url(&self) -> &str {
        &self.snapshot_url
    }
}

#[async_trait]
impl FrameSource for HttpFrameSource {
    async fn capture(&self) -> Result<CapturedFrame> {
        let resp = self
            .client
            .get(&self.snapshot_url)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Snapshot request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::Network(format!(
                "Snapshot fetch failed: {}",
                resp.status()
            )));
        }

        let data = resp
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("Snapshot body read failed: {}", e)))?
            .to_vec();

        let sequence_id = self.next_seq.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            sequence_id = sequence_id,
            size = data.len(),
            "Frame captured"
        );

        Ok(CapturedFrame {
            sequence_id,
            captured_at: Utc::now(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_frame_source_url() {
        let source = HttpFrameSource::new("http://cam.local/snapshot.jpg".to_string());
        assert_eq!(source.snapshot_url(), "http://cam.local/snapshot.jpg");
    }

    #[test]
    fn test_sequence_starts_at_one() {
        let source = HttpFrameSource::new("http://cam.local/snapshot.jpg".to_string());
        assert_eq!(source.next_seq.load(Ordering::SeqCst), 1);
    }
}
