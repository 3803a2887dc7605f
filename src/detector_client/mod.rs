//! DetectorClient - Remote Object-Detector Adapter
//!
//! ## Responsibilities
//!
//! - Send captured frames to the detector endpoint (multipart JPEG)
//! - Parse and normalize detection responses into canonical boxes
//! - Map transport/parse failures into typed errors
//!
//! The detector is a black box returning a JSON array of detection
//! records. Two record shapes exist in the wild:
//! `{topLeft, bottomRight, label}` and `{topRight, bottomLeft, id}`.
//! Both are normalized into [`DetectedBox`]; anything else is a
//! malformed response.

use crate::error::{Error, Result};
use crate::frame_source::CapturedFrame;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Detection abstraction the scheduler depends on
///
/// Lets tests drive the polling loop without a live detector.
#[async_trait]
pub trait Detect: Send + Sync {
    /// Classify one frame into detected boxes
    async fn detect(&self, frame: &CapturedFrame) -> Result<Vec<DetectedBox>>;
}

/// A 2D point in frame-relative pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Canonical detected box
///
/// Coordinates are frame-relative; the set for a frame is only ever
/// replaced wholesale, never merged with a previous frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedBox {
    /// Stable within one frame; carries the product key when the
    /// detector reports one
    pub id: String,
    pub top_left: Point,
    pub bottom_right: Point,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Raw detection record as received from the detector
#[derive(Debug, Clone, Deserialize)]
pub struct RawDetection {
    #[serde(rename = "topLeft")]
    pub top_left: Option<Point>,
    #[serde(rename = "bottomRight")]
    pub bottom_right: Option<Point>,
    #[serde(rename = "topRight")]
    pub top_right: Option<Point>,
    #[serde(rename = "bottomLeft")]
    pub bottom_left: Option<Point>,
    pub label: Option<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub confidence: Option<f32>,
}

/// Detector client
pub struct DetectorClient {
    client: reqwest::Client,
    detect_url: String,
}

impl DetectorClient {
    /// Create new detector client
    pub fn new(detect_url: String) -> Self {
        Self::with_timeout(detect_url, Duration::from_secs(30))
    }

    /// Create new detector client with custom timeout
    pub fn with_timeout(detect_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, detect_url }
    }

    /// Check detector reachability (best effort)
    pub async fn health_check(&self) -> bool {
        match self.client.get(&self.detect_url).send().await {
            Ok(_) => true,
            Err(e) => !e.is_connect(),
        }
    }

    /// Detector endpoint URL
    pub fn detect_url(&self) -> &str {
        &self.detect_url
    }
}

#[async_trait]
impl Detect for DetectorClient {
    /// Send one frame for detection and return the normalized boxes
    ///
    /// Records failing the box geometry invariant are dropped with a
    /// warning; a single bad detection does not abort the frame.
    async fn detect(&self, frame: &CapturedFrame) -> Result<Vec<DetectedBox>> {
        let form = Form::new().part(
            "image",
            Part::bytes(frame.data.clone())
                .file_name("frame.jpg")
                .mime_str("image/jpeg")?,
        );

        let resp = self
            .client
            .post(&self.detect_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Detector request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::Network(format!(
                "Detector returned {}",
                resp.status()
            )));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("Detector body not JSON: {}", e)))?;

        let boxes = parse_detections(&body)?;

        tracing::debug!(
            sequence_id = frame.sequence_id,
            count = boxes.len(),
            "Frame analyzed"
        );

        Ok(boxes)
    }
}

/// Parse a detector response body into canonical boxes
///
/// The body must be a JSON array of known-shape records. Unknown record
/// shapes fail the whole frame; geometry-invalid records are dropped
/// individually.
pub fn parse_detections(body: &serde_json::Value) -> Result<Vec<DetectedBox>> {
    let records = body
        .as_array()
        .ok_or_else(|| Error::MalformedResponse("Detector body is not an array".to_string()))?;

    let mut boxes = Vec::with_capacity(records.len());

    for (index, value) in records.iter().enumerate() {
        let raw: RawDetection = serde_json::from_value(value.clone()).map_err(|e| {
            Error::MalformedResponse(format!("Detection record {}: {}", index, e))
        })?;

        if let Some(boxed) = normalize_record(raw, index)? {
            boxes.push(boxed);
        }
    }

    Ok(boxes)
}

/// Normalize one raw record into a canonical box
///
/// Returns `Ok(None)` when the record is a known shape but fails the
/// geometry invariant (inverted corners).
fn normalize_record(raw: RawDetection, index: usize) -> Result<Option<DetectedBox>> {
    let (top_left, bottom_right) = match (
        raw.top_left,
        raw.bottom_right,
        raw.top_right,
        raw.bottom_left,
    ) {
        (Some(tl), Some(br), _, _) => (tl, br),
        (_, _, Some(tr), Some(bl)) => (
            Point { x: bl.x, y: tr.y },
            Point { x: tr.x, y: bl.y },
        ),
        _ => {
            return Err(Error::MalformedResponse(format!(
                "Detection record {} has no known corner pair",
                index
            )))
        }
    };

    let id = match &raw.id {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            return Err(Error::MalformedResponse(format!(
                "Detection record {} has non-scalar id: {}",
                index, other
            )))
        }
        None => None,
    };

    let label = match (raw.label, &id) {
        (Some(label), _) => label,
        (None, Some(id)) => id.clone(),
        (None, None) => {
            return Err(Error::MalformedResponse(format!(
                "Detection record {} has neither label nor id",
                index
            )))
        }
    };

    let id = id.unwrap_or_else(|| format!("box-{}", index));

    // Inverted boxes are dropped, not clamped
    if bottom_right.x < top_left.x || bottom_right.y < top_left.y {
        tracing::warn!(
            index = index,
            label = %label,
            "Dropping detection with inverted geometry"
        );
        return Ok(None);
    }

    Ok(Some(DetectedBox {
        id,
        top_left,
        bottom_right,
        label,
        confidence: raw.confidence,
    }))
}
