//! CaptureScheduler - Fixed-Cadence Detection Polling
//!
//! ## Responsibilities
//!
//! - Fire capture + detect ticks at a fixed interval
//! - Single-flight guard: a tick firing while work is in flight is
//!   skipped, never queued
//! - Generation token: results arriving after stop()/restart are
//!   discarded instead of applied
//!
//! A capture plus remote inference round-trip routinely exceeds the
//! tick interval. Without the single-flight guard requests pile up and
//! responses land out of order relative to the live camera state. No
//! backoff is applied; the fixed cadence is the only pacing.

use crate::detection_box_store::DetectionBoxStore;
use crate::detector_client::Detect;
use crate::frame_source::FrameSource;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval, MissedTickBehavior};

/// Scheduler status report
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_ms: u64,
    /// Ticks that started capture + detect work
    pub ticks: u64,
    /// Ticks skipped by the single-flight guard
    pub skipped: u64,
    /// Most recent tick failure, if any
    pub last_error: Option<String>,
}

/// CaptureScheduler instance
pub struct CaptureScheduler {
    frame_source: Arc<dyn FrameSource>,
    detector: Arc<dyn Detect>,
    box_store: Arc<DetectionBoxStore>,
    running: Arc<RwLock<bool>>,
    /// Bumped on every start()/stop(); a tick result is only applied
    /// while its generation still matches
    generation: Arc<AtomicU64>,
    in_flight: Arc<AtomicBool>,
    interval_ms: Arc<AtomicU64>,
    ticks: Arc<AtomicU64>,
    skipped: Arc<AtomicU64>,
    last_error: Arc<RwLock<Option<String>>>,
}

impl CaptureScheduler {
    /// Create new CaptureScheduler
    pub fn new(
        frame_source: Arc<dyn FrameSource>,
        detector: Arc<dyn Detect>,
        box_store: Arc<DetectionBoxStore>,
    ) -> Self {
        Self {
            frame_source,
            detector,
            box_store,
            running: Arc::new(RwLock::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicBool::new(false)),
            interval_ms: Arc::new(AtomicU64::new(0)),
            ticks: Arc::new(AtomicU64::new(0)),
            skipped: Arc::new(AtomicU64::new(0)),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Start the polling loop
    ///
    /// No-op with a warning if already running.
    pub async fn start(&self, tick_interval: Duration) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Capture scheduler already running");
                return;
            }
            *running = true;
        }

        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.interval_ms
            .store(tick_interval.as_millis() as u64, Ordering::SeqCst);

        tracing::info!(
            interval_ms = tick_interval.as_millis() as u64,
            generation = my_generation,
            "Starting capture scheduler"
        );

        let frame_source = self.frame_source.clone();
        let detector = self.detector.clone();
        let box_store = self.box_store.clone();
        let running = self.running.clone();
        let generation = self.generation.clone();
        let in_flight = self.in_flight.clone();
        let ticks = self.ticks.clone();
        let skipped = self.skipped.clone();
        let last_error = self.last_error.clone();

        tokio::spawn(async move {
            let mut ticker = interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;

                if !*running.read().await {
                    break;
                }
                if generation.load(Ordering::SeqCst) != my_generation {
                    break;
                }

                // Single-flight guard: skip this tick if the previous
                // one has not resolved yet
                if in_flight.swap(true, Ordering::SeqCst) {
                    skipped.fetch_add(1, Ordering::SeqCst);
                    tracing::debug!("Tick skipped, detection still in flight");
                    continue;
                }

                ticks.fetch_add(1, Ordering::SeqCst);

                let frame_source = frame_source.clone();
                let detector = detector.clone();
                let box_store = box_store.clone();
                let generation = generation.clone();
                let in_flight = in_flight.clone();
                let last_error = last_error.clone();

                tokio::spawn(async move {
                    let result = Self::run_tick(&*frame_source, &*detector).await;

                    match result {
                        Ok(boxes) => {
                            // Apply only if the scheduler generation is
                            // still the one this tick started under
                            if generation.load(Ordering::SeqCst) == my_generation {
                                box_store.replace(boxes).await;
                            } else {
                                tracing::debug!("Stale detection result discarded");
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Detection tick failed");
                            let mut slot = last_error.write().await;
                            *slot = Some(e.to_string());
                        }
                    }

                    in_flight.store(false, Ordering::SeqCst);
                });
            }

            tracing::info!(generation = my_generation, "Capture scheduler stopped");
        });
    }

    /// Stop the polling loop
    ///
    /// Safe to call at any point, including mid-flight; an in-flight
    /// result is discarded on arrival rather than applied.
    pub async fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut running = self.running.write().await;
        *running = false;
        tracing::info!("Stopping capture scheduler");
    }

    /// Whether the loop is currently running
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Status report for the API layer
    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: *self.running.read().await,
            interval_ms: self.interval_ms.load(Ordering::SeqCst),
            ticks: self.ticks.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
            last_error: self.last_error.read().await.clone(),
        }
    }

    /// One capture + detect round-trip
    async fn run_tick(
        frame_source: &dyn FrameSource,
        detector: &dyn Detect,
    ) -> crate::error::Result<Vec<crate::detector_client::DetectedBox>> {
        let frame = frame_source.capture().await?;
        detector.detect(&frame).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection_box_store::ResolveMode;
    use crate::detector_client::{DetectedBox, Point};
    use crate::error::{Error, Result};
    use crate::frame_source::CapturedFrame;
    use crate::metadata_client::MetadataClient;
    use async_trait::async_trait;
    use chrono::Utc;

    struct StaticFrameSource {
        next_seq: AtomicU64,
    }

    impl StaticFrameSource {
        fn new() -> Self {
            Self {
                next_seq: AtomicU64::new(1),
            }
        }
    }

    #[async_trait]
    impl FrameSource for StaticFrameSource {
        async fn capture(&self) -> Result<CapturedFrame> {
            Ok(CapturedFrame {
                sequence_id: self.next_seq.fetch_add(1, Ordering::SeqCst),
                captured_at: Utc::now(),
                data: vec![0xFF, 0xD8, 0xFF],
            })
        }
    }

    struct SlowDetector {
        delay: Duration,
        calls: AtomicU64,
    }

    impl SlowDetector {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                calls: AtomicU64::new(0),
            }
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Detect for SlowDetector {
        async fn detect(&self, _frame: &CapturedFrame) -> Result<Vec<DetectedBox>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(vec![DetectedBox {
                id: "box-0".to_string(),
                top_left: Point { x: 10.0, y: 10.0 },
                bottom_right: Point { x: 50.0, y: 60.0 },
                label: "milk".to_string(),
                confidence: Some(0.9),
            }])
        }
    }

    struct FailOnceDetector {
        calls: AtomicU64,
    }

    #[async_trait]
    impl Detect for FailOnceDetector {
        async fn detect(&self, _frame: &CapturedFrame) -> Result<Vec<DetectedBox>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                Err(Error::Network("detector unreachable".to_string()))
            } else {
                Ok(vec![DetectedBox {
                    id: "box-0".to_string(),
                    top_left: Point { x: 0.0, y: 0.0 },
                    bottom_right: Point { x: 1.0, y: 1.0 },
                    label: "milk".to_string(),
                    confidence: None,
                }])
            }
        }
    }

    fn box_store() -> Arc<DetectionBoxStore> {
        let metadata = Arc::new(MetadataClient::new("http://localhost:3000".to_string()));
        Arc::new(DetectionBoxStore::new(metadata, ResolveMode::Local))
    }

    #[tokio::test]
    async fn test_single_flight_no_concurrent_calls() {
        let detector = Arc::new(SlowDetector::new(Duration::from_millis(400)));
        let store = box_store();
        let scheduler = CaptureScheduler::new(
            Arc::new(StaticFrameSource::new()),
            detector.clone(),
            store,
        );

        scheduler.start(Duration::from_millis(20)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.stop().await;

        // Many ticks fired while the first call slept, but none started
        // a second concurrent call
        assert_eq!(detector.calls(), 1);

        let status = scheduler.status().await;
        assert!(status.skipped >= 1);
    }

    #[tokio::test]
    async fn test_successful_tick_replaces_boxes() {
        let detector = Arc::new(SlowDetector::new(Duration::from_millis(1)));
        let store = box_store();
        let scheduler = CaptureScheduler::new(
            Arc::new(StaticFrameSource::new()),
            detector.clone(),
            store.clone(),
        );

        scheduler.start(Duration::from_millis(20)).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.stop().await;

        let boxes = store.snapshot().await;
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].label, "milk");
    }

    #[tokio::test]
    async fn test_late_response_after_stop_discarded() {
        let detector = Arc::new(SlowDetector::new(Duration::from_millis(200)));
        let store = box_store();
        let scheduler = CaptureScheduler::new(
            Arc::new(StaticFrameSource::new()),
            detector.clone(),
            store.clone(),
        );

        scheduler.start(Duration::from_millis(10)).await;
        // Let the first call start, then stop before it resolves
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.stop().await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(detector.calls(), 1);
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_tick_does_not_stop_loop() {
        let detector = Arc::new(FailOnceDetector {
            calls: AtomicU64::new(0),
        });
        let store = box_store();
        let scheduler = CaptureScheduler::new(
            Arc::new(StaticFrameSource::new()),
            detector.clone(),
            store.clone(),
        );

        scheduler.start(Duration::from_millis(20)).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        scheduler.stop().await;

        // First call failed, later calls succeeded and applied
        assert!(detector.calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(store.count().await, 1);

        let status = scheduler.status().await;
        assert_eq!(
            status.last_error,
            Some("Network error: detector unreachable".to_string())
        );
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let detector = Arc::new(SlowDetector::new(Duration::from_millis(1)));
        let scheduler = CaptureScheduler::new(
            Arc::new(StaticFrameSource::new()),
            detector,
            box_store(),
        );

        scheduler.start(Duration::from_millis(50)).await;
        scheduler.start(Duration::from_millis(50)).await;
        assert!(scheduler.is_running().await);

        scheduler.stop().await;
        assert!(!scheduler.is_running().await);
    }

    #[tokio::test]
    async fn test_stop_without_start_is_safe() {
        let detector = Arc::new(SlowDetector::new(Duration::from_millis(1)));
        let scheduler = CaptureScheduler::new(
            Arc::new(StaticFrameSource::new()),
            detector,
            box_store(),
        );

        scheduler.stop().await;
        assert!(!scheduler.is_running().await);
    }
}
