//! Phone-use watch.
//!
//! A phone held by a person (its box centre strictly inside a person box)
//! for `phone_hold_secs` without interruption triggers one spoken warning.
//! The timer and the warning latch both reset as soon as the overlap ends.

use std::sync::Arc;
use std::time::Duration;

use labeeb_core::config::VisionConfig;
use labeeb_voice::Speaker;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::detector::{Detections, ObjectDetector};

/// Overlap timer with a one-shot warning latch.
#[derive(Debug, Clone)]
pub struct PhoneWatch {
    hold: Duration,
    started: Option<Instant>,
    warned: bool,
}

impl PhoneWatch {
    pub fn new(hold: Duration) -> Self {
        Self {
            hold,
            started: None,
            warned: false,
        }
    }

    /// Feed one frame's detections. Returns `true` exactly when the warning
    /// should be spoken.
    pub fn observe(&mut self, detections: &Detections, now: Instant) -> bool {
        if !detections.phone_in_hand() {
            if self.started.take().is_some() {
                debug!("Phone overlap ended, timer reset");
            }
            self.warned = false;
            return false;
        }

        let started = *self.started.get_or_insert_with(|| {
            debug!("Phone overlap started");
            now
        });
        if !self.warned && now.duration_since(started) >= self.hold {
            self.warned = true;
            return true;
        }
        false
    }

    pub fn is_timing(&self) -> bool {
        self.started.is_some()
    }
}

/// Poll `detector` forever, speaking `config.warning_text` through `speaker`
/// whenever [`PhoneWatch`] fires. Speech is fire-and-forget so a slow
/// synthesis never delays the next poll.
pub async fn run_phone_watch(
    detector: Arc<dyn ObjectDetector>,
    speaker: Arc<dyn Speaker>,
    config: VisionConfig,
) {
    info!(
        hold_secs = config.phone_hold_secs,
        poll_ms = config.poll_interval_ms,
        "Phone watch started"
    );
    let mut watch = PhoneWatch::new(Duration::from_secs(config.phone_hold_secs));
    let poll = Duration::from_millis(config.poll_interval_ms.max(1));
    let mut failing = false;

    loop {
        match detector.detect().await {
            Ok(detections) => {
                if failing {
                    info!("Detector recovered");
                    failing = false;
                }
                if watch.observe(&detections, Instant::now()) {
                    info!("Phone held too long, warning");
                    let speaker = Arc::clone(&speaker);
                    let text = config.warning_text.clone();
                    tokio::spawn(async move {
                        if let Err(e) = speaker.speak(&text).await {
                            warn!(error = %e, "Failed to speak phone warning");
                        }
                    });
                }
            }
            Err(e) => {
                // Log once per outage rather than every poll.
                if !failing {
                    warn!(error = %e, "Object detection failed");
                    failing = true;
                }
            }
        }
        tokio::time::sleep(poll).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::BoundingBox;
    use async_trait::async_trait;
    use labeeb_core::LabeebError;
    use labeeb_voice::RecordingSpeaker;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn holding() -> Detections {
        Detections {
            people: vec![BoundingBox::new(100, 100, 300, 500)],
            phones: vec![BoundingBox::new(180, 250, 220, 310)],
        }
    }

    fn empty() -> Detections {
        Detections {
            people: vec![BoundingBox::new(100, 100, 300, 500)],
            phones: vec![],
        }
    }

    #[test]
    fn test_warns_once_after_hold() {
        let t0 = Instant::now();
        let mut watch = PhoneWatch::new(Duration::from_secs(10));

        assert!(!watch.observe(&holding(), t0));
        assert!(!watch.observe(&holding(), t0 + Duration::from_millis(9_900)));
        assert!(watch.observe(&holding(), t0 + Duration::from_secs(10)));
        assert!(!watch.observe(&holding(), t0 + Duration::from_secs(11)));
        assert!(!watch.observe(&holding(), t0 + Duration::from_secs(60)));
    }

    #[test]
    fn test_overlap_gap_resets_timer_and_latch() {
        let t0 = Instant::now();
        let mut watch = PhoneWatch::new(Duration::from_secs(10));

        watch.observe(&holding(), t0);
        assert!(!watch.observe(&empty(), t0 + Duration::from_secs(9)));
        assert!(!watch.is_timing());
        assert!(!watch.observe(&holding(), t0 + Duration::from_secs(12)));
        assert!(watch.observe(&holding(), t0 + Duration::from_secs(22)));

        watch.observe(&empty(), t0 + Duration::from_secs(23));
        watch.observe(&holding(), t0 + Duration::from_secs(24));
        assert!(watch.observe(&holding(), t0 + Duration::from_secs(34)));
    }

    struct FixedDetector {
        holding: AtomicBool,
    }

    #[async_trait]
    impl ObjectDetector for FixedDetector {
        async fn detect(&self) -> Result<Detections, LabeebError> {
            Ok(if self.holding.load(Ordering::SeqCst) {
                holding()
            } else {
                empty()
            })
        }
    }

    struct DownDetector;

    #[async_trait]
    impl ObjectDetector for DownDetector {
        async fn detect(&self) -> Result<Detections, LabeebError> {
            Err(LabeebError::Vision("camera unplugged".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_speaks_single_warning() {
        let detector = Arc::new(FixedDetector {
            holding: AtomicBool::new(true),
        });
        let speaker = Arc::new(RecordingSpeaker::new());
        let config = VisionConfig::default();
        let handle = tokio::spawn(run_phone_watch(
            detector.clone(),
            speaker.clone(),
            config.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(speaker.spoken().is_empty());

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(speaker.spoken(), vec![config.warning_text.clone()]);

        detector.holding.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(1)).await;
        detector.holding.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(speaker.spoken().len(), 2);

        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_survives_detector_failure() {
        let speaker = Arc::new(RecordingSpeaker::new());
        let handle = tokio::spawn(run_phone_watch(
            Arc::new(DownDetector),
            speaker.clone(),
            VisionConfig::default(),
        ));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!handle.is_finished());
        assert!(speaker.spoken().is_empty());
        handle.abort();
    }
}
