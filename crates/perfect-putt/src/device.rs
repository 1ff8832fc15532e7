//! Seams to the external collaborators: vision, sensors, clock and radio.

use std::time::Instant;

use putt_core::{DetectedRegion, SegmentationThresholds, SensorSample};
use putt_telemetry::ChannelId;
use serde::{Deserialize, Serialize};

/// Read failure of a frame or sensor collaborator.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("{0} read timed out")]
    Timeout(&'static str),
    #[error("{device} failed: {reason}")]
    Device { device: &'static str, reason: String },
    #[error("no more input")]
    Exhausted,
}

/// Failed write to the wireless link.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("link busy")]
    Busy,
    #[error("no central connected")]
    NotConnected,
    #[error("radio error: {0}")]
    Radio(String),
}

/// Regions extracted from one camera frame, one list per segmentation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub ball_regions: Vec<DetectedRegion>,
    #[serde(default)]
    pub hole_regions: Vec<DetectedRegion>,
}

/// Camera + blob extraction. Must return within the driver's own latency.
pub trait FrameSource {
    fn acquire(&mut self, thresholds: &SegmentationThresholds) -> Result<Frame, SourceError>;
}

/// Force sensor, IMU and capture input, sampled together.
pub trait SensorSource {
    fn sample(&mut self) -> Result<SensorSample, SourceError>;
}

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Outbound side of the radio.
///
/// Implementations must not block; a busy link is an error, not a wait.
pub trait Transport {
    /// Update the resting value readers see without a subscription.
    fn set_value(&mut self, channel: ChannelId, bytes: &[u8]) -> Result<(), TransportError>;

    /// Push a notification to the subscribed central.
    fn notify(&mut self, channel: ChannelId, bytes: &[u8]) -> Result<(), TransportError>;

    /// Start advertising again after the central went away.
    fn resume_advertising(&mut self) {}
}

/// [`Clock`] backed by [`Instant`], counting from construction.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    started: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}
