//! Decision logic of a camera-equipped putting trainer.
//!
//! This crate is purely computational. It consumes blob geometry produced by
//! an external vision stage and raw sensor samples, and produces candidates,
//! 3D estimates and impact events. It does no I/O besides loading a config.

mod config;
mod distance;
mod geometry;
mod impact;
mod logger;
mod selector;
mod sensor;

pub use config::{
    ConfigError, IntensityRange, PuttConfig, SegmentationThresholds, TelemetryParams,
};
pub use distance::{distance_between, BallHoleEstimate, CameraParams, DistanceEstimator};
pub use geometry::{Candidate, CandidateRole, DetectedRegion, PixelRect, Position3D};
pub use impact::{ImpactDetector, ImpactEvent, ImpactParams};
pub use selector::{CandidateSelector, Selection, SelectorParams};
pub use sensor::{AdcParams, ImuReading, PinLevel, SensorSample};

#[cfg(feature = "tracing")]
pub use logger::{init_tracing, TracingInitError};

pub use logger::init_with_level;
