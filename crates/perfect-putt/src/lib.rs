//! Putting trainer core: the control loop that ties vision, sensors and the
//! wireless link together, plus a deterministic scenario replay.
//!
//! ## Quickstart
//!
//! ```no_run
//! use perfect_putt::core::PuttConfig;
//! use perfect_putt::replay::{run_scenario, Scenario};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scenario = Scenario::load_json("session.json")?;
//! let report = run_scenario(PuttConfig::default(), &scenario)?;
//! println!("shots: {}", report.stats.shots);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `perfect_putt::core`: candidate selection, distance, impact detection, config.
//! - `perfect_putt::telemetry`: packets, channels, advertising, link state.
//! - [`device`]: collaborator traits the loop is generic over.
//! - [`control`]: [`ControlLoop`] and its per-tick reports.
//! - [`replay`]: scripted collaborators and [`run_scenario`].

pub use putt_core as core;
pub use putt_telemetry as telemetry;

pub mod control;
pub mod device;
pub mod replay;

pub use control::{ControlLoop, IterationReport, LoopStats, SkipReason};
pub use device::{
    Clock, Frame, FrameSource, MonotonicClock, SensorSource, SourceError, Transport,
    TransportError,
};
pub use putt_core::PuttConfig;
pub use replay::{run_scenario, ReplayError, Scenario, ScenarioReport, ScenarioTick};
