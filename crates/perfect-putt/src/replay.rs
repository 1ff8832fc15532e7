//! Deterministic replay of recorded or hand-written sessions.
//!
//! A [`Scenario`] is a JSON list of ticks. Each tick fixes the clock, the
//! regions the vision stage would report, the sensor sample, the link events
//! delivered before the tick and whether the radio rejects transmissions.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::info;
use putt_core::{ConfigError, DetectedRegion, PuttConfig, SegmentationThresholds, SensorSample};
use putt_telemetry::{ChannelId, LinkEvent, LinkEventSender, PacketKind};
use serde::{Deserialize, Serialize};

use crate::control::{ControlLoop, IterationReport, LoopStats};
use crate::device::{
    Clock, Frame, FrameSource, SensorSource, SourceError, Transport, TransportError,
};

#[derive(thiserror::Error, Debug)]
pub enum ReplayError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioTick {
    pub time_ms: u64,
    pub ball_regions: Vec<DetectedRegion>,
    pub hole_regions: Vec<DetectedRegion>,
    /// `None` replays a failed sensor read.
    pub sample: Option<SensorSample>,
    pub frame_missing: bool,
    pub link_events: Vec<LinkEvent>,
    pub fail_transmit: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub ticks: Vec<ScenarioTick>,
}

impl Scenario {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReplayError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Frames taken from a queue; `None` entries fail like a camera timeout.
#[derive(Debug, Default)]
pub struct ScriptedFrames {
    frames: VecDeque<Option<Frame>>,
}

impl ScriptedFrames {
    pub fn push(&mut self, frame: Option<Frame>) {
        self.frames.push_back(frame);
    }
}

impl FrameSource for ScriptedFrames {
    fn acquire(&mut self, _thresholds: &SegmentationThresholds) -> Result<Frame, SourceError> {
        match self.frames.pop_front() {
            Some(Some(frame)) => Ok(frame),
            Some(None) => Err(SourceError::Timeout("camera")),
            None => Err(SourceError::Exhausted),
        }
    }
}

#[derive(Debug, Default)]
pub struct ScriptedSensors {
    samples: VecDeque<Option<SensorSample>>,
}

impl ScriptedSensors {
    pub fn push(&mut self, sample: Option<SensorSample>) {
        self.samples.push_back(sample);
    }
}

impl SensorSource for ScriptedSensors {
    fn sample(&mut self) -> Result<SensorSample, SourceError> {
        match self.samples.pop_front() {
            Some(Some(sample)) => Ok(sample),
            Some(None) => Err(SourceError::Timeout("sensor")),
            None => Err(SourceError::Exhausted),
        }
    }
}

/// Clock that only moves when told to.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScriptedClock {
    now_ms: u64,
}

impl ScriptedClock {
    pub fn set(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }
}

impl Clock for ScriptedClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransmitOp {
    SetValue,
    Notify,
}

/// One accepted transmission, with the bytes as hex.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmitRecord {
    pub op: TransmitOp,
    pub channel: ChannelId,
    pub kind: Option<PacketKind>,
    pub hex: String,
}

/// Transport that records instead of transmitting.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    records: Vec<TransmitRecord>,
    failing: bool,
    advertising_restarts: u32,
}

impl RecordingTransport {
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn advertising_restarts(&self) -> u32 {
        self.advertising_restarts
    }

    pub fn records(&self) -> &[TransmitRecord] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<TransmitRecord> {
        std::mem::take(&mut self.records)
    }

    fn record(
        &mut self,
        op: TransmitOp,
        channel: ChannelId,
        bytes: &[u8],
    ) -> Result<(), TransportError> {
        if self.failing {
            return Err(TransportError::Radio("scripted failure".into()));
        }
        self.records.push(TransmitRecord {
            op,
            channel,
            kind: PacketKind::from_wire_len(bytes.len()),
            hex: to_hex(bytes),
        });
        Ok(())
    }
}

impl Transport for RecordingTransport {
    fn set_value(&mut self, channel: ChannelId, bytes: &[u8]) -> Result<(), TransportError> {
        self.record(TransmitOp::SetValue, channel, bytes)
    }

    fn notify(&mut self, channel: ChannelId, bytes: &[u8]) -> Result<(), TransportError> {
        self.record(TransmitOp::Notify, channel, bytes)
    }

    fn resume_advertising(&mut self) {
        self.advertising_restarts += 1;
    }
}

/// Lower-case hex without separators.
pub fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Report of one replayed tick.
#[derive(Clone, Debug, Serialize)]
pub struct TickReport {
    #[serde(flatten)]
    pub iteration: IterationReport,
    pub transmissions: Vec<TransmitRecord>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub ticks: Vec<TickReport>,
    pub stats: LoopStats,
    pub advertising_restarts: u32,
}

pub type ReplayLoop = ControlLoop<ScriptedFrames, ScriptedSensors, ScriptedClock, RecordingTransport>;

struct Replay {
    control: ReplayLoop,
    events: LinkEventSender,
}

impl Replay {
    fn new(config: PuttConfig, scenario: &Scenario) -> Result<Self, ConfigError> {
        let mut frames = ScriptedFrames::default();
        let mut sensors = ScriptedSensors::default();
        for tick in &scenario.ticks {
            frames.push((!tick.frame_missing).then(|| Frame {
                ball_regions: tick.ball_regions.clone(),
                hole_regions: tick.hole_regions.clone(),
            }));
            // A missing frame ends the tick before the sensors are read.
            if !tick.frame_missing {
                sensors.push(tick.sample);
            }
        }
        let (events, rx) = putt_telemetry::link_channel();
        let control = ControlLoop::new(
            config,
            frames,
            sensors,
            ScriptedClock::default(),
            RecordingTransport::default(),
        )?
        .with_link_events(rx);
        Ok(Self { control, events })
    }

    fn step(&mut self, tick: &ScenarioTick) -> TickReport {
        self.control.clock_mut().set(tick.time_ms);
        self.control.transport_mut().set_failing(tick.fail_transmit);
        for event in &tick.link_events {
            self.events.send(*event);
        }
        let iteration = self.control.run_iteration();
        TickReport {
            iteration,
            transmissions: self.control.transport_mut().take_records(),
        }
    }
}

/// Replay every tick of `scenario` through a fresh control loop.
pub fn run_scenario(config: PuttConfig, scenario: &Scenario) -> Result<ScenarioReport, ConfigError> {
    let mut replay = Replay::new(config, scenario)?;
    let ticks: Vec<TickReport> = scenario.ticks.iter().map(|t| replay.step(t)).collect();
    let stats = replay.control.stats();
    info!(
        "scenario '{}': {} ticks, {} shots, {} impacts, {} skipped",
        scenario.name, stats.iterations, stats.shots, stats.impacts, stats.skipped
    );
    Ok(ScenarioReport {
        name: scenario.name.clone(),
        ticks,
        stats,
        advertising_restarts: replay.control.transport_mut().advertising_restarts(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use putt_core::{PinLevel, PixelRect};

    fn ball() -> DetectedRegion {
        DetectedRegion::from_rect(PixelRect::new(150, 150, 20, 20), 314, 0.92, 0.05)
    }

    fn hole() -> DetectedRegion {
        DetectedRegion::from_rect(PixelRect::new(140, 60, 40, 12), 380, 0.4, 0.85)
    }

    fn tick(time_ms: u64, voltage: f32) -> ScenarioTick {
        ScenarioTick {
            time_ms,
            ball_regions: vec![ball()],
            hole_regions: vec![hole()],
            sample: Some(SensorSample {
                voltage,
                capture: PinLevel::High,
                ..SensorSample::default()
            }),
            ..ScenarioTick::default()
        }
    }

    #[test]
    fn hex_is_lowercase_and_padded() {
        assert_eq!(to_hex(&[0x00, 0x0a, 0xff]), "000aff");
        assert_eq!(to_hex(&[]), "");
    }

    #[test]
    fn missing_frame_does_not_consume_a_sample() {
        let mut missing = tick(0, 2.0);
        missing.frame_missing = true;
        let scenario = Scenario {
            name: "gap".into(),
            ticks: vec![missing, tick(10, 2.0)],
        };
        let report = run_scenario(PuttConfig::default(), &scenario).expect("replay");
        assert!(matches!(
            report.ticks[0].iteration.skipped,
            Some(crate::control::SkipReason::Frame(_))
        ));
        assert!(report.ticks[0].transmissions.is_empty());
        let second = &report.ticks[1];
        assert!(second.iteration.impact.is_some());
        assert_eq!(second.iteration.timestamp_ms, 10);
    }

    #[test]
    fn transmissions_are_attributed_to_their_tick() {
        let scenario = Scenario {
            name: "values".into(),
            ticks: vec![tick(0, 3.3), tick(50, 3.3), tick(100, 3.3)],
        };
        let report = run_scenario(PuttConfig::default(), &scenario).expect("replay");
        let counts: Vec<usize> = report.ticks.iter().map(|t| t.transmissions.len()).collect();
        assert_eq!(counts, vec![1, 0, 1]);
        let rec = &report.ticks[0].transmissions[0];
        assert_eq!(rec.op, TransmitOp::SetValue);
        assert_eq!(rec.channel, ChannelId::Sensor);
        assert_eq!(rec.kind, Some(PacketKind::SensorStream));
        assert_eq!(rec.hex.len(), 56);
    }

    #[test]
    fn scenario_json_uses_defaults() {
        let s: Scenario =
            serde_json::from_str(r#"{"ticks":[{"time_ms":5},{"time_ms":9,"frame_missing":true}]}"#)
                .expect("parse");
        assert_eq!(s.ticks.len(), 2);
        assert_eq!(s.ticks[0].sample, None);
        assert!(s.ticks[1].frame_missing);
        assert!(s.name.is_empty());
    }
}
