//! The device's main loop, one tick at a time.
//!
//! Per tick: sample the clock once, apply queued link events, read one frame
//! and one sensor sample, select ball/hole, estimate the shot distance when
//! the capture input is held, run impact detection and, on its own cadence,
//! publish the raw sensor stream. Nothing in a tick waits on the radio.

use std::sync::Arc;

use log::{debug, warn};
use putt_core::{
    BallHoleEstimate, CandidateSelector, ConfigError, DistanceEstimator, ImpactDetector,
    ImpactEvent, PuttConfig, Selection, SensorSample,
};
use putt_telemetry::{
    ConnectionState, ImpactPacket, LinkEventReceiver, LinkReaction, LinkState, SensorStreamPacket,
    ShotPacket, TelemetryPacket,
};
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::device::{Clock, Frame, FrameSource, SensorSource, Transport};

/// Why a tick did no work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "input", content = "error", rename_all = "snake_case")]
pub enum SkipReason {
    Frame(String),
    Sensor(String),
}

/// What one tick observed and sent.
#[derive(Clone, Debug, Serialize)]
pub struct IterationReport {
    pub timestamp_ms: u64,
    pub skipped: Option<SkipReason>,
    pub selection: Selection,
    /// Present only for ticks with the capture input asserted and both
    /// candidates selected.
    pub estimate: Option<BallHoleEstimate>,
    pub shot: Option<ShotPacket>,
    pub impact: Option<ImpactEvent>,
    pub sensor_stream: bool,
    pub notifications: u32,
    pub dispatch_failures: u32,
    pub link: LinkState,
}

impl IterationReport {
    fn new(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            skipped: None,
            selection: Selection::default(),
            estimate: None,
            shot: None,
            impact: None,
            sensor_stream: false,
            notifications: 0,
            dispatch_failures: 0,
            link: LinkState::DISCONNECTED,
        }
    }
}

/// Counters accumulated over the life of a loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    pub iterations: u64,
    pub skipped: u64,
    pub shots: u64,
    pub impacts: u64,
    pub sensor_streams: u64,
    pub notifications: u64,
    pub dispatch_failures: u64,
}

#[derive(Clone, Copy, Debug, Default)]
struct DispatchOutcome {
    notified: bool,
    failed: bool,
}

pub struct ControlLoop<F, S, C, T> {
    config: PuttConfig,
    selector: CandidateSelector,
    estimator: DistanceEstimator,
    impact: ImpactDetector,
    link: Arc<ConnectionState>,
    link_events: Option<LinkEventReceiver>,
    frames: F,
    sensors: S,
    clock: C,
    transport: T,
    last_stream_ms: Option<u64>,
    stats: LoopStats,
}

impl<F, S, C, T> ControlLoop<F, S, C, T>
where
    F: FrameSource,
    S: SensorSource,
    C: Clock,
    T: Transport,
{
    /// Build a loop from a validated config and its collaborators.
    pub fn new(
        config: PuttConfig,
        frames: F,
        sensors: S,
        clock: C,
        transport: T,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            selector: CandidateSelector::new(config.selector),
            estimator: DistanceEstimator::new(config.camera),
            impact: ImpactDetector::new(config.impact),
            link: Arc::new(ConnectionState::new()),
            link_events: None,
            frames,
            sensors,
            clock,
            transport,
            last_stream_ms: None,
            stats: LoopStats::default(),
            config,
        })
    }

    /// Drain this queue at the start of every tick.
    pub fn with_link_events(mut self, rx: LinkEventReceiver) -> Self {
        self.link_events = Some(rx);
        self
    }

    /// Handle for the radio context to deliver link events directly.
    pub fn link(&self) -> Arc<ConnectionState> {
        Arc::clone(&self.link)
    }

    #[inline]
    pub fn config(&self) -> &PuttConfig {
        &self.config
    }

    #[inline]
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Run forever. The device only leaves this loop through a reset.
    pub fn run(&mut self) -> ! {
        loop {
            self.run_iteration();
        }
    }

    /// Run `n` ticks and collect their reports.
    pub fn run_for(&mut self, n: usize) -> Vec<IterationReport> {
        (0..n).map(|_| self.run_iteration()).collect()
    }

    /// Execute one tick. Never fails: problems degrade the tick instead.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn run_iteration(&mut self) -> IterationReport {
        let now = self.clock.now_ms();
        let mut report = IterationReport::new(now);
        self.stats.iterations += 1;

        if let Some(rx) = &self.link_events {
            if self.link.drain(rx) == LinkReaction::ResumeAdvertising {
                self.transport.resume_advertising();
            }
        }

        let (frame, sample) = match self.acquire_tick() {
            Ok(tick) => tick,
            Err(reason) => {
                warn!("tick at {now} ms skipped: {reason:?}");
                self.stats.skipped += 1;
                report.skipped = Some(reason);
                report.link = self.link.snapshot();
                return report;
            }
        };

        report.selection = self
            .selector
            .select(&frame.ball_regions, &frame.hole_regions);

        if sample.capture_asserted() && report.selection.is_complete() {
            let estimate = self.estimator.ball_to_hole(
                report.selection.ball.as_ref(),
                report.selection.hole.as_ref(),
            );
            if let Some(distance_m) = estimate.distance_m {
                let shot = ShotPacket::from_distance(distance_m);
                debug!("shot: {distance_m:.3} m, force {}", shot.force);
                self.dispatch(TelemetryPacket::Shot(shot), &mut report);
                report.shot = Some(shot);
                self.stats.shots += 1;
            }
            report.estimate = Some(estimate);
        }

        if let Some(event) = self.impact.update(&sample, now) {
            self.dispatch(
                TelemetryPacket::Impact(ImpactPacket::from(&event)),
                &mut report,
            );
            report.impact = Some(event);
            self.stats.impacts += 1;
        }

        if self.sensor_stream_due(now) {
            self.last_stream_ms = Some(now);
            self.dispatch(
                TelemetryPacket::SensorStream(SensorStreamPacket::from(&sample)),
                &mut report,
            );
            report.sensor_stream = true;
            self.stats.sensor_streams += 1;
        }

        report.link = self.link.snapshot();
        report
    }

    /// Frame and sensors form one tick; if either is missing the tick is
    /// dropped rather than paired with a stale reading.
    fn acquire_tick(&mut self) -> Result<(Frame, SensorSample), SkipReason> {
        let frame = self
            .frames
            .acquire(&self.config.segmentation)
            .map_err(|e| SkipReason::Frame(e.to_string()))?;
        let sample = self
            .sensors
            .sample()
            .map_err(|e| SkipReason::Sensor(e.to_string()))?;
        Ok((frame, sample))
    }

    fn sensor_stream_due(&self, now: u64) -> bool {
        match self.last_stream_ms {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.config.telemetry.sensor_period_ms,
        }
    }

    fn dispatch(&mut self, packet: TelemetryPacket, report: &mut IterationReport) {
        let outcome = self.transmit(&packet);
        if outcome.notified {
            report.notifications += 1;
            self.stats.notifications += 1;
        }
        if outcome.failed {
            report.dispatch_failures += 1;
            self.stats.dispatch_failures += 1;
        }
    }

    /// Always refresh the resting value; notify only a live, subscribed channel.
    fn transmit(&mut self, packet: &TelemetryPacket) -> DispatchOutcome {
        let channel = packet.channel();
        let bytes = packet.encode();

        let sent = self.transport.set_value(channel, &bytes).and_then(|()| {
            if self.link.snapshot().can_notify(channel) {
                self.transport.notify(channel, &bytes).map(|()| true)
            } else {
                Ok(false)
            }
        });

        match sent {
            Ok(notified) => DispatchOutcome {
                notified,
                failed: false,
            },
            Err(err) => {
                warn!("{} dispatch on {channel} failed: {err}", packet.kind());
                if self.link.mark_link_lost() == LinkReaction::ResumeAdvertising {
                    self.transport.resume_advertising();
                }
                DispatchOutcome {
                    notified: false,
                    failed: true,
                }
            }
        }
    }
}
