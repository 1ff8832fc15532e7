//! Debounced impact detection on the force-sensor voltage.
//!
//! A strike pulls the sensor voltage below a threshold. Every sample below
//! the threshold is a trigger candidate; a candidate fires only if more than
//! `cooldown_ms` has passed since the previous firing. There is no edge
//! detection: a press held across several cooldown windows fires once per
//! window.

use log::info;
use serde::{Deserialize, Serialize};

use crate::sensor::{ImuReading, SensorSample};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactParams {
    /// Voltage strictly below this counts as a strike.
    pub threshold_v: f32,
    pub cooldown_ms: u64,
}

impl Default for ImpactParams {
    fn default() -> Self {
        Self {
            threshold_v: 3.1,
            cooldown_ms: 500,
        }
    }
}

/// A detected strike with the sensor state of the same tick.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImpactEvent {
    /// Monotonic milliseconds.
    pub timestamp_ms: u64,
    pub imu: ImuReading,
    pub voltage: f32,
}

#[derive(Clone, Debug, Default)]
pub struct ImpactDetector {
    params: ImpactParams,
    last_trigger_ms: Option<u64>,
}

impl ImpactDetector {
    pub fn new(params: ImpactParams) -> Self {
        Self {
            params,
            last_trigger_ms: None,
        }
    }

    #[inline]
    pub fn params(&self) -> &ImpactParams {
        &self.params
    }

    #[inline]
    pub fn last_trigger_ms(&self) -> Option<u64> {
        self.last_trigger_ms
    }

    fn cooldown_elapsed(&self, timestamp_ms: u64) -> bool {
        match self.last_trigger_ms {
            None => true,
            // A clock that steps backwards never re-arms early.
            Some(last) => timestamp_ms.saturating_sub(last) > self.params.cooldown_ms,
        }
    }

    /// Feed one sample. Returns an event when the trigger condition holds.
    pub fn update(&mut self, sample: &SensorSample, timestamp_ms: u64) -> Option<ImpactEvent> {
        let pressed = sample.voltage < self.params.threshold_v;
        if !pressed || !self.cooldown_elapsed(timestamp_ms) {
            return None;
        }
        self.last_trigger_ms = Some(timestamp_ms);
        info!(
            "impact at {timestamp_ms} ms (voltage {:.3} V)",
            sample.voltage
        );
        Some(ImpactEvent {
            timestamp_ms,
            imu: sample.imu,
            voltage: sample.voltage,
        })
    }

    /// Forget the last trigger, e.g. after the device is re-armed.
    pub fn reset(&mut self) {
        self.last_trigger_ms = None;
    }
}
