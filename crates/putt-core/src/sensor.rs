//! Raw analog, inertial and digital inputs sampled once per iteration.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One inertial reading: acceleration in m/s² and angular rate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuReading {
    pub accel: Vector3<f32>,
    pub gyro: Vector3<f32>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinLevel {
    Low,
    #[default]
    High,
}

/// Everything read from the sensors in a single tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    #[serde(default)]
    pub imu: ImuReading,
    /// Force-sensor voltage, normalized to the ADC range.
    pub voltage: f32,
    /// Capture button; active-low.
    #[serde(default)]
    pub capture: PinLevel,
}

impl SensorSample {
    #[inline]
    pub fn capture_asserted(&self) -> bool {
        self.capture == PinLevel::Low
    }
}

/// Analog-to-digital converter scaling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcParams {
    pub resolution_bits: u8,
    pub reference_v: f32,
}

impl Default for AdcParams {
    fn default() -> Self {
        Self {
            resolution_bits: 12,
            reference_v: 3.3,
        }
    }
}

impl AdcParams {
    /// Largest code the converter produces, e.g. 4095 for 12 bits.
    pub fn full_scale(&self) -> u32 {
        let bits = u32::from(self.resolution_bits.clamp(1, 16));
        (1u32 << bits) - 1
    }

    /// Convert a raw code to volts. Codes above full scale saturate.
    pub fn to_voltage(&self, raw: u16) -> f32 {
        let full = self.full_scale();
        let raw = u32::from(raw).min(full);
        raw as f32 * self.reference_v / full as f32
    }
}
