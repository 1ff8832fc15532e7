//! Fixed-layout little-endian telemetry packets.
//!
//! There is no type byte on the wire: the three layouts have distinct sizes
//! and receivers discriminate by length.
//!
//! | Packet        | Layout                                   | Size |
//! |---------------|------------------------------------------|------|
//! | Shot          | `f32 distance_m, u16 force`              | 6    |
//! | SensorStream  | `f32 × 7` (accel xyz, gyro xyz, voltage) | 28   |
//! | Impact        | `u32 timestamp_ms, f32 × 7`              | 32   |

use std::fmt;

use putt_core::{ImpactEvent, ImuReading, SensorSample};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::channel::ChannelId;
use crate::error::WireError;

pub const SHOT_LEN: usize = 6;
pub const SENSOR_STREAM_LEN: usize = 28;
pub const IMPACT_LEN: usize = 32;

/// Meters to force units.
const FORCE_PER_METER: f32 = 700.0;
const MAX_FORCE: f32 = 1000.0;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    Shot,
    SensorStream,
    Impact,
}

impl PacketKind {
    pub const fn wire_len(self) -> usize {
        match self {
            PacketKind::Shot => SHOT_LEN,
            PacketKind::SensorStream => SENSOR_STREAM_LEN,
            PacketKind::Impact => IMPACT_LEN,
        }
    }

    pub fn from_wire_len(len: usize) -> Option<Self> {
        match len {
            SHOT_LEN => Some(PacketKind::Shot),
            SENSOR_STREAM_LEN => Some(PacketKind::SensorStream),
            IMPACT_LEN => Some(PacketKind::Impact),
            _ => None,
        }
    }

    /// Channel this packet is published on.
    pub const fn channel(self) -> ChannelId {
        match self {
            PacketKind::Shot => ChannelId::Packet,
            PacketKind::SensorStream => ChannelId::Sensor,
            PacketKind::Impact => ChannelId::Impact,
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PacketKind::Shot => "shot",
            PacketKind::SensorStream => "sensor-stream",
            PacketKind::Impact => "impact",
        })
    }
}

/// `clamp(round(distance_m * 700), 0, 1000)`. NaN maps to 0.
pub fn shot_force(distance_m: f32) -> u16 {
    let scaled = (distance_m * FORCE_PER_METER).round();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, MAX_FORCE) as u16
}

fn check_len(packet: PacketKind, buf: &[u8]) -> Result<(), WireError> {
    if buf.len() != packet.wire_len() {
        return Err(WireError::InvalidLength {
            packet,
            expected: packet.wire_len(),
            got: buf.len(),
        });
    }
    Ok(())
}

// Callers check the total length first, so the fixed-size slices below are in range.
fn read_f32(buf: &[u8], at: usize) -> f32 {
    f32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn read_vec3(buf: &[u8], at: usize) -> [f32; 3] {
    [read_f32(buf, at), read_f32(buf, at + 4), read_f32(buf, at + 8)]
}

fn put_f32(buf: &mut [u8], at: usize, v: f32) {
    buf[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

fn put_vec3(buf: &mut [u8], at: usize, v: [f32; 3]) {
    for (k, x) in v.into_iter().enumerate() {
        put_f32(buf, at + 4 * k, x);
    }
}

/// Ball-to-hole result. Published on the Packet channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShotPacket {
    pub distance_m: f32,
    /// Derived from the distance by [`shot_force`]; opaque to this crate.
    pub force: u16,
}

impl ShotPacket {
    pub fn from_distance(distance_m: f32) -> Self {
        Self {
            distance_m,
            force: shot_force(distance_m),
        }
    }

    pub fn encode(&self) -> [u8; SHOT_LEN] {
        let mut out = [0u8; SHOT_LEN];
        put_f32(&mut out, 0, self.distance_m);
        out[4..6].copy_from_slice(&self.force.to_le_bytes());
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        check_len(PacketKind::Shot, buf)?;
        Ok(Self {
            distance_m: read_f32(buf, 0),
            force: u16::from_le_bytes([buf[4], buf[5]]),
        })
    }
}

/// Periodic raw sensor snapshot. Published on the Sensor channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorStreamPacket {
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
    pub voltage: f32,
}

impl SensorStreamPacket {
    pub fn encode(&self) -> [u8; SENSOR_STREAM_LEN] {
        let mut out = [0u8; SENSOR_STREAM_LEN];
        put_vec3(&mut out, 0, self.accel);
        put_vec3(&mut out, 12, self.gyro);
        put_f32(&mut out, 24, self.voltage);
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        check_len(PacketKind::SensorStream, buf)?;
        Ok(Self {
            accel: read_vec3(buf, 0),
            gyro: read_vec3(buf, 12),
            voltage: read_f32(buf, 24),
        })
    }
}

impl From<&SensorSample> for SensorStreamPacket {
    fn from(s: &SensorSample) -> Self {
        let (accel, gyro) = imu_arrays(&s.imu);
        Self {
            accel,
            gyro,
            voltage: s.voltage,
        }
    }
}

/// Strike snapshot. Published on the Impact channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactPacket {
    pub timestamp_ms: u32,
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
    pub voltage: f32,
}

impl ImpactPacket {
    pub fn encode(&self) -> [u8; IMPACT_LEN] {
        let mut out = [0u8; IMPACT_LEN];
        out[0..4].copy_from_slice(&self.timestamp_ms.to_le_bytes());
        put_vec3(&mut out, 4, self.accel);
        put_vec3(&mut out, 16, self.gyro);
        put_f32(&mut out, 28, self.voltage);
        out
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        check_len(PacketKind::Impact, buf)?;
        Ok(Self {
            timestamp_ms: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            accel: read_vec3(buf, 4),
            gyro: read_vec3(buf, 16),
            voltage: read_f32(buf, 28),
        })
    }
}

impl From<&ImpactEvent> for ImpactPacket {
    fn from(ev: &ImpactEvent) -> Self {
        let (accel, gyro) = imu_arrays(&ev.imu);
        Self {
            // The wire carries the low 32 bits; wraps after ~49 days of uptime.
            timestamp_ms: (ev.timestamp_ms & u64::from(u32::MAX)) as u32,
            accel,
            gyro,
            voltage: ev.voltage,
        }
    }
}

fn imu_arrays(imu: &ImuReading) -> ([f32; 3], [f32; 3]) {
    let a = imu.accel;
    let g = imu.gyro;
    ([a.x, a.y, a.z], [g.x, g.y, g.z])
}

/// Any of the three packets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryPacket {
    Shot(ShotPacket),
    SensorStream(SensorStreamPacket),
    Impact(ImpactPacket),
}

impl TelemetryPacket {
    pub fn kind(&self) -> PacketKind {
        match self {
            TelemetryPacket::Shot(_) => PacketKind::Shot,
            TelemetryPacket::SensorStream(_) => PacketKind::SensorStream,
            TelemetryPacket::Impact(_) => PacketKind::Impact,
        }
    }

    #[inline]
    pub fn channel(&self) -> ChannelId {
        self.kind().channel()
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            TelemetryPacket::Shot(p) => p.encode().to_vec(),
            TelemetryPacket::SensorStream(p) => p.encode().to_vec(),
            TelemetryPacket::Impact(p) => p.encode().to_vec(),
        }
    }

    /// Decode a buffer, using its length to pick the layout.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(buf), fields(len = buf.len())))]
    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        match PacketKind::from_wire_len(buf.len()) {
            Some(PacketKind::Shot) => ShotPacket::decode(buf).map(TelemetryPacket::Shot),
            Some(PacketKind::SensorStream) => {
                SensorStreamPacket::decode(buf).map(TelemetryPacket::SensorStream)
            }
            Some(PacketKind::Impact) => ImpactPacket::decode(buf).map(TelemetryPacket::Impact),
            None => Err(WireError::UnknownLength { got: buf.len() }),
        }
    }
}
