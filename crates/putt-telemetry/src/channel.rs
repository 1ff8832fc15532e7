//! The advertised service and its three data channels.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::PacketKind;
use crate::error::WireError;

pub const SERVICE_UUID: &str = "d8450000-6421-4f80-928d-19548483b890";

/// 16-bit UUID of the client subscription-configuration descriptor.
pub const SUBSCRIPTION_CONFIG_UUID: u16 = 0x2902;

/// Independently addressable data channel of the service.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelId {
    Packet,
    Impact,
    Sensor,
}

impl ChannelId {
    pub const ALL: [ChannelId; 3] = [ChannelId::Packet, ChannelId::Impact, ChannelId::Sensor];

    /// Bit of this channel in a packed subscription set.
    #[inline]
    pub(crate) const fn bit(self) -> u8 {
        match self {
            ChannelId::Packet => 0b001,
            ChannelId::Impact => 0b010,
            ChannelId::Sensor => 0b100,
        }
    }

    pub const fn uuid(self) -> &'static str {
        match self {
            ChannelId::Packet => "d8450001-6421-4f80-928d-19548483b890",
            ChannelId::Impact => "d8450002-6421-4f80-928d-19548483b890",
            ChannelId::Sensor => "d8450003-6421-4f80-928d-19548483b890",
        }
    }

    /// Packet layout carried on this channel.
    pub const fn packet_kind(self) -> PacketKind {
        match self {
            ChannelId::Packet => PacketKind::Shot,
            ChannelId::Impact => PacketKind::Impact,
            ChannelId::Sensor => PacketKind::SensorStream,
        }
    }

    pub fn from_uuid(uuid: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.uuid().eq_ignore_ascii_case(uuid))
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChannelId::Packet => "packet",
            ChannelId::Impact => "impact",
            ChannelId::Sensor => "sensor",
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChannelProperties {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

/// What the radio collaborator needs to register one channel.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct ChannelSpec {
    pub id: ChannelId,
    pub uuid: &'static str,
    pub properties: ChannelProperties,
    pub max_len: usize,
    pub subscription_config_uuid: u16,
}

/// Channel table of the service, in registration order.
pub fn service_layout() -> [ChannelSpec; 3] {
    ChannelId::ALL.map(|id| ChannelSpec {
        id,
        uuid: id.uuid(),
        properties: ChannelProperties {
            read: true,
            write: true,
            notify: true,
        },
        max_len: id.packet_kind().wire_len(),
        subscription_config_uuid: SUBSCRIPTION_CONFIG_UUID,
    })
}

/// Decode a write to a subscription-configuration descriptor.
///
/// The value is a little-endian `u16`; bit 0 enables notifications.
pub fn decode_subscription_config(value: &[u8]) -> Result<bool, WireError> {
    match value {
        [lo, hi] => Ok(u16::from_le_bytes([*lo, *hi]) & 0x0001 != 0),
        _ => Err(WireError::InvalidSubscriptionConfig { got: value.len() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_sizes_match_packets() {
        let layout = service_layout();
        assert_eq!(layout[0].max_len, 6);
        assert_eq!(layout[1].max_len, 32);
        assert_eq!(layout[2].max_len, 28);
        assert!(layout.iter().all(|c| c.properties.notify));
    }

    #[test]
    fn uuids_are_distinct_and_resolvable() {
        for id in ChannelId::ALL {
            assert_eq!(ChannelId::from_uuid(id.uuid()), Some(id));
            assert_eq!(
                ChannelId::from_uuid(&id.uuid().to_ascii_uppercase()),
                Some(id)
            );
        }
        assert_eq!(ChannelId::from_uuid(SERVICE_UUID), None);
    }

    #[test]
    fn subscription_config_values() {
        assert_eq!(decode_subscription_config(&[0x01, 0x00]), Ok(true));
        assert_eq!(decode_subscription_config(&[0x00, 0x00]), Ok(false));
        // Indications only.
        assert_eq!(decode_subscription_config(&[0x02, 0x00]), Ok(false));
        assert_eq!(
            decode_subscription_config(&[0x01]),
            Err(WireError::InvalidSubscriptionConfig { got: 1 })
        );
    }
}
