//! Telemetry side of the putting trainer.
//!
//! - [`codec`]: the three fixed-layout packets and length-based decoding.
//! - [`channel`]: service/channel layout and subscription-descriptor decoding.
//! - [`advertising`]: advertising payload construction.
//! - [`link`]: connection + subscription state shared with the radio context.
//!
//! Nothing here talks to a radio; the radio stack is a collaborator that
//! registers [`service_layout`], forwards [`LinkEvent`]s and transmits bytes.

pub mod advertising;
pub mod channel;
pub mod codec;
mod error;
pub mod link;

pub use advertising::advertising_payload;
pub use channel::{
    decode_subscription_config, service_layout, ChannelId, ChannelProperties, ChannelSpec,
    SERVICE_UUID,
};
pub use codec::{
    shot_force, ImpactPacket, PacketKind, SensorStreamPacket, ShotPacket, TelemetryPacket,
};
pub use error::WireError;
pub use link::{
    link_channel, ConnectionState, LinkEvent, LinkEventReceiver, LinkEventSender, LinkReaction,
    LinkState,
};
