use crate::codec::PacketKind;

/// Wire-format mismatches. These mean the two ends disagree on the layout,
/// which is different from "nothing to report".
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("{packet} packet must be {expected} bytes, got {got}")]
    InvalidLength {
        packet: PacketKind,
        expected: usize,
        got: usize,
    },
    #[error("no telemetry packet is {got} bytes long")]
    UnknownLength { got: usize },
    #[error("subscription configuration must be 2 bytes, got {got}")]
    InvalidSubscriptionConfig { got: usize },
}
