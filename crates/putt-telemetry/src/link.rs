//! Connection and per-channel subscription state.
//!
//! Link events arrive on the radio stack's own context, at any point relative
//! to the control loop. The whole state (connected flag plus subscription
//! set) is packed into one byte so every transition is a single atomic
//! read-modify-write and every read is a single load: the loop can never
//! see a connected flag paired with a stale subscription set.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::channel::ChannelId;

const CONNECTED_BIT: u8 = 0b1000;
const SUBSCRIPTION_MASK: u8 = 0b0111;

/// Asynchronous input from the radio collaborator.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LinkEvent {
    CentralConnect,
    CentralDisconnect,
    SubscriptionWrite { channel: ChannelId, enabled: bool },
}

/// Follow-up the radio collaborator should perform after a transition.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkReaction {
    #[default]
    None,
    ResumeAdvertising,
}

/// Immutable snapshot of the link.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct LinkState(u8);

impl LinkState {
    pub const DISCONNECTED: LinkState = LinkState(0);
    pub const CONNECTED: LinkState = LinkState(CONNECTED_BIT);

    #[inline]
    pub fn is_connected(self) -> bool {
        self.0 & CONNECTED_BIT != 0
    }

    #[inline]
    pub fn is_subscribed(self, channel: ChannelId) -> bool {
        self.0 & channel.bit() != 0
    }

    /// Notifications go out only on a live link to a subscribed channel.
    #[inline]
    pub fn can_notify(self, channel: ChannelId) -> bool {
        self.is_connected() && self.is_subscribed(channel)
    }

    pub fn subscribed(self) -> impl Iterator<Item = ChannelId> {
        ChannelId::ALL
            .into_iter()
            .filter(move |c| self.is_subscribed(*c))
    }

    /// Pure transition function.
    pub fn apply(self, event: LinkEvent) -> LinkState {
        match event {
            LinkEvent::CentralConnect => LinkState::CONNECTED,
            LinkEvent::CentralDisconnect => LinkState::DISCONNECTED,
            LinkEvent::SubscriptionWrite { .. } if !self.is_connected() => self,
            LinkEvent::SubscriptionWrite { channel, enabled } => {
                let subs = if enabled {
                    self.0 | channel.bit()
                } else {
                    self.0 & !channel.bit()
                };
                LinkState(CONNECTED_BIT | (subs & SUBSCRIPTION_MASK))
            }
        }
    }
}

impl fmt::Debug for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkState")
            .field("connected", &self.is_connected())
            .field("subscribed", &self.subscribed().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_connected() {
            return f.write_str("disconnected");
        }
        f.write_str("connected [")?;
        for (k, c) in self.subscribed().enumerate() {
            if k > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str("]")
    }
}

impl Serialize for LinkState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut st = serializer.serialize_struct("LinkState", 2)?;
        st.serialize_field("connected", &self.is_connected())?;
        st.serialize_field("subscribed", &self.subscribed().collect::<Vec<_>>())?;
        st.end()
    }
}

/// Shared link state. Handlers call [`ConnectionState::handle_event`] from
/// the radio context; the loop calls [`ConnectionState::snapshot`].
#[derive(Debug, Default)]
pub struct ConnectionState {
    bits: AtomicU8,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn snapshot(&self) -> LinkState {
        LinkState(self.bits.load(Ordering::Acquire))
    }

    /// Apply one event atomically. Cheap and non-blocking.
    pub fn handle_event(&self, event: LinkEvent) -> LinkReaction {
        let prev = self.update(|s| s.apply(event));
        let next = prev.apply(event);
        if prev.is_connected() != next.is_connected() {
            info!("link {prev} -> {next}");
        } else {
            debug!("link event {event:?}: {next}");
        }
        match event {
            LinkEvent::CentralDisconnect => LinkReaction::ResumeAdvertising,
            _ => LinkReaction::None,
        }
    }

    /// Fall back to disconnected after a failed transmission.
    ///
    /// Asks for advertising only if the link was up, so repeated failures do
    /// not spam the radio.
    pub fn mark_link_lost(&self) -> LinkReaction {
        let prev = self.update(|_| LinkState::DISCONNECTED);
        if prev.is_connected() {
            info!("link {prev} -> disconnected (transmit failure)");
            LinkReaction::ResumeAdvertising
        } else {
            LinkReaction::None
        }
    }

    /// Apply every queued event. Returns `ResumeAdvertising` if any event asked for it.
    pub fn drain(&self, rx: &LinkEventReceiver) -> LinkReaction {
        let mut reaction = LinkReaction::None;
        for event in rx.rx.try_iter() {
            if self.handle_event(event) == LinkReaction::ResumeAdvertising {
                reaction = LinkReaction::ResumeAdvertising;
            }
        }
        reaction
    }

    fn update(&self, f: impl Fn(LinkState) -> LinkState) -> LinkState {
        // The closure never returns `None`, so both arms carry the previous value.
        let prev = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |b| Some(f(LinkState(b)).0))
            .unwrap_or_else(|b| b);
        LinkState(prev)
    }
}

/// Sending half of a link-event queue, handed to the radio context.
#[derive(Clone, Debug)]
pub struct LinkEventSender {
    tx: Sender<LinkEvent>,
}

impl LinkEventSender {
    /// Queue an event. Returns `false` if the receiving side is gone.
    pub fn send(&self, event: LinkEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Receiving half, drained once per loop iteration.
#[derive(Debug)]
pub struct LinkEventReceiver {
    rx: Receiver<LinkEvent>,
}

/// Create a link-event queue for collaborators that cannot call into
/// [`ConnectionState`] directly.
pub fn link_channel() -> (LinkEventSender, LinkEventReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (LinkEventSender { tx }, LinkEventReceiver { rx })
}
