//! Abstract message bus and the in-process reference transport
//!
//! The synchronization protocol only needs three capabilities from the
//! transport underneath it: broadcast a named event with a string payload
//! on a channel, subscribe to events on a channel, and an addressed
//! request/reply used once at join time to pull the current content from
//! whichever peer owns the channel's registered name. [`MessageBus`]
//! captures exactly that; real transports (a session bus, a local socket
//! broker) implement it out of tree.
//!
//! [`LocalBus`] is the in-process implementation used by tests and the
//! CLI shell. Like a session bus, it delivers published frames to every
//! subscriber on the channel, including the publisher itself; echo
//! suppression is the subscriber's job.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// Kind of broadcast event carried on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// Full-snapshot content replacement; payload is the new text
    #[serde(rename = "content-changed")]
    ContentChanged,
    /// A peer asked everyone to run their local undo; no payload
    #[serde(rename = "undo-requested")]
    UndoRequested,
    /// A peer asked everyone to run their local redo; no payload
    #[serde(rename = "redo-requested")]
    RedoRequested,
}

impl EventKind {
    /// Wire name of this event kind
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ContentChanged => "content-changed",
            EventKind::UndoRequested => "undo-requested",
            EventKind::RedoRequested => "redo-requested",
        }
    }
}

/// One broadcast frame as carried on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Which event this frame carries
    pub kind: EventKind,
    /// Event payload; empty for undo/redo requests
    #[serde(default)]
    pub payload: String,
}

impl WireMessage {
    /// A content-changed frame carrying the full new text
    pub fn content_changed(text: impl Into<String>) -> Self {
        Self {
            kind: EventKind::ContentChanged,
            payload: text.into(),
        }
    }

    /// An undo-requested frame
    pub fn undo_requested() -> Self {
        Self {
            kind: EventKind::UndoRequested,
            payload: String::new(),
        }
    }

    /// A redo-requested frame
    pub fn redo_requested() -> Self {
        Self {
            kind: EventKind::RedoRequested,
            payload: String::new(),
        }
    }

    /// Encode for transmission
    pub fn encode(&self) -> SyncResult<String> {
        serde_json::to_string(self).map_err(|e| SyncError::Serialization(e.to_string()))
    }

    /// Decode a received frame
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Serialization` for malformed frames; receivers
    /// log and skip these rather than failing.
    pub fn decode(frame: &str) -> SyncResult<Self> {
        serde_json::from_str(frame).map_err(|e| SyncError::Serialization(e.to_string()))
    }
}

/// Callback a registered peer installs for answering content queries
///
/// Returns the peer's current full text. Must be cheap and non-blocking;
/// it is invoked from the bus while a joining peer waits for its reply.
pub type ContentSource = Arc<dyn Fn() -> String + Send + Sync>;

/// The transport capabilities the synchronization layer relies on
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Claim the addressable peer name on a channel
    ///
    /// The registered peer serves content queries through `source`.
    /// Returns `Ok(false)` if the name is already taken; the caller still
    /// participates in broadcast either way.
    async fn register(
        &self,
        channel: &str,
        peer: &str,
        source: ContentSource,
    ) -> SyncResult<bool>;

    /// Subscribe to broadcast frames on a channel
    ///
    /// Frames published on other channels are never delivered to this
    /// receiver.
    async fn subscribe(&self, channel: &str) -> SyncResult<mpsc::UnboundedReceiver<String>>;

    /// Broadcast an encoded frame to every subscriber on a channel
    ///
    /// Delivery includes the publisher's own subscription, mirroring
    /// session-bus signal matching. Fire-and-forget: no acknowledgement.
    async fn publish(&self, channel: &str, frame: String) -> SyncResult<()>;

    /// Ask the channel's registered peer for its current content
    ///
    /// Returns `Ok(None)` when no peer is registered on the channel.
    async fn query_content(&self, channel: &str) -> SyncResult<Option<String>>;
}

struct RegisteredPeer {
    name: String,
    source: ContentSource,
}

#[derive(Default)]
struct ChannelState {
    subscribers: Vec<mpsc::UnboundedSender<String>>,
    owner: Option<RegisteredPeer>,
}

/// In-process message bus for tests and single-process demos
///
/// Keeps per-channel subscriber lists and at most one registered owner
/// per channel. Cheap to clone via `Arc`; all methods complete without
/// blocking.
#[derive(Default)]
pub struct LocalBus {
    channels: Mutex<HashMap<String, ChannelState>>,
}

impl LocalBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty bus behind an `Arc`, ready to share between peers
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl MessageBus for LocalBus {
    async fn register(
        &self,
        channel: &str,
        peer: &str,
        source: ContentSource,
    ) -> SyncResult<bool> {
        let mut channels = self.channels.lock();
        let state = channels.entry(channel.to_string()).or_default();

        if let Some(owner) = &state.owner {
            debug!(channel, peer, taken_by = %owner.name, "Peer name already claimed");
            return Ok(false);
        }

        state.owner = Some(RegisteredPeer {
            name: peer.to_string(),
            source,
        });
        debug!(channel, peer, "Peer registered");
        Ok(true)
    }

    async fn subscribe(&self, channel: &str) -> SyncResult<mpsc::UnboundedReceiver<String>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut channels = self.channels.lock();
        let state = channels.entry(channel.to_string()).or_default();
        state.subscribers.push(tx);
        debug!(channel, subscribers = state.subscribers.len(), "Subscribed");
        Ok(rx)
    }

    async fn publish(&self, channel: &str, frame: String) -> SyncResult<()> {
        let mut channels = self.channels.lock();
        let Some(state) = channels.get_mut(channel) else {
            // Nobody listening yet; a broadcast with no receivers is fine.
            return Ok(());
        };

        state.subscribers.retain(|tx| tx.send(frame.clone()).is_ok());
        debug!(
            channel,
            delivered = state.subscribers.len(),
            bytes = frame.len(),
            "Frame published"
        );
        Ok(())
    }

    async fn query_content(&self, channel: &str) -> SyncResult<Option<String>> {
        let source = {
            let channels = self.channels.lock();
            channels
                .get(channel)
                .and_then(|state| state.owner.as_ref())
                .map(|owner| owner.source.clone())
        };
        Ok(source.map(|source| source()))
    }
}
