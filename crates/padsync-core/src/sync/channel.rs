//! Publish/subscribe bridge between the local document and the bus
//!
//! The two invariants everything here serves:
//!
//! - a change that arrived from the bus is never re-published, and
//! - a change that reproduces the current content is neither published
//!   nor applied.
//!
//! Together they break the echo cycle between synchronized processes.
//! Convergence is full-snapshot last-delivery-wins: every content event
//! carries the entire text, so a reordered delivery of an older snapshot
//! can regress a peer. That weak guarantee is deliberate; there are no
//! sequence numbers in this protocol.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use super::events::DocEvent;
use crate::bus::{ContentSource, MessageBus, WireMessage};
use crate::channel::ChannelName;
use crate::document::RichTextDocument;
use crate::error::SyncResult;

/// How long the join-time content pull waits for a reply
pub const CONTENT_QUERY_TIMEOUT: Duration = Duration::from_millis(500);

/// The single document object, shared between the handler and the
/// inbound event pump
///
/// `None` until the UI attaches a document. Mutation is serialized by the
/// mutex; the protocol itself never needs more than one writer at a time.
pub type SharedDocument = Arc<Mutex<Option<Box<dyn RichTextDocument>>>>;

/// Pub/sub relationship to the bus for one channel
///
/// Owns the last-known content (the value compared against for no-op
/// suppression), applies inbound events to the shared document, and
/// notifies local observers through the broadcast channel. Cloning is
/// cheap; all clones share the same state.
#[derive(Clone)]
pub struct SyncChannel {
    channel: ChannelName,
    bus: Arc<dyn MessageBus>,
    content: Arc<RwLock<String>>,
    doc: SharedDocument,
    event_tx: broadcast::Sender<DocEvent>,
}

impl SyncChannel {
    pub fn new(
        channel: ChannelName,
        bus: Arc<dyn MessageBus>,
        doc: SharedDocument,
        event_tx: broadcast::Sender<DocEvent>,
    ) -> Self {
        Self {
            channel,
            bus,
            content: Arc::new(RwLock::new(String::new())),
            doc,
            event_tx,
        }
    }

    /// The channel this instance is fixed to
    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// The last-known shared content
    pub fn content(&self) -> String {
        self.content.read().clone()
    }

    /// Join the channel: register, subscribe, and pull initial content
    ///
    /// In detached mode this is a no-op. Registration failure (name
    /// already taken) degrades to write-only participation; an
    /// unreachable bus degrades to local-only editing. Both are logged,
    /// neither is fatal.
    pub async fn join(&self) -> SyncResult<()> {
        if self.channel.is_detached() {
            debug!("Detached mode; not joining any channel");
            return Ok(());
        }

        let name = self.channel.as_str().to_string();
        let peer = self.channel.peer_name();

        let source: ContentSource = {
            let content = self.content.clone();
            Arc::new(move || content.read().clone())
        };
        match self.bus.register(&name, &peer, source).await {
            Ok(true) => debug!(channel = %name, %peer, "Registered on channel"),
            Ok(false) => {
                warn!(channel = %name, %peer, "Peer name taken; continuing write-only")
            }
            Err(e) => {
                warn!(channel = %name, error = %e, "Bus unreachable; editing locally only");
                return Ok(());
            }
        }

        match self.bus.subscribe(&name).await {
            Ok(rx) => self.spawn_pump(rx),
            Err(e) => {
                warn!(channel = %name, error = %e, "Subscribe failed; editing locally only");
                return Ok(());
            }
        }

        // Initial pull: adopt whatever the registered peer holds, as
        // input only. A missing, late, or malformed reply means we start
        // empty.
        match tokio::time::timeout(CONTENT_QUERY_TIMEOUT, self.bus.query_content(&name)).await {
            Ok(Ok(Some(text))) => {
                debug!(channel = %name, bytes = text.len(), "Adopted content from peer");
                self.apply_inbound(&text);
            }
            Ok(Ok(None)) => debug!(channel = %name, "No registered peer to pull from"),
            Ok(Err(e)) => {
                warn!(channel = %name, error = %e, "Content query failed; starting empty")
            }
            Err(_) => warn!(channel = %name, "Content query timed out; starting empty"),
        }

        Ok(())
    }

    /// Publish a local content change
    ///
    /// No-op if `text` equals the last-known content. Otherwise updates
    /// local state, notifies observers, and (off detached mode)
    /// broadcasts a content-changed event. Returns whether anything
    /// changed.
    pub async fn publish_content(&self, text: &str) -> bool {
        {
            let mut content = self.content.write();
            if *content == text {
                return false;
            }
            *content = text.to_string();
        }

        let _ = self.event_tx.send(DocEvent::ContentChanged {
            text: text.to_string(),
        });

        if !self.channel.is_detached() {
            self.broadcast(WireMessage::content_changed(text)).await;
        }
        true
    }

    /// Handle an inbound content-changed event
    ///
    /// Idempotent on equal content, and never re-emits to the bus; this
    /// is the structural echo breaker.
    pub fn on_inbound_content(&self, text: &str) {
        {
            let mut content = self.content.write();
            if *content == text {
                return;
            }
            *content = text.to_string();
        }
        debug!(channel = %self.channel, bytes = text.len(), "Inbound content applied");

        if let Some(doc) = self.doc.lock().as_mut() {
            doc.set_plain_text(text);
        }
        let _ = self.event_tx.send(DocEvent::ContentChanged {
            text: text.to_string(),
        });
    }

    /// Broadcast an undo request to the channel
    ///
    /// The request itself carries no payload; every peer (this one
    /// included, via self-delivery) runs its own undo against its own
    /// document.
    pub async fn request_undo(&self) {
        if self.channel.is_detached() {
            return;
        }
        self.broadcast(WireMessage::undo_requested()).await;
    }

    /// Broadcast a redo request to the channel
    pub async fn request_redo(&self) {
        if self.channel.is_detached() {
            return;
        }
        self.broadcast(WireMessage::redo_requested()).await;
    }

    /// Handle an inbound undo request: run the local undo and surface the
    /// result locally, without re-broadcasting anything
    pub fn on_inbound_undo(&self) {
        self.apply_history(|doc| doc.undo());
    }

    /// Handle an inbound redo request
    pub fn on_inbound_redo(&self) {
        self.apply_history(|doc| doc.redo());
    }

    /// Route a decoded inbound event to its handler
    pub fn dispatch(&self, message: WireMessage) {
        use crate::bus::EventKind;
        match message.kind {
            EventKind::ContentChanged => self.on_inbound_content(&message.payload),
            EventKind::UndoRequested => self.on_inbound_undo(),
            EventKind::RedoRequested => self.on_inbound_redo(),
        }
    }

    /// Adopt content pulled at join time (input, not output)
    fn apply_inbound(&self, text: &str) {
        self.on_inbound_content(text);
    }

    fn apply_history(&self, op: impl FnOnce(&mut dyn RichTextDocument)) {
        let text = {
            let mut doc = self.doc.lock();
            let Some(doc) = doc.as_mut() else {
                return;
            };
            op(doc.as_mut());
            doc.to_plain_text()
        };

        *self.content.write() = text.clone();
        let _ = self.event_tx.send(DocEvent::ContentChanged { text });
    }

    async fn broadcast(&self, message: WireMessage) {
        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Failed to encode outbound event");
                return;
            }
        };
        // Fire-and-forget: a publish failure never aborts the local edit.
        if let Err(e) = self.bus.publish(self.channel.as_str(), frame).await {
            warn!(channel = %self.channel, error = %e, "Publish failed");
        }
    }

    fn spawn_pump(&self, mut rx: mpsc::UnboundedReceiver<String>) {
        let this = self.clone();
        tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                match WireMessage::decode(&frame) {
                    Ok(message) => this.dispatch(message),
                    Err(e) => warn!(error = %e, "Dropping malformed frame"),
                }
            }
            debug!(channel = %this.channel, "Subscription closed");
        });
    }
}
