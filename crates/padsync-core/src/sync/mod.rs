//! Session-scoped publish/subscribe synchronization
//!
//! One [`SyncChannel`] per process bridges the local document and the
//! bus for a single channel: it publishes outbound content/undo/redo
//! events, routes inbound events to the local document, and suppresses
//! echo so two synchronized processes never feed each other loops.

mod channel;
mod events;

pub use channel::{SharedDocument, SyncChannel, CONTENT_QUERY_TIMEOUT};
pub use events::DocEvent;
