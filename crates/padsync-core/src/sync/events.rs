//! Local notification events for UI observers
//!
//! The synchronization layer never calls back into the UI directly; it
//! broadcasts [`DocEvent`] values on a `tokio::sync::broadcast` channel
//! and any number of observers (text view, toolbar, status line) react.

/// Notification about document or handler state, delivered locally
#[derive(Debug, Clone, PartialEq)]
pub enum DocEvent {
    /// The shared content changed (local edit, inbound event, or undo/redo)
    ContentChanged {
        /// The full new text
        text: String,
    },
    /// Derived format attributes are stale and must be re-read
    ///
    /// Emitted after a cursor move or a successful format apply; one edit
    /// can indirectly affect every derived attribute.
    FormatsInvalidated,
    /// The file reference changed after a load or save-as
    FileChanged {
        /// New display name
        name: String,
    },
    /// A user-visible error, e.g. a failed save
    Error {
        /// Human-readable message including the underlying cause
        message: String,
    },
}
