//! padsync core library
//!
//! Shared-text synchronization for multiple editor processes on one
//! machine. Each process joins a named channel on an inter-process bus;
//! content changes, undo requests, and redo requests are broadcast as
//! full-snapshot events, with echo suppression keeping synchronized
//! peers out of feedback loops. A formatting-state accessor derives the
//! character and paragraph attributes in effect at the cursor or
//! selection and applies format edits back to the document.
//!
//! ## Overview
//!
//! - **Local-first**: every edit lands locally no matter what the bus
//!   does; only the broadcast side may fail (and it fails logged, not
//!   loud)
//! - **Last-writer-wins**: events carry the whole text, not diffs; there
//!   is no merge algorithm
//! - **Transport-agnostic**: everything speaks to an injectable
//!   [`MessageBus`]; an in-process [`LocalBus`] ships for tests and demos
//!
//! ## Quick Start
//!
//! ```ignore
//! use padsync_core::{ChannelName, DocumentHandler, LocalBus};
//! use padsync_core::testing::FormattedBuffer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = LocalBus::shared();
//!     let handler = DocumentHandler::new(ChannelName::named("team1"), bus);
//!     handler.attach_document(Box::new(FormattedBuffer::new()));
//!     handler.join().await?;
//!
//!     handler.set_text("hello world").await;
//!     handler.set_cursor_position(8);
//!     handler.set_bold(true); // bolds the word under the caret
//!
//!     Ok(())
//! }
//! ```

pub mod bus;
pub mod channel;
pub mod document;
pub mod error;
pub mod file;
pub mod format;
pub mod handler;
pub mod sync;
pub mod testing;

// Re-exports
pub use bus::{ContentSource, EventKind, LocalBus, MessageBus, WireMessage};
pub use channel::{ChannelName, DEFAULT_CHANNEL};
pub use document::{Alignment, BlockFormat, CharFormat, Color, Range, RichTextDocument};
pub use error::{SyncError, SyncResult};
pub use file::FileRef;
pub use format::FormatState;
pub use handler::DocumentHandler;
pub use sync::{DocEvent, SharedDocument, SyncChannel, CONTENT_QUERY_TIMEOUT};
