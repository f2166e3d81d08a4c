//! Document handler façade
//!
//! [`DocumentHandler`] is what the UI layer talks to. It owns the channel
//! name and the file reference, shares the document object with the sync
//! layer, and composes [`SyncChannel`] and [`FormatState`] into the
//! editing surface: load, save, set-text, cursor/selection tracking,
//! format reads and applies, undo/redo.
//!
//! All methods take `&self`; interior state is guarded by parking_lot
//! locks so the handler can be shared between the UI and the inbound
//! event pump.

use std::path::Path;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::warn;

use crate::bus::MessageBus;
use crate::channel::ChannelName;
use crate::document::{Alignment, Color, RichTextDocument};
use crate::error::SyncResult;
use crate::file::{self, FileRef};
use crate::format::FormatState;
use crate::sync::{DocEvent, SharedDocument, SyncChannel};

/// Capacity of the local notification channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Façade composing channel resolution, synchronization, and formatting
pub struct DocumentHandler {
    channel: ChannelName,
    doc: SharedDocument,
    sync: SyncChannel,
    format: RwLock<FormatState>,
    file: Mutex<Option<FileRef>>,
    event_tx: broadcast::Sender<DocEvent>,
}

impl DocumentHandler {
    /// Create a handler fixed to `channel`, synchronizing over `bus`
    pub fn new(channel: ChannelName, bus: Arc<dyn MessageBus>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let doc: SharedDocument = Arc::new(Mutex::new(None));
        let sync = SyncChannel::new(channel.clone(), bus, doc.clone(), event_tx.clone());
        Self {
            channel,
            doc,
            sync,
            format: RwLock::new(FormatState::new()),
            file: Mutex::new(None),
            event_tx,
        }
    }

    /// Create a handler resolving the channel from raw launch arguments
    pub fn from_args(args: &[String], bus: Arc<dyn MessageBus>) -> Self {
        Self::new(ChannelName::from_args(args), bus)
    }

    /// The channel this handler is fixed to
    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// The underlying sync channel
    pub fn sync_channel(&self) -> &SyncChannel {
        &self.sync
    }

    /// Subscribe to local notifications
    pub fn subscribe(&self) -> broadcast::Receiver<DocEvent> {
        self.event_tx.subscribe()
    }

    /// Attach the UI's document object
    ///
    /// If content was already pulled from a peer before the document
    /// arrived, the document adopts it immediately.
    pub fn attach_document(&self, document: Box<dyn RichTextDocument>) {
        let mut doc = self.doc.lock();
        *doc = Some(document);
        let content = self.sync.content();
        if !content.is_empty() {
            if let Some(doc) = doc.as_mut() {
                doc.set_plain_text(&content);
            }
        }
    }

    /// Join the configured channel (no-op in detached mode)
    pub async fn join(&self) -> SyncResult<()> {
        self.sync.join().await
    }

    /// The last-known shared content
    pub fn text(&self) -> String {
        self.sync.content()
    }

    /// Replace the shared content with a local edit
    ///
    /// Mirrors the text into the attached document and broadcasts it.
    /// Setting the text to its current value changes nothing and emits
    /// nothing.
    pub async fn set_text(&self, text: &str) {
        if self.sync.publish_content(text).await {
            if let Some(doc) = self.doc.lock().as_mut() {
                if doc.to_plain_text() != text {
                    doc.set_plain_text(text);
                }
            }
        }
    }

    /// Request an undo
    ///
    /// On a live channel this broadcasts an undo request and every peer
    /// (this one included) runs its own undo. In detached mode the undo
    /// applies directly to the local document.
    pub async fn undo(&self) {
        if self.channel.is_detached() {
            self.sync.on_inbound_undo();
        } else {
            self.sync.request_undo().await;
        }
    }

    /// Request a redo; see [`Self::undo`] for the delivery model
    pub async fn redo(&self) {
        if self.channel.is_detached() {
            self.sync.on_inbound_redo();
        } else {
            self.sync.request_redo().await;
        }
    }

    /// Whether the attached document has unsaved edits
    pub fn is_modified(&self) -> bool {
        self.doc
            .lock()
            .as_ref()
            .map(|doc| doc.is_modified())
            .unwrap_or(false)
    }

    // --- cursor and selection -------------------------------------------

    pub fn cursor_position(&self) -> usize {
        self.format.read().cursor_position()
    }

    /// Move the caret; a real move invalidates all derived attributes
    pub fn set_cursor_position(&self, pos: usize) {
        if self.format.write().set_cursor_position(pos) {
            let _ = self.event_tx.send(DocEvent::FormatsInvalidated);
        }
    }

    pub fn selection_start(&self) -> usize {
        self.format.read().selection_start()
    }

    pub fn set_selection_start(&self, pos: usize) {
        self.format.write().set_selection_start(pos);
    }

    pub fn selection_end(&self) -> usize {
        self.format.read().selection_end()
    }

    pub fn set_selection_end(&self, pos: usize) {
        self.format.write().set_selection_end(pos);
    }

    // --- format attribute surface ---------------------------------------

    pub fn font_family(&self) -> String {
        self.format.read().font_family(self.doc.lock().as_deref())
    }

    pub fn set_font_family(&self, family: &str) {
        let applied = self
            .format
            .read()
            .set_font_family(self.doc.lock().as_deref_mut(), family);
        self.after_apply(applied);
    }

    pub fn font_size(&self) -> u32 {
        self.format.read().font_size(self.doc.lock().as_deref())
    }

    pub fn set_font_size(&self, size: u32) {
        let applied = self
            .format
            .read()
            .set_font_size(self.doc.lock().as_deref_mut(), size);
        self.after_apply(applied);
    }

    pub fn bold(&self) -> bool {
        self.format.read().bold(self.doc.lock().as_deref())
    }

    pub fn set_bold(&self, bold: bool) {
        let applied = self
            .format
            .read()
            .set_bold(self.doc.lock().as_deref_mut(), bold);
        self.after_apply(applied);
    }

    pub fn italic(&self) -> bool {
        self.format.read().italic(self.doc.lock().as_deref())
    }

    pub fn set_italic(&self, italic: bool) {
        let applied = self
            .format
            .read()
            .set_italic(self.doc.lock().as_deref_mut(), italic);
        self.after_apply(applied);
    }

    pub fn underline(&self) -> bool {
        self.format.read().underline(self.doc.lock().as_deref())
    }

    pub fn set_underline(&self, underline: bool) {
        let applied = self
            .format
            .read()
            .set_underline(self.doc.lock().as_deref_mut(), underline);
        self.after_apply(applied);
    }

    pub fn text_color(&self) -> Color {
        self.format.read().text_color(self.doc.lock().as_deref())
    }

    pub fn set_text_color(&self, color: Color) {
        let applied = self
            .format
            .read()
            .set_text_color(self.doc.lock().as_deref_mut(), color);
        self.after_apply(applied);
    }

    pub fn alignment(&self) -> Alignment {
        self.format.read().alignment(self.doc.lock().as_deref())
    }

    pub fn set_alignment(&self, alignment: Alignment) {
        let applied = self
            .format
            .read()
            .set_alignment(self.doc.lock().as_deref_mut(), alignment);
        self.after_apply(applied);
    }

    fn after_apply(&self, applied: bool) {
        if applied {
            let _ = self.event_tx.send(DocEvent::FormatsInvalidated);
        }
    }

    // --- file surface ----------------------------------------------------

    /// Display name of the current file, `untitled.txt` when unset
    pub fn file_name(&self) -> String {
        self.file
            .lock()
            .as_ref()
            .map(FileRef::file_name)
            .unwrap_or_else(|| "untitled.txt".to_string())
    }

    /// Extension of the current file, empty when unset
    pub fn file_type(&self) -> String {
        self.file
            .lock()
            .as_ref()
            .map(FileRef::file_type)
            .unwrap_or_default()
    }

    /// The current file reference, if any
    pub fn file_ref(&self) -> Option<FileRef> {
        self.file.lock().clone()
    }

    /// Load a file into the document and broadcast its content
    ///
    /// Loading the location already referenced is a no-op. A file that
    /// cannot be read leaves the content alone but still updates the file
    /// reference, like the rest of the surface it degrades rather than
    /// fails.
    pub async fn load(&self, path: &Path) {
        let target = FileRef::new(path);
        if self.file.lock().as_ref() == Some(&target) {
            return;
        }

        match file::load_text(path) {
            Ok(text) => {
                if let Some(doc) = self.doc.lock().as_mut() {
                    doc.set_plain_text(&text);
                    doc.set_modified(false);
                }
                self.sync.publish_content(&text).await;
                let _ = self.event_tx.send(DocEvent::FormatsInvalidated);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Load failed"),
        }

        let name = target.file_name();
        *self.file.lock() = Some(target);
        let _ = self.event_tx.send(DocEvent::FileChanged { name });
    }

    /// Save the document to `path`, markup or plain text per its extension
    ///
    /// On failure a user-visible [`DocEvent::Error`] is emitted and the
    /// file reference is left unchanged; the write is not retried.
    pub fn save_as(&self, path: &Path) -> SyncResult<()> {
        {
            let mut doc = self.doc.lock();
            let Some(doc) = doc.as_mut() else {
                return Ok(());
            };
            if let Err(e) = file::save_document(path, doc.as_ref()) {
                let message = e.to_string();
                warn!(path = %path.display(), error = %message, "Save failed");
                let _ = self.event_tx.send(DocEvent::Error { message });
                return Err(e);
            }
            doc.set_modified(false);
        }

        let target = FileRef::new(path);
        let mut file = self.file.lock();
        if file.as_ref() != Some(&target) {
            let name = target.file_name();
            *file = Some(target);
            let _ = self.event_tx.send(DocEvent::FileChanged { name });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalBus;
    use crate::testing::FormattedBuffer;

    fn detached_handler() -> DocumentHandler {
        let handler = DocumentHandler::new(ChannelName::Detached, LocalBus::shared());
        handler.attach_document(Box::new(FormattedBuffer::new()));
        handler
    }

    #[tokio::test]
    async fn test_set_text_updates_document() {
        let handler = detached_handler();
        handler.set_text("hello").await;
        assert_eq!(handler.text(), "hello");
        assert!(handler.is_modified());
    }

    #[tokio::test]
    async fn test_detached_undo_applies_locally() {
        let handler = detached_handler();
        handler.set_text("one").await;
        handler.set_text("two").await;

        handler.undo().await;
        assert_eq!(handler.text(), "one");

        handler.redo().await;
        assert_eq!(handler.text(), "two");
    }

    #[tokio::test]
    async fn test_cursor_move_invalidates_formats() {
        let handler = detached_handler();
        let mut events = handler.subscribe();

        handler.set_cursor_position(3);
        assert_eq!(events.try_recv().unwrap(), DocEvent::FormatsInvalidated);

        // Same position again: no notification.
        handler.set_cursor_position(3);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_format_defaults_without_document() {
        let handler = DocumentHandler::new(ChannelName::Detached, LocalBus::shared());
        assert_eq!(handler.font_family(), "");
        assert_eq!(handler.font_size(), 0);
        assert!(!handler.bold());
        assert_eq!(handler.text_color(), Color::BLACK);
        assert_eq!(handler.alignment(), Alignment::Left);
    }

    #[tokio::test]
    async fn test_file_name_defaults_to_untitled() {
        let handler = detached_handler();
        assert_eq!(handler.file_name(), "untitled.txt");
        assert_eq!(handler.file_type(), "");
    }

    #[tokio::test]
    async fn test_attach_adopts_pulled_content() {
        let handler = DocumentHandler::new(ChannelName::Detached, LocalBus::shared());
        handler.set_text("early").await;
        handler.attach_document(Box::new(FormattedBuffer::new()));
        let doc = handler.doc.lock();
        assert_eq!(doc.as_ref().unwrap().to_plain_text(), "early");
    }
}
