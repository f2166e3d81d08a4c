//! File load/save tests through the handler façade

use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use padsync_core::testing::FormattedBuffer;
use padsync_core::{ChannelName, DocEvent, DocumentHandler, LocalBus, SyncError};

fn detached_handler() -> DocumentHandler {
    let handler = DocumentHandler::new(ChannelName::Detached, LocalBus::shared());
    handler.attach_document(Box::new(FormattedBuffer::new()));
    handler
}

/// Loading a plain-text file fills the document and clears the dirty flag
#[tokio::test]
async fn test_load_plain_text() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    fs::write(&path, "shared notes").unwrap();

    let handler = detached_handler();
    handler.load(&path).await;

    assert_eq!(handler.text(), "shared notes");
    assert!(!handler.is_modified());
    assert_eq!(handler.file_name(), "notes.txt");
    assert_eq!(handler.file_type(), "txt");
}

/// A UTF-16LE file with BOM decodes transparently
#[tokio::test]
async fn test_load_utf16_with_bom() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wide.txt");
    let mut data = vec![0xFF, 0xFE];
    for unit in "héllo".encode_utf16() {
        data.extend_from_slice(&unit.to_le_bytes());
    }
    fs::write(&path, data).unwrap();

    let handler = detached_handler();
    handler.load(&path).await;
    assert_eq!(handler.text(), "héllo");
}

/// Loading the already-referenced location is a no-op
#[tokio::test]
async fn test_load_same_location_twice() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("once.txt");
    fs::write(&path, "v1").unwrap();

    let handler = detached_handler();
    handler.load(&path).await;
    assert_eq!(handler.text(), "v1");

    // The file changed on disk, but the reference did not.
    fs::write(&path, "v2").unwrap();
    handler.load(&path).await;
    assert_eq!(handler.text(), "v1");
}

/// A loaded file is broadcast to the peer's channel
#[tokio::test]
async fn test_load_propagates_to_peers() {
    let bus = LocalBus::shared();
    let a = DocumentHandler::new(ChannelName::named("team1"), bus.clone());
    a.attach_document(Box::new(FormattedBuffer::new()));
    a.join().await.unwrap();
    let b = DocumentHandler::new(ChannelName::named("team1"), bus.clone());
    b.attach_document(Box::new(FormattedBuffer::new()));
    b.join().await.unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shared.txt");
    fs::write(&path, "from disk").unwrap();
    a.load(&path).await;

    for _ in 0..100 {
        if b.text() == "from disk" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(b.text(), "from disk");
}

/// Saving to a markup extension writes the markup serialization
#[tokio::test]
async fn test_save_as_markup_and_plain() {
    let dir = TempDir::new().unwrap();
    let handler = detached_handler();
    handler.set_text("alpha").await;
    handler.set_selection_start(0);
    handler.set_selection_end(5);
    handler.set_bold(true);

    let html = dir.path().join("out.html");
    handler.save_as(&html).unwrap();
    let markup = fs::read_to_string(&html).unwrap();
    assert!(markup.contains("<p>"));
    assert!(markup.contains("<b>"));

    let txt = dir.path().join("out.txt");
    handler.save_as(&txt).unwrap();
    assert_eq!(fs::read_to_string(&txt).unwrap(), "alpha");

    assert_eq!(handler.file_name(), "out.txt");
    assert_eq!(handler.file_ref().unwrap().path(), txt.as_path());
    assert!(!handler.is_modified());
}

/// A failed save surfaces a user-visible error and keeps the file ref
#[tokio::test]
async fn test_save_failure_surfaces_error() {
    let dir = TempDir::new().unwrap();
    let handler = detached_handler();
    handler.set_text("content").await;
    let mut events = handler.subscribe();

    let missing = dir.path().join("no-such-dir").join("out.txt");
    let result = handler.save_as(&missing);

    assert!(matches!(result, Err(SyncError::Save(_))));
    let seen_error = loop {
        match events.try_recv() {
            Ok(DocEvent::Error { .. }) => break true,
            Ok(_) => continue,
            Err(_) => break false,
        }
    };
    assert!(seen_error, "save failure must emit a user-visible error");
    assert_eq!(handler.file_name(), "untitled.txt");
}

/// Save with no document attached is a quiet no-op
#[tokio::test]
async fn test_save_without_document() {
    let dir = TempDir::new().unwrap();
    let handler = DocumentHandler::new(ChannelName::Detached, LocalBus::shared());
    assert!(handler.save_as(&dir.path().join("never.txt")).is_ok());
    assert!(!dir.path().join("never.txt").exists());
}
