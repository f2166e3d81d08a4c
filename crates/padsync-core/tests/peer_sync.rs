//! Multi-peer synchronization tests
//!
//! Two or more simulated editor processes share one in-process bus and
//! must converge without echo loops, without cross-channel leakage, and
//! without detached peers ever touching the bus.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use padsync_core::testing::FormattedBuffer;
use padsync_core::{
    ChannelName, ContentSource, DocumentHandler, EventKind, LocalBus, MessageBus, SyncResult,
    WireMessage, CONTENT_QUERY_TIMEOUT,
};

// ============================================================================
// Test Utilities
// ============================================================================

/// Opt-in log output for debugging: `RUST_LOG=padsync_core=debug cargo test`
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Build a handler with an attached in-memory document
fn peer(channel: &str, bus: Arc<LocalBus>) -> DocumentHandler {
    init_tracing();
    let handler = DocumentHandler::new(ChannelName::named(channel), bus);
    handler.attach_document(Box::new(FormattedBuffer::new()));
    handler
}

/// Poll until the handler's content equals `expected` or time runs out
async fn converged(handler: &DocumentHandler, expected: &str) -> bool {
    for _ in 0..100 {
        if handler.text() == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

/// Count the content-changed frames sitting in a raw bus tap
fn drain_content_frames(tap: &mut mpsc::UnboundedReceiver<String>) -> usize {
    let mut count = 0;
    while let Ok(frame) = tap.try_recv() {
        if let Ok(msg) = WireMessage::decode(&frame) {
            if msg.kind == EventKind::ContentChanged {
                count += 1;
            }
        }
    }
    count
}

/// Bus double that records calls and can refuse registration or stall
/// content queries
#[derive(Default)]
struct SpyBus {
    registers: AtomicUsize,
    subscribes: AtomicUsize,
    publishes: AtomicUsize,
    queries: AtomicUsize,
    fail_register: bool,
    stall_queries: bool,
}

#[async_trait]
impl MessageBus for SpyBus {
    async fn register(&self, _: &str, _: &str, _: ContentSource) -> SyncResult<bool> {
        self.registers.fetch_add(1, Ordering::SeqCst);
        if self.fail_register {
            return Err(padsync_core::SyncError::Bus("bus unreachable".to_string()));
        }
        Ok(true)
    }

    async fn subscribe(&self, _: &str) -> SyncResult<mpsc::UnboundedReceiver<String>> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        let (_tx, rx) = mpsc::unbounded_channel();
        Ok(rx)
    }

    async fn publish(&self, _: &str, _: String) -> SyncResult<()> {
        self.publishes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query_content(&self, _: &str) -> SyncResult<Option<String>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.stall_queries {
            tokio::time::sleep(CONTENT_QUERY_TIMEOUT * 2).await;
        }
        Ok(None)
    }
}

// ============================================================================
// Echo Suppression
// ============================================================================

/// A publishes once; B applies it exactly once and re-emits nothing
#[tokio::test]
async fn test_echo_freedom_between_two_peers() {
    let bus = LocalBus::shared();
    let a = peer("team1", bus.clone());
    let b = peer("team1", bus.clone());
    a.join().await.unwrap();
    b.join().await.unwrap();

    let mut tap = bus.subscribe("team1").await.unwrap();

    a.set_text("hello").await;
    assert!(converged(&b, "hello").await, "B never converged");

    // Give any echo a chance to appear, then count frames on the wire.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        drain_content_frames(&mut tap),
        1,
        "exactly one content-changed frame may cross the bus"
    );
    assert_eq!(a.text(), "hello");
}

/// Publishing identical content twice emits at most one frame
#[tokio::test]
async fn test_publish_idempotence_on_the_wire() {
    let bus = LocalBus::shared();
    let a = peer("team1", bus.clone());
    a.join().await.unwrap();

    let mut tap = bus.subscribe("team1").await.unwrap();

    a.set_text("same").await;
    a.set_text("same").await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(drain_content_frames(&mut tap), 1);
    assert_eq!(a.text(), "same");
}

// ============================================================================
// Channel Isolation
// ============================================================================

/// Events on channel "x" never reach peers on "y" or detached peers
#[tokio::test]
async fn test_channel_isolation() {
    let bus = LocalBus::shared();
    let on_x = peer("x", bus.clone());
    let on_y = peer("y", bus.clone());
    let detached = peer("detached", bus.clone());
    on_x.join().await.unwrap();
    on_y.join().await.unwrap();
    detached.join().await.unwrap();

    on_x.set_text("only for x").await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(on_x.text(), "only for x");
    assert_eq!(on_y.text(), "");
    assert_eq!(detached.text(), "");
}

/// Detached mode registers nothing, subscribes to nothing, queries nothing
#[tokio::test]
async fn test_detached_join_touches_no_bus() {
    let spy = Arc::new(SpyBus::default());
    let handler = DocumentHandler::new(ChannelName::Detached, spy.clone());
    handler.attach_document(Box::new(FormattedBuffer::new()));

    handler.join().await.unwrap();
    handler.set_text("local").await;
    handler.undo().await;
    handler.redo().await;

    assert_eq!(spy.registers.load(Ordering::SeqCst), 0);
    assert_eq!(spy.subscribes.load(Ordering::SeqCst), 0);
    assert_eq!(spy.queries.load(Ordering::SeqCst), 0);
    assert_eq!(spy.publishes.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Degraded Transports
// ============================================================================

/// An unreachable bus leaves the peer editing locally, not crashing
#[tokio::test]
async fn test_unreachable_bus_degrades_to_local_editing() {
    let spy = Arc::new(SpyBus {
        fail_register: true,
        ..Default::default()
    });
    let handler = DocumentHandler::new(ChannelName::named("team1"), spy.clone());
    handler.attach_document(Box::new(FormattedBuffer::new()));

    handler.join().await.unwrap();
    handler.set_text("still works").await;

    assert_eq!(handler.text(), "still works");
    // Publishes are still attempted; delivery is best-effort.
    assert!(spy.publishes.load(Ordering::SeqCst) >= 1);
}

/// A second peer on the channel cannot claim the name but still syncs
#[tokio::test]
async fn test_registration_conflict_degrades_to_write_only() {
    let bus = LocalBus::shared();
    let first = peer("team1", bus.clone());
    let second = peer("team1", bus.clone());
    first.join().await.unwrap();
    second.join().await.unwrap();

    second.set_text("from second").await;
    assert!(converged(&first, "from second").await);

    first.set_text("from first").await;
    assert!(converged(&second, "from first").await);
}

/// Malformed frames are dropped without disturbing peer state
#[tokio::test]
async fn test_malformed_frame_is_skipped() {
    let bus = LocalBus::shared();
    let a = peer("team1", bus.clone());
    a.join().await.unwrap();
    a.set_text("stable").await;

    bus.publish("team1", "{not valid json".to_string())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(a.text(), "stable");
}

// ============================================================================
// Join-Time Content Pull
// ============================================================================

/// A content query that never answers in time leaves the joiner empty
/// and editable
#[tokio::test]
async fn test_content_query_timeout_starts_empty() {
    let spy = Arc::new(SpyBus {
        stall_queries: true,
        ..Default::default()
    });
    let handler = DocumentHandler::new(ChannelName::named("team1"), spy.clone());
    handler.attach_document(Box::new(FormattedBuffer::new()));

    handler.join().await.unwrap();

    assert_eq!(spy.queries.load(Ordering::SeqCst), 1);
    assert_eq!(handler.text(), "");

    // The stalled pull must not wedge the handler.
    handler.set_text("after timeout").await;
    assert_eq!(handler.text(), "after timeout");
}

/// A late joiner adopts the channel content via content-query, silently
#[tokio::test]
async fn test_late_joiner_pulls_content_without_broadcasting() {
    let bus = LocalBus::shared();
    let a = peer("team1", bus.clone());
    a.join().await.unwrap();
    a.set_text("abc").await;

    let mut tap = bus.subscribe("team1").await.unwrap();

    let b = peer("team1", bus.clone());
    b.join().await.unwrap();

    assert_eq!(b.text(), "abc");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        drain_content_frames(&mut tap),
        0,
        "the join pull is input, not output"
    );
}

// ============================================================================
// End-to-End Scenario
// ============================================================================

/// The full spec scenario: join, pull, converge, and local-stack undo
#[tokio::test]
async fn test_two_peer_session_with_undo() {
    let bus = LocalBus::shared();

    let a = peer("team1", bus.clone());
    a.join().await.unwrap();
    a.set_text("abc").await;

    let b = peer("team1", bus.clone());
    b.join().await.unwrap();
    assert_eq!(b.text(), "abc");

    a.set_text("abcd").await;
    assert!(converged(&b, "abcd").await);

    // B's undo request runs each peer's own undo against its own stack.
    // B's stack: "" -> "abc" -> "abcd", so B lands on "abc".
    b.undo().await;
    assert!(converged(&b, "abc").await);
    assert!(converged(&a, "abc").await);

    b.redo().await;
    assert!(converged(&b, "abcd").await);
    assert!(converged(&a, "abcd").await);
}
