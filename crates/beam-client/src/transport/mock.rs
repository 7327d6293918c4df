//! Scriptable in-memory transport for tests.
//!
//! Lets tests drive both channel managers without any network: every
//! `connect` is counted, handshakes can be forced to fail or held open
//! mid-flight, transmitted frames are recorded, and the "device" side can
//! push status text, close the link, or fail it at will through a
//! [`RemoteHandle`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, Semaphore};

use super::{FrameSink, Link, LinkEvent, Transport, TransportError};

/// One frame recorded by a mock link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentFrame {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Default)]
struct Shared {
    connect_calls: u32,
    fail_connects: u32,
    fail_sends: u32,
    live_links: u32,
    max_live_links: u32,
    gate: Option<Arc<Semaphore>>,
    links: Vec<RemoteHandle>,
}

/// A mock [`Transport`] with call counting and scriptable failures.
///
/// Clones share the same underlying state, so a test can keep one clone for
/// scripting and hand another to the manager under test.
#[derive(Clone, Default)]
pub struct MockTransport {
    shared: Arc<Mutex<Shared>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `connect` call fail its handshake.
    pub fn fail_next_connect(&self) {
        self.shared.lock().expect("lock poisoned").fail_connects += 1;
    }

    /// Makes the next frame send on any live link fail.
    pub fn fail_next_send(&self) {
        self.shared.lock().expect("lock poisoned").fail_sends += 1;
    }

    /// Holds every subsequent handshake until [`release_connect`] grants a
    /// permit. Used to observe the `Connecting` state from tests.
    ///
    /// [`release_connect`]: MockTransport::release_connect
    pub fn hold_connects(&self) {
        self.shared.lock().expect("lock poisoned").gate = Some(Arc::new(Semaphore::new(0)));
    }

    /// Releases one held handshake.
    pub fn release_connect(&self) {
        if let Some(gate) = &self.shared.lock().expect("lock poisoned").gate {
            gate.add_permits(1);
        }
    }

    /// Total number of `connect` calls observed, successful or not.
    pub fn connect_calls(&self) -> u32 {
        self.shared.lock().expect("lock poisoned").connect_calls
    }

    /// Number of links whose sink has not been closed or dropped yet.
    pub fn live_links(&self) -> u32 {
        self.shared.lock().expect("lock poisoned").live_links
    }

    /// High-water mark of simultaneously live links.
    pub fn max_live_links(&self) -> u32 {
        self.shared.lock().expect("lock poisoned").max_live_links
    }

    /// Device-side handle for the most recently established link.
    ///
    /// Panics if no link has been established; tests call this only after a
    /// successful connect.
    pub fn last_link(&self) -> RemoteHandle {
        self.shared
            .lock()
            .expect("lock poisoned")
            .links
            .last()
            .expect("no link established yet")
            .clone()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn connect(&self, url: &str) -> Result<Link, TransportError> {
        // A held handshake parks here, before the call is even counted, so
        // tests can line up concurrent connect attempts deterministically.
        let gate = self.shared.lock().expect("lock poisoned").gate.clone();
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| TransportError::Connect {
                    url: url.to_string(),
                    reason: "handshake gate closed".to_string(),
                })?;
            permit.forget();
        }

        let mut shared = self.shared.lock().expect("lock poisoned");
        shared.connect_calls += 1;

        if shared.fail_connects > 0 {
            shared.fail_connects -= 1;
            return Err(TransportError::Connect {
                url: url.to_string(),
                reason: "connection refused (scripted)".to_string(),
            });
        }

        let (event_tx, events) = mpsc::channel(32);
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));

        shared.live_links += 1;
        shared.max_live_links = shared.max_live_links.max(shared.live_links);

        let handle = RemoteHandle {
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
            event_tx,
        };
        shared.links.push(handle.clone());

        Ok(Link {
            sink: Box::new(MockFrameSink {
                sent,
                closed,
                shared: Arc::clone(&self.shared),
            }),
            events,
        })
    }
}

/// Device-side view of one mock link.
#[derive(Clone)]
pub struct RemoteHandle {
    sent: Arc<Mutex<Vec<SentFrame>>>,
    closed: Arc<AtomicBool>,
    event_tx: mpsc::Sender<LinkEvent>,
}

impl RemoteHandle {
    /// Pushes an inbound text frame, as if the device sent status text.
    pub async fn push_text(&self, text: impl Into<String>) {
        let _ = self.event_tx.send(LinkEvent::Text(text.into())).await;
    }

    /// Closes the link from the device side.
    pub async fn close(&self) {
        let _ = self.event_tx.send(LinkEvent::Closed).await;
    }

    /// Fails the link mid-session, as if the TCP connection was reset.
    pub async fn fail(&self, reason: impl Into<String>) {
        let _ = self.event_tx.send(LinkEvent::Error(reason.into())).await;
    }

    /// Every frame the manager transmitted on this link, in order.
    pub fn sent(&self) -> Vec<SentFrame> {
        self.sent.lock().expect("lock poisoned").clone()
    }

    /// Whether the manager's sink for this link has been closed or dropped.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockFrameSink {
    sent: Arc<Mutex<Vec<SentFrame>>>,
    closed: Arc<AtomicBool>,
    shared: Arc<Mutex<Shared>>,
}

impl MockFrameSink {
    fn record(&self, frame: SentFrame) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Send("link is closed".to_string()));
        }
        let mut shared = self.shared.lock().expect("lock poisoned");
        if shared.fail_sends > 0 {
            shared.fail_sends -= 1;
            return Err(TransportError::Send("send failed (scripted)".to_string()));
        }
        drop(shared);
        self.sent.lock().expect("lock poisoned").push(frame);
        Ok(())
    }

    fn release(&self) {
        // First close (or drop) wins; double release is a no-op.
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shared.lock().expect("lock poisoned").live_links -= 1;
        }
    }
}

#[async_trait::async_trait]
impl FrameSink for MockFrameSink {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.record(SentFrame::Text(text.to_string()))
    }

    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.record(SentFrame::Binary(payload))
    }

    async fn close(&mut self) {
        self.release();
    }
}

impl Drop for MockFrameSink {
    fn drop(&mut self) {
        self.release();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
