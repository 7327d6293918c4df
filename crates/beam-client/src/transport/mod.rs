//! The socket abstraction the channel managers are written against.
//!
//! A [`Transport`] turns an endpoint URL into a [`Link`]: an exclusively
//! owned [`FrameSink`] for outbound frames plus an ordered stream of
//! [`LinkEvent`]s for everything the socket does on its own (inbound
//! messages, remote close, transport errors). Events are delivered in the
//! order the underlying transport produced them; no coalescing.
//!
//! Two implementations ship in-tree:
//!
//! - [`ws::WsTransport`] — the real thing, built on tokio-tungstenite.
//! - [`mock::MockTransport`] — a scriptable in-memory transport used by the
//!   unit and integration tests (call counting, forced handshake failures,
//!   held handshakes, remote-initiated events).

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod mock;
pub mod ws;

pub use mock::MockTransport;
pub use ws::WsTransport;

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection handshake failed (refused, unreachable, bad upgrade).
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    /// An established link rejected an outbound frame.
    #[error("send failed: {0}")]
    Send(String),
}

/// Something the socket did on its own, delivered to the owning manager.
#[derive(Debug)]
pub enum LinkEvent {
    /// An inbound text frame (device status on the command channel).
    Text(String),
    /// An inbound binary frame (unexpected on both channels; surfaced anyway).
    Binary(Vec<u8>),
    /// The remote side closed the connection. Terminal.
    Closed,
    /// The transport failed mid-session. Terminal.
    Error(String),
}

/// An established connection: the outbound half plus the event stream.
///
/// The sink is the manager's socket handle; the receiver is consumed by the
/// manager's reader task. Dropping both tears the connection down.
pub struct Link {
    pub sink: Box<dyn FrameSink>,
    pub events: mpsc::Receiver<LinkEvent>,
}

/// Connection factory. One `connect` call yields at most one [`Link`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the handshake with `url` and returns the established link.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] when the handshake fails; no link
    /// resource exists in that case.
    async fn connect(&self, url: &str) -> Result<Link, TransportError>;
}

/// Outbound half of an established link.
///
/// `close` is idempotent: closing an already-closed sink is a no-op, never a
/// fault. Dropping the sink without calling `close` releases the underlying
/// socket as well (no half-open resource survives either path).
#[async_trait]
pub trait FrameSink: Send {
    /// Sends one text frame.
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Sends one binary frame.
    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Closes the link. Best-effort and idempotent.
    async fn close(&mut self);
}
