//! Command channel manager.
//!
//! Owns the persistent text connection to `ws://host:controlPort`. User
//! intents become wire commands via [`ProjectorCommand::wire`]; anything the
//! device sends back becomes the new status line. Sends are fire-and-forget:
//! there is no correlation between a sent command and a later inbound
//! message, and the manager makes no promise about their relative order.

use std::sync::Arc;

use beam_core::{ConnectionState, ProjectorCommand};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::transport::{FrameSink, LinkEvent, Transport};

use super::ChannelError;

/// State guarded by the manager's mutex.
///
/// `epoch` identifies the connection generation: it is bumped whenever a
/// handle is installed or torn down, and a reader task whose generation no
/// longer matches stops touching the state. That is what makes a local
/// `disconnect` racing a remote close (or a stale handshake completing after
/// a disconnect) converge on a single release of the handle.
struct Inner {
    state: ConnectionState,
    status: String,
    sink: Option<Box<dyn FrameSink>>,
    epoch: u64,
}

impl Inner {
    /// Tears down the live handle (if any) and records the new state.
    /// Safe to call when no handle is held.
    async fn teardown(&mut self, state: ConnectionState, status: String) {
        self.epoch += 1;
        self.state = state;
        self.status = status;
        if let Some(mut sink) = self.sink.take() {
            sink.close().await;
        }
    }
}

/// Manager for the text command/status channel.
///
/// All operations are safe to call concurrently; the internal mutex applies
/// them as discrete, non-overlapping reactions. The manager never retries or
/// reconnects on its own.
pub struct CommandChannel {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    inner: Arc<Mutex<Inner>>,
}

impl CommandChannel {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            inner: Arc::new(Mutex::new(Inner {
                state: ConnectionState::Idle,
                status: "System ready - connect to begin".to_string(),
                sink: None,
                epoch: 0,
            })),
        }
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.inner.lock().await.state
    }

    /// Most recent human-readable status line. Last write wins; no history.
    pub async fn status_message(&self) -> String {
        self.inner.lock().await.status.clone()
    }

    /// Establishes the command connection.
    ///
    /// Idempotent against concurrent calls: while a handshake is in flight
    /// (or a connection is already open) further calls return without
    /// touching the transport, so no duplicate handle can come into being.
    /// Failures land in the state (`Error`) and status text; a malformed
    /// host/port fails before any socket is touched.
    pub async fn connect(&self) {
        let (attempt, url) = {
            let mut inner = self.inner.lock().await;
            if !inner.state.can_connect() {
                debug!("connect ignored: channel is {}", inner.state);
                return;
            }
            let url = match self.config.control_url() {
                Ok(url) => url,
                Err(e) => {
                    inner.state = ConnectionState::Error;
                    inner.status = format!("Invalid projector address: {e}");
                    warn!("command channel misconfigured: {e}");
                    return;
                }
            };
            inner.epoch += 1;
            inner.state = ConnectionState::Connecting;
            inner.status = format!("Connecting to projector at {url}...");
            (inner.epoch, url)
        };

        match self.transport.connect(url.as_str()).await {
            Ok(link) => {
                let mut inner = self.inner.lock().await;
                if inner.epoch != attempt {
                    // A disconnect (or newer attempt) superseded this
                    // handshake while it was in flight; do not install the
                    // handle, release it instead.
                    debug!("stale handshake discarded for {url}");
                    let mut sink = link.sink;
                    sink.close().await;
                    return;
                }
                inner.sink = Some(link.sink);
                inner.state = ConnectionState::Connected;
                inner.status = "Connected to projector".to_string();
                info!("command channel connected to {url}");
                tokio::spawn(Self::read_events(
                    Arc::clone(&self.inner),
                    link.events,
                    attempt,
                ));
            }
            Err(e) => {
                let mut inner = self.inner.lock().await;
                if inner.epoch != attempt {
                    return;
                }
                inner.state = ConnectionState::Error;
                inner.status = format!("Connection error: {e}");
                warn!("command channel connect failed: {e}");
            }
        }
    }

    /// Closes the active connection, if any.
    ///
    /// Sets the state to `Disconnected`. A no-op when nothing is held and no
    /// handshake is in flight; a handshake that is in flight is superseded
    /// and its handle released on arrival.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.lock().await;
        if inner.sink.is_none() && inner.state != ConnectionState::Connecting {
            debug!("disconnect ignored: no handle held");
            return;
        }
        inner
            .teardown(
                ConnectionState::Disconnected,
                "Disconnected from projector".to_string(),
            )
            .await;
        info!("command channel disconnected");
    }

    /// Transmits one command verbatim over the channel.
    ///
    /// Fire-and-forget: the call does not wait for, or correlate, any device
    /// reply. Fails with [`ChannelError::NotConnected`] — without touching
    /// the transport — unless the channel is `Connected`.
    ///
    /// # Errors
    ///
    /// [`ChannelError::NotConnected`] when no open handle exists;
    /// [`ChannelError::Transport`] when the link rejects the frame (the
    /// handle is then discarded and the state flips to `Error`).
    pub async fn send_command(&self, command: &ProjectorCommand) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().await;
        if !inner.state.is_connected() {
            inner.status = "No connection to projector. Connect first.".to_string();
            return Err(ChannelError::NotConnected);
        }
        let Some(sink) = inner.sink.as_mut() else {
            inner.status = "No connection to projector. Connect first.".to_string();
            return Err(ChannelError::NotConnected);
        };

        let wire = command.wire();
        match sink.send_text(&wire).await {
            Ok(()) => {
                debug!("sent command: {wire}");
                inner.status = format!("Command sent: {wire}");
                Ok(())
            }
            Err(e) => {
                warn!("send failed: {e}");
                inner
                    .teardown(ConnectionState::Error, format!("Send error: {e}"))
                    .await;
                Err(ChannelError::Transport(e))
            }
        }
    }

    /// Applies socket events for connection generation `attempt` until a
    /// terminal event arrives or the generation is superseded.
    async fn read_events(
        inner: Arc<Mutex<Inner>>,
        mut events: mpsc::Receiver<LinkEvent>,
        attempt: u64,
    ) {
        while let Some(event) = events.recv().await {
            let mut guard = inner.lock().await;
            if guard.epoch != attempt {
                // A newer connection or an explicit disconnect owns the
                // state now; this reader is done.
                break;
            }
            match event {
                LinkEvent::Text(text) => {
                    debug!("device message: {text}");
                    guard.status = format!("Device message: {text}");
                }
                LinkEvent::Binary(bytes) => {
                    debug!("unexpected binary frame ({} bytes)", bytes.len());
                    guard.status = format!("Device sent {} bytes", bytes.len());
                }
                LinkEvent::Closed => {
                    info!("command channel closed by projector");
                    guard
                        .teardown(
                            ConnectionState::Disconnected,
                            "Disconnected from projector".to_string(),
                        )
                        .await;
                    break;
                }
                LinkEvent::Error(reason) => {
                    warn!("command channel transport error: {reason}");
                    // Force the close even though the remote may not have
                    // signaled closure; no half-open handle may survive.
                    guard
                        .teardown(ConnectionState::Error, format!("Connection error: {reason}"))
                        .await;
                    break;
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
