//! Upload channel manager.
//!
//! Owns the lazily-created binary connection to `ws://host:uploadPort/video`.
//! A transfer materializes the whole payload in memory and hands it to the
//! transport as a single binary frame — there is no chunking, flow control,
//! or backpressure signal. That is fine for the small clips the device was
//! built around and a known scalability limit for large media files; it is
//! kept as-is rather than silently redesigned, because the intended payload
//! size is not pinned down anywhere.
//!
//! The device closes the channel when it has consumed the payload; that
//! close is what moves the state to `Completed` and releases the handle, so
//! the next transfer starts from a fresh connection. A failed transfer is
//! never resumed — the caller restarts it from the beginning.
//!
//! Whether an upload should be allowed while the command channel is down is
//! the caller's policy, not this manager's: nothing here looks at the
//! command channel.

use std::path::Path;
use std::sync::Arc;

use beam_core::UploadState;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::transport::{FrameSink, LinkEvent, Transport};

use super::ChannelError;

/// State guarded by the manager's mutex. Same epoch discipline as the
/// command channel: stale reader tasks stop touching the state.
struct Inner {
    state: UploadState,
    status: String,
    sink: Option<Box<dyn FrameSink>>,
    epoch: u64,
}

impl Inner {
    async fn teardown(&mut self, state: UploadState, status: String) {
        self.epoch += 1;
        self.state = state;
        self.status = status;
        if let Some(mut sink) = self.sink.take() {
            sink.close().await;
        }
    }
}

/// Manager for the binary media-upload channel.
pub struct UploadChannel {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    inner: Arc<Mutex<Inner>>,
    /// Serializes whole transfers so two concurrent `send_*` calls cannot
    /// race the lazy connection setup. Accessors never take this lock.
    send_gate: Mutex<()>,
}

impl UploadChannel {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            inner: Arc::new(Mutex::new(Inner {
                state: UploadState::Idle,
                status: String::new(),
                sink: None,
                epoch: 0,
            })),
            send_gate: Mutex::new(()),
        }
    }

    /// Current upload state.
    pub async fn state(&self) -> UploadState {
        self.inner.lock().await.state
    }

    /// Most recent human-readable status line. Last write wins; no history.
    pub async fn status_message(&self) -> String {
        self.inner.lock().await.status.clone()
    }

    /// Whether a transfer is currently in flight.
    pub async fn is_uploading(&self) -> bool {
        self.inner.lock().await.state.is_uploading()
    }

    /// Reads `path` fully into memory and transfers it.
    ///
    /// # Errors
    ///
    /// [`ChannelError::UploadRead`] when the file cannot be read (no
    /// connection is attempted in that case), otherwise as
    /// [`Self::send_payload`].
    pub async fn send_file(&self, path: &Path) -> Result<(), ChannelError> {
        let payload = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(source) => {
                // A handle reused from an earlier transfer must not survive
                // the failure; the next attempt starts from a fresh
                // connection.
                let mut inner = self.inner.lock().await;
                inner
                    .teardown(
                        UploadState::Error,
                        format!("Could not read {}", path.display()),
                    )
                    .await;
                warn!("upload read failed for {}: {source}", path.display());
                return Err(ChannelError::UploadRead {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        debug!("read {} bytes from {}", payload.len(), path.display());
        self.send_payload(payload).await
    }

    /// Transfers one payload as a single binary frame.
    ///
    /// Establishes the upload connection on first use; a live handle from a
    /// still-open channel is reused. On success the state is `Uploading`
    /// until the device closes the channel, which completes the transfer.
    ///
    /// # Errors
    ///
    /// [`ChannelError::Configuration`] for a malformed endpoint (raised
    /// before any socket is touched), [`ChannelError::Transport`] when the
    /// handshake or the send fails — the failed-handshake path never enters
    /// `Uploading` — and [`ChannelError::NotConnected`] when the channel
    /// closed between connecting and sending.
    pub async fn send_payload(&self, payload: Vec<u8>) -> Result<(), ChannelError> {
        let _gate = self.send_gate.lock().await;

        let needs_connect = self.inner.lock().await.sink.is_none();
        if needs_connect {
            self.open_connection().await?;
        }

        let mut inner = self.inner.lock().await;
        let len = payload.len();
        let Some(sink) = inner.sink.as_mut() else {
            // The channel closed between connecting and sending.
            inner.state = UploadState::Error;
            inner.status = "Upload channel closed before the payload was sent".to_string();
            return Err(ChannelError::NotConnected);
        };

        match sink.send_binary(payload).await {
            Ok(()) => {
                inner.state = UploadState::Uploading;
                inner.status = "Payload sent to projector".to_string();
                info!("upload payload sent ({len} bytes)");
                Ok(())
            }
            Err(e) => {
                warn!("upload send failed: {e}");
                inner
                    .teardown(UploadState::Error, format!("Upload failed: {e}"))
                    .await;
                Err(ChannelError::Transport(e))
            }
        }
    }

    /// Lazily establishes the upload connection and spawns its reader.
    async fn open_connection(&self) -> Result<(), ChannelError> {
        let (attempt, url) = {
            let mut inner = self.inner.lock().await;
            let url = match self.config.upload_url() {
                Ok(url) => url,
                Err(e) => {
                    inner.state = UploadState::Error;
                    inner.status = format!("Invalid upload address: {e}");
                    warn!("upload channel misconfigured: {e}");
                    return Err(ChannelError::Configuration(e));
                }
            };
            inner.epoch += 1;
            inner.state = UploadState::Connecting;
            inner.status = format!("Connecting to upload channel at {url}...");
            (inner.epoch, url)
        };

        match self.transport.connect(url.as_str()).await {
            Ok(link) => {
                let mut inner = self.inner.lock().await;
                inner.sink = Some(link.sink);
                inner.status = "Connected, starting upload...".to_string();
                info!("upload channel connected to {url}");
                tokio::spawn(Self::read_events(
                    Arc::clone(&self.inner),
                    link.events,
                    attempt,
                ));
                Ok(())
            }
            Err(e) => {
                let mut inner = self.inner.lock().await;
                inner.state = UploadState::Error;
                inner.status = format!("Upload connection failed: {e}");
                warn!("upload channel connect failed: {e}");
                Err(ChannelError::Transport(e))
            }
        }
    }

    /// Applies socket events for connection generation `attempt`. The close
    /// of the channel is the transfer's completion signal.
    async fn read_events(
        inner: Arc<Mutex<Inner>>,
        mut events: mpsc::Receiver<LinkEvent>,
        attempt: u64,
    ) {
        while let Some(event) = events.recv().await {
            let mut guard = inner.lock().await;
            if guard.epoch != attempt {
                break;
            }
            match event {
                LinkEvent::Text(text) => {
                    // The upload endpoint is not chatty, but surface
                    // whatever it says the same way the command channel does.
                    debug!("upload channel message: {text}");
                    guard.status = format!("Device message: {text}");
                }
                LinkEvent::Binary(bytes) => {
                    debug!("unexpected binary frame ({} bytes)", bytes.len());
                }
                LinkEvent::Closed => {
                    let (state, status) = if guard.state == UploadState::Uploading {
                        (UploadState::Completed, "Upload finished".to_string())
                    } else {
                        (
                            UploadState::Error,
                            "Upload channel closed unexpectedly".to_string(),
                        )
                    };
                    info!("upload channel closed ({})", state);
                    guard.teardown(state, status).await;
                    break;
                }
                LinkEvent::Error(reason) => {
                    warn!("upload channel transport error: {reason}");
                    guard
                        .teardown(UploadState::Error, format!("Upload error: {reason}"))
                        .await;
                    break;
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
