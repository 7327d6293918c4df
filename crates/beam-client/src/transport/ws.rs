//! WebSocket transport built on tokio-tungstenite.
//!
//! `connect_async` performs the TCP connect plus the HTTP upgrade handshake.
//! The resulting stream is split: the write half becomes the manager's
//! [`FrameSink`]; the read half is drained by a spawned pump task that
//! translates tungstenite messages into [`LinkEvent`]s in arrival order.
//!
//! Protocol-level ping/pong frames are handled by tungstenite itself and are
//! not surfaced as events.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::{FrameSink, Link, LinkEvent, Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The production [`Transport`]: plain `ws://` connections over TCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> Result<Link, TransportError> {
        let (stream, _response) =
            connect_async(url)
                .await
                .map_err(|e| TransportError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        debug!("websocket handshake completed with {url}");

        let (write_half, read_half) = stream.split();
        let (event_tx, events) = mpsc::channel(32);
        tokio::spawn(pump_events(read_half, event_tx));

        Ok(Link {
            sink: Box::new(WsFrameSink {
                sink: write_half,
                closed: false,
            }),
            events,
        })
    }
}

/// Drains the read half and forwards each frame as a [`LinkEvent`].
///
/// Exactly one terminal event (`Closed` or `Error`) is emitted, after which
/// the task ends. If the receiver side is gone the events are simply dropped.
async fn pump_events(mut read_half: SplitStream<WsStream>, tx: mpsc::Sender<LinkEvent>) {
    let terminal = loop {
        match read_half.next().await {
            Some(Ok(Message::Text(text))) => {
                if tx.send(LinkEvent::Text(text)).await.is_err() {
                    return;
                }
            }
            Some(Ok(Message::Binary(bytes))) => {
                if tx.send(LinkEvent::Binary(bytes)).await.is_err() {
                    return;
                }
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                trace!("websocket control frame (handled by tungstenite)");
            }
            Some(Ok(Message::Close(_))) => break LinkEvent::Closed,
            // `ConnectionClosed` after a clean close handshake is a normal end
            // of stream, not a failure.
            Some(Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)) => {
                break LinkEvent::Closed;
            }
            Some(Err(e)) => break LinkEvent::Error(e.to_string()),
            // EOF without a Close frame: the remote went away.
            None => break LinkEvent::Closed,
        }
    };
    let _ = tx.send(terminal).await;
}

/// Write half of a WebSocket link.
struct WsFrameSink {
    sink: SplitSink<WsStream, Message>,
    closed: bool,
}

#[async_trait::async_trait]
impl FrameSink for WsFrameSink {
    async fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn send_binary(&mut self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.sink
            .send(Message::Binary(payload))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // Sends a Close frame and flushes; errors here mean the socket is
        // already gone, which is the outcome we wanted anyway.
        if let Err(e) = self.sink.close().await {
            debug!("websocket close: {e}");
        }
    }
}
