//! Duplex connection plumbing: a writer task fed by a channel and a reader half
//! polled by the session loop, sharing one observable ready state.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures::{stream::SplitStream, SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch},
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
    Error,
}

impl ReadyState {
    /// `Error` gates sends exactly like `Closed`.
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }

    pub fn is_transitional(self) -> bool {
        matches!(self, Self::Connecting | Self::Closing)
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection is {0:?}")]
    NotOpen(ReadyState),
    #[error("connection writer has stopped")]
    WriterStopped,
}

pub trait Transport {
    fn ready_state(&self) -> ReadyState;
    fn send_text(&mut self, text: String) -> Result<(), TransportError>;
    fn close(&mut self);
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct WsTransport {
    outbound: mpsc::UnboundedSender<Message>,
    state: Arc<watch::Sender<ReadyState>>,
}

impl Transport for WsTransport {
    fn ready_state(&self) -> ReadyState {
        *self.state.borrow()
    }

    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let state = self.ready_state();
        if state != ReadyState::Open {
            return Err(TransportError::NotOpen(state));
        }
        self.outbound.send(Message::Text(text)).map_err(|_| {
            self.state.send_replace(ReadyState::Error);
            TransportError::WriterStopped
        })
    }

    fn close(&mut self) {
        if self.ready_state().is_closed() {
            return;
        }
        self.state.send_replace(ReadyState::Closing);
        if self.outbound.send(Message::Close(None)).is_err() {
            self.state.send_replace(ReadyState::Closed);
        }
    }
}

pub struct WsInbound {
    reader: SplitStream<WsStream>,
    state: Arc<watch::Sender<ReadyState>>,
}

impl WsInbound {
    /// Next text frame, or `None` once the connection is gone.
    pub async fn next_text(&mut self) -> Option<String> {
        while let Some(frame) = self.reader.next().await {
            match frame {
                Ok(Message::Text(text)) => return Some(text),
                Ok(Message::Close(_)) => {
                    self.state.send_replace(ReadyState::Closed);
                    return None;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(%err, "websocket receive failed");
                    self.state.send_replace(ReadyState::Error);
                    return None;
                }
            }
        }
        self.state.send_replace(ReadyState::Closed);
        None
    }
}

/// Opens the connection and spawns its writer task.
pub async fn connect(ws_url: &Url) -> Result<(WsTransport, WsInbound)> {
    let (ws_stream, _) = connect_async(ws_url.as_str())
        .await
        .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
    let (mut writer, reader) = ws_stream.split();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    let (state, _) = watch::channel(ReadyState::Open);
    let state = Arc::new(state);
    info!(url = %ws_url, "websocket connected");

    let writer_state = Arc::clone(&state);
    tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let closing = matches!(message, Message::Close(_));
            if let Err(err) = writer.send(message).await {
                warn!(%err, "websocket send failed");
                writer_state.send_replace(ReadyState::Error);
                break;
            }
            if closing {
                writer_state.send_replace(ReadyState::Closed);
                break;
            }
        }
        debug!("websocket writer stopped");
    });

    Ok((
        WsTransport {
            outbound,
            state: Arc::clone(&state),
        },
        WsInbound { reader, state },
    ))
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
