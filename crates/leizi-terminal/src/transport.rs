//! Transport channel abstraction over the backend's session sockets

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use leizi_types::{BackendEndpoint, SessionKind};

/// Message received from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Message sent to the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Binary(Vec<u8>),
}

impl Outbound {
    /// Wrap raw terminal input; UTF-8 input goes out as text.
    ///
    /// Anything else is sent unchanged as a binary frame. The stock backend
    /// only reads text after the handshake and ends the session on a binary
    /// frame, so callers talking to it should send UTF-8.
    pub fn input(data: Vec<u8>) -> Self {
        match String::from_utf8(data) {
            Ok(text) => Outbound::Text(text),
            Err(err) => Outbound::Binary(err.into_bytes()),
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {message}")]
    Connect { url: String, message: String },
    #[error("failed to send: {0}")]
    Send(String),
    #[error("failed to receive: {0}")]
    Receive(String),
    #[error("channel closed")]
    Closed,
}

/// Opens one channel per session
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn open(&self, kind: SessionKind) -> Result<Box<dyn Channel>, TransportError>;
}

/// Bidirectional message channel for a single session
#[async_trait]
pub trait Channel: Send {
    async fn send(&mut self, message: Outbound) -> Result<(), TransportError>;

    /// Next frame from the backend; `None` once the channel has closed.
    /// Must be cancel-safe: the bridge polls it inside `select!`.
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// WebSocket transport to `<backend>/ws/<kind>`
#[derive(Debug, Clone)]
pub struct WsTransport {
    endpoint: BackendEndpoint,
}

impl WsTransport {
    pub fn new(endpoint: BackendEndpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, kind: SessionKind) -> Result<Box<dyn Channel>, TransportError> {
        let url = self.endpoint.ws_url(kind);
        log::info!("Connecting to WebSocket: {}", url);

        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect {
                url: url.clone(),
                message: e.to_string(),
            })?;

        Ok(Box::new(WsChannel { stream, url }))
    }
}

/// WebSocket channel
pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: String,
}

#[async_trait]
impl Channel for WsChannel {
    async fn send(&mut self, message: Outbound) -> Result<(), TransportError> {
        let message = match message {
            Outbound::Text(text) => Message::Text(text),
            Outbound::Binary(data) => Message::Binary(data),
        };
        self.stream.send(message).await.map_err(|e| match e {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportError::Closed
            }
            other => TransportError::Send(other.to_string()),
        })
    }

    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(Frame::Text(text))),
                Some(Ok(Message::Binary(data))) => return Some(Ok(Frame::Binary(data))),
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {
                    continue
                }
                Some(Ok(Message::Close(frame))) => {
                    log::info!("WebSocket {} closed by peer: {:?}", self.url, frame);
                    return None;
                }
                Some(Err(tungstenite::Error::ConnectionClosed)) | None => return None,
                Some(Err(e)) => return Some(Err(TransportError::Receive(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed) | Err(tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::Send(e.to_string())),
        }
    }
}
