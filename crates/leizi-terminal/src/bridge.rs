//! Per-session terminal bridge
//!
//! A bridge owns one renderer and one transport channel and runs as a single
//! tokio task. The task is the only place session bytes move, so inbound
//! frames reach the renderer strictly in the order they arrived, even when a
//! binary frame takes a while to decode.
//!
//! State machine:
//!
//! ```text
//! Initializing --channel open--> Open
//! Initializing | Open --dispose / channel error / remote close--> Closing --released--> Closed
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use leizi_types::{Session, SessionId};

use super::decode::FrameDecoder;
use super::registry::Dispose;
use super::renderer::Renderer;
use super::transport::{Channel, Frame, Outbound, Transport};
use super::window::{HostWindow, ResizeListener, Viewport};

/// Bridge lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BridgeState {
    /// Renderer mounted, channel requested but not open
    Initializing,
    /// Handshake sent, duplex traffic flowing
    Open,
    /// Teardown in progress
    Closing,
    /// Inert; never leaves this state
    Closed,
}

impl BridgeState {
    /// Whether the session can still carry traffic
    pub fn is_live(&self) -> bool {
        matches!(self, BridgeState::Initializing | BridgeState::Open)
    }
}

impl std::fmt::Display for BridgeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeState::Initializing => write!(f, "connecting"),
            BridgeState::Open => write!(f, "open"),
            BridgeState::Closing => write!(f, "closing"),
            BridgeState::Closed => write!(f, "closed"),
        }
    }
}

/// Why the duplex loop stopped
enum Ending {
    Disposed,
    RemoteClosed,
    Failed(String),
}

/// Moves bytes between one session's renderer and its transport channel
pub struct TerminalBridge<R: Renderer> {
    session: Session,
    renderer: R,
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn FrameDecoder>,
    resize: Option<ResizeListener>,
    state: watch::Sender<BridgeState>,
    /// Set when the channel could not be opened
    failed: watch::Sender<bool>,
}

impl<R: Renderer> TerminalBridge<R> {
    /// Mount a bridge for `session` and start it on the current runtime.
    ///
    /// The renderer is fitted to the window once, a resize listener is
    /// registered, and the channel is requested in the background.
    pub fn mount(
        session: Session,
        mut renderer: R,
        transport: Arc<dyn Transport>,
        decoder: Arc<dyn FrameDecoder>,
        window: &HostWindow,
    ) -> BridgeHandle {
        renderer.fit(window.viewport());
        let resize = Some(window.subscribe());

        let (state_tx, state_rx) = watch::channel(BridgeState::Initializing);
        let (failed_tx, failed_rx) = watch::channel(false);
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let session_id = session.id;

        let bridge = TerminalBridge {
            session,
            renderer,
            transport,
            decoder,
            resize,
            state: state_tx,
            failed: failed_tx,
        };
        let task = tokio::spawn(bridge.run(input_rx, cancel.clone()));

        BridgeHandle {
            session_id,
            state: state_rx,
            failed: failed_rx,
            input: input_tx,
            cancel,
            task: Some(task),
        }
    }

    async fn run(mut self, mut input: mpsc::UnboundedReceiver<Vec<u8>>, cancel: CancellationToken) {
        log::debug!("Session {}: requesting {} channel", self.session.id, self.session.kind);

        let Some(mut channel) = self.connect(&cancel).await else {
            self.teardown(None).await;
            return;
        };

        let ending = match channel.send(Outbound::Text(self.session.handshake())).await {
            Ok(()) => {
                self.state.send_replace(BridgeState::Open);
                log::info!("Session {}: {} channel open", self.session.id, self.session.kind);
                self.pump(channel.as_mut(), &mut input, &cancel).await
            }
            Err(e) => Ending::Failed(format!("handshake failed: {}", e)),
        };

        let channel = match ending {
            Ending::Disposed => {
                log::info!("Session {}: disposed", self.session.id);
                Some(channel)
            }
            Ending::RemoteClosed => {
                log::info!("Session {}: channel closed by backend", self.session.id);
                self.notice("connection closed");
                None
            }
            Ending::Failed(reason) => {
                log::warn!("Session {}: channel error: {}", self.session.id, reason);
                self.notice(&format!("connection error: {}", reason));
                Some(channel)
            }
        };

        self.teardown(channel).await;
    }

    /// Wait for the channel to open. A failed attempt is reported and flagged,
    /// and the bridge stays Initializing until disposed. Returns `None` on
    /// dispose.
    async fn connect(&mut self, cancel: &CancellationToken) -> Option<Box<dyn Channel>> {
        let transport = Arc::clone(&self.transport);
        let open = transport.open(self.session.kind);
        tokio::pin!(open);
        let mut pending = true;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                viewport = next_resize(&mut self.resize) => self.on_resize(viewport),
                result = &mut open, if pending => match result {
                    Ok(channel) => return Some(channel),
                    Err(e) => {
                        pending = false;
                        self.failed.send_replace(true);
                        log::error!("Session {}: {}", self.session.id, e);
                        self.notice(&format!("connection failed: {}", e));
                    }
                },
            }
        }
    }

    /// Duplex loop while the channel is open
    async fn pump(
        &mut self,
        channel: &mut dyn Channel,
        input: &mut mpsc::UnboundedReceiver<Vec<u8>>,
        cancel: &CancellationToken,
    ) -> Ending {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ending::Disposed,
                viewport = next_resize(&mut self.resize) => self.on_resize(viewport),
                Some(data) = input.recv() => {
                    if let Err(e) = channel.send(Outbound::input(data)).await {
                        return Ending::Failed(e.to_string());
                    }
                }
                frame = channel.recv() => match frame {
                    Some(Ok(frame)) => {
                        if !self.apply(frame, cancel).await {
                            return Ending::Disposed;
                        }
                    }
                    Some(Err(e)) => return Ending::Failed(e.to_string()),
                    None => return Ending::RemoteClosed,
                },
            }
        }
    }

    /// Write one inbound frame to the renderer. Returns false if disposed
    /// while a binary frame was decoding.
    async fn apply(&mut self, frame: Frame, cancel: &CancellationToken) -> bool {
        match frame {
            Frame::Text(text) => self.renderer.write(text.as_bytes()),
            Frame::Binary(payload) => {
                let decoded = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return false,
                    decoded = self.decoder.decode(payload) => decoded,
                };
                match decoded {
                    Ok(bytes) => self.renderer.write(&bytes),
                    Err(e) => log::warn!("Session {}: dropping frame: {}", self.session.id, e),
                }
            }
        }
        true
    }

    fn on_resize(&mut self, viewport: Option<Viewport>) {
        match viewport {
            Some(viewport) => {
                let grid = self.renderer.fit(viewport);
                log::trace!("Session {}: refit to {}x{}", self.session.id, grid.cols, grid.rows);
            }
            // Window is gone; stop listening
            None => self.resize = None,
        }
    }

    fn notice(&mut self, message: &str) {
        let line = format!("\r\n[{}] {}\r\n", self.session.kind, message);
        self.renderer.write(line.as_bytes());
    }

    async fn teardown(&mut self, channel: Option<Box<dyn Channel>>) {
        self.state.send_replace(BridgeState::Closing);

        self.renderer.dispose();
        if let Some(mut channel) = channel {
            if let Err(e) = channel.close().await {
                log::debug!("Session {}: error closing channel: {}", self.session.id, e);
            }
        }
        self.resize = None;

        self.state.send_replace(BridgeState::Closed);
        log::debug!("Session {}: bridge closed", self.session.id);
    }
}

async fn next_resize(listener: &mut Option<ResizeListener>) -> Option<Viewport> {
    match listener {
        Some(listener) => listener.recv().await,
        None => std::future::pending().await,
    }
}

/// Host-side handle on a running bridge
///
/// Dropping the handle disposes the bridge.
pub struct BridgeHandle {
    session_id: SessionId,
    state: watch::Receiver<BridgeState>,
    failed: watch::Receiver<bool>,
    input: mpsc::UnboundedSender<Vec<u8>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl BridgeHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn state(&self) -> BridgeState {
        *self.state.borrow()
    }

    /// Whether the channel failed to open. The state stays Initializing
    /// until the session is disposed.
    pub fn is_failed(&self) -> bool {
        *self.failed.borrow()
    }

    /// Whether the session is connecting or connected
    pub fn is_live(&self) -> bool {
        self.state().is_live() && !self.is_failed()
    }

    /// Forward input to the channel. Input is only accepted while the
    /// channel is open; otherwise it is dropped and `false` returned.
    ///
    /// Bytes are sent verbatim, see `Outbound::input` for how non-UTF-8
    /// input is framed.
    pub fn send_input(&self, data: impl Into<Vec<u8>>) -> bool {
        if self.state() != BridgeState::Open {
            log::trace!("Session {}: dropping input, bridge not open", self.session_id);
            return false;
        }
        self.input.send(data.into()).is_ok()
    }

    /// Request teardown. Idempotent.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    /// Wait until the bridge reaches `target` or any later state
    pub async fn wait_for_state(&mut self, target: BridgeState) -> BridgeState {
        let reached = self
            .state
            .wait_for(|state| *state >= target)
            .await
            .map(|state| *state);
        // The sender is gone once the task has finished
        reached.unwrap_or_else(|_| *self.state.borrow())
    }

    /// Wait until the bridge task has finished tearing down
    pub async fn closed(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("Session {}: bridge task failed: {}", self.session_id, e);
            }
        }
    }
}

impl Dispose for BridgeHandle {
    fn dispose(&mut self) {
        self.cancel.cancel();
    }
}

impl Drop for BridgeHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for BridgeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeHandle")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .field("failed", &self.is_failed())
            .finish()
    }
}
