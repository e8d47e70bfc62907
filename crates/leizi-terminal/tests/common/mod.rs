#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use leizi_terminal::{
    CellMetrics, Channel, DecodeError, Frame, FrameDecoder, GridSize, Outbound, Renderer, Transport,
    TransportError, Viewport,
};
use leizi_types::SessionKind;

/// Poll `condition` until it holds, failing the test after two seconds
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// What happened to a `RecordingRenderer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Write(Vec<u8>),
    Fit(Viewport),
    Dispose,
}

/// Renderer that records every call for later inspection
pub struct RecordingRenderer {
    events: Arc<Mutex<Vec<RenderEvent>>>,
    grid: GridSize,
}

#[derive(Clone)]
pub struct RenderLog {
    events: Arc<Mutex<Vec<RenderEvent>>>,
}

impl RecordingRenderer {
    pub fn new() -> (Self, RenderLog) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let renderer = Self {
            events: Arc::clone(&events),
            grid: GridSize::default(),
        };
        (renderer, RenderLog { events })
    }

    fn record(&self, event: RenderEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Renderer for RecordingRenderer {
    fn write(&mut self, data: &[u8]) {
        self.record(RenderEvent::Write(data.to_vec()));
    }

    fn fit(&mut self, viewport: Viewport) -> GridSize {
        self.record(RenderEvent::Fit(viewport));
        self.grid = CellMetrics::default().grid_for(viewport);
        self.grid
    }

    fn grid_size(&self) -> GridSize {
        self.grid
    }

    fn dispose(&mut self) {
        self.record(RenderEvent::Dispose);
    }
}

impl RenderLog {
    pub fn events(&self) -> Vec<RenderEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Everything written to the renderer, concatenated
    pub fn output(&self) -> String {
        let bytes: Vec<u8> = self
            .events()
            .into_iter()
            .filter_map(|event| match event {
                RenderEvent::Write(data) => Some(data),
                _ => None,
            })
            .flatten()
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn fits(&self) -> usize {
        self.events().iter().filter(|e| matches!(e, RenderEvent::Fit(_))).count()
    }

    pub fn disposals(&self) -> usize {
        self.events().iter().filter(|e| **e == RenderEvent::Dispose).count()
    }
}

/// How `FakeTransport::open` behaves
pub enum OpenMode {
    /// Open immediately
    Ready,
    /// Open once the test releases the gate
    Gated(oneshot::Receiver<()>),
    /// Never complete
    Hang,
    /// Fail immediately
    Fail,
}

/// In-memory transport handing out a single scripted channel
pub struct FakeTransport {
    mode: Mutex<Option<OpenMode>>,
    channel: Mutex<Option<FakeChannel>>,
    pub opens: AtomicUsize,
}

/// Test-side end of a `FakeChannel`
pub struct Remote {
    pub sent: mpsc::UnboundedReceiver<Outbound>,
    frames: Option<mpsc::UnboundedSender<Result<Frame, TransportError>>>,
    pub closes: Arc<AtomicUsize>,
}

pub struct FakeChannel {
    sent: mpsc::UnboundedSender<Outbound>,
    frames: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
    closes: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn new(mode: OpenMode) -> (Arc<Self>, Remote) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let closes = Arc::new(AtomicUsize::new(0));

        let channel = FakeChannel {
            sent: sent_tx,
            frames: frames_rx,
            closes: Arc::clone(&closes),
        };
        let transport = Arc::new(Self {
            mode: Mutex::new(Some(mode)),
            channel: Mutex::new(Some(channel)),
            opens: AtomicUsize::new(0),
        });
        let remote = Remote {
            sent: sent_rx,
            frames: Some(frames_tx),
            closes,
        };
        (transport, remote)
    }

    pub fn ready() -> (Arc<Self>, Remote) {
        Self::new(OpenMode::Ready)
    }

    pub fn gated() -> (Arc<Self>, Remote, oneshot::Sender<()>) {
        let (release, gate) = oneshot::channel();
        let (transport, remote) = Self::new(OpenMode::Gated(gate));
        (transport, remote, release)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(&self, kind: SessionKind) -> Result<Box<dyn Channel>, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let mode = self.mode.lock().unwrap().take().unwrap_or(OpenMode::Fail);
        match mode {
            OpenMode::Ready => {}
            OpenMode::Gated(gate) => {
                let _ = gate.await;
            }
            OpenMode::Hang => std::future::pending::<()>().await,
            OpenMode::Fail => {
                return Err(TransportError::Connect {
                    url: format!("fake://{}", kind),
                    message: "connection refused".to_string(),
                })
            }
        }
        let channel = self.channel.lock().unwrap().take().ok_or(TransportError::Closed)?;
        Ok(Box::new(channel))
    }
}

#[async_trait]
impl Channel for FakeChannel {
    async fn send(&mut self, message: Outbound) -> Result<(), TransportError> {
        self.sent.send(message).map_err(|_| TransportError::Closed)
    }

    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        self.frames.recv().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Remote {
    pub fn push(&self, frame: Frame) {
        if let Some(frames) = &self.frames {
            // The bridge may already be gone
            let _ = frames.send(Ok(frame));
        }
    }

    pub fn fail(&self, message: &str) {
        if let Some(frames) = &self.frames {
            let _ = frames.send(Err(TransportError::Receive(message.to_string())));
        }
    }

    /// Close the channel from the backend side
    pub fn hang_up(&mut self) {
        self.frames = None;
    }

    pub async fn next_sent(&mut self) -> Outbound {
        tokio::time::timeout(Duration::from_secs(2), self.sent.recv())
            .await
            .expect("timed out waiting for an outbound message")
            .expect("channel dropped")
    }

    /// Everything sent so far, without waiting
    pub fn drain_sent(&mut self) -> Vec<Outbound> {
        let mut messages = Vec::new();
        while let Ok(message) = self.sent.try_recv() {
            messages.push(message);
        }
        messages
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Decoder that takes a while per frame
pub struct SlowDecoder(pub Duration);

#[async_trait]
impl FrameDecoder for SlowDecoder {
    async fn decode(&self, payload: Vec<u8>) -> Result<Vec<u8>, DecodeError> {
        tokio::time::sleep(self.0).await;
        Ok(payload)
    }
}

/// Decoder that rejects the payload `bad`
pub struct PickyDecoder;

#[async_trait]
impl FrameDecoder for PickyDecoder {
    async fn decode(&self, payload: Vec<u8>) -> Result<Vec<u8>, DecodeError> {
        if payload == b"bad" {
            Err(DecodeError::Unreadable("corrupt payload".to_string()))
        } else {
            Ok(payload)
        }
    }
}
