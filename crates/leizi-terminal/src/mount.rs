use std::sync::Arc;

use leizi_types::Session;

use super::bridge::{BridgeHandle, TerminalBridge};
use super::decode::FrameDecoder;
use super::registry::{Dispose, Mount};
use super::renderer::{CellMetrics, ScreenRenderer, ScreenView};
use super::transport::Transport;
use super::window::HostWindow;
use super::DEFAULT_SCROLLBACK_LINES;

/// Mounts a screen renderer and bridge for every new session
///
/// Must be used from within a tokio runtime; each mount spawns the
/// session's bridge task.
pub struct TerminalMount {
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn FrameDecoder>,
    window: HostWindow,
    cell: CellMetrics,
    scrollback_lines: usize,
}

impl TerminalMount {
    pub fn new(transport: Arc<dyn Transport>, decoder: Arc<dyn FrameDecoder>, window: HostWindow) -> Self {
        Self {
            transport,
            decoder,
            window,
            cell: CellMetrics::default(),
            scrollback_lines: DEFAULT_SCROLLBACK_LINES,
        }
    }

    pub fn with_cell_metrics(mut self, cell: CellMetrics) -> Self {
        self.cell = cell;
        self
    }

    pub fn with_scrollback(mut self, lines: usize) -> Self {
        self.scrollback_lines = lines;
        self
    }

    pub fn window(&self) -> &HostWindow {
        &self.window
    }

    pub fn cell_metrics(&self) -> CellMetrics {
        self.cell
    }
}

impl Mount for TerminalMount {
    type Handle = MountedSession;

    fn mount(&mut self, session: &Session) -> MountedSession {
        let renderer = ScreenRenderer::with_scrollback(self.cell, self.scrollback_lines);
        let screen = renderer.view();
        let bridge = TerminalBridge::mount(
            session.clone(),
            renderer,
            Arc::clone(&self.transport),
            Arc::clone(&self.decoder),
            &self.window,
        );
        MountedSession { bridge, screen }
    }
}

/// A session's running bridge and the screen it draws into
#[derive(Debug)]
pub struct MountedSession {
    pub bridge: BridgeHandle,
    pub screen: ScreenView,
}

impl Dispose for MountedSession {
    fn dispose(&mut self) {
        self.bridge.dispose();
    }
}
