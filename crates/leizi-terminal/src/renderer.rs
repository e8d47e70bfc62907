use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use vt100::Parser;

use super::window::Viewport;
use super::{DEFAULT_CELL_HEIGHT, DEFAULT_CELL_WIDTH, DEFAULT_COLS, DEFAULT_ROWS, DEFAULT_SCROLLBACK_LINES};

/// Character grid geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSize {
    pub cols: u16,
    pub rows: u16,
}

impl Default for GridSize {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
        }
    }
}

/// Pixel size of one character cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMetrics {
    pub width: u32,
    pub height: u32,
}

impl CellMetrics {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Largest grid that fits in `viewport` (at least 2 columns and 1 row)
    pub fn grid_for(&self, viewport: Viewport) -> GridSize {
        let cols = (viewport.width / self.width).clamp(2, u16::MAX as u32) as u16;
        let rows = (viewport.height / self.height).clamp(1, u16::MAX as u32) as u16;
        GridSize { cols, rows }
    }

    /// Pixel viewport covering a grid
    pub fn viewport_for(&self, grid: GridSize) -> Viewport {
        Viewport::new(grid.cols as u32 * self.width, grid.rows as u32 * self.height)
    }
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_WIDTH, DEFAULT_CELL_HEIGHT)
    }
}

/// Terminal renderer driven by a session bridge
pub trait Renderer: Send + 'static {
    /// Display output received from the remote side
    fn write(&mut self, data: &[u8]);

    /// Recompute the character grid to fit a pixel viewport
    fn fit(&mut self, viewport: Viewport) -> GridSize;

    /// Current character grid
    fn grid_size(&self) -> GridSize;

    /// Release the renderer; later writes and fits are ignored
    fn dispose(&mut self);
}

struct ScreenState {
    parser: Parser,
    revision: u64,
    disposed: bool,
}

impl ScreenState {
    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Scroll back at most one screenful; vt100 can't draw a larger offset
    fn set_scrollback(&mut self, rows: usize) {
        let height = self.parser.screen().size().0 as usize;
        self.parser.set_scrollback(rows.min(height));
    }

    /// Pull the offset back in range after output or a resize moved it
    fn clamp_scrollback(&mut self) {
        let offset = self.parser.screen().scrollback();
        if offset > 0 {
            self.set_scrollback(offset);
        }
    }
}

/// VT100 screen renderer with scrollback
pub struct ScreenRenderer {
    state: Arc<Mutex<ScreenState>>,
    cell: CellMetrics,
}

impl ScreenRenderer {
    /// Create a renderer with the default grid and scrollback
    pub fn new(cell: CellMetrics) -> Self {
        Self::with_scrollback(cell, DEFAULT_SCROLLBACK_LINES)
    }

    pub fn with_scrollback(cell: CellMetrics, scrollback_lines: usize) -> Self {
        let grid = GridSize::default();
        let state = ScreenState {
            parser: Parser::new(grid.rows, grid.cols, scrollback_lines),
            revision: 0,
            disposed: false,
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            cell,
        }
    }

    /// Read-only handle on the screen for the host to draw from
    pub fn view(&self) -> ScreenView {
        ScreenView {
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScreenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Renderer for ScreenRenderer {
    fn write(&mut self, data: &[u8]) {
        let mut state = self.lock();
        if state.disposed || data.is_empty() {
            return;
        }
        state.parser.process(data);
        state.clamp_scrollback();
        state.touch();
    }

    fn fit(&mut self, viewport: Viewport) -> GridSize {
        let grid = self.cell.grid_for(viewport);
        let mut state = self.lock();
        if state.disposed {
            let (rows, cols) = state.parser.screen().size();
            return GridSize { cols, rows };
        }
        let (rows, cols) = state.parser.screen().size();
        if (rows, cols) != (grid.rows, grid.cols) {
            // Resize in place so scrollback survives
            state.parser.set_size(grid.rows, grid.cols);
            state.clamp_scrollback();
            state.touch();
        }
        grid
    }

    fn grid_size(&self) -> GridSize {
        let (rows, cols) = self.lock().parser.screen().size();
        GridSize { cols, rows }
    }

    fn dispose(&mut self) {
        let mut state = self.lock();
        if !state.disposed {
            state.disposed = true;
            state.touch();
        }
    }
}

/// Shared read handle on a `ScreenRenderer`'s screen
///
/// Stays readable after the renderer is disposed, so a dead session's tab
/// still shows its last output.
#[derive(Clone)]
pub struct ScreenView {
    state: Arc<Mutex<ScreenState>>,
}

impl std::fmt::Debug for ScreenView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenView")
            .field("grid", &self.grid_size())
            .field("revision", &self.revision())
            .finish()
    }
}

impl ScreenView {
    fn lock(&self) -> MutexGuard<'_, ScreenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Plain text of the visible screen
    pub fn contents(&self) -> String {
        self.lock().parser.screen().contents()
    }

    /// Visible screen with ANSI attributes
    pub fn contents_formatted(&self) -> Vec<u8> {
        self.lock().parser.screen().contents_formatted()
    }

    /// Each visible row with ANSI attributes, for drawing at an offset
    pub fn rows_formatted(&self) -> Vec<Vec<u8>> {
        let state = self.lock();
        let screen = state.parser.screen();
        let (_, cols) = screen.size();
        screen.rows_formatted(0, cols).collect()
    }

    /// Cursor position (row, col)
    pub fn cursor_position(&self) -> (u16, u16) {
        self.lock().parser.screen().cursor_position()
    }

    pub fn hide_cursor(&self) -> bool {
        self.lock().parser.screen().hide_cursor()
    }

    pub fn grid_size(&self) -> GridSize {
        let (rows, cols) = self.lock().parser.screen().size();
        GridSize { cols, rows }
    }

    /// Scroll the view `rows` lines back into the scrollback, up to one screen
    pub fn scroll_back(&self, rows: usize) {
        let mut state = self.lock();
        state.set_scrollback(rows);
        state.touch();
    }

    pub fn scroll_to_bottom(&self) {
        self.scroll_back(0);
    }

    /// Lines currently scrolled back
    pub fn scrollback_offset(&self) -> usize {
        self.lock().parser.screen().scrollback()
    }

    /// Counter bumped on every change, for repaint detection
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }
}
