// Terminal session core
//
// This crate multiplexes remote terminal sessions: each session gets a
// renderer (VT100 screen with scrollback) and a transport channel to the
// backend, joined by a bridge task that keeps bytes flowing both ways.

pub mod bridge;
pub mod decode;
pub mod mount;
pub mod registry;
pub mod renderer;
pub mod transport;
pub mod window;

// Re-export public API
pub use bridge::{BridgeHandle, BridgeState, TerminalBridge};
pub use decode::{DecodeError, FrameDecoder, RawDecoder};
pub use mount::{MountedSession, TerminalMount};
pub use registry::{Dispose, Mount, SessionRegistry};
pub use renderer::{CellMetrics, GridSize, Renderer, ScreenRenderer, ScreenView};
pub use transport::{Channel, Frame, Outbound, Transport, TransportError, WsTransport};
pub use window::{HostWindow, ResizeListener, Viewport};

// Constants
pub const DEFAULT_SCROLLBACK_LINES: usize = 1000;
pub const DEFAULT_COLS: u16 = 80;
pub const DEFAULT_ROWS: u16 = 24;
pub const DEFAULT_CELL_WIDTH: u32 = 9;
pub const DEFAULT_CELL_HEIGHT: u32 = 17;
