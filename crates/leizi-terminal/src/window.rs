//! Host window geometry
//!
//! The host (console, desktop shell) owns one `HostWindow` and reports pixel
//! size changes through it. Every mounted bridge holds one `ResizeListener`
//! for as long as it is alive.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::{DEFAULT_CELL_HEIGHT, DEFAULT_CELL_WIDTH, DEFAULT_COLS, DEFAULT_ROWS};

/// Resize events buffered per listener before older ones are dropped
const RESIZE_QUEUE: usize = 64;

/// Pixel size of the area a terminal is drawn into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: DEFAULT_COLS as u32 * DEFAULT_CELL_WIDTH,
            height: DEFAULT_ROWS as u32 * DEFAULT_CELL_HEIGHT,
        }
    }
}

/// Source of viewport resize events shared by all sessions
#[derive(Debug, Clone)]
pub struct HostWindow {
    sender: broadcast::Sender<Viewport>,
    current: Arc<Mutex<Viewport>>,
}

impl HostWindow {
    pub fn new(initial: Viewport) -> Self {
        let (sender, _) = broadcast::channel(RESIZE_QUEUE);
        Self {
            sender,
            current: Arc::new(Mutex::new(initial)),
        }
    }

    /// Current viewport
    pub fn viewport(&self) -> Viewport {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new viewport and notify every listener.
    /// Returns the number of listeners notified.
    pub fn resize(&self, viewport: Viewport) -> usize {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = viewport;
        self.sender.send(viewport).unwrap_or(0)
    }

    /// Register a resize listener
    pub fn subscribe(&self) -> ResizeListener {
        ResizeListener {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live listeners
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for HostWindow {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

/// Subscription to a window's resize events; dropping it unregisters
#[derive(Debug)]
pub struct ResizeListener {
    receiver: broadcast::Receiver<Viewport>,
}

impl ResizeListener {
    /// Wait for the next resize event. `None` once the window is gone.
    ///
    /// Cancel-safe.
    pub async fn recv(&mut self) -> Option<Viewport> {
        loop {
            match self.receiver.recv().await {
                Ok(viewport) => return Some(viewport),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("resize listener lagged, skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resize_reaches_every_listener() {
        let window = HostWindow::default();
        let mut a = window.subscribe();
        let mut b = window.subscribe();
        assert_eq!(window.listener_count(), 2);

        let viewport = Viewport::new(800, 600);
        assert_eq!(window.resize(viewport), 2);
        assert_eq!(window.viewport(), viewport);
        assert_eq!(a.recv().await, Some(viewport));
        assert_eq!(b.recv().await, Some(viewport));
    }

    #[tokio::test]
    async fn test_dropping_listener_unregisters() {
        let window = HostWindow::default();
        let listener = window.subscribe();
        assert_eq!(window.listener_count(), 1);
        drop(listener);
        assert_eq!(window.listener_count(), 0);
        assert_eq!(window.resize(Viewport::new(10, 10)), 0);
    }

    #[tokio::test]
    async fn test_listener_ends_when_window_dropped() {
        let window = HostWindow::default();
        let mut listener = window.subscribe();
        drop(window);
        assert_eq!(listener.recv().await, None);
    }
}
