//! Full-screen console host
//!
//! Draws a one-line tab strip and the active session's screen, forwards key
//! presses to the active bridge and feeds terminal resizes into the shared
//! host window.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::style::{Attribute, Print, PrintStyledContent, SetAttribute, Stylize};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use futures_util::StreamExt;
use tokio::time::MissedTickBehavior;

use leizi_terminal::{
    BridgeState, CellMetrics, FrameDecoder, GridSize, HostWindow, MountedSession, SessionRegistry, TerminalMount,
    Transport, Viewport, DEFAULT_COLS, DEFAULT_ROWS,
};
use leizi_types::{ConnectionConfig, SessionId, SessionKind};

use super::keys::{EscapeState, HostAction};

/// Rows taken by the tab strip
const TAB_STRIP_ROWS: u16 = 1;

/// Repaint interval
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// How long to wait for bridges to close their channels on exit
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Puts the terminal in raw mode on the alternate screen and restores it on drop
struct RawTerminal;

impl RawTerminal {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
            let _ = terminal::disable_raw_mode();
            return Err(e).context("Failed to enter alternate screen");
        }
        Ok(Self)
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Pixel viewport for the session area of a `cols` x `rows` terminal
pub fn session_viewport(cell: CellMetrics, cols: u16, rows: u16) -> Viewport {
    let rows = rows.saturating_sub(TAB_STRIP_ROWS).max(1);
    cell.viewport_for(GridSize { cols: cols.max(2), rows })
}

/// Text of the tab strip, one label per session, truncated to `width`
pub fn tab_labels<'a>(tabs: impl Iterator<Item = (&'a str, bool, bool)>, width: usize) -> Vec<(String, bool)> {
    let mut used = 0;
    let mut labels = Vec::new();
    for (index, (title, live, active)) in tabs.enumerate() {
        let marker = if live { "" } else { " (closed)" };
        let label = format!(" {}:{}{} ", index + 1, title, marker);
        let room = width.saturating_sub(used);
        if room == 0 {
            break;
        }
        let label: String = label.chars().take(room).collect();
        used += label.chars().count();
        labels.push((label, active));
    }
    labels
}

/// Multi-tab console over a session registry
pub struct ConsoleHost {
    registry: SessionRegistry<TerminalMount>,
    window: HostWindow,
    cell: CellMetrics,
    escape: EscapeState,
    /// Active tab, screen revision and live tab count last painted
    painted: Option<(SessionId, u64, usize)>,
    closing: Vec<MountedSession>,
}

impl ConsoleHost {
    pub fn new(
        transport: Arc<dyn Transport>,
        decoder: Arc<dyn FrameDecoder>,
        cell: CellMetrics,
        scrollback_lines: usize,
    ) -> Self {
        let initial = session_viewport(cell, DEFAULT_COLS, DEFAULT_ROWS + TAB_STRIP_ROWS);
        let window = HostWindow::new(initial);
        let mount = TerminalMount::new(transport, decoder, window.clone())
            .with_cell_metrics(cell)
            .with_scrollback(scrollback_lines);
        Self {
            registry: SessionRegistry::new(mount),
            window,
            cell,
            escape: EscapeState::default(),
            painted: None,
            closing: Vec::new(),
        }
    }

    /// Open `sessions` as tabs and run until the last tab closes
    pub async fn run(mut self, sessions: Vec<(SessionKind, ConnectionConfig)>) -> Result<()> {
        let guard = RawTerminal::enter()?;
        let mut stdout = io::stdout();

        let (cols, rows) = terminal::size().context("Failed to read terminal size")?;
        self.window.resize(session_viewport(self.cell, cols, rows));

        for (kind, config) in sessions {
            self.registry.create_session(kind, config);
        }

        let mut events = EventStream::new();
        let mut frames = tokio::time::interval(FRAME_INTERVAL);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.registry.is_empty() {
            tokio::select! {
                event = events.next() => match event {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) => {
                        log::error!("Failed to read terminal event: {}", e);
                        break;
                    }
                    None => break,
                },
                _ = frames.tick() => {
                    if let Err(e) = self.paint(&mut stdout) {
                        log::error!("Failed to draw: {}", e);
                    }
                }
            }
        }

        self.shutdown().await;
        drop(guard);
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => match self.escape.feed(key) {
                HostAction::Send(bytes) => self.send_to_active(bytes),
                HostAction::NextTab => {
                    self.registry.activate_next();
                }
                HostAction::PreviousTab => {
                    self.registry.activate_previous();
                }
                HostAction::CloseTab => {
                    self.closing.retain(|m| m.bridge.state() != BridgeState::Closed);
                    if let Some(id) = self.registry.active_id() {
                        if let Some(closed) = self.registry.close_session(&id) {
                            self.closing.push(closed);
                        }
                    }
                }
                HostAction::Quit => self.closing.extend(self.registry.close_all()),
                HostAction::Ignore => {}
            },
            Event::Paste(text) => self.send_to_active(text.into_bytes()),
            Event::Resize(cols, rows) => {
                self.window.resize(session_viewport(self.cell, cols, rows));
                self.painted = None;
            }
            _ => {}
        }
    }

    fn send_to_active(&self, bytes: Vec<u8>) {
        if let Some(mounted) = self.registry.active_handle() {
            mounted.bridge.send_input(bytes);
        }
    }

    fn paint(&mut self, stdout: &mut Stdout) -> io::Result<()> {
        let Some(active) = self.registry.active_handle() else {
            return Ok(());
        };
        let id = active.bridge.session_id();
        let revision = active.screen.revision();
        let live = self.registry.iter().filter(|(_, mounted)| mounted.bridge.is_live()).count();
        if self.painted == Some((id, revision, live)) {
            return Ok(());
        }
        let tab_changed = self.painted.map(|(painted, _, _)| painted) != Some(id);

        let (cols, _) = terminal::size()?;
        if tab_changed {
            queue!(stdout, Clear(ClearType::All))?;
        }

        // Tab strip
        let tabs = self
            .registry
            .iter()
            .map(|(session, mounted)| (session.title.as_str(), mounted.bridge.is_live(), session.id == id));
        queue!(stdout, MoveTo(0, 0), Clear(ClearType::CurrentLine))?;
        for (label, is_active) in tab_labels(tabs, cols as usize) {
            if is_active {
                queue!(stdout, PrintStyledContent(label.reverse().bold()))?;
            } else {
                queue!(stdout, Print(label))?;
            }
        }

        // Active screen
        let screen = &active.screen;
        for (row, line) in screen.rows_formatted().iter().enumerate() {
            queue!(stdout, MoveTo(0, row as u16 + TAB_STRIP_ROWS))?;
            stdout.write_all(line)?;
            queue!(stdout, SetAttribute(Attribute::Reset), Clear(ClearType::UntilNewLine))?;
        }

        let (cursor_row, cursor_col) = screen.cursor_position();
        queue!(stdout, MoveTo(cursor_col, cursor_row + TAB_STRIP_ROWS))?;
        if screen.hide_cursor() {
            queue!(stdout, Hide)?;
        } else {
            queue!(stdout, Show)?;
        }
        stdout.flush()?;

        self.painted = Some((id, revision, live));
        Ok(())
    }

    /// Close what's left and give bridges a moment to close their channels
    async fn shutdown(&mut self) {
        self.closing.extend(self.registry.close_all());
        let closing = std::mem::take(&mut self.closing);
        let wait_all = async {
            for mut mounted in closing {
                mounted.bridge.closed().await;
            }
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, wait_all).await.is_err() {
            log::warn!("Sessions did not close within {:?}", SHUTDOWN_GRACE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_session_viewport_reserves_tab_strip() {
        let cell = CellMetrics::new(9, 17);
        let viewport = session_viewport(cell, 120, 40);
        assert_eq!(viewport, Viewport::new(120 * 9, 39 * 17));
        assert_eq!(cell.grid_for(viewport), GridSize { cols: 120, rows: 39 });
    }

    #[test]
    fn test_session_viewport_minimum() {
        let cell = CellMetrics::new(9, 17);
        assert_eq!(cell.grid_for(session_viewport(cell, 0, 1)), GridSize { cols: 2, rows: 1 });
    }

    #[test]
    fn test_tab_labels() {
        let tabs = vec![("ssh://a", true, false), ("telnet://b", false, true)];
        let labels = tab_labels(tabs.into_iter(), 80);
        assert_eq!(
            labels,
            vec![
                (" 1:ssh://a ".to_string(), false),
                (" 2:telnet://b (closed) ".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_tab_labels_truncate() {
        let tabs = vec![("ssh://a", true, true), ("ssh://b", true, false)];
        let labels = tab_labels(tabs.into_iter(), 14);
        assert_eq!(labels, vec![(" 1:ssh://a ".to_string(), true), (" 2:".to_string(), false)]);
    }
}
