//! Keyboard handling for the console host
//!
//! Keys are encoded into the byte sequences a remote shell expects. One key,
//! `Ctrl-]`, is reserved as a command prefix for tab management.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Byte sent for `Ctrl-]`
pub const ESCAPE_BYTE: u8 = 0x1d;

/// What the host should do with a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    /// Forward bytes to the active session
    Send(Vec<u8>),
    NextTab,
    PreviousTab,
    CloseTab,
    /// Close every tab and exit
    Quit,
    /// Nothing to do
    Ignore,
}

/// Tracks whether the command prefix was just pressed
#[derive(Debug, Default)]
pub struct EscapeState {
    armed: bool,
}

impl EscapeState {
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Map a key press to a host action
    pub fn feed(&mut self, key: KeyEvent) -> HostAction {
        if !self.armed {
            if is_escape_key(&key) {
                self.armed = true;
                return HostAction::Ignore;
            }
            return key_event_to_bytes(key).map_or(HostAction::Ignore, HostAction::Send);
        }

        self.armed = false;
        if is_escape_key(&key) {
            return HostAction::Send(vec![ESCAPE_BYTE]);
        }
        match key.code {
            KeyCode::Char('n') => HostAction::NextTab,
            KeyCode::Char('p') => HostAction::PreviousTab,
            KeyCode::Char('x') => HostAction::CloseTab,
            KeyCode::Char('q') => HostAction::Quit,
            _ => HostAction::Ignore,
        }
    }
}

fn is_escape_key(key: &KeyEvent) -> bool {
    // Some terminals report Ctrl-] as Ctrl-5
    key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char(']') | KeyCode::Char('5'))
}

/// Convert a key event to the bytes a remote terminal expects.
///
/// Returns None for keys with no encoding.
pub fn key_event_to_bytes(key: KeyEvent) -> Option<Vec<u8>> {
    let modifiers = key.modifiers;
    let bytes = match key.code {
        KeyCode::Char(ch) if modifiers.contains(KeyModifiers::CONTROL) => control_char(ch)
            .map(|code| vec![code])
            .unwrap_or_else(|| utf8(ch)),
        KeyCode::Char(ch) => utf8(ch),
        KeyCode::Enter => b"\r".to_vec(),
        KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => b"\x1b[Z".to_vec(),
        KeyCode::Tab => b"\t".to_vec(),
        KeyCode::BackTab => return Some(b"\x1b[Z".to_vec()),
        KeyCode::Backspace => vec![0x7f],
        KeyCode::Esc => vec![0x1b],
        KeyCode::Up => return Some(cursor_key(modifiers, 'A')),
        KeyCode::Down => return Some(cursor_key(modifiers, 'B')),
        KeyCode::Right => return Some(cursor_key(modifiers, 'C')),
        KeyCode::Left => return Some(cursor_key(modifiers, 'D')),
        KeyCode::Home => return Some(cursor_key(modifiers, 'H')),
        KeyCode::End => return Some(cursor_key(modifiers, 'F')),
        KeyCode::Insert => return Some(tilde_key(modifiers, 2)),
        KeyCode::Delete => return Some(tilde_key(modifiers, 3)),
        KeyCode::PageUp => return Some(tilde_key(modifiers, 5)),
        KeyCode::PageDown => return Some(tilde_key(modifiers, 6)),
        KeyCode::F(n) => return function_key(n),
        _ => return None,
    };

    // Alt sends ESC before the key
    if modifiers.contains(KeyModifiers::ALT) {
        let mut prefixed = Vec::with_capacity(bytes.len() + 1);
        prefixed.push(0x1b);
        prefixed.extend(bytes);
        return Some(prefixed);
    }
    Some(bytes)
}

fn utf8(ch: char) -> Vec<u8> {
    let mut buffer = [0u8; 4];
    ch.encode_utf8(&mut buffer).as_bytes().to_vec()
}

/// Ctrl+letter and Ctrl+@[\]^_ map to C0 control codes
fn control_char(ch: char) -> Option<u8> {
    match ch.to_ascii_lowercase() {
        c @ 'a'..='z' => Some(c as u8 - b'a' + 1),
        '@' | ' ' | '2' => Some(0x00),
        '[' | '3' => Some(0x1b),
        '\\' | '4' => Some(0x1c),
        ']' | '5' => Some(0x1d),
        '^' | '6' => Some(0x1e),
        '_' | '7' | '/' => Some(0x1f),
        _ => None,
    }
}

/// xterm modifier parameter: 1 + shift + 2*alt + 4*ctrl
fn modifier_param(modifiers: KeyModifiers) -> Option<u8> {
    let mut value = 1;
    if modifiers.contains(KeyModifiers::SHIFT) {
        value += 1;
    }
    if modifiers.contains(KeyModifiers::ALT) {
        value += 2;
    }
    if modifiers.contains(KeyModifiers::CONTROL) {
        value += 4;
    }
    (value > 1).then_some(value)
}

fn cursor_key(modifiers: KeyModifiers, final_byte: char) -> Vec<u8> {
    match modifier_param(modifiers) {
        Some(param) => format!("\x1b[1;{}{}", param, final_byte).into_bytes(),
        None => format!("\x1b[{}", final_byte).into_bytes(),
    }
}

fn tilde_key(modifiers: KeyModifiers, code: u8) -> Vec<u8> {
    match modifier_param(modifiers) {
        Some(param) => format!("\x1b[{};{}~", code, param).into_bytes(),
        None => format!("\x1b[{}~", code).into_bytes(),
    }
}

fn function_key(n: u8) -> Option<Vec<u8>> {
    let sequence = match n {
        1 => "\x1bOP",
        2 => "\x1bOQ",
        3 => "\x1bOR",
        4 => "\x1bOS",
        5 => "\x1b[15~",
        6 => "\x1b[17~",
        7 => "\x1b[18~",
        8 => "\x1b[19~",
        9 => "\x1b[20~",
        10 => "\x1b[21~",
        11 => "\x1b[23~",
        12 => "\x1b[24~",
        _ => return None,
    };
    Some(sequence.as_bytes().to_vec())
}
