//! Leizi console client
//!
//! Command-line entry points and the full-screen console host that drives
//! terminal sessions through the backend.

// Re-export workspace crates
pub use leizi_api as api;
pub use leizi_terminal as terminal;
pub use leizi_types as types;

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;

pub use app::{run, AppContext, ConsoleHost};
pub use cli::{Cli, Commands, ConnectArgs, ShortcutCommands};
pub use config::{default_config_path, get_leizi_dir, ClientConfig};
