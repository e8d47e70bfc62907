//! REST client for the Leizi backend
//!
//! Sessions themselves run over WebSockets (see `leizi-terminal`); this crate
//! covers the backend's plain HTTP endpoints: serial port discovery, SFTP
//! directory listing and the remote config and shortcut stores.

mod client;
mod error;

pub use client::{BackendClient, SftpListRequest};
pub use error::ApiError;
