//! New-session form validation
//!
//! The form collects everything as text, the way a dialog does, and turns it
//! into a typed `(SessionKind, ConnectionConfig)` pair. Invalid combinations
//! are rejected here so the session registry never sees them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ConnectionConfig, SessionKind};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown connection type '{0}' (expected ssh, telnet or serial)")]
    UnknownKind(String),
    #[error("a host is required for {0} sessions")]
    MissingHost(SessionKind),
    #[error("invalid port '{0}'")]
    InvalidPort(String),
    #[error("a serial device is required")]
    MissingDevice,
    #[error("invalid baud rate '{0}'")]
    InvalidBaudrate(String),
}

/// Raw connection parameters as entered by the user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionForm {
    pub kind: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub pkey: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub baudrate: String,
}

impl ConnectionForm {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Validate the form and produce the parameters for a new session.
    ///
    /// Fields that don't apply to the chosen kind are dropped.
    pub fn submit(&self) -> Result<(SessionKind, ConnectionConfig), FormError> {
        let kind: SessionKind = self.kind.parse()?;

        let config = match kind {
            SessionKind::Ssh | SessionKind::Telnet => {
                let host = non_empty(&self.host).ok_or(FormError::MissingHost(kind))?;
                let port = match non_empty(&self.port) {
                    Some(port) => parse_port(&port)?,
                    None => kind.default_port().unwrap_or_default(),
                };
                let mut config = ConnectionConfig::network(host, port);
                if kind == SessionKind::Ssh {
                    config.username = non_empty(&self.username);
                    config.password = verbatim(&self.password);
                    config.pkey = verbatim(&self.pkey);
                }
                config
            }
            SessionKind::Serial => {
                let device = non_empty(&self.device).ok_or(FormError::MissingDevice)?;
                let mut config = ConnectionConfig::serial(device);
                if let Some(baudrate) = non_empty(&self.baudrate) {
                    config.baudrate = Some(
                        baudrate
                            .parse::<u32>()
                            .ok()
                            .filter(|rate| *rate > 0)
                            .ok_or(FormError::InvalidBaudrate(baudrate))?,
                    );
                }
                config
            }
        };

        Ok((kind, config))
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Like `non_empty` but returns the value as typed
fn verbatim(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_port(value: &str) -> Result<u16, FormError> {
    value
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| FormError::InvalidPort(value.to_string()))
}
