//! Core types for the Leizi terminal client
//!
//! This crate holds the session data model shared by the terminal core, the
//! backend API client and the console host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod config;
mod endpoint;
mod form;
mod shortcut;

pub use config::ConnectionConfig;
pub use endpoint::{BackendEndpoint, DEFAULT_BACKEND_URL};
pub use form::{ConnectionForm, FormError};
pub use shortcut::{SavedConnection, Shortcut};

// ============================================================================
// Constants
// ============================================================================

/// Default SSH port used when the form leaves the port blank
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default Telnet port used when the form leaves the port blank
pub const DEFAULT_TELNET_PORT: u16 = 23;

/// Baud rate the backend assumes when none is given
pub const DEFAULT_BAUDRATE: u32 = 9600;

// ============================================================================
// Session Types
// ============================================================================

/// Session ID type
pub type SessionId = Uuid;

/// Kind of remote connection a session carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Ssh,
    Telnet,
    Serial,
}

impl SessionKind {
    pub const ALL: [SessionKind; 3] = [SessionKind::Ssh, SessionKind::Telnet, SessionKind::Serial];

    /// Path segment of the backend WebSocket endpoint for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Ssh => "ssh",
            SessionKind::Telnet => "telnet",
            SessionKind::Serial => "serial",
        }
    }

    /// Port used when none is supplied; serial lines have no port
    pub fn default_port(&self) -> Option<u16> {
        match self {
            SessionKind::Ssh => Some(DEFAULT_SSH_PORT),
            SessionKind::Telnet => Some(DEFAULT_TELNET_PORT),
            SessionKind::Serial => None,
        }
    }

    /// Whether host and port are meaningful for this kind
    pub fn is_networked(&self) -> bool {
        !matches!(self, SessionKind::Serial)
    }
}

impl std::fmt::Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionKind {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ssh" => Ok(SessionKind::Ssh),
            "telnet" => Ok(SessionKind::Telnet),
            "serial" => Ok(SessionKind::Serial),
            _ => Err(FormError::UnknownKind(s.to_string())),
        }
    }
}

/// One logical remote connection, displayed as one tab
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: SessionId,
    pub title: String,
    pub kind: SessionKind,
    pub config: ConnectionConfig,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session with a fresh id and a title derived from kind and target
    pub fn new(kind: SessionKind, config: ConnectionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: derive_title(kind, &config),
            kind,
            config,
            created_at: Utc::now(),
        }
    }

    /// JSON handshake sent as the first message on the session's channel
    pub fn handshake(&self) -> String {
        self.config.handshake(self.kind)
    }
}

fn derive_title(kind: SessionKind, config: &ConnectionConfig) -> String {
    let target = match kind {
        SessionKind::Serial => config.device.as_deref(),
        SessionKind::Ssh | SessionKind::Telnet => config.host.as_deref(),
    };
    format!("{}://{}", kind, target.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in SessionKind::ALL {
            assert_eq!(kind.as_str().parse::<SessionKind>().unwrap(), kind);
        }
        assert_eq!("SSH".parse::<SessionKind>().unwrap(), SessionKind::Ssh);
        assert!("rdp".parse::<SessionKind>().is_err());
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SessionKind::Telnet).unwrap(), "\"telnet\"");
    }

    #[test]
    fn test_titles() {
        let ssh = Session::new(SessionKind::Ssh, ConnectionConfig::network("10.0.0.5", 22));
        assert_eq!(ssh.title, "ssh://10.0.0.5");

        let serial = Session::new(SessionKind::Serial, ConnectionConfig::serial("/dev/ttyUSB0"));
        assert_eq!(serial.title, "serial:///dev/ttyUSB0");
    }

    #[test]
    fn test_sessions_created_back_to_back_have_distinct_ids() {
        let a = Session::new(SessionKind::Telnet, ConnectionConfig::network("h", 23));
        let b = Session::new(SessionKind::Telnet, ConnectionConfig::network("h", 23));
        assert_ne!(a.id, b.id);
        assert_eq!(a.title, b.title);
    }
}
