//! Saved connections
//!
//! A shortcut remembers everything needed to reopen a session except the
//! password, which is supplied again when the shortcut is opened.

use serde::{Deserialize, Serialize};

use crate::{ConnectionConfig, ConnectionForm, FormError, SessionKind};

/// Connection parameters as stored in the config file or the backend's
/// shortcut store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConnection {
    pub kind: SessionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baudrate: Option<u32>,
}

impl SavedConnection {
    /// Remember a session's parameters, leaving out the password
    pub fn from_config(kind: SessionKind, config: &ConnectionConfig) -> Self {
        Self {
            kind,
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            pkey: config.pkey.clone(),
            device: config.device.clone(),
            baudrate: config.baudrate,
        }
    }

    /// Fill a new-session form from the saved fields
    pub fn to_form(&self, password: Option<&str>) -> ConnectionForm {
        ConnectionForm {
            kind: self.kind.as_str().to_string(),
            host: self.host.clone().unwrap_or_default(),
            port: self.port.map(|p| p.to_string()).unwrap_or_default(),
            username: self.username.clone().unwrap_or_default(),
            password: password.unwrap_or_default().to_string(),
            pkey: self.pkey.clone().unwrap_or_default(),
            device: self.device.clone().unwrap_or_default(),
            baudrate: self.baudrate.map(|b| b.to_string()).unwrap_or_default(),
        }
    }

    /// Validate and produce the parameters for a new session
    pub fn open(&self, password: Option<&str>) -> Result<(SessionKind, ConnectionConfig), FormError> {
        self.to_form(password).submit()
    }
}

/// Named saved connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortcut {
    pub name: String,
    #[serde(flatten)]
    pub connection: SavedConnection,
}
