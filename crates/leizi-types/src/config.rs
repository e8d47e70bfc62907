use serde::{Deserialize, Serialize};

use crate::SessionKind;

/// Connection parameters collected for a session
///
/// Which fields matter depends on the session kind: serial ignores host,
/// port and credentials; telnet ignores credentials; ssh may use a password
/// or a private key.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Private key material or a path to it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkey: Option<String>,
    /// Serial device, e.g. `/dev/ttyUSB0` or `COM3`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baudrate: Option<u32>,
}

impl ConnectionConfig {
    /// Config for a networked (ssh/telnet) target
    pub fn network(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            ..Self::default()
        }
    }

    /// Config for a serial line
    pub fn serial(device: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
            ..Self::default()
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_pkey(mut self, pkey: impl Into<String>) -> Self {
        self.pkey = Some(pkey.into());
        self
    }

    pub fn with_baudrate(mut self, baudrate: u32) -> Self {
        self.baudrate = Some(baudrate);
        self
    }

    /// Serialize the handshake message the backend expects for `kind`.
    ///
    /// ssh/telnet send `host`, `port`, `username`, `password`, `pkey` in that
    /// order with absent fields omitted. The serial endpoint reads the device
    /// from `port` and the line speed from `baudrate`.
    pub fn handshake(&self, kind: SessionKind) -> String {
        let result = match kind {
            SessionKind::Ssh | SessionKind::Telnet => serde_json::to_string(&NetworkHandshake {
                host: self.host.as_deref(),
                port: self.port,
                username: self.username.as_deref(),
                password: self.password.as_deref(),
                pkey: self.pkey.as_deref(),
            }),
            SessionKind::Serial => serde_json::to_string(&SerialHandshake {
                port: self.device.as_deref(),
                baudrate: self.baudrate,
            }),
        };
        // Serializing plain strings and integers cannot fail
        result.unwrap_or_else(|_| "{}".to_string())
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("pkey", &self.pkey.as_ref().map(|_| "<redacted>"))
            .field("device", &self.device)
            .field("baudrate", &self.baudrate)
            .finish()
    }
}

#[derive(Serialize)]
struct NetworkHandshake<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pkey: Option<&'a str>,
}

#[derive(Serialize)]
struct SerialHandshake<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    baudrate: Option<u32>,
}
