use crate::SessionKind;

/// Backend address used when nothing is configured
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Base address of the backend service
///
/// REST endpoints live under `/api`, session sockets under `/ws/<kind>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    base_url: String,
}

impl BackendEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        // Ensure base_url doesn't end with a slash
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of a REST endpoint, e.g. `api_url("/api/serial/ports")`
    pub fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// WebSocket URL of the session endpoint for `kind`
    pub fn ws_url(&self, kind: SessionKind) -> String {
        let base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else if self.base_url.starts_with("ws://") || self.base_url.starts_with("wss://") {
            self.base_url.clone()
        } else {
            format!("ws://{}", self.base_url)
        };
        format!("{}/ws/{}", base, kind.as_str())
    }
}

impl Default for BackendEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL)
    }
}
