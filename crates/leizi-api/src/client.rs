use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use leizi_types::{BackendEndpoint, ConnectionConfig, SavedConnection, DEFAULT_SSH_PORT};

use crate::ApiError;

/// Directory listing request for `POST /api/sftp/list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SftpListRequest {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pkey: Option<String>,
    pub path: String,
}

impl SftpListRequest {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SSH_PORT,
            username: None,
            password: None,
            pkey: None,
            path: ".".to_string(),
        }
    }

    /// Reuse an SSH session's credentials to list `path`
    pub fn for_connection(config: &ConnectionConfig, path: impl Into<String>) -> Self {
        Self {
            host: config.host.clone().unwrap_or_default(),
            port: config.port.unwrap_or(DEFAULT_SSH_PORT),
            username: config.username.clone(),
            password: config.password.clone(),
            pkey: config.pkey.clone(),
            path: path.into(),
        }
    }
}

#[derive(Deserialize)]
struct PortsReply {
    ports: Vec<String>,
}

#[derive(Deserialize)]
struct FilesReply {
    files: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: String,
}

#[derive(Deserialize)]
struct StatusReply {
    status: String,
}

/// Client for the backend's REST endpoints
#[derive(Debug, Clone)]
pub struct BackendClient {
    endpoint: BackendEndpoint,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(endpoint: BackendEndpoint) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &BackendEndpoint {
        &self.endpoint
    }

    /// Serial devices the backend can open
    pub async fn serial_ports(&self) -> Result<Vec<String>, ApiError> {
        let reply: PortsReply = self.get("/api/serial/ports").await?;
        Ok(reply.ports)
    }

    /// List a remote directory over SFTP
    pub async fn sftp_list(&self, request: &SftpListRequest) -> Result<Vec<String>, ApiError> {
        log::debug!("Listing {}:{} on {}", request.host, request.path, request.port);
        let reply: FilesReply = self.post("/api/sftp/list", request).await?;
        Ok(reply.files)
    }

    /// Config document stored on the backend; empty when none was saved
    pub async fn remote_config(&self) -> Result<serde_json::Value, ApiError> {
        self.get("/api/config").await
    }

    pub async fn save_remote_config(&self, config: &serde_json::Value) -> Result<(), ApiError> {
        let path = "/api/config";
        let reply: StatusReply = self.post(path, config).await?;
        self.expect_ok(path, reply)
    }

    /// Shortcuts stored on the backend, by name
    pub async fn remote_shortcuts(&self) -> Result<BTreeMap<String, SavedConnection>, ApiError> {
        self.get("/api/shortcut").await
    }

    pub async fn save_remote_shortcuts(
        &self,
        shortcuts: &BTreeMap<String, SavedConnection>,
    ) -> Result<(), ApiError> {
        let path = "/api/shortcut";
        let reply: StatusReply = self.post(path, shortcuts).await?;
        self.expect_ok(path, reply)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.endpoint.api_url(path);
        log::debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        Self::decode(&url, response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let url = self.endpoint.api_url(path);
        log::debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        Self::decode(&url, response).await
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // The backend reports failures as {"error": "..."}
            let message = serde_json::from_str::<ErrorReply>(&body)
                .map(|reply| reply.error)
                .unwrap_or(body);
            log::warn!("{} returned {}: {}", url, status, message);
            return Err(ApiError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode {
            endpoint: url.to_string(),
            message: e.to_string(),
        })
    }

    fn expect_ok(&self, path: &str, reply: StatusReply) -> Result<(), ApiError> {
        if reply.status == "ok" {
            Ok(())
        } else {
            Err(ApiError::Decode {
                endpoint: self.endpoint.api_url(path),
                message: format!("status '{}'", reply.status),
            })
        }
    }
}
