use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with an error status
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// The response body was not what the endpoint promises
    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl ApiError {
    /// HTTP status of a backend error response, if that's what this is
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}
