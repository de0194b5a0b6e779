use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ClientError {
    /// Raised while building a client; no usable instance exists.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }

    /// Raised before any network I/O; the request was never sent.
    pub fn is_signing(&self) -> bool {
        matches!(self, Self::InvalidKeyFormat(_) | Self::SigningFailed(_))
    }

    /// Raised by the transport after the call was attempted.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::HttpError(_) | Self::NetworkError(_))
    }
}
