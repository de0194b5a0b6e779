use crate::core::config::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::core::errors::ClientError;
use crate::core::types::{TransportMetadata, TransportRequest, TransportResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{instrument, trace};

/// Transport trait for executing one HTTP request
///
/// The orchestrator builds the URL, headers and body; the transport only puts
/// them on the wire and reports what came back. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute the request and return status, headers, body and timing
    ///
    /// Connection, TLS and protocol failures are returned as errors. HTTP
    /// error statuses are not errors at this layer.
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, ClientError>;
}

/// Configuration for the reqwest transport
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Connect timeout in seconds
    pub connect_timeout_seconds: u64,
    /// Overall request timeout in seconds, none by default
    pub timeout_seconds: Option<u64>,
    /// User agent string to include in requests
    pub user_agent: String,
    /// Verify the TLS peer certificate and hostname
    pub verify_tls: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: DEFAULT_CONNECT_TIMEOUT_SECS,
            timeout_seconds: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verify_tls: true,
        }
    }
}

impl TransportConfig {
    pub fn with_connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout_seconds = seconds;
        self
    }

    pub fn with_timeout(mut self, seconds: Option<u64>) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    /// Setting this to false disables certificate checks. Test use only.
    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }
}

/// Builder for creating transport instances
pub struct TransportBuilder {
    config: TransportConfig,
}

impl TransportBuilder {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Build the reqwest transport
    pub fn build(self) -> Result<ReqwestTransport, ClientError> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(self.config.connect_timeout_seconds))
            .user_agent(&self.config.user_agent)
            .danger_accept_invalid_certs(!self.config.verify_tls);

        if let Some(timeout) = self.config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        let client = builder.build().map_err(|e| {
            ClientError::NetworkError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(ReqwestTransport {
            client,
            config: self.config,
        })
    }
}

/// Implementation of `Transport` using reqwest
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    config: TransportConfig,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> Result<Self, ClientError> {
        TransportBuilder::new(config).build()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, ClientError> {
        let mut builder = self.client.request(request.method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let started = Instant::now();
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let effective_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let body = response.text().await.map_err(|e| {
            ClientError::NetworkError(format!("Failed to read response body: {}", e))
        })?;
        let total_time = started.elapsed().as_secs_f64();

        trace!(status, total_time, "Response body: {}", body);

        Ok(TransportResponse {
            status,
            headers,
            body,
            metadata: TransportMetadata {
                http_code: status,
                total_time,
                effective_url,
            },
        })
    }
}
