use crate::client::ApiClient;
use crate::core::config::ClientConfig;
use crate::core::errors::ClientError;
use crate::core::kernel::rest::{ReqwestTransport, Transport};

/// Step-by-step construction of an `ApiClient`
///
/// Validation happens once, in `build`; a failed build never yields a client.
#[derive(Debug, Default)]
pub struct ApiClientBuilder {
    host: String,
    api_key: String,
    signature_key: Option<String>,
    verify_tls: Option<bool>,
    connect_timeout_secs: Option<u64>,
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn signature_key(mut self, signature_key: impl Into<String>) -> Self {
        self.signature_key = Some(signature_key.into());
        self
    }

    /// Disable TLS peer verification. Unsafe outside of tests.
    pub fn danger_accept_invalid_certs(mut self) -> Self {
        self.verify_tls = Some(false);
        self
    }

    pub fn connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout_secs = Some(seconds);
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = Some(seconds);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Assemble the configuration without validating it
    pub fn into_config(self) -> ClientConfig {
        let mut config = ClientConfig::new(self.host, self.api_key);
        if let Some(key) = self.signature_key {
            config = config.with_signature_key(key);
        }
        if let Some(verify) = self.verify_tls {
            config = config.verify_tls(verify);
        }
        if let Some(seconds) = self.connect_timeout_secs {
            config = config.connect_timeout(seconds);
        }
        if let Some(seconds) = self.timeout_secs {
            config = config.timeout(seconds);
        }
        if let Some(user_agent) = self.user_agent {
            config = config.user_agent(user_agent);
        }
        config
    }

    pub fn build(self) -> Result<ApiClient<ReqwestTransport>, ClientError> {
        ApiClient::new(self.into_config())
    }

    pub fn build_with_transport<T: Transport>(
        self,
        transport: T,
    ) -> Result<ApiClient<T>, ClientError> {
        ApiClient::with_transport(self.into_config(), transport)
    }
}
