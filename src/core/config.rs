use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;

/// Hex length of an API key (32 bytes).
pub const API_KEY_HEX_LEN: usize = 64;
/// Hex length of an Ed25519 keypair (32-byte seed followed by the 32-byte public key).
pub const SIGNATURE_KEY_HEX_LEN: usize = 128;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = "signet-rest/0.1";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub api_key: Secret<String>,
    pub signature_key: Option<Secret<String>>,
    pub verify_tls: bool,
    pub connect_timeout_secs: u64,
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for ClientConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("ClientConfig", 7)?;
        state.serialize_field("host", &self.host)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field(
            "signature_key",
            &self.signature_key.as_ref().map(|_| "[REDACTED]"),
        )?;
        state.serialize_field("verify_tls", &self.verify_tls)?;
        state.serialize_field("connect_timeout_secs", &self.connect_timeout_secs)?;
        state.serialize_field("timeout_secs", &self.timeout_secs)?;
        state.serialize_field("user_agent", &self.user_agent)?;
        state.end()
    }
}

// Custom Deserialize implementation - rejects malformed credentials up front
impl<'de> Deserialize<'de> for ClientConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ClientConfigHelper {
            host: String,
            api_key: String,
            signature_key: Option<String>,
            #[serde(default = "default_verify_tls")]
            verify_tls: bool,
            #[serde(default = "default_connect_timeout")]
            connect_timeout_secs: u64,
            #[serde(default)]
            timeout_secs: Option<u64>,
            #[serde(default = "default_user_agent")]
            user_agent: String,
        }

        let helper = ClientConfigHelper::deserialize(deserializer)?;
        let config = Self {
            host: helper.host,
            api_key: Secret::new(helper.api_key),
            signature_key: helper.signature_key.map(Secret::new),
            verify_tls: helper.verify_tls,
            connect_timeout_secs: helper.connect_timeout_secs,
            timeout_secs: helper.timeout_secs,
            user_agent: helper.user_agent,
        };
        config.validate().map_err(serde::de::Error::custom)?;
        Ok(config)
    }
}

const fn default_verify_tls() -> bool {
    true
}

const fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl ClientConfig {
    /// Create a new unsigned configuration
    ///
    /// Nothing is validated here; `validate` runs when a client is built.
    #[must_use]
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: Secret::new(api_key.into()),
            signature_key: None,
            verify_tls: true,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            timeout_secs: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_HOST` (e.g., `API_HOST`)
    /// - `{PREFIX}_API_KEY`
    /// - `{PREFIX}_SIGNATURE_KEY` (optional, enables signed requests)
    /// - `{PREFIX}_VERIFY_TLS` (optional, defaults to true)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let host_var = format!("{}_HOST", prefix);
        let api_key_var = format!("{}_API_KEY", prefix);
        let signature_key_var = format!("{}_SIGNATURE_KEY", prefix);
        let verify_tls_var = format!("{}_VERIFY_TLS", prefix);

        let host =
            env::var(&host_var).map_err(|_| ConfigError::MissingEnvironmentVariable(host_var))?;

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;

        let signature_key = env::var(&signature_key_var)
            .ok()
            .filter(|key| !key.is_empty());

        let verify_tls = match env::var(&verify_tls_var) {
            Ok(value) => value.trim().parse::<bool>().map_err(|_| {
                ConfigError::InvalidConfiguration(format!(
                    "{} must be true or false, got '{}'",
                    verify_tls_var, value
                ))
            })?,
            Err(_) => true,
        };

        let mut config = Self::new(host, api_key).verify_tls(verify_tls);
        if let Some(signature_key) = signature_key {
            config = config.with_signature_key(signature_key);
        }
        Ok(config)
    }

    /// Create configuration from .env file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    ///
    /// A missing file is not an error; the system environment is used instead.
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Enable signed requests with a hex-encoded Ed25519 keypair
    #[must_use]
    pub fn with_signature_key(mut self, signature_key: impl Into<String>) -> Self {
        self.signature_key = Some(Secret::new(signature_key.into()));
        self
    }

    /// Toggle TLS peer verification
    #[must_use]
    pub const fn verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Disable TLS certificate and hostname verification.
    ///
    /// **Unsafe**: only for tests against self-signed endpoints.
    #[must_use]
    pub const fn danger_accept_invalid_certs(self) -> Self {
        self.verify_tls(false)
    }

    #[must_use]
    pub const fn connect_timeout(mut self, seconds: u64) -> Self {
        self.connect_timeout_secs = seconds;
        self
    }

    #[must_use]
    pub const fn timeout(mut self, seconds: u64) -> Self {
        self.timeout_secs = Some(seconds);
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Whether requests from this configuration carry signature headers
    pub fn is_signing(&self) -> bool {
        self.signature_key.is_some()
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get signature key (use carefully - exposes secret)
    pub fn signature_key(&self) -> Option<&str> {
        self.signature_key
            .as_ref()
            .map(|key| key.expose_secret().as_str())
    }

    /// Host with any trailing slash removed
    pub fn base_url(&self) -> &str {
        self.host.trim().trim_end_matches('/')
    }

    /// Check host and credential formats
    pub fn validate(&self) -> Result<(), ConfigError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        let url = reqwest::Url::parse(host).map_err(|e| {
            ConfigError::InvalidConfiguration(format!("Invalid host '{}': {}", host, e))
        })?;
        if url.scheme() != "https" {
            return Err(ConfigError::InsecureHost(host.to_string()));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::InvalidConfiguration(format!(
                "Host '{}' has no hostname",
                host
            )));
        }

        if !is_hex_of_len(self.api_key(), API_KEY_HEX_LEN) {
            return Err(ConfigError::InvalidApiKey);
        }

        if let Some(signature_key) = self.signature_key() {
            if !is_hex_of_len(signature_key, SIGNATURE_KEY_HEX_LEN) {
                return Err(ConfigError::InvalidSignatureKey);
            }
        }

        Ok(())
    }
}

fn is_hex_of_len(value: &str, len: usize) -> bool {
    value.len() == len && value.bytes().all(|b| b.is_ascii_hexdigit())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Host must not be empty")]
    EmptyHost,

    #[error("Host must use https: {0}")]
    InsecureHost(String),

    #[error("API key must be exactly {API_KEY_HEX_LEN} hex characters")]
    InvalidApiKey,

    #[error("Signature key must be exactly {SIGNATURE_KEY_HEX_LEN} hex characters")]
    InvalidSignatureKey,
}
