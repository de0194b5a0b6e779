pub mod builder;

pub use builder::ApiClientBuilder;

use crate::core::config::ClientConfig;
use crate::core::debug::{DebugReport, DebugSession};
use crate::core::errors::ClientError;
use crate::core::kernel::canonical::{canonical_json, canonicalize};
use crate::core::kernel::encoding::{flatten_params, form_encode, raw_url_encode};
use crate::core::kernel::rest::{ReqwestTransport, Transport, TransportConfig};
use crate::core::kernel::signer::{
    is_absolute_url, is_body_method, request_query, split_endpoint, Ed25519Signer, Signer,
};
use crate::core::types::{ApiResponse, BodyEncoding, SentRequest, TransportRequest};
use reqwest::Method;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};

/// Client for one API host and one credential pair
///
/// Every call returns its own `ApiResponse`. The client additionally keeps a
/// snapshot of the most recent request and response for convenience; with
/// concurrent calls on one instance those snapshots reflect whichever call
/// finished last, while the returned values are always accurate.
pub struct ApiClient<T: Transport = ReqwestTransport> {
    config: ClientConfig,
    transport: T,
    signer: Option<Arc<dyn Signer>>,
    debug: DebugSession,
    last_request: Mutex<Option<SentRequest>>,
    last_response: Mutex<Option<ApiResponse>>,
}

impl<T: Transport> std::fmt::Debug for ApiClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("host", &self.config.base_url())
            .field("signing", &self.signer.is_some())
            .field("debug_active", &self.debug.is_active())
            .finish_non_exhaustive()
    }
}

impl ApiClient<ReqwestTransport> {
    /// Validate `config` and build a client backed by reqwest
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;

        if !config.verify_tls {
            warn!(host = %config.base_url(), "TLS peer verification is disabled");
        }

        let transport = ReqwestTransport::new(
            TransportConfig::default()
                .with_connect_timeout(config.connect_timeout_secs)
                .with_timeout(config.timeout_secs)
                .with_user_agent(config.user_agent.clone())
                .with_verify_tls(config.verify_tls),
        )?;

        Self::with_transport(config, transport)
    }

    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::new()
    }
}

impl<T: Transport> ApiClient<T> {
    /// Validate `config` and build a client on top of any transport
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ClientError> {
        config.validate()?;

        let signer: Option<Arc<dyn Signer>> = match config.signature_key() {
            Some(key) => Some(Arc::new(Ed25519Signer::from_hex(key)?)),
            None => None,
        };

        debug!(
            host = %config.base_url(),
            signing = signer.is_some(),
            "api client created"
        );

        Ok(Self {
            config,
            transport,
            signer,
            debug: DebugSession::new(),
            last_request: Mutex::new(None),
            last_response: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_signing(&self) -> bool {
        self.signer.is_some()
    }

    /// Full URL for `endpoint`; absolute URLs are used as given
    pub fn build_url(&self, endpoint: &str) -> String {
        if is_absolute_url(endpoint) {
            endpoint.to_string()
        } else {
            format!(
                "{}/{}",
                self.config.base_url(),
                endpoint.trim_start_matches('/')
            )
        }
    }

    /// Absolute endpoints must use https unless TLS verification was explicitly disabled
    fn check_endpoint_scheme(&self, endpoint: &str) -> Result<(), ClientError> {
        let secure = endpoint
            .get(..8)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"));
        if is_absolute_url(endpoint) && !secure && self.config.verify_tls {
            return Err(ClientError::InvalidParameters(format!(
                "Endpoint must use https: {}",
                endpoint
            )));
        }
        Ok(())
    }

    /// Issue one request
    ///
    /// Body-bearing verbs (POST, PUT, PATCH) send `params` in the body using
    /// `encoding`; other verbs append them as a canonical query string after
    /// any query already present in `endpoint`. Absolute `http://` endpoints
    /// are rejected unless TLS verification is disabled.
    /// Signing errors abort before anything is sent. Transport errors are
    /// returned as-is and nothing is retried.
    #[instrument(
        skip(self, params),
        fields(method = %method, endpoint = %endpoint, signed = self.signer.is_some())
    )]
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        params: Option<&Value>,
        encoding: BodyEncoding,
    ) -> Result<ApiResponse, ClientError> {
        let has_body = is_body_method(&method);
        let params = match params {
            Some(value) => canonicalize(value),
            None if has_body => Value::Object(Map::new()),
            None => Value::Null,
        };

        self.check_endpoint_scheme(endpoint)?;

        let (url, payload) = if has_body {
            let payload = match encoding {
                BodyEncoding::Json => canonical_json(&params)?,
                BodyEncoding::Form => form_encode(&flatten_params(&params)?),
                BodyEncoding::Http => raw_url_encode(&flatten_params(&params)?),
            };
            (self.build_url(endpoint), Some(payload))
        } else {
            let (path, endpoint_query) = split_endpoint(endpoint);
            let url = match request_query(endpoint_query, &params)? {
                Some(query) => format!("{}?{}", self.build_url(path), query),
                None => self.build_url(path),
            };
            (url, None)
        };

        let mut headers = vec![(
            "Authorization".to_string(),
            format!("Bearer {}", self.config.api_key()),
        )];
        if encoding == BodyEncoding::Json || has_body {
            headers.push(("Content-Type".to_string(), encoding.content_type().to_string()));
        }
        if let Some(signer) = &self.signer {
            let signed = signer.sign_request(&method, endpoint, &params)?;
            headers.extend(signed.to_headers());
        }

        let sent = SentRequest {
            method: method.as_str().to_string(),
            endpoint: endpoint.to_string(),
            url: url.clone(),
            headers: headers.clone(),
            payload: payload.clone(),
        };
        *lock(&self.last_request) = Some(sent.clone());

        let outcome = self
            .transport
            .execute(TransportRequest {
                method,
                url,
                headers,
                body: payload,
            })
            .await;

        match outcome {
            Ok(response) => {
                let response = ApiResponse::new(sent, response);
                debug!(
                    status = response.status,
                    elapsed = response.metadata.total_time,
                    "request completed"
                );
                self.debug.record_request(
                    response.metadata.total_time,
                    &response.metadata.effective_url,
                );
                *lock(&self.last_response) = Some(response.clone());
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, "transport failed");
                *lock(&self.last_response) = None;
                Err(e)
            }
        }
    }

    pub async fn get(
        &self,
        endpoint: &str,
        params: Option<&Value>,
    ) -> Result<ApiResponse, ClientError> {
        self.request(Method::GET, endpoint, params, BodyEncoding::Json)
            .await
    }

    pub async fn delete(
        &self,
        endpoint: &str,
        params: Option<&Value>,
    ) -> Result<ApiResponse, ClientError> {
        self.request(Method::DELETE, endpoint, params, BodyEncoding::Json)
            .await
    }

    pub async fn post(&self, endpoint: &str, params: &Value) -> Result<ApiResponse, ClientError> {
        self.request(Method::POST, endpoint, Some(params), BodyEncoding::Json)
            .await
    }

    pub async fn put(&self, endpoint: &str, params: &Value) -> Result<ApiResponse, ClientError> {
        self.request(Method::PUT, endpoint, Some(params), BodyEncoding::Json)
            .await
    }

    pub async fn patch(&self, endpoint: &str, params: &Value) -> Result<ApiResponse, ClientError> {
        self.request(Method::PATCH, endpoint, Some(params), BodyEncoding::Json)
            .await
    }

    /// The request most recently handed to the transport
    pub fn last_request(&self) -> Option<SentRequest> {
        lock(&self.last_request).clone()
    }

    /// The most recent successful response; cleared by a transport failure
    pub fn last_response(&self) -> Option<ApiResponse> {
        lock(&self.last_response).clone()
    }

    pub fn debug_start(&self) {
        self.debug.start();
    }

    pub fn debug_stop(&self) {
        self.debug.stop();
    }

    pub fn debug_reset(&self) {
        self.debug.reset();
    }

    pub fn debug_report(&self) -> DebugReport {
        self.debug.report()
    }

    pub fn debug_session(&self) -> &DebugSession {
        &self.debug
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
