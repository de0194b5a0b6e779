use crate::core::errors::ClientError;
use crate::core::kernel::canonical::{canonical_json, canonicalize, is_empty_params};
use crate::core::kernel::encoding::build_query_string;
use ed25519_dalek::{
    Signature, Signer as Ed25519SignerTrait, SigningKey, Verifier, VerifyingKey, KEYPAIR_LENGTH,
};
use rand::rngs::OsRng;
use rand::RngCore;
use reqwest::Method;
use serde_json::Value;
use zeroize::Zeroizing;

pub const NONCE_HEADER: &str = "X-Api-Nonce";
pub const TIMESTAMP_HEADER: &str = "X-Api-Timestamp";
pub const SIGNATURE_HEADER: &str = "X-Api-Signature";

/// Separator between the message segment, nonce and timestamp.
pub const MESSAGE_SEPARATOR: char = '|';

const NONCE_BYTES: usize = 32;

/// Replay-protection values and the signature that binds them to one request.
///
/// The three headers travel together; there is no way to build a partial set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub nonce: String,
    pub timestamp: String,
    pub signature: String,
}

impl SignedHeaders {
    pub fn to_headers(&self) -> Vec<(String, String)> {
        vec![
            (NONCE_HEADER.to_string(), self.nonce.clone()),
            (TIMESTAMP_HEADER.to_string(), self.timestamp.clone()),
            (SIGNATURE_HEADER.to_string(), self.signature.clone()),
        ]
    }
}

/// Signer trait for request authentication
///
/// Implementations only produce a detached signature over message bytes;
/// message construction is shared so every signer agrees on the signed text.
pub trait Signer: Send + Sync {
    /// Sign raw message bytes and return the hex-encoded signature
    fn sign_message(&self, message: &[u8]) -> Result<String, ClientError>;

    /// Sign a request with a fresh nonce and the current timestamp
    fn sign_request(
        &self,
        method: &Method,
        endpoint: &str,
        params: &Value,
    ) -> Result<SignedHeaders, ClientError> {
        self.sign_request_with(method, endpoint, params, generate_nonce(), utc_timestamp())
    }

    /// Sign a request with caller-supplied replay-protection values
    fn sign_request_with(
        &self,
        method: &Method,
        endpoint: &str,
        params: &Value,
        nonce: String,
        timestamp: String,
    ) -> Result<SignedHeaders, ClientError> {
        let message = build_message(method, endpoint, params, &nonce, &timestamp)?;
        let signature = self.sign_message(message.as_bytes())?;
        Ok(SignedHeaders {
            nonce,
            timestamp,
            signature,
        })
    }
}

/// Ed25519 signer built from a hex-encoded 64-byte keypair (seed then public key)
pub struct Ed25519Signer {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("verifying_key", &self.verifying_key_hex())
            .finish_non_exhaustive()
    }
}

impl Ed25519Signer {
    /// Create a new Ed25519 signer from a hex-encoded keypair
    ///
    /// # Arguments
    /// * `signature_key` - 128 hex characters: 32-byte seed followed by its 32-byte public key
    pub fn from_hex(signature_key: &str) -> Result<Self, ClientError> {
        let key_bytes = Zeroizing::new(
            hex::decode(signature_key)
                .map_err(|e| ClientError::InvalidKeyFormat(format!("Key is not hex: {}", e)))?,
        );

        let keypair: Zeroizing<[u8; KEYPAIR_LENGTH]> = Zeroizing::new(
            key_bytes.as_slice().try_into().map_err(|_| {
                ClientError::InvalidKeyFormat(format!(
                    "Key must be {} bytes, got {}",
                    KEYPAIR_LENGTH,
                    key_bytes.len()
                ))
            })?,
        );

        let signing_key = SigningKey::from_keypair_bytes(&keypair)
            .map_err(|e| ClientError::SigningFailed(format!("Rejected keypair bytes: {}", e)))?;
        let verifying_key = signing_key.verifying_key();

        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Hex-encoded public half of the keypair
    pub fn verifying_key_hex(&self) -> String {
        hex::encode(self.verifying_key.to_bytes())
    }

    /// Check a hex-encoded signature against `message`
    pub fn verify(&self, message: &[u8], signature_hex: &str) -> bool {
        let Ok(bytes) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&bytes) else {
            return false;
        };
        self.verifying_key.verify(message, &signature).is_ok()
    }
}

impl Signer for Ed25519Signer {
    fn sign_message(&self, message: &[u8]) -> Result<String, ClientError> {
        let signature = Ed25519SignerTrait::try_sign(&self.signing_key, message)
            .map_err(|e| ClientError::SigningFailed(e.to_string()))?;
        Ok(hex::encode(signature.to_bytes()))
    }
}

/// Whether the verb carries its parameters in the request body
pub fn is_body_method(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Path used in the signable message: exactly one leading slash.
///
/// Absolute URLs contribute only their path component. Pass the path part
/// from `split_endpoint`; queries are handled by `request_query`.
pub fn signing_path(endpoint: &str) -> String {
    if is_absolute_url(endpoint) {
        if let Ok(url) = reqwest::Url::parse(endpoint) {
            return url.path().to_string();
        }
    }
    format!("/{}", endpoint.trim_start_matches('/'))
}

/// Split an endpoint into its path and query parts. A fragment is dropped.
pub fn split_endpoint(endpoint: &str) -> (&str, Option<&str>) {
    let endpoint = endpoint.split_once('#').map_or(endpoint, |(head, _)| head);
    match endpoint.split_once('?') {
        Some((path, query)) if !query.is_empty() => (path, Some(query)),
        Some((path, _)) => (path, None),
        None => (endpoint, None),
    }
}

/// Query string sent with a non-body verb
///
/// The endpoint's own query comes first, as written, followed by the canonical
/// query built from `params`. Both the URL and the signable message use it.
pub fn request_query(
    endpoint_query: Option<&str>,
    params: &Value,
) -> Result<Option<String>, ClientError> {
    let params_query = if is_empty_params(params) {
        String::new()
    } else {
        build_query_string(&canonicalize(params))?
    };

    Ok(match (endpoint_query, params_query.is_empty()) {
        (Some(query), true) => Some(query.to_string()),
        (Some(query), false) => Some(format!("{}&{}", query, params_query)),
        (None, false) => Some(params_query),
        (None, true) => None,
    })
}

pub(crate) fn is_absolute_url(endpoint: &str) -> bool {
    let lower = endpoint.get(..8).unwrap_or(endpoint).to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

/// Build the exact text that gets signed
///
/// Body verbs sign the canonical JSON of `params`; every other verb signs the
/// path plus the canonical query string. Nonce and timestamp follow, joined by `|`.
pub fn build_message(
    method: &Method,
    endpoint: &str,
    params: &Value,
    nonce: &str,
    timestamp: &str,
) -> Result<String, ClientError> {
    let segment = if is_body_method(method) {
        canonical_json(params)?
    } else {
        let (path, endpoint_query) = split_endpoint(endpoint);
        let path = signing_path(path);
        match request_query(endpoint_query, params)? {
            Some(query) => format!("{}?{}", path, query),
            None => path,
        }
    };

    Ok(format!(
        "{segment}{sep}{nonce}{sep}{timestamp}",
        sep = MESSAGE_SEPARATOR
    ))
}

/// Sign one request with an explicit hex keypair, nonce and timestamp
///
/// The key is validated before any message is built.
pub fn sign(
    method: &Method,
    endpoint: &str,
    params: &Value,
    nonce: &str,
    timestamp: &str,
    signature_key: &str,
) -> Result<String, ClientError> {
    let signer = Ed25519Signer::from_hex(signature_key)?;
    let message = build_message(method, endpoint, params, nonce, timestamp)?;
    signer.sign_message(message.as_bytes())
}

/// 32 random bytes from the operating system, hex encoded
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`
pub fn utc_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
