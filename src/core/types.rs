use crate::core::errors::ClientError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How parameters of a body-bearing request are put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    /// Canonical JSON, `Content-Type: application/json`
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`, spaces as `+`
    Form,
    /// Raw RFC 3986 url-encoding, spaces as `%20`
    Http,
}

impl BodyEncoding {
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Form | Self::Http => "application/x-www-form-urlencoded",
        }
    }
}

impl std::str::FromStr for BodyEncoding {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "form" => Ok(Self::Form),
            "http" => Ok(Self::Http),
            other => Err(ClientError::InvalidParameters(format!(
                "Unknown body encoding: {}",
                other
            ))),
        }
    }
}

/// A fully built request handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// What the transport observed while executing a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportMetadata {
    pub http_code: u16,
    /// Wall time from send to the last body byte, in seconds
    pub total_time: f64,
    /// URL after redirects
    pub effective_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub metadata: TransportMetadata,
}

/// Snapshot of the request exactly as it was sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentRequest {
    pub method: String,
    pub endpoint: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub payload: Option<String>,
}

impl SentRequest {
    /// First header with this name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "method": self.method,
            "endpoint": self.endpoint,
            "url": self.url,
            "headers": headers_to_value(&self.headers),
            "payload": self.payload,
        })
    }

    pub fn to_json_string(&self) -> String {
        self.to_value().to_string()
    }
}

/// One response, owned by the caller that issued the request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub request: SentRequest,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub metadata: TransportMetadata,
}

impl ApiResponse {
    pub(crate) fn new(request: SentRequest, response: TransportResponse) -> Self {
        Self {
            request,
            status: response.status,
            headers: response.headers,
            body: response.body,
            metadata: response.metadata,
        }
    }

    pub const fn status_code(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Raw body text
    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn json(&self) -> Result<Value, ClientError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// `status` field of the JSON envelope
    pub fn api_status(&self) -> Option<Value> {
        self.envelope_field("status")
    }

    /// `data` field of the JSON envelope
    pub fn data(&self) -> Option<Value> {
        self.envelope_field("data")
    }

    /// `messages` field of the JSON envelope
    pub fn messages(&self) -> Option<Value> {
        self.envelope_field("messages")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub const fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }

    fn envelope_field(&self, field: &str) -> Option<Value> {
        match self.json().ok()? {
            Value::Object(mut map) => map.remove(field),
            _ => None,
        }
    }
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn headers_to_value(headers: &[(String, String)]) -> Value {
    let mut map = serde_json::Map::new();
    for (key, value) in headers {
        map.insert(key.clone(), Value::String(value.clone()));
    }
    Value::Object(map)
}
