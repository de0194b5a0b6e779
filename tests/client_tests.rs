use async_trait::async_trait;
use ed25519_dalek::SigningKey;
use reqwest::Method;
use serde_json::{json, Value};
use signet_rest::core::kernel::{build_message, Ed25519Signer};
use signet_rest::{
    ApiClient, BodyEncoding, ClientConfig, ClientError, TransportMetadata, TransportRequest,
    TransportResponse,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const HOST: &str = "https://api.example.com";

/// In-memory transport that records every request and echoes the body back
#[derive(Clone, Default)]
struct RecordingTransport {
    requests: Arc<Mutex<Vec<TransportRequest>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingTransport {
    fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn last(&self) -> TransportRequest {
        self.requests().last().cloned().expect("no request recorded")
    }

    fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl signet_rest::core::kernel::Transport for RecordingTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::NetworkError("connection refused".to_string()));
        }

        let echoed = request
            .body
            .as_deref()
            .and_then(|body| serde_json::from_str::<Value>(body).ok())
            .unwrap_or(Value::Null);

        Ok(TransportResponse {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: json!({"status": "ok", "data": echoed, "messages": []}).to_string(),
            metadata: TransportMetadata {
                http_code: 200,
                total_time: 0.125,
                effective_url: request.url.clone(),
            },
        })
    }
}

fn api_key() -> String {
    "a1".repeat(32)
}

fn signature_key() -> String {
    hex::encode(SigningKey::from_bytes(&[42; 32]).to_keypair_bytes())
}

fn unsigned_client() -> (ApiClient<RecordingTransport>, RecordingTransport) {
    let transport = RecordingTransport::default();
    let client =
        ApiClient::with_transport(ClientConfig::new(HOST, api_key()), transport.clone()).unwrap();
    (client, transport)
}

fn signed_client() -> (ApiClient<RecordingTransport>, RecordingTransport) {
    let transport = RecordingTransport::default();
    let config = ClientConfig::new(HOST, api_key()).with_signature_key(signature_key());
    let client = ApiClient::with_transport(config, transport.clone()).unwrap();
    (client, transport)
}

fn header_count(request: &TransportRequest, name: &str) -> usize {
    request
        .headers
        .iter()
        .filter(|(key, _)| key.eq_ignore_ascii_case(name))
        .count()
}

fn header<'a>(request: &'a TransportRequest, name: &str) -> &'a str {
    request
        .headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
        .unwrap_or_else(|| panic!("missing header {}", name))
}

fn is_iso_second_timestamp(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 20
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b'T',
            13 | 16 => *b == b':',
            19 => *b == b'Z',
            _ => b.is_ascii_digit(),
        })
}

#[cfg(test)]
mod client_tests {
    use super::*;

    #[tokio::test]
    async fn test_unsigned_post_sends_plain_json() {
        let (client, transport) = unsigned_client();

        let response = client
            .request(
                Method::POST,
                "/api/v1/mirror",
                Some(&json!({"foo": "Bar"})),
                BodyEncoding::Json,
            )
            .await
            .unwrap();

        let sent = transport.last();
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.url, "https://api.example.com/api/v1/mirror");
        assert_eq!(sent.body.as_deref(), Some(r#"{"foo":"Bar"}"#));
        assert_eq!(header(&sent, "Authorization"), format!("Bearer {}", api_key()));
        assert_eq!(header(&sent, "Content-Type"), "application/json");
        assert_eq!(header_count(&sent, "X-Api-Signature"), 0);
        assert_eq!(header_count(&sent, "X-Api-Nonce"), 0);
        assert_eq!(header_count(&sent, "X-Api-Timestamp"), 0);

        assert_eq!(response.data(), Some(json!({"foo": "Bar"})));
        assert_eq!(response.api_status(), Some(json!("ok")));
    }

    #[tokio::test]
    async fn test_signed_post_attaches_verifiable_headers() {
        let (client, transport) = signed_client();
        let params = json!({"foo": "Bar"});

        client.post("/api/v1/mirror", &params).await.unwrap();

        let sent = transport.last();
        assert_eq!(header_count(&sent, "X-Api-Signature"), 1);
        assert_eq!(header_count(&sent, "X-Api-Nonce"), 1);
        assert_eq!(header_count(&sent, "X-Api-Timestamp"), 1);

        let nonce = header(&sent, "X-Api-Nonce");
        let timestamp = header(&sent, "X-Api-Timestamp");
        let signature = header(&sent, "X-Api-Signature");
        assert_eq!(nonce.len(), 64);
        assert!(nonce.bytes().all(|b| b.is_ascii_hexdigit()));
        assert!(is_iso_second_timestamp(timestamp), "bad timestamp {}", timestamp);
        assert_eq!(signature.len(), 128);

        let message =
            build_message(&Method::POST, "/api/v1/mirror", &params, nonce, timestamp).unwrap();
        let verifier = Ed25519Signer::from_hex(&signature_key()).unwrap();
        assert!(verifier.verify(message.as_bytes(), signature));
    }

    #[tokio::test]
    async fn test_signed_get_signs_canonical_query() {
        let (client, transport) = signed_client();

        client
            .get("/search", Some(&json!({"b": "2", "a": "1"})))
            .await
            .unwrap();

        let sent = transport.last();
        assert_eq!(sent.url, "https://api.example.com/search?a=1&b=2");
        assert!(sent.body.is_none());

        let nonce = header(&sent, "X-Api-Nonce");
        let timestamp = header(&sent, "X-Api-Timestamp");
        let expected = format!("/search?a=1&b=2|{}|{}", nonce, timestamp);

        let verifier = Ed25519Signer::from_hex(&signature_key()).unwrap();
        assert!(verifier.verify(expected.as_bytes(), header(&sent, "X-Api-Signature")));
    }

    #[tokio::test]
    async fn test_endpoint_query_is_signed_as_sent() {
        let (client, transport) = signed_client();
        let verifier = Ed25519Signer::from_hex(&signature_key()).unwrap();

        client
            .get("/search?x=9", Some(&json!({"a": "1"})))
            .await
            .unwrap();
        let sent = transport.last();
        assert_eq!(sent.url, "https://api.example.com/search?x=9&a=1");
        let expected = format!(
            "/search?x=9&a=1|{}|{}",
            header(&sent, "X-Api-Nonce"),
            header(&sent, "X-Api-Timestamp")
        );
        assert!(verifier.verify(expected.as_bytes(), header(&sent, "X-Api-Signature")));

        client
            .get("https://mirror.example.com/v2/search?x=9", None)
            .await
            .unwrap();
        let sent = transport.last();
        assert_eq!(sent.url, "https://mirror.example.com/v2/search?x=9");
        let expected = format!(
            "/v2/search?x=9|{}|{}",
            header(&sent, "X-Api-Nonce"),
            header(&sent, "X-Api-Timestamp")
        );
        assert!(verifier.verify(expected.as_bytes(), header(&sent, "X-Api-Signature")));
    }

    #[tokio::test]
    async fn test_cleartext_absolute_endpoint_is_rejected() {
        let (client, transport) = signed_client();
        let err = client
            .get("http://other.example.net/x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameters(_)));
        assert!(transport.requests().is_empty());
        assert!(client.last_request().is_none());

        let err = client
            .post("HTTP://other.example.net/x", &json!({"a": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameters(_)));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_cleartext_absolute_endpoint_allowed_without_tls_verification() {
        let transport = RecordingTransport::default();
        let config = ClientConfig::new(HOST, api_key()).danger_accept_invalid_certs();
        let client = ApiClient::with_transport(config, transport.clone()).unwrap();

        client.get("http://127.0.0.1:8080/x", None).await.unwrap();
        assert_eq!(transport.last().url, "http://127.0.0.1:8080/x");
    }

    #[tokio::test]
    async fn test_form_body_is_signed_over_canonical_json() {
        let (client, transport) = signed_client();
        let params = json!({"name": "a b", "id": 3});

        client
            .request(Method::PUT, "/items/3", Some(&params), BodyEncoding::Form)
            .await
            .unwrap();
        let sent = transport.last();
        assert_eq!(sent.body.as_deref(), Some("id=3&name=a+b"));

        let message = build_message(
            &Method::PUT,
            "/items/3",
            &params,
            header(&sent, "X-Api-Nonce"),
            header(&sent, "X-Api-Timestamp"),
        )
        .unwrap();
        assert!(message.starts_with(r#"{"id":3,"name":"a b"}|"#));

        let verifier = Ed25519Signer::from_hex(&signature_key()).unwrap();
        assert!(verifier.verify(message.as_bytes(), header(&sent, "X-Api-Signature")));
    }

    #[tokio::test]
    async fn test_each_request_gets_a_fresh_nonce() {
        let (client, transport) = signed_client();
        client.get("/ping", None).await.unwrap();
        client.get("/ping", None).await.unwrap();

        let requests = transport.requests();
        assert_ne!(
            header(&requests[0], "X-Api-Nonce"),
            header(&requests[1], "X-Api-Nonce")
        );
    }

    #[tokio::test]
    async fn test_form_and_http_encodings() {
        let (client, transport) = unsigned_client();
        let params = json!({"name": "a b", "tags": ["x", "y"]});

        client
            .request(Method::PUT, "/items/1", Some(&params), BodyEncoding::Form)
            .await
            .unwrap();
        let form = transport.last();
        assert_eq!(
            form.body.as_deref(),
            Some("name=a+b&tags%5B0%5D=x&tags%5B1%5D=y")
        );
        assert_eq!(
            header(&form, "Content-Type"),
            "application/x-www-form-urlencoded"
        );

        client
            .request(Method::PATCH, "/items/1", Some(&params), BodyEncoding::Http)
            .await
            .unwrap();
        let raw = transport.last();
        assert_eq!(
            raw.body.as_deref(),
            Some("name=a%20b&tags%5B0%5D=x&tags%5B1%5D=y")
        );
    }

    #[tokio::test]
    async fn test_body_is_canonical_regardless_of_insertion_order() {
        let (client, transport) = unsigned_client();
        client
            .post("/orders", &json!({"z": 1, "a": {"d": 2, "c": 3}}))
            .await
            .unwrap();
        assert_eq!(
            transport.last().body.as_deref(),
            Some(r#"{"a":{"c":3,"d":2},"z":1}"#)
        );
    }

    #[tokio::test]
    async fn test_post_without_params_sends_empty_object() {
        let (client, transport) = unsigned_client();
        client
            .request(Method::POST, "/touch", None, BodyEncoding::Json)
            .await
            .unwrap();
        assert_eq!(transport.last().body.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_snapshots_track_latest_call() {
        let (client, _transport) = unsigned_client();
        assert!(client.last_request().is_none());
        assert!(client.last_response().is_none());

        client.get("/first", None).await.unwrap();
        let second = client
            .post("/second", &json!({"k": "v"}))
            .await
            .unwrap();

        let last_request = client.last_request().unwrap();
        assert_eq!(last_request.method, "POST");
        assert_eq!(last_request.endpoint, "/second");
        assert_eq!(last_request.payload.as_deref(), Some(r#"{"k":"v"}"#));
        assert_eq!(
            last_request.to_value()["headers"]["Authorization"],
            format!("Bearer {}", api_key())
        );
        assert_eq!(client.last_response().unwrap(), second);
    }

    #[tokio::test]
    async fn test_debug_accounting() {
        let (client, _transport) = unsigned_client();
        client.get("/before", None).await.unwrap();

        client.debug_start();
        for i in 0..3 {
            client.get(&format!("/n/{}", i), None).await.unwrap();
        }
        client.debug_stop();
        client.get("/after", None).await.unwrap();

        let report = client.debug_report();
        assert_eq!(report.count, 3);
        assert!((report.time - 0.375).abs() < 1e-9);

        let messages: Vec<&str> = report.trace.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Start debug.",
                "Request | https://api.example.com/n/0",
                "Request | https://api.example.com/n/1",
                "Request | https://api.example.com/n/2",
                "Stop debug."
            ]
        );
    }

    #[tokio::test]
    async fn test_debug_reset_starts_over() {
        let (client, _transport) = unsigned_client();
        client.debug_start();
        client.get("/a", None).await.unwrap();
        client.get("/b", None).await.unwrap();

        client.debug_reset();
        let report = client.debug_report();
        assert_eq!(report.count, 0);
        assert!(report.time.abs() < f64::EPSILON);
        assert_eq!(report.trace.len(), 1);

        client.get("/c", None).await.unwrap();
        let report = client.debug_report();
        assert_eq!(report.count, 1);
        assert_eq!(report.trace[1].message, "Request | https://api.example.com/c");
    }

    #[tokio::test]
    async fn test_debug_sessions_are_per_client() {
        let (first, _t1) = unsigned_client();
        let (second, _t2) = unsigned_client();

        first.debug_start();
        second.debug_start();
        first.get("/only-first", None).await.unwrap();

        assert_eq!(first.debug_report().count, 1);
        assert_eq!(second.debug_report().count, 0);
    }

    #[tokio::test]
    async fn test_transport_error_leaves_client_usable() {
        let (client, transport) = signed_client();
        client.debug_start();
        client.get("/ok", None).await.unwrap();

        transport.set_failing(true);
        let err = client.get("/down", None).await.unwrap_err();
        assert!(err.is_transport());
        assert!(client.last_response().is_none());
        assert_eq!(client.last_request().unwrap().endpoint, "/down");
        assert_eq!(client.debug_report().count, 1);

        transport.set_failing(false);
        let response = client.get("/ok-again", None).await.unwrap();
        assert!(response.is_success());
        assert_eq!(header_count(&transport.last(), "X-Api-Signature"), 1);
        assert_eq!(client.debug_report().count, 2);
    }

    #[tokio::test]
    async fn test_scalar_query_params_are_rejected_before_sending() {
        let (client, transport) = unsigned_client();
        let err = client.get("/x", Some(&json!(5))).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidParameters(_)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_inconsistent_keypair_never_builds_a_client() {
        let mut bytes = SigningKey::from_bytes(&[5; 32]).to_keypair_bytes();
        bytes[63] ^= 0x01;
        let transport = RecordingTransport::default();
        let config = ClientConfig::new(HOST, api_key()).with_signature_key(hex::encode(bytes));

        let err = ApiClient::with_transport(config, transport.clone()).unwrap_err();
        assert!(err.is_signing());
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_configuration_errors() {
        let bad_key = ApiClient::with_transport(
            ClientConfig::new(HOST, "not-hex"),
            RecordingTransport::default(),
        )
        .unwrap_err();
        assert!(bad_key.is_configuration());

        let insecure = ApiClient::with_transport(
            ClientConfig::new("http://api.example.com", api_key()),
            RecordingTransport::default(),
        )
        .unwrap_err();
        assert!(insecure.is_configuration());
    }
}
