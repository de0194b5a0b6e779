//! Request kernel: everything between "caller wants to send params" and
//! "bytes go over the wire".
//!
//! # Components
//!
//! - `canonical`: byte-ordered key sorting for stable JSON
//! - `encoding`: bracket-notation flattening, form and raw url-encoding
//! - `signer`: signable message construction and Ed25519 detached signatures
//! - `rest`: the `Transport` seam and its reqwest implementation
//!
//! # Signing a request by hand
//! ```rust
//! use signet_rest::core::kernel::{build_message, Ed25519Signer, Signer};
//! use reqwest::Method;
//! use serde_json::json;
//!
//! # fn example() -> Result<(), signet_rest::ClientError> {
//! let keypair = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60\
//!                d75a980182b10ab7d54bfed3c964073a0ee172f3daa62325af021a68f707511a";
//! let signer = Ed25519Signer::from_hex(keypair)?;
//!
//! let message = build_message(
//!     &Method::GET,
//!     "/search",
//!     &json!({"b": "2", "a": "1"}),
//!     "00".repeat(32).as_str(),
//!     "2024-01-01T00:00:00Z",
//! )?;
//! assert!(message.starts_with("/search?a=1&b=2|"));
//!
//! let signature = signer.sign_message(message.as_bytes())?;
//! assert!(signer.verify(message.as_bytes(), &signature));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod canonical;
pub mod encoding;
pub mod rest;
pub mod signer;

// Re-export key types for convenience
pub use canonical::{canonical_json, canonicalize};
pub use encoding::{build_query_string, flatten_params, form_encode, raw_url_encode};
pub use rest::{ReqwestTransport, Transport, TransportBuilder, TransportConfig};
pub use signer::{
    build_message, generate_nonce, is_body_method, request_query, sign, signing_path,
    split_endpoint, utc_timestamp, Ed25519Signer, SignedHeaders, Signer, NONCE_HEADER,
    SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
