//! Shared-key signing for the log-analytics data collector.
//!
//! The backend recomputes the signature over its own canonical string, so the
//! field order, newlines and content type below must match byte for byte.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const ANALYTICS_CONTENT_TYPE: &str = "application/json";
pub const ANALYTICS_RESOURCE: &str = "/api/logs";

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("shared key is not valid base64: {0}")]
    InvalidKey(#[from] base64::DecodeError),
    #[error("shared key is empty")]
    EmptyKey,
}

pub fn canonical_string(payload_len: usize, date: &str) -> String {
    format!(
        "POST\n{payload_len}\n{ANALYTICS_CONTENT_TYPE}\nx-ms-date:{date}\n{ANALYTICS_RESOURCE}"
    )
}

/// HMAC-SHA256 of the canonical string under the base64-decoded shared key,
/// returned base64-encoded.
pub fn sign(payload_len: usize, date: &str, shared_key: &str) -> Result<String, SigningError> {
    let key = STANDARD.decode(shared_key.trim())?;
    if key.is_empty() {
        return Err(SigningError::EmptyKey);
    }
    let mut mac =
        Hmac::<Sha256>::new_from_slice(&key).map_err(|_| SigningError::EmptyKey)?;
    mac.update(canonical_string(payload_len, date).as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// `Authorization` header value for a signed call.
pub fn shared_key_authorization(workspace_id: &str, signature: &str) -> String {
    format!("SharedKey {workspace_id}:{signature}")
}

/// RFC 1123 date with a literal `GMT` zone, as `x-ms-date` expects.
pub fn rfc1123(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
