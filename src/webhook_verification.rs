//! # Webhook Signature Verification
//!
//! Slack signs every slash command and interaction callback with
//! `v0=hex(HMAC-SHA256(signing_secret, "v0:{timestamp}:{body}"))`.
//! Comparison is constant-time.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";

const SIGNATURE_VERSION: &str = "v0";

/// Errors that can occur during webhook signature verification
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Missing required signature header: {header}")]
    MissingSignature { header: String },

    #[error("Missing required timestamp header: {header}")]
    MissingTimestamp { header: String },

    #[error("Invalid timestamp format: {header}")]
    InvalidTimestamp { header: String },

    #[error("Timestamp too old: {seconds}s old, max allowed: {max_seconds}s")]
    TimestampTooOld { seconds: u64, max_seconds: u64 },

    #[error("Timestamp too far in future: {seconds}s in future, max allowed: {max_seconds}s")]
    TimestampTooFuture { seconds: u64, max_seconds: u64 },

    #[error("Signature verification failed")]
    VerificationFailed,
}

/// Result type for webhook verification
pub type VerificationResult<T> = Result<T, VerificationError>;

/// Computes the `v0=` signature Slack would send for `body` at `timestamp`.
pub fn compute_signature(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mac = signature_mac(signing_secret, timestamp, body);
    format!("{}={}", SIGNATURE_VERSION, hex::encode(mac.finalize().into_bytes()))
}

/// Checks `provided_signature` against the expected signature for `(timestamp, body)`.
///
/// Any malformed input simply fails verification.
pub fn verify(signing_secret: &str, timestamp: &str, body: &[u8], provided_signature: &str) -> bool {
    let expected = compute_signature(signing_secret, timestamp, body);
    expected.as_bytes().ct_eq(provided_signature.as_bytes()).into()
}

fn signature_mac(signing_secret: &str, timestamp: &str, body: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(SIGNATURE_VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac
}

/// Returns the `(signature, timestamp)` header values, failing when either is absent or empty.
pub fn signature_headers(headers: &HeaderMap) -> VerificationResult<(&str, &str)> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    if signature.is_empty() {
        return Err(VerificationError::MissingSignature {
            header: "X-Slack-Signature".to_string(),
        });
    }

    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    if timestamp.is_empty() {
        return Err(VerificationError::MissingTimestamp {
            header: "X-Slack-Request-Timestamp".to_string(),
        });
    }

    Ok((signature, timestamp))
}

/// Verifies the Slack signature headers on an inbound request.
///
/// When `tolerance_seconds` is set, timestamps further than that from the
/// local clock are rejected before the signature is checked.
pub fn verify_request(
    headers: &HeaderMap,
    body: &[u8],
    signing_secret: &str,
    tolerance_seconds: Option<u64>,
) -> VerificationResult<()> {
    let (signature, timestamp) = signature_headers(headers)?;

    if let Some(tolerance) = tolerance_seconds {
        check_timestamp_window(timestamp, tolerance)?;
    }

    debug!(body_size = body.len(), "Verifying Slack request signature");

    if verify(signing_secret, timestamp, body, signature) {
        Ok(())
    } else {
        Err(VerificationError::VerificationFailed)
    }
}

fn check_timestamp_window(timestamp: &str, tolerance_seconds: u64) -> VerificationResult<()> {
    let timestamp = timestamp
        .parse::<u64>()
        .map_err(|_| VerificationError::InvalidTimestamp {
            header: "X-Slack-Request-Timestamp must be a valid Unix timestamp".to_string(),
        })?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| VerificationError::InvalidTimestamp {
            header: "Failed to get current time".to_string(),
        })?
        .as_secs();

    let time_diff = now.abs_diff(timestamp);
    if time_diff <= tolerance_seconds {
        return Ok(());
    }

    if now > timestamp {
        Err(VerificationError::TimestampTooOld {
            seconds: time_diff,
            max_seconds: tolerance_seconds,
        })
    } else {
        Err(VerificationError::TimestampTooFuture {
            seconds: time_diff,
            max_seconds: tolerance_seconds,
        })
    }
}
