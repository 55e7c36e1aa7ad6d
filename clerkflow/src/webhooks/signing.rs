//! HMAC-SHA256 signing and verification for SVIX / Standard Webhooks payloads.
//!
//! Clerk delivers webhooks through SVIX, which uses the Standard Webhooks signature scheme:
//! - Signature is computed over: `{msg_id}.{timestamp}.{payload}`
//! - The signature is base64-encoded HMAC-SHA256
//! - Headers include: `svix-id`, `svix-timestamp`, `svix-signature`
//! - `svix-signature` may carry several space-separated `version,signature` pairs (key rotation)
//!
//! See: <https://www.standardwebhooks.com/>

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use hmac::{Hmac, Mac};
use rand::prelude::RngExt;
use rand::rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix for webhook signing secrets
pub const SECRET_PREFIX: &str = "whsec_";

/// The only signature version we know how to verify
pub const SIGNATURE_VERSION: &str = "v1";

/// Generate a new webhook secret.
///
/// Returns a `whsec_` prefixed base64-encoded 32-byte random secret.
pub fn generate_secret() -> String {
    let secret_bytes: [u8; 32] = rng().random();
    format!("{}{}", SECRET_PREFIX, BASE64_STANDARD.encode(secret_bytes))
}

/// Extract the raw key bytes from a signing secret.
///
/// The `whsec_` prefix is optional: secrets copied without it are decoded as-is.
/// Returns `None` if the remainder is not valid base64.
pub fn decode_secret(secret: &str) -> Option<Vec<u8>> {
    let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
    BASE64_STANDARD.decode(encoded).ok()
}

/// Compute the bare base64 signature for a message.
///
/// `timestamp` is used verbatim, exactly as it appears in the `svix-timestamp` header.
pub fn compute_signature(msg_id: &str, timestamp: &str, payload: &[u8], secret: &str) -> Option<String> {
    let secret_bytes = decode_secret(secret)?;

    let mut mac = HmacSha256::new_from_slice(&secret_bytes).ok()?;
    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    Some(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

/// Sign a webhook payload the way the sender does.
///
/// # Returns
///
/// The signature in format `v1,{base64-hmac-sha256}`, ready for the `svix-signature` header.
pub fn sign_payload(msg_id: &str, timestamp: i64, payload: &str, secret: &str) -> Option<String> {
    let signature = compute_signature(msg_id, &timestamp.to_string(), payload.as_bytes(), secret)?;
    Some(format!("{},{}", SIGNATURE_VERSION, signature))
}

/// Split a `svix-signature` header into `(version, signature)` pairs.
///
/// Tokens without a comma are skipped.
pub fn parse_signature_header(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split_whitespace().filter_map(|token| token.split_once(','))
}

/// Verify a webhook signature header.
///
/// # Arguments
///
/// * `msg_id` - The `svix-id` header value
/// * `timestamp` - The `svix-timestamp` header value
/// * `payload` - The signed body bytes
/// * `signature_header` - The `svix-signature` header value
/// * `secret` - The signing secret, with or without the `whsec_` prefix
///
/// # Returns
///
/// `true` if any `v1` signature in the header matches, `false` otherwise.
pub fn verify_signature(msg_id: &str, timestamp: &str, payload: &[u8], signature_header: &str, secret: &str) -> bool {
    let Some(expected) = compute_signature(msg_id, timestamp, payload, secret) else {
        return false;
    };

    parse_signature_header(signature_header)
        .filter(|(version, _)| *version == SIGNATURE_VERSION)
        .any(|(_, signature)| constant_time_eq(signature.as_bytes(), expected.as_bytes()))
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
