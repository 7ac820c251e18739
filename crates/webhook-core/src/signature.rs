//! HMAC-SHA256 webhook signatures
//!
//! Signatures are the standard base64 encoding of HMAC-SHA256 over the exact
//! request body bytes, carried in the `X-Webhook-Signature` header. The same
//! scheme is used to verify inbound webhooks and to sign outbound reports.

use crate::error::EventError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Compute the base64 HMAC-SHA256 of `payload` under `secret`
///
/// # Arguments
/// * `secret` - Shared secret
/// * `payload` - Exact bytes that are sent or received
pub fn compute_signature(secret: &str, payload: &[u8]) -> Result<String, EventError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| EventError::Signature(format!("invalid key: {}", e)))?;
    mac.update(payload);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify an inbound signature
///
/// Without a configured secret verification is disabled and every request is
/// accepted. With a secret, a missing, undecodable or mismatched signature is
/// rejected. The MAC comparison is constant-time.
///
/// # Arguments
/// * `payload` - Raw request body
/// * `signature` - Value of the signature header, if any
/// * `secret` - Configured shared secret, if any
pub fn verify_signature(payload: &[u8], signature: Option<&str>, secret: Option<&str>) -> bool {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        warn!("WEBHOOK_SECRET not configured, skipping signature verification");
        return true;
    };

    let Some(signature) = signature.map(str::trim).filter(|s| !s.is_empty()) else {
        warn!("Missing {} header", SIGNATURE_HEADER);
        return false;
    };

    let provided = match STANDARD.decode(signature) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Signature is not valid base64: {}", e);
            return false;
        }
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&provided).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "s3cr3t";

    #[test]
    fn test_compute_signature() {
        assert_eq!(
            compute_signature(SECRET, br#"{"a":1}"#).unwrap(),
            "1CknQ0BJ4LjHPOiHBiI4zBxrtmRL/mbmbY3Q8wuFZ54="
        );
        assert_eq!(
            compute_signature(SECRET, br#"{"a":2}"#).unwrap(),
            "zJ1umdoZhbtAkt1/5Ez20gPurYymFoqXy2ZIW8s4Fcw="
        );
    }

    #[test]
    fn test_verify_matching_signature() {
        let signature = compute_signature(SECRET, br#"{"a":1}"#).unwrap();
        assert!(verify_signature(br#"{"a":1}"#, Some(&signature), Some(SECRET)));
    }

    #[test]
    fn test_verify_rejects_mismatch() {
        // signature of {"a":1} presented for a different body
        assert!(!verify_signature(
            br#"{"a":2}"#,
            Some("1CknQ0BJ4LjHPOiHBiI4zBxrtmRL/mbmbY3Q8wuFZ54="),
            Some(SECRET)
        ));
        assert!(!verify_signature(br#"{"a":1}"#, Some("not base64!"), Some(SECRET)));
        assert!(!verify_signature(
            br#"{"a":1}"#,
            Some("1CknQ0BJ4LjHPOiHBiI4zBxrtmRL/mbmbY3Q8wuFZ54="),
            Some("other")
        ));
    }

    #[test]
    fn test_verify_missing_header() {
        assert!(!verify_signature(br#"{"a":1}"#, None, Some(SECRET)));
        assert!(!verify_signature(br#"{"a":1}"#, Some(""), Some(SECRET)));
    }

    #[test]
    fn test_verification_disabled_without_secret() {
        assert!(verify_signature(br#"{"a":1}"#, None, None));
        assert!(verify_signature(br#"{"a":1}"#, Some("garbage"), Some("")));
    }
}
