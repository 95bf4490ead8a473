use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::types::ForwardTarget;

/// Signature material attached to a forwarded copy.
pub struct SignatureHeaders {
    pub signature_header: Option<(String, String)>,
    pub timestamp_header: Option<(String, String)>,
}

/// Build signature headers for a forwarded copy.
///
/// Targets without a secret produce no headers.
pub fn build_signature_headers(target: &ForwardTarget, payload: &[u8]) -> SignatureHeaders {
    let Some(secret) = target.secret.as_ref() else {
        return SignatureHeaders {
            signature_header: None,
            timestamp_header: None,
        };
    };

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string();

    let signature = compute_signature(secret, payload, Some(&timestamp));

    SignatureHeaders {
        signature_header: Some((target.signature_header.clone(), signature)),
        timestamp_header: Some((target.timestamp_header.clone(), timestamp)),
    }
}

/// Compute the HMAC signature attached to forwarded copies.
pub fn compute_signature(secret: &[u8], payload: &[u8], timestamp: Option<&str>) -> String {
    let data = if let Some(ts) = timestamp {
        [ts.as_bytes(), payload].concat()
    } else {
        payload.to_vec()
    };

    let mut mac = Hmac::<Sha256>::new_from_slice(secret)
        .unwrap_or_else(|_| Hmac::<Sha256>::new_from_slice(b"default").expect("hmac"));
    mac.update(&data);
    hex::encode(mac.finalize().into_bytes())
}
