//! Webhook payload authentication.
//!
//! Notifications carry `X-Hub-Signature-256: sha256=<hex>`, an HMAC-SHA256 of
//! the raw request body keyed with the repository's notification secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::constants::SIGNATURE_PREFIX;
use crate::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Verify `header` against `body` using `secret`.
///
/// The comparison runs in constant time. A missing prefix or non-hex digest
/// is reported as [`SignatureError::MissingHeader`].
pub fn verify_signature(secret: &[u8], body: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
    let digest = header
        .map(str::trim)
        .and_then(|h| h.strip_prefix(SIGNATURE_PREFIX))
        .ok_or(SignatureError::MissingHeader)?;
    let expected = hex::decode(digest).map_err(|_| SignatureError::MissingHeader)?;

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::Mismatch)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

/// Compute the header value for `body`, as a sender would.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::Mismatch)?;
    mac.update(body);
    Ok(format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes())))
}
