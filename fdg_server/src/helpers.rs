use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::ServerError;

/// Calculates the base64-encoded HMAC-SHA256 of `data`, keyed with `secret`.
///
/// This is the signature the payment gateway places in the `x-fdg-signature` header of its callbacks.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> Result<String, ServerError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| ServerError::ConfigurationError(format!("Invalid HMAC key. {e}")))?;
    mac.update(data);
    let result = mac.finalize().into_bytes();
    Ok(base64::encode(result))
}

/// Checks a raw HMAC-SHA256 digest of `data` in constant time.
pub fn verify_hmac(secret: &str, data: &[u8], digest: &[u8]) -> bool {
    match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(data);
            mac.verify_slice(digest).is_ok()
        },
        Err(_) => false,
    }
}
