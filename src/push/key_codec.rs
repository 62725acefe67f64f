use base64::{STANDARD, decode_config};

use crate::error::PushError;

/// Decodes a base64url server (VAPID) public key into the raw bytes
/// `pushManager.subscribe` expects as `applicationServerKey`.
pub fn decode_server_key(base64url: &str) -> Result<Vec<u8>, PushError> {
    let trimmed = base64url.trim();
    if trimmed.is_empty() {
        return Err(PushError::InvalidKeyFormat("key is empty".to_string()));
    }

    let padding = (4 - trimmed.len() % 4) % 4;
    let mut standard = String::with_capacity(trimmed.len() + padding);
    for ch in trimmed.chars() {
        standard.push(match ch {
            '-' => '+',
            '_' => '/',
            other => other,
        });
    }
    standard.extend(std::iter::repeat_n('=', padding));

    decode_config(&standard, STANDARD).map_err(|err| PushError::InvalidKeyFormat(err.to_string()))
}
