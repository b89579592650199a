use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ring::rand::SecureRandom;

use crate::errors::AuthError;

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| AuthError::Malformed("Failed to decode base64url".to_string()))
}

pub(crate) fn base64url_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

pub(crate) fn fill_random(buf: &mut [u8]) -> Result<(), AuthError> {
    ring::rand::SystemRandom::new()
        .fill(buf)
        .map_err(|_| AuthError::InvalidArgument("Failed to generate random bytes".to_string()))
}

pub(crate) fn gen_random_string(len: usize) -> Result<String, AuthError> {
    let mut bytes = vec![0u8; len];
    fill_random(&mut bytes)?;
    Ok(base64url_encode(&bytes))
}

/// Fresh opaque session id: 32 random bytes, base64url encoded
pub fn gen_session_id() -> Result<String, AuthError> {
    gen_random_string(32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64url_round_trip() {
        let encoded = base64url_encode(b"session id?");
        assert!(!encoded.contains('='));
        assert_eq!(base64url_decode(&encoded).unwrap(), b"session id?");
    }

    #[test]
    fn test_base64url_decode_invalid() {
        assert!(matches!(
            base64url_decode("not base64!"),
            Err(AuthError::Malformed(_))
        ));
    }

    #[test]
    fn test_gen_session_id() {
        let a = gen_session_id().unwrap();
        let b = gen_session_id().unwrap();

        // 32 bytes encode to 43 base64url characters
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }
}
