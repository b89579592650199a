//! Cookie value encodings
//!
//! `iron` values are sealed with AES-256-GCM. The key is derived from the
//! configured password with PBKDF2-HMAC-SHA256 and a random salt per value,
//! and the cookie name is bound as associated data. Wire form:
//! `base64url(salt || nonce || ciphertext || tag)`.

use std::num::NonZeroU32;

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::pbkdf2;

use crate::config::CookieEncoding;
use crate::errors::AuthError;
use crate::utils::{base64url_decode, base64url_encode, fill_random};

const SALT_LEN: usize = 32;
const KEY_LEN: usize = 32;
const PBKDF2_ITERATIONS: NonZeroU32 = NonZeroU32::MIN;

#[derive(Clone)]
pub(crate) struct CookieValueCodec {
    encoding: CookieEncoding,
    cookie_name: String,
    password: Option<String>,
}

impl CookieValueCodec {
    pub(crate) fn new(encoding: CookieEncoding, cookie_name: &str, password: Option<&str>) -> Self {
        Self {
            encoding,
            cookie_name: cookie_name.to_string(),
            password: password.map(str::to_string),
        }
    }

    pub(crate) fn encode(&self, value: &str) -> Result<String, AuthError> {
        match self.encoding {
            CookieEncoding::None => Ok(value.to_string()),
            CookieEncoding::Base64 => Ok(base64url_encode(value.as_bytes())),
            CookieEncoding::Base64Json => {
                let json = serde_json::to_string(value)
                    .map_err(|e| AuthError::InvalidArgument(e.to_string()))?;
                Ok(base64url_encode(json.as_bytes()))
            }
            CookieEncoding::Iron => self.seal(value),
        }
    }

    pub(crate) fn decode(&self, raw: &str) -> Result<String, AuthError> {
        match self.encoding {
            CookieEncoding::None => Ok(raw.to_string()),
            CookieEncoding::Base64 => utf8(base64url_decode(raw)?),
            CookieEncoding::Base64Json => {
                let bytes = base64url_decode(raw)?;
                serde_json::from_slice::<String>(&bytes)
                    .map_err(|e| AuthError::Malformed(format!("Invalid cookie JSON: {e}")))
            }
            CookieEncoding::Iron => self.unseal(raw),
        }
    }

    fn key(&self, salt: &[u8]) -> Result<LessSafeKey, AuthError> {
        let password = self.password.as_deref().ok_or_else(|| {
            AuthError::ConfigInvalid("cookie.password is required for iron encoding".to_string())
        })?;

        let mut key = [0u8; KEY_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            PBKDF2_ITERATIONS,
            salt,
            password.as_bytes(),
            &mut key,
        );
        let unbound = UnboundKey::new(&AES_256_GCM, &key)
            .map_err(|_| AuthError::InvalidArgument("Failed to build cookie key".to_string()))?;
        Ok(LessSafeKey::new(unbound))
    }

    fn seal(&self, value: &str) -> Result<String, AuthError> {
        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        fill_random(&mut salt)?;
        fill_random(&mut nonce)?;

        let key = self.key(&salt)?;
        let mut in_out = value.as_bytes().to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(self.cookie_name.as_bytes()),
            &mut in_out,
        )
        .map_err(|_| AuthError::InvalidArgument("Failed to seal cookie".to_string()))?;

        let mut sealed = Vec::with_capacity(SALT_LEN + NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&salt);
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&in_out);
        Ok(base64url_encode(&sealed))
    }

    fn unseal(&self, raw: &str) -> Result<String, AuthError> {
        let sealed = base64url_decode(raw)?;
        if sealed.len() < SALT_LEN + NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(AuthError::Malformed("Sealed cookie too short".to_string()));
        }

        let (salt, rest) = sealed.split_at(SALT_LEN);
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce)
            .map_err(|_| AuthError::Malformed("Invalid cookie nonce".to_string()))?;

        let key = self.key(salt)?;
        let mut in_out = ciphertext.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::from(self.cookie_name.as_bytes()), &mut in_out)
            .map_err(|_| AuthError::Malformed("Cookie seal verification failed".to_string()))?;

        utf8(plaintext.to_vec())
    }
}

fn utf8(bytes: Vec<u8>) -> Result<String, AuthError> {
    String::from_utf8(bytes).map_err(|_| AuthError::Malformed("Cookie is not UTF-8".to_string()))
}
