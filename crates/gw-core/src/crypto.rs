//! Provider credential-at-rest encryption, keyed by `MODEL_PROVIDER_SECRET`. AES-256-GCM is the
//! standard choice for encrypting upstream API keys before they touch the database.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};

use gw_common::{GatewayError, GatewayResult};

pub struct ProviderKeyCipher {
    cipher: Aes256Gcm,
}

impl ProviderKeyCipher {
    /// Derives a 256-bit key from the configured secret via SHA-256 so any secret length the operator
    /// supplies works as an AES-256 key.
    pub fn new(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> GatewayResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|err| GatewayError::internal(anyhow::anyhow!("provider key encryption failed: {err}")))?;
        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(combined))
    }

    pub fn decrypt(&self, encoded: &str) -> GatewayResult<String> {
        let combined = BASE64
            .decode(encoded)
            .map_err(|err| GatewayError::internal(anyhow::anyhow!("provider key is not valid base64: {err}")))?;
        if combined.len() < 12 {
            return Err(GatewayError::internal(anyhow::anyhow!("provider key ciphertext too short")));
        }
        let (nonce_bytes, ciphertext) = combined.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|err| GatewayError::internal(anyhow::anyhow!("provider key decryption failed: {err}")))?;
        String::from_utf8(plaintext)
            .map_err(|err| GatewayError::internal(anyhow::anyhow!("decrypted provider key is not valid utf-8: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_provider_key() {
        let cipher = ProviderKeyCipher::new("super-secret");
        let encrypted = cipher.encrypt("sk-live-abc123").unwrap();
        assert_ne!(encrypted, "sk-live-abc123");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "sk-live-abc123");
    }

    #[test]
    fn different_secrets_cannot_decrypt_each_others_ciphertext() {
        let a = ProviderKeyCipher::new("secret-a");
        let b = ProviderKeyCipher::new("secret-b");
        let encrypted = a.encrypt("sk-live-abc123").unwrap();
        assert!(b.decrypt(&encrypted).is_err());
    }
}
