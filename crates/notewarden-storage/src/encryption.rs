use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use anyhow::Result;
use rand::Rng;

const NONCE_SIZE: usize = 12;

/// AES-256-GCM sealing with a random nonce prepended to each ciphertext.
///
/// Associated data is authenticated but not stored; the same bytes must be
/// supplied again to open the box.
pub struct SecretEncryptor {
    cipher: Aes256Gcm,
}

impl SecretEncryptor {
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != 32 {
            return Err(anyhow::anyhow!(
                "Encryption key must be 32 bytes, got {}",
                key.len()
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|err| anyhow::anyhow!("Invalid encryption key length: {:?}", err))?;

        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut ciphertext = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|err| anyhow::anyhow!("Failed to encrypt payload: {:?}", err))?;
        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.append(&mut ciphertext);
        Ok(output)
    }

    pub fn decrypt(&self, sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_SIZE {
            return Err(anyhow::anyhow!("Ciphertext is too short"));
        }

        let (nonce_bytes, payload) = sealed.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, Payload { msg: payload, aad })
            .map_err(|err| anyhow::anyhow!("Failed to decrypt payload: {:?}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        [0xAB; 32]
    }

    #[test]
    fn roundtrip_with_associated_data() {
        let encryptor = SecretEncryptor::new(&test_key()).unwrap();
        let sealed = encryptor.encrypt(b"sk-live-123", b"agent-1:api_key").unwrap();
        let opened = encryptor.decrypt(&sealed, b"agent-1:api_key").unwrap();
        assert_eq!(opened, b"sk-live-123");
    }

    #[test]
    fn rejects_short_keys() {
        let err = SecretEncryptor::new(&[0u8; 31]).err().unwrap();
        assert!(err.to_string().contains("32"));
    }

    #[test]
    fn mismatched_associated_data_fails() {
        let encryptor = SecretEncryptor::new(&test_key()).unwrap();
        let sealed = encryptor.encrypt(b"secret", b"agent-1:api_key").unwrap();
        assert!(encryptor.decrypt(&sealed, b"agent-2:api_key").is_err());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let encryptor = SecretEncryptor::new(&test_key()).unwrap();
        let mut sealed = encryptor.encrypt(b"sensitive data", b"").unwrap();
        sealed[NONCE_SIZE + 1] ^= 0xFF;
        assert!(encryptor.decrypt(&sealed, b"").is_err());
    }

    #[test]
    fn different_key_fails() {
        let sealed = SecretEncryptor::new(&[0x11; 32])
            .unwrap()
            .encrypt(b"secret", b"")
            .unwrap();
        let other = SecretEncryptor::new(&[0x22; 32]).unwrap();
        assert!(other.decrypt(&sealed, b"").is_err());
    }

    #[test]
    fn nonces_are_fresh() {
        let encryptor = SecretEncryptor::new(&test_key()).unwrap();
        let a = encryptor.encrypt(b"same input", b"").unwrap();
        let b = encryptor.encrypt(b"same input", b"").unwrap();
        assert_ne!(a, b);
    }
}
