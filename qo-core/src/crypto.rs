//! Authenticated decryption of keygen responses
//!
//! The service encrypts generated key material under a key derived from the
//! pre-shared secret and the request nonce:
//!
//! ```text
//! key       = HKDF-SHA256(ikm = shared_secret, salt = nonce, info = "qo-keygen/v1")
//! plaintext = AES-256-GCM-Open(key, iv, aad = nonce, encrypted_data)
//! ```
//!
//! A wrong secret, a different nonce or a tampered payload all fail tag verification,
//! and no plaintext is returned in that case.

use crate::protocol::KeyResponse;
use crate::secret::SecretBytes;
use crate::Result;
use zeroize::Zeroizing;

/// Turns an encrypted response into plaintext key material
pub trait Decryptor {
    fn decrypt(
        &self,
        shared_secret: &SecretBytes,
        nonce: &SecretBytes,
        response: &KeyResponse,
    ) -> Result<Zeroizing<Vec<u8>>>;
}

#[cfg(feature = "decrypt")]
pub use aes::AesGcmDecryptor;

#[cfg(feature = "decrypt")]
mod aes {
    use super::Decryptor;
    use crate::protocol::KeyResponse;
    use crate::secret::SecretBytes;
    use crate::{Error, Result};
    use aes_gcm::aead::{Aead, KeyInit, Payload};
    use aes_gcm::{Aes256Gcm, Key, Nonce};
    use hkdf::Hkdf;
    use sha2::Sha256;
    use tracing::debug;
    use zeroize::Zeroizing;

    pub(crate) const KDF_INFO: &[u8] = b"qo-keygen/v1";
    pub(crate) const IV_SIZE: usize = 12;
    const KEY_SIZE: usize = 32;
    const TAG_SIZE: usize = 16;

    /// HKDF-SHA256 + AES-256-GCM decryptor
    #[derive(Debug, Clone, Copy, Default)]
    pub struct AesGcmDecryptor;

    pub(crate) fn derive_key(
        shared_secret: &SecretBytes,
        nonce: &SecretBytes,
    ) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
        let hk = Hkdf::<Sha256>::new(Some(nonce.expose()), shared_secret.expose());
        let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
        hk.expand(KDF_INFO, &mut okm[..])
            .map_err(|e| Error::Decryption(format!("Key derivation failed: {}", e)))?;
        Ok(okm)
    }

    impl Decryptor for AesGcmDecryptor {
        fn decrypt(
            &self,
            shared_secret: &SecretBytes,
            nonce: &SecretBytes,
            response: &KeyResponse,
        ) -> Result<Zeroizing<Vec<u8>>> {
            let payload = &response.encrypted;
            if payload.iv.len() != IV_SIZE {
                return Err(Error::Decryption(format!(
                    "Invalid IV length: expected {}, got {}",
                    IV_SIZE,
                    payload.iv.len()
                )));
            }
            if payload.encrypted_data.len() < TAG_SIZE {
                return Err(Error::Decryption("Encrypted payload is truncated".to_string()));
            }

            let key = derive_key(shared_secret, nonce)?;
            let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
            let plaintext = cipher
                .decrypt(
                    Nonce::from_slice(&payload.iv),
                    Payload {
                        msg: &payload.encrypted_data,
                        aad: nonce.expose(),
                    },
                )
                .map_err(|_| {
                    Error::Decryption(
                        "Authentication failed, check the shared secret".to_string(),
                    )
                })?;

            debug!("Decrypted {} bytes of key material", plaintext.len());
            Ok(Zeroizing::new(plaintext))
        }
    }
}

/// Encrypt like the service does; only needed to produce fixtures
#[cfg(all(test, feature = "decrypt"))]
pub(crate) fn seal_for_tests(
    shared_secret: &SecretBytes,
    nonce: &SecretBytes,
    plaintext: &[u8],
) -> KeyResponse {
    use crate::protocol::EncryptedPayload;
    use aes_gcm::aead::{Aead, KeyInit, Payload};
    use aes_gcm::{Aes256Gcm, Key, Nonce};

    let key = aes::derive_key(shared_secret, nonce).unwrap();
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key[..]));
    let iv = [0x24u8; aes::IV_SIZE];
    let encrypted_data = cipher
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: plaintext,
                aad: nonce.expose(),
            },
        )
        .unwrap();

    KeyResponse {
        encrypted: EncryptedPayload {
            encrypted_data,
            iv: iv.to_vec(),
        },
        counter: Some(1),
    }
}

#[cfg(all(test, feature = "decrypt"))]
mod tests {
    use super::*;
    use crate::Error;

    fn secret() -> SecretBytes {
        SecretBytes::new(b"0123456789abcdef0123456789abcdef".to_vec())
    }

    fn nonce() -> SecretBytes {
        SecretBytes::new(vec![5u8; 16])
    }

    #[test]
    fn test_decrypt_matching_material() {
        let response = seal_for_tests(&secret(), &nonce(), b"key material");
        let plaintext = AesGcmDecryptor.decrypt(&secret(), &nonce(), &response).unwrap();
        assert_eq!(plaintext.as_slice(), b"key material");
    }

    #[test]
    fn test_wrong_secret_fails() {
        let response = seal_for_tests(&secret(), &nonce(), b"key material");
        let wrong = SecretBytes::new(b"another secret".to_vec());
        let err = AesGcmDecryptor.decrypt(&wrong, &nonce(), &response).unwrap_err();
        assert!(matches!(err, Error::Decryption(_)));
    }

    #[test]
    fn test_wrong_nonce_fails() {
        let response = seal_for_tests(&secret(), &nonce(), b"key material");
        let other = SecretBytes::new(vec![6u8; 16]);
        assert!(AesGcmDecryptor.decrypt(&secret(), &other, &response).is_err());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let mut response = seal_for_tests(&secret(), &nonce(), b"key material");
        response.encrypted.encrypted_data[0] ^= 0x01;
        assert!(AesGcmDecryptor.decrypt(&secret(), &nonce(), &response).is_err());
    }

    #[test]
    fn test_malformed_payload() {
        let mut response = seal_for_tests(&secret(), &nonce(), b"key material");
        response.encrypted.iv.truncate(8);
        let err = AesGcmDecryptor.decrypt(&secret(), &nonce(), &response).unwrap_err();
        assert!(matches!(err, Error::Decryption(msg) if msg.contains("IV")));

        let mut response = seal_for_tests(&secret(), &nonce(), b"");
        response.encrypted.encrypted_data.truncate(4);
        assert!(AesGcmDecryptor.decrypt(&secret(), &nonce(), &response).is_err());
    }
}
