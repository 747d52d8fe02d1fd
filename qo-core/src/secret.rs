//! Byte containers for nonce and shared-secret material
//!
//! Contents are wiped on drop and never rendered by `Debug`. The only loggable
//! form is [`SecretBytes::fingerprint`], a truncated SHA-256 digest.

use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

/// Number of digest bytes shown in a fingerprint
const FINGERPRINT_BYTES: usize = 4;

/// Zeroizing byte buffer with a redacted `Debug`
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretBytes(Zeroizing<Vec<u8>>);

impl SecretBytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Borrow the raw bytes
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Non-reversible rendering safe for trace logs, e.g. `sha256:1a2b3c4d/16B`
    pub fn fingerprint(&self) -> String {
        if self.0.is_empty() {
            return "<empty>".to_string();
        }
        let digest = Sha256::digest(self.0.as_slice());
        format!(
            "sha256:{}/{}B",
            hex::encode(&digest[..FINGERPRINT_BYTES]),
            self.0.len()
        )
    }
}

impl From<Vec<u8>> for SecretBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes(REDACTED, {} bytes)", self.0.len())
    }
}
