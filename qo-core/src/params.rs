//! Parameter model for one keygen invocation
//!
//! A [`KeygenParameters`] starts out as whatever the caller supplied, gets its gaps
//! filled by [`crate::resolver`], its nonce generated by [`crate::validator`], and is
//! read-only from then on.

use crate::protocol::{KeyAlgorithm, KeyType, OutputFormat};
use crate::secret::SecretBytes;
use std::path::PathBuf;
use tracing::{debug, trace};

/// Identity material; exactly one of the two modes must end up complete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthParameters {
    pub client_certificate_filename: String,
    pub private_key_filename: String,
    pub api_key: String,
    pub client_id: String,
}

impl AuthParameters {
    pub fn has_client_id(&self) -> bool {
        !self.client_id.is_empty()
    }

    pub fn has_certificate_pair(&self) -> bool {
        !self.client_certificate_filename.is_empty() && !self.private_key_filename.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiParameters {
    pub url: String,
    pub auth: AuthParameters,
}

/// Algorithm parameters, kept as the raw JSON the caller provided
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyParameters {
    pub json: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptionParameters {
    pub nonce: SecretBytes,
    pub shared_secret: SecretBytes,
}

/// Where and how key material is written; not security relevant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputParameters {
    pub format: Option<OutputFormat>,
    pub filename: String,
}

impl OutputParameters {
    pub fn format_or_default(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }

    /// `None` means standard output
    pub fn path(&self) -> Option<PathBuf> {
        match self.filename.as_str() {
            "" | "-" => None,
            name => Some(PathBuf::from(name)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeygenParameters {
    pub api: ApiParameters,
    pub key_type: Option<KeyType>,
    pub key_algorithm: Option<KeyAlgorithm>,
    pub key_parameters: KeyParameters,
    pub decryption: DecryptionParameters,
    pub output: OutputParameters,
}

impl KeygenParameters {
    /// Dump the parameter set. Secrets only appear as fingerprints, and only at trace.
    pub fn log_summary(&self) {
        debug!("KeygenParameters");
        debug!("cert                  = \"{}\"", self.api.auth.client_certificate_filename);
        debug!("privateKeyForCert     = \"{}\"", self.api.auth.private_key_filename);
        debug!("url                   = \"{}\"", self.api.url);
        debug!("clientId              = \"{}\"", self.api.auth.client_id);
        debug!("apiKey set            = {}", !self.api.auth.api_key.is_empty());
        debug!("keyType               = {:?}", self.key_type);
        debug!("keyAlgorithm          = {:?}", self.key_algorithm);
        debug!("keyParameters         = \"{}\"", self.key_parameters.json);
        debug!("outputFormat          = {:?}", self.output.format);
        debug!("outputFilename        = \"{}\"", self.output.filename);
        trace!("nonce                 = {}", self.decryption.nonce.fingerprint());
        trace!("sharedSecret          = {}", self.decryption.shared_secret.fingerprint());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let mut output = OutputParameters::default();
        assert_eq!(output.path(), None);
        output.filename = "-".into();
        assert_eq!(output.path(), None);
        output.filename = "key.hex".into();
        assert_eq!(output.path(), Some(PathBuf::from("key.hex")));
        assert_eq!(output.format_or_default(), OutputFormat::Hex);
    }

    #[test]
    fn test_identity_modes() {
        let mut auth = AuthParameters::default();
        assert!(!auth.has_client_id());
        assert!(!auth.has_certificate_pair());
        auth.client_certificate_filename = "client.pem".into();
        assert!(!auth.has_certificate_pair());
        auth.private_key_filename = "client.key".into();
        assert!(auth.has_certificate_pair());
    }
}
