//! Fail-closed validation of resolved keygen parameters
//!
//! Checks run in a fixed order and the first failure is returned. The only repair
//! ever performed is generating a nonce when none was supplied.

use crate::params::KeygenParameters;
use crate::secret::SecretBytes;
use crate::{Error, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, trace};

/// Length of a generated nonce in bytes
pub const NONCE_LEN: usize = 16;

/// What the composed pipeline needs from the parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationPolicy {
    pub require_shared_secret: bool,
}

impl ValidationPolicy {
    pub const DECRYPTING: Self = Self {
        require_shared_secret: true,
    };
    pub const PASSTHROUGH: Self = Self {
        require_shared_secret: false,
    };
}

/// Validate `params` and fill in a nonce if it is still empty
pub fn validate(params: &mut KeygenParameters, policy: ValidationPolicy) -> Result<()> {
    let auth = &params.api.auth;
    if !auth.has_client_id() && !auth.has_certificate_pair() {
        return Err(Error::MissingIdentity);
    }
    if params.key_type.is_none() && params.key_algorithm.is_none() {
        return Err(Error::MissingParameter("Key type or algorithm"));
    }
    if params.key_algorithm.is_some() && params.key_parameters.json.is_empty() {
        return Err(Error::MissingParameter("Key parameters"));
    }
    if params.api.url.is_empty() {
        return Err(Error::MissingParameter("URL"));
    }
    if policy.require_shared_secret && params.decryption.shared_secret.is_empty() {
        return Err(Error::MissingParameter("Shared secret"));
    }

    if let (Some(key_type), Some(key_algorithm)) = (params.key_type, params.key_algorithm) {
        debug!(
            "Both key type {} and key algorithm {} given, the key type takes precedence",
            key_type, key_algorithm
        );
    }

    if params.decryption.nonce.is_empty() {
        debug!("No nonce supplied, generating random nonce");
        params.decryption.nonce = generate_nonce();
        trace!("Generated nonce {}", params.decryption.nonce.fingerprint());
    }

    Ok(())
}

/// Fresh nonce from the operating system CSPRNG
pub fn generate_nonce() -> SecretBytes {
    let mut nonce = vec![0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);
    SecretBytes::new(nonce)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{KeyAlgorithm, KeyType};

    fn valid_params() -> KeygenParameters {
        let mut params = KeygenParameters::default();
        params.api.url = "https://svc".into();
        params.api.auth.client_id = "c1".into();
        params.api.auth.api_key = "k".into();
        params.key_type = Some(KeyType::Rsa2048);
        params.decryption.shared_secret = SecretBytes::new(vec![9u8; 32]);
        params
    }

    #[test]
    fn test_valid_params_get_nonce() {
        let mut params = valid_params();
        validate(&mut params, ValidationPolicy::DECRYPTING).unwrap();
        assert_eq!(params.decryption.nonce.len(), NONCE_LEN);
    }

    #[test]
    fn test_supplied_nonce_kept() {
        let mut params = valid_params();
        params.decryption.nonce = SecretBytes::new(b"caller-nonce".to_vec());
        validate(&mut params, ValidationPolicy::DECRYPTING).unwrap();
        assert_eq!(params.decryption.nonce.expose(), b"caller-nonce");
    }

    #[test]
    fn test_missing_identity_wins_over_everything() {
        let mut params = KeygenParameters::default();
        let err = validate(&mut params, ValidationPolicy::DECRYPTING).unwrap_err();
        assert!(matches!(err, Error::MissingIdentity));

        // certificate without key is not an identity
        let mut params = valid_params();
        params.api.auth.client_id.clear();
        params.api.auth.client_certificate_filename = "client.pem".into();
        let err = validate(&mut params, ValidationPolicy::DECRYPTING).unwrap_err();
        assert!(matches!(err, Error::MissingIdentity));
        assert!(params.decryption.nonce.is_empty());
    }

    #[test]
    fn test_certificate_identity_accepted() {
        let mut params = valid_params();
        params.api.auth.client_id.clear();
        params.api.auth.client_certificate_filename = "client.pem".into();
        params.api.auth.private_key_filename = "client.key".into();
        assert!(validate(&mut params, ValidationPolicy::DECRYPTING).is_ok());
    }

    #[test]
    fn test_missing_key_specification() {
        let mut params = valid_params();
        params.key_type = None;
        let err = validate(&mut params, ValidationPolicy::DECRYPTING).unwrap_err();
        assert_eq!(err.missing_field(), Some("Key type or algorithm"));
    }

    #[test]
    fn test_algorithm_requires_parameters() {
        let mut params = valid_params();
        params.key_type = None;
        params.key_algorithm = Some(KeyAlgorithm::Ec);
        let err = validate(&mut params, ValidationPolicy::DECRYPTING).unwrap_err();
        assert_eq!(err.missing_field(), Some("Key parameters"));

        // also enforced when a key type would have won
        let mut params = valid_params();
        params.key_algorithm = Some(KeyAlgorithm::Ec);
        let err = validate(&mut params, ValidationPolicy::DECRYPTING).unwrap_err();
        assert_eq!(err.missing_field(), Some("Key parameters"));
    }

    #[test]
    fn test_type_and_algorithm_together_is_legal() {
        let mut params = valid_params();
        params.key_algorithm = Some(KeyAlgorithm::Ec);
        params.key_parameters.json = r#"{"curve":"P-256"}"#.into();
        assert!(validate(&mut params, ValidationPolicy::DECRYPTING).is_ok());
    }

    #[test]
    fn test_missing_url() {
        let mut params = valid_params();
        params.api.url.clear();
        let err = validate(&mut params, ValidationPolicy::DECRYPTING).unwrap_err();
        assert_eq!(err.missing_field(), Some("URL"));
    }

    #[test]
    fn test_shared_secret_depends_on_policy() {
        let mut params = valid_params();
        params.decryption.shared_secret = SecretBytes::empty();
        let err = validate(&mut params, ValidationPolicy::DECRYPTING).unwrap_err();
        assert_eq!(err.missing_field(), Some("Shared secret"));
        assert!(params.decryption.nonce.is_empty());

        assert!(validate(&mut params, ValidationPolicy::PASSTHROUGH).is_ok());
        assert_eq!(params.decryption.nonce.len(), NONCE_LEN);
    }

    #[test]
    fn test_generated_nonces_differ() {
        let mut first = valid_params();
        let mut second = valid_params();
        validate(&mut first, ValidationPolicy::DECRYPTING).unwrap();
        validate(&mut second, ValidationPolicy::DECRYPTING).unwrap();
        assert_ne!(first.decryption.nonce, second.decryption.nonce);
    }
}
