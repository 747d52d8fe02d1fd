//! Configuration store for the keygen command
//!
//! The document has three sections (`credentials`, `key_parameters`, `general`) and is
//! loaded once per invocation from YAML, overlaid by `QO_`-prefixed environment
//! variables (`QO_CREDENTIALS__API_KEY=...`). After loading it is immutable; binary
//! fields are base64-decoded and key vocabulary is parsed up front so that the
//! resolver never has to fail.

use crate::protocol::{KeyAlgorithm, KeyType, OutputFormat};
use crate::secret::SecretBytes;
use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use config::{Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Environment prefix for overrides
pub const ENV_PREFIX: &str = "QO";

/// `credentials` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialsConfig {
    pub certificate: String,
    pub private_key_for_cert: String,
    pub url: String,
    pub api_key: String,
    pub client_id: String,
}

/// `key_parameters` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyParametersConfig {
    pub key_type: Option<KeyType>,
    pub key_algorithm: Option<KeyAlgorithm>,
    /// Normalised JSON text
    pub key_parameters: String,
    pub nonce: SecretBytes,
    pub shared_secret: SecretBytes,
}

/// `general` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneralConfig {
    pub output_format: Option<OutputFormat>,
    pub output_filename: String,
}

/// Parsed configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeygenConfig {
    credentials: CredentialsConfig,
    key_parameters: KeyParametersConfig,
    general: GeneralConfig,
}

impl KeygenConfig {
    pub fn new(
        credentials: CredentialsConfig,
        key_parameters: KeyParametersConfig,
        general: GeneralConfig,
    ) -> Self {
        Self {
            credentials,
            key_parameters,
            general,
        }
    }

    /// Load configuration from a YAML file plus environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let settings = config::Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_raw(settings.try_deserialize()?)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder().add_source(env_source()).build()?;
        Self::from_raw(settings.try_deserialize()?)
    }

    /// Parse a YAML document held in memory
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;
        Self::from_raw(settings.try_deserialize()?)
    }

    pub fn credentials(&self) -> &CredentialsConfig {
        &self.credentials
    }

    pub fn key_parameters(&self) -> &KeyParametersConfig {
        &self.key_parameters
    }

    pub fn general(&self) -> &GeneralConfig {
        &self.general
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let credentials = CredentialsConfig {
            certificate: raw.credentials.certificate.unwrap_or_default(),
            private_key_for_cert: raw.credentials.private_key_for_cert.unwrap_or_default(),
            url: raw.credentials.url.unwrap_or_default(),
            api_key: raw.credentials.api_key.unwrap_or_default(),
            client_id: raw.credentials.client_id.unwrap_or_default(),
        };

        let kp = raw.key_parameters;
        let key_parameters = KeyParametersConfig {
            key_type: non_blank(kp.key_type)
                .map(|s| s.parse::<KeyType>())
                .transpose()?,
            key_algorithm: non_blank(kp.key_algorithm)
                .map(|s| s.parse::<KeyAlgorithm>())
                .transpose()?,
            key_parameters: normalise_key_parameters(kp.key_parameters)?,
            nonce: decode_secret("key_parameters.nonce", kp.nonce)?,
            shared_secret: decode_secret("key_parameters.shared_secret", kp.shared_secret)?,
        };

        let general = GeneralConfig {
            output_format: non_blank(raw.general.output_format)
                .map(|s| s.parse::<OutputFormat>())
                .transpose()?,
            output_filename: raw.general.output_filename.unwrap_or_default(),
        };

        Ok(Self::new(credentials, key_parameters, general))
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn decode_secret(field: &str, value: Option<String>) -> Result<SecretBytes> {
    match non_blank(value) {
        None => Ok(SecretBytes::empty()),
        Some(encoded) => STANDARD
            .decode(encoded.trim())
            .map(SecretBytes::new)
            .map_err(|e| Error::Config(format!("{} is not valid base64: {}", field, e))),
    }
}

/// Accept either a JSON string or an inline mapping
fn normalise_key_parameters(value: Option<serde_json::Value>) -> Result<String> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(text)) => Ok(text),
        Some(other) => Ok(serde_json::to_string(&other)?),
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    credentials: RawCredentials,
    #[serde(default)]
    key_parameters: RawKeyParameters,
    #[serde(default)]
    general: RawGeneral,
}

#[derive(Debug, Default, Deserialize)]
struct RawCredentials {
    certificate: Option<String>,
    private_key_for_cert: Option<String>,
    url: Option<String>,
    api_key: Option<String>,
    client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawKeyParameters {
    key_type: Option<String>,
    key_algorithm: Option<String>,
    key_parameters: Option<serde_json::Value>,
    nonce: Option<String>,
    shared_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawGeneral {
    output_format: Option<String>,
    output_filename: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"
credentials:
  certificate: /etc/qo/client.pem
  private_key_for_cert: /etc/qo/client.key
  url: https://keys.example.com
  api_key: secret-api-key
  client_id: client-1
key_parameters:
  key_type: RSA-2048
  key_algorithm: EC
  key_parameters: '{"curve":"P-256"}'
  nonce: AAECAwQFBgcICQoLDA0ODw==
  shared_secret: c2hhcmVkLXNlY3JldA==
general:
  output_format: base64
  output_filename: key.b64
"#;

    #[test]
    fn test_full_document() {
        let config = KeygenConfig::from_yaml_str(FULL).unwrap();
        assert_eq!(config.credentials().certificate, "/etc/qo/client.pem");
        assert_eq!(config.credentials().url, "https://keys.example.com");
        assert_eq!(config.credentials().client_id, "client-1");
        assert_eq!(config.key_parameters().key_type, Some(KeyType::Rsa2048));
        assert_eq!(config.key_parameters().key_algorithm, Some(KeyAlgorithm::Ec));
        assert_eq!(config.key_parameters().key_parameters, r#"{"curve":"P-256"}"#);
        assert_eq!(
            config.key_parameters().nonce.expose(),
            (0u8..16).collect::<Vec<_>>().as_slice()
        );
        assert_eq!(config.key_parameters().shared_secret.expose(), b"shared-secret");
        assert_eq!(config.general().output_format, Some(OutputFormat::Base64));
        assert_eq!(config.general().output_filename, "key.b64");
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let config = KeygenConfig::from_yaml_str("credentials:\n  url: https://svc\n").unwrap();
        assert_eq!(config.credentials().url, "https://svc");
        assert_eq!(config.key_parameters(), &KeyParametersConfig::default());
        assert_eq!(config.general(), &GeneralConfig::default());
    }

    #[test]
    fn test_inline_key_parameters_mapping() {
        let yaml = "key_parameters:\n  key_algorithm: EC\n  key_parameters:\n    curve: P-384\n";
        let config = KeygenConfig::from_yaml_str(yaml).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&config.key_parameters().key_parameters).unwrap();
        assert_eq!(value["curve"], "P-384");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_secret = "key_parameters:\n  shared_secret: '***'\n";
        assert!(matches!(
            KeygenConfig::from_yaml_str(bad_secret),
            Err(Error::Config(_))
        ));

        let bad_type = "key_parameters:\n  key_type: RSA-1024\n";
        assert!(matches!(
            KeygenConfig::from_yaml_str(bad_type),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = KeygenConfig::load(file.path()).unwrap();
        assert_eq!(config.credentials().api_key, "secret-api-key");
    }

    #[test]
    fn test_load_missing_file() {
        let err = KeygenConfig::load("/nonexistent/qo-config.yaml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
