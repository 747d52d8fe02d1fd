// SPDX-License-Identifier: MIT
//
// Quantum Origin Key Client
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Protocol data structures for the keygen service
//!
//! Defines the key specification vocabulary, the request/response pair exchanged
//! with the service, and the output encodings for retrieved key material.
//! Binary fields travel as standard base64 inside JSON.

use crate::params::KeygenParameters;
use crate::secret::SecretBytes;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named key-type shorthand understood by the service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum KeyType {
    #[serde(rename = "AES-128")]
    Aes128,
    #[serde(rename = "AES-192")]
    Aes192,
    #[serde(rename = "AES-256")]
    Aes256,
    #[serde(rename = "RSA-2048")]
    Rsa2048,
    #[serde(rename = "RSA-3072")]
    Rsa3072,
    #[serde(rename = "RSA-4096")]
    Rsa4096,
    #[serde(rename = "EC-P256")]
    EcP256,
    #[serde(rename = "EC-P384")]
    EcP384,
    #[serde(rename = "EC-P521")]
    EcP521,
}

impl KeyType {
    pub const ALL: [KeyType; 9] = [
        Self::Aes128,
        Self::Aes192,
        Self::Aes256,
        Self::Rsa2048,
        Self::Rsa3072,
        Self::Rsa4096,
        Self::EcP256,
        Self::EcP384,
        Self::EcP521,
    ];

    /// Wire name, e.g. `RSA-2048`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes128 => "AES-128",
            Self::Aes192 => "AES-192",
            Self::Aes256 => "AES-256",
            Self::Rsa2048 => "RSA-2048",
            Self::Rsa3072 => "RSA-3072",
            Self::Rsa4096 => "RSA-4096",
            Self::EcP256 => "EC-P256",
            Self::EcP384 => "EC-P384",
            Self::EcP521 => "EC-P521",
        }
    }
}

impl FromStr for KeyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kt| kt.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| Error::Config(format!("Unknown key type '{}'", s)))
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key algorithm family, used together with an opaque JSON parameter blob
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyAlgorithm {
    Aes,
    Rsa,
    Ec,
    Oct,
}

impl KeyAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes => "AES",
            Self::Rsa => "RSA",
            Self::Ec => "EC",
            Self::Oct => "OCT",
        }
    }
}

impl FromStr for KeyAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AES" => Ok(Self::Aes),
            "RSA" => Ok(Self::Rsa),
            "EC" => Ok(Self::Ec),
            "OCT" => Ok(Self::Oct),
            _ => Err(Error::Config(format!("Unknown key algorithm '{}'", s))),
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoding format for emitted key material
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raw binary data
    Binary,
    /// Hexadecimal encoding
    #[default]
    Hex,
    /// Base64 encoding
    Base64,
}

impl OutputFormat {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "binary" | "raw" => Some(Self::Binary),
            "hex" | "hexadecimal" => Some(Self::Hex),
            "base64" | "b64" => Some(Self::Base64),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::Config(format!("Unknown output format '{}'", s)))
    }
}

/// One logical key request
///
/// The type-based form always wins when a key type is known; the algorithm form
/// carries the caller's parameter JSON verbatim (parsed, not interpreted).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum KeyRequest {
    Type {
        key_type: KeyType,
        #[serde(with = "b64_secret")]
        nonce: SecretBytes,
    },
    Algorithm {
        key_algorithm: KeyAlgorithm,
        key_parameters: serde_json::Value,
        #[serde(with = "b64_secret")]
        nonce: SecretBytes,
    },
}

impl KeyRequest {
    /// Build the request from validated parameters
    pub fn from_parameters(params: &KeygenParameters) -> Result<Self> {
        let nonce = params.decryption.nonce.clone();
        if nonce.is_empty() {
            return Err(Error::MissingParameter("Nonce"));
        }

        if let Some(key_type) = params.key_type {
            return Ok(Self::Type { key_type, nonce });
        }

        let key_algorithm = params
            .key_algorithm
            .ok_or(Error::MissingParameter("Key type or algorithm"))?;
        if params.key_parameters.json.trim().is_empty() {
            return Err(Error::MissingParameter("Key parameters"));
        }
        let key_parameters = serde_json::from_str(&params.key_parameters.json)
            .map_err(|e| Error::Config(format!("Key parameters are not valid JSON: {}", e)))?;

        Ok(Self::Algorithm {
            key_algorithm,
            key_parameters,
            nonce,
        })
    }

    pub fn nonce(&self) -> &SecretBytes {
        match self {
            Self::Type { nonce, .. } | Self::Algorithm { nonce, .. } => nonce,
        }
    }

    /// Short description for logs, without the nonce
    pub fn describe(&self) -> String {
        match self {
            Self::Type { key_type, .. } => format!("type {}", key_type),
            Self::Algorithm { key_algorithm, .. } => format!("algorithm {}", key_algorithm),
        }
    }
}

/// Encrypted key material as returned by the service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// AES-GCM ciphertext with the 16-byte tag appended
    #[serde(with = "b64_bytes")]
    pub encrypted_data: Vec<u8>,

    /// 12-byte GCM initialisation vector
    #[serde(with = "b64_bytes")]
    pub iv: Vec<u8>,
}

/// Keygen service response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyResponse {
    pub encrypted: EncryptedPayload,

    /// Monotonic request counter reported by the service
    #[serde(default)]
    pub counter: Option<u64>,
}

mod b64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

mod b64_secret {
    use crate::secret::SecretBytes;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::Serializer;

    pub fn serialize<S: Serializer>(secret: &SecretBytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(secret.expose()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::KeyParameters;

    fn params_with_nonce() -> KeygenParameters {
        let mut params = KeygenParameters::default();
        params.decryption.nonce = SecretBytes::new(vec![7u8; 16]);
        params
    }

    #[test]
    fn test_key_type_parsing() {
        assert_eq!("RSA-2048".parse::<KeyType>().unwrap(), KeyType::Rsa2048);
        assert_eq!("rsa_2048".parse::<KeyType>().unwrap(), KeyType::Rsa2048);
        assert_eq!("ec-p256".parse::<KeyType>().unwrap(), KeyType::EcP256);
        assert!("RSA-1024".parse::<KeyType>().is_err());
    }

    #[test]
    fn test_key_algorithm_parsing() {
        assert_eq!("ec".parse::<KeyAlgorithm>().unwrap(), KeyAlgorithm::Ec);
        assert!("DSA".parse::<KeyAlgorithm>().is_err());
    }

    #[test]
    fn test_output_format() {
        assert_eq!(OutputFormat::parse("hex"), Some(OutputFormat::Hex));
        assert_eq!(OutputFormat::parse("HEX"), Some(OutputFormat::Hex));
        assert_eq!(OutputFormat::parse("raw"), Some(OutputFormat::Binary));
        assert_eq!(OutputFormat::parse("b64"), Some(OutputFormat::Base64));
        assert_eq!(OutputFormat::parse("pem"), None);
    }

    #[test]
    fn test_type_beats_algorithm() {
        let mut params = params_with_nonce();
        params.key_type = Some(KeyType::Rsa2048);
        params.key_algorithm = Some(KeyAlgorithm::Ec);
        params.key_parameters = KeyParameters {
            json: r#"{"curve":"P-256"}"#.into(),
        };

        let request = KeyRequest::from_parameters(&params).unwrap();
        assert!(matches!(
            request,
            KeyRequest::Type { key_type: KeyType::Rsa2048, .. }
        ));
    }

    #[test]
    fn test_algorithm_request() {
        let mut params = params_with_nonce();
        params.key_algorithm = Some(KeyAlgorithm::Ec);
        params.key_parameters.json = r#"{"curve":"P-256"}"#.into();

        let request = KeyRequest::from_parameters(&params).unwrap();
        match request {
            KeyRequest::Algorithm {
                key_algorithm,
                key_parameters,
                ..
            } => {
                assert_eq!(key_algorithm, KeyAlgorithm::Ec);
                assert_eq!(key_parameters["curve"], "P-256");
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_invalid_key_parameters_json() {
        let mut params = params_with_nonce();
        params.key_algorithm = Some(KeyAlgorithm::Rsa);
        params.key_parameters.json = "{not json".into();

        let err = KeyRequest::from_parameters(&params).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_request_wire_shape() {
        let mut params = params_with_nonce();
        params.key_type = Some(KeyType::Aes256);
        let request = KeyRequest::from_parameters(&params).unwrap();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["key_type"], "AES-256");
        assert_eq!(body["nonce"], "BwcHBwcHBwcHBwcHBwcHBw==");
        assert!(body.get("key_algorithm").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{"encrypted":{"encrypted_data":"AQID","iv":"AAAAAAAAAAAAAAAA"},"counter":12}"#;
        let response: KeyResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.encrypted.encrypted_data, vec![1, 2, 3]);
        assert_eq!(response.encrypted.iv.len(), 12);
        assert_eq!(response.counter, Some(12));
    }
}
