// SPDX-License-Identifier: MIT
//
// Quantum Origin Key Client
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! Error types for the keygen client
//!
//! Provides a unified error taxonomy using `thiserror` for ergonomic error handling.
//! Every variant belongs to exactly one [`ErrorStage`], so a caller can tell whether
//! to fix configuration, retry later, or check shared-secret provisioning.

pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    /// Parameters or configuration document are incomplete or invalid
    Configuration,
    /// The remote service could not be reached or refused the request
    Transport,
    /// The encrypted response could not be authenticated or decrypted
    Decryption,
    /// Key material could not be written to its destination
    Output,
}

/// Core error type for keygen operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither client-id nor certificate identity is complete
    #[error("Either a client ID or client cert/key parameters are required")]
    MissingIdentity,

    /// A required parameter is absent after resolution
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Configuration validation or loading failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network communication failed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Authentication rejected by the service
    #[error("Authentication failed")]
    Authentication,

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Service answered with a non-success status
    #[error("Service error: HTTP {status}: {body}")]
    Service { status: u16, body: String },

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Authenticated decryption failed
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if error is transient and retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => !e.is_builder(),
            Error::Timeout | Error::RateLimit => true,
            Error::Service { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Check if error indicates authentication failure
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Authentication)
    }

    /// Stage of the pipeline this error belongs to
    pub fn stage(&self) -> ErrorStage {
        match self {
            Error::MissingIdentity | Error::MissingParameter(_) | Error::Config(_) => {
                ErrorStage::Configuration
            }
            Error::Network(_)
            | Error::Authentication
            | Error::RateLimit
            | Error::Service { .. }
            | Error::Timeout
            | Error::Serialization(_) => ErrorStage::Transport,
            Error::Decryption(_) => ErrorStage::Decryption,
            Error::Io(_) => ErrorStage::Output,
        }
    }

    /// Name of the precondition a validation error refers to
    pub fn missing_field(&self) -> Option<&'static str> {
        match self {
            Error::MissingIdentity => Some("client ID or client cert/key parameters"),
            Error::MissingParameter(field) => Some(field),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}
