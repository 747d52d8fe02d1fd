// SPDX-License-Identifier: MIT
//
// Quantum Origin Key Client
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! QO Core Library
//!
//! This crate implements the client side of a remote key-generation service: it merges
//! invocation parameters with a configuration document, validates the result fail-closed,
//! generates a nonce when none was supplied, dispatches the key request with retries and,
//! in builds with the `decrypt` feature, decrypts the service's encrypted response.
//!
//! # Architecture
//!
//! The library is organized into modules representing core concerns:
//! - `params`: Parameter model for one invocation
//! - `config`: Configuration store (YAML + environment)
//! - `resolver`: Fill-the-gaps merge of parameters and configuration
//! - `validator`: Precondition checks and nonce generation
//! - `protocol`: Key specification vocabulary and request/response format
//! - `connection`: HTTPS transport in certificate or client-id mode
//! - `dispatcher` / `retry`: Retrying dispatch with exponential backoff
//! - `crypto`: Authenticated decryption of responses
//! - `pipeline`: Decrypting and passthrough response handling
//! - `output`: Sinks for key material
//! - `command`: The keygen command tying it all together
//! - `error`: Unified error types

pub mod command;
pub mod config;
pub mod connection;
pub mod crypto;
pub mod dispatcher;
pub mod error;
pub mod output;
pub mod params;
pub mod pipeline;
pub mod protocol;
pub mod resolver;
pub mod retry;
pub mod secret;
pub mod validator;

pub use command::KeygenCommand;
pub use error::{Error, ErrorStage, Result};
pub use params::KeygenParameters;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// True when this build can decrypt keygen responses
pub const DECRYPT_SUPPORT: bool = cfg!(feature = "decrypt");
