//! # Ciphercalc
//!
//! Encrypted integer arithmetic using the BFV homomorphic encryption scheme.
//!
//! This crate provides:
//! - Encryption of integers into URL-safe text ciphertexts
//! - Addition, subtraction and multiplication on ciphertexts
//! - Decryption back to an integer modulo the plaintext modulus
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (parameters, envelopes, codec, errors)
//! - `ports`: The `FheEngine` trait
//! - `adapters`: Concrete implementations (`fhe` BFV, log sanitization)
//! - `application`: Sessions, the service surface and the line protocol
//! - `config`: Environment-driven configuration
//!
//! ## Example
//!
//! ```no_run
//! use ciphercalc::adapters::bfv::BfvAdapter;
//! use ciphercalc::application::{ArithmeticService, SessionOptions};
//! use ciphercalc::domain::SchemeParameters;
//!
//! let service = ArithmeticService::new(
//!     BfvAdapter::new(),
//!     SchemeParameters::default(),
//!     SessionOptions::default(),
//! );
//! service.init()?;
//! let a = service.encrypt_value(7)?;
//! let b = service.encrypt_value(5)?;
//! let product = service.multiply_encrypted(&a, &b)?;
//! assert_eq!(service.decrypt_value(&product)?, 35);
//! # Ok::<(), ciphercalc::domain::CryptoError>(())
//! ```

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{ArithmeticService, Session};
pub use config::ServiceConfig;
pub use domain::{CryptoError, EncodedCiphertext};

/// Result type for Ciphercalc operations
pub type Result<T> = std::result::Result<T, CiphercalcError>;

/// Main error type for Ciphercalc
#[derive(Debug, thiserror::Error)]
pub enum CiphercalcError {
    #[error(transparent)]
    Crypto(#[from] domain::CryptoError),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
