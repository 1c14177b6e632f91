//! Adapters layer: Concrete implementations of ports.
//!
//! - `bfv`: BFV scheme on the `fhe` crate
//! - `sanitize`: redaction of ciphertext and key material in logs

pub mod bfv;
pub mod sanitize;
