//! FHE Engine port: Trait for homomorphic encryption primitives.
//!
//! This trait abstracts the primitive library (fhe.rs, BFV) from the
//! session and service logic. Ciphertexts cross this boundary in the
//! library's own binary serialization.

use crate::domain::{CryptoError, SchemeParameters};

/// Trait for FHE operations on single integers.
///
/// Implementations provide:
/// - Parameter validation and key generation with a CSPRNG
/// - Batch encoding of one integer into slot 0
/// - Encryption with the public key, decryption with the secret key
/// - Addition, subtraction and relinearized multiplication on ciphertexts
pub trait FheEngine: Send + Sync {
    /// Validated parameters, key material and encoder produced by `setup`.
    ///
    /// A context is immutable; every ciphertext it accepts or produces is
    /// bound to the parameter set it was built from.
    type Context: Send + Sync;

    /// Validate the parameters and derive all key material from them.
    ///
    /// # Errors
    /// Returns `CryptoError::Parameter` if the library rejects the
    /// parameters, `CryptoError::KeyGeneration` if key generation fails.
    fn setup(&self, params: &SchemeParameters) -> Result<Self::Context, CryptoError>;

    /// Public, non-secret material identifying the context (serialized
    /// parameters and public key). Used to fingerprint sessions.
    fn public_material(&self, ctx: &Self::Context) -> Vec<Vec<u8>>;

    /// Whether the context holds a relinearization key.
    fn supports_key_switching(&self, ctx: &Self::Context) -> bool;

    /// Encrypt an integer into slot 0 of a fresh ciphertext.
    ///
    /// The value is reduced modulo the plaintext modulus first.
    ///
    /// # Errors
    /// Returns `CryptoError::Encryption` if encoding or encryption fails.
    fn encrypt(&self, ctx: &Self::Context, value: i64) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt a ciphertext and return slot 0, in `[0, plaintext_modulus)`.
    ///
    /// # Errors
    /// Returns `CryptoError::MalformedCiphertext` if the bytes do not parse
    /// under the context's parameters, `CryptoError::Decryption` if the
    /// decoded plaintext is unusable.
    fn decrypt(&self, ctx: &Self::Context, ciphertext: &[u8]) -> Result<u64, CryptoError>;

    /// Homomorphic addition.
    ///
    /// # Errors
    /// Returns `CryptoError::MalformedCiphertext` if an operand does not parse.
    fn add(&self, ctx: &Self::Context, a: &[u8], b: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Homomorphic subtraction (`a - b`).
    ///
    /// # Errors
    /// Returns `CryptoError::MalformedCiphertext` if an operand does not parse.
    fn sub(&self, ctx: &Self::Context, a: &[u8], b: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Homomorphic multiplication followed by relinearization.
    ///
    /// # Errors
    /// Returns `CryptoError::Capability` if the context has no
    /// relinearization key, `CryptoError::MalformedCiphertext` if an
    /// operand does not parse.
    fn multiply(&self, ctx: &Self::Context, a: &[u8], b: &[u8]) -> Result<Vec<u8>, CryptoError>;
}
