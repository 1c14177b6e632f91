//! Cryptographic domain types shared by every layer.
//!
//! - `Operation`: the exposed operations, used to tag errors and logs
//! - `CryptoError`: the error taxonomy returned by all operations
//! - `EncodedCiphertext`: the text form that crosses the process boundary
//! - `CiphertextEnvelope`: the binary form behind the text, binding a
//!   ciphertext to the session that produced it

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current envelope layout version.
pub const ENVELOPE_VERSION: u8 = 1;

/// The operations exposed by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Init,
    Encrypt,
    Decrypt,
    Add,
    Subtract,
    Multiply,
}

impl Operation {
    /// Every operation, in the order they are documented.
    pub const ALL: [Operation; 6] = [
        Operation::Init,
        Operation::Encrypt,
        Operation::Decrypt,
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
    ];

    /// External name of the operation.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::Encrypt => "encrypt_value",
            Operation::Decrypt => "decrypt_value",
            Operation::Add => "add_encrypted",
            Operation::Subtract => "subtract_encrypted",
            Operation::Multiply => "multiply_encrypted",
        }
    }

    /// Resolve an external name (or its short alias) to an operation.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "init" => Some(Operation::Init),
            "encrypt_value" | "encrypt" => Some(Operation::Encrypt),
            "decrypt_value" | "decrypt" => Some(Operation::Decrypt),
            "add_encrypted" | "add" => Some(Operation::Add),
            "subtract_encrypted" | "sub" => Some(Operation::Subtract),
            "multiply_encrypted" | "mul" => Some(Operation::Multiply),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error type for cryptographic operations.
///
/// Every variant names the operation that failed. None of these are
/// retried internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CryptoError {
    #[error("{operation}: invalid scheme parameters: {reason}")]
    Parameter { operation: Operation, reason: String },

    #[error("{operation}: encryption context is not initialized (call init first)")]
    NotInitialized { operation: Operation },

    #[error("{operation}: malformed ciphertext: {reason}")]
    MalformedCiphertext { operation: Operation, reason: String },

    #[error("{operation}: decryption failed: {reason}")]
    Decryption { operation: Operation, reason: String },

    #[error("{operation}: unsupported by the active parameters: {reason}")]
    Capability { operation: Operation, reason: String },

    #[error(
        "{operation}: noise budget exhausted (multiplicative depth {depth} exceeds supported depth {max_depth})"
    )]
    NoiseBudgetExhausted {
        operation: Operation,
        depth: u8,
        max_depth: u8,
    },

    #[error("{operation}: key generation failed: {reason}")]
    KeyGeneration { operation: Operation, reason: String },

    #[error("{operation}: encryption failed: {reason}")]
    Encryption { operation: Operation, reason: String },

    #[error("{operation}: homomorphic evaluation failed: {reason}")]
    Evaluation { operation: Operation, reason: String },
}

impl CryptoError {
    /// The operation that produced this error.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            CryptoError::Parameter { operation, .. }
            | CryptoError::NotInitialized { operation }
            | CryptoError::MalformedCiphertext { operation, .. }
            | CryptoError::Decryption { operation, .. }
            | CryptoError::Capability { operation, .. }
            | CryptoError::NoiseBudgetExhausted { operation, .. }
            | CryptoError::KeyGeneration { operation, .. }
            | CryptoError::Encryption { operation, .. }
            | CryptoError::Evaluation { operation, .. } => *operation,
        }
    }

    pub(crate) fn malformed(operation: Operation, reason: impl Into<String>) -> Self {
        CryptoError::MalformedCiphertext {
            operation,
            reason: reason.into(),
        }
    }
}

/// A ciphertext in its transport text form.
///
/// The text is URL-safe and its length is always a multiple of 4.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EncodedCiphertext(String);

impl EncodedCiphertext {
    /// Wrap text received from a caller. No validation happens here; the
    /// text is checked when an operation decodes it.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Length of the text form in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EncodedCiphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Ciphertexts are large; keep them out of debug output.
impl fmt::Debug for EncodedCiphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedCiphertext")
            .field("size_bytes", &self.0.len())
            .finish()
    }
}

impl From<String> for EncodedCiphertext {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for EncodedCiphertext {
    fn from(text: &str) -> Self {
        Self(text.to_owned())
    }
}

impl AsRef<str> for EncodedCiphertext {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Binary wire form of a ciphertext.
///
/// Wraps the primitive library's serialization with the fingerprint of the
/// session that produced it and the number of multiplications on its path.
#[derive(Clone, Serialize, Deserialize)]
pub struct CiphertextEnvelope {
    /// Layout version
    pub version: u8,

    /// Fingerprint of the session (parameters + public key)
    pub key_fingerprint: String,

    /// Multiplicative depth consumed so far
    pub depth: u8,

    /// Serialized ciphertext
    pub body: Vec<u8>,
}

impl CiphertextEnvelope {
    /// Create a new envelope at the current layout version.
    pub fn new(body: Vec<u8>, key_fingerprint: String, depth: u8) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            key_fingerprint,
            depth,
            body,
        }
    }

    /// Serialize the envelope.
    ///
    /// # Errors
    /// Returns `CryptoError::Encryption` if serialization fails.
    pub fn to_bytes(&self, operation: Operation) -> Result<Vec<u8>, CryptoError> {
        bincode::serialize(self).map_err(|e| CryptoError::Encryption {
            operation,
            reason: format!("failed to serialize ciphertext envelope: {e}"),
        })
    }

    /// Parse an envelope, checking the layout version.
    ///
    /// # Errors
    /// Returns `CryptoError::MalformedCiphertext` if the bytes are not an
    /// envelope of the current version.
    pub fn from_bytes(bytes: &[u8], operation: Operation) -> Result<Self, CryptoError> {
        if bytes.is_empty() {
            return Err(CryptoError::malformed(operation, "empty input"));
        }
        let envelope: CiphertextEnvelope = bincode::deserialize(bytes)
            .map_err(|e| CryptoError::malformed(operation, format!("not a ciphertext envelope: {e}")))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(CryptoError::malformed(
                operation,
                format!(
                    "unsupported envelope version {} (expected {ENVELOPE_VERSION})",
                    envelope.version
                ),
            ));
        }
        if envelope.body.is_empty() {
            return Err(CryptoError::malformed(operation, "envelope carries no ciphertext"));
        }
        Ok(envelope)
    }

    /// Size of the wrapped ciphertext in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.body.len()
    }
}

impl fmt::Debug for CiphertextEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CiphertextEnvelope")
            .field("version", &self.version)
            .field("key_fingerprint", &self.key_fingerprint)
            .field("depth", &self.depth)
            .field("size_bytes", &self.body.len())
            .finish()
    }
}

/// Compute a fingerprint over a sequence of byte strings using SHA-256.
///
/// Each part is length-prefixed so that part boundaries are unambiguous.
/// Returns the first 8 bytes of the digest as hex.
pub fn compute_fingerprint<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let result = hasher.finalize();

    result[..8].iter().map(|b| format!("{b:02x}")).collect()
}
