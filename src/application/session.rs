//! Encryption session: one immutable context per parameter set.
//!
//! A `Session` owns the engine context (keys, encoder), the codec and the
//! depth policy. It is never mutated after construction, so it can be
//! shared across threads behind an `Arc` and used without locking.
//!
//! # Wire format
//!
//! Every ciphertext leaving a session is a `CiphertextEnvelope` carrying
//! the session fingerprint and the multiplicative depth, encoded as text by
//! the `Codec`. Envelopes from another session (different parameters or a
//! replaced key set) are rejected as malformed.

use std::fmt;
use std::sync::Arc;

use crate::domain::{
    compute_fingerprint, CiphertextEnvelope, Codec, CodecMode, CryptoError, EncodedCiphertext,
    Operation, SchemeParameters,
};
use crate::ports::FheEngine;

/// Multiplicative depth that is guaranteed to decrypt correctly.
///
/// This is the promised level, not the measured capacity of the default
/// parameters: a depth-2 product usually still decrypts correctly, depth 3
/// does not. Under `DepthPolicy::Unchecked` nothing past this level is
/// reported as an error.
pub const SUPPORTED_DEPTH: u8 = 1;

/// What to do when a multiply would exceed `SUPPORTED_DEPTH`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DepthPolicy {
    /// Compute anyway and log a warning. Past `SUPPORTED_DEPTH` the result
    /// may decrypt to an incorrect integer; callers keep circuits within
    /// one level.
    #[default]
    Unchecked,
    /// Fail with `CryptoError::NoiseBudgetExhausted`.
    Enforce,
}

/// Per-session behaviour that is not part of the scheme parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub codec_mode: CodecMode,
    pub depth_policy: DepthPolicy,
}

/// An initialized encryption context.
pub struct Session<E: FheEngine> {
    engine: Arc<E>,
    context: E::Context,
    parameters: SchemeParameters,
    fingerprint: String,
    codec: Codec,
    depth_policy: DepthPolicy,
}

impl<E: FheEngine> Session<E> {
    /// Validate `parameters`, generate keys and build a session.
    ///
    /// # Errors
    /// Returns `CryptoError::Parameter` or `CryptoError::KeyGeneration`.
    pub fn new(
        engine: Arc<E>,
        parameters: SchemeParameters,
        options: SessionOptions,
    ) -> Result<Self, CryptoError> {
        let context = engine.setup(&parameters)?;
        let material = engine.public_material(&context);
        let fingerprint = compute_fingerprint(material.iter().map(Vec::as_slice));

        tracing::info!(
            fingerprint = %fingerprint,
            codec = ?options.codec_mode,
            depth_policy = ?options.depth_policy,
            "Encryption session ready"
        );

        Ok(Self {
            engine,
            context,
            parameters,
            fingerprint,
            codec: Codec::new(options.codec_mode),
            depth_policy: options.depth_policy,
        })
    }

    #[must_use]
    pub fn parameters(&self) -> &SchemeParameters {
        &self.parameters
    }

    /// Fingerprint binding ciphertexts to this session (not secret).
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    #[must_use]
    pub fn codec(&self) -> Codec {
        self.codec
    }

    #[must_use]
    pub fn depth_policy(&self) -> DepthPolicy {
        self.depth_policy
    }

    #[must_use]
    pub fn context(&self) -> &E::Context {
        &self.context
    }

    /// Encrypt an integer. The value is reduced modulo the plaintext modulus.
    ///
    /// # Errors
    /// Returns `CryptoError::Encryption` if the engine fails.
    pub fn encrypt_value(&self, value: i64) -> Result<EncodedCiphertext, CryptoError> {
        let operation = Operation::Encrypt;
        let body = self.engine.encrypt(&self.context, value)?;
        self.seal(body, 0, operation)
    }

    /// Decrypt a ciphertext and return the residue in `[0, plaintext_modulus)`.
    ///
    /// # Errors
    /// Returns `CryptoError::MalformedCiphertext` for text that is not a
    /// ciphertext of this session, `CryptoError::Decryption` if the decoded
    /// plaintext is unusable.
    pub fn decrypt_value(&self, ciphertext: &EncodedCiphertext) -> Result<u64, CryptoError> {
        let operation = Operation::Decrypt;
        let envelope = self.open(ciphertext, operation)?;
        if envelope.depth > SUPPORTED_DEPTH {
            tracing::warn!(
                depth = envelope.depth,
                "Decrypting beyond the supported multiplicative depth; result is unreliable"
            );
        }
        self.engine.decrypt(&self.context, &envelope.body)
    }

    /// Homomorphic addition.
    ///
    /// # Errors
    /// Returns `CryptoError::MalformedCiphertext` if an operand is not a
    /// ciphertext of this session.
    pub fn add_encrypted(
        &self,
        a: &EncodedCiphertext,
        b: &EncodedCiphertext,
    ) -> Result<EncodedCiphertext, CryptoError> {
        let operation = Operation::Add;
        let (a, b) = (self.open(a, operation)?, self.open(b, operation)?);
        let body = self.engine.add(&self.context, &a.body, &b.body)?;
        self.seal(body, a.depth.max(b.depth), operation)
    }

    /// Homomorphic subtraction (`a - b`).
    ///
    /// # Errors
    /// Returns `CryptoError::MalformedCiphertext` if an operand is not a
    /// ciphertext of this session.
    pub fn subtract_encrypted(
        &self,
        a: &EncodedCiphertext,
        b: &EncodedCiphertext,
    ) -> Result<EncodedCiphertext, CryptoError> {
        let operation = Operation::Subtract;
        let (a, b) = (self.open(a, operation)?, self.open(b, operation)?);
        let body = self.engine.sub(&self.context, &a.body, &b.body)?;
        self.seal(body, a.depth.max(b.depth), operation)
    }

    /// Homomorphic multiplication, relinearized before it is returned.
    ///
    /// # Errors
    /// Returns `CryptoError::Capability` if the parameters lack key
    /// switching, `CryptoError::MalformedCiphertext` for a bad operand and,
    /// under `DepthPolicy::Enforce`, `CryptoError::NoiseBudgetExhausted`.
    pub fn multiply_encrypted(
        &self,
        a: &EncodedCiphertext,
        b: &EncodedCiphertext,
    ) -> Result<EncodedCiphertext, CryptoError> {
        let operation = Operation::Multiply;
        if !self.engine.supports_key_switching(&self.context) {
            return Err(CryptoError::Capability {
                operation,
                reason: "active parameters do not support relinearization".into(),
            });
        }

        let (a, b) = (self.open(a, operation)?, self.open(b, operation)?);
        let depth = a.depth.saturating_add(b.depth).saturating_add(1);
        if depth > SUPPORTED_DEPTH {
            match self.depth_policy {
                DepthPolicy::Enforce => {
                    return Err(CryptoError::NoiseBudgetExhausted {
                        operation,
                        depth,
                        max_depth: SUPPORTED_DEPTH,
                    });
                }
                DepthPolicy::Unchecked => tracing::warn!(
                    depth,
                    max_depth = SUPPORTED_DEPTH,
                    "Multiplying beyond the supported depth; result may not decrypt correctly"
                ),
            }
        }

        let body = self.engine.multiply(&self.context, &a.body, &b.body)?;
        self.seal(body, depth, operation)
    }

    fn seal(
        &self,
        body: Vec<u8>,
        depth: u8,
        operation: Operation,
    ) -> Result<EncodedCiphertext, CryptoError> {
        let envelope = CiphertextEnvelope::new(body, self.fingerprint.clone(), depth);
        let bytes = envelope.to_bytes(operation)?;
        let text = self.codec.encode(&bytes);
        tracing::debug!(
            operation = %operation,
            depth,
            ciphertext_bytes = envelope.size_bytes(),
            text_bytes = text.len(),
            "Ciphertext produced"
        );
        Ok(EncodedCiphertext::from(text))
    }

    fn open(
        &self,
        ciphertext: &EncodedCiphertext,
        operation: Operation,
    ) -> Result<CiphertextEnvelope, CryptoError> {
        let bytes = self
            .codec
            .decode(ciphertext.as_str())
            .map_err(|e| CryptoError::malformed(operation, e.to_string()))?;
        let envelope = CiphertextEnvelope::from_bytes(&bytes, operation)?;

        if envelope.key_fingerprint != self.fingerprint {
            tracing::warn!(
                operation = %operation,
                expected = %self.fingerprint,
                found = %envelope.key_fingerprint,
                "Rejected ciphertext from another session"
            );
            return Err(CryptoError::malformed(
                operation,
                format!(
                    "ciphertext belongs to session {}, active session is {}",
                    envelope.key_fingerprint, self.fingerprint
                ),
            ));
        }
        Ok(envelope)
    }
}

impl<E: FheEngine> fmt::Debug for Session<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("parameters", &self.parameters)
            .field("fingerprint", &self.fingerprint)
            .field("codec", &self.codec)
            .field("depth_policy", &self.depth_policy)
            .finish_non_exhaustive()
    }
}
