//! Arithmetic service: the host-facing surface with lifecycle state.
//!
//! The service holds at most one active `Session`. `init` builds a fresh
//! session (new keys) and swaps it in; every other operation clones the
//! current `Arc<Session>` under a short read lock and computes on that
//! snapshot, so a concurrent `init` never exposes a half-built session.

use std::sync::{Arc, PoisonError, RwLock};

use crate::application::session::{Session, SessionOptions};
use crate::domain::{CryptoError, EncodedCiphertext, Operation, SchemeParameters};
use crate::ports::FheEngine;

pub struct ArithmeticService<E: FheEngine> {
    engine: Arc<E>,
    parameters: SchemeParameters,
    options: SessionOptions,
    state: RwLock<Option<Arc<Session<E>>>>,
}

impl<E: FheEngine> ArithmeticService<E> {
    /// Create an uninitialized service. Nothing is generated until `init`.
    pub fn new(engine: E, parameters: SchemeParameters, options: SessionOptions) -> Self {
        Self {
            engine: Arc::new(engine),
            parameters,
            options,
            state: RwLock::new(None),
        }
    }

    /// Generate a new key set and make it the active session.
    ///
    /// Any previous session is replaced; its ciphertexts are rejected from
    /// then on. On failure the previous session (if any) stays active.
    ///
    /// # Errors
    /// Returns `CryptoError::Parameter` or `CryptoError::KeyGeneration`.
    pub fn init(&self) -> Result<(), CryptoError> {
        let session = Session::new(
            Arc::clone(&self.engine),
            self.parameters.clone(),
            self.options,
        )?;
        let fingerprint = session.fingerprint().to_string();

        let mut slot = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let replaced = slot.replace(Arc::new(session));
        drop(slot);

        match replaced {
            Some(old) => tracing::info!(
                previous = %old.fingerprint(),
                current = %fingerprint,
                "Encryption session replaced"
            ),
            None => tracing::info!(current = %fingerprint, "Encryption session installed"),
        }
        Ok(())
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.current().is_some()
    }

    /// Parameters the next `init` will use.
    #[must_use]
    pub fn parameters(&self) -> &SchemeParameters {
        &self.parameters
    }

    #[must_use]
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Fingerprint of the active session, if any.
    #[must_use]
    pub fn fingerprint(&self) -> Option<String> {
        self.current().map(|s| s.fingerprint().to_string())
    }

    /// Snapshot of the active session.
    ///
    /// # Errors
    /// Returns `CryptoError::NotInitialized` if `init` has not succeeded yet.
    pub fn session(&self) -> Result<Arc<Session<E>>, CryptoError> {
        self.session_for(Operation::Init)
    }

    /// # Errors
    /// See `Session::encrypt_value`; `NotInitialized` without a session.
    pub fn encrypt_value(&self, value: i64) -> Result<EncodedCiphertext, CryptoError> {
        self.session_for(Operation::Encrypt)?.encrypt_value(value)
    }

    /// # Errors
    /// See `Session::decrypt_value`; `NotInitialized` without a session.
    pub fn decrypt_value(&self, ciphertext: &EncodedCiphertext) -> Result<u64, CryptoError> {
        self.session_for(Operation::Decrypt)?.decrypt_value(ciphertext)
    }

    /// # Errors
    /// See `Session::add_encrypted`; `NotInitialized` without a session.
    pub fn add_encrypted(
        &self,
        a: &EncodedCiphertext,
        b: &EncodedCiphertext,
    ) -> Result<EncodedCiphertext, CryptoError> {
        self.session_for(Operation::Add)?.add_encrypted(a, b)
    }

    /// # Errors
    /// See `Session::subtract_encrypted`; `NotInitialized` without a session.
    pub fn subtract_encrypted(
        &self,
        a: &EncodedCiphertext,
        b: &EncodedCiphertext,
    ) -> Result<EncodedCiphertext, CryptoError> {
        self.session_for(Operation::Subtract)?.subtract_encrypted(a, b)
    }

    /// # Errors
    /// See `Session::multiply_encrypted`; `NotInitialized` without a session.
    pub fn multiply_encrypted(
        &self,
        a: &EncodedCiphertext,
        b: &EncodedCiphertext,
    ) -> Result<EncodedCiphertext, CryptoError> {
        self.session_for(Operation::Multiply)?.multiply_encrypted(a, b)
    }

    fn current(&self) -> Option<Arc<Session<E>>> {
        // The slot only ever holds a fully built session, so a poisoned
        // lock still guards consistent data.
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Arc::clone)
    }

    fn session_for(&self, operation: Operation) -> Result<Arc<Session<E>>, CryptoError> {
        self.current()
            .ok_or(CryptoError::NotInitialized { operation })
    }
}

impl<E: FheEngine + std::fmt::Debug> std::fmt::Debug for ArithmeticService<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArithmeticService")
            .field("engine", &self.engine)
            .field("parameters", &self.parameters)
            .field("options", &self.options)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}
