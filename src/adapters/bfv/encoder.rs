//! Batch encoder for single integers.
//!
//! A plaintext holds `slot_count` slots; only slot 0 carries a value, the
//! rest are zero. Slot vectors are wiped on drop.

use std::sync::Arc;

use fhe::bfv::{BfvParameters, Encoding, Plaintext};
use fhe_traits::{FheDecoder, FheEncoder};
use zeroize::Zeroizing;

use crate::domain::{CryptoError, Operation};

#[derive(Debug, Clone)]
pub struct BatchEncoder {
    params: Arc<BfvParameters>,
    plaintext_modulus: u64,
    slot_count: usize,
}

impl BatchEncoder {
    pub fn new(params: &Arc<BfvParameters>, plaintext_modulus: u64, slot_count: usize) -> Self {
        Self {
            params: Arc::clone(params),
            plaintext_modulus,
            slot_count,
        }
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    #[must_use]
    pub fn plaintext_modulus(&self) -> u64 {
        self.plaintext_modulus
    }

    /// Reduce `value` into `[0, plaintext_modulus)` with wraparound.
    #[must_use]
    pub fn reduce(&self, value: i64) -> u64 {
        i128::from(value).rem_euclid(i128::from(self.plaintext_modulus)) as u64
    }

    /// Place `value` (reduced) into slot 0 of a zero-filled slot vector.
    ///
    /// # Errors
    /// Returns `CryptoError::Encryption` if the library rejects the encoding.
    pub fn encode_int(&self, value: i64, operation: Operation) -> Result<Plaintext, CryptoError> {
        let mut slots = Zeroizing::new(vec![0u64; self.slot_count]);
        if let Some(first) = slots.first_mut() {
            *first = self.reduce(value);
        }

        Plaintext::try_encode(slots.as_slice(), Encoding::simd(), &self.params).map_err(|e| {
            CryptoError::Encryption {
                operation,
                reason: format!("batch encoding failed: {e}"),
            }
        })
    }

    /// Read slot 0 of a decrypted plaintext.
    ///
    /// # Errors
    /// Returns `CryptoError::Decryption` if decoding fails or yields no slots.
    pub fn decode_int(&self, plaintext: &Plaintext, operation: Operation) -> Result<u64, CryptoError> {
        let slots = Zeroizing::new(Vec::<u64>::try_decode(plaintext, Encoding::simd()).map_err(
            |e| CryptoError::Decryption {
                operation,
                reason: format!("batch decoding failed: {e}"),
            },
        )?);

        slots.first().copied().ok_or_else(|| CryptoError::Decryption {
            operation,
            reason: "decoded slot vector is empty".into(),
        })
    }
}
