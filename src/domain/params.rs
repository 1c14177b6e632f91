//! Scheme parameters for the BFV context.
//!
//! The defaults are sized for exactly one multiplicative level at ring
//! degree 4096 with batching enabled.

use serde::{Deserialize, Serialize};

use super::crypto::{CryptoError, Operation};

/// Default ring degree (number of polynomial coefficients and batching slots).
pub const DEFAULT_DEGREE: usize = 4096;

/// Default coefficient-modulus chain, as prime bit sizes (109 bits total).
pub const DEFAULT_MODULI_BITS: [usize; 3] = [36, 36, 37];

/// Default plaintext modulus: a 20-bit prime congruent to 1 mod 8192.
pub const DEFAULT_PLAINTEXT_MODULUS: u64 = 1_032_193;

/// Smallest ring degree the primitive library accepts.
const MIN_DEGREE: usize = 8;

/// Largest ring degree we allow.
const MAX_DEGREE: usize = 1 << 15;

/// Supported prime sizes for the coefficient-modulus chain.
const MODULUS_BITS_RANGE: std::ops::RangeInclusive<usize> = 10..=62;

/// Fixed description of the encryption scheme.
///
/// Immutable once a session has been built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemeParameters {
    /// Ring degree (power of two).
    pub degree: usize,

    /// Bit sizes of the primes in the coefficient-modulus chain.
    pub moduli_bits: Vec<usize>,

    /// Plaintext modulus (prime, congruent to 1 mod 2 * degree).
    pub plaintext_modulus: u64,
}

impl Default for SchemeParameters {
    fn default() -> Self {
        Self {
            degree: DEFAULT_DEGREE,
            moduli_bits: DEFAULT_MODULI_BITS.to_vec(),
            plaintext_modulus: DEFAULT_PLAINTEXT_MODULUS,
        }
    }
}

impl SchemeParameters {
    /// Structural checks that do not need the primitive library.
    ///
    /// The library runs its own validation afterwards (prime generation,
    /// NTT support); both must pass before any key is generated.
    ///
    /// # Errors
    /// Returns `CryptoError::Parameter` describing the first violated rule.
    pub fn validate(&self) -> Result<(), CryptoError> {
        let fail = |reason: String| {
            Err(CryptoError::Parameter {
                operation: Operation::Init,
                reason,
            })
        };

        if !self.degree.is_power_of_two() || !(MIN_DEGREE..=MAX_DEGREE).contains(&self.degree) {
            return fail(format!(
                "ring degree {} must be a power of two in [{MIN_DEGREE}, {MAX_DEGREE}]",
                self.degree
            ));
        }

        if self.moduli_bits.is_empty() {
            return fail("coefficient modulus chain is empty".into());
        }
        if let Some(bits) = self
            .moduli_bits
            .iter()
            .find(|&&b| !MODULUS_BITS_RANGE.contains(&b))
        {
            return fail(format!(
                "coefficient modulus size {bits} bits is outside {}..={}",
                MODULUS_BITS_RANGE.start(),
                MODULUS_BITS_RANGE.end()
            ));
        }

        if self.plaintext_modulus < 2 {
            return fail(format!(
                "plaintext modulus {} is too small",
                self.plaintext_modulus
            ));
        }
        let two_n = 2 * self.degree as u64;
        if (self.plaintext_modulus - 1) % two_n != 0 {
            return fail(format!(
                "plaintext modulus {} does not support batching (must be 1 mod {two_n})",
                self.plaintext_modulus
            ));
        }

        let total_bits: usize = self.moduli_bits.iter().sum();
        let plain_bits = 64 - self.plaintext_modulus.leading_zeros() as usize;
        if plain_bits >= total_bits {
            return fail(format!(
                "plaintext modulus ({plain_bits} bits) must be smaller than the coefficient modulus ({total_bits} bits)"
            ));
        }

        Ok(())
    }

    /// Whether the modulus chain leaves room for key switching.
    ///
    /// Relinearization needs at least two primes in the chain.
    #[must_use]
    pub fn supports_key_switching(&self) -> bool {
        self.moduli_bits.len() > 1
    }

    /// Number of batching slots in a plaintext.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.degree
    }
}
