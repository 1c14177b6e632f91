//! Key material for one BFV parameter set.
//!
//! # Capability split
//!
//! - `PublicKey`: encryption only
//! - `SecretKey`: decryption only, never serialized or logged
//! - `RelinearizationKey`: used by the multiply path to compact products
//!
//! All three are derived together from the same `Arc<BfvParameters>` inside
//! `KeyMaterial::generate`; the fields are private, so keys from different
//! parameter sets cannot be combined.

use std::fmt;
use std::sync::Arc;

use fhe::bfv::{BfvParameters, PublicKey, RelinearizationKey, SecretKey};
use fhe_traits::Serialize as FheSerialize;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::domain::{CryptoError, Operation};

pub struct KeyMaterial {
    params: Arc<BfvParameters>,
    public: PublicKey,
    secret: SecretKey,
    relin: Option<RelinearizationKey>,
}

impl KeyMaterial {
    /// Generate a fresh key set for `params`.
    ///
    /// The relinearization key is only generated when `with_relinearization`
    /// is set; parameter sets with a single modulus cannot support one.
    ///
    /// # Errors
    /// Returns `CryptoError::KeyGeneration` if the library rejects the
    /// relinearization key.
    pub fn generate(
        params: &Arc<BfvParameters>,
        with_relinearization: bool,
    ) -> Result<Self, CryptoError> {
        // Fresh CSPRNG seeded from OS entropy for every key set.
        let mut rng = ChaCha20Rng::from_os_rng();

        let secret = SecretKey::random(params, &mut rng);
        let public = PublicKey::new(&secret, &mut rng);
        let relin = if with_relinearization {
            let rk = RelinearizationKey::new(&secret, &mut rng).map_err(|e| {
                CryptoError::KeyGeneration {
                    operation: Operation::Init,
                    reason: format!("failed to create relinearization key: {e}"),
                }
            })?;
            Some(rk)
        } else {
            None
        };

        Ok(Self {
            params: Arc::clone(params),
            public,
            secret,
            relin,
        })
    }

    #[must_use]
    pub fn parameters(&self) -> &Arc<BfvParameters> {
        &self.params
    }

    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub(crate) fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    #[must_use]
    pub fn relinearization_key(&self) -> Option<&RelinearizationKey> {
        self.relin.as_ref()
    }

    /// Serialized parameters and public key, for fingerprinting.
    #[must_use]
    pub fn public_material(&self) -> Vec<Vec<u8>> {
        vec![self.params.to_bytes(), self.public.to_bytes()]
    }
}

// Intentionally never printing key material.
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("degree", &self.params.degree())
            .field("relinearization", &self.relin.is_some())
            .finish_non_exhaustive()
    }
}
