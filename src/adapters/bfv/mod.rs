//! BFV adapter: Implementation of FheEngine using fhe.rs.
//!
//! # FHE Implementation
//!
//! Uses the BFV scheme with:
//! - Batching (SIMD) encoding, one integer in slot 0
//! - Public-key encryption, secret-key decryption
//! - Relinearization after every multiplication, so products keep the size
//!   of a fresh ciphertext
//!
//! # Multiplicative depth
//!
//! The default parameters support one multiplication per pair of fresh
//! ciphertexts. Deeper circuits are not detected here: they decrypt to an
//! incorrect integer. Depth tracking lives in the session envelope.
//!
//! # Panics from the primitive library
//!
//! Deserialization and evaluation run under `catch_unwind`; a panic inside
//! the library on crafted input is reported as an error instead of taking
//! the process down.

mod encoder;
mod keys;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use fhe::bfv::{BfvParameters, BfvParametersBuilder, Ciphertext, Plaintext};
use fhe_traits::{DeserializeParametrized, FheDecrypter, FheEncrypter, Serialize as FheSerialize};

pub use encoder::BatchEncoder;
pub use keys::KeyMaterial;

use crate::domain::{CryptoError, Operation, SchemeParameters};
use crate::ports::FheEngine;

/// Number of polynomials in a fresh or relinearized ciphertext.
const COMPACT_CIPHERTEXT_SIZE: usize = 2;

/// Everything derived from one validated parameter set.
#[derive(Debug)]
pub struct BfvContext {
    scheme: SchemeParameters,
    keys: KeyMaterial,
    encoder: BatchEncoder,
}

impl BfvContext {
    #[must_use]
    pub fn scheme(&self) -> &SchemeParameters {
        &self.scheme
    }

    #[must_use]
    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }

    #[must_use]
    pub fn encoder(&self) -> &BatchEncoder {
        &self.encoder
    }

    fn params(&self) -> &Arc<BfvParameters> {
        self.keys.parameters()
    }
}

/// BFV adapter for FHE operations.
///
/// Stateless: all keys live in the `BfvContext` returned by `setup`.
#[derive(Debug, Clone, Copy)]
pub struct BfvAdapter;

impl BfvAdapter {
    /// Create a new BFV adapter.
    #[must_use]
    pub fn new() -> Self {
        tracing::debug!("Initializing BfvAdapter (fhe.rs)");
        Self
    }

    /// Build and validate the library's parameter object.
    fn build_parameters(params: &SchemeParameters) -> Result<Arc<BfvParameters>, CryptoError> {
        params.validate()?;

        BfvParametersBuilder::new()
            .set_degree(params.degree)
            .set_moduli_sizes(&params.moduli_bits)
            .set_plaintext_modulus(params.plaintext_modulus)
            .build_arc()
            .map_err(|e| CryptoError::Parameter {
                operation: Operation::Init,
                reason: format!("rejected by the BFV library: {e}"),
            })
    }

    /// Deserialize a compact ciphertext under the context's parameters.
    fn load(ctx: &BfvContext, bytes: &[u8], operation: Operation) -> Result<Ciphertext, CryptoError> {
        let ct = guarded(
            || {
                Ciphertext::from_bytes(bytes, ctx.params()).map_err(|e| {
                    CryptoError::malformed(
                        operation,
                        format!("bytes do not parse under the active parameters: {e}"),
                    )
                })
            },
            || CryptoError::malformed(operation, "ciphertext deserialization aborted"),
        )?;

        if ct.len() != COMPACT_CIPHERTEXT_SIZE {
            return Err(CryptoError::malformed(
                operation,
                format!(
                    "ciphertext has {} components, expected {COMPACT_CIPHERTEXT_SIZE}",
                    ct.len()
                ),
            ));
        }
        // Every ciphertext this adapter produces stays at level 0; operands at
        // other levels cannot be combined with fresh ones.
        let level = ctx
            .params()
            .level_of_context(ct[0].ctx())
            .map_err(|e| CryptoError::malformed(operation, format!("ciphertext level unknown: {e}")))?;
        if level != 0 {
            return Err(CryptoError::malformed(
                operation,
                format!("ciphertext is at level {level}, expected level 0"),
            ));
        }
        Ok(ct)
    }

    fn load_pair(
        ctx: &BfvContext,
        a: &[u8],
        b: &[u8],
        operation: Operation,
    ) -> Result<(Ciphertext, Ciphertext), CryptoError> {
        Ok((Self::load(ctx, a, operation)?, Self::load(ctx, b, operation)?))
    }

    fn evaluate(
        operation: Operation,
        f: impl FnOnce() -> Result<Ciphertext, CryptoError>,
    ) -> Result<Vec<u8>, CryptoError> {
        let result = guarded(f, || CryptoError::Evaluation {
            operation,
            reason: "evaluation aborted inside the BFV library".into(),
        })?;
        Ok(result.to_bytes())
    }
}

impl Default for BfvAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl FheEngine for BfvAdapter {
    type Context = BfvContext;

    fn setup(&self, params: &SchemeParameters) -> Result<BfvContext, CryptoError> {
        tracing::info!(
            degree = params.degree,
            moduli_bits = ?params.moduli_bits,
            plaintext_modulus = params.plaintext_modulus,
            "Building BFV context"
        );

        let bfv = Self::build_parameters(params)?;
        let encoder = BatchEncoder::new(&bfv, params.plaintext_modulus, params.slot_count());

        // Probe: the library must accept a batched plaintext under these parameters.
        encoder.encode_int(0, Operation::Init).map_err(|e| CryptoError::Parameter {
            operation: Operation::Init,
            reason: format!("parameters do not support batching: {e}"),
        })?;

        let keys = KeyMaterial::generate(&bfv, params.supports_key_switching())?;
        tracing::info!(
            relinearization = keys.relinearization_key().is_some(),
            "Generated BFV key material"
        );

        Ok(BfvContext {
            scheme: params.clone(),
            keys,
            encoder,
        })
    }

    fn public_material(&self, ctx: &BfvContext) -> Vec<Vec<u8>> {
        ctx.keys.public_material()
    }

    fn supports_key_switching(&self, ctx: &BfvContext) -> bool {
        ctx.keys.relinearization_key().is_some()
    }

    fn encrypt(&self, ctx: &BfvContext, value: i64) -> Result<Vec<u8>, CryptoError> {
        let operation = Operation::Encrypt;
        let plaintext: Plaintext = ctx.encoder.encode_int(value, operation)?;

        let ciphertext: Ciphertext = ctx
            .keys
            .public_key()
            .try_encrypt(&plaintext, &mut rand::rng())
            .map_err(|e| CryptoError::Encryption {
                operation,
                reason: format!("public-key encryption failed: {e}"),
            })?;

        let bytes = ciphertext.to_bytes();
        tracing::trace!(size_bytes = bytes.len(), "Encrypted value");
        Ok(bytes)
    }

    fn decrypt(&self, ctx: &BfvContext, ciphertext: &[u8]) -> Result<u64, CryptoError> {
        let operation = Operation::Decrypt;
        let ct = Self::load(ctx, ciphertext, operation)?;

        let plaintext = guarded(
            || {
                ctx.keys
                    .secret_key()
                    .try_decrypt(&ct)
                    .map_err(|e| CryptoError::Decryption {
                        operation,
                        reason: format!("secret-key decryption failed: {e}"),
                    })
            },
            || CryptoError::Decryption {
                operation,
                reason: "decryption aborted inside the BFV library".into(),
            },
        )?;

        ctx.encoder.decode_int(&plaintext, operation)
    }

    fn add(&self, ctx: &BfvContext, a: &[u8], b: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let operation = Operation::Add;
        let (a, b) = Self::load_pair(ctx, a, b, operation)?;
        Self::evaluate(operation, || Ok(&a + &b))
    }

    fn sub(&self, ctx: &BfvContext, a: &[u8], b: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let operation = Operation::Subtract;
        let (a, b) = Self::load_pair(ctx, a, b, operation)?;
        Self::evaluate(operation, || Ok(&a - &b))
    }

    fn multiply(&self, ctx: &BfvContext, a: &[u8], b: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let operation = Operation::Multiply;
        let rk = ctx
            .keys
            .relinearization_key()
            .ok_or_else(|| CryptoError::Capability {
                operation,
                reason: "no relinearization key (coefficient modulus chain has a single prime)"
                    .into(),
            })?;
        let (a, b) = Self::load_pair(ctx, a, b, operation)?;

        Self::evaluate(operation, || {
            // Raw product has three components; relinearize back to two.
            let mut product = &a * &b;
            rk.relinearizes(&mut product)
                .map_err(|e| CryptoError::Evaluation {
                    operation,
                    reason: format!("relinearization failed: {e}"),
                })?;
            Ok(product)
        })
    }
}

/// Run `f`, converting a panic into the error produced by `on_panic`.
fn guarded<T>(
    f: impl FnOnce() -> Result<T, CryptoError>,
    on_panic: impl FnOnce() -> CryptoError,
) -> Result<T, CryptoError> {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| Err(on_panic()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_default() -> (BfvAdapter, BfvContext) {
        let adapter = BfvAdapter::new();
        let ctx = adapter
            .setup(&SchemeParameters::default())
            .expect("default parameters must set up");
        (adapter, ctx)
    }

    #[test]
    fn test_setup_generates_all_keys() {
        let (adapter, ctx) = setup_default();
        assert!(adapter.supports_key_switching(&ctx));
        assert_eq!(ctx.encoder().slot_count(), 4096);
        let material = adapter.public_material(&ctx);
        assert_eq!(material.len(), 2);
        assert!(material.iter().all(|part| !part.is_empty()));
    }

    #[test]
    fn test_key_material_debug_no_leak() {
        let (_, ctx) = setup_default();
        let debug_output = format!("{:?}", ctx.keys());
        assert!(debug_output.contains("degree"));
        assert!(!debug_output.contains("secret"));
    }

    #[test]
    fn test_setup_rejects_invalid_parameters() {
        let adapter = BfvAdapter::new();
        let params = SchemeParameters {
            degree: 4095,
            ..SchemeParameters::default()
        };
        let err = adapter.setup(&params).expect_err("must fail");
        assert!(matches!(err, CryptoError::Parameter { .. }));
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let (adapter, ctx) = setup_default();
        for value in [0i64, 1, 42, 1_032_192] {
            let ct = adapter.encrypt(&ctx, value).expect("encrypt");
            assert_eq!(adapter.decrypt(&ctx, &ct).expect("decrypt"), value as u64);
        }
    }

    #[test]
    fn test_encrypt_wraps_out_of_range_values() {
        let (adapter, ctx) = setup_default();
        let t = ctx.encoder().plaintext_modulus();

        let ct = adapter.encrypt(&ctx, -1).expect("encrypt");
        assert_eq!(adapter.decrypt(&ctx, &ct).expect("decrypt"), t - 1);

        let ct = adapter.encrypt(&ctx, t as i64 + 5).expect("encrypt");
        assert_eq!(adapter.decrypt(&ctx, &ct).expect("decrypt"), 5);
    }

    #[test]
    fn test_homomorphic_arithmetic() {
        let (adapter, ctx) = setup_default();
        let a = adapter.encrypt(&ctx, 7).expect("encrypt");
        let b = adapter.encrypt(&ctx, 5).expect("encrypt");

        let sum = adapter.add(&ctx, &a, &b).expect("add");
        let diff = adapter.sub(&ctx, &a, &b).expect("sub");
        let product = adapter.multiply(&ctx, &a, &b).expect("multiply");

        assert_eq!(adapter.decrypt(&ctx, &sum).expect("decrypt"), 12);
        assert_eq!(adapter.decrypt(&ctx, &diff).expect("decrypt"), 2);
        assert_eq!(adapter.decrypt(&ctx, &product).expect("decrypt"), 35);
    }

    #[test]
    fn test_product_is_relinearized() {
        let (adapter, ctx) = setup_default();
        let a = adapter.encrypt(&ctx, 3).expect("encrypt");
        let b = adapter.encrypt(&ctx, 4).expect("encrypt");
        let product = adapter.multiply(&ctx, &a, &b).expect("multiply");

        // A relinearized product parses as a compact ciphertext again.
        let reloaded = BfvAdapter::load(&ctx, &product, Operation::Decrypt).expect("compact");
        assert_eq!(reloaded.len(), COMPACT_CIPHERTEXT_SIZE);
        assert!(product.len() <= 2 * a.len());
    }

    #[test]
    fn test_decrypt_rejects_garbage() {
        let (adapter, ctx) = setup_default();
        let err = adapter
            .decrypt(&ctx, b"definitely not a ciphertext")
            .expect_err("must fail");
        assert!(matches!(err, CryptoError::MalformedCiphertext { .. }));

        let ct = adapter.encrypt(&ctx, 9).expect("encrypt");
        let err = adapter
            .decrypt(&ctx, &ct[..ct.len() / 2])
            .expect_err("truncated input must fail");
        assert!(matches!(err, CryptoError::MalformedCiphertext { .. }));
    }

    #[test]
    fn test_operand_from_other_parameter_set_is_malformed() {
        let adapter = BfvAdapter::new();
        let (_, ctx) = setup_default();
        let other = adapter
            .setup(&SchemeParameters {
                degree: 2048,
                moduli_bits: vec![54],
                plaintext_modulus: 1_032_193,
            })
            .expect("other parameters must set up");

        let foreign = adapter.encrypt(&other, 1).expect("encrypt");
        let local = adapter.encrypt(&ctx, 1).expect("encrypt");
        let err = adapter.add(&ctx, &local, &foreign).expect_err("must fail");
        assert!(matches!(err, CryptoError::MalformedCiphertext { .. }));
    }

    #[test]
    fn test_operand_at_lower_level_is_malformed() {
        let (adapter, ctx) = setup_default();
        let fresh = adapter.encrypt(&ctx, 4).expect("encrypt");

        let mut switched = Ciphertext::from_bytes(&fresh, ctx.params()).expect("parse");
        switched.switch_to_level(1).expect("switch level");
        let lowered = switched.to_bytes();

        for result in [
            adapter.add(&ctx, &fresh, &lowered),
            adapter.sub(&ctx, &lowered, &fresh),
            adapter.multiply(&ctx, &fresh, &lowered),
        ] {
            let err = result.expect_err("must fail");
            assert!(
                matches!(err, CryptoError::MalformedCiphertext { .. }),
                "unexpected error: {err}"
            );
        }
        let err = adapter.decrypt(&ctx, &lowered).expect_err("must fail");
        assert!(matches!(err, CryptoError::MalformedCiphertext { .. }));
    }

    #[test]
    fn test_multiply_requires_key_switching() {
        let adapter = BfvAdapter::new();
        let ctx = adapter
            .setup(&SchemeParameters {
                moduli_bits: vec![60],
                ..SchemeParameters::default()
            })
            .expect("single prime parameters must set up");
        assert!(!adapter.supports_key_switching(&ctx));

        let a = adapter.encrypt(&ctx, 2).expect("encrypt");
        let err = adapter.multiply(&ctx, &a, &a).expect_err("must fail");
        assert!(matches!(err, CryptoError::Capability { .. }));

        // Addition does not need key switching.
        let sum = adapter.add(&ctx, &a, &a).expect("add");
        assert_eq!(adapter.decrypt(&ctx, &sum).expect("decrypt"), 4);
    }
}
