//! Domain layer: core types shared by ports, adapters and the application.
//!
//! Nothing in here touches the primitive library.

pub mod codec;
mod crypto;
mod params;

pub use codec::{Codec, CodecError, CodecMode};
pub use crypto::{
    compute_fingerprint, CiphertextEnvelope, CryptoError, EncodedCiphertext, Operation,
    ENVELOPE_VERSION,
};
pub use params::{
    SchemeParameters, DEFAULT_DEGREE, DEFAULT_MODULI_BITS, DEFAULT_PLAINTEXT_MODULUS,
};
