//! Binary ⇄ text codec for ciphertext transport.
//!
//! Uses the URL-safe base64 alphabet (`A-Z a-z 0-9 - _`) with `=` padding,
//! so encoded ciphertexts never contain `+` or `/`.
//!
//! # Decode policy
//!
//! `CodecMode::Lenient` consumes symbols up to the first `=` or the first
//! byte outside the alphabet and ignores everything after it. Leftover bits
//! that do not complete a byte are dropped. Truncated or corrupted text is
//! therefore not rejected here; it fails later when the bytes are parsed as
//! a ciphertext.
//!
//! `CodecMode::Strict` rejects any non-alphabet content, missing or
//! misplaced padding and non-canonical trailing bits.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// Padded URL-safe engine. Decoding requires canonical padding.
const STRICT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

/// Engine for the lenient path. Input reaching it has already been cut at
/// the first non-alphabet byte, so it never contains padding.
const LENIENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone),
);

/// How `Codec::decode` treats content it does not understand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodecMode {
    /// Stop at the first padding or non-alphabet byte.
    #[default]
    Lenient,
    /// Reject anything that is not canonical padded URL-safe base64.
    Strict,
}

/// Error returned when text cannot be decoded.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid transport text: {0}")]
    Invalid(#[from] base64::DecodeError),
}

/// Two-way mapping between bytes and transport text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Codec {
    mode: CodecMode,
}

impl Codec {
    #[must_use]
    pub fn new(mode: CodecMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn lenient() -> Self {
        Self::new(CodecMode::Lenient)
    }

    #[must_use]
    pub fn strict() -> Self {
        Self::new(CodecMode::Strict)
    }

    #[must_use]
    pub fn mode(&self) -> CodecMode {
        self.mode
    }

    /// Encode bytes as padded URL-safe text. The output length is always a
    /// multiple of 4.
    #[must_use]
    pub fn encode(&self, bytes: &[u8]) -> String {
        STRICT_ENGINE.encode(bytes)
    }

    /// Decode text produced by `encode`.
    ///
    /// # Errors
    /// In strict mode, returns `CodecError::Invalid` for any non-canonical
    /// input. Lenient mode does not fail on well-formed prefixes.
    pub fn decode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        match self.mode {
            CodecMode::Strict => Ok(STRICT_ENGINE.decode(text)?),
            CodecMode::Lenient => {
                let bytes = text.as_bytes();
                let valid = bytes.iter().take_while(|&&b| is_alphabet_symbol(b)).count();
                let mut prefix = &bytes[..valid];
                // A lone trailing symbol carries only 6 bits: no whole byte.
                if prefix.len() % 4 == 1 {
                    prefix = &prefix[..prefix.len() - 1];
                }
                Ok(LENIENT_ENGINE.decode(prefix)?)
            }
        }
    }
}

fn is_alphabet_symbol(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}
