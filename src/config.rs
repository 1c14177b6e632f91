//! Environment-driven configuration.
//!
//! | Variable | Effect |
//! |---|---|
//! | `CIPHERCALC_PARAMS_FILE` | JSON `SchemeParameters`; replaces the defaults |
//! | `CIPHERCALC_POLY_DEGREE` | polynomial degree override |
//! | `CIPHERCALC_MODULI_BITS` | comma-separated modulus bit sizes |
//! | `CIPHERCALC_PLAIN_MODULUS` | plaintext modulus override |
//! | `CIPHERCALC_STRICT_DECODE` | strict text decoding |
//! | `CIPHERCALC_ENFORCE_DEPTH` | reject multiplies past the supported depth |
//! | `CIPHERCALC_LOG_MODE` | `stderr` (default) or `file` |
//! | `CIPHERCALC_LOG_FILE` | log path when `CIPHERCALC_LOG_MODE=file` |
//!
//! Individual overrides apply on top of the params file when both are set.
//! Parameters are only validated by `init`; this module checks syntax.

use std::path::PathBuf;

use crate::application::{DepthPolicy, SessionOptions};
use crate::domain::{CodecMode, SchemeParameters};
use crate::{CiphercalcError, Result};

pub const PARAMS_FILE_ENV: &str = "CIPHERCALC_PARAMS_FILE";
pub const POLY_DEGREE_ENV: &str = "CIPHERCALC_POLY_DEGREE";
pub const MODULI_BITS_ENV: &str = "CIPHERCALC_MODULI_BITS";
pub const PLAIN_MODULUS_ENV: &str = "CIPHERCALC_PLAIN_MODULUS";
pub const STRICT_DECODE_ENV: &str = "CIPHERCALC_STRICT_DECODE";
pub const ENFORCE_DEPTH_ENV: &str = "CIPHERCALC_ENFORCE_DEPTH";
pub const LOG_MODE_ENV: &str = "CIPHERCALC_LOG_MODE";
pub const LOG_FILE_ENV: &str = "CIPHERCALC_LOG_FILE";

const DEFAULT_LOG_FILE: &str = "ciphercalc.log";

/// Where the binary sends its logs. Stdout carries replies, so it is never
/// a log target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub parameters: SchemeParameters,
    pub options: SessionOptions,
    pub log_target: LogTarget,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            parameters: SchemeParameters::default(),
            options: SessionOptions::default(),
            log_target: LogTarget::Stderr,
        }
    }
}

impl ServiceConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    /// Returns `CiphercalcError::Config` for unparsable values, `Io` or
    /// `Serialization` if the params file cannot be read.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// See `from_env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut parameters = match lookup(PARAMS_FILE_ENV) {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)?;
                let parameters: SchemeParameters = serde_json::from_str(&raw)?;
                tracing::debug!(path = %path, "Loaded scheme parameters from file");
                parameters
            }
            None => SchemeParameters::default(),
        };

        if let Some(raw) = lookup(POLY_DEGREE_ENV) {
            parameters.degree = parse_number(POLY_DEGREE_ENV, &raw)?;
        }
        if let Some(raw) = lookup(MODULI_BITS_ENV) {
            parameters.moduli_bits = raw
                .split(',')
                .map(|part| parse_number(MODULI_BITS_ENV, part))
                .collect::<Result<Vec<usize>>>()?;
        }
        if let Some(raw) = lookup(PLAIN_MODULUS_ENV) {
            parameters.plaintext_modulus = parse_number(PLAIN_MODULUS_ENV, &raw)?;
        }

        let options = SessionOptions {
            codec_mode: if parse_bool(lookup(STRICT_DECODE_ENV)) {
                CodecMode::Strict
            } else {
                CodecMode::Lenient
            },
            depth_policy: if parse_bool(lookup(ENFORCE_DEPTH_ENV)) {
                DepthPolicy::Enforce
            } else {
                DepthPolicy::Unchecked
            },
        };

        let log_target = match lookup(LOG_MODE_ENV).as_deref() {
            None | Some("stderr") => LogTarget::Stderr,
            Some("file") => LogTarget::File(
                lookup(LOG_FILE_ENV)
                    .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())
                    .into(),
            ),
            Some(other) => {
                return Err(CiphercalcError::Config(format!(
                    "{LOG_MODE_ENV}: expected 'stderr' or 'file', got '{other}'"
                )))
            }
        };

        Ok(Self {
            parameters,
            options,
            log_target,
        })
    }
}

fn parse_bool(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn parse_number<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| CiphercalcError::Config(format!("{name}: invalid value '{raw}': {e}")))
}
