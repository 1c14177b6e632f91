//! Log sanitization for ciphertext and key material.
//!
//! Log lines should never carry ciphertext text, serialized keys or other
//! long binary blobs. Call sites log sizes and fingerprints only; this module
//! is the fallback that scrubs formatted output before it reaches the sink:
//! - URL-safe base64 runs long enough to be a ciphertext
//! - Long hex runs (serialized keys, raw digests)
//! - `key=value` style secrets
//!
//! Session fingerprints (16 hex digits) are public and pass through.
//!
//! # Performance / DoS
//!
//! `sanitize()` caps the input it scans (see `CIPHERCALC_SANITIZE_MAX_BYTES`)
//! so a huge log line cannot stall the writer.

use regex::{Regex, RegexSet};
use std::io::{self, Write};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static PATTERNS: OnceLock<RedactionPatterns> = OnceLock::new();

/// Maximum number of bytes to sanitize per call.
///
/// Defaults to 16 KiB; can be overridden via `CIPHERCALC_SANITIZE_MAX_BYTES`.
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

/// Environment variable overriding `DEFAULT_SANITIZE_MAX_BYTES`.
pub const SANITIZE_MAX_BYTES_ENV: &str = "CIPHERCALC_SANITIZE_MAX_BYTES";

/// A compiled pattern with its replacement text.
struct RedactionPattern {
    regex: Regex,
    replacement: &'static str,
}

struct RedactionPatterns {
    set: RegexSet,
    patterns: Vec<RedactionPattern>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    // Ensure we don't panic on UTF-8 boundaries.
    let mut end = max_bytes.min(input.len());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var(SANITIZE_MAX_BYTES_ENV)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn get_patterns() -> &'static RedactionPatterns {
    PATTERNS.get_or_init(|| {
        // Applied in order; earlier, more specific rules win.
        let rules: Vec<(&'static str, &'static str)> = vec![
            // Contextual secrets
            (
                r"(?i)\b(?:secret[_-]?key|private[_-]?key|relin(?:earization)?[_-]?key|public[_-]?key|seed|secret|key)\b\s*[:=]\s*[A-Za-z0-9+/_-]{16,}={0,2}",
                "[REDACTED-SECRET]",
            ),
            // Serialized key material or digests in hex
            (r"\b[0-9a-fA-F]{32,}\b", "[REDACTED-KEY]"),
            // Encoded ciphertexts (URL-safe base64, optionally padded)
            (r"[A-Za-z0-9_-]{64,}={0,2}", "[REDACTED-CIPHERTEXT]"),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let patterns = rules
            .into_iter()
            .map(|(pattern, replacement)| RedactionPattern {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        RedactionPatterns { set, patterns }
    })
}

/// Sanitize a string by redacting ciphertext and key material.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();

    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    // Fast path: single scan for "any match", then only the rules that hit.
    let mut result = prefix.to_string();
    for idx in patterns.set.matches(prefix).into_iter() {
        let pattern = &patterns.patterns[idx];
        result = pattern
            .regex
            .replace_all(&result, pattern.replacement)
            .to_string();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Check if a string contains anything `sanitize` would redact.
#[must_use]
pub fn contains_sensitive(input: &str) -> bool {
    let (prefix, _truncated) = truncate_to_char_boundary(input, max_sanitize_bytes());
    get_patterns().set.is_match(prefix)
}

/// `MakeWriter` that redacts every formatted log line before it reaches the
/// wrapped sink.
///
/// Call sites never log ciphertext text, so this only catches mistakes.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
    max_bytes: usize,
}

impl<M> SanitizingMakeWriter<M> {
    /// Wrap `inner`, scanning at most `CIPHERCALC_SANITIZE_MAX_BYTES` per line.
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self::with_limit(inner, max_sanitize_bytes())
    }

    /// Wrap `inner` with an explicit per-line scan limit.
    #[must_use]
    pub fn with_limit(inner: M, max_bytes: usize) -> Self {
        Self {
            inner,
            max_bytes: max_bytes.max(1),
        }
    }
}

/// Line-buffering writer produced by `SanitizingMakeWriter`.
pub struct SanitizingWriter<W> {
    inner: W,
    pending: Vec<u8>,
    max_bytes: usize,
}

impl<W: Write> SanitizingWriter<W> {
    /// Redact one chunk and forward it, keeping its trailing newline.
    fn emit(&mut self, raw: &[u8]) -> io::Result<()> {
        let (body, newline) = match raw.split_last() {
            Some((b'\n', rest)) => (rest, true),
            _ => (raw, false),
        };
        let redacted = sanitize_with_limit(&String::from_utf8_lossy(body), self.max_bytes);
        self.inner.write_all(redacted.as_bytes())?;
        if newline {
            self.inner.write_all(b"\n")?;
        }
        Ok(())
    }

    fn drain_complete_lines(&mut self) -> io::Result<()> {
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            self.emit(&line)?;
        }
        Ok(())
    }
}

impl<W: Write> Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.drain_complete_lines()?;

        // A line that never ends is cut once it is twice the scan limit.
        if self.pending.len() > self.max_bytes.saturating_mul(2) {
            let overflow = std::mem::take(&mut self.pending);
            self.emit(&overflow)?;
            self.inner.write_all(b"\n")?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_complete_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest)?;
        }
        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            pending: Vec::new(),
            max_bytes: self.max_bytes,
        }
    }
}
