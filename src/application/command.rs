//! Line protocol for the host binary.
//!
//! One request per line: `<operation> [args...]`. Operation names follow
//! `Operation::from_name` (full names and short aliases). Replies are
//! `ok <result>` or `err <message>`.

use crate::application::ArithmeticService;
use crate::domain::{EncodedCiphertext, Operation};
use crate::ports::FheEngine;
use crate::{CiphercalcError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init,
    Encrypt(i64),
    Decrypt(EncodedCiphertext),
    Add(EncodedCiphertext, EncodedCiphertext),
    Subtract(EncodedCiphertext, EncodedCiphertext),
    Multiply(EncodedCiphertext, EncodedCiphertext),
    Quit,
}

impl Command {
    /// Parse one request line. Blank lines yield `None`.
    ///
    /// # Errors
    /// Returns `CiphercalcError::Validation` for unknown operations or a
    /// wrong argument count.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        if matches!(name, "quit" | "exit") {
            expect_args(name, &args, 0)?;
            return Ok(Some(Self::Quit));
        }

        let operation = Operation::from_name(name)
            .ok_or_else(|| CiphercalcError::Validation(format!("unknown operation '{name}'")))?;

        let command = match operation {
            Operation::Init => {
                expect_args(name, &args, 0)?;
                Self::Init
            }
            Operation::Encrypt => {
                expect_args(name, &args, 1)?;
                let value = args[0].parse::<i64>().map_err(|e| {
                    CiphercalcError::Validation(format!("{name}: invalid integer: {e}"))
                })?;
                Self::Encrypt(value)
            }
            Operation::Decrypt => {
                expect_args(name, &args, 1)?;
                Self::Decrypt(EncodedCiphertext::new(args[0]))
            }
            Operation::Add => {
                let (a, b) = operand_pair(name, &args)?;
                Self::Add(a, b)
            }
            Operation::Subtract => {
                let (a, b) = operand_pair(name, &args)?;
                Self::Subtract(a, b)
            }
            Operation::Multiply => {
                let (a, b) = operand_pair(name, &args)?;
                Self::Multiply(a, b)
            }
        };
        Ok(Some(command))
    }

    #[must_use]
    pub fn is_quit(&self) -> bool {
        matches!(self, Self::Quit)
    }

    /// Run the command and render its result as a single token.
    ///
    /// # Errors
    /// Propagates the service's `CryptoError`.
    pub fn execute<E: FheEngine>(&self, service: &ArithmeticService<E>) -> Result<String> {
        let reply = match self {
            Self::Init => {
                service.init()?;
                service.fingerprint().unwrap_or_default()
            }
            Self::Encrypt(value) => service.encrypt_value(*value)?.into_inner(),
            Self::Decrypt(ct) => service.decrypt_value(ct)?.to_string(),
            Self::Add(a, b) => service.add_encrypted(a, b)?.into_inner(),
            Self::Subtract(a, b) => service.subtract_encrypted(a, b)?.into_inner(),
            Self::Multiply(a, b) => service.multiply_encrypted(a, b)?.into_inner(),
            Self::Quit => "bye".to_string(),
        };
        Ok(reply)
    }
}

fn operand_pair(name: &str, args: &[&str]) -> Result<(EncodedCiphertext, EncodedCiphertext)> {
    expect_args(name, args, 2)?;
    Ok((EncodedCiphertext::new(args[0]), EncodedCiphertext::new(args[1])))
}

fn expect_args(name: &str, args: &[&str], count: usize) -> Result<()> {
    if args.len() == count {
        Ok(())
    } else {
        Err(CiphercalcError::Validation(format!(
            "{name}: expected {count} argument(s), got {}",
            args.len()
        )))
    }
}

/// Parse and run one line, producing the reply text (without newline).
///
/// Returns `None` for blank lines.
pub fn respond<E: FheEngine>(service: &ArithmeticService<E>, line: &str) -> Option<(String, bool)> {
    match Command::parse(line) {
        Ok(None) => None,
        Ok(Some(command)) => {
            let quit = command.is_quit();
            let reply = match command.execute(service) {
                Ok(result) => format!("ok {result}"),
                Err(e) => format!("err {e}"),
            };
            Some((reply, quit))
        }
        Err(e) => Some((format!("err {e}"), false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::bfv::BfvAdapter;
    use crate::application::SessionOptions;
    use crate::domain::SchemeParameters;

    #[test]
    fn test_parse_aliases() {
        assert_eq!(
            Command::parse("encrypt 7").expect("parse"),
            Some(Command::Encrypt(7))
        );
        assert_eq!(
            Command::parse("encrypt_value -3").expect("parse"),
            Some(Command::Encrypt(-3))
        );
        assert_eq!(
            Command::parse("  mul a b ").expect("parse"),
            Some(Command::Multiply("a".into(), "b".into()))
        );
        assert_eq!(
            Command::parse("subtract_encrypted a b").expect("parse"),
            Some(Command::Subtract("a".into(), "b".into()))
        );
        assert_eq!(
            Command::parse("add x y").expect("parse"),
            Some(Command::Add("x".into(), "y".into()))
        );
        assert_eq!(
            Command::parse("multiply_encrypted x y").expect("parse"),
            Some(Command::Multiply("x".into(), "y".into()))
        );
        assert_eq!(Command::parse("quit").expect("parse"), Some(Command::Quit));
        assert_eq!(Command::parse("   ").expect("parse"), None);
    }

    #[test]
    fn test_parse_rejects_bad_requests() {
        for line in ["frobnicate", "encrypt", "encrypt x", "add onlyone", "init extra"] {
            assert!(
                matches!(Command::parse(line), Err(CiphercalcError::Validation(_))),
                "accepted {line:?}"
            );
        }
    }

    #[test]
    fn test_respond_round_trip() {
        let service = ArithmeticService::new(
            BfvAdapter::new(),
            SchemeParameters::default(),
            SessionOptions::default(),
        );

        let (reply, _) = respond(&service, "encrypt 1").expect("reply");
        assert!(reply.starts_with("err "), "got {reply}");
        assert!(reply.contains("not initialized"));

        let (reply, quit) = respond(&service, "init").expect("reply");
        assert!(reply.starts_with("ok "));
        assert!(!quit);

        let (a, _) = respond(&service, "encrypt 20").expect("reply");
        let (b, _) = respond(&service, "encrypt 22").expect("reply");
        let a = a.strip_prefix("ok ").expect("ok reply");
        let b = b.strip_prefix("ok ").expect("ok reply");

        let (sum, _) = respond(&service, &format!("add {a} {b}")).expect("reply");
        let sum = sum.strip_prefix("ok ").expect("ok reply");
        let (value, _) = respond(&service, &format!("decrypt {sum}")).expect("reply");
        assert_eq!(value, "ok 42");

        let (reply, _) = respond(&service, "decrypt AAAA").expect("reply");
        assert!(reply.starts_with("err decrypt"), "got {reply}");

        let (reply, quit) = respond(&service, "quit").expect("reply");
        assert_eq!(reply, "ok bye");
        assert!(quit);
        assert!(respond(&service, "").is_none());
    }
}
