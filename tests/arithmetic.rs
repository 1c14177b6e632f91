//! End-to-end scenarios against the public API.

use std::sync::{Arc, OnceLock};
use std::thread;

use proptest::prelude::*;

use ciphercalc::adapters::bfv::BfvAdapter;
use ciphercalc::application::{command, ArithmeticService, DepthPolicy, SessionOptions};
use ciphercalc::config::ServiceConfig;
use ciphercalc::domain::{CryptoError, EncodedCiphertext, SchemeParameters};

fn initialized(options: SessionOptions) -> ArithmeticService<BfvAdapter> {
    let service = ArithmeticService::new(BfvAdapter::new(), SchemeParameters::default(), options);
    service.init().expect("init");
    service
}

#[test]
fn test_documented_scenario() {
    let service = initialized(SessionOptions::default());
    let a = service.encrypt_value(7).expect("encrypt");
    let b = service.encrypt_value(5).expect("encrypt");

    let sum = service.add_encrypted(&a, &b).expect("add");
    assert_eq!(service.decrypt_value(&sum).expect("decrypt"), 12);

    let product = service.multiply_encrypted(&a, &b).expect("mul");
    assert_eq!(service.decrypt_value(&product).expect("decrypt"), 35);

    let diff = service.subtract_encrypted(&a, &b).expect("sub");
    assert_eq!(service.decrypt_value(&diff).expect("decrypt"), 2);
}

#[test]
fn test_results_are_reduced_modulo_plaintext_modulus() {
    let service = initialized(SessionOptions::default());
    let t = service.parameters().plaintext_modulus;

    let a = service.encrypt_value(5).expect("encrypt");
    let b = service.encrypt_value(7).expect("encrypt");
    let diff = service.subtract_encrypted(&a, &b).expect("sub");
    assert_eq!(service.decrypt_value(&diff).expect("decrypt"), t - 2);

    let max = service.encrypt_value(i64::try_from(t - 1).expect("fits")).expect("encrypt");
    let one = service.encrypt_value(1).expect("encrypt");
    let wrapped = service.add_encrypted(&max, &one).expect("add");
    assert_eq!(service.decrypt_value(&wrapped).expect("decrypt"), 0);

    let negative = service.encrypt_value(-1).expect("encrypt");
    assert_eq!(service.decrypt_value(&negative).expect("decrypt"), t - 1);

    let big = service.encrypt_value(1000).expect("encrypt");
    let square = service.multiply_encrypted(&big, &big).expect("mul");
    assert_eq!(service.decrypt_value(&square).expect("decrypt"), 1_000_000 % t);
}

#[test]
fn test_chained_additions_after_one_multiply() {
    let service = initialized(SessionOptions {
        depth_policy: DepthPolicy::Enforce,
        ..SessionOptions::default()
    });
    let x = service.encrypt_value(12).expect("encrypt");
    let y = service.encrypt_value(3).expect("encrypt");
    let xy = service.multiply_encrypted(&x, &y).expect("mul");

    let mut acc = xy;
    for _ in 0..10 {
        acc = service.add_encrypted(&acc, &x).expect("add");
    }
    assert_eq!(service.decrypt_value(&acc).expect("decrypt"), 36 + 120);

    let err = service.multiply_encrypted(&acc, &y).expect_err("depth 2");
    assert!(matches!(err, CryptoError::NoiseBudgetExhausted { .. }));
}

#[test]
fn test_foreign_and_garbage_ciphertexts() {
    let first = initialized(SessionOptions::default());
    let second = initialized(SessionOptions::default());
    let foreign = first.encrypt_value(1).expect("encrypt");
    let own = second.encrypt_value(1).expect("encrypt");

    for bad in [
        foreign.clone(),
        EncodedCiphertext::new(""),
        EncodedCiphertext::new("====="),
    ] {
        let err = second.add_encrypted(&own, &bad).expect_err("must fail");
        assert!(matches!(err, CryptoError::MalformedCiphertext { .. }), "{err}");
    }
}

#[test]
fn test_config_feeds_the_service() {
    let config = ServiceConfig::from_lookup(|name| match name {
        "CIPHERCALC_STRICT_DECODE" => Some("true".to_string()),
        _ => None,
    })
    .expect("config");
    let service = ArithmeticService::new(BfvAdapter::new(), config.parameters, config.options);
    service.init().expect("init");

    let ct = service.encrypt_value(3).expect("encrypt");
    let noisy = EncodedCiphertext::new(format!("{ct}!"));
    let err = service.decrypt_value(&noisy).expect_err("strict decode");
    assert!(matches!(err, CryptoError::MalformedCiphertext { .. }));
}

#[test]
fn test_line_protocol_session() {
    let service = initialized(SessionOptions::default());
    let reply = |line: &str| {
        command::respond(&service, line)
            .map(|(reply, _)| reply)
            .expect("reply")
    };
    let token = |reply: String| reply.strip_prefix("ok ").expect("ok reply").to_string();

    let a = token(reply("encrypt_value 6"));
    let b = token(reply("encrypt 7"));
    let product = token(reply(&format!("multiply_encrypted {a} {b}")));
    assert_eq!(reply(&format!("decrypt {product}")), "ok 42");

    assert!(reply("mul").starts_with("err "));
    assert!(reply("decrypt garbage").starts_with("err decrypt_value"));
}

#[test]
fn test_reinit_while_other_threads_compute() {
    let service = Arc::new(initialized(SessionOptions::default()));

    let workers: Vec<_> = (0..3_i64)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..3 {
                    // Each round works on one snapshot, so a concurrent init
                    // cannot mix keys within the round.
                    let session = service.session().expect("session");
                    let a = session.encrypt_value(i).expect("encrypt");
                    let b = session.encrypt_value(i).expect("encrypt");
                    let sum = session.add_encrypted(&a, &b).expect("add");
                    assert_eq!(session.decrypt_value(&sum).expect("decrypt"), (2 * i) as u64);
                }
            })
        })
        .collect();

    for _ in 0..2 {
        service.init().expect("re-init");
    }
    for worker in workers {
        worker.join().expect("worker panicked");
    }
    assert!(service.is_initialized());
}

fn shared_service() -> &'static ArithmeticService<BfvAdapter> {
    static SERVICE: OnceLock<ArithmeticService<BfvAdapter>> = OnceLock::new();
    SERVICE.get_or_init(|| initialized(SessionOptions::default()))
}

const T: u64 = ciphercalc::domain::DEFAULT_PLAINTEXT_MODULUS;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_homomorphic_arithmetic_matches_modular_arithmetic(v1 in 0..T, v2 in 0..T) {
        let service = shared_service();
        let a = service.encrypt_value(v1 as i64).expect("encrypt");
        let b = service.encrypt_value(v2 as i64).expect("encrypt");

        let sum = service.add_encrypted(&a, &b).expect("add");
        let diff = service.subtract_encrypted(&a, &b).expect("sub");
        let product = service.multiply_encrypted(&a, &b).expect("mul");

        prop_assert_eq!(service.decrypt_value(&sum).expect("decrypt"), (v1 + v2) % T);
        prop_assert_eq!(service.decrypt_value(&diff).expect("decrypt"), (v1 + T - v2) % T);
        prop_assert_eq!(service.decrypt_value(&product).expect("decrypt"), (v1 * v2) % T);
    }
}
