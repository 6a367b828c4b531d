use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::SeedableRng;

use rsa_oracle::{
    blind, codec, keys::KeyPair, simulated::SimulatedOracle, solver::boundary, Error, Format,
    Interval, MessagePoint, Oracle, OracleReply, Outcome, Solver,
};

/// RSA with `e = d = 1` over modulus `n`: the round trip is lossless exactly below `n`.
struct ModularEcho {
    n: BigUint,
    sent: Vec<String>,
}

impl ModularEcho {
    fn new(n: BigUint) -> Self {
        ModularEcho { n, sent: Vec::new() }
    }

    fn read(&mut self, text: &str) -> BigUint {
        self.sent.push(text.to_string());
        let line = text.split('\n').next().unwrap();
        codec::bytes_to_uint(&codec::latin1_encode(line).unwrap())
    }
}

impl Oracle for ModularEcho {
    fn encrypt(&mut self, plaintext: &str) -> OracleReply {
        let m = self.read(plaintext);
        OracleReply::Ciphertext((m % &self.n).to_str_radix(10))
    }

    fn encrypt_hex(&mut self, plaintext: &str) -> OracleReply {
        OracleReply::CiphertextHex(codec::to_hex(&self.read(plaintext)))
    }

    fn decrypt(&mut self, ciphertext: &str, _: Format) -> OracleReply {
        let c = codec::parse_decimal(ciphertext).unwrap();
        OracleReply::Plaintext(codec::to_hex(&(c % &self.n)))
    }
}

fn bracket() -> Interval {
    Interval::new(MessagePoint::repeated(90, 64), MessagePoint::repeated(255, 64)).unwrap()
}

/// 64 bytes with a line break at offset 40.
fn truncating_modulus() -> MessagePoint {
    let mut bytes = vec![0xc0; 40];
    bytes.push(b'\n');
    bytes.extend_from_slice(&[0x33; 23]);
    MessagePoint::from_bytes(bytes)
}

#[test]
fn first_steps_keep_the_modulus_bracketed() {
    let n = truncating_modulus().value();
    let mut solver = Solver::new(ModularEcho::new(n.clone()));
    let outcome = solver.run(bracket(), Some(6));
    let interval = match outcome {
        Outcome::Halted(interval) => interval,
        other => panic!("expected the step limit to stop the search, got {:?}", other),
    };
    assert_eq!(solver.steps(), 6);
    assert!(interval.start().value() < n);
    assert!(n <= interval.end().value());
    assert!(!interval.end().text().chars().take(40).any(|c| c == '\n'));
}

#[test]
fn line_break_in_modulus_stops_at_the_sentinel() {
    let n = truncating_modulus().value();
    let mut solver = Solver::new(ModularEcho::new(n));
    let outcome = solver.run(bracket(), None);

    let interval = match outcome {
        Outcome::Failed {
            interval,
            error: Error::NoCandidate,
        } => interval,
        other => panic!("expected to run out of candidates, got {:?}", other),
    };
    let end = interval.end().bytes();
    assert_eq!(&end[..40], &[0xc0; 40][..]);
    assert_eq!(end[40], 0x0b);
    assert!(end[41..].iter().all(|&b| b == 0));
    let start = interval.start().bytes();
    assert_eq!(start[40], 0x09);
    assert!(start[41..].iter().all(|&b| b == 0xfe));

    let sent = solver.into_inner().sent;
    assert!(!sent.is_empty());
    assert!(sent.iter().all(|text| !text.contains('\n')));
}

/// A key the default bracket can find: above `[90; 64]` and free of line breaks.
fn searchable_key() -> KeyPair {
    let floor = MessagePoint::repeated(90, 64).value();
    (0u64..)
        .map(|seed| KeyPair::generate(512, &mut StdRng::seed_from_u64(seed)))
        .find(|key| key.n > floor && MessagePoint::from_uint(&key.n).newline_offset().is_none())
        .unwrap()
}

#[test]
fn finds_modulus_and_recovers_secret() {
    let key = searchable_key();
    let mut oracle = SimulatedOracle::new(key.clone());
    let target = oracle.protect(b"picoCTF{bl1nd_m3_w1th_2}");

    let mut solver = Solver::new(&mut oracle);
    let outcome = solver.run(bracket(), None);
    let n = match outcome {
        Outcome::Done(done) => boundary(&done).unwrap(),
        other => panic!("search did not converge: {:?}", other),
    };
    assert_eq!(n, key.n);

    let direct = oracle.decrypt(&target.to_str_radix(10), Format::Text);
    assert_eq!(direct, OracleReply::NoAnswer);

    let k = BigUint::from(blind::DEFAULT_FACTOR);
    let observed = blind::blind(&mut oracle, &k, &n).unwrap();
    assert_eq!(observed, blind::expected_blind(&k, &key.e, &n));

    let secret = blind::recover(&mut oracle, &target, &n, &k).unwrap();
    assert_eq!(secret.text(), "picoCTF{bl1nd_m3_w1th_2}");
}

#[test]
fn wrong_modulus_breaks_the_division() {
    let key = searchable_key();
    let mut oracle = SimulatedOracle::new(key.clone());
    let target = oracle.protect(b"secret");
    let wrong = &key.n - BigUint::from(12_345u32);
    let result = blind::recover(&mut oracle, &target, &wrong, &BigUint::from(2u32));
    // the product lands on an odd number or a wrong plaintext, never the secret
    match result {
        Err(Error::DivisionMismatch { .. }) => {}
        Ok(point) => assert_ne!(point.text(), "secret"),
        Err(other) => panic!("unexpected error {}", other),
    }
}
