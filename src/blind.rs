//! Decrypting a ciphertext the oracle refuses to touch.
//!
//! For `c = m^e mod N` the oracle happily decrypts `c' = c * k^e mod N`,
//! which yields `k * m mod N`. As long as `k * m < N` that is the exact
//! product, and dividing by `k` gives back `m`.

use std::{fs, path::Path};

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::Zero;
use tracing::{debug, instrument, warn};

use crate::codec;
use crate::errors::{Error, Result};
use crate::oracle::{Format, Oracle};
use crate::point::MessagePoint;

pub const DEFAULT_FACTOR: u32 = 2;

/// Reads an intercepted ciphertext: one decimal number, line breaks ignored.
pub fn read_target(path: impl AsRef<Path>) -> Result<BigUint> {
    let contents = fs::read_to_string(path)?;
    codec::parse_decimal(&contents.replace('\n', ""))
}

/// `k^e mod N` computed locally, to cross-check what the oracle returns for `k`.
pub fn expected_blind(k: &BigUint, e: &BigUint, n: &BigUint) -> BigUint {
    k.modpow(e, n)
}

fn check_factor(k: &BigUint, n: &BigUint) -> Result<MessagePoint> {
    if k.is_zero() {
        return Err(Error::InvalidBlindingFactor("zero".to_string()));
    }
    if k >= n {
        return Err(Error::InvalidBlindingFactor(format!("{} is not below the modulus", k)));
    }
    let point = MessagePoint::from_uint(k);
    if point.newline_offset().is_some() {
        return Err(Error::InvalidBlindingFactor(format!(
            "{} contains a line break and cannot be sent",
            k
        )));
    }
    Ok(point)
}

/// Asks the oracle for `E(k)`.
pub fn blind<O: Oracle + ?Sized>(oracle: &mut O, k: &BigUint, n: &BigUint) -> Result<BigUint> {
    let point = check_factor(k, n)?;
    let reply = oracle
        .encrypt(&point.text())
        .value()
        .ok_or(Error::OracleRefusal("blinding"))?;
    codec::parse_decimal(&reply)
}

/// Recovers the plaintext of `target` through the blinded ciphertext `target * E(k)`.
#[instrument(skip(oracle, target, n))]
pub fn recover<O: Oracle + ?Sized>(
    oracle: &mut O,
    target: &BigUint,
    n: &BigUint,
    k: &BigUint,
) -> Result<MessagePoint> {
    let c_blind = blind(oracle, k, n)?;
    let c_new = (target * &c_blind) % n;
    debug!(ciphertext = %c_new, "submitting blinded ciphertext");

    let decrypted = oracle
        .decrypt(&c_new.to_str_radix(10), Format::Hex)
        .value()
        .ok_or(Error::OracleRefusal("blinded decryption"))?;
    let product = codec::parse_hex(&decrypted)?;

    let (recovered, remainder) = product.div_rem(k);
    if !remainder.is_zero() {
        warn!(product = %product, "blinded plaintext is not a multiple of the factor");
        return Err(Error::DivisionMismatch {
            product: product.to_str_radix(10),
            factor: k.to_str_radix(10),
        });
    }
    Ok(MessagePoint::from_uint(&recovered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;
    use crate::oracle::OracleReply;
    use crate::simulated::SimulatedOracle;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn key() -> KeyPair {
        KeyPair::generate(512, &mut StdRng::seed_from_u64(17))
    }

    #[test]
    fn recovers_refused_plaintext() {
        let mut oracle = SimulatedOracle::new(key());
        let n = oracle.key().n.clone();
        let target = oracle.protect(b"picoCTF{not_so_secret}");
        for &k in [2u32, 3, 255, 65_537].iter() {
            let recovered = recover(&mut oracle, &target, &n, &BigUint::from(k)).unwrap();
            assert_eq!(recovered.text(), "picoCTF{not_so_secret}");
        }
    }

    #[test]
    fn observed_blind_matches_local_computation() {
        let mut oracle = SimulatedOracle::new(key());
        let key = oracle.key().clone();
        let k = BigUint::from(DEFAULT_FACTOR);
        let observed = blind(&mut oracle, &k, &key.n).unwrap();
        assert_eq!(observed, expected_blind(&k, &key.e, &key.n));
    }

    #[test]
    fn rejects_unusable_factors() {
        let mut oracle = SimulatedOracle::new(key());
        let n = oracle.key().n.clone();
        let target = BigUint::from(5u32);
        for k in vec![BigUint::zero(), n.clone(), BigUint::from(10u32)] {
            let err = recover(&mut oracle, &target, &n, &k).unwrap_err();
            assert!(matches!(err, Error::InvalidBlindingFactor(_)));
        }
    }

    struct Canned(Vec<OracleReply>);

    impl Oracle for Canned {
        fn encrypt(&mut self, _: &str) -> OracleReply {
            self.0.remove(0)
        }
        fn encrypt_hex(&mut self, _: &str) -> OracleReply {
            self.0.remove(0)
        }
        fn decrypt(&mut self, _: &str, _: Format) -> OracleReply {
            self.0.remove(0)
        }
    }

    #[test]
    fn inexact_division_is_reported() {
        let mut oracle = Canned(vec![
            OracleReply::Ciphertext("4".into()),
            OracleReply::Plaintext("7".into()),
        ]);
        let n = BigUint::from(1000u32);
        let err = recover(&mut oracle, &BigUint::from(3u32), &n, &BigUint::from(2u32)).unwrap_err();
        assert!(matches!(err, Error::DivisionMismatch { .. }));
    }

    #[test]
    fn target_file_ignores_line_breaks() {
        let path = std::env::temp_dir().join(format!("rsa-oracle-secret-{}.enc", std::process::id()));
        fs::write(&path, "3567\n8003\n").unwrap();
        let target = read_target(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(target, BigUint::from(35_678_003u32));
    }

    #[test]
    fn refused_decryption_is_reported() {
        let mut oracle = SimulatedOracle::new(key());
        let n = oracle.key().n.clone();
        let target = oracle.protect(b"x");
        // k = 1 reproduces the protected ciphertext itself
        let err = recover(&mut oracle, &target, &n, &BigUint::from(1u32)).unwrap_err();
        assert!(matches!(err, Error::OracleRefusal(_)));
    }
}
