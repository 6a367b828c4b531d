use std::{fs::File, path::Path};

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::One;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::prime::generate_prime;

pub const PUBLIC_EXPONENT: u32 = 65537;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub n: BigUint,
    pub e: BigUint,
    pub d: BigUint,
}

/// `x^-1 mod m`, if it exists.
pub fn modular_inverse(x: &BigUint, m: &BigUint) -> Option<BigUint> {
    let m = BigInt::from_biguint(Sign::Plus, m.clone());
    let e = BigInt::from_biguint(Sign::Plus, x.clone()).extended_gcd(&m);
    if !e.gcd.is_one() {
        return None;
    }
    e.x.mod_floor(&m).to_biguint()
}

impl KeyPair {
    /// One attempt at a `total_bits` key from two fresh primes.
    pub fn try_generate<R: Rng + ?Sized>(total_bits: usize, rng: &mut R) -> Result<Self> {
        let p = generate_prime(total_bits / 2, rng);
        let q = generate_prime(total_bits / 2, rng);
        Self::from_primes(&p, &q)
    }

    pub fn from_primes(p: &BigUint, q: &BigUint) -> Result<Self> {
        let n = p * q;
        let one = BigUint::one();
        let phi = (p - &one) * (q - &one);
        let e = BigUint::from(PUBLIC_EXPONENT);
        let d = modular_inverse(&e, &phi).ok_or(Error::NotInvertible)?;
        Ok(KeyPair { n, e, d })
    }

    /// Draws primes until `e` is invertible.
    pub fn generate<R: Rng + ?Sized>(total_bits: usize, rng: &mut R) -> Self {
        loop {
            match Self::try_generate(total_bits, rng) {
                Ok(key) => return key,
                Err(_) => continue,
            }
        }
    }

    pub fn encrypt(&self, m: &BigUint) -> BigUint {
        m.modpow(&self.e, &self.n)
    }

    pub fn decrypt(&self, c: &BigUint) -> BigUint {
        c.modpow(&self.d, &self.n)
    }

    /// Length of the modulus in bytes.
    pub fn size(&self) -> usize {
        (self.n.bits() + 7) / 8
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(file, self)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn inverse_of_small_numbers() {
        let m = BigUint::from(40u32);
        assert_eq!(modular_inverse(&BigUint::from(3u32), &m), Some(BigUint::from(27u32)));
        assert_eq!(modular_inverse(&BigUint::from(4u32), &m), None);
    }

    #[test]
    fn exponent_sharing_a_factor_with_phi_is_rejected() {
        // 917519 - 1 = 14 * 65537
        let p = BigUint::from(917_519u32);
        let q = BigUint::from(1_000_003u32);
        assert!(matches!(KeyPair::from_primes(&p, &q), Err(Error::NotInvertible)));
    }

    #[test]
    fn generated_key_round_trips() {
        let mut rng = StdRng::seed_from_u64(5);
        let key = KeyPair::generate(256, &mut rng);
        assert!(key.n.bits() >= 255);
        let m = BigUint::from(0xdead_beefu32);
        assert_eq!(key.decrypt(&key.encrypt(&m)), m);
    }

    #[test]
    fn key_file_round_trips() {
        let mut rng = StdRng::seed_from_u64(6);
        let key = KeyPair::generate(128, &mut rng);
        let path = std::env::temp_dir().join(format!("rsa-oracle-key-{}.json", std::process::id()));
        key.save(&path).unwrap();
        let loaded = KeyPair::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, key);
    }
}
