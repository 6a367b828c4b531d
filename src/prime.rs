use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;
use rand::{Rng, RngCore};

pub const DEFAULT_ROUNDS: usize = 5;

/// A uniformly random integer below `2^bits`.
pub fn random_bits<R: Rng + ?Sized>(rng: &mut R, bits: usize) -> BigUint {
    let mut bytes = vec![0u8; (bits + 7) / 8];
    rng.fill_bytes(&mut bytes);
    let excess = bytes.len() * 8 - bits;
    if let Some(first) = bytes.first_mut() {
        *first &= 0xff >> excess;
    }
    BigUint::from_bytes_be(&bytes)
}

/// A uniformly random integer in `[0, bound)`. `bound` must be positive.
pub fn random_below<R: Rng + ?Sized>(rng: &mut R, bound: &BigUint) -> BigUint {
    let bits = bound.bits();
    loop {
        let x = random_bits(rng, bits);
        if &x < bound {
            return x;
        }
    }
}

/// Miller-Rabin with `rounds` random bases; a composite slips through with
/// probability at most `4^-rounds`.
pub fn is_probable_prime<R: Rng + ?Sized>(n: &BigUint, rounds: usize, rng: &mut R) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    let three = BigUint::from(3u32);

    if n == &two || n == &three {
        return true;
    }
    if n <= &one || n.is_even() {
        return false;
    }

    let n_minus_one = n - &one;
    let mut d = n_minus_one.clone();
    let mut s = 0usize;
    while d.is_even() {
        d = d >> 1usize;
        s += 1;
    }

    let base_range = n - &three;
    'witness: for _ in 0..rounds {
        let a = &two + random_below(rng, &base_range);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Random `bits`-bit prime; top and bottom bit are always set.
pub fn generate_prime<R: Rng + ?Sized>(bits: usize, rng: &mut R) -> BigUint {
    assert!(bits >= 2, "a prime needs at least two bits");
    let top = BigUint::one() << (bits - 1);
    loop {
        let candidate = random_bits(rng, bits) | &top | BigUint::one();
        if is_probable_prime(&candidate, DEFAULT_ROUNDS, rng) {
            return candidate;
        }
    }
}
