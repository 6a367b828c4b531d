use num_bigint::BigUint;
use num_traits::Num;

use crate::errors::{Error, Result};

/// Minimal big-endian encoding. Zero encodes as a single `0x00` byte.
pub fn uint_to_bytes(x: &BigUint) -> Vec<u8> {
    x.to_bytes_be()
}

pub fn bytes_to_uint(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Maps every byte to the char with the same code point, so any byte string survives.
pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of `latin1_decode`; `None` if a char is outside `U+0000..=U+00FF`.
pub fn latin1_encode(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if code <= 0xff {
                Some(code as u8)
            } else {
                None
            }
        })
        .collect()
}

/// Lower-case hex without prefix or padding, the way the oracle prints `Hex m`.
pub fn to_hex(x: &BigUint) -> String {
    x.to_str_radix(16)
}

pub fn parse_hex(s: &str) -> Result<BigUint> {
    BigUint::from_str_radix(s.trim(), 16).map_err(|_| Error::Parse(format!("hex number {:?}", s)))
}

pub fn parse_decimal(s: &str) -> Result<BigUint> {
    BigUint::from_str_radix(s.trim(), 10)
        .map_err(|_| Error::Parse(format!("decimal number {:?}", s)))
}
