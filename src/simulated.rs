use num_bigint::BigUint;
use tracing::debug;

use crate::codec;
use crate::keys::KeyPair;
use crate::oracle::{Format, Oracle, OracleReply};

/// In-process stand-in for the remote service.
///
/// Mirrors what the network sees: input is read up to the first line break,
/// messages longer than the key are refused and ciphertexts handed out as
/// secrets are never decrypted.
#[derive(Debug)]
pub struct SimulatedOracle {
    key: KeyPair,
    refused: Vec<BigUint>,
}

impl SimulatedOracle {
    pub fn new(key: KeyPair) -> Self {
        SimulatedOracle {
            key,
            refused: Vec::new(),
        }
    }

    /// Encrypts `secret` and refuses to decrypt the result from now on.
    pub fn protect(&mut self, secret: &[u8]) -> BigUint {
        let c = self.key.encrypt(&codec::bytes_to_uint(secret));
        self.refused.push(c.clone());
        c
    }

    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    fn read_message(&self, plaintext: &str) -> Option<BigUint> {
        let line = plaintext.split('\n').next().unwrap_or("");
        let bytes = codec::latin1_encode(line)?;
        if bytes.is_empty() || bytes.len() > self.key.size() {
            debug!(len = bytes.len(), "message does not fit the key");
            return None;
        }
        Some(codec::bytes_to_uint(&bytes))
    }
}

impl Oracle for SimulatedOracle {
    fn encrypt(&mut self, plaintext: &str) -> OracleReply {
        match self.read_message(plaintext) {
            Some(m) => OracleReply::Ciphertext(self.key.encrypt(&m).to_str_radix(10)),
            None => OracleReply::NoAnswer,
        }
    }

    fn encrypt_hex(&mut self, plaintext: &str) -> OracleReply {
        match self.read_message(plaintext) {
            Some(m) => OracleReply::CiphertextHex(codec::to_hex(&m)),
            None => OracleReply::NoAnswer,
        }
    }

    fn decrypt(&mut self, ciphertext: &str, format: Format) -> OracleReply {
        let c = match codec::parse_decimal(ciphertext) {
            Ok(c) => c,
            Err(_) => return OracleReply::NoAnswer,
        };
        if self.refused.contains(&c) {
            debug!("refusing to decrypt a protected ciphertext");
            return OracleReply::NoAnswer;
        }
        let m = self.key.decrypt(&c);
        match format {
            Format::Hex => OracleReply::Plaintext(codec::to_hex(&m)),
            Format::Text => OracleReply::Plaintext(codec::latin1_decode(&codec::uint_to_bytes(&m))),
        }
    }
}
