/// How the oracle should print a decryption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Text,
    Hex,
}

/// One answer from the oracle. `NoAnswer` covers transport failures, replies
/// that did not parse and outright refusals alike.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OracleReply {
    Ciphertext(String),
    CiphertextHex(String),
    Plaintext(String),
    NoAnswer,
}

impl OracleReply {
    /// The payload, or `None` for `NoAnswer`.
    pub fn value(self) -> Option<String> {
        match self {
            OracleReply::Ciphertext(s) | OracleReply::CiphertextHex(s) | OracleReply::Plaintext(s) => {
                Some(s)
            }
            OracleReply::NoAnswer => None,
        }
    }

    pub fn is_answer(&self) -> bool {
        *self != OracleReply::NoAnswer
    }
}

/// An RSA service that encrypts text and decrypts ciphertexts on request.
///
/// `encrypt` answers with the decimal ciphertext, `encrypt_hex` with the hex
/// encoding of the message the service actually read for the same request.
pub trait Oracle {
    fn encrypt(&mut self, plaintext: &str) -> OracleReply;
    fn encrypt_hex(&mut self, plaintext: &str) -> OracleReply;
    fn decrypt(&mut self, ciphertext: &str, format: Format) -> OracleReply;
}

impl<'a, O: Oracle + ?Sized> Oracle for &'a mut O {
    fn encrypt(&mut self, plaintext: &str) -> OracleReply {
        (**self).encrypt(plaintext)
    }

    fn encrypt_hex(&mut self, plaintext: &str) -> OracleReply {
        (**self).encrypt_hex(plaintext)
    }

    fn decrypt(&mut self, ciphertext: &str, format: Format) -> OracleReply {
        (**self).decrypt(ciphertext, format)
    }
}
