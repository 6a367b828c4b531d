use std::{error, fmt, io};

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a search step, a blinding recovery or key handling.
///
/// The oracle failures are kept apart so a caller can tell a dead connection
/// (`OracleRefusal`) from evidence that the framing model itself is wrong.
#[derive(Debug)]
pub enum Error {
    /// The oracle gave no answer: transport failure, unparsable reply or refusal.
    OracleRefusal(&'static str),
    /// A reply or input was not a number in the expected radix.
    Parse(String),
    /// The oracle's `Hex m` echo disagrees with the locally encoded candidate.
    FramingInconsistency { expected: String, reported: String },
    /// The round trip shares its leading hex digits with the candidate but differs later.
    AmbiguousBoundary { candidate: String, decrypted: String },
    /// Neither newline-free rewrite of the midpoint lies strictly inside the interval.
    NoCandidate,
    /// An interval was built with `start >= end`.
    EmptyInterval,
    /// The unblinded plaintext is not a multiple of the blinding factor.
    DivisionMismatch { product: String, factor: String },
    InvalidBlindingFactor(String),
    /// The public exponent has no inverse modulo phi.
    NotInvertible,
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OracleRefusal(request) => write!(f, "oracle gave no answer to {} request", request),
            Error::Parse(m) => write!(f, "could not parse {}", m),
            Error::FramingInconsistency { expected, reported } => write!(
                f,
                "oracle encoded the candidate as {} but we sent {}",
                reported, expected
            ),
            Error::AmbiguousBoundary { candidate, decrypted } => write!(
                f,
                "round trip {} only partially matches candidate {}",
                decrypted, candidate
            ),
            Error::NoCandidate => write!(f, "no newline-free candidate inside the interval"),
            Error::EmptyInterval => write!(f, "interval start is not below its end"),
            Error::DivisionMismatch { product, factor } => {
                write!(f, "{} is not divisible by blinding factor {}", product, factor)
            }
            Error::InvalidBlindingFactor(m) => write!(f, "invalid blinding factor: {}", m),
            Error::NotInvertible => write!(f, "public exponent is not invertible modulo phi"),
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
