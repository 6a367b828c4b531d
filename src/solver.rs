//! Bisection for the hidden modulus.
//!
//! A message `m` survives `decrypt(encrypt(m))` unchanged exactly when
//! `m < N`, so the round trip is a monotone predicate over message values and
//! an interval around `N` can be halved with three oracle exchanges per step.
//! The service reads one line per request, so probes are rewritten to contain
//! no `0x0a` byte before they are sent.

use num_bigint::BigUint;
use num_traits::One;
use tracing::{debug, info, instrument};

use crate::errors::{Error, Result};
use crate::oracle::{Format, Oracle};
use crate::point::{Direction, Interval, MessagePoint};

/// Leading hex digits that must agree before a mismatch counts as ambiguous.
pub const OVERLAP_DIGITS: usize = 8;

/// How the oracle's round trip of a candidate compares to the candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Lossless: the boundary is above the candidate.
    Above,
    /// Unrelated result: the boundary is at or below the candidate.
    Below,
    /// Same leading digits, different tail.
    Ambiguous,
    /// One of the three requests got no answer.
    Refused,
}

impl Verdict {
    pub fn judge(candidate_hex: &str, decrypted_hex: &str) -> Verdict {
        if candidate_hex == decrypted_hex {
            Verdict::Above
        } else if leading(candidate_hex) == leading(decrypted_hex) {
            Verdict::Ambiguous
        } else {
            Verdict::Below
        }
    }
}

fn leading(hex: &str) -> &str {
    match hex.char_indices().nth(OVERLAP_DIGITS) {
        Some((i, _)) => &hex[..i],
        None => hex,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    Narrowed(Interval),
    Done(Interval),
}

/// Where `Solver::run` stopped.
#[derive(Debug)]
pub enum Outcome {
    /// Collapsed to width below two; `end` is the boundary.
    Done(Interval),
    /// The caller's step limit ran out first.
    Halted(Interval),
    /// A step failed; `interval` is the last bracket still known to be valid.
    Failed { interval: Interval, error: Error },
}

impl Outcome {
    pub fn interval(&self) -> &Interval {
        match self {
            Outcome::Done(i) | Outcome::Halted(i) => i,
            Outcome::Failed { interval, .. } => interval,
        }
    }
}

/// A point strictly inside the interval whose text has no line break.
pub fn candidate(interval: &Interval) -> Result<MessagePoint> {
    let mid = interval.start().midpoint(interval.end());
    for &direction in [Direction::Down, Direction::Up].iter() {
        let candidate = mid.strip_after_newline(direction);
        if interval.contains_strictly(&candidate) {
            return Ok(candidate);
        }
    }
    Err(Error::NoCandidate)
}

/// Replies gathered for one candidate, in the order they were requested.
struct Probe {
    reported_hex: String,
    decrypted_hex: String,
}

pub struct Solver<O> {
    oracle: O,
    steps: usize,
}

impl<O: Oracle> Solver<O> {
    pub fn new(oracle: O) -> Self {
        Solver { oracle, steps: 0 }
    }

    /// Steps that narrowed the interval so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn into_inner(self) -> O {
        self.oracle
    }

    /// Encrypt, echo and round trip for one candidate; `None` on the first missing answer.
    fn probe(&mut self, candidate: &MessagePoint) -> Option<Probe> {
        let text = candidate.text();
        let ciphertext = self.oracle.encrypt(&text).value()?;
        let reported_hex = self.oracle.encrypt_hex(&text).value()?;
        let decrypted_hex = self.oracle.decrypt(&ciphertext, Format::Hex).value()?;
        Some(Probe {
            reported_hex,
            decrypted_hex,
        })
    }

    pub fn step(&mut self, interval: &Interval) -> Result<Step> {
        if interval.width() < BigUint::from(2u32) {
            return Ok(Step::Done(interval.clone()));
        }

        let candidate = candidate(interval)?;
        let candidate_hex = candidate.hex();

        let (verdict, decrypted_hex) = match self.probe(&candidate) {
            None => (Verdict::Refused, String::new()),
            Some(probe) => {
                if probe.reported_hex != candidate_hex {
                    return Err(Error::FramingInconsistency {
                        expected: candidate_hex,
                        reported: probe.reported_hex,
                    });
                }
                let verdict = Verdict::judge(&candidate_hex, &probe.decrypted_hex);
                (verdict, probe.decrypted_hex)
            }
        };
        debug!(?verdict, candidate = %candidate_hex, "probed");

        let next = match verdict {
            Verdict::Above => Interval::new(candidate, interval.end().clone())?,
            Verdict::Below => Interval::new(interval.start().clone(), candidate)?,
            Verdict::Refused => return Err(Error::OracleRefusal("search")),
            Verdict::Ambiguous => {
                return Err(Error::AmbiguousBoundary {
                    candidate: candidate_hex,
                    decrypted: decrypted_hex,
                })
            }
        };
        self.steps += 1;
        Ok(Step::Narrowed(next))
    }

    /// Steps until the interval collapses, a step fails or `limit` steps were taken.
    #[instrument(skip(self, interval))]
    pub fn run(&mut self, mut interval: Interval, limit: Option<usize>) -> Outcome {
        let mut taken = 0;
        loop {
            if limit.map_or(false, |limit| taken >= limit) {
                info!(taken, "step limit reached");
                return Outcome::Halted(interval);
            }
            match self.step(&interval) {
                Ok(Step::Done(done)) => {
                    info!(taken, "interval collapsed");
                    return Outcome::Done(done);
                }
                Ok(Step::Narrowed(next)) => {
                    taken += 1;
                    info!(step = taken, width_bits = next.width().bits(), "narrowed");
                    interval = next;
                }
                Err(error) => {
                    info!(%error, "search failed");
                    return Outcome::Failed { interval, error };
                }
            }
        }
    }
}

/// `end` of a collapsed interval, which is the modulus itself.
pub fn boundary(interval: &Interval) -> Option<BigUint> {
    if interval.width() <= BigUint::one() {
        Some(interval.end().value())
    } else {
        None
    }
}
