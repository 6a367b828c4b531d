//! Recovering a secret from an RSA encryption oracle that speaks a line protocol.
//!
//! The search in [`solver`] finds the hidden modulus by bisection over message
//! values, [`blind`] then decrypts a refused ciphertext through a blinded one.

pub mod blind;
pub mod codec;
pub mod errors;
pub mod keys;
pub mod oracle;
pub mod point;
pub mod prime;
pub mod remote;
pub mod simulated;
pub mod solver;

pub use errors::{Error, Result};
pub use oracle::{Format, Oracle, OracleReply};
pub use point::{Direction, Interval, MessagePoint};
pub use solver::{Outcome, Solver, Step, Verdict};
