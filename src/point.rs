use num_bigint::BigUint;

use crate::codec;
use crate::errors::{Error, Result};

const NEWLINE: u8 = b'\n';

/// Which way `strip_after_newline` rewrites a line break.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Newline becomes `0x0b`, everything after it `0x00`.
    Down,
    /// Newline becomes `0x09`, everything after it `0xfe`.
    Up,
}

impl Direction {
    fn sentinel(self) -> u8 {
        match self {
            Direction::Down => 0x0b,
            Direction::Up => 0x09,
        }
    }

    fn filler(self) -> u8 {
        match self {
            Direction::Down => 0x00,
            Direction::Up => 0xfe,
        }
    }
}

/// A message as the oracle sees it: one byte string, read either as a number or as text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagePoint {
    bytes: Vec<u8>,
}

impl MessagePoint {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        MessagePoint { bytes: bytes.into() }
    }

    pub fn from_uint(value: &BigUint) -> Self {
        MessagePoint {
            bytes: codec::uint_to_bytes(value),
        }
    }

    /// `width` copies of `byte`, the usual way to bracket a search.
    pub fn repeated(byte: u8, width: usize) -> Self {
        MessagePoint {
            bytes: vec![byte; width],
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn value(&self) -> BigUint {
        codec::bytes_to_uint(&self.bytes)
    }

    pub fn text(&self) -> String {
        codec::latin1_decode(&self.bytes)
    }

    pub fn hex(&self) -> String {
        codec::to_hex(&self.value())
    }

    pub fn newline_offset(&self) -> Option<usize> {
        self.bytes.iter().position(|&b| b == NEWLINE)
    }

    /// Floor of the average of both values. Only meaningful for `self < other`.
    pub fn midpoint(&self, other: &MessagePoint) -> MessagePoint {
        let mid: BigUint = (self.value() + other.value()) >> 1usize;
        MessagePoint::from_uint(&mid)
    }

    pub fn strip_after_newline(&self, direction: Direction) -> MessagePoint {
        let mut bytes = self.bytes.clone();
        if let Some(i) = self.newline_offset() {
            bytes[i] = direction.sentinel();
            for b in &mut bytes[i + 1..] {
                *b = direction.filler();
            }
        }
        MessagePoint { bytes }
    }
}

/// The search bracket: the boundary lies in `[start.value, end.value)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interval {
    start: MessagePoint,
    end: MessagePoint,
}

impl Interval {
    pub fn new(start: MessagePoint, end: MessagePoint) -> Result<Self> {
        if start.value() >= end.value() {
            return Err(Error::EmptyInterval);
        }
        Ok(Interval { start, end })
    }

    pub fn start(&self) -> &MessagePoint {
        &self.start
    }

    pub fn end(&self) -> &MessagePoint {
        &self.end
    }

    pub fn width(&self) -> BigUint {
        self.end.value() - self.start.value()
    }

    pub fn contains_strictly(&self, point: &MessagePoint) -> bool {
        let v = point.value();
        self.start.value() < v && v < self.end.value()
    }
}
