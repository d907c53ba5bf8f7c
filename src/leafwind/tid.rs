//! # Timestamp Identifiers
//!
//! Every record we hand to the PDS is keyed by a TID: a 13 character string in a
//! sortable base32 alphabet that encodes a 63-bit integer:
//!
//! ```text
//!  0 | 53 bits: microseconds since epoch | 10 bits: clock id
//! ```
//!
//! The alphabet is `2`-`7` followed by `a`-`z`, ordered so that ASCII order is
//! numeric order. Two TIDs minted at different microseconds therefore sort by
//! time under plain string comparison.
//!
//! Within a single microsecond the only tiebreak is the random clock id, so two
//! TIDs from the same instant are not guaranteed to be distinct or ordered.
//! Timestamps come from a millisecond clock multiplied by 1000, which makes
//! same-"microsecond" collisions more likely than the name suggests.

use crate::error::{LeafwindError, Result};
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const ALPHABET: &[u8; 32] = b"234567abcdefghijklmnopqrstuvwxyz";
pub const TID_LEN: usize = 13;

const CLOCK_ID_BITS: u32 = 10;
const CLOCK_ID_MASK: u64 = (1 << CLOCK_ID_BITS) - 1;
const MAX_VALUE: u64 = (1 << 63) - 1;

/// A time-ordered record key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tid(u64);

impl Tid {
    /// Mint a TID for the current wall-clock time with a random clock id.
    pub fn now() -> Self {
        let micros = Utc::now().timestamp_millis().max(0) as u64 * 1000;
        let clock_id = rand::thread_rng().gen_range(0..=CLOCK_ID_MASK as u16);
        Self::from_parts(micros, clock_id)
    }

    /// Build a TID from a microsecond timestamp and a clock id.
    ///
    /// Only the low 53 bits of `micros` and the low 10 bits of `clock_id` are used.
    pub fn from_parts(micros: u64, clock_id: u16) -> Self {
        let value = ((micros << CLOCK_ID_BITS) | (clock_id as u64 & CLOCK_ID_MASK)) & MAX_VALUE;
        Tid(value)
    }

    pub fn timestamp_micros(&self) -> u64 {
        self.0 >> CLOCK_ID_BITS
    }

    pub fn clock_id(&self) -> u16 {
        (self.0 & CLOCK_ID_MASK) as u16
    }
}

/// Generate a fresh TID string.
pub fn generate() -> String {
    Tid::now().to_string()
}

/// Encode an integer into the sortable alphabet, left-padded with `'2'` to 13 chars.
pub fn encode(mut value: u64) -> String {
    let mut buf = [ALPHABET[0]; TID_LEN];
    let mut pos = TID_LEN;
    while value > 0 && pos > 0 {
        pos -= 1;
        buf[pos] = ALPHABET[(value % 32) as usize];
        value /= 32;
    }
    buf.iter().map(|&b| b as char).collect()
}

/// Decode a 13 character TID back into its integer value.
pub fn decode(s: &str) -> Result<u64> {
    if s.len() != TID_LEN {
        return Err(LeafwindError::InvalidTid(format!(
            "expected {} characters, got {}",
            TID_LEN,
            s.len()
        )));
    }

    let mut value: u64 = 0;
    for c in s.bytes() {
        let digit = ALPHABET
            .iter()
            .position(|&a| a == c)
            .ok_or_else(|| LeafwindError::InvalidTid(format!("invalid character in {}", s)))?;
        value = value
            .checked_mul(32)
            .and_then(|v| v.checked_add(digit as u64))
            .ok_or_else(|| LeafwindError::InvalidTid(format!("{} overflows 64 bits", s)))?;
    }

    if value > MAX_VALUE {
        return Err(LeafwindError::InvalidTid(format!(
            "{} does not fit in 63 bits",
            s
        )));
    }
    Ok(value)
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode(self.0))
    }
}

impl FromStr for Tid {
    type Err = LeafwindError;

    fn from_str(s: &str) -> Result<Self> {
        decode(s).map(Tid)
    }
}

impl Serialize for Tid {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Tid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
