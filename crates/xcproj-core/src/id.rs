//! Object identifiers and the strategies that produce them.
//!
//! Every object in a project document is keyed by a 24-character hex token
//! (96 bits). Identifiers compare as text, which is also the order the
//! writer lists objects in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::graph::GraphError;

/// Number of hex characters in an identifier.
pub const IDENTIFIER_LEN: usize = 24;

/// A 24-character hexadecimal object key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Parse an identifier, rejecting anything that is not 24 hex digits.
    pub fn parse(text: &str) -> Result<Self, GraphError> {
        if Self::is_valid(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(GraphError::InvalidIdentifier(text.to_string()))
        }
    }

    /// Whether `text` has the shape of an identifier.
    pub fn is_valid(text: &str) -> bool {
        text.len() == IDENTIFIER_LEN && text.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Render the low 96 bits of `value` as an identifier.
    pub fn from_u128(value: u128) -> Self {
        let masked = value & ((1u128 << 96) - 1);
        Self(format!("{masked:024X}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Sorts before every valid identifier; only used as a range bound.
    pub(crate) fn min() -> Self {
        Self(String::new())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identifier {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(GraphError::InvalidIdentifier(value))
        }
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

/// Source of fresh identifiers for a graph.
///
/// The graph re-rolls when a generated identifier is already taken, so an
/// implementation only has to make collisions unlikely, not impossible.
pub trait IdGenerator: fmt::Debug + Send {
    fn generate(&mut self) -> Identifier;
}

/// Production generator: 96 random bits per identifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn generate(&mut self) -> Identifier {
        let raw = Uuid::new_v4().as_u128();
        // Squeeze out the fixed version nibble (bits 76..80) and variant
        // bits (62..64), leaving 122 random bits.
        let high = raw >> 80;
        let mid = (raw >> 64) & 0xFFF;
        let low = raw & ((1 << 62) - 1);
        Identifier::from_u128((high << 74) | (mid << 62) | low)
    }
}

/// Deterministic generator for tests: 1, 2, 3, ... as fixed-width hex.
#[derive(Debug, Default, Clone)]
pub struct SequentialIds {
    counter: u128,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting from `next` (the next identifier produced).
    pub fn starting_at(next: u128) -> Self {
        Self {
            counter: next.saturating_sub(1),
        }
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

impl IdGenerator for SequentialIds {
    fn generate(&mut self) -> Identifier {
        self.counter += 1;
        Identifier::from_u128(self.counter)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn sequential_ids_are_fixed_width_hex() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.generate().as_str(), "000000000000000000000001");
        assert_eq!(ids.generate().as_str(), "000000000000000000000002");
        for _ in 0..13 {
            ids.generate();
        }
        assert_eq!(ids.generate().as_str(), "000000000000000000000010");
    }

    #[test]
    fn sequential_reset_restarts_sequence() {
        let mut ids = SequentialIds::new();
        ids.generate();
        ids.generate();
        ids.reset();
        assert_eq!(ids.generate().as_str(), "000000000000000000000001");
    }

    #[test]
    fn starting_at_skips_ahead() {
        let mut ids = SequentialIds::starting_at(0x100);
        assert_eq!(ids.generate().as_str(), "000000000000000000000100");
    }

    #[test]
    fn random_ids_carry_no_fixed_uuid_bits() {
        let mut ids = RandomIds;
        let generated: Vec<Identifier> = (0..200).map(|_| ids.generate()).collect();
        let digits_at = |i: usize| -> HashSet<u8> {
            generated.iter().map(|id| id.as_str().as_bytes()[i]).collect()
        };
        // Where a v4 UUID keeps its version digit and variant bits.
        assert!(digits_at(12).len() > 1);
        assert!(digits_at(16).iter().any(|d| !b"89AB".contains(d)));
    }

    #[test]
    fn random_ids_are_valid_and_distinct() {
        let mut ids = RandomIds;
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let id = ids.generate();
            assert!(Identifier::is_valid(id.as_str()));
            assert!(id.as_str().bytes().all(|b| !b.is_ascii_lowercase()));
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn parse_rejects_bad_tokens() {
        assert!(Identifier::parse("1D6058900D05DD3D006BFB54").is_ok());
        assert!(Identifier::parse("1D6058900D05DD3D006BFB5").is_err());
        assert!(Identifier::parse("1D6058900D05DD3D006BFB5G").is_err());
        assert!(Identifier::parse("").is_err());
    }

    #[test]
    fn ordering_is_textual() {
        let a = Identifier::parse("000000000000000000000002").unwrap();
        let b = Identifier::parse("1D6058900D05DD3D006BFB54").unwrap();
        let c = Identifier::parse("A0000000000000000000000F").unwrap();
        assert!(a < b && b < c);
    }
}
