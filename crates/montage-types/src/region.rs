//! Regions: the fixed, single-letter interaction zones.
//!
//! The pool of region letters is chosen once at startup (for example
//! `ABCD`) and never changes. Each region is owned by exactly one Reactor
//! for the lifetime of the process.

use serde::{Deserialize, Serialize};

/// Errors raised while building a region pool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    /// The letter pool was empty.
    #[error("at least one region letter must be configured")]
    Empty,

    /// The same letter appeared twice.
    #[error("region letter {0} is listed more than once")]
    Duplicate(char),

    /// A character that cannot name a region (whitespace or `*`).
    #[error("{0:?} cannot be used as a region letter")]
    Invalid(char),
}

/// A single interaction zone, named by one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Region(char);

impl Region {
    /// Wrap a region letter.
    pub const fn new(letter: char) -> Self {
        Self(letter)
    }

    /// The region's letter.
    pub const fn letter(self) -> char {
        self.0
    }

    /// Parse a region name. Only strings of exactly one character qualify.
    pub fn parse(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) => Some(Self(letter)),
            _ => None,
        }
    }
}

impl core::fmt::Display for Region {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The ordered pool of region letters, fixed at startup.
///
/// Order matters: region assignment hands out the first free letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionLetters(Vec<Region>);

impl RegionLetters {
    /// Build a pool from a string such as `"ABCD"`.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] if the string is empty, repeats a letter,
    /// or contains whitespace or `*` (reserved for "no region").
    pub fn parse(letters: &str) -> Result<Self, RegionError> {
        let mut regions: Vec<Region> = Vec::new();
        for letter in letters.chars() {
            if letter.is_whitespace() || letter == '*' {
                return Err(RegionError::Invalid(letter));
            }
            let region = Region(letter);
            if regions.contains(&region) {
                return Err(RegionError::Duplicate(letter));
            }
            regions.push(region);
        }
        if regions.is_empty() {
            return Err(RegionError::Empty);
        }
        Ok(Self(regions))
    }

    /// Iterate over the regions in pool order.
    pub fn iter(&self) -> impl Iterator<Item = Region> + '_ {
        self.0.iter().copied()
    }

    /// Number of regions in the pool.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the pool is empty (never true for a parsed pool).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for RegionLetters {
    fn default() -> Self {
        Self(vec![Region('A'), Region('B'), Region('C'), Region('D')])
    }
}

impl core::fmt::Display for RegionLetters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for region in &self.0 {
            write!(f, "{region}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_order() {
        let letters = RegionLetters::parse("DCBA").unwrap_or_default();
        let order: String = letters.iter().map(Region::letter).collect();
        assert_eq!(order, "DCBA");
        assert_eq!(letters.to_string(), "DCBA");
    }

    #[test]
    fn rejects_bad_pools() {
        assert_eq!(RegionLetters::parse(""), Err(RegionError::Empty));
        assert_eq!(RegionLetters::parse("ABA"), Err(RegionError::Duplicate('A')));
        assert_eq!(RegionLetters::parse("A*"), Err(RegionError::Invalid('*')));
    }

    #[test]
    fn region_names_are_single_characters() {
        assert_eq!(Region::parse("B"), Some(Region::new('B')));
        assert_eq!(Region::parse(""), None);
        assert_eq!(Region::parse("AB"), None);
    }
}
