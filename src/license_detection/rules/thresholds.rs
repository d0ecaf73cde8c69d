//! Per-rule match thresholds.
//!
//! Short rules must be matched almost entirely to be trusted, while long rules
//! accept partial matches once a minimum number of tokens and legalese tokens
//! are matched.

/// Minimum match length for approximate matching.
pub const MIN_MATCH_LENGTH: usize = 4;

/// Minimum number of legalese tokens for approximate matching.
pub const MIN_MATCH_HIGH_LENGTH: usize = 3;

/// Rules shorter than this are "small".
pub const SMALL_RULE: usize = 15;

/// Rules shorter than this are "tiny" and only matched exactly.
pub const TINY_RULE: usize = 6;

/// Thresholds derived from a rule length and legalese content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// Minimum coverage, possibly raised from the declared one for short rules
    pub minimum_coverage: Option<u8>,
    pub min_matched_length: usize,
    pub min_high_matched_length: usize,
    pub min_matched_length_unique: usize,
    pub min_high_matched_length_unique: usize,
}

impl Thresholds {
    /// Compute the thresholds of a rule.
    ///
    /// # Arguments
    /// * `minimum_coverage` - declared coverage percentage, if any
    /// * `length` - number of tokens
    /// * `high_length` - number of legalese token occurrences
    /// * `length_unique` - number of distinct tokens
    /// * `high_length_unique` - number of distinct legalese tokens
    pub fn compute(
        minimum_coverage: Option<u8>,
        length: usize,
        high_length: usize,
        length_unique: usize,
        high_length_unique: usize,
    ) -> Self {
        let (minimum_coverage, min_matched_length, min_high_matched_length) =
            occurrences(minimum_coverage, length, high_length);
        let (min_matched_length_unique, min_high_matched_length_unique) =
            unique(minimum_coverage, length, length_unique, high_length_unique);
        Self {
            minimum_coverage,
            min_matched_length,
            min_high_matched_length,
            min_matched_length_unique,
            min_high_matched_length_unique,
        }
    }
}

fn occurrences(
    minimum_coverage: Option<u8>,
    length: usize,
    high_length: usize,
) -> (Option<u8>, usize, usize) {
    if minimum_coverage == Some(100) {
        return (minimum_coverage, length, high_length);
    }
    let capped_high = high_length.min(MIN_MATCH_HIGH_LENGTH);
    match length {
        0..3 => (Some(100), length, high_length),
        3..10 => (Some(80), length, high_length),
        10..30 => (Some(50), length / 2, capped_high),
        30..200 => (minimum_coverage, MIN_MATCH_LENGTH, capped_high),
        _ => (minimum_coverage, length / 10, high_length / 10),
    }
}

fn unique(
    minimum_coverage: Option<u8>,
    length: usize,
    length_unique: usize,
    high_length_unique: usize,
) -> (usize, usize) {
    if minimum_coverage == Some(100) {
        return (length_unique, high_length_unique);
    }
    match length {
        0..5 => (length_unique, high_length_unique),
        5..10 if length_unique < 2 => (length_unique, high_length_unique),
        5..10 => (length_unique - 1, high_length_unique),
        10..20 => (high_length_unique, high_length_unique),
        20..=200 => (MIN_MATCH_LENGTH, high_length_unique.min(MIN_MATCH_HIGH_LENGTH)),
        _ => (length / 10, high_length_unique / 10),
    }
}
