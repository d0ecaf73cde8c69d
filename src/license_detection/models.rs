//! Core data structures for license detection: rules and matches.

use serde::Serialize;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumString};

use crate::license_detection::expression::same_licensing;
use crate::license_detection::index::vocabulary::TokenId;
use crate::license_detection::spans::Span;

/// License expression used by negative rules.
pub const NOT_A_LICENSE: &str = "not-a-license";

/// A license rule: a text to match and what a match of it means.
///
/// Rules are loaded from `.RULE` files and are immutable once indexed. The
/// token fields and the thresholds are filled in at index build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Unique identifier, usually the rule file name (e.g. "mit_12.RULE")
    pub identifier: String,

    /// License expression using license keys, `not-a-license` for negative rules
    pub license_expression: String,

    /// Text to match; `{{...}}` parts are template holes
    pub text: String,

    /// Token ids of the text
    pub tokens: Vec<TokenId>,

    /// Positions followed by a template hole
    pub gaps: BTreeSet<usize>,

    /// Number of tokens
    pub length: usize,

    /// A full license text
    pub is_license_text: bool,

    /// An explicit notice like "Licensed under the MIT license"
    pub is_license_notice: bool,

    /// A reference like a bare name or URL
    pub is_license_reference: bool,

    /// A structured licensing tag such as a manifest field
    pub is_license_tag: bool,

    /// Exact matches of this rule are false positives and discard the match
    pub is_false_positive: bool,

    /// Matches of this rule suppress any license found on the same text
    pub is_negative: bool,

    /// Only match the whole text contiguously
    pub is_continuous: bool,

    /// Relevance 0-100 applied as a weight to the match score
    pub relevance: u8,

    /// Minimum match coverage percentage (0-100) if specified
    pub minimum_coverage: Option<u8>,

    pub notes: Option<String>,

    /// Count of unique token ids
    pub length_unique: usize,

    /// Count of unique legalese token ids
    pub high_length_unique: usize,

    /// Count of legalese token occurrences
    pub high_length: usize,

    pub min_matched_length: usize,
    pub min_high_matched_length: usize,
    pub min_matched_length_unique: usize,
    pub min_high_matched_length_unique: usize,

    /// Fewer than `SMALL_RULE` tokens
    pub is_small: bool,

    /// Fewer than `TINY_RULE` tokens
    pub is_tiny: bool,

    /// Eligible for chunk and fragment matching
    pub is_approx_matchable: bool,
}

impl Rule {
    /// Create an unindexed rule with default metadata: relevance 100, no flags.
    pub fn new(
        identifier: impl Into<String>,
        license_expression: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            license_expression: license_expression.into(),
            text: text.into(),
            tokens: Vec::new(),
            gaps: BTreeSet::new(),
            length: 0,
            is_license_text: false,
            is_license_notice: false,
            is_license_reference: false,
            is_license_tag: false,
            is_false_positive: false,
            is_negative: false,
            is_continuous: false,
            relevance: 100,
            minimum_coverage: None,
            notes: None,
            length_unique: 0,
            high_length_unique: 0,
            high_length: 0,
            min_matched_length: 0,
            min_high_matched_length: 0,
            min_matched_length_unique: 0,
            min_high_matched_length_unique: 0,
            is_small: false,
            is_tiny: false,
            is_approx_matchable: false,
        }
    }

    /// False for negative and false positive rules, whose matches never
    /// reach the final results.
    pub fn is_real_license(&self) -> bool {
        !self.is_negative && !self.is_false_positive
    }

    pub fn has_gaps(&self) -> bool {
        !self.gaps.is_empty()
    }

    /// Number of `is_license_*` kind flags set.
    pub fn kind_flag_count(&self) -> usize {
        [
            self.is_license_text,
            self.is_license_notice,
            self.is_license_reference,
            self.is_license_tag,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }
}

/// Matching strategy that produced a match.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Display,
    AsRefStr,
    EnumString,
)]
pub enum Matcher {
    /// Exact whole-rule match with the token automaton
    #[strum(serialize = "2-aho")]
    #[serde(rename = "2-aho")]
    Exact,

    /// Starter n-gram seeded match with greedy extension
    #[strum(serialize = "chunk")]
    #[serde(rename = "chunk")]
    Chunk,

    /// Fragment seeded approximate alignment
    #[strum(serialize = "3-seq")]
    #[serde(rename = "3-seq")]
    Fragment,
}

/// A match of one rule on a region of a query.
///
/// `qspan` holds query positions, `ispan` the matched rule positions and
/// `hispan` the legalese subset of `ispan`. Lines are 1-based.
#[derive(Debug, Clone)]
pub struct LicenseMatch {
    pub rid: usize,
    pub rule: Arc<Rule>,
    pub qspan: Span,
    pub ispan: Span,
    pub hispan: Span,
    pub matcher: Matcher,
    /// Rule coverage 0-100, 100 for a whole-rule match
    pub score: f32,
    pub start_line: usize,
    pub end_line: usize,
}

impl LicenseMatch {
    /// Build a match, computing its score and line range.
    ///
    /// # Arguments
    /// * `line_by_pos` - 1-based line of each query position
    pub fn new(
        rid: usize,
        rule: Arc<Rule>,
        qspan: Span,
        ispan: Span,
        hispan: Span,
        matcher: Matcher,
        line_by_pos: &[usize],
    ) -> Self {
        debug_assert!(qspan.end() < line_by_pos.len() || qspan.is_empty());
        let start_line = line_by_pos.get(qspan.start()).copied().unwrap_or(1);
        let end_line = line_by_pos.get(qspan.end()).copied().unwrap_or(start_line);
        let score = compute_score(ispan.len(), rule.length);
        Self {
            rid,
            rule,
            qspan,
            ispan,
            hispan,
            matcher,
            score,
            start_line,
            end_line,
        }
    }

    pub fn license_expression(&self) -> &str {
        &self.rule.license_expression
    }

    pub fn rule_identifier(&self) -> &str {
        &self.rule.identifier
    }

    /// Number of matched query positions.
    pub fn len(&self) -> usize {
        self.qspan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qspan.is_empty()
    }

    /// Number of matched rule positions.
    pub fn ilen(&self) -> usize {
        self.ispan.len()
    }

    /// Number of matched legalese rule positions.
    pub fn hilen(&self) -> usize {
        self.hispan.len()
    }

    pub fn qstart(&self) -> usize {
        self.qspan.start()
    }

    pub fn qend(&self) -> usize {
        self.qspan.end()
    }

    /// Score weighted by the rule relevance.
    pub fn weighted_score(&self) -> f32 {
        self.score * self.rule.relevance as f32 / 100.0
    }

    /// True if this match covers the whole rule.
    pub fn is_full(&self) -> bool {
        self.ilen() == self.rule.length
    }

    /// True if both matches report the same licensing.
    pub fn is_same(&self, other: &LicenseMatch) -> bool {
        self.rid == other.rid
            || same_licensing(self.license_expression(), other.license_expression())
    }

    /// True if this match comes after `other` both in the query and in the rule.
    pub fn is_after(&self, other: &LicenseMatch) -> bool {
        self.qspan.is_after(&other.qspan) && self.ispan.is_after(&other.ispan)
    }

    /// True if the match is too short to be trusted given the rule thresholds.
    pub fn is_small(&self) -> bool {
        let rule = &self.rule;
        let ilen = self.ilen();
        let hilen = self.hilen();
        if rule.is_small && self.score < 50.0 {
            return true;
        }
        if ilen < rule.min_matched_length || hilen < rule.min_high_matched_length {
            return !self.is_full();
        }
        false
    }

    /// Merge another match of the same rule into a new match.
    pub fn combine(&self, other: &LicenseMatch) -> LicenseMatch {
        debug_assert_eq!(self.rid, other.rid);
        let ispan = self.ispan.union(&other.ispan);
        let score = compute_score(ispan.len(), self.rule.length);
        LicenseMatch {
            rid: self.rid,
            rule: Arc::clone(&self.rule),
            qspan: self.qspan.union(&other.qspan),
            hispan: self.hispan.union(&other.hispan),
            ispan,
            matcher: self.matcher,
            score,
            start_line: self.start_line.min(other.start_line),
            end_line: self.end_line.max(other.end_line),
        }
    }

    /// The lines of `text` covered by this match.
    pub fn matched_text(&self, text: &str) -> String {
        text.lines()
            .skip(self.start_line.saturating_sub(1))
            .take(self.end_line + 1 - self.start_line.max(1))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn compute_score(ilen: usize, rule_length: usize) -> f32 {
    if rule_length == 0 {
        return 0.0;
    }
    let raw = ilen as f32 * 100.0 / rule_length as f32;
    ((raw * 100.0).round() / 100.0).clamp(0.0, 100.0)
}

impl PartialEq for LicenseMatch {
    fn eq(&self, other: &Self) -> bool {
        self.rule.identifier == other.rule.identifier
            && self.qspan == other.qspan
            && self.ispan == other.ispan
            && self.score.to_bits() == other.score.to_bits()
    }
}

impl Eq for LicenseMatch {}

impl Hash for LicenseMatch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rule.identifier.hash(state);
        self.qspan.hash(state);
        self.ispan.hash(state);
        self.score.to_bits().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn indexed_rule(identifier: &str, expression: &str, length: usize) -> Arc<Rule> {
        let mut rule = Rule::new(identifier, expression, "text");
        rule.is_license_notice = true;
        rule.length = length;
        rule.tokens = (0..length as TokenId).collect();
        rule.min_matched_length = 4;
        rule.min_high_matched_length = 1;
        Arc::new(rule)
    }

    fn license_match(rule: &Arc<Rule>, q: std::ops::Range<usize>, i: std::ops::Range<usize>) -> LicenseMatch {
        let lines: Vec<usize> = (0..100).map(|p| p / 10 + 1).collect();
        LicenseMatch::new(
            0,
            Arc::clone(rule),
            Span::from_range(q),
            Span::from_range(i.clone()),
            Span::from_range(i),
            Matcher::Exact,
            &lines,
        )
    }

    #[test]
    fn test_rule_new_defaults() {
        let rule = Rule::new("mit_1.RULE", "mit", "MIT License");
        assert_eq!(rule.relevance, 100);
        assert!(rule.is_real_license());
        assert_eq!(rule.kind_flag_count(), 0);
        assert!(!rule.has_gaps());
    }

    #[test]
    fn test_matcher_names() {
        assert_eq!(Matcher::Exact.to_string(), "2-aho");
        assert_eq!(Matcher::Chunk.as_ref(), "chunk");
        assert_eq!("3-seq".parse::<Matcher>().unwrap(), Matcher::Fragment);
        assert_eq!(serde_json::to_string(&Matcher::Fragment).unwrap(), "\"3-seq\"");
    }

    #[test]
    fn test_full_match_scores_100() {
        let rule = indexed_rule("r1", "mit", 10);
        let m = license_match(&rule, 5..15, 0..10);
        assert_eq!(m.score, 100.0);
        assert!(m.is_full());
        assert_eq!(m.start_line, 1);
        assert_eq!(m.end_line, 2);
    }

    #[test]
    fn test_partial_match_score() {
        let rule = indexed_rule("r1", "mit", 8);
        let m = license_match(&rule, 0..6, 0..6);
        assert_eq!(m.score, 75.0);
        assert!(!m.is_full());
    }

    #[test]
    fn test_weighted_score_uses_relevance() {
        let mut rule = (*indexed_rule("r1", "mit", 10)).clone();
        rule.relevance = 50;
        let m = license_match(&Arc::new(rule), 0..10, 0..10);
        assert_eq!(m.score, 100.0);
        assert_eq!(m.weighted_score(), 50.0);
    }

    #[test]
    fn test_value_equality_and_hash() {
        let rule = indexed_rule("r1", "mit", 10);
        let a = license_match(&rule, 0..10, 0..10);
        let b = license_match(&indexed_rule("r1", "mit", 10), 0..10, 0..10);
        let c = license_match(&rule, 10..20, 0..10);
        assert_eq!(a, b);
        assert_ne!(a, c);
        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_combine_unions_spans() {
        let rule = indexed_rule("r1", "mit", 20);
        let a = license_match(&rule, 0..5, 0..5);
        let b = license_match(&rule, 8..13, 5..10);
        let combined = a.combine(&b);
        assert_eq!(combined.ilen(), 10);
        assert_eq!(combined.len(), 10);
        assert_eq!(combined.score, 50.0);
        assert_eq!(combined.qstart(), 0);
        assert_eq!(combined.qend(), 12);
    }

    #[test]
    fn test_is_small() {
        let rule = indexed_rule("r1", "mit", 40);
        assert!(license_match(&rule, 0..3, 0..3).is_small());
        assert!(!license_match(&rule, 0..30, 0..30).is_small());
    }

    #[test]
    fn test_matched_text_lines() {
        let rule = indexed_rule("r1", "mit", 10);
        let m = license_match(&rule, 10..20, 0..10);
        assert_eq!(m.start_line, 2);
        assert_eq!(m.matched_text("one\ntwo\nthree"), "two");
    }
}
