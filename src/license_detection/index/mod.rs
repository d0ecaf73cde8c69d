//! License index construction and querying.
//!
//! The index is built once from a rule corpus and is immutable afterwards. It
//! is shared read-only between concurrent queries; every piece of per-query
//! state lives in the [`Query`] and its runs.

pub mod automaton;
pub mod builder;
pub mod token_sets;
pub mod vocabulary;

use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::license_detection::MatchOptions;
use crate::license_detection::aho_match::exact_match;
use crate::license_detection::chunk_match::{compute_candidates, match_chunks};
use crate::license_detection::hash::TokenHash;
use crate::license_detection::match_refine::refine_matches;
use crate::license_detection::models::{LicenseMatch, Rule};
use crate::license_detection::query::Query;
use crate::license_detection::seq_match::match_fragments;

use self::automaton::TokenAutomaton;
use self::vocabulary::{TokenId, Vocabulary};

pub use builder::build_index;

/// Length of the n-grams used as chunk starters and fragment seeds.
pub const NGRAM_LENGTH: usize = 4;

/// License index holding every structure the matchers need.
///
/// # Index Structures
///
/// - **Exact matching**: `rules_automaton` and `negative_automaton`, over the
///   whole token sequences of gap-free rules
/// - **Chunk matching**: `starters`, the first n-gram of each gap-free segment
///   of approx-matchable rules, and `high_sets_by_rid` to rank candidates
/// - **Fragment matching**: `fragments_automaton`, legalese n-grams of
///   approx-matchable rules, and `high_postings_by_rid` for alignment
/// - **Rule classification**: `regular_rids`, `negative_rids`,
///   `false_positive_rids`, `approx_matchable_rids`
#[derive(Debug, Clone)]
pub struct LicenseIndex {
    /// Token strings to ids. Legalese words own ids `0..len_legalese`.
    pub vocabulary: Vocabulary,

    /// Tokens with an id below this are legalese.
    pub len_legalese: usize,

    /// Indexed rules. A rule id is a position in this vector.
    pub rules_by_rid: Vec<Arc<Rule>>,

    /// Positions of each legalese token in each rule.
    pub high_postings_by_rid: Vec<HashMap<TokenId, Vec<usize>>>,

    /// Distinct legalese tokens of each rule.
    pub high_sets_by_rid: Vec<HashSet<TokenId>>,

    /// Whole token sequences of regular and false positive rules.
    pub rules_automaton: TokenAutomaton,

    /// Whole token sequences of negative rules.
    pub negative_automaton: TokenAutomaton,

    /// Legalese n-grams of approx-matchable rules.
    pub fragments_automaton: TokenAutomaton,

    /// Segment starter n-grams to `(rid, segment start)` pairs.
    pub starters: HashMap<Vec<TokenId>, Vec<(usize, usize)>>,

    pub regular_rids: HashSet<usize>,
    pub negative_rids: HashSet<usize>,
    pub false_positive_rids: HashSet<usize>,
    pub approx_matchable_rids: HashSet<usize>,

    /// Token hashes of false positive rule texts.
    pub false_positive_rid_by_hash: HashMap<TokenHash, usize>,
}

impl LicenseIndex {
    /// The rule with id `rid`.
    ///
    /// # Panics
    /// If `rid` was not assigned by this index.
    pub fn rule(&self, rid: usize) -> &Arc<Rule> {
        &self.rules_by_rid[rid]
    }

    pub fn len(&self) -> usize {
        self.rules_by_rid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules_by_rid.is_empty()
    }

    /// Match a query against the index and return refined matches sorted by
    /// query start.
    ///
    /// Each query run goes through the matchers in a fixed order, each one
    /// only seeing positions left unmatched by the previous ones:
    ///
    /// 1. exact matching of negative rules
    /// 2. exact matching of regular and false positive rules
    /// 3. chunk matching of approx-matchable rules
    /// 4. fragment matching of approx-matchable rules
    ///
    /// The approximate matchers only run while the run still has matchable
    /// legalese tokens. The query itself is never modified, so matching the
    /// same query twice gives the same result.
    pub fn match_query(&self, query: &Query, options: &MatchOptions) -> Vec<LicenseMatch> {
        if query.is_empty() || self.is_empty() {
            return Vec::new();
        }

        let mut matches = Vec::new();
        for mut run in query.query_runs() {
            let negatives = exact_match(self, &self.negative_automaton, &run);
            for m in &negatives {
                run.subtract(&m.qspan);
            }

            let exacts = exact_match(self, &self.rules_automaton, &run);
            for m in &exacts {
                run.subtract(&m.qspan);
            }

            let mut approximate = Vec::new();
            if run.has_high_matchables() {
                let candidates = compute_candidates(self, &run, options.max_candidates);
                approximate.extend(match_chunks(self, &candidates, &mut run));
            }
            if run.has_high_matchables() {
                approximate.extend(match_fragments(self, &mut run));
            }

            debug!(
                "Run {}..{} (lines {:?}-{:?}): {} negative, {} exact, {} approximate matches",
                run.start,
                run.end,
                run.start_line(),
                run.end_line(),
                negatives.len(),
                exacts.len(),
                approximate.len()
            );
            matches.extend(negatives);
            matches.extend(exacts);
            matches.extend(approximate);
        }

        refine_matches(self, matches, options.min_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license_detection::models::Matcher;
    use crate::license_detection::test_utils::{
        BSD_NOTICE, create_negative_rule, create_rule, index_of, query_of,
    };

    fn matches_of(index: &LicenseIndex, text: &str) -> Vec<LicenseMatch> {
        index.match_query(&query_of(index, text), &MatchOptions::default())
    }

    #[test]
    fn test_match_query_empty() {
        let index = index_of(vec![create_rule("mit.RULE", "mit", "MIT License")]);
        assert!(matches_of(&index, "").is_empty());
        assert!(matches_of(&index, "nothing to see here").is_empty());
    }

    #[test]
    fn test_match_query_empty_index() {
        let index = index_of(vec![]);
        assert!(matches_of(&index, "MIT License").is_empty());
    }

    #[test]
    fn test_match_query_exact() {
        let index = index_of(vec![create_rule("bsd.RULE", "bsd-new", BSD_NOTICE)]);
        let matches = matches_of(&index, BSD_NOTICE);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matcher, Matcher::Exact);
        assert_eq!(matches[0].score, 100.0);
    }

    #[test]
    fn test_match_query_negative_wins() {
        let index = index_of(vec![
            create_rule("mit.RULE", "mit", "MIT License"),
            create_negative_rule("neg.RULE", "the MIT License plate of my car"),
        ]);
        let matches = matches_of(&index, "the MIT License plate of my car");
        assert!(matches.is_empty());
        let matches = matches_of(&index, "the MIT License");
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_match_query_is_idempotent() {
        let index = index_of(vec![create_rule("bsd.RULE", "bsd-new", BSD_NOTICE)]);
        let text = BSD_NOTICE.replace("binary", "compiled");
        let query = query_of(&index, &text);
        let options = MatchOptions::default();
        let first = index.match_query(&query, &options);
        let second = index.match_query(&query, &options);
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_match_query_approximate_after_edit() {
        let index = index_of(vec![create_rule("bsd.RULE", "bsd-new", BSD_NOTICE)]);
        let text = BSD_NOTICE.replace("binary", "compiled");
        let matches = matches_of(&index, &text);
        assert_eq!(matches.len(), 1);
        assert_ne!(matches[0].matcher, Matcher::Exact);
        assert_eq!(matches[0].ilen(), index.rule(0).length - 1);
    }
}
