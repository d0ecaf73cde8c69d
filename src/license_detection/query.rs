//! Query processing: the tokenized input text a license index is matched against.
//!
//! A [`Query`] keeps the known token ids of its text with their line numbers,
//! counts what it had to drop, and is broken into runs. Each match pass works
//! on a [`QueryRun`], which owns the set of positions still free to match.

use bit_set::BitSet;
use log::trace;
use std::collections::HashSet;
use std::ops::Range;

use crate::license_detection::index::LicenseIndex;
use crate::license_detection::index::vocabulary::TokenId;
use crate::license_detection::spans::Span;
use crate::license_detection::tokenize::{is_stopword, tokenize_lines};

/// Default number of lines without any known token that ends a run.
pub const LINE_THRESHOLD: usize = 4;

/// Default number of consecutive non-legalese tokens after which the next
/// legalese token starts a new run.
pub const MAX_TOKEN_GAP: usize = 100;

/// How a token stream is broken into query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub line_threshold: usize,
    pub max_token_gap: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            line_threshold: LINE_THRESHOLD,
            max_token_gap: MAX_TOKEN_GAP,
        }
    }
}

/// A tokenized query.
///
/// Positions are indexes into `tokens`; only tokens known to the index
/// vocabulary get a position.
#[derive(Debug, Clone, Default)]
pub struct Query {
    /// Known token ids in text order
    pub tokens: Vec<TokenId>,

    /// 1-based line of each position
    pub line_by_pos: Vec<usize>,

    /// Number of dropped tokens not in the vocabulary
    pub unknown_count: usize,

    /// Number of dropped stopwords
    pub stopword_count: usize,

    /// Positions holding a legalese token
    high_matchables: BitSet,

    /// Positions holding any other known token
    low_matchables: BitSet,

    runs: Vec<Range<usize>>,
}

impl Query {
    /// Tokenize `text` and build a query against `index`.
    pub fn from_text(index: &LicenseIndex, text: &str, options: &QueryOptions) -> Self {
        Self::from_tokens(index, tokenize_lines(text), options)
    }

    /// Build a query from a pre-tokenized `(token, line)` stream.
    ///
    /// Tokens are lowercased. Stopwords and tokens unknown to the index
    /// vocabulary are counted and dropped.
    pub fn from_tokens<I, S>(index: &LicenseIndex, tokens: I, options: &QueryOptions) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: AsRef<str>,
    {
        let vocabulary = &index.vocabulary;
        let mut query = Query::default();

        let mut run_start = 0;
        let mut last_known_line: Option<usize> = None;
        let mut low_streak = 0;

        for (token, line) in tokens {
            let token = token.as_ref().to_lowercase();
            if is_stopword(&token) {
                query.stopword_count += 1;
                continue;
            }
            let Some(tid) = vocabulary.get(&token) else {
                query.unknown_count += 1;
                continue;
            };

            let pos = query.tokens.len();
            let is_high = vocabulary.is_legalese(tid);
            if pos > run_start {
                let blank_lines = last_known_line
                    .map(|last| line.saturating_sub(last + 1))
                    .unwrap_or(0);
                let split_on_lines = blank_lines >= options.line_threshold;
                let split_on_gap = is_high && low_streak >= options.max_token_gap;
                if split_on_lines || split_on_gap {
                    query.runs.push(run_start..pos);
                    run_start = pos;
                }
            }

            if is_high {
                query.high_matchables.insert(pos);
                low_streak = 0;
            } else {
                query.low_matchables.insert(pos);
                low_streak += 1;
            }
            query.tokens.push(tid);
            query.line_by_pos.push(line);
            last_known_line = Some(line);
        }

        if query.tokens.len() > run_start {
            query.runs.push(run_start..query.tokens.len());
        }

        trace!(
            "Query: {} tokens, {} unknown, {} stopwords, {} runs",
            query.tokens.len(),
            query.unknown_count,
            query.stopword_count,
            query.runs.len()
        );
        query
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Position ranges of the query runs, in order. They partition the query.
    pub fn run_ranges(&self) -> &[Range<usize>] {
        &self.runs
    }

    pub fn line_for_pos(&self, pos: usize) -> Option<usize> {
        self.line_by_pos.get(pos).copied()
    }

    /// Fresh runs with every position matchable.
    pub fn query_runs(&self) -> Vec<QueryRun<'_>> {
        self.runs
            .iter()
            .map(|range| QueryRun::new(self, range.clone()))
            .collect()
    }

    /// A single fresh run over the whole query.
    pub fn whole_query_run(&self) -> QueryRun<'_> {
        QueryRun::new(self, 0..self.tokens.len())
    }
}

/// A contiguous region of a query and its still-matchable positions.
///
/// Matchables only shrink: every accepted match is subtracted so that later
/// passes cannot claim the same positions.
#[derive(Debug, Clone)]
pub struct QueryRun<'a> {
    pub query: &'a Query,
    /// Start position, inclusive
    pub start: usize,
    /// End position, exclusive
    pub end: usize,
    high_matchables: BitSet,
    low_matchables: BitSet,
}

impl<'a> QueryRun<'a> {
    pub fn new(query: &'a Query, range: Range<usize>) -> Self {
        let in_range = |set: &BitSet| -> BitSet {
            set.iter()
                .skip_while(|&pos| pos < range.start)
                .take_while(|&pos| pos < range.end)
                .collect()
        };
        Self {
            high_matchables: in_range(&query.high_matchables),
            low_matchables: in_range(&query.low_matchables),
            start: range.start,
            end: range.end,
            query,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Token ids of this run. Index 0 is query position `start`.
    pub fn tokens(&self) -> &'a [TokenId] {
        &self.query.tokens[self.start..self.end]
    }

    pub fn start_line(&self) -> Option<usize> {
        self.query.line_for_pos(self.start)
    }

    pub fn end_line(&self) -> Option<usize> {
        self.end.checked_sub(1).and_then(|pos| self.query.line_for_pos(pos))
    }

    pub fn is_matchable(&self, pos: usize) -> bool {
        self.high_matchables.contains(pos) || self.low_matchables.contains(pos)
    }

    /// True if every position of `range` is still matchable.
    pub fn is_range_matchable(&self, range: Range<usize>) -> bool {
        range.start >= self.start
            && range.end <= self.end
            && range.into_iter().all(|pos| self.is_matchable(pos))
    }

    pub fn has_high_matchables(&self) -> bool {
        !self.high_matchables.is_empty()
    }

    /// All positions still matchable.
    pub fn matchables(&self) -> BitSet {
        let mut all = self.high_matchables.clone();
        all.union_with(&self.low_matchables);
        all
    }

    pub fn high_matchables(&self) -> &BitSet {
        &self.high_matchables
    }

    /// Distinct legalese token ids at still-matchable positions.
    pub fn high_matchable_tids(&self) -> HashSet<TokenId> {
        self.high_matchables
            .iter()
            .map(|pos| self.query.tokens[pos])
            .collect()
    }

    /// Remove the positions of `span` from the matchables.
    pub fn subtract(&mut self, span: &Span) {
        for pos in span.iter() {
            self.high_matchables.remove(pos);
            self.low_matchables.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license_detection::test_utils::{create_rule, index_of};

    fn index() -> LicenseIndex {
        index_of(vec![create_rule(
            "bsd.RULE",
            "bsd-new",
            "Redistribution and use in source and binary forms are permitted zebra",
        )])
    }

    #[test]
    fn test_from_text_drops_unknown_and_stopwords() {
        let index = index();
        let query = Query::from_text(
            &index,
            "Redistribution of quagga <p> source forms",
            &QueryOptions::default(),
        );
        assert_eq!(query.len(), 3);
        assert_eq!(query.unknown_count, 2);
        assert_eq!(query.stopword_count, 1);
        assert_eq!(query.run_ranges(), &[0..3]);
    }

    #[test]
    fn test_empty_query_has_no_runs() {
        let query = Query::from_text(&index(), "", &QueryOptions::default());
        assert!(query.is_empty());
        assert!(query.query_runs().is_empty());
    }

    #[test]
    fn test_line_numbers() {
        let index = index();
        let query = Query::from_text(&index, "source\n\nbinary forms", &QueryOptions::default());
        assert_eq!(query.line_by_pos, vec![1, 3, 3]);
        assert_eq!(query.line_for_pos(2), Some(3));
        assert_eq!(query.line_for_pos(3), None);
    }

    #[test]
    fn test_runs_split_on_blank_lines() {
        let index = index();
        let options = QueryOptions {
            line_threshold: 2,
            max_token_gap: 100,
        };
        let query = Query::from_text(&index, "source forms\n\n\n\nbinary zebra", &options);
        assert_eq!(query.run_ranges(), &[0..2, 2..4]);
        let runs = query.query_runs();
        assert_eq!(runs[1].start_line(), Some(5));
    }

    #[test]
    fn test_runs_split_on_long_non_legalese_gap() {
        let index = index();
        let options = QueryOptions {
            line_threshold: 100,
            max_token_gap: 3,
        };
        let query = Query::from_text(&index, "zebra zebra zebra zebra redistribution", &options);
        assert_eq!(query.run_ranges(), &[0..4, 4..5]);
    }

    #[test]
    fn test_from_tokens_lowercases() {
        let index = index();
        let query = Query::from_tokens(
            &index,
            vec![("Source", 1), ("FORMS", 2)],
            &QueryOptions::default(),
        );
        assert_eq!(query.len(), 2);
        assert_eq!(query.unknown_count, 0);
    }

    #[test]
    fn test_run_subtract() {
        let index = index();
        let query = Query::from_text(
            &index,
            "redistribution source binary forms",
            &QueryOptions::default(),
        );
        let mut run = query.whole_query_run();
        assert!(run.is_range_matchable(0..4));
        assert!(run.has_high_matchables());

        run.subtract(&Span::from_range(0..2));
        assert!(!run.is_matchable(0));
        assert!(!run.is_range_matchable(1..3));
        assert!(run.is_range_matchable(2..4));
        assert_eq!(run.matchables().len(), 2);

        run.subtract(&Span::from_range(0..4));
        assert!(!run.has_high_matchables());
        assert!(run.matchables().is_empty());
    }

    #[test]
    fn test_runs_are_fresh() {
        let index = index();
        let query = Query::from_text(&index, "source forms", &QueryOptions::default());
        let mut run = query.whole_query_run();
        run.subtract(&Span::from_range(0..2));
        assert!(query.whole_query_run().is_range_matchable(0..2));
    }

    #[test]
    fn test_run_is_limited_to_its_range() {
        let index = index();
        let query = Query::from_text(&index, "source forms binary", &QueryOptions::default());
        let run = QueryRun::new(&query, 1..3);
        assert_eq!(run.tokens().len(), 2);
        assert!(!run.is_matchable(0));
        assert!(!run.is_range_matchable(0..2));
        assert!(run.is_range_matchable(1..3));
    }
}
