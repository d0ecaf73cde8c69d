//! Exact matching of whole rule token sequences.
//!
//! All rule sequences registered in a [`TokenAutomaton`] are searched at once
//! in a query run. A hit is kept only when every position it covers is still
//! matchable. Overlapping hits are all reported and left to the resolver.

use log::debug;
use std::sync::Arc;

use crate::license_detection::index::LicenseIndex;
use crate::license_detection::index::automaton::TokenAutomaton;
use crate::license_detection::models::{LicenseMatch, Matcher};
use crate::license_detection::query::QueryRun;
use crate::license_detection::spans::Span;

/// Find exact matches of `automaton` patterns in a query run.
///
/// Matchables are checked as they stand when the call starts; the caller
/// subtracts the returned matches afterwards.
pub fn exact_match(
    index: &LicenseIndex,
    automaton: &TokenAutomaton,
    run: &QueryRun<'_>,
) -> Vec<LicenseMatch> {
    if automaton.is_empty() || run.is_empty() {
        return Vec::new();
    }

    let mut matches = Vec::new();
    for hit in automaton.find_iter(run.tokens()) {
        let qstart = run.start + hit.start;
        let qend = run.start + hit.end;
        if !run.is_range_matchable(qstart..qend) {
            continue;
        }

        for entry in hit.entries {
            let rule = index.rule(entry.rid);
            let hispan = Span::from_positions(
                (entry.start..entry.end).filter(|&pos| index.vocabulary.is_legalese(rule.tokens[pos])),
            );
            matches.push(LicenseMatch::new(
                entry.rid,
                Arc::clone(rule),
                Span::from_range(qstart..qend),
                Span::from_range(entry.start..entry.end),
                hispan,
                Matcher::Exact,
                &run.query.line_by_pos,
            ));
        }
    }

    debug!(
        "Exact matching found {} matches in run {}..{}",
        matches.len(),
        run.start,
        run.end
    );
    matches
}
