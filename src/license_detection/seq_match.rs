//! Fragment matching: approximate alignment seeded by legalese n-grams.
//!
//! Every n-gram containing a legalese token of an approx-matchable rule is in
//! the fragments automaton. Hits on still-matchable query positions are
//! grouped by rule and merged along their diagonal. Each merged seed is
//! extended, then aligned with [`match_blocks`] on both sides to collect the
//! rest of the rule that survived edits in the query.

use bit_set::BitSet;
use log::debug;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::license_detection::index::{LicenseIndex, NGRAM_LENGTH};
use crate::license_detection::models::{LicenseMatch, Matcher};
use crate::license_detection::query::QueryRun;
use crate::license_detection::seq::{Block, extend_match, match_blocks};
use crate::license_detection::spans::Span;

/// Extra query tokens searched beyond the unmatched rule length on each side
/// of a seed.
pub const MAX_QUERY_SLACK: usize = 50;

/// Fragment hits of one rule merged along their diagonals.
fn merge_seeds(mut seeds: Vec<Block>) -> Vec<Block> {
    seeds.sort_by_key(|s| (s.a as isize - s.b as isize, s.a));
    let mut merged: Vec<Block> = Vec::with_capacity(seeds.len());
    for seed in seeds {
        match merged.last_mut() {
            Some(last)
                if last.a as isize - last.b as isize == seed.a as isize - seed.b as isize
                    && seed.a <= last.a + last.size =>
            {
                last.size = last.size.max(seed.a + seed.size - last.a);
            }
            _ => merged.push(seed),
        }
    }
    merged.sort_by_key(|s| (Reverse(s.size), s.a, s.b));
    merged
}

/// Align rule `rid` around one seed and collect all matched positions.
fn align_seed(
    index: &LicenseIndex,
    run: &QueryRun<'_>,
    rid: usize,
    seed: Block,
    matchables: &BitSet,
) -> Vec<Block> {
    let rule = index.rule(rid);
    let qtokens = &run.query.tokens;
    let itokens = &rule.tokens;
    let b2j = &index.high_postings_by_rid[rid];
    let len_good = index.len_legalese;

    let core = extend_match(
        seed,
        qtokens,
        itokens,
        run.start,
        run.end,
        0,
        rule.length,
        matchables,
    );

    let left_reach = core.b + MAX_QUERY_SLACK;
    let left_lo = core.a.saturating_sub(left_reach).max(run.start);
    let mut blocks = match_blocks(
        qtokens, itokens, left_lo, core.a, 0, core.b, b2j, len_good, matchables,
    );

    blocks.push(core);

    let qnext = core.a + core.size;
    let inext = core.b + core.size;
    let right_reach = rule.length - inext + MAX_QUERY_SLACK;
    let right_hi = (qnext + right_reach).min(run.end);
    blocks.extend(match_blocks(
        qtokens,
        itokens,
        qnext,
        right_hi,
        inext,
        rule.length,
        b2j,
        len_good,
        matchables,
    ));
    blocks
}

/// Match approx-matchable rules on a run from fragment seeds.
///
/// Rules are tried by decreasing seeded length, then rule id. Every accepted
/// match is subtracted from the run before the next seed is aligned.
pub fn match_fragments(index: &LicenseIndex, run: &mut QueryRun<'_>) -> Vec<LicenseMatch> {
    if index.fragments_automaton.is_empty() || run.is_empty() {
        return Vec::new();
    }

    let mut seeds_by_rid: BTreeMap<usize, Vec<Block>> = BTreeMap::new();
    for hit in index.fragments_automaton.find_iter(run.tokens()) {
        let qstart = run.start + hit.start;
        if !run.is_range_matchable(qstart..qstart + NGRAM_LENGTH) {
            continue;
        }
        for entry in hit.entries {
            seeds_by_rid.entry(entry.rid).or_default().push(Block {
                a: qstart,
                b: entry.start,
                size: NGRAM_LENGTH,
            });
        }
    }

    let mut seeded: Vec<(usize, Vec<Block>)> = seeds_by_rid
        .into_iter()
        .map(|(rid, seeds)| (rid, merge_seeds(seeds)))
        .collect();
    seeded.sort_by_key(|(rid, seeds)| (Reverse(seeds.iter().map(|s| s.size).sum::<usize>()), *rid));

    let mut matches = Vec::new();
    'rules: for (rid, seeds) in seeded {
        let rule = index.rule(rid);
        for seed in seeds {
            if !run.has_high_matchables() {
                break 'rules;
            }
            if !run.is_range_matchable(seed.a..seed.a + seed.size) {
                continue;
            }
            let matchables = run.matchables();
            let blocks = align_seed(index, run, rid, seed, &matchables);

            let qspan = Span::from_positions(blocks.iter().flat_map(|b| b.a..b.a + b.size));
            let ispan = Span::from_positions(blocks.iter().flat_map(|b| b.b..b.b + b.size));
            if ispan.len() < NGRAM_LENGTH {
                continue;
            }
            let hispan = Span::from_positions(
                ispan
                    .iter()
                    .filter(|&pos| index.vocabulary.is_legalese(rule.tokens[pos])),
            );
            let license_match = LicenseMatch::new(
                rid,
                Arc::clone(rule),
                qspan,
                ispan,
                hispan,
                Matcher::Fragment,
                &run.query.line_by_pos,
            );
            run.subtract(&license_match.qspan);
            matches.push(license_match);
        }
    }

    debug!(
        "Fragment matching found {} matches in run {}..{}",
        matches.len(),
        run.start,
        run.end
    );
    matches
}
