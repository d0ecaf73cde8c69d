//! Chunk matching: starter n-gram seeded greedy extension.
//!
//! Every gap-free segment of an approx-matchable rule is registered in the
//! index under its first n-gram, its starter. A query n-gram that is a starter
//! anchors the rule there; the match then grows token by token in both
//! directions. At a template gap of the rule a few query tokens may be
//! skipped to find the rule token that follows the gap.

use log::debug;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::license_detection::index::token_sets::overlap;
use crate::license_detection::index::{LicenseIndex, NGRAM_LENGTH};
use crate::license_detection::models::{LicenseMatch, Matcher};
use crate::license_detection::query::QueryRun;
use crate::license_detection::spans::Span;

/// Maximum number of query tokens skipped to bridge a rule template gap.
pub const MAX_GAP_SKIP: usize = 15;

/// A rule worth trying on a query run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub rid: usize,
    /// Distinct legalese tokens shared by the rule and the run
    pub high_overlap: usize,
}

/// Rules with at least one starter in the run, best first.
///
/// Candidates are ranked by legalese token overlap with the run, ties broken
/// by rule id, and at most `max_candidates` are kept.
pub fn compute_candidates(
    index: &LicenseIndex,
    run: &QueryRun<'_>,
    max_candidates: usize,
) -> Vec<Candidate> {
    let tokens = &run.query.tokens;
    let mut rids = HashSet::new();
    for qpos in run.start..run.end.saturating_sub(NGRAM_LENGTH - 1) {
        if !run.is_range_matchable(qpos..qpos + NGRAM_LENGTH) {
            continue;
        }
        if let Some(starts) = index.starters.get(&tokens[qpos..qpos + NGRAM_LENGTH]) {
            rids.extend(starts.iter().map(|&(rid, _)| rid));
        }
    }

    let run_high = run.high_matchable_tids();
    let mut candidates: Vec<Candidate> = rids
        .into_iter()
        .map(|rid| Candidate {
            rid,
            high_overlap: overlap(&index.high_sets_by_rid[rid], &run_high),
        })
        .collect();
    candidates.sort_by_key(|c| (Reverse(c.high_overlap), c.rid));
    candidates.truncate(max_candidates);
    candidates
}

/// Matched positions of one extended chunk, in increasing order.
#[derive(Debug, Default)]
struct Chunk {
    rid: usize,
    qpositions: Vec<usize>,
    ipositions: Vec<usize>,
}

impl Chunk {
    fn len(&self) -> usize {
        self.ipositions.len()
    }
}

/// Grow a match of rule `rid` anchored at query `qstart` and rule `istart`,
/// where the next `NGRAM_LENGTH` tokens are known to be equal.
fn extend_chunk(
    index: &LicenseIndex,
    run: &QueryRun<'_>,
    rid: usize,
    qstart: usize,
    istart: usize,
) -> Chunk {
    let rule = index.rule(rid);
    let itokens = &rule.tokens;
    let qtokens = &run.query.tokens;
    let equal = |q: usize, i: usize| qtokens[q] == itokens[i] && run.is_matchable(q);

    let mut left: Vec<(usize, usize)> = Vec::new();
    let (mut q, mut i) = (qstart, istart);
    while q > run.start && i > 0 {
        if rule.gaps.contains(&(i - 1)) {
            // a hole precedes rule position i: find rule token i - 1 a few tokens back
            let lowest = q.saturating_sub(MAX_GAP_SKIP + 1).max(run.start);
            match (lowest..q).rev().find(|&found| equal(found, i - 1)) {
                Some(found) => q = found + 1,
                None => break,
            }
        } else if !equal(q - 1, i - 1) {
            break;
        }
        q -= 1;
        i -= 1;
        left.push((q, i));
    }
    left.reverse();

    let mut qpositions: Vec<usize> = left.iter().map(|&(q, _)| q).collect();
    let mut ipositions: Vec<usize> = left.iter().map(|&(_, i)| i).collect();
    qpositions.extend(qstart..qstart + NGRAM_LENGTH);
    ipositions.extend(istart..istart + NGRAM_LENGTH);

    let (mut q, mut i) = (qstart + NGRAM_LENGTH, istart + NGRAM_LENGTH);
    while q < run.end && i < rule.length {
        if !equal(q, i) {
            if !rule.gaps.contains(&(i - 1)) {
                break;
            }
            let highest = (q + 1 + MAX_GAP_SKIP).min(run.end);
            match (q + 1..highest).find(|&found| equal(found, i)) {
                Some(found) => q = found,
                None => break,
            }
        }
        qpositions.push(q);
        ipositions.push(i);
        q += 1;
        i += 1;
    }

    Chunk {
        rid,
        qpositions,
        ipositions,
    }
}

/// Find the best chunk at the earliest query n-gram with a starter hit for a
/// candidate rule. The longest chunk wins, then the best ranked candidate.
fn best_chunk(
    index: &LicenseIndex,
    run: &QueryRun<'_>,
    rank_by_rid: &HashMap<usize, usize>,
) -> Option<Chunk> {
    let tokens = &run.query.tokens;
    for qpos in run.start..run.end.saturating_sub(NGRAM_LENGTH - 1) {
        if !run.is_range_matchable(qpos..qpos + NGRAM_LENGTH) {
            continue;
        }
        let Some(starts) = index.starters.get(&tokens[qpos..qpos + NGRAM_LENGTH]) else {
            continue;
        };
        let best = starts
            .iter()
            .filter_map(|&(rid, istart)| {
                let rank = *rank_by_rid.get(&rid)?;
                Some((rank, extend_chunk(index, run, rid, qpos, istart)))
            })
            .max_by_key(|(rank, chunk)| (chunk.len(), Reverse(*rank)))
            .map(|(_, chunk)| chunk);
        if best.is_some() {
            return best;
        }
    }
    None
}

/// Match candidate rules on a run, one chunk at a time.
///
/// Each accepted chunk is subtracted from the run before the next search, so
/// chunks never share query positions.
pub fn match_chunks(
    index: &LicenseIndex,
    candidates: &[Candidate],
    run: &mut QueryRun<'_>,
) -> Vec<LicenseMatch> {
    let rank_by_rid: HashMap<usize, usize> = candidates
        .iter()
        .enumerate()
        .map(|(rank, c)| (c.rid, rank))
        .collect();

    let mut matches = Vec::new();
    while run.has_high_matchables() {
        let Some(chunk) = best_chunk(index, run, &rank_by_rid) else {
            break;
        };
        if chunk.len() < NGRAM_LENGTH {
            break;
        }

        let rule = index.rule(chunk.rid);
        let hispan = Span::from_positions(
            chunk
                .ipositions
                .iter()
                .copied()
                .filter(|&pos| index.vocabulary.is_legalese(rule.tokens[pos])),
        );
        let license_match = LicenseMatch::new(
            chunk.rid,
            Arc::clone(rule),
            Span::from_positions(chunk.qpositions),
            Span::from_positions(chunk.ipositions),
            hispan,
            Matcher::Chunk,
            &run.query.line_by_pos,
        );
        run.subtract(&license_match.qspan);
        matches.push(license_match);
    }

    debug!(
        "Chunk matching found {} matches in run {}..{}",
        matches.len(),
        run.start,
        run.end
    );
    matches
}
