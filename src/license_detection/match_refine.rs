//! Match refinement: merge, filter and resolve the raw matches of all matchers.
//!
//! Raw matches go through these steps, in order:
//!
//! 1. merge nearby matches of the same rule
//! 2. drop matches too short, below their rule minimum coverage, spurious
//!    or equal to a false positive rule text
//! 3. resolve overlaps between matches with [`filter_matches`]
//! 4. drop matches below the minimum score
//! 5. drop negative and false positive rule matches, which only exist to
//!    suppress what they cover

use log::{debug, trace};
use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::license_detection::hash::compute_hash;
use crate::license_detection::index::LicenseIndex;
use crate::license_detection::index::vocabulary::TokenId;
use crate::license_detection::models::{LicenseMatch, Matcher};

/// Maximum distance in positions between two matches of a rule to merge them.
pub const MAX_DIST: usize = 50;

/// Merge matches of the same rule that follow each other in both the query
/// and the rule within [`MAX_DIST`]. A match contained in another match of
/// the same rule in both spans is absorbed.
pub fn merge_matches(matches: Vec<LicenseMatch>) -> Vec<LicenseMatch> {
    let mut by_rid: BTreeMap<usize, Vec<LicenseMatch>> = BTreeMap::new();
    for m in matches {
        by_rid.entry(m.rid).or_default().push(m);
    }

    let mut merged = Vec::new();
    for (_, mut rule_matches) in by_rid {
        rule_matches.sort_by_key(|m| (m.qstart(), m.ispan.start()));
        let mut accumulated: Vec<LicenseMatch> = Vec::with_capacity(rule_matches.len());
        for current in rule_matches {
            if let Some(last) = accumulated.last_mut() {
                if last.qspan.contains(&current.qspan) && last.ispan.contains(&current.ispan) {
                    continue;
                }
                if current.is_after(last)
                    && last.qspan.distance_to(&current.qspan) <= MAX_DIST
                    && last.ispan.distance_to(&current.ispan) <= MAX_DIST
                {
                    trace!("Merging matches of rule {}", last.rule_identifier());
                    *last = last.combine(&current);
                    continue;
                }
            }
            accumulated.push(current);
        }
        merged.extend(accumulated);
    }
    merged
}

/// Split matches into those passing `keep` and the others. Matches of
/// negative and false positive rules are always kept.
fn partition_real(
    matches: Vec<LicenseMatch>,
    keep: impl Fn(&LicenseMatch) -> bool,
) -> (Vec<LicenseMatch>, Vec<LicenseMatch>) {
    matches
        .into_iter()
        .partition(|m| !m.rule.is_real_license() || keep(m))
}

/// Drop matches too short for their rule thresholds.
pub fn filter_short_matches(matches: Vec<LicenseMatch>) -> (Vec<LicenseMatch>, Vec<LicenseMatch>) {
    partition_real(matches, |m| !m.is_small())
}

/// Drop matches whose coverage is below their rule minimum coverage.
pub fn filter_below_rule_minimum_coverage(
    matches: Vec<LicenseMatch>,
) -> (Vec<LicenseMatch>, Vec<LicenseMatch>) {
    partition_real(matches, |m| match m.rule.minimum_coverage {
        Some(minimum) => m.score >= minimum as f32,
        None => true,
    })
}

/// Drop short approximate matches scattered thinly over the query or rule.
pub fn filter_spurious_matches(
    matches: Vec<LicenseMatch>,
) -> (Vec<LicenseMatch>, Vec<LicenseMatch>) {
    partition_real(matches, |m| {
        let sparse = m.qspan.density() < 0.3 || m.ispan.density() < 0.3;
        !(m.ilen() < 20 && m.hilen() < 5 && sparse)
    })
}

/// Drop approximate matches whose matched rule tokens are exactly the text of
/// a false positive rule.
pub fn filter_false_positive_matches(
    index: &LicenseIndex,
    matches: Vec<LicenseMatch>,
) -> (Vec<LicenseMatch>, Vec<LicenseMatch>) {
    if index.false_positive_rid_by_hash.is_empty() {
        return (matches, Vec::new());
    }
    partition_real(matches, |m| {
        if m.matcher == Matcher::Exact {
            return true;
        }
        let matched: Vec<TokenId> = m.ispan.iter().map(|pos| m.rule.tokens[pos]).collect();
        if index
            .false_positive_rid_by_hash
            .contains_key(&compute_hash(&matched))
        {
            debug!(
                "False positive {}: {}",
                m.rule_identifier(),
                index.vocabulary.tokens_to_text(&matched)
            );
            return false;
        }
        true
    })
}

/// Resolve overlapping matches.
///
/// Matches are compared pairwise by query span:
///
/// - a match strictly contained in another is discarded
/// - of two matches with equal spans and the same licensing, the first is kept
/// - of two matches with equal spans and different licensing, both are kept
/// - of two partially overlapping matches with the same licensing, the longer
///   one is kept, then the higher score, then the first
/// - partially overlapping matches with different licensing are both kept
///
/// A match of a negative or false positive rule always wins over a regular
/// match it contains or equals, which suppresses the regular match.
///
/// Returns `(kept, discarded)`; `kept` is sorted by query start.
pub fn filter_matches(matches: Vec<LicenseMatch>) -> (Vec<LicenseMatch>, Vec<LicenseMatch>) {
    let mut matches = matches;
    matches.sort_by(|a, b| {
        a.qstart()
            .cmp(&b.qstart())
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| b.score.total_cmp(&a.score))
            .then_with(|| a.rid.cmp(&b.rid))
    });

    // A loser is only discarded for good while the match that beat it is
    // kept: losers of a discarded winner are reinstated and resolved again.
    let count = matches.len();
    let mut kept = vec![true; count];
    let mut beaten_by: Vec<Option<usize>> = vec![None; count];
    for _ in 0..=count {
        for i in 0..count {
            if !kept[i] {
                continue;
            }
            for j in i + 1..count {
                if !kept[j] {
                    continue;
                }
                let (current, next) = (&matches[i], &matches[j]);
                if next.qstart() > current.qend() {
                    break;
                }
                if !current.qspan.intersects(&next.qspan) {
                    continue;
                }
                match resolve_pair(current, next) {
                    Some(Side::Current) => {
                        kept[i] = false;
                        beaten_by[i] = Some(j);
                        break;
                    }
                    Some(Side::Next) => {
                        kept[j] = false;
                        beaten_by[j] = Some(i);
                    }
                    None => {}
                }
            }
        }

        let mut reinstated = false;
        for idx in 0..count {
            if let Some(winner) = beaten_by[idx]
                && !kept[winner]
            {
                kept[idx] = true;
                beaten_by[idx] = None;
                reinstated = true;
            }
        }
        if !reinstated {
            break;
        }
    }

    let (kept, dropped): (Vec<_>, Vec<_>) = matches
        .into_iter()
        .enumerate()
        .partition(|(idx, _)| kept[*idx]);
    debug!("Resolved overlaps: kept {}, discarded {}", kept.len(), dropped.len());
    (
        kept.into_iter().map(|(_, m)| m).collect(),
        dropped.into_iter().map(|(_, m)| m).collect(),
    )
}

enum Side {
    Current,
    Next,
}

/// Which of two intersecting matches loses, if any. `current` starts first.
fn resolve_pair(current: &LicenseMatch, next: &LicenseMatch) -> Option<Side> {
    let current_real = current.rule.is_real_license();
    let next_real = next.rule.is_real_license();

    if current.qspan == next.qspan {
        return match (current_real, next_real) {
            (false, true) => Some(Side::Next),
            (true, false) => Some(Side::Current),
            _ if current.is_same(next) => Some(Side::Next),
            _ => None,
        };
    }
    if current.qspan.contains(&next.qspan) {
        return Some(Side::Next);
    }
    if next.qspan.contains(&current.qspan) {
        return Some(Side::Current);
    }
    if current.is_same(next) && current_real == next_real {
        let current_rank = (current.len(), current.score);
        let next_rank = (next.len(), next.score);
        return if next_rank > current_rank {
            Some(Side::Current)
        } else {
            Some(Side::Next)
        };
    }
    None
}

/// Drop matches whose relevance weighted score is below `min_score`.
pub fn filter_low_score(
    matches: Vec<LicenseMatch>,
    min_score: f32,
) -> (Vec<LicenseMatch>, Vec<LicenseMatch>) {
    partition_real(matches, |m| m.weighted_score() >= min_score)
}

/// Run every refinement step and return the final matches sorted by query
/// start.
pub fn refine_matches(
    index: &LicenseIndex,
    matches: Vec<LicenseMatch>,
    min_score: f32,
) -> Vec<LicenseMatch> {
    if matches.is_empty() {
        return Vec::new();
    }
    let raw = matches.len();

    let matches = merge_matches(matches);
    let (matches, short) = filter_short_matches(matches);
    let (matches, low_coverage) = filter_below_rule_minimum_coverage(matches);
    let (matches, spurious) = filter_spurious_matches(matches);
    let (matches, false_positives) = filter_false_positive_matches(index, matches);
    let (matches, overlapping) = filter_matches(matches);
    let (matches, low_score) = filter_low_score(matches, min_score);

    let mut refined: Vec<LicenseMatch> = matches
        .into_iter()
        .filter(|m| m.rule.is_real_license())
        .collect();
    refined.sort_by_key(|m| (m.qstart(), Reverse(m.len()), m.rid));

    debug!(
        "Refined {} raw matches to {}: {} short, {} low coverage, {} spurious, \
         {} false positive, {} overlapping, {} low score",
        raw,
        refined.len(),
        short.len(),
        low_coverage.len(),
        spurious.len(),
        false_positives.len(),
        overlapping.len(),
        low_score.len()
    );
    refined
}
