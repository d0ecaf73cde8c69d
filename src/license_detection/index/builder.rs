//! License index builder.
//!
//! `build_index()` tokenizes every rule against a fresh vocabulary, derives the
//! per-rule thresholds and registers each rule in the structures its kind needs.
//! Numeric tokens seen once in the whole corpus join the legalese ids first.
//!
//! - regular and false positive rules without template gaps: exact automaton
//! - negative rules without template gaps: negative automaton
//! - approx-matchable regular rules: starters, fragments, legalese postings
//! - false positive rules: token hash lookup

use anyhow::{Context, Result};
use log::{info, warn};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;
use std::time::Instant;

use crate::license_detection::hash::compute_hash;
use crate::license_detection::index::automaton::{PatternEntry, TokenAutomatonBuilder};
use crate::license_detection::index::token_sets::{high_postings, high_tids_set, token_counts};
use crate::license_detection::index::vocabulary::{TokenId, Vocabulary};
use crate::license_detection::index::{LicenseIndex, NGRAM_LENGTH};
use crate::license_detection::models::Rule;
use crate::license_detection::rules::thresholds::{SMALL_RULE, TINY_RULE, Thresholds};
use crate::license_detection::tokenize::{ngrams, rule_tokens_and_gaps};

/// Contiguous gap-free segments of a rule of `length` tokens.
pub(crate) fn rule_segments(length: usize, gaps: &BTreeSet<usize>) -> Vec<Range<usize>> {
    let mut segments = Vec::with_capacity(gaps.len() + 1);
    let mut start = 0;
    for &gap in gaps {
        if gap + 1 > start && gap < length {
            segments.push(start..gap + 1);
            start = gap + 1;
        }
    }
    if start < length {
        segments.push(start..length);
    }
    segments
}

/// Numeric tokens found exactly once in the whole corpus, sorted.
fn unique_numeric_tokens(rules: &[Rule]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for rule in rules {
        let (tokens, _) = rule_tokens_and_gaps(&rule.text);
        for token in tokens {
            if token.chars().all(|c| c.is_ascii_digit()) {
                *counts.entry(token).or_default() += 1;
            }
        }
    }
    let mut unique: Vec<String> = counts
        .into_iter()
        .filter(|&(_, count)| count == 1)
        .map(|(token, _)| token)
        .collect();
    unique.sort();
    unique
}

fn is_approx_matchable(rule: &Rule) -> bool {
    rule.is_real_license()
        && rule.high_length > 0
        && !rule.is_tiny
        && !rule.is_continuous
        && !(rule.is_small && (rule.is_license_reference || rule.is_license_tag))
}

/// Fill in the token and threshold fields of a rule.
fn index_rule(rule: &mut Rule, vocabulary: &mut Vocabulary) -> Result<()> {
    let (tokens, gaps) = rule_tokens_and_gaps(&rule.text);
    rule.tokens = tokens
        .iter()
        .map(|token| vocabulary.get_or_assign(token))
        .collect::<Result<Vec<TokenId>>>()?;
    rule.gaps = gaps;
    rule.length = rule.tokens.len();

    let (length_unique, high_length, high_length_unique) =
        token_counts(&rule.tokens, vocabulary.len_legalese());
    rule.length_unique = length_unique;
    rule.high_length = high_length;
    rule.high_length_unique = high_length_unique;

    let thresholds = Thresholds::compute(
        rule.minimum_coverage,
        rule.length,
        high_length,
        length_unique,
        high_length_unique,
    );
    rule.minimum_coverage = thresholds.minimum_coverage;
    rule.min_matched_length = thresholds.min_matched_length;
    rule.min_high_matched_length = thresholds.min_high_matched_length;
    rule.min_matched_length_unique = thresholds.min_matched_length_unique;
    rule.min_high_matched_length_unique = thresholds.min_high_matched_length_unique;

    rule.is_small = rule.length < SMALL_RULE;
    rule.is_tiny = rule.length < TINY_RULE;
    rule.is_approx_matchable = is_approx_matchable(rule);
    Ok(())
}

/// Build the license index from a validated rule corpus.
///
/// Rule ids are the positions of the rules in `rules`. The only failure is a
/// corpus with more distinct tokens than a [`TokenId`] can number.
pub fn build_index(rules: Vec<Rule>) -> Result<LicenseIndex> {
    let started = Instant::now();
    let mut vocabulary = Vocabulary::with_legalese();
    vocabulary.extend_legalese(unique_numeric_tokens(&rules).iter().map(String::as_str))?;
    let len_legalese = vocabulary.len_legalese();

    let mut rules_by_rid: Vec<Arc<Rule>> = Vec::with_capacity(rules.len());
    let mut high_postings_by_rid = Vec::with_capacity(rules.len());
    let mut high_sets_by_rid = Vec::with_capacity(rules.len());
    let mut regular_rids = HashSet::new();
    let mut negative_rids = HashSet::new();
    let mut false_positive_rids = HashSet::new();
    let mut approx_matchable_rids = HashSet::new();
    let mut false_positive_rid_by_hash = HashMap::new();
    let mut starters: HashMap<Vec<TokenId>, Vec<(usize, usize)>> = HashMap::new();

    let mut rules_automaton = TokenAutomatonBuilder::new();
    let mut negative_automaton = TokenAutomatonBuilder::new();
    let mut fragments_automaton = TokenAutomatonBuilder::new();

    for (rid, mut rule) in rules.into_iter().enumerate() {
        index_rule(&mut rule, &mut vocabulary)
            .with_context(|| format!("Failed to index rule {}", rule.identifier))?;

        let tokens = &rule.tokens;
        let whole = PatternEntry {
            rid,
            start: 0,
            end: rule.length,
        };

        if rule.is_negative {
            negative_rids.insert(rid);
            if rule.has_gaps() {
                warn!(
                    "Negative rule {} has template gaps and is not matchable",
                    rule.identifier
                );
            } else {
                negative_automaton.add(tokens, whole);
            }
        } else {
            if rule.is_false_positive {
                false_positive_rids.insert(rid);
                false_positive_rid_by_hash.insert(compute_hash(tokens), rid);
            } else {
                regular_rids.insert(rid);
            }
            if !rule.has_gaps() {
                rules_automaton.add(tokens, whole);
            } else if !rule.is_approx_matchable {
                warn!(
                    "Rule {} has template gaps but is not approx-matchable and cannot match",
                    rule.identifier
                );
            }
        }

        if rule.is_approx_matchable {
            approx_matchable_rids.insert(rid);
            for segment in rule_segments(rule.length, &rule.gaps) {
                let segment_tokens = &tokens[segment.clone()];
                if let Some(starter) = segment_tokens.get(..NGRAM_LENGTH) {
                    starters
                        .entry(starter.to_vec())
                        .or_default()
                        .push((rid, segment.start));
                }
                for (offset, ngram) in ngrams(segment_tokens, NGRAM_LENGTH) {
                    if ngram.iter().any(|&tid| (tid as usize) < len_legalese) {
                        let start = segment.start + offset;
                        fragments_automaton.add(
                            ngram,
                            PatternEntry {
                                rid,
                                start,
                                end: start + NGRAM_LENGTH,
                            },
                        );
                    }
                }
            }
        }

        high_postings_by_rid.push(high_postings(tokens, len_legalese));
        high_sets_by_rid.push(high_tids_set(tokens, len_legalese));
        rules_by_rid.push(Arc::new(rule));
    }

    let index = LicenseIndex {
        vocabulary,
        len_legalese,
        rules_by_rid,
        high_postings_by_rid,
        high_sets_by_rid,
        rules_automaton: rules_automaton.build(),
        negative_automaton: negative_automaton.build(),
        fragments_automaton: fragments_automaton.build(),
        starters,
        regular_rids,
        negative_rids,
        false_positive_rids,
        approx_matchable_rids,
        false_positive_rid_by_hash,
    };

    info!(
        "Built license index: {} rules, {} tokens ({} legalese) in {:.2?}",
        index.rules_by_rid.len(),
        index.vocabulary.len(),
        len_legalese,
        started.elapsed()
    );
    Ok(index)
}
