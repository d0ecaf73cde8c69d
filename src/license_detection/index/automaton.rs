//! Aho-Corasick automaton over token ids.
//!
//! Patterns are sequences of [`TokenId`] rather than bytes, so a hit always
//! starts and ends on a token boundary. Every pattern carries one or more
//! [`PatternEntry`] values: when several rules share the same token sequence,
//! all of them are reported for a single hit.

use std::collections::VecDeque;

use crate::license_detection::index::vocabulary::TokenId;

const ROOT: usize = 0;

/// Where a pattern comes from: a rule and the rule positions it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternEntry {
    pub rid: usize,
    /// Rule start position, inclusive
    pub start: usize,
    /// Rule end position, exclusive
    pub end: usize,
}

/// One pattern occurrence found in a token sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutomatonHit<'a> {
    /// Query start position, inclusive
    pub start: usize,
    /// Query end position, exclusive
    pub end: usize,
    pub entries: &'a [PatternEntry],
}

#[derive(Debug, Clone, Default)]
struct Node {
    /// Sorted by token id
    children: Vec<(TokenId, usize)>,
    fail: usize,
    /// Nearest proper suffix node that ends a pattern
    output_link: Option<usize>,
    depth: usize,
    entries: Vec<PatternEntry>,
}

impl Node {
    fn child(&self, tid: TokenId) -> Option<usize> {
        self.children
            .binary_search_by_key(&tid, |&(t, _)| t)
            .ok()
            .map(|idx| self.children[idx].1)
    }
}

/// Builder collecting patterns before failure links are computed.
#[derive(Debug, Clone)]
pub struct TokenAutomatonBuilder {
    nodes: Vec<Node>,
}

impl TokenAutomatonBuilder {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::default()],
        }
    }

    /// Add a pattern. Empty patterns are ignored. Adding the same sequence
    /// again appends the entry to the existing pattern.
    pub fn add(&mut self, pattern: &[TokenId], entry: PatternEntry) {
        if pattern.is_empty() {
            return;
        }
        let mut state = ROOT;
        for &tid in pattern {
            state = match self.nodes[state].child(tid) {
                Some(next) => next,
                None => {
                    let next = self.nodes.len();
                    let depth = self.nodes[state].depth + 1;
                    self.nodes.push(Node {
                        depth,
                        ..Node::default()
                    });
                    let children = &mut self.nodes[state].children;
                    let idx = children.partition_point(|&(t, _)| t < tid);
                    children.insert(idx, (tid, next));
                    next
                }
            };
        }
        self.nodes[state].entries.push(entry);
    }

    /// Compute failure and output links breadth first.
    pub fn build(mut self) -> TokenAutomaton {
        let mut queue = VecDeque::new();
        let root_children: Vec<usize> = self.nodes[ROOT].children.iter().map(|&(_, n)| n).collect();
        for child in root_children {
            self.nodes[child].fail = ROOT;
            queue.push_back(child);
        }

        while let Some(state) = queue.pop_front() {
            let children = self.nodes[state].children.clone();
            for (tid, child) in children {
                let mut fallback = self.nodes[state].fail;
                let fail = loop {
                    if let Some(next) = self.nodes[fallback].child(tid) {
                        break next;
                    }
                    if fallback == ROOT {
                        break ROOT;
                    }
                    fallback = self.nodes[fallback].fail;
                };
                let output_link = if self.nodes[fail].entries.is_empty() {
                    self.nodes[fail].output_link
                } else {
                    Some(fail)
                };
                let node = &mut self.nodes[child];
                node.fail = fail;
                node.output_link = output_link;
                queue.push_back(child);
            }
        }

        let patterns = self.nodes.iter().filter(|n| !n.entries.is_empty()).count();
        TokenAutomaton {
            nodes: self.nodes,
            patterns,
        }
    }
}

impl Default for TokenAutomatonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable multi-pattern matcher over token id sequences.
#[derive(Debug, Clone)]
pub struct TokenAutomaton {
    nodes: Vec<Node>,
    patterns: usize,
}

impl TokenAutomaton {
    /// Number of distinct patterns.
    pub fn len(&self) -> usize {
        self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns == 0
    }

    fn next_state(&self, mut state: usize, tid: TokenId) -> usize {
        loop {
            if let Some(next) = self.nodes[state].child(tid) {
                return next;
            }
            if state == ROOT {
                return ROOT;
            }
            state = self.nodes[state].fail;
        }
    }

    /// Find all pattern occurrences in `tokens`, including overlapping ones.
    ///
    /// Hits are reported by increasing end position, longest pattern first
    /// for a given end. Positions are relative to `tokens`.
    pub fn find_iter<'a>(&'a self, tokens: &'a [TokenId]) -> impl Iterator<Item = AutomatonHit<'a>> + 'a {
        let mut state = ROOT;
        tokens.iter().enumerate().flat_map(move |(pos, &tid)| {
            state = self.next_state(state, tid);
            let end = pos + 1;
            let first = if self.nodes[state].entries.is_empty() {
                self.nodes[state].output_link
            } else {
                Some(state)
            };
            std::iter::successors(first, move |&node| self.nodes[node].output_link).map(
                move |node| {
                    let n = &self.nodes[node];
                    AutomatonHit {
                        start: end - n.depth,
                        end,
                        entries: &n.entries,
                    }
                },
            )
        })
    }

    /// Entries of a pattern that exactly equals `tokens`.
    pub fn get(&self, tokens: &[TokenId]) -> Option<&[PatternEntry]> {
        let mut state = ROOT;
        for &tid in tokens {
            state = self.nodes[state].child(tid)?;
        }
        let entries = &self.nodes[state].entries;
        (!entries.is_empty()).then_some(entries.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(rid: usize, len: usize) -> PatternEntry {
        PatternEntry {
            rid,
            start: 0,
            end: len,
        }
    }

    fn build(patterns: &[(&[TokenId], usize)]) -> TokenAutomaton {
        let mut builder = TokenAutomatonBuilder::new();
        for (pattern, rid) in patterns {
            builder.add(pattern, entry(*rid, pattern.len()));
        }
        builder.build()
    }

    fn hits(automaton: &TokenAutomaton, tokens: &[TokenId]) -> Vec<(usize, usize, usize)> {
        automaton
            .find_iter(tokens)
            .flat_map(|hit| hit.entries.iter().map(move |e| (hit.start, hit.end, e.rid)))
            .collect()
    }

    #[test]
    fn test_single_pattern() {
        let automaton = build(&[(&[1, 2, 3], 0)]);
        assert_eq!(hits(&automaton, &[0, 1, 2, 3, 4]), vec![(1, 4, 0)]);
        assert_eq!(automaton.len(), 1);
    }

    #[test]
    fn test_prefix_and_extension_both_found() {
        let automaton = build(&[(&[1, 2], 0), (&[1, 2, 3, 4], 1)]);
        assert_eq!(hits(&automaton, &[1, 2, 3, 4]), vec![(0, 2, 0), (0, 4, 1)]);
    }

    #[test]
    fn test_overlapping_suffix_patterns() {
        let automaton = build(&[(&[1, 2, 3], 0), (&[2, 3], 1), (&[3], 2)]);
        assert_eq!(
            hits(&automaton, &[1, 2, 3]),
            vec![(0, 3, 0), (1, 3, 1), (2, 3, 2)]
        );
    }

    #[test]
    fn test_failure_links_recover() {
        let automaton = build(&[(&[1, 1, 2], 0)]);
        assert_eq!(hits(&automaton, &[1, 1, 1, 2]), vec![(1, 4, 0)]);
    }

    #[test]
    fn test_repeated_occurrences() {
        let automaton = build(&[(&[5, 6], 0)]);
        assert_eq!(hits(&automaton, &[5, 6, 5, 6]), vec![(0, 2, 0), (2, 4, 0)]);
    }

    #[test]
    fn test_duplicate_pattern_keeps_all_entries() {
        let automaton = build(&[(&[7, 8], 0), (&[7, 8], 1)]);
        assert_eq!(hits(&automaton, &[7, 8]), vec![(0, 2, 0), (0, 2, 1)]);
        assert_eq!(automaton.len(), 1);
        assert_eq!(automaton.get(&[7, 8]).map(|e| e.len()), Some(2));
        assert!(automaton.get(&[7]).is_none());
    }

    #[test]
    fn test_empty_automaton_and_input() {
        let automaton = TokenAutomatonBuilder::new().build();
        assert!(automaton.is_empty());
        assert!(hits(&automaton, &[1, 2, 3]).is_empty());
        let automaton = build(&[(&[1], 0)]);
        assert!(hits(&automaton, &[]).is_empty());
    }

    #[test]
    fn test_large_token_ids() {
        let automaton = build(&[(&[u16::MAX, 0, u16::MAX], 3)]);
        assert_eq!(hits(&automaton, &[0, u16::MAX, 0, u16::MAX]), vec![(1, 4, 3)]);
    }
}
