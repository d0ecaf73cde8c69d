//! Span - sets of token positions.
//!
//! Spans track matched positions on both the query side and the rule side of a
//! license match. Most matches cover a contiguous run of positions and use the
//! cheap `Dense` form; alignments that skip tokens use the `Sparse` bitset form.
//! Constructors always normalize, so a contiguous set is never stored as
//! `Sparse` and structural equality is set equality.

use bit_set::BitSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;

/// An immutable set of token positions.
#[derive(Clone)]
pub enum Span {
    /// Contiguous positions `start..end` (half-open). The empty span is `0..0`.
    Dense(Range<usize>),
    /// Non-contiguous positions.
    Sparse(BitSet),
}

impl Span {
    /// Create an empty span.
    pub fn new() -> Self {
        Span::Dense(0..0)
    }

    /// Create a span from a half-open range of positions.
    pub fn from_range(range: Range<usize>) -> Self {
        if range.start >= range.end {
            Span::new()
        } else {
            Span::Dense(range)
        }
    }

    /// Create a span from an iterator of positions, in any order and with
    /// possible duplicates.
    pub fn from_positions(positions: impl IntoIterator<Item = usize>) -> Self {
        Self::normalize(positions.into_iter().collect())
    }

    fn normalize(set: BitSet) -> Self {
        let mut iter = set.iter();
        let Some(first) = iter.next() else {
            return Span::new();
        };
        let last = iter.last().unwrap_or(first);
        if last - first + 1 == set.len() {
            Span::Dense(first..last + 1)
        } else {
            Span::Sparse(set)
        }
    }

    fn to_bitset(&self) -> BitSet {
        match self {
            Span::Dense(range) => range.clone().collect(),
            Span::Sparse(set) => set.clone(),
        }
    }

    /// Number of positions in this span.
    pub fn len(&self) -> usize {
        match self {
            Span::Dense(range) => range.len(),
            Span::Sparse(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Smallest position, or 0 for an empty span.
    pub fn start(&self) -> usize {
        match self {
            Span::Dense(range) => range.start,
            Span::Sparse(set) => set.iter().next().unwrap_or(0),
        }
    }

    /// Largest position (inclusive), or 0 for an empty span.
    pub fn end(&self) -> usize {
        match self {
            Span::Dense(range) => range.end.saturating_sub(1),
            Span::Sparse(set) => set.iter().last().unwrap_or(0),
        }
    }

    /// Number of positions between start and end inclusive.
    pub fn magnitude(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.end() - self.start() + 1
        }
    }

    /// Ratio of covered positions over magnitude; 1.0 for dense spans.
    pub fn density(&self) -> f32 {
        match self.magnitude() {
            0 => 0.0,
            magnitude => self.len() as f32 / magnitude as f32,
        }
    }

    pub fn contains_pos(&self, pos: usize) -> bool {
        match self {
            Span::Dense(range) => range.contains(&pos),
            Span::Sparse(set) => set.contains(pos),
        }
    }

    /// True if every position of `other` is in this span.
    pub fn contains(&self, other: &Span) -> bool {
        match (self, other) {
            (_, o) if o.is_empty() => true,
            (Span::Dense(a), Span::Dense(b)) => a.start <= b.start && b.end <= a.end,
            (Span::Dense(a), Span::Sparse(_)) => a.start <= other.start() && other.end() < a.end,
            (Span::Sparse(a), Span::Sparse(b)) => b.is_subset(a),
            (Span::Sparse(a), Span::Dense(b)) => b.clone().all(|p| a.contains(p)),
        }
    }

    /// Number of positions shared with `other`.
    pub fn overlap(&self, other: &Span) -> usize {
        match (self, other) {
            (Span::Dense(a), Span::Dense(b)) => {
                let start = a.start.max(b.start);
                let end = a.end.min(b.end);
                end.saturating_sub(start)
            }
            (Span::Sparse(a), Span::Sparse(b)) => a.intersection(b).count(),
            (Span::Dense(range), Span::Sparse(set)) | (Span::Sparse(set), Span::Dense(range)) => {
                range.clone().filter(|&p| set.contains(p)).count()
            }
        }
    }

    pub fn intersects(&self, other: &Span) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if self.end() < other.start() || other.end() < self.start() {
            return false;
        }
        self.overlap(other) > 0
    }

    pub fn union(&self, other: &Span) -> Span {
        if let (Span::Dense(a), Span::Dense(b)) = (self, other)
            && a.start <= b.end
            && b.start <= a.end
        {
            return Span::from_range(a.start.min(b.start)..a.end.max(b.end));
        }
        let mut set = self.to_bitset();
        set.union_with(&other.to_bitset());
        Self::normalize(set)
    }

    pub fn intersection(&self, other: &Span) -> Span {
        if let (Span::Dense(a), Span::Dense(b)) = (self, other) {
            return Span::from_range(a.start.max(b.start)..a.end.min(b.end));
        }
        let mut set = self.to_bitset();
        set.intersect_with(&other.to_bitset());
        Self::normalize(set)
    }

    /// Positions of this span that are not in `other`.
    pub fn difference(&self, other: &Span) -> Span {
        if !self.intersects(other) {
            return self.clone();
        }
        let mut set = self.to_bitset();
        set.difference_with(&other.to_bitset());
        Self::normalize(set)
    }

    /// Number of positions separating this span from `other`.
    ///
    /// Overlapping spans have a distance of 0 and touching spans a distance of 1.
    pub fn distance_to(&self, other: &Span) -> usize {
        if self.intersects(other) {
            0
        } else if self.end() < other.start() {
            other.start() - self.end()
        } else {
            self.start() - other.end()
        }
    }

    /// True if this span starts strictly after `other` ends.
    pub fn is_after(&self, other: &Span) -> bool {
        self.start() > other.end()
    }

    /// Iterate over positions in increasing order.
    pub fn iter(&self) -> SpanIter<'_> {
        match self {
            Span::Dense(range) => SpanIter::Dense(range.clone()),
            Span::Sparse(set) => SpanIter::Sparse(set.iter()),
        }
    }

    /// Contiguous runs of positions as half-open ranges.
    pub fn subspans(&self) -> Vec<Range<usize>> {
        match self {
            Span::Dense(range) if range.is_empty() => Vec::new(),
            Span::Dense(range) => vec![range.clone()],
            Span::Sparse(set) => {
                let mut ranges: Vec<Range<usize>> = Vec::new();
                for pos in set.iter() {
                    match ranges.last_mut() {
                        Some(last) if last.end == pos => last.end += 1,
                        _ => ranges.push(pos..pos + 1),
                    }
                }
                ranges
            }
        }
    }
}

/// Iterator over the positions of a [`Span`].
pub enum SpanIter<'a> {
    Dense(Range<usize>),
    Sparse(bit_set::Iter<'a, u32>),
}

impl Iterator for SpanIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            SpanIter::Dense(range) => range.next(),
            SpanIter::Sparse(iter) => iter.next(),
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Span {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Span::Dense(a), Span::Dense(b)) => a == b,
            (Span::Sparse(a), Span::Sparse(b)) => a.iter().eq(b.iter()),
            _ => false,
        }
    }
}

impl Eq for Span {}

impl Hash for Span {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Span::Dense(range) => {
                0u8.hash(state);
                range.start.hash(state);
                range.end.hash(state);
            }
            Span::Sparse(set) => {
                1u8.hash(state);
                for pos in set.iter() {
                    pos.hash(state);
                }
            }
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .subspans()
            .into_iter()
            .map(|r| format!("{}..{}", r.start, r.end))
            .collect();
        write!(f, "Span[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_new_is_empty() {
        let span = Span::new();
        assert!(span.is_empty());
        assert_eq!(span.len(), 0);
        assert_eq!(span.magnitude(), 0);
    }

    #[test]
    fn test_from_positions_contiguous_is_dense() {
        let span = Span::from_positions([3, 1, 2, 2]);
        assert!(matches!(span, Span::Dense(_)));
        assert_eq!(span, Span::from_range(1..4));
        assert_eq!(span.start(), 1);
        assert_eq!(span.end(), 3);
    }

    #[test]
    fn test_from_positions_with_hole_is_sparse() {
        let span = Span::from_positions([1, 2, 5]);
        assert!(matches!(span, Span::Sparse(_)));
        assert_eq!(span.len(), 3);
        assert_eq!(span.magnitude(), 5);
        assert_eq!(span.subspans(), vec![1..3, 5..6]);
    }

    #[test]
    fn test_difference_restores_dense() {
        let span = Span::from_range(0..10);
        let diff = span.difference(&Span::from_range(5..10));
        assert_eq!(diff, Span::from_range(0..5));
        assert!(matches!(diff, Span::Dense(_)));
    }

    #[test]
    fn test_union_of_disjoint_ranges() {
        let a = Span::from_range(0..3);
        let b = Span::from_range(5..7);
        let union = a.union(&b);
        assert_eq!(union.len(), 5);
        assert!(union.contains(&a));
        assert!(union.contains(&b));
        assert!(!union.contains_pos(4));
    }

    #[test]
    fn test_union_of_touching_ranges_is_dense() {
        let union = Span::from_range(0..3).union(&Span::from_range(3..6));
        assert_eq!(union, Span::from_range(0..6));
    }

    #[test]
    fn test_contains_mixed_forms() {
        let dense = Span::from_range(0..10);
        let sparse = Span::from_positions([2, 4, 6]);
        assert!(dense.contains(&sparse));
        assert!(!sparse.contains(&dense));
        assert!(sparse.contains(&Span::from_positions([4, 6])));
    }

    #[test]
    fn test_overlap_and_intersects() {
        let a = Span::from_range(0..10);
        let b = Span::from_positions([8, 9, 12]);
        assert_eq!(a.overlap(&b), 2);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&Span::from_range(10..12)));
    }

    #[test]
    fn test_distance_and_is_after() {
        let a = Span::from_range(0..5);
        let b = Span::from_range(8..10);
        assert_eq!(a.distance_to(&b), 4);
        assert_eq!(b.distance_to(&a), 4);
        assert!(b.is_after(&a));
        assert!(!a.is_after(&b));
    }

    #[test]
    fn test_density() {
        assert_eq!(Span::from_range(0..4).density(), 1.0);
        assert_eq!(Span::from_positions([0, 3]).density(), 0.5);
    }

    #[test]
    fn test_equality_is_set_equality() {
        let a = Span::from_positions([1, 3, 5]);
        let b = Span::from_range(1..6).difference(&Span::from_positions([2, 4]));
        assert_eq!(a, b);
    }
}
