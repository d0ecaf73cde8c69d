//! Token sets and postings derived from rule token sequences.

use std::collections::{HashMap, HashSet};

use crate::license_detection::index::vocabulary::TokenId;

/// Distinct legalese token ids of a sequence.
pub fn high_tids_set(tokens: &[TokenId], len_legalese: usize) -> HashSet<TokenId> {
    tokens
        .iter()
        .copied()
        .filter(|&tid| (tid as usize) < len_legalese)
        .collect()
}

/// Positions of each legalese token in a sequence, in increasing order.
///
/// This is the `b2j` mapping used by sequence alignment.
pub fn high_postings(tokens: &[TokenId], len_legalese: usize) -> HashMap<TokenId, Vec<usize>> {
    let mut postings: HashMap<TokenId, Vec<usize>> = HashMap::new();
    for (pos, &tid) in tokens.iter().enumerate() {
        if (tid as usize) < len_legalese {
            postings.entry(tid).or_default().push(pos);
        }
    }
    postings
}

/// Token counts of a sequence: `(length_unique, high_length, high_length_unique)`.
pub fn token_counts(tokens: &[TokenId], len_legalese: usize) -> (usize, usize, usize) {
    let unique: HashSet<TokenId> = tokens.iter().copied().collect();
    let high_length = tokens
        .iter()
        .filter(|&&tid| (tid as usize) < len_legalese)
        .count();
    let high_length_unique = unique
        .iter()
        .filter(|&&tid| (tid as usize) < len_legalese)
        .count();
    (unique.len(), high_length, high_length_unique)
}

/// Number of token ids shared by two sets.
pub fn overlap(a: &HashSet<TokenId>, b: &HashSet<TokenId>) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|tid| large.contains(tid)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_tids_set() {
        let set = high_tids_set(&[0, 5, 1, 0, 9], 3);
        assert_eq!(set, HashSet::from([0, 1]));
    }

    #[test]
    fn test_high_postings() {
        let postings = high_postings(&[0, 5, 1, 0, 9], 3);
        assert_eq!(postings.get(&0), Some(&vec![0, 3]));
        assert_eq!(postings.get(&1), Some(&vec![2]));
        assert!(!postings.contains_key(&5));
    }

    #[test]
    fn test_token_counts() {
        assert_eq!(token_counts(&[0, 5, 1, 0, 9, 5], 3), (4, 3, 2));
        assert_eq!(token_counts(&[], 3), (0, 0, 0));
    }

    #[test]
    fn test_overlap() {
        let a = HashSet::from([1, 2, 3]);
        let b = HashSet::from([2, 3, 4, 5]);
        assert_eq!(overlap(&a, &b), 2);
        assert_eq!(overlap(&b, &a), 2);
        assert_eq!(overlap(&a, &HashSet::new()), 0);
    }
}
