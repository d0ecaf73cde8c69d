//! Local alignment of a query token sequence with a rule token sequence.
//!
//! Alignment anchors on legalese tokens: a block is first found as the longest
//! common run of legalese tokens, then grown over any equal tokens on both
//! sides. Only query positions in the matchables set take part.

use bit_set::BitSet;
use std::collections::HashMap;

use crate::license_detection::index::vocabulary::TokenId;

/// A matching block: `a[a..a + size] == b[b..b + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block {
    pub a: usize,
    pub b: usize,
    pub size: usize,
}

impl Block {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Find the longest matching block of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Only tokens of `a` below `len_good` at matchable positions can seed a block,
/// located with `b2j`, the sorted positions of each good token in `b`. The
/// longest seed is then extended with [`extend_match`]. Among equally long
/// seeds the one starting earliest in `a`, then in `b`, wins.
///
/// Returns a block of size 0 at `(alo, blo)` when nothing matches.
#[allow(clippy::too_many_arguments)]
pub fn find_longest_match(
    a: &[TokenId],
    b: &[TokenId],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
    b2j: &HashMap<TokenId, Vec<usize>>,
    len_good: usize,
    matchables: &BitSet,
) -> Block {
    let mut best = Block {
        a: alo,
        b: blo,
        size: 0,
    };

    // j2len[j] is the length of the good run ending at a[i - 1] and b[j]
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for i in alo..ahi {
        let mut next_j2len = HashMap::new();
        let token = a[i];
        if (token as usize) < len_good && matchables.contains(i) {
            for &j in b2j.get(&token).map(Vec::as_slice).unwrap_or_default() {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| j2len.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_j2len.insert(j, k);
                if k > best.size {
                    best = Block {
                        a: i + 1 - k,
                        b: j + 1 - k,
                        size: k,
                    };
                }
            }
        }
        j2len = next_j2len;
    }

    extend_match(best, a, b, alo, ahi, blo, bhi, matchables)
}

/// Grow a non-empty block over equal tokens at matchable positions on both
/// ends, staying within `a[alo..ahi]` and `b[blo..bhi]`.
#[allow(clippy::too_many_arguments)]
pub fn extend_match(
    block: Block,
    a: &[TokenId],
    b: &[TokenId],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
    matchables: &BitSet,
) -> Block {
    if block.is_empty() {
        return block;
    }
    let Block {
        a: mut i,
        b: mut j,
        mut size,
    } = block;

    while i > alo && j > blo && a[i - 1] == b[j - 1] && matchables.contains(i - 1) {
        i -= 1;
        j -= 1;
        size += 1;
    }
    while i + size < ahi
        && j + size < bhi
        && a[i + size] == b[j + size]
        && matchables.contains(i + size)
    {
        size += 1;
    }

    Block { a: i, b: j, size }
}

/// All matching blocks between `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Blocks are found by recursively taking the longest match and searching the
/// regions left and right of it. They come back sorted, increasing in both `a`
/// and `b`, with adjacent blocks collapsed into one.
#[allow(clippy::too_many_arguments)]
pub fn match_blocks(
    a: &[TokenId],
    b: &[TokenId],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
    b2j: &HashMap<TokenId, Vec<usize>>,
    len_good: usize,
    matchables: &BitSet,
) -> Vec<Block> {
    let mut queue = vec![(alo, ahi, blo, bhi)];
    let mut blocks = Vec::new();

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        if alo >= ahi || blo >= bhi {
            continue;
        }
        let block = find_longest_match(a, b, alo, ahi, blo, bhi, b2j, len_good, matchables);
        if block.is_empty() {
            continue;
        }
        if alo < block.a && blo < block.b {
            queue.push((alo, block.a, blo, block.b));
        }
        if block.a + block.size < ahi && block.b + block.size < bhi {
            queue.push((block.a + block.size, ahi, block.b + block.size, bhi));
        }
        blocks.push(block);
    }

    blocks.sort();

    let mut collapsed: Vec<Block> = Vec::with_capacity(blocks.len());
    for block in blocks {
        match collapsed.last_mut() {
            Some(last) if last.a + last.size == block.a && last.b + last.size == block.b => {
                last.size += block.size;
            }
            _ => collapsed.push(block),
        }
    }
    collapsed
}
