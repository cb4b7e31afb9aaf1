//! Longest-common-subsequence matching.
//!
//! A faithful port of the classic recursive-longest-match algorithm:
//! repeatedly find the longest block the two sequences share, then
//! match the pieces to its left and right. On top of the block list
//! sit the opcode view ([`SequenceMatcher::get_opcodes`]) and three
//! similarity measures of decreasing cost, each an upper bound on the
//! next: `real_quick_ratio >= quick_ratio >= ratio`. The differ uses
//! the cheap bounds to reject synch-pair candidates early. There is
//! no junk or popular-element filtering; disassembled functions stay
//! far below the sizes where that matters.

use std::collections::HashMap;
use std::hash::Hash;

/// The coarse relationship between a left and a right range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffTag {
    Equal,
    Delete,
    Insert,
    Replace,
}

/// One matcher operation: `tag` over `a[alo..ahi]` and `b[blo..bhi]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOp {
    pub tag: DiffTag,
    pub alo: usize,
    pub ahi: usize,
    pub blo: usize,
    pub bhi: usize,
}

/// A maximal matching block: `a[a..a + size] == b[b..b + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block {
    a: usize,
    b: usize,
    size: usize,
}

/// Compares two borrowed sequences of hashable elements.
pub struct SequenceMatcher<'a, T: Eq + Hash> {
    a: &'a [T],
    b: &'a [T],
    /// Element -> positions in `b`, ascending.
    b2j: HashMap<&'a T, Vec<usize>>,
    /// Element -> multiplicity in `b`; built lazily for
    /// [`quick_ratio`](SequenceMatcher::quick_ratio).
    fullbcount: Option<HashMap<&'a T, usize>>,
    matching_blocks: Option<Vec<Block>>,
}

impl<'a, T: Eq + Hash> SequenceMatcher<'a, T> {
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        let mut b2j: HashMap<&'a T, Vec<usize>> = HashMap::new();
        for (j, element) in b.iter().enumerate() {
            b2j.entry(element).or_default().push(j);
        }
        SequenceMatcher {
            a,
            b,
            b2j,
            fullbcount: None,
            matching_blocks: None,
        }
    }

    /// Find the longest block over `a[alo..ahi]` x `b[blo..bhi]`.
    ///
    /// Of all maximal blocks, the one starting earliest in `a` (and,
    /// among those, earliest in `b`) wins.
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Block {
        let mut best = Block {
            a: alo,
            b: blo,
            size: 0,
        };
        // j2len[j] = length of the longest block ending at a[i], b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut newj2len: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = if j == 0 {
                        1
                    } else {
                        j2len.get(&(j - 1)).copied().unwrap_or(0) + 1
                    };
                    newj2len.insert(j, k);
                    if k > best.size {
                        best = Block {
                            a: i + 1 - k,
                            b: j + 1 - k,
                            size: k,
                        };
                    }
                }
            }
            j2len = newj2len;
        }
        best
    }

    fn blocks(&mut self) -> &[Block] {
        if self.matching_blocks.is_none() {
            let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
            let mut raw: Vec<Block> = Vec::new();
            while let Some((alo, ahi, blo, bhi)) = queue.pop() {
                let block = self.find_longest_match(alo, ahi, blo, bhi);
                if block.size > 0 {
                    if alo < block.a && blo < block.b {
                        queue.push((alo, block.a, blo, block.b));
                    }
                    if block.a + block.size < ahi && block.b + block.size < bhi {
                        queue.push((block.a + block.size, ahi, block.b + block.size, bhi));
                    }
                    raw.push(block);
                }
            }
            raw.sort_by_key(|block| (block.a, block.b));
            // Merge adjacent blocks into maximal runs
            let mut merged: Vec<Block> = Vec::new();
            let mut run = Block {
                a: 0,
                b: 0,
                size: 0,
            };
            for block in raw {
                if run.a + run.size == block.a && run.b + run.size == block.b {
                    run.size += block.size;
                } else {
                    if run.size > 0 {
                        merged.push(run);
                    }
                    run = block;
                }
            }
            if run.size > 0 {
                merged.push(run);
            }
            // Sentinel block so opcode emission flushes the tails
            merged.push(Block {
                a: self.a.len(),
                b: self.b.len(),
                size: 0,
            });
            self.matching_blocks = Some(merged);
        }
        self.matching_blocks.as_deref().expect("just built")
    }

    /// The operation list turning `a` into `b`.
    ///
    /// Tags come from the closed [`DiffTag`] alphabet; consecutive
    /// operations abut (`ahi == next.alo`, `bhi == next.blo`).
    pub fn get_opcodes(&mut self) -> Vec<DiffOp> {
        let mut opcodes = Vec::new();
        let mut i = 0;
        let mut j = 0;
        for block in self.blocks() {
            let tag = match (i < block.a, j < block.b) {
                (true, true) => Some(DiffTag::Replace),
                (true, false) => Some(DiffTag::Delete),
                (false, true) => Some(DiffTag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                opcodes.push(DiffOp {
                    tag,
                    alo: i,
                    ahi: block.a,
                    blo: j,
                    bhi: block.b,
                });
            }
            i = block.a + block.size;
            j = block.b + block.size;
            if block.size > 0 {
                opcodes.push(DiffOp {
                    tag: DiffTag::Equal,
                    alo: block.a,
                    ahi: i,
                    blo: block.b,
                    bhi: j,
                });
            }
        }
        opcodes
    }

    /// The real similarity: `2 * matches / total length`, in `[0, 1]`.
    pub fn ratio(&mut self) -> f64 {
        let matches: usize = self.blocks().iter().map(|block| block.size).sum();
        calculate_ratio(matches, self.a.len() + self.b.len())
    }

    /// Upper bound on [`ratio`](SequenceMatcher::ratio): matches
    /// counted by multiset intersection, ignoring order.
    pub fn quick_ratio(&mut self) -> f64 {
        if self.fullbcount.is_none() {
            let mut counts: HashMap<&'a T, usize> = HashMap::new();
            for element in self.b {
                *counts.entry(element).or_insert(0) += 1;
            }
            self.fullbcount = Some(counts);
        }
        let fullbcount = self.fullbcount.as_ref().expect("just built");
        let mut avail: HashMap<&T, isize> = HashMap::new();
        let mut matches = 0;
        for element in self.a {
            let remaining = match avail.get(element) {
                Some(&n) => n,
                None => fullbcount.get(element).copied().unwrap_or(0) as isize,
            };
            avail.insert(element, remaining - 1);
            if remaining > 0 {
                matches += 1;
            }
        }
        calculate_ratio(matches, self.a.len() + self.b.len())
    }

    /// The cheapest upper bound: assumes everything that could match
    /// does.
    pub fn real_quick_ratio(&self) -> f64 {
        let la = self.a.len();
        let lb = self.b.len();
        calculate_ratio(la.min(lb), la + lb)
    }
}

fn calculate_ratio(matches: usize, length: usize) -> f64 {
    if length > 0 {
        2.0 * matches as f64 / length as f64
    } else {
        1.0
    }
}
