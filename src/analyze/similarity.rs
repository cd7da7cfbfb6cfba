// src/analyze/similarity.rs
//! Title similarity ratios in [0.0, 1.0].
//!
//! - `Sequence`: matching-blocks ratio `2*M / (|a|+|b|)`, where `M` is the total length of
//!   blocks found by taking the longest common substring and recursing on both sides
//!   (Ratcliff/Obershelp). Tie-breaking prefers the block earliest in `a`, then in `b`.
//! - `Levenshtein`: `strsim::normalized_levenshtein`.
//!
//! Either side empty → 0.0, so a missing title never collides.

use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Sequence,
    Levenshtein,
}

impl SimilarityMetric {
    pub fn ratio(self, a: &str, b: &str) -> f64 {
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        match self {
            SimilarityMetric::Sequence => sequence_ratio(a, b),
            SimilarityMetric::Levenshtein => normalized_levenshtein(a, b),
        }
    }
}

pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let m = matching_chars(&a, &b);
    2.0 * m as f64 / total as f64
}

/// Sum of matching block sizes.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]` as (start_a, start_b, len).
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best) = (alo, blo, 0usize);
    // prev[j + 1 - blo] = length of the match ending at (i-1, j)
    let width = bhi - blo + 1;
    let mut prev = vec![0usize; width];
    let mut curr = vec![0usize; width];
    for i in alo..ahi {
        for j in blo..bhi {
            let k = if a[i] == b[j] { prev[j - blo] + 1 } else { 0 };
            curr[j - blo + 1] = k;
            if k > best {
                best = k;
                best_i = i + 1 - k;
                best_j = j + 1 - k;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
        curr.iter_mut().for_each(|v| *v = 0);
    }
    (best_i, best_j, best)
}
