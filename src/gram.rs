//! Open n-gram decomposition and context construction.
//!
//! A record is encoded at every sub-gram scale: each open n-gram (a
//! contiguous run, or one with a single interior gap) contributes a bound
//! trace. The context vector for a record position is the superposition of
//! every gram through that position with the position itself replaced by
//! the placeholder; it serves as both the stored trace for that position's
//! value and the query vector when that position is the wildcard.

use crate::hrr::{Hrr, Permutation};
use std::ops::RangeInclusive;

/// Enumerate the open n-grams of `seg` with sizes drawn from `sizes`
/// (ascending). Grams are contiguous runs plus runs broken by one interior
/// gap.
///
/// # Examples
///
/// ```
/// use holomem::gram::open_ngrams;
///
/// let grams = open_ngrams(&['A', 'B', 'C'], 2..=3);
/// assert_eq!(
///     grams,
///     vec![
///         vec!['A', 'B'],
///         vec!['A', 'C'],
///         vec!['B', 'C'],
///         vec!['A', 'B', 'C'],
///     ]
/// );
/// ```
pub fn open_ngrams<T: Clone>(seg: &[T], sizes: RangeInclusive<usize>) -> Vec<Vec<T>> {
    let mut ngrams = Vec::new();
    for size in sizes {
        if size == 0 {
            continue;
        }
        if size > seg.len() {
            break;
        }
        for i in 0..seg.len() {
            if i + size > seg.len() {
                break;
            }
            ngrams.push(seg[i..i + size].to_vec());
            if i + size == seg.len() {
                continue;
            }
            for b in 1..size {
                for e in 1..=(seg.len() - i - size) {
                    let mut gram = seg[i..i + b].to_vec();
                    gram.extend_from_slice(&seg[i + b + e..i + e + size]);
                    ngrams.push(gram);
                }
            }
        }
    }
    ngrams
}

/// Bind a gram's vectors into a single trace, in order.
///
/// With `ordered`, the left operand of each pairwise convolution is first
/// permuted by `left`, making the chain sensitive to element order; without
/// it the chain is a plain (commutative) convolution product, as used for
/// role-permuted slot:value grams.
fn chain(vecs: &[&Hrr], gram: &[usize], ordered: bool, left: &Permutation) -> Hrr {
    let mut acc = vecs[gram[0]].clone();
    for &g in &gram[1..] {
        acc = if ordered {
            acc.permute(left).convolve(vecs[g])
        } else {
            acc.convolve(vecs[g])
        };
    }
    acc
}

/// Context vector for position `p` by explicit enumeration: the sum of the
/// bound traces of every open n-gram (sizes in `sizes`) that contains `p`.
///
/// `vecs[p]` is expected to already hold the placeholder vector.
pub fn windowed_context(
    vecs: &[&Hrr],
    p: usize,
    ordered: bool,
    left: &Permutation,
    sizes: RangeInclusive<usize>,
) -> Hrr {
    let dim = vecs[0].dim();
    let idx: Vec<usize> = (0..vecs.len()).collect();
    let mut ctx = Hrr::zeros(dim);
    for gram in open_ngrams(&idx, sizes) {
        if !gram.contains(&p) {
            continue;
        }
        ctx.accumulate(&chain(vecs, &gram, ordered, left));
    }
    ctx
}

/// Context vector for position `p` over *unconstrained* open grams: every
/// subsequence through `p`, any number of gaps, no size cap.
///
/// Rather than materializing the exponential gram set, a single
/// left-to-right pass folds two running superpositions — grams ending at
/// the current element, and the subset of those that pass through `p` —
/// which is sound because convolution distributes over superposition. Work
/// is O(L) convolutions instead of O(L·2^L).
pub fn unconstrained_context(
    vecs: &[&Hrr],
    p: usize,
    ordered: bool,
    left: &Permutation,
    min_size: usize,
) -> Hrr {
    let dim = vecs[0].dim();
    // Sums over grams ending at the last element processed so far:
    // any = all of them, hit = those containing p.
    let mut any_total = Hrr::zeros(dim);
    let mut hit_total = Hrr::zeros(dim);
    for (j, vj) in vecs.iter().enumerate() {
        let ext_any = if ordered {
            any_total.permute(left).convolve(vj)
        } else {
            any_total.convolve(vj)
        };
        let ending_any = vj.superpose(&ext_any);
        let ending_hit = if j == p {
            // every gram ending at p passes through p
            ending_any.clone()
        } else if ordered {
            hit_total.permute(left).convolve(vj)
        } else {
            hit_total.convolve(vj)
        };
        any_total.accumulate(&ending_any);
        hit_total.accumulate(&ending_hit);
    }
    if min_size > 1 {
        // drop the size-1 gram {p}
        hit_total.retract(vecs[p]);
    }
    hit_total
}
