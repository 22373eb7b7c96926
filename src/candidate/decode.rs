//! Anchor decode loop.
//!
//! One pass over anchors, one pass over classes per anchor, no per-anchor
//! allocation. The parallel variant splits anchors into contiguous chunks and
//! concatenates chunk results in order, so both variants return identical
//! candidate lists.

use crate::candidate::{BestTwo, Candidate};
use crate::tensor::{TensorElement, TensorView};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

#[cfg(feature = "rayon")]
const PAR_CHUNK_ANCHORS: usize = 1024;

#[inline]
fn decode_anchor<T: TensorElement>(view: &TensorView<'_, T>, anchor: usize) -> Option<Candidate> {
    let mut best = BestTwo::new();
    for class in 0..view.num_classes() {
        best.push(class, view.score_at(class, anchor));
    }
    // Box attributes are only read for anchors that survive.
    let probe = best.into_candidate(anchor, [0.0; 4])?;
    Some(Candidate {
        raw_box: view.raw_box(anchor),
        ..probe
    })
}

fn decode_range<T: TensorElement>(
    view: &TensorView<'_, T>,
    range: std::ops::Range<usize>,
    out: &mut Vec<Candidate>,
) {
    for anchor in range {
        if let Some(candidate) = decode_anchor(view, anchor) {
            out.push(candidate);
        }
    }
}

/// Decodes every anchor with a nonzero best class score.
pub fn decode_candidates<T: TensorElement>(view: &TensorView<'_, T>) -> Vec<Candidate> {
    let mut out = Vec::new();
    decode_range(view, 0..view.num_anchors(), &mut out);
    out
}

/// Decodes anchors in parallel chunks (rayon).
#[cfg(feature = "rayon")]
pub fn decode_candidates_par<T: TensorElement>(view: &TensorView<'_, T>) -> Vec<Candidate> {
    let num_anchors = view.num_anchors();
    let num_chunks = num_anchors.div_ceil(PAR_CHUNK_ANCHORS);
    let chunks: Vec<Vec<Candidate>> = (0..num_chunks)
        .into_par_iter()
        .map(|chunk| {
            let start = chunk * PAR_CHUNK_ANCHORS;
            let end = (start + PAR_CHUNK_ANCHORS).min(num_anchors);
            let mut out = Vec::new();
            decode_range(view, start..end, &mut out);
            out
        })
        .collect();

    let total = chunks.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for chunk in chunks {
        out.extend(chunk);
    }
    out
}
