//! Per-anchor candidates and the decode loop that produces them.
//!
//! A candidate keeps the best and second-best class of its anchor so the
//! confidence gate can judge ambiguity; nothing is filtered here beyond
//! dropping anchors whose best score is zero.

pub(crate) mod decode;

/// Pre-geometry record for one anchor with a nonzero best score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Anchor index in the output tensor.
    pub anchor: usize,
    /// Raw `xc, yc, w, h` as emitted by the model.
    pub raw_box: [f32; 4],
    /// Index of the highest-scoring class.
    pub best_class: usize,
    /// Score of the highest-scoring class.
    pub best_score: f32,
    /// Index of the runner-up class, if any class other than the best scored
    /// above zero.
    pub second_class: Option<usize>,
    /// Score of the runner-up class, or zero.
    pub second_score: f32,
}

impl Candidate {
    /// Margin between the two best class scores.
    #[inline]
    pub fn confidence_gap(&self) -> f32 {
        self.best_score - self.second_score
    }
}

/// Single-pass tracker of the two highest (score, class) pairs.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BestTwo {
    best_score: f32,
    best_class: usize,
    second_score: f32,
    second_class: Option<usize>,
}

impl BestTwo {
    #[inline(always)]
    pub(crate) fn new() -> Self {
        Self {
            best_score: 0.0,
            best_class: 0,
            second_score: 0.0,
            second_class: None,
        }
    }

    /// Offers one class score. NaN and non-positive scores never displace
    /// an entry.
    #[inline(always)]
    pub(crate) fn push(&mut self, class: usize, score: f32) {
        if score > self.best_score {
            if self.best_score > 0.0 {
                self.second_score = self.best_score;
                self.second_class = Some(self.best_class);
            }
            self.best_score = score;
            self.best_class = class;
        } else if score > self.second_score {
            self.second_score = score;
            self.second_class = Some(class);
        }
    }

    #[inline]
    pub(crate) fn into_candidate(self, anchor: usize, raw_box: [f32; 4]) -> Option<Candidate> {
        if self.best_score > 0.0 {
            Some(Candidate {
                anchor,
                raw_box,
                best_class: self.best_class,
                best_score: self.best_score,
                second_class: self.second_class,
                second_score: self.second_score,
            })
        } else {
            None
        }
    }
}
