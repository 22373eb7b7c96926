//! Confidence gate: per-class floors and the best-vs-runner-up gap rule.
//!
//! Both rules run before any geometry work. Each rejection is tallied so
//! thresholds can be tuned offline from real traffic.

mod thresholds;

pub use thresholds::ClassThresholds;

use crate::candidate::Candidate;

/// Outcome of gating one candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateVerdict {
    /// Candidate passes both rules.
    Accept,
    /// Best score is below its class floor.
    BelowFloor,
    /// Best and runner-up scores are too close to trust the label.
    Ambiguous,
}

/// Candidate counts for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GateTally {
    /// Candidates offered to the gate.
    pub total: usize,
    /// Rejected by the per-class floor.
    pub rejected_by_floor: usize,
    /// Rejected by the ambiguity gap.
    pub rejected_by_gap: usize,
    /// Passed both rules.
    pub accepted: usize,
}

impl GateTally {
    fn record(&mut self, verdict: GateVerdict) {
        self.total += 1;
        match verdict {
            GateVerdict::Accept => self.accepted += 1,
            GateVerdict::BelowFloor => self.rejected_by_floor += 1,
            GateVerdict::Ambiguous => self.rejected_by_gap += 1,
        }
    }
}

/// Policy stage between decode and geometry.
#[derive(Clone, Debug)]
pub struct ConfidenceGate {
    thresholds: ClassThresholds,
    min_gap: f32,
    gap_check: bool,
}

impl ConfidenceGate {
    /// Creates a gate. `gap_check = false` disables the ambiguity rule.
    pub fn new(thresholds: ClassThresholds, min_gap: f32, gap_check: bool) -> Self {
        Self {
            thresholds,
            min_gap,
            gap_check,
        }
    }

    /// Returns the per-class floors.
    pub fn thresholds(&self) -> &ClassThresholds {
        &self.thresholds
    }

    /// Judges one candidate. The floor is checked first.
    #[inline]
    pub fn evaluate(&self, candidate: &Candidate) -> GateVerdict {
        if candidate.best_score < self.thresholds.floor(candidate.best_class) {
            return GateVerdict::BelowFloor;
        }
        if self.gap_check && candidate.confidence_gap() < self.min_gap {
            return GateVerdict::Ambiguous;
        }
        GateVerdict::Accept
    }

    /// Keeps accepted candidates in order and tallies every verdict.
    pub fn apply(&self, candidates: Vec<Candidate>, tally: &mut GateTally) -> Vec<Candidate> {
        let mut kept = candidates;
        kept.retain(|candidate| {
            let verdict = self.evaluate(candidate);
            tally.record(verdict);
            verdict == GateVerdict::Accept
        });
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::{ClassThresholds, ConfidenceGate, GateTally, GateVerdict};
    use crate::candidate::Candidate;

    fn candidate(best_class: usize, best: f32, second: f32) -> Candidate {
        Candidate {
            anchor: 0,
            raw_box: [0.5, 0.5, 0.2, 0.2],
            best_class,
            best_score: best,
            second_class: Some(1 - best_class.min(1)),
            second_score: second,
        }
    }

    #[test]
    fn narrow_gap_is_rejected_only_when_it_exceeds_the_configured_margin() {
        let thresholds = ClassThresholds::uniform(0.5, 2);
        let c = candidate(0, 0.60, 0.50);

        let strict = ConfidenceGate::new(thresholds.clone(), 0.15, true);
        assert_eq!(strict.evaluate(&c), GateVerdict::Ambiguous);

        let lenient = ConfidenceGate::new(thresholds.clone(), 0.05, true);
        assert_eq!(lenient.evaluate(&c), GateVerdict::Accept);

        let disabled = ConfidenceGate::new(thresholds, 0.15, false);
        assert_eq!(disabled.evaluate(&c), GateVerdict::Accept);
    }

    #[test]
    fn floor_is_checked_before_gap() {
        let gate = ConfidenceGate::new(ClassThresholds::uniform(0.7, 2), 0.15, true);
        assert_eq!(gate.evaluate(&candidate(0, 0.6, 0.55)), GateVerdict::BelowFloor);
    }

    #[test]
    fn apply_tallies_each_outcome() {
        let gate = ConfidenceGate::new(ClassThresholds::uniform(0.5, 2), 0.15, true);
        let mut tally = GateTally::default();
        let kept = gate.apply(
            vec![
                candidate(0, 0.9, 0.0),
                candidate(1, 0.4, 0.1),
                candidate(0, 0.6, 0.5),
                candidate(1, 0.8, 0.2),
            ],
            &mut tally,
        );
        assert_eq!(kept.len(), 2);
        assert_eq!(
            tally,
            GateTally {
                total: 4,
                rejected_by_floor: 1,
                rejected_by_gap: 1,
                accepted: 2,
            }
        );
    }
}
