//! Weighted combination of factor scores into a single total.

use anyhow::bail;
use strum::EnumCount as EnumCountTrait;
use strum::IntoEnumIterator;

use crate::factor::{FactorKind, FactorScores};
use crate::probs::round_dp1;

/// Per-factor weights. A factor without a weight never contributes to the
/// total; the denominator renormalises over the factors that are both weighted
/// and present, keeping totals comparable across partial inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorWeights {
    weights: [Option<f64>; FactorKind::COUNT],
}

impl FactorWeights {
    /// Starts from an empty table; combine with [`with_weight`](Self::with_weight).
    pub fn empty() -> Self {
        Self {
            weights: [None; FactorKind::COUNT],
        }
    }

    /// The seven-factor table used when pedigree and running-style scoring are
    /// enabled alongside the base five.
    pub fn seven_factor() -> Self {
        Self::empty()
            .with_weight(FactorKind::PastResults, 0.20)
            .with_weight(FactorKind::CourseFit, 0.15)
            .with_weight(FactorKind::TimeIndex, 0.15)
            .with_weight(FactorKind::Last3f, 0.15)
            .with_weight(FactorKind::Popularity, 0.10)
            .with_weight(FactorKind::Pedigree, 0.15)
            .with_weight(FactorKind::RunningStyle, 0.10)
    }

    pub fn with_weight(mut self, kind: FactorKind, weight: f64) -> Self {
        self.weights[kind as usize] = Some(weight);
        self
    }

    pub fn get(&self, kind: FactorKind) -> Option<f64> {
        self.weights[kind as usize]
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let mut sum = 0.0;
        for kind in FactorKind::iter() {
            if let Some(weight) = self.get(kind) {
                if !weight.is_finite() || weight < 0.0 {
                    bail!("weight for factor {kind} must be a non-negative number");
                }
                sum += weight;
            }
        }
        if sum <= 0.0 {
            bail!("factor weights must have a positive sum");
        }
        Ok(())
    }

    /// Weighted mean of the present factor scores; `None` when no weighted
    /// factor produced a score.
    pub fn combine(&self, scores: &FactorScores) -> Option<f64> {
        let mut total_score = 0.0;
        let mut total_weight = 0.0;
        for (kind, score) in scores.iter() {
            if let (Some(score), Some(weight)) = (score, self.get(kind)) {
                total_score += score * weight;
                total_weight += weight;
            }
        }
        if total_weight == 0.0 {
            return None;
        }
        Some(round_dp1(total_score / total_weight))
    }
}

impl Default for FactorWeights {
    /// The base five-factor table; weights sum to 1.0.
    fn default() -> Self {
        Self::empty()
            .with_weight(FactorKind::PastResults, 0.25)
            .with_weight(FactorKind::CourseFit, 0.20)
            .with_weight(FactorKind::TimeIndex, 0.20)
            .with_weight(FactorKind::Last3f, 0.20)
            .with_weight(FactorKind::Popularity, 0.15)
    }
}
