//! Market-popularity factor: prefers a posted popularity rank, falling back to
//! a piecewise-linear schedule over final odds.

use crate::factor::FactorContext;
use crate::probs::{cap_score, round_dp1};

pub fn score(ctx: &FactorContext) -> Option<f64> {
    if let Some(rank) = ctx.popularity {
        // Rank 1 scores 100, falling 10 points per rank with a floor of 10.
        let score = 100.0 - (rank.saturating_sub(1)) as f64 * 10.0;
        return Some(f64::max(10.0, score));
    }

    let odds = ctx.odds?;
    let score = if odds <= 2.0 {
        100.0 - (odds - 1.0) * 10.0
    } else if odds <= 5.0 {
        90.0 - (odds - 2.0) * 10.0
    } else if odds <= 10.0 {
        60.0 - (odds - 5.0) * 6.0
    } else {
        f64::max(10.0, 30.0 - (odds - 10.0) * 2.0)
    };
    Some(cap_score(round_dp1(score)))
}
