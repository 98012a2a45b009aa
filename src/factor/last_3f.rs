//! Closing-speed factor: mean of the three most recent last-furlong splits on
//! a linear scale where 33 s scores 100 and 38 s scores 0.

use crate::factor::FactorContext;
use crate::probs::{cap_score, round_dp1, SliceExt};

const RECENT_SPLITS: usize = 3;

pub fn score(ctx: &FactorContext) -> Option<f64> {
    let splits: Vec<f64> = ctx
        .past
        .iter()
        .filter(|past| past.horse_id == ctx.horse_id)
        .filter_map(|past| past.last_3f)
        .take(RECENT_SPLITS)
        .collect();
    if splits.is_empty() {
        return None;
    }
    let average = splits.mean();
    Some(cap_score(round_dp1((38.0 - average) / 5.0 * 100.0)))
}
