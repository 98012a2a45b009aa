//! Recent-form factor: weighted relative finish over the last five starts,
//! boosted by the class of each race.

use crate::factor::FactorContext;
use crate::grade;
use crate::grade::Grade;
use crate::probs::{cap_score, round_dp1};

/// Emphasis on the most recent starts, most recent first.
const RECENCY_WEIGHTS: [f64; 5] = [0.35, 0.25, 0.20, 0.12, 0.08];

/// Field size assumed when a record omits the number of runners.
const DEFAULT_FIELD_SIZE: u32 = 10;

/// Class multipliers applied to the relative-finish base score.
fn grade_multiplier(grade: Grade) -> f64 {
    match grade {
        Grade::G1 => 1.5,
        Grade::G2 => 1.3,
        Grade::G3 => 1.2,
        Grade::Jpn1 => 1.4,
        Grade::Jpn2 => 1.2,
        Grade::Jpn3 => 1.1,
        Grade::Listed => 1.1,
        Grade::Open => 1.1,
        Grade::ThreeWin => 1.0,
        Grade::TwoWin => 0.95,
        Grade::OneWin => 0.9,
        Grade::Maiden => 0.8,
        Grade::Debut => 0.7,
        _ => 1.0,
    }
}

fn relative_score(finish_position: u32, total_runners: u32, race_name: Option<&str>) -> f64 {
    let runners = if total_runners == 0 { DEFAULT_FIELD_SIZE } else { total_runners };
    let base = (runners as f64 - finish_position as f64 + 1.0) / runners as f64 * 100.0;
    match race_name {
        Some(name) => {
            let multiplier = grade_multiplier(grade::extract(name));
            f64::min(base * multiplier, 100.0)
        }
        None => base,
    }
}

pub fn score(ctx: &FactorContext) -> Option<f64> {
    let mut starts: Vec<_> = ctx
        .past
        .iter()
        .filter(|past| past.horse_id == ctx.horse_id && past.finish_position >= 1)
        .collect();
    if starts.is_empty() {
        return None;
    }
    if !ctx.presorted {
        // None dates sort oldest so that undated records fall off the tail.
        starts.sort_by(|a, b| b.race_date.cmp(&a.race_date));
    }

    let mut total_score = 0.0;
    let mut total_weight = 0.0;
    for (index, start) in starts.iter().take(RECENCY_WEIGHTS.len()).enumerate() {
        let base = relative_score(
            start.finish_position,
            start.total_runners,
            start.race_name.as_deref(),
        );
        let weight = RECENCY_WEIGHTS[index];
        total_score += base * weight;
        total_weight += weight;
    }
    if total_weight == 0.0 {
        return None;
    }
    Some(round_dp1(cap_score(total_score / total_weight)))
}
