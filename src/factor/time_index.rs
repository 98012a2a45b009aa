//! Time-index factor: the subject's average race time against the peer average
//! over comparable races, one second buying ten points either way.

use crate::factor::FactorContext;
use crate::probs::{cap_score, round_dp1, SliceExt};

/// Distance tolerance for a race to count as comparable.
const DISTANCE_TOLERANCE: u32 = 200;
/// Minimum number of comparable races for the index to be meaningful.
const MIN_PEER_RACES: usize = 3;

/// Parses a race time of the form `"m:ss.s"` or `"ss.s"` into seconds.
/// Malformed input yields `None`.
pub fn parse_time(time: &str) -> Option<f64> {
    if time.is_empty() {
        return None;
    }
    match time.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes: u32 = minutes.parse().ok()?;
            let seconds: f64 = seconds.parse().ok()?;
            Some(minutes as f64 * 60.0 + seconds)
        }
        None => time.parse().ok(),
    }
}

pub fn score(ctx: &FactorContext) -> Option<f64> {
    let target_surface = ctx.surface?;
    let target_distance = ctx.distance?;

    let peers: Vec<_> = ctx
        .past
        .iter()
        .filter(|past| {
            past.surface == Some(target_surface)
                && past
                    .distance
                    .map(|distance| distance.abs_diff(target_distance) <= DISTANCE_TOLERANCE)
                    .unwrap_or(false)
                && past.time.as_deref().map(|time| !time.is_empty()).unwrap_or(false)
                && (ctx.track_condition.is_none()
                    || past.track_condition == ctx.track_condition)
        })
        .collect();
    if peers.len() < MIN_PEER_RACES {
        return None;
    }

    let mut peer_times = Vec::with_capacity(peers.len());
    let mut subject_times = Vec::new();
    for peer in &peers {
        let Some(seconds) = peer.time.as_deref().and_then(parse_time) else {
            continue;
        };
        if seconds <= 0.0 {
            continue;
        }
        peer_times.push(seconds);
        if peer.horse_id == ctx.horse_id {
            subject_times.push(seconds);
        }
    }
    if subject_times.is_empty() {
        return None;
    }

    let diff = peer_times.mean() - subject_times.mean();
    Some(cap_score(round_dp1(50.0 + diff * 10.0)))
}
