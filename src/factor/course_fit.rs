//! Course-fit factor: top-3 rate under matching surface and distance band,
//! smoothed toward a neutral prior when the sample is thin.

use crate::domain::DistanceBand;
use crate::factor::FactorContext;
use crate::probs::round_dp1;

/// Neutral prior assumed for an unraced condition.
const PRIOR_MEAN: f64 = 50.0;
/// Virtual sample count behind the prior.
const PRIOR_WEIGHT: f64 = 3.0;

pub fn score(ctx: &FactorContext) -> Option<f64> {
    let target_surface = ctx.surface?;
    let target_band = DistanceBand::of(ctx.distance?);

    let matching: Vec<_> = ctx
        .past
        .iter()
        .filter(|past| {
            past.horse_id == ctx.horse_id
                && past.finish_position >= 1
                && past.surface == Some(target_surface)
                && past.distance.map(DistanceBand::of) == Some(target_band)
        })
        .collect();
    if matching.is_empty() {
        return None;
    }

    let n = matching.len() as f64;
    let top3 = matching.iter().filter(|past| past.finish_position <= 3).count() as f64;
    let raw = top3 / n * 100.0;
    let smoothed = (raw * n + PRIOR_MEAN * PRIOR_WEIGHT) / (n + PRIOR_WEIGHT);
    Some(round_dp1(smoothed))
}

#[cfg(test)]
mod tests {
    use crate::domain::{PastRace, Surface};

    use super::*;

    fn run(finish: u32, surface: Surface, distance: u32) -> PastRace {
        PastRace {
            race_id: "r".into(),
            horse_id: "h1".into(),
            finish_position: finish,
            total_runners: 10,
            surface: Some(surface),
            distance: Some(distance),
            ..Default::default()
        }
    }

    fn ctx_on<'a>(past: &'a [PastRace], surface: Surface, distance: u32) -> FactorContext<'a> {
        let mut ctx = FactorContext::new("h1", past);
        ctx.surface = Some(surface);
        ctx.distance = Some(distance);
        ctx
    }

    #[test]
    fn smoothed_top3_rate() {
        // 2 of 3 in the money on matching conditions: raw 66.67, smoothed
        // (66.67 * 3 + 50 * 3) / 6 = 58.3.
        let past = vec![
            run(1, Surface::Turf, 1600),
            run(3, Surface::Turf, 1800),
            run(7, Surface::Turf, 1700),
            run(1, Surface::Dirt, 1600),
            run(1, Surface::Turf, 2400),
        ];
        let ctx = ctx_on(&past, Surface::Turf, 1600);
        assert_eq!(Some(58.3), score(&ctx));
    }

    #[test]
    fn one_matching_race_is_sufficient() {
        let past = vec![run(1, Surface::Turf, 1200)];
        let ctx = ctx_on(&past, Surface::Turf, 1400);
        // raw 100, smoothed (100 + 150) / 4 = 62.5
        assert_eq!(Some(62.5), score(&ctx));
    }

    #[test]
    fn no_matching_condition_is_insufficient() {
        let past = vec![run(1, Surface::Dirt, 1600)];
        let ctx = ctx_on(&past, Surface::Turf, 1600);
        assert_eq!(None, score(&ctx));
    }

    #[test]
    fn unknown_target_is_insufficient() {
        let past = vec![run(1, Surface::Turf, 1600)];
        let mut ctx = FactorContext::new("h1", &past);
        ctx.surface = Some(Surface::Turf);
        assert_eq!(None, score(&ctx));
        ctx.surface = None;
        ctx.distance = Some(1600);
        assert_eq!(None, score(&ctx));
    }

    #[test]
    fn band_boundaries_respected() {
        // 1400 is sprint and 1401 is mile; a 1400 m run must not match a
        // 1401 m target.
        let past = vec![run(1, Surface::Turf, 1400)];
        let ctx = ctx_on(&past, Surface::Turf, 1401);
        assert_eq!(None, score(&ctx));
    }
}
