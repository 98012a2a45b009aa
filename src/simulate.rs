//! Bet simulators: replay predictions against recorded payouts, per race and
//! over a period, for the four supported bet types.
//!
//! All four share the same skeleton: rank the card with the prediction
//! pipeline, take the top picks, fetch the posted payouts and account the
//! outcome in 100-yen units. A race that fails to resolve (prediction or
//! payout fetch) is skipped: it contributes to neither hits nor investment
//! and never aborts the period run.

use serde::Serialize;
use tracing::warn;

use crate::data::DataSource;
use crate::domain::{parse_date, ResultedRace};
use crate::predict::PredictionService;

pub mod quinella;
pub mod show;
pub mod trio;
pub mod win;

pub use quinella::QuinellaSimulator;
pub use show::ShowSimulator;
pub use trio::TrioSimulator;
pub use win::WinSimulator;

/// Stake per ticket, in yen.
pub const UNIT_STAKE: u64 = 100;
/// Default number of horses purchased by the top-N strategies.
pub const DEFAULT_TOP_N: usize = 3;

/// Period accounting shared by every bet type. `race_results` carries the
/// per-race records of the specific simulator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary<R> {
    pub period_from: String,
    pub period_to: String,
    pub total_races: usize,
    pub total_bets: usize,
    pub total_hits: usize,
    pub hit_rate: f64,
    pub total_investment: u64,
    pub total_payout: u64,
    pub return_rate: f64,
    pub race_results: Vec<R>,
}

impl<R> Summary<R> {
    pub(crate) fn build(
        period_from: &str,
        period_to: &str,
        race_results: Vec<R>,
        total_bets: usize,
        total_hits: usize,
        hit_basis: usize,
        total_investment: u64,
        total_payout: u64,
    ) -> Self {
        let hit_rate = if hit_basis > 0 {
            total_hits as f64 / hit_basis as f64
        } else {
            0.0
        };
        let return_rate = if total_investment > 0 {
            total_payout as f64 / total_investment as f64
        } else {
            0.0
        };
        Self {
            period_from: period_from.to_string(),
            period_to: period_to.to_string(),
            total_races: race_results.len(),
            total_bets,
            total_hits,
            hit_rate,
            total_investment,
            total_payout,
            return_rate,
            race_results,
        }
    }
}

/// Ranks a race and returns it with the top `n` predicted horse numbers.
/// Fails when no prediction is possible (debut race), which the period loop
/// turns into a skip.
pub(crate) fn scored_picks<D: DataSource>(
    source: &D,
    service: &mut PredictionService,
    race_id: &str,
    n: usize,
) -> Result<(ResultedRace, Vec<u8>), anyhow::Error> {
    let resulted = source.resulted_race(race_id)?;
    let card = resulted.to_card();
    let predictions = service.predict(source, &card)?;
    if predictions.is_empty() {
        anyhow::bail!("no predictions for race {race_id}");
    }
    let picks = predictions
        .iter()
        .take(n)
        .map(|prediction| prediction.horse_number)
        .collect();
    Ok((resulted, picks))
}

/// Runs `simulate` over every race in the window, skipping failures.
pub(crate) fn run_period<D: DataSource, R>(
    source: &D,
    from: &str,
    to: &str,
    venues: Option<&[String]>,
    mut simulate: impl FnMut(&str) -> Result<R, anyhow::Error>,
) -> Result<Vec<R>, anyhow::Error> {
    let from_date = parse_date(from)?;
    let to_date = parse_date(to)?;
    let races = source.races_between(from_date, to_date, venues)?;
    let mut results = Vec::with_capacity(races.len());
    for race in races {
        match simulate(&race.id) {
            Ok(result) => results.push(result),
            Err(error) => warn!("race {} simulation failed: {error}", race.id),
        }
    }
    Ok(results)
}

/// Normalises an unordered pair to ascending order.
pub(crate) fn ordered_pair(a: u8, b: u8) -> [u8; 2] {
    if a <= b {
        [a, b]
    } else {
        [b, a]
    }
}

/// Normalises an unordered triple to ascending order.
pub(crate) fn ordered_trio(mut trio: [u8; 3]) -> [u8; 3] {
    trio.sort_unstable();
    trio
}

#[cfg(test)]
pub(crate) mod fixtures;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_accounting() {
        let summary: Summary<u8> =
            Summary::build("2024-01-06", "2024-01-21", vec![1, 2, 3], 9, 4, 9, 900, 1260);
        assert_eq!("2024-01-06", summary.period_from);
        assert_eq!("2024-01-21", summary.period_to);
        assert_eq!(3, summary.total_races);
        assert_eq!(9, summary.total_bets);
        assert_eq!(4, summary.total_hits);
        assert!((summary.hit_rate - 4.0 / 9.0).abs() < 1e-9);
        assert!((summary.return_rate - 1.4).abs() < 1e-9);
    }

    #[test]
    fn empty_period_divides_safely() {
        let summary: Summary<u8> = Summary::build("a", "b", vec![], 0, 0, 0, 0, 0);
        assert_eq!(0.0, summary.hit_rate);
        assert_eq!(0.0, summary.return_rate);
    }

    #[test]
    fn pair_and_trio_normalisation() {
        assert_eq!([3, 5], ordered_pair(5, 3));
        assert_eq!([3, 5], ordered_pair(3, 5));
        assert_eq!([2, 6, 9], ordered_trio([6, 2, 9]));
    }
}
