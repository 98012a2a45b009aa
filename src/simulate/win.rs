//! Win (tansho) simulation: back the top-N predicted horses to win outright.

use std::sync::Arc;

use serde::Serialize;

use crate::data::DataSource;
use crate::model::Predictor;
use crate::predict::{PredictionConfig, PredictionService};
use crate::simulate::{run_period, scored_picks, Summary, UNIT_STAKE};

/// One race of win betting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WinRaceResult {
    pub race_id: String,
    pub race_name: String,
    pub venue: String,
    pub race_date: String,
    /// Predicted horse numbers, rank ascending.
    pub picks: Vec<u8>,
    /// The official winner, when a win payout was posted.
    pub winning_horse: Option<u8>,
    pub hit: bool,
    pub payout: u64,
    pub investment: u64,
}

/// Buys the top-N predicted horses at one unit each; only the ticket on the
/// official winner pays.
pub struct WinSimulator<'a, D: DataSource> {
    source: &'a D,
    service: PredictionService,
}

impl<'a, D: DataSource> WinSimulator<'a, D> {
    pub fn new(source: &'a D, config: PredictionConfig) -> Result<Self, anyhow::Error> {
        Ok(Self {
            source,
            service: PredictionService::new(config)?,
        })
    }

    pub fn with_model(mut self, model: Arc<dyn Predictor + Send + Sync>) -> Self {
        self.service.set_model(Some(model));
        self
    }

    pub fn simulate_race(
        &mut self,
        race_id: &str,
        top_n: usize,
    ) -> Result<WinRaceResult, anyhow::Error> {
        let (resulted, picks) = scored_picks(self.source, &mut self.service, race_id, top_n)?;
        let payouts = self.source.payouts(race_id)?;

        let winning_horse = payouts.win.map(|posted| posted.horse_number);
        let hit = winning_horse
            .map(|winner| picks.contains(&winner))
            .unwrap_or(false);
        let payout = if hit {
            payouts.win.map(|posted| posted.payout as u64).unwrap_or(0)
        } else {
            0
        };

        Ok(WinRaceResult {
            race_id: resulted.race.id,
            race_name: resulted.race.name,
            venue: resulted.race.venue,
            race_date: resulted.race.date.format("%Y-%m-%d").to_string(),
            investment: UNIT_STAKE * picks.len() as u64,
            picks,
            winning_horse,
            hit,
            payout,
        })
    }

    pub fn simulate_period(
        &mut self,
        from: &str,
        to: &str,
        venues: Option<&[String]>,
        top_n: usize,
    ) -> Result<Summary<WinRaceResult>, anyhow::Error> {
        let source = self.source;
        let results =
            run_period(source, from, to, venues, |race_id| self.simulate_race(race_id, top_n))?;

        let total_bets: usize = results.iter().map(|r| r.picks.len()).sum();
        let total_hits = results.iter().filter(|r| r.hit).count();
        let total_investment: u64 = results.iter().map(|r| r.investment).sum();
        let total_payout: u64 = results.iter().map(|r| r.payout).sum();
        let total_races = results.len();
        Ok(Summary::build(
            from,
            to,
            results,
            total_bets,
            total_hits,
            total_races,
            total_investment,
            total_payout,
        ))
    }
}
