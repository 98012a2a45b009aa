//! Show (fukusho) simulation: back the top-N predicted horses to place.

use std::sync::Arc;

use serde::Serialize;

use crate::data::DataSource;
use crate::model::Predictor;
use crate::predict::{PredictionConfig, PredictionService};
use crate::simulate::{run_period, scored_picks, Summary, UNIT_STAKE};

/// One race of show betting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowRaceResult {
    pub race_id: String,
    pub race_name: String,
    pub venue: String,
    pub race_date: String,
    /// Predicted horse numbers, rank ascending.
    pub picks: Vec<u8>,
    /// Horse numbers the show pool paid on.
    pub placed: Vec<u8>,
    /// Picks that placed.
    pub hits: Vec<u8>,
    /// Posted payout per hit, aligned with `hits`.
    pub payouts: Vec<u32>,
    pub investment: u64,
    pub payout_total: u64,
}

/// Buys the top-N predicted horses at one unit each; a ticket pays when its
/// horse finishes in the official top three.
pub struct ShowSimulator<'a, D: DataSource> {
    source: &'a D,
    service: PredictionService,
}

impl<'a, D: DataSource> ShowSimulator<'a, D> {
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
    ) -> Result<ShowRaceResult, anyhow::Error> {
        let (resulted, picks) = scored_picks(self.source, &mut self.service, race_id, top_n)?;
        let payouts = self.source.payouts(race_id)?;

        let placed: Vec<u8> = payouts.show.iter().map(|p| p.horse_number).collect();
        let mut hits = Vec::new();
        let mut hit_payouts = Vec::new();
        for &pick in &picks {
            if let Some(posted) = payouts
                .show
                .iter()
                .find(|posted| posted.horse_number == pick)
            {
                hits.push(pick);
                hit_payouts.push(posted.payout);
            }
        }

        let investment = UNIT_STAKE * picks.len() as u64;
        let payout_total = hit_payouts.iter().map(|&p| p as u64).sum();
        Ok(ShowRaceResult {
            race_id: resulted.race.id,
            race_name: resulted.race.name,
            venue: resulted.race.venue,
            race_date: resulted.race.date.format("%Y-%m-%d").to_string(),
            picks,
            placed,
            hits,
            payouts: hit_payouts,
            investment,
            payout_total,
        })
    }

    pub fn simulate_period(
        &mut self,
        from: &str,
        to: &str,
        venues: Option<&[String]>,
        top_n: usize,
    ) -> Result<Summary<ShowRaceResult>, anyhow::Error> {
        let source = self.source;
        let results =
            run_period(source, from, to, venues, |race_id| self.simulate_race(race_id, top_n))?;

        let total_bets: usize = results.iter().map(|r| r.picks.len()).sum();
        let total_hits: usize = results.iter().map(|r| r.hits.len()).sum();
        let total_investment: u64 = results.iter().map(|r| r.investment).sum();
        let total_payout: u64 = results.iter().map(|r| r.payout_total).sum();
        Ok(Summary::build(
            from,
            to,
            results,
            total_bets,
            total_hits,
            total_bets,
            total_investment,
            total_payout,
        ))
    }
}
