//! Trio (sanrenpuku) simulation: a single ticket on the unordered predicted
//! top three.

use std::sync::Arc;

use serde::Serialize;

use crate::data::DataSource;
use crate::model::Predictor;
use crate::predict::{PredictionConfig, PredictionService};
use crate::simulate::{ordered_trio, run_period, scored_picks, Summary, UNIT_STAKE};

/// One race of trio betting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrioRaceResult {
    pub race_id: String,
    pub race_name: String,
    pub venue: String,
    pub race_date: String,
    /// The purchased ticket, ascending.
    pub ticket: [u8; 3],
    /// The official top-3 set, when a trio payout was posted.
    pub actual_trio: Option<[u8; 3]>,
    pub hit: bool,
    pub payout: u64,
    pub investment: u64,
}

/// Buys the predicted top three as one unordered ticket; it pays only when
/// the set equals the official top three.
pub struct TrioSimulator<'a, D: DataSource> {
    source: &'a D,
    service: PredictionService,
}

impl<'a, D: DataSource> TrioSimulator<'a, D> {
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

    pub fn simulate_race(&mut self, race_id: &str) -> Result<TrioRaceResult, anyhow::Error> {
        let (resulted, picks) = scored_picks(self.source, &mut self.service, race_id, 3)?;
        if picks.len() < 3 {
            anyhow::bail!("field too small for a trio ticket in race {race_id}");
        }
        let payouts = self.source.payouts(race_id)?;

        let ticket = ordered_trio([picks[0], picks[1], picks[2]]);
        let actual_trio = payouts.trio.map(|posted| ordered_trio(posted.trio));
        let hit = actual_trio.map(|actual| actual == ticket).unwrap_or(false);
        let payout = if hit {
            payouts.trio.map(|posted| posted.payout as u64).unwrap_or(0)
        } else {
            0
        };

        Ok(TrioRaceResult {
            race_id: resulted.race.id,
            race_name: resulted.race.name,
            venue: resulted.race.venue,
            race_date: resulted.race.date.format("%Y-%m-%d").to_string(),
            ticket,
            actual_trio,
            hit,
            payout,
            investment: UNIT_STAKE,
        })
    }

    pub fn simulate_period(
        &mut self,
        from: &str,
        to: &str,
        venues: Option<&[String]>,
    ) -> Result<Summary<TrioRaceResult>, anyhow::Error> {
        let source = self.source;
        let results = run_period(source, from, to, venues, |race_id| self.simulate_race(race_id))?;

        let total_hits = results.iter().filter(|r| r.hit).count();
        let total_investment: u64 = results.iter().map(|r| r.investment).sum();
        let total_payout: u64 = results.iter().map(|r| r.payout).sum();
        let total_races = results.len();
        Ok(Summary::build(
            from,
            to,
            results,
            total_races,
            total_hits,
            total_races,
            total_investment,
            total_payout,
        ))
    }
}
