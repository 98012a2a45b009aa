//! Quinella (umaren) simulation: the three unordered pairs drawn from the
//! top-3 predicted horses.

use std::sync::Arc;

use serde::Serialize;

use crate::data::DataSource;
use crate::model::Predictor;
use crate::predict::{PredictionConfig, PredictionService};
use crate::simulate::{ordered_pair, run_period, scored_picks, Summary, UNIT_STAKE};

/// One race of quinella betting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuinellaRaceResult {
    pub race_id: String,
    pub race_name: String,
    pub venue: String,
    pub race_date: String,
    /// The three purchased pairs, each in ascending order.
    pub combinations: Vec<[u8; 2]>,
    /// The official top-2 pair, when a quinella payout was posted.
    pub actual_pair: Option<[u8; 2]>,
    pub hit: bool,
    pub payout: u64,
    pub investment: u64,
}

/// Buys the pairs {1,2}, {1,3} and {2,3} of the predicted top three; a pair
/// pays when it matches the unordered official top two.
pub struct QuinellaSimulator<'a, D: DataSource> {
    source: &'a D,
    service: PredictionService,
}

impl<'a, D: DataSource> QuinellaSimulator<'a, D> {
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

    pub fn simulate_race(&mut self, race_id: &str) -> Result<QuinellaRaceResult, anyhow::Error> {
        let (resulted, picks) = scored_picks(self.source, &mut self.service, race_id, 3)?;
        if picks.len() < 3 {
            anyhow::bail!("field too small for a quinella box in race {race_id}");
        }
        let payouts = self.source.payouts(race_id)?;

        let combinations = vec![
            ordered_pair(picks[0], picks[1]),
            ordered_pair(picks[0], picks[2]),
            ordered_pair(picks[1], picks[2]),
        ];
        let actual_pair = payouts
            .quinella
            .map(|posted| ordered_pair(posted.pair[0], posted.pair[1]));
        let hit = actual_pair
            .map(|actual| combinations.contains(&actual))
            .unwrap_or(false);
        let payout = if hit {
            payouts.quinella.map(|posted| posted.payout as u64).unwrap_or(0)
        } else {
            0
        };

        Ok(QuinellaRaceResult {
            race_id: resulted.race.id,
            race_name: resulted.race.name,
            venue: resulted.race.venue,
            race_date: resulted.race.date.format("%Y-%m-%d").to_string(),
            investment: UNIT_STAKE * combinations.len() as u64,
            combinations,
            actual_pair,
            hit,
            payout,
        })
    }

    pub fn simulate_period(
        &mut self,
        from: &str,
        to: &str,
        venues: Option<&[String]>,
    ) -> Result<Summary<QuinellaRaceResult>, anyhow::Error> {
        let source = self.source;
        let results = run_period(source, from, to, venues, |race_id| self.simulate_race(race_id))?;

        let total_bets: usize = results.iter().map(|r| r.combinations.len()).sum();
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
