//! Walk-forward backtesting: chronological race iteration with scheduled
//! retraining on a strict date cutoff.
//!
//! The engine is a finite, ordered, single-pass stream, which is standard
//! `Iterator` territory. Races are yielded one at a time in (date, race
//! number) order;
//! a race whose data cannot be resolved is skipped and visible only by its
//! absence. Training data for a race dated `D` is drawn from races dated
//! strictly before `D`, so nothing the model sees leaks from the future.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::bail;
use chrono::{Datelike, NaiveDate};
use strum_macros::{Display, EnumIter, EnumString};
use tracing::{debug, warn};

use crate::calc::{CalcInput, FactorCalculator};
use crate::data::DataSource;
use crate::domain::{Race, RaceBacktestResult, ResultedRace, ScoredRunner};
use crate::features::{build_row, FeatureRow, RawEntry};
use crate::model::{Trainer, TrainerProfile};
use crate::predict::{PredictionConfig, PredictionService};
use crate::stats::past_stats;

/// How often the walk-forward loop refits the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum RetrainInterval {
    Daily,
    Weekly,
    Monthly,
}

impl RetrainInterval {
    /// Whether a race on `current` requires a refit given the last trained
    /// date. The first race always trains.
    pub fn is_due(&self, last_trained: Option<NaiveDate>, current: NaiveDate) -> bool {
        let Some(last) = last_trained else {
            return true;
        };
        match self {
            RetrainInterval::Daily => current > last,
            RetrainInterval::Weekly => {
                let (current_week, last_week) = (current.iso_week(), last.iso_week());
                (current_week.year(), current_week.week())
                    != (last_week.year(), last_week.week())
            }
            RetrainInterval::Monthly => {
                (current.year(), current.month()) != (last.year(), last.month())
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub retrain_interval: RetrainInterval,
    pub prediction: PredictionConfig,
    /// Profile used at each refit; lightweight keeps walk-forward runs inside
    /// their time budget.
    pub trainer_profile: TrainerProfile,
}

impl BacktestConfig {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            retrain_interval: RetrainInterval::Weekly,
            prediction: PredictionConfig::default(),
            trainer_profile: TrainerProfile::Lightweight,
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.start_date > self.end_date {
            bail!(
                "start date {} is after end date {}",
                self.start_date,
                self.end_date
            );
        }
        self.prediction.validate()?;
        Ok(())
    }
}

/// Cooperative cancellation flag, honoured at race boundaries. Results already
/// yielded remain valid.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// The walk-forward engine. Iterate it to stream [`RaceBacktestResult`]s.
pub struct BacktestEngine<D: DataSource> {
    source: D,
    config: BacktestConfig,
    service: PredictionService,
    trainer: Trainer,
    pending: Option<VecDeque<Race>>,
    last_trained: Option<NaiveDate>,
    retrain_count: usize,
    cancel: CancelToken,
}

impl<D: DataSource> BacktestEngine<D> {
    pub fn new(source: D, config: BacktestConfig) -> Result<Self, anyhow::Error> {
        config.validate()?;
        let service = PredictionService::new(config.prediction.clone())?;
        let trainer = Trainer::new(config.trainer_profile);
        Ok(Self {
            source,
            config,
            service,
            trainer,
            pending: None,
            last_trained: None,
            retrain_count: 0,
            cancel: CancelToken::default(),
        })
    }

    /// A token that stops the stream at the next race boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Number of refits performed so far.
    pub fn retrain_count(&self) -> usize {
        self.retrain_count
    }

    fn load_pending(&mut self) -> bool {
        if self.pending.is_some() {
            return true;
        }
        match self.source.races_between(
            self.config.start_date,
            self.config.end_date,
            None,
        ) {
            Ok(mut races) => {
                races.sort_by(|a, b| {
                    (a.date, a.race_number).cmp(&(b.date, b.race_number))
                });
                debug!("backtesting {} races", races.len());
                self.pending = Some(races.into());
                true
            }
            Err(error) => {
                warn!("failed to enumerate races: {error}");
                false
            }
        }
    }

    fn retrain(&mut self, cutoff: NaiveDate) {
        self.retrain_count += 1;
        let started = Instant::now();
        match build_training_data(&self.source, &self.config.prediction, cutoff) {
            Ok((rows, labels)) => match self.trainer.fit(&rows, &labels) {
                Ok(model) => {
                    debug!(
                        "retrained on {} rows before {cutoff} in {:.3}s",
                        rows.len(),
                        started.elapsed().as_millis() as f64 / 1_000.
                    );
                    self.service.set_model(Some(Arc::new(model)));
                }
                Err(error) => {
                    warn!("training declined at {cutoff}: {error}");
                    self.service.set_model(None);
                }
            },
            Err(error) => {
                warn!("could not build training data at {cutoff}: {error}");
                self.service.set_model(None);
            }
        }
    }

    fn resolve(&mut self, race: &Race) -> Result<RaceBacktestResult, anyhow::Error> {
        let resulted: ResultedRace = self.source.resulted_race(&race.id)?;
        let card = resulted.to_card();
        let predictions = self.service.predict(&self.source, &card)?;
        let predictions = predictions
            .into_iter()
            .map(|prediction| {
                let actual_rank = resulted
                    .runners
                    .iter()
                    .find(|runner| runner.entry.horse_id == prediction.horse_id)
                    .map(|runner| runner.finish_position)
                    .unwrap_or(0);
                ScoredRunner {
                    prediction,
                    actual_rank,
                }
            })
            .collect();
        Ok(RaceBacktestResult {
            race_id: resulted.race.id,
            race_date: resulted.race.date,
            race_name: resulted.race.name,
            venue: resulted.race.venue,
            predictions,
        })
    }
}

impl<D: DataSource> Iterator for BacktestEngine<D> {
    type Item = RaceBacktestResult;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.load_pending() {
            return None;
        }
        loop {
            if self.cancel.is_cancelled() {
                debug!("backtest cancelled");
                return None;
            }
            let race = self.pending.as_mut()?.pop_front()?;

            if self
                .config
                .retrain_interval
                .is_due(self.last_trained, race.date)
            {
                self.retrain(race.date);
                self.last_trained = Some(race.date);
            }

            match self.resolve(&race) {
                Ok(result) => return Some(result),
                Err(error) => {
                    warn!("skipping race {}: {error}", race.id);
                    continue;
                }
            }
        }
    }
}

/// Builds the training matrix from every race dated strictly before `cutoff`:
/// one row per non-scratched runner, labelled 1 for a top-3 finish.
pub fn build_training_data<D: DataSource>(
    source: &D,
    prediction: &PredictionConfig,
    cutoff: NaiveDate,
) -> Result<(Vec<FeatureRow>, Vec<u8>), anyhow::Error> {
    let Some(last_day) = cutoff.pred_opt() else {
        return Ok((Vec::new(), Vec::new()));
    };
    let races = source.races_between(NaiveDate::MIN, last_day, None)?;

    let mut calculator =
        FactorCalculator::default().with_style_stats(prediction.style_stats);
    let mut rows = Vec::new();
    let mut labels = Vec::new();

    for race in races {
        let resulted = source.resulted_race(&race.id)?;
        let field_size = resulted.runners.len() as u32;
        for runner in &resulted.runners {
            if runner.finish_position == 0 {
                continue;
            }
            let past = source.past_results(
                &runner.entry.horse_id,
                race.date,
                prediction.past_limit,
            )?;
            let horse = source.horse(&runner.entry.horse_id)?;
            let past_race_ids: Vec<String> =
                past.iter().map(|row| row.race_id.clone()).collect();

            let mut input = CalcInput::new(&runner.entry.horse_id, &past, &past_race_ids);
            input.horse = horse.as_ref();
            input.surface = Some(race.surface);
            input.distance = Some(race.distance);
            input.track_condition = race.track_condition;
            input.venue = Some(&race.venue);
            input.odds = runner.entry.odds;
            input.popularity = runner.entry.popularity;
            input.presorted = true;
            let factor_scores = calculator.calculate_all(&input);

            let raw = RawEntry {
                odds: runner.entry.odds,
                popularity: runner.entry.popularity,
                weight: runner.weight,
                weight_diff: runner.weight_diff,
                age: runner.entry.age,
                impost: runner.entry.impost,
                horse_number: Some(runner.entry.horse_number),
                field_size,
            };
            let stats = past_stats(&past, race.date, Some(&runner.entry.horse_id));
            rows.push(build_row(&factor_scores, &raw, &stats));
            labels.push(u8::from(runner.finish_position <= 3));
        }
    }
    Ok((rows, labels))
}
