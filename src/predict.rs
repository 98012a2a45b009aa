//! The prediction pipeline: factor scores, total score, model probability and
//! a combined ranking for every entry in a race.

use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::bail;
use strum_macros::{Display, EnumString};
use tracing::debug;

use crate::calc::{CalcInput, FactorCalculator};
use crate::cache::CacheStats;
use crate::data::{HistorySource, DEFAULT_PAST_LIMIT};
use crate::domain::{PastRace, PredictionResult, RaceCard, RaceEntry};
use crate::factor::{FactorScores, StyleStats};
use crate::features::{build_row, FeatureRow, RawEntry};
use crate::grade;
use crate::grade::Grade;
use crate::model::Predictor;
use crate::probs::round_dp1;
use crate::scoring::FactorWeights;
use crate::stats::past_stats;

/// Where market figures (odds, popularity) are read from. Historical archives
/// carry them on the latest past-race row; a live card carries them on the
/// entry itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OddsSource {
    Live,
    LatestPastRace,
}

/// Tunables of the pipeline. Invalid configuration fails fast at service
/// construction, before any race is processed.
#[derive(Debug, Clone)]
pub struct PredictionConfig {
    pub weights: FactorWeights,
    /// Blend between the normalised model probability and the factor total.
    pub alpha: f64,
    pub odds_source: OddsSource,
    pub past_limit: usize,
    pub style_stats: StyleStats,
}

impl PredictionConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.weights.validate()?;
        if !(0.0..=1.0).contains(&self.alpha) {
            bail!("blending constant alpha must lie in [0, 1]");
        }
        if self.past_limit == 0 {
            bail!("past result limit cannot be zero");
        }
        Ok(())
    }
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            weights: FactorWeights::default(),
            alpha: 0.6,
            odds_source: OddsSource::LatestPastRace,
            past_limit: DEFAULT_PAST_LIMIT,
            style_stats: StyleStats::default(),
        }
    }
}

/// Scores race cards. Owns the factor calculator (and through it the factor
/// cache); the active model is shared behind an `Arc` so a retrain can swap it
/// without touching in-flight predictions.
pub struct PredictionService {
    config: PredictionConfig,
    calculator: FactorCalculator,
    model: Option<Arc<dyn Predictor + Send + Sync>>,
}

impl PredictionService {
    pub fn new(config: PredictionConfig) -> Result<Self, anyhow::Error> {
        config.validate()?;
        let calculator = FactorCalculator::default().with_style_stats(config.style_stats);
        Ok(Self {
            config,
            calculator,
            model: None,
        })
    }

    pub fn with_model(mut self, model: Arc<dyn Predictor + Send + Sync>) -> Self {
        self.model = Some(model);
        self
    }

    /// Publishes a new model; `None` reverts to factor-only scoring.
    pub fn set_model(&mut self, model: Option<Arc<dyn Predictor + Send + Sync>>) {
        self.model = model;
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn cache_stats(&self) -> &CacheStats {
        self.calculator.cache_stats()
    }

    /// Scores every entry of a card and returns them in rank order. A debut
    /// race yields an empty list: there is no history to score.
    pub fn predict<H: HistorySource>(
        &mut self,
        history: &H,
        card: &RaceCard,
    ) -> Result<Vec<PredictionResult>, anyhow::Error> {
        if grade::extract(&card.race.name) == Grade::Debut {
            debug!("skipping debut race {}", card.race.id);
            return Ok(Vec::new());
        }

        let field_size = card.entries.len() as u32;
        let mut scored = Vec::with_capacity(card.entries.len());
        let mut rows: Vec<FeatureRow> = Vec::new();
        let mut row_owner: Vec<usize> = Vec::new();

        for (index, entry) in card.entries.iter().enumerate() {
            let past =
                history.past_results(&entry.horse_id, card.race.date, self.config.past_limit)?;
            if past.is_empty() {
                scored.push(Scored {
                    entry: entry.clone(),
                    factor_scores: FactorScores::default(),
                    total_score: None,
                    ml_probability: 0.0,
                    combined_score: None,
                });
                continue;
            }

            let horse = history.horse(&entry.horse_id)?;
            let past_race_ids: Vec<String> =
                past.iter().map(|row| row.race_id.clone()).collect();
            let (odds, popularity) = self.market_figures(entry, &past);

            let mut input = CalcInput::new(&entry.horse_id, &past, &past_race_ids);
            input.horse = horse.as_ref();
            input.surface = Some(card.race.surface);
            input.distance = Some(card.race.distance);
            input.track_condition = card.race.track_condition;
            input.venue = Some(&card.race.venue);
            input.odds = odds;
            input.popularity = popularity;
            input.presorted = true;

            let factor_scores = self.calculator.calculate_all(&input);
            let total_score = self.config.weights.combine(&factor_scores);

            if self.model.is_some() {
                rows.push(self.feature_row(entry, &past, field_size, &factor_scores, card));
                row_owner.push(index);
            }

            scored.push(Scored {
                entry: entry.clone(),
                factor_scores,
                total_score,
                ml_probability: 0.0,
                combined_score: None,
            });
        }

        if let (Some(model), false) = (&self.model, rows.is_empty()) {
            let probabilities = model.predict_proba(&rows);
            for (owner, probability) in row_owner.into_iter().zip(probabilities) {
                scored[owner].ml_probability = probability.clamp(0.0, 1.0);
            }
        }

        let max_probability = scored
            .iter()
            .map(|entry| entry.ml_probability)
            .fold(0.0, f64::max);
        for entry in &mut scored {
            entry.combined_score = combined_score(
                self.config.alpha,
                entry.ml_probability,
                max_probability,
                entry.total_score,
            );
        }

        scored.sort_by(rank_order);
        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(index, entry)| PredictionResult {
                horse_number: entry.entry.horse_number,
                horse_name: entry.entry.horse_name.clone(),
                horse_id: entry.entry.horse_id.clone(),
                ml_probability: entry.ml_probability,
                factor_scores: entry.factor_scores,
                total_score: entry.total_score,
                combined_score: entry.combined_score,
                rank: index + 1,
            })
            .collect())
    }

    fn market_figures(
        &self,
        entry: &RaceEntry,
        past: &[PastRace],
    ) -> (Option<f64>, Option<u32>) {
        match self.config.odds_source {
            OddsSource::Live => (entry.odds, entry.popularity),
            OddsSource::LatestPastRace => {
                let latest = past.first();
                (
                    latest.and_then(|row| row.odds),
                    latest.and_then(|row| row.popularity),
                )
            }
        }
    }

    fn feature_row(
        &self,
        entry: &RaceEntry,
        past: &[PastRace],
        field_size: u32,
        factor_scores: &FactorScores,
        card: &RaceCard,
    ) -> FeatureRow {
        let latest = past.first();
        let (odds, popularity) = self.market_figures(entry, past);
        let raw = RawEntry {
            odds,
            popularity,
            weight: latest.and_then(|row| row.weight),
            weight_diff: latest.and_then(|row| row.weight_diff),
            age: entry.age.or_else(|| latest.and_then(|row| row.age)),
            impost: entry.impost.or_else(|| latest.and_then(|row| row.impost)),
            horse_number: Some(entry.horse_number),
            field_size,
        };
        let stats = past_stats(past, card.race.date, Some(&entry.horse_id));
        build_row(factor_scores, &raw, &stats)
    }
}

struct Scored {
    entry: RaceEntry,
    factor_scores: FactorScores,
    total_score: Option<f64>,
    ml_probability: f64,
    combined_score: Option<f64>,
}

/// The combined score: `alpha` parts normalised model probability, the rest
/// factor total. Undefined without a factor total or without any positive
/// model probability in the race.
fn combined_score(
    alpha: f64,
    probability: f64,
    max_probability: f64,
    total_score: Option<f64>,
) -> Option<f64> {
    let total = total_score?;
    if max_probability <= 0.0 {
        return None;
    }
    let normalised = probability / max_probability * 100.0;
    Some(round_dp1(alpha * normalised + (1.0 - alpha) * total))
}

/// Rank ordering: combined score, then model probability, then factor total,
/// each descending with absent values last, and finally horse number.
fn rank_order(a: &Scored, b: &Scored) -> Ordering {
    cmp_opt_desc(a.combined_score, b.combined_score)
        .then_with(|| b.ml_probability.total_cmp(&a.ml_probability))
        .then_with(|| cmp_opt_desc(a.total_score, b.total_score))
        .then_with(|| a.entry.horse_number.cmp(&b.entry.horse_number))
}

fn cmp_opt_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests;
