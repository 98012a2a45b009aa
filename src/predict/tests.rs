use std::sync::Arc;

use super::*;
use crate::data::{MemoryDataSource, RaceArchive};
use crate::domain::{parse_date, Race, RaceCard, RaceEntry, RunnerResult, Surface};
use crate::factor::FactorKind;

fn runner(horse_id: &str, horse_number: u8, finish: u32, odds: f64, popularity: u32) -> RunnerResult {
    RunnerResult {
        entry: RaceEntry {
            horse_id: horse_id.into(),
            horse_name: format!("horse {horse_id}"),
            horse_number,
            bracket_number: horse_number,
            age: Some(4),
            impost: Some(56.0),
            odds: Some(odds),
            popularity: Some(popularity),
            ..Default::default()
        },
        finish_position: finish,
        time: Some("1:34.0".into()),
        last_3f: Some(34.5),
        passing_order: Some("3-3-2".into()),
        weight: Some(480.0),
        weight_diff: Some(0.0),
        ..Default::default()
    }
}

fn race(id: &str, name: &str, date: &str, race_number: u8) -> Race {
    Race {
        id: id.into(),
        name: name.into(),
        date: parse_date(date).unwrap(),
        venue: "東京".into(),
        race_number,
        surface: Surface::Turf,
        distance: 1600,
        track_condition: None,
    }
}

/// Three horses with graded histories: h1 strongest, h3 weakest.
fn seeded_source() -> MemoryDataSource {
    let mut archives = Vec::new();
    for (index, date) in ["2024-01-07", "2024-01-14", "2024-01-21"].iter().enumerate() {
        let id = format!("p{index}");
        archives.push(RaceArchive {
            race: race(&id, "3歳1勝クラス", date, 1),
            runners: vec![
                runner("h1", 1, 1, 2.0, 1),
                runner("h2", 2, 2, 6.0, 2),
                runner("h3", 3, 3, 30.0, 3),
            ],
            payouts: None,
            horses: vec![],
        });
    }
    MemoryDataSource::from_archives(archives)
}

fn card() -> RaceCard {
    RaceCard {
        race: race("target", "若葉S 3勝クラス", "2024-02-04", 11),
        entries: vec![
            RaceEntry {
                horse_id: "h3".into(),
                horse_name: "horse h3".into(),
                horse_number: 3,
                bracket_number: 3,
                age: Some(4),
                impost: Some(56.0),
                ..Default::default()
            },
            RaceEntry {
                horse_id: "h1".into(),
                horse_name: "horse h1".into(),
                horse_number: 1,
                bracket_number: 1,
                age: Some(4),
                impost: Some(56.0),
                ..Default::default()
            },
            RaceEntry {
                horse_id: "h2".into(),
                horse_name: "horse h2".into(),
                horse_number: 2,
                bracket_number: 2,
                age: Some(4),
                impost: Some(56.0),
                ..Default::default()
            },
        ],
    }
}

struct FixedPredictor {
    probabilities: Vec<f64>,
}
impl Predictor for FixedPredictor {
    fn predict_proba(&self, rows: &[FeatureRow]) -> Vec<f64> {
        self.probabilities[..rows.len()].to_vec()
    }
}

#[test]
fn ranks_are_a_dense_permutation() {
    let source = seeded_source();
    let mut service = PredictionService::new(PredictionConfig::default()).unwrap();
    let predictions = service.predict(&source, &card()).unwrap();
    assert_eq!(3, predictions.len());
    let mut ranks: Vec<usize> = predictions.iter().map(|p| p.rank).collect();
    ranks.sort_unstable();
    assert_eq!(vec![1, 2, 3], ranks);
}

#[test]
fn factor_only_ranking_follows_total_score() {
    let source = seeded_source();
    let mut service = PredictionService::new(PredictionConfig::default()).unwrap();
    let predictions = service.predict(&source, &card()).unwrap();
    // No model: combined scores are all absent and the factor total decides.
    for prediction in &predictions {
        assert_eq!(None, prediction.combined_score);
        assert_eq!(0.0, prediction.ml_probability);
    }
    assert_eq!(1, predictions[0].horse_number);
    assert_eq!(2, predictions[1].horse_number);
    assert_eq!(3, predictions[2].horse_number);
    assert!(predictions[0].total_score > predictions[1].total_score);
    assert!(predictions[1].total_score > predictions[2].total_score);
}

#[test]
fn debut_race_yields_no_predictions() {
    let source = seeded_source();
    let mut service = PredictionService::new(PredictionConfig::default()).unwrap();
    let mut debut = card();
    debut.race.name = "3歳新馬".into();
    assert!(service.predict(&source, &debut).unwrap().is_empty());
}

#[test]
fn unraced_entry_scores_all_none() {
    let source = seeded_source();
    let mut service = PredictionService::new(PredictionConfig::default()).unwrap();
    let mut sheet = card();
    sheet.entries.push(RaceEntry {
        horse_id: "first-timer".into(),
        horse_name: "first timer".into(),
        horse_number: 9,
        bracket_number: 8,
        ..Default::default()
    });
    let predictions = service.predict(&source, &sheet).unwrap();
    let newcomer = predictions.iter().find(|p| p.horse_number == 9).unwrap();
    assert_eq!(0.0, newcomer.ml_probability);
    assert_eq!(None, newcomer.total_score);
    assert_eq!(0, newcomer.factor_scores.present());
    // With nothing to score, the newcomer ranks last.
    assert_eq!(predictions.len(), newcomer.rank);
}

#[test]
fn model_probabilities_drive_the_combined_score() {
    let source = seeded_source();
    // Rows are built in entry order: h3, h1, h2.
    let model = FixedPredictor {
        probabilities: vec![0.2, 0.8, 0.4],
    };
    let mut service = PredictionService::new(PredictionConfig::default())
        .unwrap()
        .with_model(Arc::new(model));
    let predictions = service.predict(&source, &card()).unwrap();

    let top = &predictions[0];
    assert_eq!(1, top.horse_number);
    assert_eq!(0.8, top.ml_probability);
    // p/M = 1 for the top probability; combined = 0.6*100 + 0.4*total.
    let expected = round_dp1(60.0 + 0.4 * top.total_score.unwrap());
    crate::testing::assert_option_f64_near(Some(expected), top.combined_score, 1e-9);

    let second = &predictions[1];
    assert_eq!(2, second.horse_number);
    let expected = round_dp1(0.6 * (0.4 / 0.8 * 100.0) + 0.4 * second.total_score.unwrap());
    crate::testing::assert_option_f64_near(Some(expected), second.combined_score, 1e-9);
}

#[test]
fn prediction_is_idempotent() {
    let source = seeded_source();
    let mut service = PredictionService::new(PredictionConfig::default()).unwrap();
    let first = service.predict(&source, &card()).unwrap();
    let second = service.predict(&source, &card()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn identical_horses_tie_break_by_number() {
    // Two horses with byte-identical parallel histories produce equal totals.
    let mut archives = Vec::new();
    for (index, date) in ["2024-01-07", "2024-01-14"].iter().enumerate() {
        archives.push(RaceArchive {
            race: race(&format!("p{index}"), "3歳1勝クラス", date, 1),
            runners: vec![
                runner("a", 1, 2, 4.0, 2),
                runner("b", 2, 2, 4.0, 2),
            ],
            payouts: None,
            horses: vec![],
        });
    }
    let source = MemoryDataSource::from_archives(archives);
    let sheet = RaceCard {
        race: race("target", "若葉S 3勝クラス", "2024-02-04", 11),
        entries: vec![
            RaceEntry {
                horse_id: "b".into(),
                horse_name: "b".into(),
                horse_number: 7,
                bracket_number: 4,
                ..Default::default()
            },
            RaceEntry {
                horse_id: "a".into(),
                horse_name: "a".into(),
                horse_number: 4,
                bracket_number: 2,
                ..Default::default()
            },
        ],
    };
    let mut service = PredictionService::new(PredictionConfig::default()).unwrap();
    let predictions = service.predict(&source, &sheet).unwrap();
    assert_eq!(predictions[0].total_score, predictions[1].total_score);
    assert_eq!(4, predictions[0].horse_number);
    assert_eq!(7, predictions[1].horse_number);
}

#[test]
fn live_mode_reads_market_figures_from_the_entry() {
    let source = seeded_source();
    let mut config = PredictionConfig::default();
    config.odds_source = OddsSource::Live;
    let mut service = PredictionService::new(config).unwrap();
    let mut sheet = card();
    for entry in &mut sheet.entries {
        entry.popularity = Some(1);
    }
    let predictions = service.predict(&source, &sheet).unwrap();
    for prediction in &predictions {
        // Rank 1 popularity scores 100 for every entry in live mode.
        assert_eq!(Some(100.0), prediction.factor_scores.get(FactorKind::Popularity));
    }
}

#[test]
fn historical_mode_reads_market_figures_from_the_latest_start() {
    let source = seeded_source();
    let mut service = PredictionService::new(PredictionConfig::default()).unwrap();
    let predictions = service.predict(&source, &card()).unwrap();
    let favourite = predictions.iter().find(|p| p.horse_number == 1).unwrap();
    let outsider = predictions.iter().find(|p| p.horse_number == 3).unwrap();
    // h1 was first in popularity in its latest start, h3 third.
    assert_eq!(Some(100.0), favourite.factor_scores.get(FactorKind::Popularity));
    assert_eq!(Some(80.0), outsider.factor_scores.get(FactorKind::Popularity));
}

#[test]
fn invalid_configuration_fails_at_construction() {
    let mut config = PredictionConfig::default();
    config.alpha = 1.5;
    assert!(PredictionService::new(config).is_err());

    let mut config = PredictionConfig::default();
    config.past_limit = 0;
    assert!(PredictionService::new(config).is_err());

    let mut config = PredictionConfig::default();
    config.weights = crate::scoring::FactorWeights::empty();
    assert!(PredictionService::new(config).is_err());
}

#[test]
fn single_entry_field_ranks_first() {
    let source = seeded_source();
    let model = FixedPredictor {
        probabilities: vec![0.5],
    };
    let mut service = PredictionService::new(PredictionConfig::default())
        .unwrap()
        .with_model(Arc::new(model));
    let mut sheet = card();
    sheet.entries.truncate(1);
    let predictions = service.predict(&source, &sheet).unwrap();
    assert_eq!(1, predictions.len());
    let only = &predictions[0];
    assert_eq!(1, only.rank);
    // The sole probability is the maximum, so the ML term normalises to 100.
    let expected = round_dp1(60.0 + 0.4 * only.total_score.unwrap());
    assert_eq!(Some(expected), only.combined_score);
}
