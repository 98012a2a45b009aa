//! Fixed-order feature vectors for the classifier.
//!
//! The 19 columns are: the seven factor scores, eight raw entry fields and
//! four derived career stats. The ordering is part of the model artifact
//! contract: a model trained against one ordering must be scored against the
//! same one. Missing values are `f64::NAN` here and only here, so a
//! tree learner can partition on them natively; everywhere else absence is an
//! explicit `Option`.

use ordinalizer::Ordinal;
use strum::{EnumCount as EnumCountTrait, IntoEnumIterator};
use strum_macros::{Display, EnumCount, EnumIter};

use crate::factor::{FactorKind, FactorScores};
use crate::stats::PastStats;

/// The feature columns, in wire order. The ordinal is the column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ordinal, EnumCount, EnumIter, Display)]
pub enum Feature {
    #[strum(serialize = "past_results_score")]
    PastResultsScore,
    #[strum(serialize = "course_fit_score")]
    CourseFitScore,
    #[strum(serialize = "time_index_score")]
    TimeIndexScore,
    #[strum(serialize = "last_3f_score")]
    Last3fScore,
    #[strum(serialize = "popularity_score")]
    PopularityScore,
    #[strum(serialize = "pedigree_score")]
    PedigreeScore,
    #[strum(serialize = "running_style_score")]
    RunningStyleScore,
    #[strum(serialize = "odds")]
    Odds,
    #[strum(serialize = "popularity")]
    PopularityRank,
    #[strum(serialize = "weight")]
    Weight,
    #[strum(serialize = "weight_diff")]
    WeightDiff,
    #[strum(serialize = "age")]
    Age,
    #[strum(serialize = "impost")]
    Impost,
    #[strum(serialize = "horse_number")]
    HorseNumber,
    #[strum(serialize = "field_size")]
    FieldSize,
    #[strum(serialize = "win_rate")]
    WinRate,
    #[strum(serialize = "top3_rate")]
    Top3Rate,
    #[strum(serialize = "avg_finish_position")]
    AvgFinishPosition,
    #[strum(serialize = "days_since_last_race")]
    DaysSinceLastRace,
}

pub const FEATURE_COUNT: usize = Feature::COUNT;

/// One feature row in column order.
pub type FeatureRow = [f64; FEATURE_COUNT];

/// Raw entry fields feeding the middle third of the vector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawEntry {
    pub odds: Option<f64>,
    pub popularity: Option<u32>,
    pub weight: Option<f64>,
    pub weight_diff: Option<f64>,
    pub age: Option<u8>,
    pub impost: Option<f64>,
    pub horse_number: Option<u8>,
    pub field_size: u32,
}

fn missing(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

/// Assembles one feature row. Absent inputs become NaN.
pub fn build_row(scores: &FactorScores, raw: &RawEntry, stats: &PastStats) -> FeatureRow {
    let mut row = [f64::NAN; FEATURE_COUNT];
    row[Feature::PastResultsScore.ordinal()] = missing(scores.get(FactorKind::PastResults));
    row[Feature::CourseFitScore.ordinal()] = missing(scores.get(FactorKind::CourseFit));
    row[Feature::TimeIndexScore.ordinal()] = missing(scores.get(FactorKind::TimeIndex));
    row[Feature::Last3fScore.ordinal()] = missing(scores.get(FactorKind::Last3f));
    row[Feature::PopularityScore.ordinal()] = missing(scores.get(FactorKind::Popularity));
    row[Feature::PedigreeScore.ordinal()] = missing(scores.get(FactorKind::Pedigree));
    row[Feature::RunningStyleScore.ordinal()] = missing(scores.get(FactorKind::RunningStyle));
    row[Feature::Odds.ordinal()] = missing(raw.odds);
    row[Feature::PopularityRank.ordinal()] = missing(raw.popularity.map(f64::from));
    row[Feature::Weight.ordinal()] = missing(raw.weight);
    row[Feature::WeightDiff.ordinal()] = missing(raw.weight_diff);
    row[Feature::Age.ordinal()] = missing(raw.age.map(f64::from));
    row[Feature::Impost.ordinal()] = missing(raw.impost);
    row[Feature::HorseNumber.ordinal()] = missing(raw.horse_number.map(f64::from));
    row[Feature::FieldSize.ordinal()] = raw.field_size as f64;
    row[Feature::WinRate.ordinal()] = missing(stats.win_rate);
    row[Feature::Top3Rate.ordinal()] = missing(stats.top3_rate);
    row[Feature::AvgFinishPosition.ordinal()] = missing(stats.avg_finish_position);
    row[Feature::DaysSinceLastRace.ordinal()] = missing(stats.days_since_last_race);
    row
}

/// The published column names, in order, for model artifact compatibility.
pub fn feature_names() -> Vec<String> {
    Feature::iter().map(|feature| feature.to_string()).collect()
}
