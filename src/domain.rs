//! Core data model: races, entries, results, payouts and prediction outputs.
//!
//! Races and results are produced by an ingest path outside this crate and are
//! read-only once recorded. Prediction outputs are immutable values emitted to
//! downstream consumers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::factor::FactorScores;

/// Racing surface of a course.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Surface {
    Turf,
    Dirt,
    Hurdle,
}

/// Official going of the track on race day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrackCondition {
    Firm,
    Good,
    Soft,
    Heavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sex {
    Colt,
    Filly,
    Gelding,
}

/// Distance bands shared by the course-fit factor and the pedigree aptitude tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum DistanceBand {
    Sprint,
    Mile,
    Middle,
    Long,
}
impl DistanceBand {
    pub fn of(distance: u32) -> DistanceBand {
        match distance {
            0..=1400 => DistanceBand::Sprint,
            1401..=1800 => DistanceBand::Mile,
            1801..=2200 => DistanceBand::Middle,
            _ => DistanceBand::Long,
        }
    }
}

/// One scheduled race. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub id: String,
    pub name: String,
    #[serde(with = "flexi_date")]
    pub date: NaiveDate,
    pub venue: String,
    pub race_number: u8,
    pub surface: Surface,
    pub distance: u32,
    #[serde(default)]
    pub track_condition: Option<TrackCondition>,
}

/// One horse entered in one race. Odds and popularity are present only when the
/// entry was captured with market data attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceEntry {
    pub horse_id: String,
    pub horse_name: String,
    pub horse_number: u8,
    pub bracket_number: u8,
    #[serde(default)]
    pub jockey: Option<String>,
    #[serde(default)]
    pub impost: Option<f64>,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub odds: Option<f64>,
    #[serde(default)]
    pub popularity: Option<u32>,
}

/// An entry with its recorded outcome. `finish_position` of 0 marks a scratched
/// or disqualified runner and is excluded from every rate and average.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerResult {
    #[serde(flatten)]
    pub entry: RaceEntry,
    pub finish_position: u32,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub last_3f: Option<f64>,
    #[serde(default)]
    pub passing_order: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub weight_diff: Option<f64>,
}

/// A race together with its full set of finished runners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultedRace {
    pub race: Race,
    pub runners: Vec<RunnerResult>,
}
impl ResultedRace {
    /// Strips outcomes, leaving the entry sheet a predictor is allowed to see.
    pub fn to_card(&self) -> RaceCard {
        RaceCard {
            race: self.race.clone(),
            entries: self.runners.iter().map(|runner| runner.entry.clone()).collect(),
        }
    }
}

/// The entry sheet for a race: what is known before the off.
#[derive(Debug, Clone, PartialEq)]
pub struct RaceCard {
    pub race: Race,
    pub entries: Vec<RaceEntry>,
}

/// One row of a horse's racing history, as returned by a history source. This
/// is the flattened record the factor engine consumes; optional fields reflect
/// incompleteness of scraped archives rather than domain semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PastRace {
    pub race_id: String,
    pub horse_id: String,
    pub finish_position: u32,
    #[serde(default)]
    pub total_runners: u32,
    #[serde(default)]
    pub surface: Option<Surface>,
    #[serde(default)]
    pub distance: Option<u32>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub last_3f: Option<f64>,
    #[serde(default, with = "flexi_date_opt")]
    pub race_date: Option<NaiveDate>,
    #[serde(default)]
    pub odds: Option<f64>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub passing_order: Option<String>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub race_name: Option<String>,
    #[serde(default)]
    pub track_condition: Option<TrackCondition>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub weight_diff: Option<f64>,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub impost: Option<f64>,
    #[serde(default)]
    pub horse_number: Option<u8>,
}

/// Static master data for one horse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorseProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub sire: Option<String>,
    #[serde(default)]
    pub dam: Option<String>,
    #[serde(default)]
    pub dam_sire: Option<String>,
}

/// Posted payout for one placing horse in the show pool, yen per 100-yen unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowPayout {
    pub horse_number: u8,
    pub payout: u32,
}

/// Posted payout for the winner, yen per 100-yen unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinPayout {
    pub horse_number: u8,
    pub payout: u32,
}

/// Posted payout for the unordered top-2 pair, yen per 100-yen unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuinellaPayout {
    pub pair: [u8; 2],
    pub payout: u32,
}

/// Posted payout for the unordered top-3 triple, yen per 100-yen unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrioPayout {
    pub trio: [u8; 3],
    pub payout: u32,
}

/// Official payouts recorded for one race, one entry per supported bet type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RacePayouts {
    #[serde(default)]
    pub show: Vec<ShowPayout>,
    #[serde(default)]
    pub win: Option<WinPayout>,
    #[serde(default)]
    pub quinella: Option<QuinellaPayout>,
    #[serde(default)]
    pub trio: Option<TrioPayout>,
}

/// The scored outlook for one entry. `ml_probability` is 0 when no model is
/// active; absent scores are `None`, never a silent zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub horse_number: u8,
    pub horse_name: String,
    pub horse_id: String,
    pub ml_probability: f64,
    pub factor_scores: FactorScores,
    pub total_score: Option<f64>,
    pub combined_score: Option<f64>,
    pub rank: usize,
}

/// A prediction joined with the rank the horse actually recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRunner {
    #[serde(flatten)]
    pub prediction: PredictionResult,
    /// Recorded finish position; 0 marks a scratched or disqualified runner.
    pub actual_rank: u32,
}

/// Backtest output for one race, predictions in rank order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceBacktestResult {
    pub race_id: String,
    #[serde(with = "flexi_date")]
    pub race_date: NaiveDate,
    pub race_name: String,
    pub venue: String,
    pub predictions: Vec<ScoredRunner>,
}

/// Parses a boundary date, accepting `YYYY-MM-DD` alone or with a trailing
/// time component (`T` or space separated).
pub fn parse_date(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").map(|dt| dt.date())
        })
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
        })
}

pub(crate) mod flexi_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).map_err(de::Error::custom)
    }
}

pub(crate) mod flexi_date_opt {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_some(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(raw) => super::parse_date(&raw).map(Some).map_err(de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_bands() {
        assert_eq!(DistanceBand::Sprint, DistanceBand::of(1000));
        assert_eq!(DistanceBand::Sprint, DistanceBand::of(1400));
        assert_eq!(DistanceBand::Mile, DistanceBand::of(1401));
        assert_eq!(DistanceBand::Mile, DistanceBand::of(1800));
        assert_eq!(DistanceBand::Middle, DistanceBand::of(2200));
        assert_eq!(DistanceBand::Long, DistanceBand::of(2400));
    }

    #[test]
    fn parse_plain_date() {
        assert_eq!(
            NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
            parse_date("2024-01-06").unwrap()
        );
    }

    #[test]
    fn parse_datetime_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert_eq!(expected, parse_date("2024-03-31T15:40:00").unwrap());
        assert_eq!(expected, parse_date("2024-03-31 15:40:00").unwrap());
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(parse_date("2024/01/06").is_err());
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn race_round_trips_through_json() {
        let race = Race {
            id: "202405020811".into(),
            name: "日本ダービー(G1)".into(),
            date: NaiveDate::from_ymd_opt(2024, 5, 26).unwrap(),
            venue: "東京".into(),
            race_number: 11,
            surface: Surface::Turf,
            distance: 2400,
            track_condition: Some(TrackCondition::Firm),
        };
        let encoded = serde_json::to_string(&race).unwrap();
        let decoded: Race = serde_json::from_str(&encoded).unwrap();
        assert_eq!(race, decoded);
    }

    #[test]
    fn past_race_tolerates_sparse_records() {
        let decoded: PastRace = serde_json::from_str(
            r#"{"race_id": "r1", "horse_id": "h1", "finish_position": 2}"#,
        )
        .unwrap();
        assert_eq!(0, decoded.total_runners);
        assert_eq!(None, decoded.race_date);
        assert_eq!(None, decoded.surface);
    }
}
