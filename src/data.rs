//! Data access: source capabilities and the in-memory archive backing them.
//!
//! Storage is deliberately abstract; the engine sees two capabilities. A
//! [`HistorySource`] answers "what had this horse done before date D", which
//! is all prediction needs; a [`DataSource`] adds race enumeration, full
//! results and payouts for backtesting and simulation. [`MemoryDataSource`]
//! implements both over race archives loaded from a JSON directory.

use std::path::Path;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::{
    HorseProfile, PastRace, Race, RacePayouts, ResultedRace, RunnerResult,
};
use crate::file;

/// Default cap on how much history is fetched per horse.
pub const DEFAULT_PAST_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("data source unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read access to a horse's past, strictly bounded by a cutoff date.
pub trait HistorySource {
    /// Past results for `horse_id` dated strictly before `before`, most
    /// recent first, at most `limit` rows.
    fn past_results(
        &self,
        horse_id: &str,
        before: NaiveDate,
        limit: usize,
    ) -> Result<Vec<PastRace>, DataError>;

    fn horse(&self, horse_id: &str) -> Result<Option<HorseProfile>, DataError>;
}

/// Full read access for backtesting and simulation.
pub trait DataSource: HistorySource {
    /// Races dated within `[from, to]`, ascending by (date, race number),
    /// optionally narrowed to a venue list.
    fn races_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        venues: Option<&[String]>,
    ) -> Result<Vec<Race>, DataError>;

    fn resulted_race(&self, race_id: &str) -> Result<ResultedRace, DataError>;

    fn payouts(&self, race_id: &str) -> Result<RacePayouts, DataError>;
}

/// On-disk unit: one race with its results, payouts and the horses involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceArchive {
    pub race: Race,
    pub runners: Vec<RunnerResult>,
    #[serde(default)]
    pub payouts: Option<RacePayouts>,
    #[serde(default)]
    pub horses: Vec<HorseProfile>,
}

/// An archive of races held in memory, indexed for the source traits.
#[derive(Debug, Default)]
pub struct MemoryDataSource {
    races: Vec<Race>,
    runners: FxHashMap<String, Vec<RunnerResult>>,
    payouts: FxHashMap<String, RacePayouts>,
    horses: FxHashMap<String, HorseProfile>,
    history: FxHashMap<String, Vec<PastRace>>,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_archives(archives: impl IntoIterator<Item = RaceArchive>) -> Self {
        let mut source = Self::new();
        for archive in archives {
            source.insert_archive(archive);
        }
        source
    }

    pub fn race_count(&self) -> usize {
        self.races.len()
    }

    /// Adds one race archive, indexing every runner's row into the per-horse
    /// history.
    pub fn insert_archive(&mut self, archive: RaceArchive) {
        let RaceArchive {
            race,
            runners,
            payouts,
            horses,
        } = archive;

        for horse in horses {
            self.horses.insert(horse.id.clone(), horse);
        }
        if let Some(payouts) = payouts {
            self.payouts.insert(race.id.clone(), payouts);
        }

        let field_size = runners.len() as u32;
        for runner in &runners {
            let past = PastRace {
                race_id: race.id.clone(),
                horse_id: runner.entry.horse_id.clone(),
                finish_position: runner.finish_position,
                total_runners: field_size,
                surface: Some(race.surface),
                distance: Some(race.distance),
                time: runner.time.clone(),
                last_3f: runner.last_3f,
                race_date: Some(race.date),
                odds: runner.entry.odds,
                popularity: runner.entry.popularity,
                passing_order: runner.passing_order.clone(),
                venue: Some(race.venue.clone()),
                race_name: Some(race.name.clone()),
                track_condition: race.track_condition,
                weight: runner.weight,
                weight_diff: runner.weight_diff,
                age: runner.entry.age,
                impost: runner.entry.impost,
                horse_number: Some(runner.entry.horse_number),
            };
            let rows = self.history.entry(past.horse_id.clone()).or_default();
            // Most recent first; insertion keeps the vector ordered.
            let at = rows
                .partition_point(|existing| existing.race_date > past.race_date);
            rows.insert(at, past);
        }

        self.runners.insert(race.id.clone(), runners);
        let at = self.races.partition_point(|existing| {
            (existing.date, existing.race_number) <= (race.date, race.race_number)
        });
        self.races.insert(at, race);
    }
}

impl HistorySource for MemoryDataSource {
    fn past_results(
        &self,
        horse_id: &str,
        before: NaiveDate,
        limit: usize,
    ) -> Result<Vec<PastRace>, DataError> {
        let rows = match self.history.get(horse_id) {
            Some(rows) => rows
                .iter()
                .filter(|row| row.race_date.map(|date| date < before).unwrap_or(false))
                .take(limit)
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Ok(rows)
    }

    fn horse(&self, horse_id: &str) -> Result<Option<HorseProfile>, DataError> {
        Ok(self.horses.get(horse_id).cloned())
    }
}

impl DataSource for MemoryDataSource {
    fn races_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        venues: Option<&[String]>,
    ) -> Result<Vec<Race>, DataError> {
        Ok(self
            .races
            .iter()
            .filter(|race| race.date >= from && race.date <= to)
            .filter(|race| {
                venues
                    .map(|venues| venues.iter().any(|venue| venue == &race.venue))
                    .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    fn resulted_race(&self, race_id: &str) -> Result<ResultedRace, DataError> {
        let race = self
            .races
            .iter()
            .find(|race| race.id == race_id)
            .ok_or_else(|| DataError::NotFound(format!("race {race_id}")))?;
        let runners = self
            .runners
            .get(race_id)
            .ok_or_else(|| DataError::NotFound(format!("results for race {race_id}")))?;
        Ok(ResultedRace {
            race: race.clone(),
            runners: runners.clone(),
        })
    }

    fn payouts(&self, race_id: &str) -> Result<RacePayouts, DataError> {
        self.payouts
            .get(race_id)
            .cloned()
            .ok_or_else(|| DataError::NotFound(format!("payouts for race {race_id}")))
    }
}

/// Loads every `*.json` race archive under `dir` into a memory source.
pub fn read_from_dir(dir: impl AsRef<Path>) -> Result<MemoryDataSource, anyhow::Error> {
    let mut files = Vec::new();
    file::recurse_dir(dir.as_ref().to_path_buf(), &mut files, &mut |ext| {
        ext == "json"
    })?;
    files.sort();
    let mut source = MemoryDataSource::new();
    for path in files {
        let archive: RaceArchive = file::read_json(&path)?;
        debug!("loaded race {} from {}", archive.race.id, path.to_string_lossy());
        source.insert_archive(archive);
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use crate::domain::{RaceEntry, Surface};

    use super::*;

    fn runner(horse_id: &str, horse_number: u8, finish: u32) -> RunnerResult {
        RunnerResult {
            entry: RaceEntry {
                horse_id: horse_id.into(),
                horse_name: format!("horse {horse_id}"),
                horse_number,
                bracket_number: horse_number,
                odds: Some(4.0),
                popularity: Some(horse_number as u32),
                ..Default::default()
            },
            finish_position: finish,
            time: Some("1:35.0".into()),
            last_3f: Some(34.5),
            ..Default::default()
        }
    }

    fn archive(race_id: &str, date: &str, race_number: u8) -> RaceArchive {
        RaceArchive {
            race: Race {
                id: race_id.into(),
                name: format!("race {race_id}"),
                date: crate::domain::parse_date(date).unwrap(),
                venue: "東京".into(),
                race_number,
                surface: Surface::Turf,
                distance: 1600,
                track_condition: None,
            },
            runners: vec![runner("h1", 1, 1), runner("h2", 2, 2)],
            payouts: None,
            horses: vec![],
        }
    }

    #[test]
    fn races_enumerate_in_chronological_order() {
        let source = MemoryDataSource::from_archives(vec![
            archive("r3", "2024-01-14", 1),
            archive("r1", "2024-01-07", 2),
            archive("r2", "2024-01-07", 1),
        ]);
        let races = source
            .races_between(
                crate::domain::parse_date("2024-01-01").unwrap(),
                crate::domain::parse_date("2024-01-31").unwrap(),
                None,
            )
            .unwrap();
        // Insertion order scrambled; output ordered by (date, race number).
        assert_eq!(
            vec!["r2", "r1", "r3"],
            races.iter().map(|race| race.id.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn venue_filter_applies() {
        let mut other = archive("r9", "2024-01-07", 3);
        other.race.venue = "中山".into();
        let source =
            MemoryDataSource::from_archives(vec![archive("r1", "2024-01-07", 1), other]);
        let races = source
            .races_between(
                crate::domain::parse_date("2024-01-01").unwrap(),
                crate::domain::parse_date("2024-01-31").unwrap(),
                Some(&["中山".to_string()]),
            )
            .unwrap();
        assert_eq!(1, races.len());
        assert_eq!("r9", races[0].id);
    }

    #[test]
    fn past_results_respect_the_cutoff() {
        let source = MemoryDataSource::from_archives(vec![
            archive("r1", "2024-01-07", 1),
            archive("r2", "2024-01-14", 1),
            archive("r3", "2024-01-21", 1),
        ]);
        let cutoff = crate::domain::parse_date("2024-01-14").unwrap();
        let past = source.past_results("h1", cutoff, DEFAULT_PAST_LIMIT).unwrap();
        // Only the race strictly before the cutoff qualifies.
        assert_eq!(1, past.len());
        assert_eq!("r1", past[0].race_id);
        assert_eq!(2, past[0].total_runners);
    }

    #[test]
    fn past_results_come_most_recent_first_and_limited() {
        let source = MemoryDataSource::from_archives(vec![
            archive("r1", "2024-01-07", 1),
            archive("r2", "2024-01-14", 1),
            archive("r3", "2024-01-21", 1),
        ]);
        let cutoff = crate::domain::parse_date("2024-02-01").unwrap();
        let past = source.past_results("h1", cutoff, 2).unwrap();
        assert_eq!(
            vec!["r3", "r2"],
            past.iter().map(|row| row.race_id.as_str()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn unknown_horse_has_empty_history() {
        let source = MemoryDataSource::from_archives(vec![archive("r1", "2024-01-07", 1)]);
        let cutoff = crate::domain::parse_date("2024-02-01").unwrap();
        assert!(source.past_results("hx", cutoff, 10).unwrap().is_empty());
        assert!(source.horse("hx").unwrap().is_none());
    }

    #[test]
    fn missing_race_and_payouts_are_not_found() {
        let source = MemoryDataSource::from_archives(vec![archive("r1", "2024-01-07", 1)]);
        assert!(matches!(
            source.resulted_race("rx"),
            Err(DataError::NotFound(_))
        ));
        assert!(matches!(source.payouts("r1"), Err(DataError::NotFound(_))));
    }
}
