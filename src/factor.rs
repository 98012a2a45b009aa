//! The factor engine: seven scoring factors, each a pure mapping from a horse's
//! racing history and race context to a bounded score or an explicit
//! "insufficient data" outcome.
//!
//! Every factor exposes `score(&FactorContext) -> Option<f64>`; a present score
//! always lies in `[0, 100]` and is rounded to one decimal place. `None` means
//! the factor could not be computed, never zero.

use ordinalizer::Ordinal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use strum::{EnumCount as EnumCountTrait, IntoEnumIterator};
use strum_macros::{Display, EnumCount, EnumIter};

use crate::domain::{PastRace, Surface, TrackCondition};

pub mod course_fit;
pub mod last_3f;
pub mod past_results;
pub mod pedigree;
pub mod popularity;
pub mod running_style;
pub mod time_index;

pub use running_style::StyleStats;

/// The seven scoring factors. The ordinal doubles as the slot index in
/// [`FactorScores`] and fixes the factor portion of the feature ordering.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ordinal, EnumCount, EnumIter, Display,
)]
pub enum FactorKind {
    #[strum(serialize = "past_results")]
    PastResults,
    #[strum(serialize = "course_fit")]
    CourseFit,
    #[strum(serialize = "time_index")]
    TimeIndex,
    #[strum(serialize = "last_3f")]
    Last3f,
    #[strum(serialize = "popularity")]
    Popularity,
    #[strum(serialize = "pedigree")]
    Pedigree,
    #[strum(serialize = "running_style")]
    RunningStyle,
}

/// Scores for all factors of one entry, indexed by [`FactorKind`]. Absent
/// factors hold `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FactorScores([Option<f64>; FactorKind::COUNT]);

impl FactorScores {
    pub fn get(&self, kind: FactorKind) -> Option<f64> {
        self.0[kind.ordinal()]
    }

    pub fn set(&mut self, kind: FactorKind, score: Option<f64>) {
        self.0[kind.ordinal()] = score;
    }

    pub fn iter(&self) -> impl Iterator<Item = (FactorKind, Option<f64>)> + '_ {
        FactorKind::iter().map(|kind| (kind, self.get(kind)))
    }

    /// Number of factors that produced a score.
    pub fn present(&self) -> usize {
        self.0.iter().filter(|score| score.is_some()).count()
    }
}

impl Serialize for FactorScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FactorKind::COUNT))?;
        for (kind, score) in self.iter() {
            map.serialize_entry(&kind.to_string(), &score)?;
        }
        map.end()
    }
}

/// Immutable calculation context handed to each factor. Replaces the loose
/// parameter bags of ad-hoc scoring scripts: all optional context is an
/// explicit `Option` field with a documented default of "absent".
#[derive(Debug, Clone)]
pub struct FactorContext<'a> {
    pub horse_id: &'a str,
    /// The horse's history, most recent first unless `presorted` is false.
    pub past: &'a [PastRace],
    /// When set, `past` is taken as already sorted by date descending and the
    /// per-factor sort is skipped.
    pub presorted: bool,
    pub surface: Option<Surface>,
    pub distance: Option<u32>,
    pub track_condition: Option<TrackCondition>,
    pub venue: Option<&'a str>,
    pub sire: Option<&'a str>,
    pub dam_sire: Option<&'a str>,
    pub odds: Option<f64>,
    pub popularity: Option<u32>,
    pub style_stats: Option<StyleStats>,
}

impl<'a> FactorContext<'a> {
    pub fn new(horse_id: &'a str, past: &'a [PastRace]) -> Self {
        Self {
            horse_id,
            past,
            presorted: false,
            surface: None,
            distance: None,
            track_condition: None,
            venue: None,
            sire: None,
            dam_sire: None,
            odds: None,
            popularity: None,
            style_stats: None,
        }
    }
}

/// Dispatches to the factor implementation for `kind`.
pub fn score(kind: FactorKind, ctx: &FactorContext) -> Option<f64> {
    match kind {
        FactorKind::PastResults => past_results::score(ctx),
        FactorKind::CourseFit => course_fit::score(ctx),
        FactorKind::TimeIndex => time_index::score(ctx),
        FactorKind::Last3f => last_3f::score(ctx),
        FactorKind::Popularity => popularity::score(ctx),
        FactorKind::Pedigree => pedigree::score(ctx),
        FactorKind::RunningStyle => running_style::score(ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_wire_spellings() {
        assert_eq!("past_results", FactorKind::PastResults.to_string());
        assert_eq!("course_fit", FactorKind::CourseFit.to_string());
        assert_eq!("time_index", FactorKind::TimeIndex.to_string());
        assert_eq!("last_3f", FactorKind::Last3f.to_string());
        assert_eq!("popularity", FactorKind::Popularity.to_string());
        assert_eq!("pedigree", FactorKind::Pedigree.to_string());
        assert_eq!("running_style", FactorKind::RunningStyle.to_string());
    }

    #[test]
    fn scores_index_by_kind() {
        let mut scores = FactorScores::default();
        assert_eq!(0, scores.present());
        scores.set(FactorKind::TimeIndex, Some(61.5));
        scores.set(FactorKind::Popularity, None);
        assert_eq!(Some(61.5), scores.get(FactorKind::TimeIndex));
        assert_eq!(None, scores.get(FactorKind::Popularity));
        assert_eq!(1, scores.present());
    }

    #[test]
    fn scores_serialize_as_named_map() {
        let mut scores = FactorScores::default();
        scores.set(FactorKind::PastResults, Some(80.0));
        let encoded = serde_json::to_value(scores).unwrap();
        assert_eq!(80.0, encoded["past_results"].as_f64().unwrap());
        assert!(encoded["course_fit"].is_null());
        assert_eq!(7, encoded.as_object().unwrap().len());
    }
}
