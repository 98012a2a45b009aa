//! Cached factor calculation: one cache, seven factors, one call per entry.

use crate::cache::{fingerprint, CacheStats, FactorCache, Param};
use crate::domain::{HorseProfile, PastRace, Surface, TrackCondition};
use crate::factor;
use crate::factor::{FactorContext, FactorKind, FactorScores, StyleStats};

/// Everything known about one entry at calculation time. `past_race_ids` must
/// list the ids of `past` in order; they key the cache.
#[derive(Debug, Clone)]
pub struct CalcInput<'a> {
    pub horse_id: &'a str,
    pub past: &'a [PastRace],
    pub past_race_ids: &'a [String],
    pub horse: Option<&'a HorseProfile>,
    pub surface: Option<Surface>,
    pub distance: Option<u32>,
    pub track_condition: Option<TrackCondition>,
    pub venue: Option<&'a str>,
    pub odds: Option<f64>,
    pub popularity: Option<u32>,
    /// Set when `past` is already sorted by date descending.
    pub presorted: bool,
}

impl<'a> CalcInput<'a> {
    pub fn new(horse_id: &'a str, past: &'a [PastRace], past_race_ids: &'a [String]) -> Self {
        Self {
            horse_id,
            past,
            past_race_ids,
            horse: None,
            surface: None,
            distance: None,
            track_condition: None,
            venue: None,
            odds: None,
            popularity: None,
            presorted: false,
        }
    }
}

/// Computes all seven factors for an entry, memoising through a bounded LRU.
///
/// The popularity factor is never cached: it rides on entry data that is not
/// stable across calls. Every other factor depends only on the horse's past
/// races and the race context, so the cache survives model retraining.
#[derive(Debug)]
pub struct FactorCalculator {
    cache: FactorCache,
    style_stats: StyleStats,
}

impl FactorCalculator {
    pub fn new(cache: FactorCache) -> Self {
        Self {
            cache,
            style_stats: StyleStats::default(),
        }
    }

    pub fn with_style_stats(mut self, style_stats: StyleStats) -> Self {
        self.style_stats = style_stats;
        self
    }

    pub fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn calculate_all(&mut self, input: &CalcInput) -> FactorScores {
        let mut scores = FactorScores::default();
        let surface_name = input.surface.map(|surface| surface.to_string());
        let condition_name = input.track_condition.map(|condition| condition.to_string());
        let sire = input.horse.and_then(|horse| horse.sire.as_deref());
        let dam_sire = input.horse.and_then(|horse| horse.dam_sire.as_deref());

        let mut ctx = FactorContext::new(input.horse_id, input.past);
        ctx.presorted = input.presorted;
        ctx.surface = input.surface;
        ctx.distance = input.distance;
        ctx.track_condition = input.track_condition;
        ctx.venue = input.venue;
        ctx.sire = sire;
        ctx.dam_sire = dam_sire;
        ctx.odds = input.odds;
        ctx.popularity = input.popularity;
        ctx.style_stats = Some(self.style_stats);

        scores.set(
            FactorKind::PastResults,
            self.cached(FactorKind::PastResults, input, &[], &ctx),
        );

        let condition_params = [
            ("target_surface", param_str(surface_name.as_deref())),
            ("target_distance", param_u32(input.distance)),
        ];
        scores.set(
            FactorKind::CourseFit,
            self.cached(FactorKind::CourseFit, input, &condition_params, &ctx),
        );

        let time_params = [
            ("target_surface", param_str(surface_name.as_deref())),
            ("target_distance", param_u32(input.distance)),
            ("track_condition", param_str(condition_name.as_deref())),
        ];
        scores.set(
            FactorKind::TimeIndex,
            self.cached(FactorKind::TimeIndex, input, &time_params, &ctx),
        );

        scores.set(
            FactorKind::Last3f,
            self.cached(FactorKind::Last3f, input, &[], &ctx),
        );

        // Not cached, by policy.
        scores.set(FactorKind::Popularity, factor::score(FactorKind::Popularity, &ctx));

        let pedigree_params = [
            ("sire", param_str(sire)),
            ("dam_sire", param_str(dam_sire)),
            ("target_distance", param_u32(input.distance)),
            ("track_condition", param_str(condition_name.as_deref())),
        ];
        scores.set(
            FactorKind::Pedigree,
            self.cached(FactorKind::Pedigree, input, &pedigree_params, &ctx),
        );

        let style_params = [
            ("course", param_str(input.venue)),
            ("target_distance", param_u32(input.distance)),
        ];
        scores.set(
            FactorKind::RunningStyle,
            self.cached(FactorKind::RunningStyle, input, &style_params, &ctx),
        );

        scores
    }

    fn cached(
        &mut self,
        kind: FactorKind,
        input: &CalcInput,
        params: &[(&str, Param)],
        ctx: &FactorContext,
    ) -> Option<f64> {
        let key = fingerprint(kind, input.horse_id, input.past_race_ids, params);
        if let Some(cached) = self.cache.get(key) {
            return cached;
        }
        let value = factor::score(kind, ctx);
        self.cache.insert(key, value);
        value
    }
}

impl Default for FactorCalculator {
    fn default() -> Self {
        Self::new(FactorCache::default())
    }
}

fn param_str<'a>(value: Option<&'a str>) -> Param<'a> {
    match value {
        Some(value) => Param::Str(value),
        None => Param::Absent,
    }
}

fn param_u32<'a>(value: Option<u32>) -> Param<'a> {
    match value {
        Some(value) => Param::U32(value),
        None => Param::Absent,
    }
}
