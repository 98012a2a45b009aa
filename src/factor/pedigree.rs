//! Pedigree factor: sire and dam-sire line aptitudes for the race distance and
//! footing, blended 7:3 and averaged across the two domains.

use crate::domain::DistanceBand;
use crate::factor::FactorContext;
use crate::pedigree::{line_aptitude, sire_line, Footing, Lineage};
use crate::probs::round_dp1;

const SIRE_WEIGHT: f64 = 0.7;
const DAM_SIRE_WEIGHT: f64 = 0.3;

pub fn score(ctx: &FactorContext) -> Option<f64> {
    let sire = ctx.sire?;
    let band = DistanceBand::of(ctx.distance?);
    let footing = Footing::of(ctx.track_condition);

    let sire_aptitude = line_aptitude(sire_line(sire));
    let dam_sire_line = ctx.dam_sire.map(sire_line).unwrap_or(Lineage::Other);
    let dam_sire_aptitude = line_aptitude(dam_sire_line);

    let distance_score = sire_aptitude.for_distance(band) * SIRE_WEIGHT
        + dam_sire_aptitude.for_distance(band) * DAM_SIRE_WEIGHT;
    let footing_score = sire_aptitude.for_footing(footing) * SIRE_WEIGHT
        + dam_sire_aptitude.for_footing(footing) * DAM_SIRE_WEIGHT;

    let total = (distance_score + footing_score) / 2.0;
    Some(round_dp1(total * 100.0))
}

#[cfg(test)]
mod tests {
    use crate::domain::TrackCondition;

    use super::*;

    fn ctx_for(
        sire: Option<&'static str>,
        dam_sire: Option<&'static str>,
        distance: Option<u32>,
        track_condition: Option<TrackCondition>,
    ) -> Option<f64> {
        let mut ctx = FactorContext::new("h1", &[]);
        ctx.sire = sire;
        ctx.dam_sire = dam_sire;
        ctx.distance = distance;
        ctx.track_condition = track_condition;
        score(&ctx)
    }

    #[test]
    fn blends_sire_and_dam_sire() {
        // Sunday Silence sire, Kingmambo dam-sire over a firm mile:
        // distance 0.9 * 0.7 + 1.0 * 0.3 = 0.93; footing 1.0 * 0.7 + 0.9 * 0.3
        // = 0.97; total (0.93 + 0.97) / 2 * 100 = 95.0.
        let score = ctx_for(
            Some("ディープインパクト"),
            Some("キングカメハメハ"),
            Some(1600),
            Some(TrackCondition::Firm),
        );
        assert_eq!(Some(95.0), score);
    }

    #[test]
    fn unknown_dam_sire_falls_back_to_other() {
        // Distance 0.9 * 0.7 + 0.8 * 0.3 = 0.87; footing 1.0 * 0.7 + 0.9 * 0.3
        // = 0.97; total 92.0.
        let score = ctx_for(Some("ディープインパクト"), None, Some(1600), None);
        assert_eq!(Some(92.0), score);
    }

    #[test]
    fn heavy_going_uses_heavy_aptitude() {
        // Sunday Silence heavy 0.7 vs good 1.0 drags the footing leg down.
        let firm = ctx_for(Some("ディープインパクト"), None, Some(1600), None).unwrap();
        let soft = ctx_for(
            Some("ディープインパクト"),
            None,
            Some(1600),
            Some(TrackCondition::Soft),
        )
        .unwrap();
        assert!(soft < firm);
    }

    #[test]
    fn missing_sire_or_distance_is_insufficient() {
        assert_eq!(None, ctx_for(None, Some("キングカメハメハ"), Some(1600), None));
        assert_eq!(None, ctx_for(Some("ディープインパクト"), None, None, None));
    }

    #[test]
    fn unrecognised_sire_still_scores() {
        // An off-table sire maps to the "other" line rather than failing.
        let score = ctx_for(Some("無名の種牡馬"), None, Some(1600), None);
        // distance 0.8, footing 0.9 -> 85.0
        assert_eq!(Some(85.0), score);
    }
}
