//! Running-style factor: infers the horse's habitual style from first-corner
//! positions and scores how well that style converts on the course.

use ordinalizer::Ordinal;
use strum::EnumCount as EnumCountTrait;
use strum_macros::{Display, EnumCount, EnumIter};

use crate::factor::FactorContext;
use crate::probs::{cap_score, round_dp1};

/// Habitual running styles, ordered from the pace-maker back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ordinal, EnumCount, EnumIter, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RunningStyle {
    Escape,
    Front,
    Stalker,
    Closer,
}

/// Per-style win rates for a course. Values are rates in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleStats {
    pub escape: f64,
    pub front: f64,
    pub stalker: f64,
    pub closer: f64,
}
impl StyleStats {
    pub fn rate(&self, style: RunningStyle) -> f64 {
        match style {
            RunningStyle::Escape => self.escape,
            RunningStyle::Front => self.front,
            RunningStyle::Stalker => self.stalker,
            RunningStyle::Closer => self.closer,
        }
    }
}
impl Default for StyleStats {
    fn default() -> Self {
        Self {
            escape: 0.15,
            front: 0.35,
            stalker: 0.35,
            closer: 0.15,
        }
    }
}

const RECENT_RACES: usize = 5;

/// Classifies a single race from the first-corner position ratio. Returns
/// `None` when the passing order is absent or unparseable.
pub fn classify(passing_order: &str, total_runners: u32) -> Option<RunningStyle> {
    if passing_order.is_empty() || total_runners == 0 {
        return None;
    }
    let first_corner: u32 = passing_order.split('-').next()?.parse().ok()?;
    let ratio = first_corner as f64 / total_runners as f64;
    let style = if ratio <= 0.15 {
        RunningStyle::Escape
    } else if ratio <= 0.40 {
        RunningStyle::Front
    } else if ratio <= 0.70 {
        RunningStyle::Stalker
    } else {
        RunningStyle::Closer
    };
    Some(style)
}

/// The mode of the horse's classifiable styles over its recent races; ties go
/// to the style observed first.
fn tendency(ctx: &FactorContext) -> Option<RunningStyle> {
    let styles: Vec<RunningStyle> = ctx
        .past
        .iter()
        .filter(|past| past.horse_id == ctx.horse_id && past.total_runners >= 1)
        .filter_map(|past| {
            past.passing_order
                .as_deref()
                .and_then(|order| classify(order, past.total_runners))
        })
        .take(RECENT_RACES)
        .collect();
    if styles.is_empty() {
        return None;
    }

    let mut counts = [0usize; RunningStyle::COUNT];
    for style in &styles {
        counts[style.ordinal()] += 1;
    }
    let mut best = styles[0];
    for style in &styles {
        if counts[style.ordinal()] > counts[best.ordinal()] {
            best = *style;
        }
    }
    Some(best)
}

pub fn score(ctx: &FactorContext) -> Option<f64> {
    let style = tendency(ctx)?;
    let stats = ctx.style_stats.unwrap_or_default();
    let rate = stats.rate(style);
    // 5% win rate scores 0, 40% scores 100, linear in between.
    Some(round_dp1(cap_score((rate - 0.05) / 0.35 * 100.0)))
}
