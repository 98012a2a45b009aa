//! Race class extraction from JRA race names.
//!
//! The class tag is parsed from the free-text race name: graded stakes carry a
//! parenthesised marker (`(G1)`, `(Jpn2)`, `(L)`), condition races carry a class
//! phrase (`3勝クラス`, legacy `1600万下`), and hurdle races are flagged by the
//! `障害` prefix which reroutes the plain open/maiden matches.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Closed set of recognised race classes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum Grade {
    G1,
    G2,
    G3,
    Jpn1,
    Jpn2,
    Jpn3,
    #[strum(serialize = "L")]
    Listed,
    #[strum(serialize = "OP")]
    Open,
    #[strum(serialize = "3WIN")]
    ThreeWin,
    #[strum(serialize = "2WIN")]
    TwoWin,
    #[strum(serialize = "1WIN")]
    OneWin,
    #[strum(serialize = "DEBUT")]
    Debut,
    #[strum(serialize = "MAIDEN")]
    Maiden,
    #[strum(serialize = "HURDLE_OP")]
    HurdleOpen,
    #[strum(serialize = "HURDLE_MAIDEN")]
    HurdleMaiden,
    #[strum(serialize = "HURDLE_3WIN")]
    HurdleThreeWin,
    #[strum(serialize = "HURDLE_2WIN")]
    HurdleTwoWin,
    #[strum(serialize = "HURDLE_1WIN")]
    HurdleOneWin,
    #[strum(serialize = "UNKNOWN")]
    Unknown,
}

const HURDLE_MARKER: &str = "障害";

/// Extracts the race class from a race name. Match priority: G1 > G2 > G3 >
/// Jpn* > L > hurdle classes > OP > condition classes > DEBUT > MAIDEN.
/// Graded markers match case-insensitively (`gi`/`GI`/`g1`); full-width
/// parentheses are normalised before matching.
pub fn extract(race_name: &str) -> Grade {
    if race_name.is_empty() {
        return Grade::Unknown;
    }

    let name = race_name.replace('（', "(").replace('）', ")");
    let lower = name.to_lowercase();
    let hurdle = name.contains(HURDLE_MARKER);

    if contains_any(&lower, &["(g1)", "(gi)", "(j・g1)", "(j・gi)"]) {
        return Grade::G1;
    }
    if contains_any(&lower, &["(g2)", "(gii)", "(j・g2)", "(j・gii)"]) {
        return Grade::G2;
    }
    if contains_any(&lower, &["(g3)", "(giii)", "(j・g3)", "(j・giii)"]) {
        return Grade::G3;
    }
    if lower.contains("(jpn1)") {
        return Grade::Jpn1;
    }
    if lower.contains("(jpn2)") {
        return Grade::Jpn2;
    }
    if lower.contains("(jpn3)") {
        return Grade::Jpn3;
    }
    if lower.contains("(l)") {
        return Grade::Listed;
    }

    if hurdle {
        if let Some(grade) = match_hurdle(&name) {
            return grade;
        }
    } else {
        if contains_any(&lower, &["(op)", "(オープン)", "オープン"]) {
            return Grade::Open;
        }
        if let Some(grade) = match_class(&name) {
            return grade;
        }
    }

    if name.contains("新馬") {
        return Grade::Debut;
    }
    if !hurdle && name.contains("未勝利") {
        return Grade::Maiden;
    }

    Grade::Unknown
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn match_hurdle(name: &str) -> Option<Grade> {
    if name.contains("3勝クラス") {
        return Some(Grade::HurdleThreeWin);
    }
    if name.contains("2勝クラス") {
        return Some(Grade::HurdleTwoWin);
    }
    if name.contains("1勝クラス") {
        return Some(Grade::HurdleOneWin);
    }
    if name.contains("オープン") {
        return Some(Grade::HurdleOpen);
    }
    if name.contains("未勝利") {
        return Some(Grade::HurdleMaiden);
    }
    None
}

fn match_class(name: &str) -> Option<Grade> {
    if name.contains("3勝クラス") || name.contains("1600万下") {
        return Some(Grade::ThreeWin);
    }
    if name.contains("2勝クラス") || name.contains("1000万下") {
        return Some(Grade::TwoWin);
    }
    if name.contains("1勝クラス") || name.contains("500万下") {
        return Some(Grade::OneWin);
    }
    None
}
