//! Shared scaffolding for the simulator tests: archives engineered so the
//! prediction pipeline ranks horses in a chosen order.

use crate::data::{MemoryDataSource, RaceArchive};
use crate::domain::{
    parse_date, Race, RacePayouts, RaceEntry, RunnerResult, Surface,
};

pub const PAST_RACE_DATE: &str = "2024-01-07";
pub const TARGET_RACE_ID: &str = "t1";
pub const TARGET_RACE_DATE: &str = "2024-02-04";

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

fn runner(horse_number: u8, finish: u32, popularity: u32) -> RunnerResult {
    RunnerResult {
        entry: RaceEntry {
            horse_id: format!("h{horse_number}"),
            horse_name: format!("horse {horse_number}"),
            horse_number,
            bracket_number: horse_number,
            age: Some(4),
            impost: Some(56.0),
            odds: Some(popularity as f64 * 2.0),
            popularity: Some(popularity),
            ..Default::default()
        },
        finish_position: finish,
        time: Some("1:34.0".into()),
        last_3f: Some(34.5),
        passing_order: Some("3-3".into()),
        weight: Some(480.0),
        weight_diff: Some(0.0),
        ..Default::default()
    }
}

/// Builds a source where the pipeline ranks `predicted` in the given order
/// (one warm-up race seeds the factor inputs), and the target race finishes
/// in `official` order with `payouts` posted.
///
/// Every horse in either list runs in both races; horses appear by number.
pub fn scenario(
    predicted: &[u8],
    official: &[u8],
    payouts: RacePayouts,
) -> MemoryDataSource {
    let mut numbers: Vec<u8> = predicted.to_vec();
    for &number in official {
        if !numbers.contains(&number) {
            numbers.push(number);
        }
    }

    let past_runners: Vec<RunnerResult> = numbers
        .iter()
        .enumerate()
        .map(|(index, &number)| runner(number, index as u32 + 1, index as u32 + 1))
        .collect();

    let target_runners: Vec<RunnerResult> = numbers
        .iter()
        .map(|&number| {
            let finish = official
                .iter()
                .position(|&placed| placed == number)
                .map(|position| position as u32 + 1)
                .unwrap_or_else(|| {
                    official.len() as u32
                        + numbers.iter().position(|&n| n == number).unwrap() as u32
                        + 1
                });
            let popularity = numbers.iter().position(|&n| n == number).unwrap() as u32 + 1;
            runner(number, finish, popularity)
        })
        .collect();

    MemoryDataSource::from_archives(vec![
        RaceArchive {
            race: race("p1", "ジュニアC 3勝クラス", PAST_RACE_DATE, 1),
            runners: past_runners,
            payouts: None,
            horses: vec![],
        },
        RaceArchive {
            race: race(TARGET_RACE_ID, "朝凪S 3勝クラス", TARGET_RACE_DATE, 11),
            runners: target_runners,
            payouts: Some(payouts),
            horses: vec![],
        },
    ])
}

#[cfg(test)]
mod tests {
    use crate::predict::{PredictionConfig, PredictionService};

    use super::*;

    #[test]
    fn scenario_ranks_horses_as_requested() {
        let source = scenario(&[5, 3, 8], &[5, 3, 1], RacePayouts::default());
        let mut service = PredictionService::new(PredictionConfig::default()).unwrap();
        let (resulted, picks) = crate::simulate::scored_picks(
            &source,
            &mut service,
            TARGET_RACE_ID,
            3,
        )
        .unwrap();
        assert_eq!(vec![5, 3, 8], picks);
        assert_eq!(TARGET_RACE_ID, resulted.race.id);
    }
}
