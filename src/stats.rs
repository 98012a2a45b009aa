//! Derived career statistics over a horse's past results.

use chrono::NaiveDate;

use crate::domain::PastRace;

/// Career summary feeding the feature builder. Each value is `None` when not
/// computable from the supplied history.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PastStats {
    pub win_rate: Option<f64>,
    pub top3_rate: Option<f64>,
    pub avg_finish_position: Option<f64>,
    pub days_since_last_race: Option<f64>,
}

/// Computes win rate, top-3 rate, average finish and layoff days from a past
/// result list, optionally narrowed to one horse. Scratched runs
/// (`finish_position` 0) are excluded from every rate and average.
pub fn past_stats(
    past: &[PastRace],
    current_date: NaiveDate,
    horse_id: Option<&str>,
) -> PastStats {
    if past.is_empty() {
        return PastStats::default();
    }

    let narrowed: Vec<&PastRace> = match horse_id {
        Some(horse_id) => {
            let filtered: Vec<_> = past.iter().filter(|r| r.horse_id == horse_id).collect();
            if filtered.is_empty() {
                past.iter().collect()
            } else {
                filtered
            }
        }
        None => past.iter().collect(),
    };

    let counted: Vec<&&PastRace> =
        narrowed.iter().filter(|r| r.finish_position >= 1).collect();
    let total = counted.len();

    let (win_rate, top3_rate, avg_finish_position) = if total > 0 {
        let wins = counted.iter().filter(|r| r.finish_position == 1).count();
        let top3 = counted
            .iter()
            .filter(|r| (1..=3).contains(&r.finish_position))
            .count();
        let sum: u32 = counted.iter().map(|r| r.finish_position).sum();
        (
            Some(wins as f64 / total as f64),
            Some(top3 as f64 / total as f64),
            Some(sum as f64 / total as f64),
        )
    } else {
        (None, None, None)
    };

    let days_since_last_race = narrowed
        .iter()
        .filter_map(|r| r.race_date)
        .max()
        .map(|last| (current_date - last).num_days() as f64);

    PastStats {
        win_rate,
        top3_rate,
        avg_finish_position,
        days_since_last_race,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(horse_id: &str, finish: u32, date: Option<&str>) -> PastRace {
        PastRace {
            race_id: "r".into(),
            horse_id: horse_id.into(),
            finish_position: finish,
            race_date: date.and_then(|d| crate::domain::parse_date(d).ok()),
            ..Default::default()
        }
    }

    fn day(date: &str) -> NaiveDate {
        crate::domain::parse_date(date).unwrap()
    }

    #[test]
    fn rates_and_average() {
        let past = vec![
            run("h1", 1, Some("2024-03-01")),
            run("h1", 3, Some("2024-02-01")),
            run("h1", 6, Some("2024-01-01")),
        ];
        let stats = past_stats(&past, day("2024-04-01"), Some("h1"));
        assert_eq!(Some(1.0 / 3.0), stats.win_rate);
        assert_eq!(Some(2.0 / 3.0), stats.top3_rate);
        assert_eq!(Some(10.0 / 3.0), stats.avg_finish_position);
        assert_eq!(Some(31.0), stats.days_since_last_race);
    }

    #[test]
    fn scratched_runs_are_excluded() {
        let past = vec![
            run("h1", 1, Some("2024-03-01")),
            run("h1", 0, Some("2024-02-01")),
        ];
        let stats = past_stats(&past, day("2024-04-01"), Some("h1"));
        assert_eq!(Some(1.0), stats.win_rate);
        assert_eq!(Some(1.0), stats.top3_rate);
        assert_eq!(Some(1.0), stats.avg_finish_position);
    }

    #[test]
    fn only_scratched_runs_yield_none_rates_but_a_layoff() {
        let past = vec![run("h1", 0, Some("2024-03-01"))];
        let stats = past_stats(&past, day("2024-04-01"), Some("h1"));
        assert_eq!(None, stats.win_rate);
        assert_eq!(None, stats.top3_rate);
        assert_eq!(None, stats.avg_finish_position);
        assert_eq!(Some(31.0), stats.days_since_last_race);
    }

    #[test]
    fn empty_history_is_all_none() {
        assert_eq!(PastStats::default(), past_stats(&[], day("2024-04-01"), None));
    }

    #[test]
    fn undated_history_has_no_layoff() {
        let past = vec![run("h1", 1, None)];
        let stats = past_stats(&past, day("2024-04-01"), Some("h1"));
        assert_eq!(Some(1.0), stats.win_rate);
        assert_eq!(None, stats.days_since_last_race);
    }

    #[test]
    fn filter_falls_back_when_no_row_matches() {
        let past = vec![run("h2", 1, Some("2024-03-01"))];
        let stats = past_stats(&past, day("2024-04-01"), Some("h1"));
        assert_eq!(Some(1.0), stats.win_rate);
    }
}
