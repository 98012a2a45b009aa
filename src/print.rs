//! Console tabulation of predictions, backtest output and simulator
//! summaries.

use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Cell, Col, Row, Table};

use crate::domain::{PredictionResult, RaceBacktestResult};
use crate::simulate::Summary;

fn fmt_score(score: Option<f64>) -> String {
    match score {
        Some(score) => format!("{score:.1}"),
        None => "-".to_string(),
    }
}

pub fn tabulate_predictions(predictions: &[PredictionResult]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(4))),
            Col::new(Styles::default().with(MinWidth(4))),
            Col::new(Styles::default().with(MinWidth(20))),
            Col::new(Styles::default().with(MinWidth(8))),
            Col::new(Styles::default().with(MinWidth(8))),
            Col::new(Styles::default().with(MinWidth(8))),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Rank".into(),
                "No.".into(),
                "Horse".into(),
                "P(top3)".into(),
                "Total".into(),
                "Combined".into(),
            ],
        ));
    table.push_rows(predictions.iter().map(|prediction| {
        Row::new(
            Styles::default(),
            vec![
                Cell::new(
                    Styles::default().with(HAlign::Right),
                    format!("{}", prediction.rank).into(),
                ),
                Cell::new(
                    Styles::default().with(HAlign::Right),
                    format!("{}", prediction.horse_number).into(),
                ),
                Cell::new(Styles::default(), prediction.horse_name.clone().into()),
                Cell::new(
                    Styles::default().with(HAlign::Right),
                    format!("{:.3}", prediction.ml_probability).into(),
                ),
                Cell::new(
                    Styles::default().with(HAlign::Right),
                    fmt_score(prediction.total_score).into(),
                ),
                Cell::new(
                    Styles::default().with(HAlign::Right),
                    fmt_score(prediction.combined_score).into(),
                ),
            ],
        )
    }));
    table
}

fn top_numbers(result: &RaceBacktestResult, n: usize) -> String {
    let numbers: Vec<String> = result
        .predictions
        .iter()
        .take(n)
        .map(|scored| scored.prediction.horse_number.to_string())
        .collect();
    numbers.join("-")
}

fn placed_numbers(result: &RaceBacktestResult) -> String {
    let mut placed: Vec<_> = result
        .predictions
        .iter()
        .filter(|scored| (1..=3).contains(&scored.actual_rank))
        .collect();
    placed.sort_by_key(|scored| scored.actual_rank);
    let numbers: Vec<String> = placed
        .iter()
        .map(|scored| scored.prediction.horse_number.to_string())
        .collect();
    numbers.join("-")
}

pub fn tabulate_backtest(results: &[RaceBacktestResult]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(12))),
            Col::new(Styles::default().with(MinWidth(24))),
            Col::new(Styles::default().with(MinWidth(8))),
            Col::new(Styles::default().with(MinWidth(10))),
            Col::new(Styles::default().with(MinWidth(10))),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Date".into(),
                "Race".into(),
                "Venue".into(),
                "Predicted".into(),
                "Placed".into(),
            ],
        ));
    table.push_rows(results.iter().map(|result| {
        Row::new(
            Styles::default(),
            vec![
                Cell::new(
                    Styles::default(),
                    result.race_date.format("%Y-%m-%d").to_string().into(),
                ),
                Cell::new(Styles::default(), result.race_name.clone().into()),
                Cell::new(Styles::default(), result.venue.clone().into()),
                Cell::new(
                    Styles::default().with(HAlign::Right),
                    top_numbers(result, 3).into(),
                ),
                Cell::new(
                    Styles::default().with(HAlign::Right),
                    placed_numbers(result).into(),
                ),
            ],
        )
    }));
    table
}

pub fn tabulate_summary<R>(summary: &Summary<R>, bet_type: &str) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(18))),
            Col::new(Styles::default().with(MinWidth(14))),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["Metric".into(), bet_type.to_string().into()],
        ));
    let rows: Vec<(&str, String)> = vec![
        ("Period", format!("{} - {}", summary.period_from, summary.period_to)),
        ("Races", format!("{}", summary.total_races)),
        ("Bets", format!("{}", summary.total_bets)),
        ("Hits", format!("{}", summary.total_hits)),
        ("Hit rate", format!("{:.1}%", summary.hit_rate * 100.0)),
        ("Investment", format!("{} yen", summary.total_investment)),
        ("Payout", format!("{} yen", summary.total_payout)),
        ("Return rate", format!("{:.1}%", summary.return_rate * 100.0)),
    ];
    table.push_rows(rows.into_iter().map(|(metric, value)| {
        Row::new(
            Styles::default(),
            vec![
                Cell::new(Styles::default(), metric.into()),
                Cell::new(Styles::default().with(HAlign::Right), value.into()),
            ],
        )
    }));
    table
}
