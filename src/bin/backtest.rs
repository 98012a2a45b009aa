use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::anyhow;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use furlong::backtest::{BacktestConfig, BacktestEngine, RetrainInterval};
use furlong::data;
use furlong::domain::parse_date;
use furlong::print;

/// Runs the walk-forward backtest over a date window and reports per-race
/// predictions against the recorded finish.
#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// directory to source the race archives from
    dir: Option<PathBuf>,

    /// first race date (YYYY-MM-DD)
    #[clap(short = 'f', long)]
    from: String,

    /// last race date (YYYY-MM-DD)
    #[clap(short = 't', long)]
    to: String,

    /// retrain interval
    #[clap(short = 'i', long, default_value = "weekly", value_parser = parse_interval)]
    interval: RetrainInterval,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        self.dir
            .as_ref()
            .ok_or(anyhow!("data directory must be specified"))?;
        Ok(())
    }
}

fn parse_interval(s: &str) -> anyhow::Result<RetrainInterval> {
    s.parse()
        .map_err(|_| anyhow!("unsupported retrain interval {s}"))
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let start_time = Instant::now();
    let source = data::read_from_dir(args.dir.unwrap())?;
    info!("loaded {} races", source.race_count());

    let mut config = BacktestConfig::new(parse_date(&args.from)?, parse_date(&args.to)?);
    config.retrain_interval = args.interval;
    let mut engine = BacktestEngine::new(source, config)?;

    let mut results = Vec::new();
    let mut top_pick_placed = 0usize;
    for result in engine.by_ref() {
        if let Some(first) = result.predictions.first() {
            if (1..=3).contains(&first.actual_rank) {
                top_pick_placed += 1;
            }
        }
        results.push(result);
    }

    let elapsed = start_time.elapsed();
    info!(
        "backtested {} races ({} retrains) in {}s",
        results.len(),
        engine.retrain_count(),
        elapsed.as_millis() as f64 / 1_000.
    );
    if !results.is_empty() {
        info!(
            "top pick placed in {}/{} races ({:.1}%)",
            top_pick_placed,
            results.len(),
            top_pick_placed as f64 / results.len() as f64 * 100.0
        );
        info!(
            "results:\n{}",
            Console::default().render(&print::tabulate_backtest(&results))
        );
    }
    Ok(())
}
