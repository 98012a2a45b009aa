use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::anyhow;
use clap::Parser;
use tracing::{debug, info};

use furlong::backtest;
use furlong::data;
use furlong::domain::parse_date;
use furlong::file::WriteJsonFile;
use furlong::model::{Trainer, TrainerProfile};
use furlong::predict::PredictionConfig;

/// Fits a top-3 classifier from a race archive directory and writes the JSON
/// model artifact.
#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// directory to source the race archives from
    dir: Option<PathBuf>,

    /// only train on races before this date (YYYY-MM-DD)
    #[clap(short = 'c', long)]
    cutoff: String,

    /// file to write the model artifact to
    #[clap(short = 'o', long, default_value = "model.json")]
    out: PathBuf,

    /// trainer profile
    #[clap(short = 'p', long, default_value = "normal", value_parser = parse_profile)]
    profile: TrainerProfile,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        self.dir
            .as_ref()
            .ok_or(anyhow!("data directory must be specified"))?;
        Ok(())
    }
}

fn parse_profile(s: &str) -> anyhow::Result<TrainerProfile> {
    s.parse()
        .map_err(|_| anyhow!("unsupported trainer profile {s}"))
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

    let cutoff = parse_date(&args.cutoff)?;
    let start_time = Instant::now();
    let source = data::read_from_dir(args.dir.unwrap())?;
    info!("loaded {} races", source.race_count());

    let prediction = PredictionConfig::default();
    let (rows, labels) = backtest::build_training_data(&source, &prediction, cutoff)?;
    info!("built {} training rows before {cutoff}", rows.len());

    let trainer = Trainer::new(args.profile);
    let model = trainer.fit(&rows, &labels)?;
    model.write_json_file(&args.out)?;

    let elapsed = start_time.elapsed();
    info!(
        "trained {} trees in {}s, artifact written to {}",
        model.num_trees(),
        elapsed.as_millis() as f64 / 1_000.,
        args.out.to_str().unwrap()
    );
    Ok(())
}
