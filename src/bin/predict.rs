use std::env;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use tracing::{debug, info};

use furlong::data;
use furlong::data::DataSource;
use furlong::file::ReadJsonFile;
use furlong::model::gbdt::GbdtModel;
use furlong::predict::{OddsSource, PredictionConfig, PredictionService};
use furlong::print;

/// Scores one archived race and prints the ranked outlook.
#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// directory to source the race archives from
    dir: Option<PathBuf>,

    /// race id to score
    #[clap(short = 'r', long)]
    race: String,

    /// model artifact to blend into the ranking
    #[clap(short = 'm', long)]
    model: Option<PathBuf>,

    /// read odds and popularity from the entries instead of the latest start
    #[clap(short = 'l', long, default_value_t = false)]
    live: bool,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        self.dir
            .as_ref()
            .ok_or(anyhow!("data directory must be specified"))?;
        Ok(())
    }
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

    let source = data::read_from_dir(args.dir.unwrap())?;
    info!("loaded {} races", source.race_count());

    let mut config = PredictionConfig::default();
    if args.live {
        config.odds_source = OddsSource::Live;
    }
    let mut service = PredictionService::new(config)?;
    if let Some(path) = &args.model {
        let model = GbdtModel::read_json_file(path)?;
        info!("loaded model with {} trees", model.num_trees());
        service.set_model(Some(Arc::new(model)));
    }

    let resulted = source.resulted_race(&args.race)?;
    let card = resulted.to_card();
    let predictions = service.predict(&source, &card)?;
    if predictions.is_empty() {
        info!("{} is a debut race, nothing to score", card.race.name);
        return Ok(());
    }
    info!(
        "{} ({}, {}m {}) on {}:\n{}",
        card.race.name,
        card.race.venue,
        card.race.distance,
        card.race.surface,
        card.race.date.format("%Y-%m-%d"),
        Console::default().render(&print::tabulate_predictions(&predictions))
    );
    Ok(())
}
