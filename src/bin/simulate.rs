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
use furlong::file::ReadJsonFile;
use furlong::model::gbdt::GbdtModel;
use furlong::predict::PredictionConfig;
use furlong::print;
use furlong::simulate::{
    QuinellaSimulator, ShowSimulator, TrioSimulator, WinSimulator, DEFAULT_TOP_N,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BetKind {
    Show,
    Win,
    Quinella,
    Trio,
}

/// Replays one bet type over a date window and prints the period accounting.
#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// directory to source the race archives from
    dir: Option<PathBuf>,

    /// bet type
    #[clap(short = 'b', long, default_value = "show", value_parser = parse_bet)]
    bet: BetKind,

    /// first race date (YYYY-MM-DD)
    #[clap(short = 'f', long)]
    from: String,

    /// last race date (YYYY-MM-DD)
    #[clap(short = 't', long)]
    to: String,

    /// venues to include (all when omitted)
    #[clap(short = 'v', long)]
    venue: Vec<String>,

    /// horses purchased by the top-N strategies
    #[clap(short = 'n', long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// model artifact to blend into the ranking
    #[clap(short = 'm', long)]
    model: Option<PathBuf>,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        self.dir
            .as_ref()
            .ok_or(anyhow!("data directory must be specified"))?;
        if self.top_n == 0 {
            return Err(anyhow!("top-n must be at least 1"));
        }
        Ok(())
    }
}

fn parse_bet(s: &str) -> anyhow::Result<BetKind> {
    match s.to_lowercase().as_str() {
        "show" | "fukusho" => Ok(BetKind::Show),
        "win" | "tansho" => Ok(BetKind::Win),
        "quinella" | "umaren" => Ok(BetKind::Quinella),
        "trio" | "sanrenpuku" => Ok(BetKind::Trio),
        _ => Err(anyhow!("unsupported bet type {s}")),
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

    let source = data::read_from_dir(args.dir.clone().unwrap())?;
    info!("loaded {} races", source.race_count());

    let model = match &args.model {
        Some(path) => {
            let model = GbdtModel::read_json_file(path)?;
            info!("loaded model with {} trees", model.num_trees());
            Some(Arc::new(model))
        }
        None => None,
    };

    let config = PredictionConfig::default();
    let venues = if args.venue.is_empty() {
        None
    } else {
        Some(args.venue.as_slice())
    };

    let table = match args.bet {
        BetKind::Show => {
            let mut simulator = ShowSimulator::new(&source, config)?;
            if let Some(model) = model {
                simulator = simulator.with_model(model);
            }
            let summary = simulator.simulate_period(&args.from, &args.to, venues, args.top_n)?;
            print::tabulate_summary(&summary, "show")
        }
        BetKind::Win => {
            let mut simulator = WinSimulator::new(&source, config)?;
            if let Some(model) = model {
                simulator = simulator.with_model(model);
            }
            let summary = simulator.simulate_period(&args.from, &args.to, venues, args.top_n)?;
            print::tabulate_summary(&summary, "win")
        }
        BetKind::Quinella => {
            let mut simulator = QuinellaSimulator::new(&source, config)?;
            if let Some(model) = model {
                simulator = simulator.with_model(model);
            }
            let summary = simulator.simulate_period(&args.from, &args.to, venues)?;
            print::tabulate_summary(&summary, "quinella")
        }
        BetKind::Trio => {
            let mut simulator = TrioSimulator::new(&source, config)?;
            if let Some(model) = model {
                simulator = simulator.with_model(model);
            }
            let summary = simulator.simulate_period(&args.from, &args.to, venues)?;
            print::tabulate_summary(&summary, "trio")
        }
    };
    info!("summary:\n{}", Console::default().render(&table));
    Ok(())
}
