use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, info};

use typequest::config::Config;
use typequest::engine::key_stats::KeyStatsStore;
use typequest::engine::scoring::star_rating;
use typequest::engine::weakness::WeaknessEstimator;
use typequest::generator::markov::{MarkovGenerator, MarkovModel};
use typequest::session::replay::ReplayLog;

#[derive(Parser)]
#[command(name = "typequest", version, about = "Gamified typing tutor core")]
struct Cli {
    #[arg(short, long, global = true, help = "Path to a config file")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a practice sentence from a Markov chain
    Generate {
        #[arg(short, long, help = "Minimum number of tokens")]
        min_length: Option<usize>,

        #[arg(short, long, help = "Markov order (tokens of context)")]
        order: Option<usize>,

        #[arg(short, long, help = "Seed for reproducible output")]
        seed: Option<u64>,

        #[arg(long, help = "Train on this text file instead of the bundled corpus")]
        corpus: Option<PathBuf>,

        #[arg(long, help = "Prefer sentences containing these characters")]
        focus: Option<String>,
    },
    /// Replay a recorded keystroke log and report the results
    Replay {
        #[arg(help = "JSON file with `text` and `keystrokes`")]
        log: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Generate {
            min_length,
            order,
            seed,
            corpus,
            focus,
        } => {
            let order = order.unwrap_or(config.markov_order);
            let model = match corpus {
                Some(path) => {
                    let text = fs::read_to_string(&path)
                        .with_context(|| format!("reading corpus {}", path.display()))?;
                    let mut model = MarkovModel::new(order)?;
                    model.train(&text);
                    model
                }
                None => MarkovModel::with_default_corpus(order)?,
            };
            let mut generator = MarkovGenerator::seeded(model, seed.or(config.seed));
            let focus_keys: Vec<char> = focus.unwrap_or_default().chars().collect();
            let min_length = min_length.unwrap_or(config.min_length);
            println!("{}", generator.generate_focused(min_length, &focus_keys));
        }
        Command::Replay { log } => {
            let log = ReplayLog::load(&log)?;
            let mut store = KeyStatsStore::new();
            let record = log.run(config.base_points, &mut store)?;
            info!(keystrokes = log.keystrokes.len(), "replayed log");

            match record {
                Some(record) => {
                    println!("WPM:       {:.1}", record.wpm);
                    println!("Accuracy:  {:.1}%", record.accuracy);
                    println!("Duration:  {:.1}s", record.duration_secs);
                    println!("Max combo: {}", record.max_combo);
                    println!("Score:     {}", record.score);
                    println!("Stars:     {}", star_rating(&record));
                }
                None => println!("Session not completed; no record."),
            }

            let estimator = WeaknessEstimator::new(config.estimator_params());
            println!();
            println!("{:<5} {:>9} {:>10} {:>5}", "key", "accuracy", "confidence", "weak");
            for r in estimator.analyze_all_keys(&store) {
                println!(
                    "{:<5} {:>8.1}% {:>10.2} {:>5}",
                    format!("{:?}", r.key),
                    r.accuracy_estimate * 100.0,
                    r.confidence,
                    if r.is_weak { "yes" } else { "" }
                );
            }
        }
    }

    Ok(())
}
