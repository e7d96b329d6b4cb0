//! siamese-oneshot CLI - train a siamese network and measure N-way one-shot accuracy.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use siamese_oneshot::train::{evaluate_checkpoint, latest_checkpoint, run_experiment};
use siamese_oneshot::{ExperimentConfig, SplitKind};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "siamese-oneshot")]
#[command(version)]
#[command(about = "Siamese network training with N-way one-shot evaluation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file; built-in defaults are used when it does not exist
    #[arg(short, long, global = true, default_value = "siamese.toml")]
    config: PathBuf,

    /// Overrides the seed from the config file
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train, checkpointing after every evaluation, then save the final model
    Train {
        /// Number of training iterations
        #[arg(long)]
        n_iter: Option<usize>,
    },

    /// Evaluate saved weights on random one-shot tasks
    Evaluate {
        /// Weights file written by `train`; defaults to the newest checkpoint
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Architecture file written by `train`; defaults to the `[model]` section
        #[arg(short, long)]
        architecture: Option<PathBuf>,

        /// Split to draw tasks from
        #[arg(long, value_enum, default_value = "validation")]
        split: SplitKind,

        /// Restrict tasks to one category (alphabet)
        #[arg(long)]
        category: Option<String>,

        /// N in N-way tasks
        #[arg(short = 'n', long)]
        n_way: Option<usize>,

        /// Number of tasks
        #[arg(short = 'k', long)]
        tasks: Option<usize>,
    },
}

fn load_config(path: &Path) -> Result<ExperimentConfig, siamese_oneshot::Error> {
    if path.exists() {
        Ok(ExperimentConfig::from_file(path)?)
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        Ok(ExperimentConfig::default())
    }
}

fn run(cli: Cli) -> Result<(), siamese_oneshot::Error> {
    let mut config = load_config(&cli.config)?;
    if cli.seed.is_some() {
        config.training.seed = cli.seed;
    }

    match cli.command {
        Commands::Train { n_iter } => {
            if let Some(n) = n_iter {
                config.training.n_iter = n;
            }
            let summary = run_experiment(&config)?;
            info!(
                iterations = summary.iterations,
                checkpoints = summary.checkpoints.len(),
                best_accuracy = ?summary.best_accuracy,
                "Training finished"
            );
        }
        Commands::Evaluate { weights, architecture, split, category, n_way, tasks } => {
            if let Some(n) = n_way {
                config.training.n_way = n;
            }
            if let Some(k) = tasks {
                config.training.n_val = k;
            }
            let weights = match weights {
                Some(path) => path,
                None => latest_checkpoint(&config)?,
            };
            let accuracy = evaluate_checkpoint(&config, architecture.as_deref(), &weights, split, category.as_deref())?;
            println!("{:.2}", accuracy);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("failed to install tracing subscriber");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
