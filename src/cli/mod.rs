// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`   — trains the classifier from manifest files,
//                  resuming from the newest checkpoint on disk
//   2. `predict` — loads the newest checkpoint and classifies
//                  a single image
//
// Logging is set up here rather than in main() because the
// training log file lives inside a per-run directory that is
// only known once --save-path has been parsed.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};

use crate::infra::logging;

/// The main CLI struct — clap generates the argument parser
/// from the field attributes via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "imgcls-train",
    version = "0.1.0",
    about = "Train an image classifier from tab-separated manifests, then classify images."
)]
pub struct Cli {
    /// The subcommand to run (train or predict)
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

/// Handles the `train` subcommand.
/// Creates the timestamped run directory, starts logging into
/// it, converts CLI args into a TrainConfig and hands off.
fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let run_dir = logging::run_dir(&args.save_path);
    logging::init(Some(&run_dir.join("log.txt")))?;

    tracing::info!("Run directory: {}", run_dir.display());
    tracing::info!(
        "Train manifest: {} | test manifest: {}",
        args.train_data_path, args.test_data_path
    );

    let use_case = TrainUseCase::new(args.into(), run_dir);
    let summary  = use_case.execute()?;

    println!(
        "Training finished at epoch {} ({} checkpoint(s) written).",
        summary.last_epoch,
        summary.checkpoint_epochs.len()
    );
    Ok(())
}

/// Handles the `predict` subcommand.
fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    logging::init(None)?;

    let use_case   = PredictUseCase::new(args.save_path.clone(), args.config.clone());
    let prediction = use_case.classify(&args.image)?;

    println!(
        "\nClass: {} (p={:.4}, checkpoint epoch {})",
        prediction.class, prediction.probability, prediction.epoch
    );
    Ok(())
}
