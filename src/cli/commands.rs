// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `predict`, and all
// of their configurable flags.
//
// clap's derive macros generate --help text, error messages
// for missing args and string → number conversion.

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::ml::scheduler::StepUnit;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the classifier, resuming from the newest checkpoint in --save-path
    Train(TrainArgs),

    /// Classify one image with the newest checkpoint in --save-path
    Predict(PredictArgs),
}

/// When the learning-rate scheduler advances
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum StepUnitArg {
    /// After every optimizer step
    Batch,
    /// After every completed epoch
    Epoch,
}

impl From<StepUnitArg> for StepUnit {
    fn from(a: StepUnitArg) -> Self {
        match a {
            StepUnitArg::Batch => StepUnit::Batch,
            StepUnitArg::Epoch => StepUnit::Epoch,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Number of epochs to train (epochs are numbered from 1)
    #[arg(long, default_value_t = 10)]
    pub epoch: usize,

    /// Training manifest: one `<image path>\t...\t<label>` per line
    #[arg(long, default_value = "data/train.txt")]
    pub train_data_path: String,

    /// Test manifest, same format as the training manifest
    #[arg(long, default_value = "data/test.txt")]
    pub test_data_path: String,

    /// Directory that manifest image paths are relative to
    #[arg(long, default_value = ".")]
    pub image_root: String,

    /// Width every sample is resized to before batching
    #[arg(long, default_value_t = 32)]
    pub width: u32,

    /// Height every sample is resized to before batching
    #[arg(long, default_value_t = 32)]
    pub height: u32,

    /// Number of samples per training batch
    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Initial learning rate for Adam
    #[arg(long, default_value_t = 0.001)]
    pub init_lr: f64,

    /// Evaluate on the test set every N epochs
    #[arg(long, default_value_t = 5)]
    pub test_freq: usize,

    /// Directory holding checkpoints and per-run log directories
    #[arg(long, default_value = "./save")]
    pub save_path: String,

    /// Write a checkpoint every N epochs
    #[arg(long, default_value_t = 5)]
    pub save_freq: usize,

    /// Accepted for compatibility with existing launch scripts; not used
    #[arg(long, default_value_t = 5)]
    pub devides: usize,

    /// Background data-loading workers (0 loads batches on the training thread)
    #[arg(long, default_value_t = 0)]
    pub num_workers: usize,

    /// Number of output classes
    #[arg(long, default_value_t = 2)]
    pub num_classes: usize,

    /// JSON file with the device id string, e.g. {"device": "0"}
    #[arg(long, default_value = "./config.json")]
    pub config: String,

    /// Seed for augmentation and shuffling
    #[arg(long, default_value_t = 123)]
    pub seed: u64,

    /// Scheduler steps between learning-rate decays
    #[arg(long, default_value_t = 1)]
    pub lr_step_size: usize,

    /// Multiplicative learning-rate decay factor
    #[arg(long, default_value_t = 0.1)]
    pub lr_gamma: f64,

    /// Whether the scheduler steps per batch or per epoch
    #[arg(long, value_enum, default_value_t = StepUnitArg::Batch)]
    pub lr_step_unit: StepUnitArg,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            epochs:          a.epoch,
            train_manifest:  a.train_data_path,
            test_manifest:   a.test_data_path,
            image_root:      a.image_root,
            width:           a.width,
            height:          a.height,
            batch_size:      a.batch_size,
            init_lr:         a.init_lr,
            test_freq:       a.test_freq,
            save_path:       a.save_path,
            save_freq:       a.save_freq,
            devides:         a.devides,
            num_workers:     a.num_workers,
            num_classes:     a.num_classes,
            device_config:   a.config,
            seed:            a.seed,
            lr_step_size:    a.lr_step_size,
            lr_gamma:        a.lr_gamma,
            lr_step_unit:    a.lr_step_unit.into(),
        }
    }
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image file to classify
    #[arg(long)]
    pub image: String,

    /// Directory where `train` wrote its checkpoints
    #[arg(long, default_value = "./save")]
    pub save_path: String,

    /// JSON file with the device id string
    #[arg(long, default_value = "./config.json")]
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_script_defaults() {
        let cli = Cli::parse_from(["imgcls-train", "train"]);
        let Commands::Train(args) = cli.command else {
            panic!("expected train subcommand");
        };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.epochs, 10);
        assert_eq!((cfg.width, cfg.height), (32, 32));
        assert_eq!(cfg.batch_size, 16);
        assert_eq!(cfg.test_freq, 5);
        assert_eq!(cfg.save_freq, 5);
        assert_eq!(cfg.num_classes, 2);
        assert_eq!(cfg.seed, 123);
        assert_eq!(cfg.lr_step_unit, StepUnit::Batch);
        assert!((cfg.init_lr - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_epoch_step_unit_flag() {
        let cli = Cli::parse_from([
            "imgcls-train", "train", "--lr-step-unit", "epoch", "--save-freq", "3",
        ]);
        let Commands::Train(args) = cli.command else {
            panic!("expected train subcommand");
        };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.lr_step_unit, StepUnit::Epoch);
        assert_eq!(cfg.save_freq, 3);
    }

    #[test]
    fn test_predict_requires_image() {
        assert!(Cli::try_parse_from(["imgcls-train", "predict"]).is_err());
    }
}
