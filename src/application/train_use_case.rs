// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration
//   Step 2: Read the device file, pick CPU or GPU (Layer 6)
//   Step 3: Register the augmentation pipeline       (Layer 4)
//   Step 4: Read both manifests into datasets        (Layer 4)
//   Step 5: Prepare the save directory, save config  (Layer 6)
//   Step 6: Open the per-run metrics CSV             (Layer 6)
//   Step 7: Run the training loop                    (Layer 5)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    augment::{AugmentationPipeline, TransformRegistry, DEFAULT_DATASET_KEY},
    dataset::ManifestDataset,
    manifest::ManifestReader,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    device_config::DeviceConfig,
    metrics::MetricsLogger,
};
use crate::ml::{
    model::MIN_INPUT_SIZE,
    scheduler::StepUnit,
    trainer::{run_training, TrainingSummary},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Saved as train_config.json
// next to the checkpoints so `predict` can rebuild the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs:         usize,
    pub train_manifest: String,
    pub test_manifest:  String,
    pub image_root:     String,
    pub width:          u32,
    pub height:         u32,
    pub batch_size:     usize,
    pub init_lr:        f64,
    pub test_freq:      usize,
    pub save_path:      String,
    pub save_freq:      usize,
    /// Accepted and recorded, never read
    pub devides:        usize,
    pub num_workers:    usize,
    pub num_classes:    usize,
    pub device_config:  String,
    pub seed:           u64,
    pub lr_step_size:   usize,
    pub lr_gamma:       f64,
    pub lr_step_unit:   StepUnit,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs:         10,
            train_manifest: "data/train.txt".to_string(),
            test_manifest:  "data/test.txt".to_string(),
            image_root:     ".".to_string(),
            width:          32,
            height:         32,
            batch_size:     16,
            init_lr:        0.001,
            test_freq:      5,
            save_path:      "./save".to_string(),
            save_freq:      5,
            devides:        5,
            num_workers:    0,
            num_classes:    2,
            device_config:  "./config.json".to_string(),
            seed:           123,
            lr_step_size:   1,
            lr_gamma:       0.1,
            lr_step_unit:   StepUnit::Batch,
        }
    }
}

impl TrainConfig {
    /// Reject values that would crash or silently misbehave mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.width < MIN_INPUT_SIZE || self.height < MIN_INPUT_SIZE {
            bail!(
                "--width and --height must be at least {MIN_INPUT_SIZE} (got {}x{})",
                self.width, self.height
            );
        }
        if self.batch_size == 0 {
            bail!("--batch-size must be positive");
        }
        if self.save_freq == 0 || self.test_freq == 0 {
            bail!("--save-freq and --test-freq must be positive");
        }
        if self.num_classes < 2 {
            bail!("--num-classes must be at least 2 (got {})", self.num_classes);
        }
        if self.lr_step_size == 0 {
            bail!("--lr-step-size must be positive");
        }
        if self.lr_gamma.is_nan() || self.lr_gamma <= 0.0 {
            bail!("--lr-gamma must be positive (got {})", self.lr_gamma);
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config:  TrainConfig,
    /// Timestamped directory holding this run's log and metrics
    run_dir: PathBuf,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig, run_dir: PathBuf) -> Self {
        Self { config, run_dir }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingSummary> {
        let cfg = &self.config;

        // ── Step 1: Validate ─────────────────────────────────────────────────
        cfg.validate()?;

        // ── Step 2: Device ───────────────────────────────────────────────────
        let device_cfg = DeviceConfig::load(&cfg.device_config)?;
        device_cfg.export_visible_devices();
        let device = device_cfg.choice()?;
        tracing::info!("Device ids: \"{}\" → {:?}", device_cfg.device, device);

        // ── Step 3: Augmentation ─────────────────────────────────────────────
        let pipeline = AugmentationPipeline::new(cfg.seed);
        tracing::info!("Augmentation: {}", pipeline.describe());
        let registry = TransformRegistry::new().register(DEFAULT_DATASET_KEY, pipeline);

        // ── Step 4: Datasets ─────────────────────────────────────────────────
        let train_ds = ManifestDataset::from_source(
            &ManifestReader::new(&cfg.train_manifest),
            &cfg.image_root,
            cfg.width,
            cfg.height,
            registry.clone(),
        )?;
        let test_ds = ManifestDataset::from_source(
            &ManifestReader::new(&cfg.test_manifest),
            &cfg.image_root,
            cfg.width,
            cfg.height,
            registry,
        )?;
        tracing::info!(
            "Samples: {} train, {} test",
            burn::data::dataset::Dataset::len(&train_ds),
            burn::data::dataset::Dataset::len(&test_ds),
        );

        // ── Step 5: Checkpoint directory + config ────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.save_path)?;
        ckpt_manager.save_config(cfg)?;

        // ── Step 6: Metrics CSV ──────────────────────────────────────────────
        let metrics = MetricsLogger::new(&self.run_dir)?;

        // ── Step 7: Training loop (Layer 5) ──────────────────────────────────
        run_training(cfg, &device, train_ds, test_ds, &ckpt_manager, &metrics)
    }
}
