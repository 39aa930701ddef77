// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores training state using Burn's CompactRecorder.
//
// What gets saved per checkpoint (one set per save epoch):
//   1. model_epoch_{n}.mpk        — all learned parameters
//   2. optim_epoch_{n}.mpk        — Adam moment estimates
//   3. sched_epoch_{n}.mpk        — learning-rate scheduler step count
//   4. checkpoint_epoch_{n}.json  — epoch, lr, running loss/accuracy
//
// Plus, once per run:
//   train_config.json             — lets `predict` rebuild the model
//
// Resume works by scanning the directory for files with the
// recorder's extension and parsing the number between the last
// '_' and the extension. The highest number wins. Old
// checkpoints are never deleted.
//
// Nothing here validates file contents: a truncated record
// fails inside the recorder and aborts the run.

use anyhow::{bail, Context, Result};
use burn::{
    lr_scheduler::{step::StepLrScheduler, LrScheduler},
    optim::Optimizer,
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::ConvNet;

const CONFIG_FILE: &str = "train_config.json";

/// Sidecar stored next to the record files of one epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub epoch:    usize,
    /// Scheduler rate at the moment of saving
    pub lr:       f64,
    /// Running train loss (mean over every batch so far)
    pub loss:     f64,
    /// Running train accuracy in percent
    pub accuracy: f64,
}

/// Manages saving and loading of checkpoints in one directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the directory
    /// (and parents) if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create save directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing directory without creating it.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn model_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("model_epoch_{epoch}"))
    }

    fn optim_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("optim_epoch_{epoch}"))
    }

    fn scheduler_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("sched_epoch_{epoch}"))
    }

    fn metadata_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("checkpoint_epoch_{epoch}.json"))
    }

    /// Write model, optimizer, scheduler and metadata for `meta.epoch`.
    pub fn save<B, O>(
        &self,
        model:     &ConvNet<B>,
        optim:     &O,
        scheduler: &StepLrScheduler,
        meta:      &CheckpointMetadata,
    ) -> Result<()>
    where
        B: AutodiffBackend,
        O: Optimizer<ConvNet<B>, B>,
    {
        let recorder = CompactRecorder::new();

        let path = self.model_path(meta.epoch);
        Recorder::<B>::record(&recorder, model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        let path = self.optim_path(meta.epoch);
        Recorder::<B>::record(&recorder, optim.to_record(), path.clone())
            .with_context(|| format!("Failed to save optimizer to '{}'", path.display()))?;

        let path = self.scheduler_path(meta.epoch);
        let record = LrScheduler::to_record::<B>(scheduler);
        Recorder::<B>::record(&recorder, record, path.clone())
            .with_context(|| format!("Failed to save scheduler to '{}'", path.display()))?;

        let path = self.metadata_path(meta.epoch);
        fs::write(&path, serde_json::to_string_pretty(meta)?)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {}", meta.epoch);
        Ok(())
    }

    /// Highest epoch with a record file in the directory, if any.
    pub fn latest_epoch<B: Backend>(&self) -> Result<Option<usize>> {
        let extension = <CompactRecorder as FileRecorder<B>>::file_extension();

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot list save directory '{}'", self.dir.display()))?
        {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }

        latest_epoch_in(names, extension)
    }

    /// Restore model, optimizer and scheduler state saved at `epoch`.
    pub fn load<B, O>(
        &self,
        epoch:     usize,
        model:     ConvNet<B>,
        optim:     O,
        scheduler: StepLrScheduler,
        device:    &B::Device,
    ) -> Result<(ConvNet<B>, O, StepLrScheduler, CheckpointMetadata)>
    where
        B: AutodiffBackend,
        O: Optimizer<ConvNet<B>, B>,
    {
        let model = self.load_model(epoch, model, device)?;

        let path = self.optim_path(epoch);
        let record: O::Record = Recorder::<B>::load(&CompactRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load optimizer state '{}'", path.display()))?;
        let optim = optim.load_record(record);

        let path = self.scheduler_path(epoch);
        let record: <StepLrScheduler as LrScheduler>::Record<B> =
            Recorder::<B>::load(&CompactRecorder::new(), path.clone(), device)
                .with_context(|| format!("Cannot load scheduler state '{}'", path.display()))?;
        let scheduler = LrScheduler::load_record::<B>(scheduler, record);

        let meta = self.load_metadata(epoch)?;
        tracing::info!("Restored checkpoint from epoch {}", meta.epoch);
        Ok((model, optim, scheduler, meta))
    }

    /// Restore only the model weights saved at `epoch`.
    pub fn load_model<B: Backend>(
        &self,
        epoch:  usize,
        model:  ConvNet<B>,
        device: &B::Device,
    ) -> Result<ConvNet<B>> {
        let path = self.model_path(epoch);
        let record = Recorder::<B>::load(&CompactRecorder::new(), path.clone(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", path.display()))?;
        Ok(model.load_record(record))
    }

    pub fn load_metadata(&self, epoch: usize) -> Result<CheckpointMetadata> {
        let path = self.metadata_path(epoch);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read checkpoint metadata '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed checkpoint metadata '{}'", path.display()))
    }

    /// Save the training configuration so `predict` can rebuild the model.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Have you run 'train' first?",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Pick the highest epoch among file names ending in `.{extension}`.
/// The epoch is the text between the last '_' and the extension.
pub fn latest_epoch_in<I>(names: I, extension: &str) -> Result<Option<usize>>
where
    I: IntoIterator<Item = String>,
{
    let suffix = format!(".{extension}");
    let mut latest: Option<usize> = None;

    for name in names {
        let Some(stem) = name.strip_suffix(&suffix) else {
            continue;
        };
        let digits = match stem.rfind('_') {
            Some(pos) => &stem[pos + 1..],
            None      => bail!("Checkpoint file '{name}' has no '_<epoch>' suffix"),
        };
        let epoch: usize = digits
            .parse()
            .with_context(|| format!("Checkpoint file '{name}' has a non-numeric epoch"))?;
        latest = latest.max(Some(epoch));
    }

    Ok(latest)
}
