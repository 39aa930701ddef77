// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Resume → train epochs → checkpoint / evaluate on schedule.
//
//   1. Scan the save directory for the newest checkpoint and
//      restore model, Adam state and scheduler from it.
//   2. For every epoch from the one after the restored epoch:
//        scheduler step → forward + loss → backward → Adam step
//        update running loss/accuracy, log every LOG_EVERY batches
//   3. epoch % save_freq == 0 → write a new checkpoint
//   4. epoch % test_freq == 0 → evaluate on the test set
//
// Backends:
//   - Training runs on an Autodiff backend (NdArray or Wgpu)
//   - model.valid() returns the model on the inner backend,
//     so the test batcher is built for B::InnerBackend
//   - argmax(1) returns [batch, 1]; flatten before .equal()
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice},
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::sync::Arc;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    dataset::ManifestDataset,
};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointMetadata},
    device_config::DeviceChoice,
    metrics::{AverageMeter, EpochMetrics, EvalMetrics, MetricsLogger, RunningAccuracy},
};
use crate::ml::{
    model::{ConvNet, ConvNetConfig, ImageClassifier},
    scheduler::{next_lr, step_lr, StepUnit},
    CpuBackend, GpuBackend,
};

/// Progress is logged after every LOG_EVERY-th batch.
pub const LOG_EVERY: usize = 2;

/// What a finished run did.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSummary {
    /// First epoch trained in this run (restored epoch + 1)
    pub start_epoch:       usize,
    /// Newest epoch the model has seen, restored or trained
    pub last_epoch:        usize,
    pub checkpoint_epochs: Vec<usize>,
    pub eval_epochs:       Vec<usize>,
    /// Rate used by the last Adam update
    pub final_lr:          f64,
}

pub fn checkpoint_due(epoch: usize, save_freq: usize) -> bool {
    epoch % save_freq == 0
}

pub fn eval_due(epoch: usize, test_freq: usize) -> bool {
    epoch % test_freq == 0
}

/// Epochs are numbered from 1; a restored epoch n resumes at n + 1.
pub fn start_epoch(restored: Option<usize>) -> usize {
    restored.map_or(1, |epoch| epoch + 1)
}

/// Pick the backend for `device` and run the loop on it.
pub fn run_training(
    cfg:          &TrainConfig,
    device:       &DeviceChoice,
    train_ds:     ManifestDataset,
    test_ds:      ManifestDataset,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
) -> Result<TrainingSummary> {
    match device {
        DeviceChoice::Cpu => {
            tracing::info!("using cpu");
            train_loop::<CpuBackend>(cfg, NdArrayDevice::Cpu, train_ds, test_ds, ckpt_manager, metrics)
        }
        DeviceChoice::Gpu { id, ignored } => {
            if !ignored.is_empty() {
                tracing::warn!("Training on a single device; ignoring device ids {:?}", ignored);
            }
            let wgpu_device = WgpuDevice::DiscreteGpu(*id);
            tracing::info!("Using WGPU device: {:?}", wgpu_device);
            train_loop::<GpuBackend>(cfg, wgpu_device, train_ds, test_ds, ckpt_manager, metrics)
        }
    }
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    device:       B::Device,
    train_ds:     ManifestDataset,
    test_ds:      ManifestDataset,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
) -> Result<TrainingSummary> {

    // ── Build model, optimiser, scheduler ────────────────────────────────────
    let mut model: ConvNet<B> = ConvNetConfig::new(cfg.num_classes).init(&device);
    let mut optim = AdamConfig::new().init();
    let mut scheduler = step_lr(cfg.init_lr, cfg.lr_step_size, cfg.lr_gamma)?;
    let mut lr = cfg.init_lr;
    tracing::info!(
        "Model ready: {} classes, Adam lr={}, StepLR step_size={} gamma={} per {:?}",
        cfg.num_classes, cfg.init_lr, cfg.lr_step_size, cfg.lr_gamma, cfg.lr_step_unit
    );

    // ── Resume-check ─────────────────────────────────────────────────────────
    let restored = ckpt_manager.latest_epoch::<B>()?;
    if let Some(epoch) = restored {
        let (m, o, s, meta) = ckpt_manager.load(epoch, model, optim, scheduler, &device)?;
        model     = m;
        optim     = o;
        scheduler = s;
        lr        = meta.lr;
        tracing::info!(
            "Resuming after epoch {} (lr={:.6}, loss={:.4}, accu={:.2})",
            epoch, meta.lr, meta.loss, meta.accuracy
        );
    }
    let first_epoch = start_epoch(restored);

    // ── Data loaders ─────────────────────────────────────────────────────────
    let train_iters = train_ds.len() / cfg.batch_size;
    let test_iters  = test_ds.len() / cfg.batch_size;

    let mut train_builder = DataLoaderBuilder::new(
        ImageBatcher::<B>::new(device.clone(), cfg.width, cfg.height),
    )
    .batch_size(cfg.batch_size)
    .shuffle(cfg.seed);
    if cfg.num_workers > 0 {
        train_builder = train_builder.num_workers(cfg.num_workers);
    }
    let train_loader = train_builder.build(train_ds);

    // Evaluation runs without autodiff
    let mut test_builder = DataLoaderBuilder::new(
        ImageBatcher::<B::InnerBackend>::new(device.clone(), cfg.width, cfg.height),
    )
    .batch_size(cfg.batch_size);
    if cfg.num_workers > 0 {
        test_builder = test_builder.num_workers(cfg.num_workers);
    }
    let test_loader = test_builder.build(test_ds);

    // ── Epoch loop ───────────────────────────────────────────────────────────
    // Running meters span the whole process, never reset per epoch.
    let mut losses   = AverageMeter::new();
    let mut accuracy = RunningAccuracy::new();
    let mut summary  = TrainingSummary {
        start_epoch:       first_epoch,
        last_epoch:        restored.unwrap_or(0),
        checkpoint_epochs: Vec::new(),
        eval_epochs:       Vec::new(),
        final_lr:          lr,
    };

    tracing::info!("start training!");
    for epoch in first_epoch..=cfg.epochs {
        if cfg.lr_step_unit == StepUnit::Epoch {
            lr = next_lr::<B>(&mut scheduler);
        }

        // ── Train-epoch ──────────────────────────────────────────────────────
        for (i, batch) in train_loader.iter().enumerate() {
            let batch_len = batch.labels.dims()[0];
            let (logits, loss) = model.predict_with_loss(batch.images, batch.labels.clone());
            let loss_value: f64 = loss.clone().into_scalar().elem::<f64>();

            if cfg.lr_step_unit == StepUnit::Batch {
                lr = next_lr::<B>(&mut scheduler);
            }
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(lr, model, grads);

            losses.update(loss_value);
            accuracy.update(count_correct(logits, batch.labels), batch_len);

            if (i + 1) % LOG_EVERY == 0 {
                tracing::info!(
                    "Epoch:{}/{}, Iter:{}/{}, Loss:{:.4}, Accu:{:.2}, lr:{:.4}",
                    epoch, cfg.epochs, i + 1, train_iters,
                    losses.average(), accuracy.percent(), lr,
                );
            }
        }

        // ── Checkpoint ───────────────────────────────────────────────────────
        if checkpoint_due(epoch, cfg.save_freq) {
            let meta = CheckpointMetadata {
                epoch,
                lr,
                loss:     losses.average(),
                accuracy: accuracy.percent(),
            };
            ckpt_manager.save(&model, &optim, &scheduler, &meta)?;
            summary.checkpoint_epochs.push(epoch);
            tracing::info!("Checkpoint saved for epoch {}", epoch);
        }

        // ── Evaluate-epoch ───────────────────────────────────────────────────
        let eval = if eval_due(epoch, cfg.test_freq) {
            summary.eval_epochs.push(epoch);
            Some(evaluate(&model.valid(), &test_loader, epoch, cfg.epochs, test_iters))
        } else {
            None
        };

        metrics.log(&EpochMetrics {
            epoch,
            train_loss: losses.average(),
            train_acc:  accuracy.percent(),
            lr,
            eval,
        })?;
        summary.last_epoch = epoch;
        summary.final_lr   = lr;
    }

    tracing::info!("Training complete!");
    Ok(summary)
}

/// One pass over the test loader with the non-autodiff model.
fn evaluate<B: Backend>(
    model:  &ConvNet<B>,
    loader: &Arc<dyn DataLoader<ImageBatch<B>>>,
    epoch:  usize,
    epochs: usize,
    iters:  usize,
) -> EvalMetrics {
    let mut losses   = AverageMeter::new();
    let mut accuracy = RunningAccuracy::new();

    for (i, batch) in loader.iter().enumerate() {
        let batch_len = batch.labels.dims()[0];
        let (logits, loss) = model.predict_with_loss(batch.images, batch.labels.clone());

        losses.update(loss.into_scalar().elem::<f64>());
        accuracy.update(count_correct(logits, batch.labels), batch_len);

        if (i + 1) % LOG_EVERY == 0 {
            tracing::info!("Epoch:{}/{}, Iter:{}/{}", epoch, epochs, i + 1, iters);
        }
    }

    let result = EvalMetrics { loss: losses.average(), accuracy: accuracy.percent() };
    tracing::info!(
        "Epoch:{}/{}, Test Loss:{:.4}, Test Accu:{:.2}",
        epoch, epochs, result.loss, result.accuracy
    );
    result
}

/// Number of rows whose argmax matches the label.
fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::augment::{AugmentationPipeline, TransformRegistry, DEFAULT_DATASET_KEY};
    use crate::domain::manifest_entry::ManifestEntry;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};
    use std::path::Path;

    #[test]
    fn test_checkpoints_due_at_multiples_of_save_freq() {
        let due: Vec<usize> = (1..=12).filter(|e| checkpoint_due(*e, 5)).collect();
        assert_eq!(due, vec![5, 10]);
    }

    #[test]
    fn test_eval_due_at_multiples_of_test_freq() {
        let due: Vec<usize> = (1..=12).filter(|e| eval_due(*e, 5)).collect();
        assert_eq!(due, vec![5, 10]);
    }

    #[test]
    fn test_start_epoch_after_restore() {
        assert_eq!(start_epoch(None), 1);
        assert_eq!(start_epoch(Some(12)), 13);
    }

    #[test]
    fn test_count_correct() {
        let device = Default::default();
        let logits = Tensor::<NdArray<f32>, 2>::from_floats(
            [[0.9, 0.1], [0.2, 0.8], [0.7, 0.3]],
            &device,
        );
        let labels = Tensor::<NdArray<f32>, 1, Int>::from_ints([0, 1, 1], &device);
        assert_eq!(count_correct(logits, labels), 2);
    }

    fn dataset(root: &Path, count: usize) -> ManifestDataset {
        let mut entries = Vec::new();
        for i in 0..count {
            let name = format!("img_{i}.png");
            let shade = if i % 2 == 0 { 30 } else { 220 };
            RgbImage::from_pixel(36, 36, Rgb([shade, shade, shade]))
                .save(root.join(&name))
                .unwrap();
            entries.push(ManifestEntry::new(name, i % 2));
        }
        let registry = TransformRegistry::new()
            .register(DEFAULT_DATASET_KEY, AugmentationPipeline::new(123));
        ManifestDataset::new(entries, root, 8, 8, registry)
    }

    #[test]
    fn test_train_then_resume_on_cpu() {
        let temp = tempfile::tempdir().unwrap();
        let save = temp.path().join("save");
        let cfg = TrainConfig {
            epochs:     2,
            width:      8,
            height:     8,
            batch_size: 2,
            save_freq:  1,
            test_freq:  2,
            save_path:  save.to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };
        let ckpt    = CheckpointManager::new(&save).unwrap();
        let metrics = MetricsLogger::new(&save.join("run1")).unwrap();

        let summary = run_training(
            &cfg,
            &DeviceChoice::Cpu,
            dataset(temp.path(), 4),
            dataset(temp.path(), 2),
            &ckpt,
            &metrics,
        )
        .unwrap();
        assert_eq!(summary.start_epoch, 1);
        assert_eq!(summary.last_epoch, 2);
        assert_eq!(summary.checkpoint_epochs, vec![1, 2]);
        assert_eq!(summary.eval_epochs, vec![2]);

        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 3);

        // A second run picks up after epoch 2.
        let cfg = TrainConfig { epochs: 3, ..cfg };
        let summary = run_training(
            &cfg,
            &DeviceChoice::Cpu,
            dataset(temp.path(), 4),
            dataset(temp.path(), 2),
            &ckpt,
            &MetricsLogger::new(&save.join("run2")).unwrap(),
        )
        .unwrap();
        assert_eq!(summary.start_epoch, 3);
        assert_eq!(summary.checkpoint_epochs, vec![3]);
        assert!(summary.eval_epochs.is_empty());
        assert_eq!(ckpt.latest_epoch::<CpuBackend>().unwrap(), Some(3));
    }

    #[test]
    fn test_resumed_lr_matches_uninterrupted_run() {
        let temp = tempfile::tempdir().unwrap();
        // 2 batches per epoch; the rate halves after every 3 updates.
        let cfg = |save: &Path, epochs: usize| TrainConfig {
            epochs,
            width:        8,
            height:       8,
            batch_size:   2,
            save_freq:    1,
            test_freq:    10,
            init_lr:      0.8,
            lr_step_size: 3,
            lr_gamma:     0.5,
            lr_step_unit: StepUnit::Batch,
            save_path:    save.to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };
        let train = |save: &Path, epochs: usize| {
            run_training(
                &cfg(save, epochs),
                &DeviceChoice::Cpu,
                dataset(temp.path(), 4),
                dataset(temp.path(), 2),
                &CheckpointManager::new(save).unwrap(),
                &MetricsLogger::new(&save.join(format!("run{epochs}"))).unwrap(),
            )
            .unwrap()
        };

        let straight = temp.path().join("straight");
        let uninterrupted = train(&straight, 2);
        assert_eq!(uninterrupted.final_lr, 0.4);

        let split = temp.path().join("split");
        assert_eq!(train(&split, 1).final_lr, 0.8);
        let resumed = train(&split, 2);
        assert_eq!(resumed.start_epoch, 2);
        assert_eq!(resumed.final_lr, uninterrupted.final_lr);

        let meta = CheckpointManager::new(&split).unwrap().load_metadata(2).unwrap();
        assert_eq!(meta.lr, 0.4);
    }
}
