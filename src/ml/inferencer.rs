// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the network from train_config.json, loads the
// newest model record and classifies single images. Images
// are resized to the training geometry without augmentation.
// Runs on a plain (non-autodiff) backend, so dropout is off.

use anyhow::{anyhow, Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, wgpu::WgpuDevice, NdArray, Wgpu},
    prelude::*,
    tensor::activation::softmax,
};
use std::path::Path;

use crate::data::dataset::{open_rgb, to_chw};
use crate::domain::prediction::Prediction;
use crate::infra::{checkpoint::CheckpointManager, device_config::DeviceChoice};
use crate::ml::model::{ConvNet, ConvNetConfig, ImageClassifier};

pub struct Inferencer<B: Backend> {
    model:  ConvNet<B>,
    epoch:  usize,
    width:  u32,
    height: u32,
    device: B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg   = ckpt_manager.load_config()?;
        let epoch = ckpt_manager
            .latest_epoch::<B>()?
            .with_context(|| {
                format!("No checkpoint found in '{}'", ckpt_manager.dir().display())
            })?;

        let model: ConvNet<B> = ConvNetConfig::new(cfg.num_classes).init(&device);
        let model = ckpt_manager.load_model(epoch, model, &device)?;
        tracing::info!("Model loaded from checkpoint epoch {}", epoch);

        Ok(Self { model, epoch, width: cfg.width, height: cfg.height, device })
    }

    pub fn predict(&self, image: &Path) -> Result<Prediction> {
        let img    = open_rgb(image)?;
        let pixels = to_chw(&img, self.width, self.height);
        let input  = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [1, 3, self.height as usize, self.width as usize]),
            &self.device,
        );

        let probs: Vec<f32> = softmax(self.model.predict(input), 1)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read class probabilities: {e:?}"))?;

        let (class, probability) = probs
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best });

        tracing::debug!("'{}' → class {} (p={:.4})", image.display(), class, probability);
        Ok(Prediction { class, probability, epoch: self.epoch })
    }
}

/// Load the newest checkpoint on the chosen device and classify `image`.
pub fn classify(
    ckpt_manager: &CheckpointManager,
    device:       &DeviceChoice,
    image:        &Path,
) -> Result<Prediction> {
    match device {
        DeviceChoice::Cpu => {
            Inferencer::<NdArray>::from_checkpoint(ckpt_manager, NdArrayDevice::Cpu)?.predict(image)
        }
        DeviceChoice::Gpu { id, .. } => {
            Inferencer::<Wgpu>::from_checkpoint(ckpt_manager, WgpuDevice::DiscreteGpu(*id))?
                .predict(image)
        }
    }
}
