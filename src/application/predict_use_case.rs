// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Classify one image with the newest checkpoint:
//   1. Read the device file and pick CPU or GPU
//   2. Open the save directory written by `train`
//   3. Hand off to the inferencer (Layer 5)

use anyhow::{Context, Result};
use std::path::Path;

use crate::domain::prediction::Prediction;
use crate::infra::{checkpoint::CheckpointManager, device_config::DeviceConfig};
use crate::ml::inferencer;

pub struct PredictUseCase {
    save_path:     String,
    device_config: String,
}

impl PredictUseCase {
    pub fn new(save_path: String, device_config: String) -> Self {
        Self { save_path, device_config }
    }

    pub fn classify(&self, image: impl AsRef<Path>) -> Result<Prediction> {
        let device_cfg = DeviceConfig::load(&self.device_config)?;
        device_cfg.export_visible_devices();
        let device = device_cfg.choice()?;

        let ckpt_manager = CheckpointManager::open(&self.save_path);
        let image = image.as_ref();
        inferencer::classify(&ckpt_manager, &device, image)
            .with_context(|| format!("Cannot classify '{}'", image.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_untrained_save_path_is_reported() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp.path().join("config.json");
        fs::write(&config, r#"{"device": ""}"#).unwrap();

        let use_case = PredictUseCase::new(
            temp.path().join("save").to_string_lossy().into_owned(),
            config.to_string_lossy().into_owned(),
        );
        let err = use_case.classify(temp.path().join("x.png")).unwrap_err();
        assert!(format!("{err:#}").contains("Have you run 'train' first?"));
    }
}
