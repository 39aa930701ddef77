// ============================================================
// Layer 6 — Device Configuration
// ============================================================
// Reads the JSON device file (default ./config.json):
//
//   { "device": "0,1" }
//
// The string is exported as CUDA_VISIBLE_DEVICES for any
// native library that honours it, then parsed into a single
// device choice. "cpu" or "" selects the CPU backend; a list
// of ids selects the first GPU. Only one device is ever used.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub const VISIBLE_DEVICES_VAR: &str = "CUDA_VISIBLE_DEVICES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub device: String,
}

/// Where training and inference run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceChoice {
    Cpu,
    Gpu {
        id:      usize,
        /// Listed after `id`; accepted but not used
        ignored: Vec<usize>,
    },
}

impl DeviceConfig {
    /// A missing or malformed file is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read device config '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed device config '{}'", path.display()))
    }

    pub fn export_visible_devices(&self) {
        std::env::set_var(VISIBLE_DEVICES_VAR, &self.device);
    }

    pub fn choice(&self) -> Result<DeviceChoice> {
        let ids = self.device.trim();
        if ids.is_empty() || ids.eq_ignore_ascii_case("cpu") {
            return Ok(DeviceChoice::Cpu);
        }

        let mut parsed = ids
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<usize>()
                    .with_context(|| format!("Invalid device id '{s}' in \"{}\"", self.device))
            })
            .collect::<Result<Vec<_>>>()?;

        if parsed.is_empty() {
            return Ok(DeviceChoice::Cpu);
        }
        let id = parsed.remove(0);
        Ok(DeviceChoice::Gpu { id, ignored: parsed })
    }
}
