// ============================================================
// Layer 6 — Logging Setup
// ============================================================
// Every run of `train` gets its own directory under the save
// path, named by local start time (MMDD_HHMMSS), holding
// log.txt and metrics.csv. Checkpoints stay one level up so a
// later run can resume from them.
//
// Log lines go to stdout (with colours) and, when a file is
// given, to the file without ANSI escapes. RUST_LOG overrides
// the default `imgcls_train=info` filter.

use anyhow::{Context, Result};
use chrono::Local;
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `<save_path>/<MMDD_HHMMSS>` for a run starting now.
pub fn run_dir(save_path: impl AsRef<Path>) -> PathBuf {
    save_path
        .as_ref()
        .join(Local::now().format("%m%d_%H%M%S").to_string())
}

/// Install the global subscriber. Creates the log file's parent
/// directory if needed.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("imgcls_train=info".parse()?);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Cannot create log directory '{}'", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("Cannot create log file '{}'", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("Logging was already initialised")?;
    Ok(())
}
