// ============================================================
// Layer 4 — Manifest Reader
// ============================================================
// Reads a plain-text manifest listing one sample per line:
//
//   <image path>\t[other fields...]\t<label>
//
// The first tab-separated field is the image path (relative
// to the image root), the last field is the integer label.
// Blank lines are skipped. Any other malformed line is fatal:
// a bad label would silently train the wrong class.

use anyhow::{bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::manifest_entry::ManifestEntry;
use crate::domain::traits::SampleSource;

/// Loads a manifest file into ManifestEntries.
/// Implements the SampleSource trait from Layer 3.
pub struct ManifestReader {
    path: PathBuf,
}

impl ManifestReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SampleSource for ManifestReader {
    fn load_all(&self) -> Result<Vec<ManifestEntry>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Cannot read manifest '{}'", self.path.display()))?;

        let entries = parse_manifest(&text, &self.path)?;
        tracing::info!(
            "Loaded {} samples from '{}'",
            entries.len(),
            self.path.display()
        );
        Ok(entries)
    }
}

/// Parse manifest text. `source` is only used in error messages.
pub fn parse_manifest(text: &str, source: &Path) -> Result<Vec<ManifestEntry>> {
    let mut entries = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let image = fields[0].trim();
        let label = fields[fields.len() - 1].trim();

        if fields.len() < 2 || image.is_empty() {
            bail!(
                "{}:{}: expected '<image>\\t<label>', got '{}'",
                source.display(), idx + 1, line
            );
        }

        let label: usize = label.parse().with_context(|| {
            format!("{}:{}: invalid class label '{}'", source.display(), idx + 1, label)
        })?;

        entries.push(ManifestEntry::new(image, label));
    }

    Ok(entries)
}
