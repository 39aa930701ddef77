// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits, so a
// different manifest format only needs a new implementation.

use anyhow::Result;

use crate::domain::manifest_entry::ManifestEntry;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any component that can list labelled samples.
///
/// Implementations:
///   - ManifestReader → tab-separated text manifests
pub trait SampleSource {
    /// Load every entry, in file order.
    fn load_all(&self) -> Result<Vec<ManifestEntry>>;
}
