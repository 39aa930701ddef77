// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from manifest text to tensor batches:
//
//   manifest.txt
//       │
//       ▼
//   ManifestReader     → (image path, label) entries
//       │
//       ▼
//   ManifestDataset    → Burn Dataset; loads one image lazily,
//       │                runs the augmentation, resizes
//       ▼
//   ImageBatcher       → stacks samples into [N, 3, H, W]
//       │
//       ▼
//   DataLoader         → Burn; shuffling and worker threads

/// Reads tab-separated manifest files
pub mod manifest;

/// Fixed crop/flip/jitter pipeline and the keyed registry
pub mod augment;

/// Implements Burn's Dataset trait for manifest samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
