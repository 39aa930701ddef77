// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by more than one layer:
//
//   checkpoint.rs    — Saving and loading model + optimizer
//                      state with Burn's CompactRecorder, the
//                      per-checkpoint JSON metadata, and the
//                      resume scan. Also saves/loads TrainConfig
//                      so `predict` can rebuild the model.
//
//   metrics.rs       — Running loss/accuracy meters and the
//                      per-epoch CSV log.
//
//   logging.rs       — tracing subscriber (stdout + run log
//                      file) and the timestamped run directory.
//
//   device_config.rs — The JSON device file and the CPU/GPU
//                      choice derived from it.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving, loading and resume scan
pub mod checkpoint;

/// Running meters and the training metrics CSV logger
pub mod metrics;

/// Subscriber setup and run directory naming
pub mod logging;

/// Device id file parsing
pub mod device_config;
