// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model, optimiser and backend code lives here.
//
//   model.rs      — ConvNet: three conv/relu/pool blocks, global
//                   average pool, linear head; cross-entropy
//                   loss behind the ImageClassifier trait
//
//   scheduler.rs  — Step learning-rate decay, stepped per batch
//                   or per epoch
//
//   trainer.rs    — Resume, epoch loop, checkpoint and
//                   evaluation schedule
//
//   inferencer.rs — Loads the newest checkpoint and classifies
//                   one image
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

use burn::backend::{Autodiff, NdArray, Wgpu};

/// Training backend when the device config selects the CPU
pub type CpuBackend = Autodiff<NdArray>;

/// Training backend for a GPU device id
pub type GpuBackend = Autodiff<Wgpu>;

/// Convolutional classifier and the predict / predict-with-loss interface
pub mod model;

/// StepLR-style learning-rate schedule
pub mod scheduler;

/// Full training loop with resume, checkpointing and evaluation
pub mod trainer;

/// Inference engine — loads checkpoint and classifies an image
pub mod inferencer;
