use serde::{Deserialize, Serialize};

/// Result of classifying a single image with a trained checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Index of the most probable class
    pub class: usize,

    /// Softmax probability of `class`, in [0, 1]
    pub probability: f32,

    /// Epoch of the checkpoint that produced the prediction
    pub epoch: usize,
}
