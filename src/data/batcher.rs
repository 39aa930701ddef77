// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements Burn's Batcher trait to stack ImageSamples into
// tensors:
//
//   Input:  Vec of N ImageSamples, each 3 * H * W floats
//   Output: ImageBatch { images: [N, 3, H, W], labels: [N] }
//
// Every sample was already resized to the same (H, W) by the
// dataset, so stacking is a flatten + reshape.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::ImageSample;

/// A batch of images ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Shape: [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,

    /// Class indices — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

/// Holds the target device and image geometry.
#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
    pub width:  usize,
    pub height: usize,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, width: u32, height: u32) -> Self {
        Self { device, width: width as usize, height: height as usize }
    }
}

impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let batch_size = items.len();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|s| s.label as i32)
            .collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, 3, self.height, self.width]),
            &self.device,
        );

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn sample(value: f32, label: usize) -> ImageSample {
        ImageSample { pixels: vec![value; 3 * 4 * 2], label, fallback: None }
    }

    #[test]
    fn test_batch_shapes() {
        let batcher = ImageBatcher::<TestBackend>::new(Default::default(), 2, 4);
        let batch = batcher.batch(vec![sample(0.1, 0), sample(0.9, 3), sample(0.5, 1)]);
        assert_eq!(batch.images.dims(), [3, 3, 4, 2]);
        assert_eq!(batch.labels.dims(), [3]);
    }

    #[test]
    fn test_labels_keep_sample_order() {
        let batcher = ImageBatcher::<TestBackend>::new(Default::default(), 2, 4);
        let batch = batcher.batch(vec![sample(0.0, 2), sample(0.0, 0)]);
        let labels: Vec<i64> = batch
            .labels
            .into_data()
            .convert::<i64>()
            .to_vec::<i64>()
            .unwrap();
        assert_eq!(labels, vec![2, 0]);
    }
}
