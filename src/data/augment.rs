// ============================================================
// Layer 4 — Augmentation Pipeline
// ============================================================
// A fixed composition applied to every training and test
// sample, each step with probability 1:
//
//   1. random crop to CROP_SIZE
//   2. horizontal flip
//   3. brightness/contrast jitter: v' = v * alpha + beta * 255
//      alpha = 1 + U(-CONTRAST_LIMIT, CONTRAST_LIMIT)
//      beta  =     U(-BRIGHTNESS_LIMIT, BRIGHTNESS_LIMIT)
//
// Nothing here is configurable apart from the seed. Every
// sample draws from its own RNG derived from (seed, index), so
// results do not depend on which loader worker fetched it.
//
// Pipelines are looked up by dataset key in a TransformRegistry.
// A failed transform (unknown key, image smaller than the crop)
// yields TransformOutcome::Fallback carrying the untouched image
// and the reason, instead of an error.

use image::RgbImage;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashMap;

/// Fixed crop window (width, height)
pub const CROP_SIZE: (u32, u32) = (32, 32);
pub const BRIGHTNESS_LIMIT: f32 = 0.2;
pub const CONTRAST_LIMIT: f32 = 0.2;

/// Dataset key the training driver registers its pipeline under
pub const DEFAULT_DATASET_KEY: &str = "train";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AugmentError {
    #[error("image is {width}x{height}, smaller than the {crop_w}x{crop_h} crop window")]
    TooSmallForCrop {
        width:  u32,
        height: u32,
        crop_w: u32,
        crop_h: u32,
    },

    #[error("no transform registered for dataset key '{0}'")]
    UnknownKey(String),
}

/// What happened to one image on its way through the registry.
#[derive(Debug, Clone)]
pub enum TransformOutcome {
    Applied(RgbImage),
    Fallback { image: RgbImage, reason: AugmentError },
}

impl TransformOutcome {
    pub fn into_image(self) -> RgbImage {
        match self {
            TransformOutcome::Applied(image)           => image,
            TransformOutcome::Fallback { image, .. }   => image,
        }
    }

    pub fn fallback_reason(&self) -> Option<&AugmentError> {
        match self {
            TransformOutcome::Applied(_)                => None,
            TransformOutcome::Fallback { reason, .. }   => Some(reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AugmentationPipeline {
    seed: u64,
}

impl AugmentationPipeline {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn describe(&self) -> String {
        format!(
            "random_crop={}x{} hflip_p=1.00 brightness=±{:.2} contrast=±{:.2} seed={}",
            CROP_SIZE.0, CROP_SIZE.1, BRIGHTNESS_LIMIT, CONTRAST_LIMIT, self.seed
        )
    }

    /// Run crop → flip → jitter for the sample at `index`.
    pub fn apply(&self, img: &RgbImage, index: usize) -> Result<RgbImage, AugmentError> {
        let mut rng = StdRng::seed_from_u64(self.seed ^ index as u64);

        let mut out = random_crop(img, CROP_SIZE.0, CROP_SIZE.1, &mut rng)?;
        image::imageops::flip_horizontal_in_place(&mut out);
        brightness_contrast(&mut out, BRIGHTNESS_LIMIT, CONTRAST_LIMIT, &mut rng);
        Ok(out)
    }
}

/// Pipelines keyed by dataset name.
#[derive(Debug, Clone, Default)]
pub struct TransformRegistry {
    pipelines: HashMap<String, AugmentationPipeline>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, key: impl Into<String>, pipeline: AugmentationPipeline) -> Self {
        self.pipelines.insert(key.into(), pipeline);
        self
    }

    pub fn get(&self, key: &str) -> Option<&AugmentationPipeline> {
        self.pipelines.get(key)
    }

    /// Transform `img` with the pipeline under `key`.
    /// Never fails: errors become TransformOutcome::Fallback.
    pub fn transform(&self, key: &str, img: RgbImage, index: usize) -> TransformOutcome {
        let result = match self.get(key) {
            Some(pipeline) => pipeline.apply(&img, index),
            None           => Err(AugmentError::UnknownKey(key.to_string())),
        };
        match result {
            Ok(out)     => TransformOutcome::Applied(out),
            Err(reason) => TransformOutcome::Fallback { image: img, reason },
        }
    }
}

fn random_crop(
    img: &RgbImage,
    crop_w: u32,
    crop_h: u32,
    rng: &mut impl Rng,
) -> Result<RgbImage, AugmentError> {
    let (width, height) = img.dimensions();
    if width < crop_w || height < crop_h {
        return Err(AugmentError::TooSmallForCrop { width, height, crop_w, crop_h });
    }
    let x = rng.gen_range(0..=width - crop_w);
    let y = rng.gen_range(0..=height - crop_h);
    Ok(image::imageops::crop_imm(img, x, y, crop_w, crop_h).to_image())
}

fn brightness_contrast(
    img: &mut RgbImage,
    brightness_limit: f32,
    contrast_limit: f32,
    rng: &mut impl Rng,
) {
    let alpha = 1.0 + rng.gen_range(-contrast_limit..contrast_limit);
    let beta  = rng.gen_range(-brightness_limit..brightness_limit) * 255.0;
    for pixel in img.pixels_mut() {
        for c in 0..3 {
            let v = pixel[c] as f32 * alpha + beta;
            pixel[c] = v.clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]))
    }

    #[test]
    fn test_output_has_crop_size() {
        let out = AugmentationPipeline::new(123).apply(&gradient(48, 40), 0).unwrap();
        assert_eq!(out.dimensions(), CROP_SIZE);
    }

    #[test]
    fn test_same_seed_and_index_is_reproducible() {
        let img = gradient(64, 64);
        let p = AugmentationPipeline::new(7);
        assert_eq!(p.apply(&img, 5).unwrap(), p.apply(&img, 5).unwrap());
    }

    #[test]
    fn test_flip_is_always_applied() {
        // Exact-size input: the crop is the whole image, so column 0 of the
        // output comes from the last input column (jitter keeps ordering).
        let img = gradient(32, 32);
        let out = AugmentationPipeline::new(1).apply(&img, 0).unwrap();
        assert!(out.get_pixel(0, 0)[0] > out.get_pixel(31, 0)[0]);
    }

    #[test]
    fn test_small_image_is_a_crop_error() {
        let err = AugmentationPipeline::new(1).apply(&gradient(16, 40), 0).unwrap_err();
        assert_eq!(
            err,
            AugmentError::TooSmallForCrop { width: 16, height: 40, crop_w: 32, crop_h: 32 }
        );
    }

    #[test]
    fn test_unknown_key_falls_back_to_original() {
        let registry = TransformRegistry::new()
            .register(DEFAULT_DATASET_KEY, AugmentationPipeline::new(1));
        let img = gradient(40, 40);

        let outcome = registry.transform("val", img.clone(), 0);
        assert_eq!(
            outcome.fallback_reason(),
            Some(&AugmentError::UnknownKey("val".into()))
        );
        assert_eq!(outcome.into_image(), img);
    }

    #[test]
    fn test_registered_key_applies_pipeline() {
        let registry = TransformRegistry::new()
            .register(DEFAULT_DATASET_KEY, AugmentationPipeline::new(1));
        let outcome = registry.transform(DEFAULT_DATASET_KEY, gradient(40, 40), 3);
        assert!(outcome.fallback_reason().is_none());
        assert_eq!(outcome.into_image().dimensions(), CROP_SIZE);
    }
}
