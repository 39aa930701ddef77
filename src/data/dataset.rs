// ============================================================
// Layer 4 — Manifest Dataset
// ============================================================
// Implements Burn's Dataset trait over manifest entries.
// Images are loaded lazily: get(index) reads the file, runs
// the registered augmentation, resizes to (width, height) and
// returns a CHW f32 buffer in [0, 1] plus the label.
//
// Transform failures are recovered here and only here: the
// untransformed image is used and the reason is logged and
// kept on the sample. A missing or undecodable image file is
// fatal, exactly like a missing manifest.

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use image::{imageops::FilterType, RgbImage};
use std::path::{Path, PathBuf};

use crate::data::augment::{TransformRegistry, DEFAULT_DATASET_KEY};
use crate::domain::manifest_entry::ManifestEntry;
use crate::domain::traits::SampleSource;

/// One decoded, transformed and resized sample.
#[derive(Debug, Clone)]
pub struct ImageSample {
    /// Pixels in CHW order, length 3 * height * width
    pub pixels: Vec<f32>,
    pub label:  usize,
    /// Set when the augmentation could not be applied
    pub fallback: Option<String>,
}

pub struct ManifestDataset {
    entries:     Vec<ManifestEntry>,
    image_root:  PathBuf,
    width:       u32,
    height:      u32,
    dataset_key: String,
    registry:    TransformRegistry,
}

impl ManifestDataset {
    pub fn new(
        entries:    Vec<ManifestEntry>,
        image_root: impl Into<PathBuf>,
        width:      u32,
        height:     u32,
        registry:   TransformRegistry,
    ) -> Self {
        Self {
            entries,
            image_root: image_root.into(),
            width,
            height,
            dataset_key: DEFAULT_DATASET_KEY.to_string(),
            registry,
        }
    }

    /// Read every entry from `source` and build the dataset.
    pub fn from_source(
        source:     &impl SampleSource,
        image_root: impl Into<PathBuf>,
        width:      u32,
        height:     u32,
        registry:   TransformRegistry,
    ) -> Result<Self> {
        Ok(Self::new(source.load_all()?, image_root, width, height, registry))
    }

    /// Select which registered pipeline this dataset uses.
    pub fn with_dataset_key(mut self, key: impl Into<String>) -> Self {
        self.dataset_key = key.into();
        self
    }

    /// Load the sample at `index`; Ok(None) past the end.
    pub fn load(&self, index: usize) -> Result<Option<ImageSample>> {
        let Some(entry) = self.entries.get(index) else {
            return Ok(None);
        };
        let path = entry.resolve(&self.image_root);
        let img  = open_rgb(&path)?;

        let outcome  = self.registry.transform(&self.dataset_key, img, index);
        let fallback = outcome.fallback_reason().map(|reason| {
            tracing::warn!("Cannot transform image: {} ({})", path.display(), reason);
            reason.to_string()
        });

        Ok(Some(ImageSample {
            pixels: to_chw(&outcome.into_image(), self.width, self.height),
            label:  entry.label,
            fallback,
        }))
    }
}

impl Dataset<ImageSample> for ManifestDataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        // The loader has no error channel; an unreadable image aborts
        // the run the same way a missing manifest does.
        match self.load(index) {
            Ok(sample) => sample,
            Err(e)     => panic!("{e:#}"),
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Decode an image file as 8-bit RGB.
pub fn open_rgb(path: &Path) -> Result<RgbImage> {
    let img = image::open(path)
        .with_context(|| format!("Cannot load image '{}'", path.display()))?;
    Ok(img.to_rgb8())
}

/// Resize to (width, height) if needed and flatten to CHW f32 in [0, 1].
pub fn to_chw(img: &RgbImage, width: u32, height: u32) -> Vec<f32> {
    let resized;
    let img = if img.dimensions() == (width, height) {
        img
    } else {
        resized = image::imageops::resize(img, width, height, FilterType::Triangle);
        &resized
    };

    let plane = (width * height) as usize;
    let mut chw = vec![0.0f32; plane * 3];
    for (x, y, pixel) in img.enumerate_pixels() {
        let base = (y * width + x) as usize;
        chw[base]             = pixel[0] as f32 / 255.0;
        chw[plane + base]     = pixel[1] as f32 / 255.0;
        chw[2 * plane + base] = pixel[2] as f32 / 255.0;
    }
    chw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::augment::{AugmentationPipeline, CROP_SIZE};
    use image::Rgb;

    fn write_image(dir: &Path, name: &str, size: u32, value: u8) {
        RgbImage::from_pixel(size, size, Rgb([value, value / 2, 0]))
            .save(dir.join(name))
            .unwrap();
    }

    fn registry() -> TransformRegistry {
        TransformRegistry::new().register(DEFAULT_DATASET_KEY, AugmentationPipeline::new(123))
    }

    #[test]
    fn test_len_and_labels_follow_manifest() {
        let temp = tempfile::tempdir().unwrap();
        let labels = [1usize, 0, 4, 2, 1];
        let mut entries = Vec::new();
        for (i, label) in labels.iter().enumerate() {
            let name = format!("img_{i}.png");
            write_image(temp.path(), &name, 40, 200);
            entries.push(ManifestEntry::new(name, *label));
        }

        let ds = ManifestDataset::new(entries, temp.path(), 16, 16, registry());
        assert_eq!(ds.len(), labels.len());
        for (i, label) in labels.iter().enumerate() {
            let sample = ds.get(i).unwrap();
            assert_eq!(sample.label, *label);
            assert_eq!(sample.pixels.len(), 3 * 16 * 16);
            assert!(sample.fallback.is_none());
        }
        assert!(ds.get(labels.len()).is_none());
    }

    #[test]
    fn test_unregistered_key_returns_untransformed_image() {
        let temp = tempfile::tempdir().unwrap();
        write_image(temp.path(), "a.png", CROP_SIZE.0, 100);
        let ds = ManifestDataset::new(
            vec![ManifestEntry::new("a.png", 1)],
            temp.path(),
            CROP_SIZE.0,
            CROP_SIZE.1,
            registry(),
        )
        .with_dataset_key("validation");

        let sample = ds.load(0).unwrap().unwrap();
        assert!(sample.fallback.unwrap().contains("validation"));
        // No jitter, no resize: the raw pixel value survives.
        assert!((sample.pixels[0] - 100.0 / 255.0).abs() < 1e-6);
        assert_eq!(sample.label, 1);
    }

    #[test]
    fn test_small_image_falls_back_and_is_resized() {
        let temp = tempfile::tempdir().unwrap();
        write_image(temp.path(), "tiny.png", 8, 50);
        let ds = ManifestDataset::new(
            vec![ManifestEntry::new("tiny.png", 0)],
            temp.path(),
            24,
            24,
            registry(),
        );

        let sample = ds.load(0).unwrap().unwrap();
        assert!(sample.fallback.unwrap().contains("crop"));
        assert_eq!(sample.pixels.len(), 3 * 24 * 24);
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let ds = ManifestDataset::new(
            vec![ManifestEntry::new("missing.png", 0)],
            temp.path(),
            8,
            8,
            registry(),
        );
        assert!(ds.load(0).is_err());
    }

    #[test]
    fn test_to_chw_layout() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 51]));
        let chw = to_chw(&img, 2, 1);
        assert_eq!(chw, vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.2]);
    }
}
