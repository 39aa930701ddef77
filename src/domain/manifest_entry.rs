// ============================================================
// Layer 3 — ManifestEntry Domain Type
// ============================================================
// One sample of a training or test manifest: an image path
// (relative to the image root) and its integer class label.
//
// Example manifest line (tab separated, label is last):
//   cats/0001.png	2

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Image path exactly as written in the first manifest field
    pub image: PathBuf,

    /// Class index taken from the last manifest field
    pub label: usize,
}

impl ManifestEntry {
    pub fn new(image: impl Into<PathBuf>, label: usize) -> Self {
        Self { image: image.into(), label }
    }

    /// Full path of the image under `root`.
    /// Absolute manifest paths are returned unchanged.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(&self.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_joins_root() {
        let e = ManifestEntry::new("cats/1.png", 1);
        assert_eq!(e.resolve(Path::new("/data")), PathBuf::from("/data/cats/1.png"));
    }

    #[test]
    fn test_resolve_keeps_absolute_path() {
        let e = ManifestEntry::new("/abs/1.png", 0);
        assert_eq!(e.resolve(Path::new("/data")), PathBuf::from("/abs/1.png"));
    }
}
