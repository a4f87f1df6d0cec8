use anyhow::Result;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ThumbnailConfig;

/// Generates thumbnails on first request and keeps them on disk, keyed by asset id.
pub struct ThumbnailManager {
    cache_dir: PathBuf,
    size: u32,
}

impl ThumbnailManager {
    pub fn new(config: &ThumbnailConfig) -> Self {
        Self {
            cache_dir: config.path.clone(),
            size: config.size,
        }
    }

    fn ensure_cache_dir(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    fn cache_path(&self, asset_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.jpg", asset_id))
    }

    /// Thumbnail bytes for `original`, generating them if not cached yet.
    pub fn load_or_generate(&self, asset_id: &str, original: &Path) -> Result<Vec<u8>> {
        let cache_path = self.cache_path(asset_id);
        if let Ok(bytes) = fs::read(&cache_path) {
            return Ok(bytes);
        }

        self.ensure_cache_dir()?;

        let img = image::open(original)?;
        let thumbnail = DynamicImage::ImageRgb8(img.thumbnail(self.size, self.size).to_rgb8());
        thumbnail.save(&cache_path)?;

        Ok(fs::read(&cache_path)?)
    }

    /// Drop a cached thumbnail. Missing files are fine.
    pub fn remove(&self, asset_id: &str) {
        let _ = fs::remove_file(self.cache_path(asset_id));
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_generates_then_reuses_cached_file() {
        let dir = tempdir().unwrap();
        let original = dir.path().join("big.png");
        RgbImage::from_pixel(1600, 800, image::Rgb([10, 200, 10]))
            .save(&original)
            .unwrap();

        let manager = ThumbnailManager::new(&ThumbnailConfig {
            path: dir.path().join("thumbs"),
            size: 256,
        });

        let bytes = manager.load_or_generate("abc", &original).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!(thumb.dimensions(), (256, 128));
        assert!(manager.cache_dir().join("abc.jpg").exists());

        std::fs::remove_file(&original).unwrap();
        assert_eq!(manager.load_or_generate("abc", &original).unwrap(), bytes);

        manager.remove("abc");
        assert!(manager.load_or_generate("abc", &original).is_err());
    }
}
