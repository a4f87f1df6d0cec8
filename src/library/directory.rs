//! Photo library backed by a directory tree.
//!
//! Images are discovered with `walkdir`, filtered by extension and ordered
//! newest first by modification time. Asset ids are the hex SHA-256 of the
//! file path, so they stay stable across runs.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::thumbnails::ThumbnailManager;
use super::{AssetPage, AssetRecord, LibraryError, PhotoLibrary};
use crate::config::Config;
use crate::trash::TrashManager;

pub struct DirectoryLibrary {
    root: PathBuf,
    extensions: Vec<String>,
    assets: Mutex<Vec<AssetRecord>>,
    thumbnails: Option<ThumbnailManager>,
    trash: TrashManager,
}

/// Stable opaque id for a file path.
pub fn asset_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

fn map_io(err: std::io::Error, what: &Path) -> LibraryError {
    match err.kind() {
        ErrorKind::PermissionDenied => LibraryError::PermissionDenied(what.display().to_string()),
        ErrorKind::NotFound => LibraryError::NotFound(what.display().to_string()),
        _ => LibraryError::Io(err),
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            extensions.iter().any(|e| e.to_lowercase() == ext_lower)
        })
        .unwrap_or(false)
}

fn discover(root: &Path, extensions: &[String]) -> Result<Vec<AssetRecord>, LibraryError> {
    // Surface an unreadable or missing root instead of returning an empty library.
    std::fs::read_dir(root).map_err(|e| map_io(e, root))?;

    let mut records = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !entry.file_type().is_file() || !has_extension(path, extensions) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable file");
                continue;
            }
        };

        let created_at: DateTime<Utc> = metadata
            .modified()
            .or_else(|_| metadata.created())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        let (width, height) = image::image_dimensions(path).unwrap_or((0, 0));

        records.push(AssetRecord {
            id: asset_id(path),
            path: path.to_path_buf(),
            created_at,
            width,
            height,
            file_size_bytes: metadata.len(),
            title: path.file_name().map(|n| n.to_string_lossy().to_string()),
        });
    }

    records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.path.cmp(&b.path)));
    Ok(records)
}

impl DirectoryLibrary {
    pub fn new(
        root: impl Into<PathBuf>,
        extensions: Vec<String>,
        thumbnails: Option<ThumbnailManager>,
        trash: TrashManager,
    ) -> Result<Self, LibraryError> {
        let root = root.into();
        let assets = discover(&root, &extensions)?;
        tracing::info!(root = %root.display(), assets = assets.len(), "Photo library indexed");

        Ok(Self {
            root,
            extensions,
            assets: Mutex::new(assets),
            thumbnails,
            trash,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LibraryError> {
        Self::new(
            config.library.path.clone(),
            config.library.image_extensions.clone(),
            Some(ThumbnailManager::new(&config.thumbnails)),
            TrashManager::new(config.trash.clone()),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-walk the root, picking up added and removed files.
    pub fn refresh(&self) -> Result<usize, LibraryError> {
        let assets = discover(&self.root, &self.extensions)?;
        let count = assets.len();
        *self.assets.lock() = assets;
        Ok(count)
    }

    fn path_for(&self, photo_id: &str) -> Result<PathBuf, LibraryError> {
        self.assets
            .lock()
            .iter()
            .find(|a| a.id == photo_id)
            .map(|a| a.path.clone())
            .ok_or_else(|| LibraryError::NotFound(photo_id.to_string()))
    }
}

impl PhotoLibrary for DirectoryLibrary {
    fn list_assets(&self, offset: usize, limit: usize) -> Result<AssetPage, LibraryError> {
        let assets = self.assets.lock();
        Ok(AssetPage {
            records: assets.iter().skip(offset).take(limit).cloned().collect(),
            total_count: assets.len(),
        })
    }

    fn fetch_thumbnail(&self, photo_id: &str) -> Result<Option<Vec<u8>>, LibraryError> {
        let Some(ref thumbnails) = self.thumbnails else {
            return Ok(None);
        };
        let path = self.path_for(photo_id)?;

        match thumbnails.load_or_generate(photo_id, &path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "No thumbnail, falling back to original");
                Ok(None)
            }
        }
    }

    fn fetch_original_bytes(&self, photo_id: &str) -> Result<Option<Vec<u8>>, LibraryError> {
        let path = self.path_for(photo_id)?;
        std::fs::read(&path).map(Some).map_err(|e| map_io(e, &path))
    }

    fn delete_assets(&self, ids: &[String]) -> Result<Vec<String>, LibraryError> {
        let targets: Vec<(String, PathBuf)> = {
            let assets = self.assets.lock();
            assets
                .iter()
                .filter(|a| ids.contains(&a.id))
                .map(|a| (a.id.clone(), a.path.clone()))
                .collect()
        };

        let mut deleted = Vec::new();
        let mut last_error = None;
        for (id, path) in targets {
            match self.trash.discard(&path) {
                Ok(_) => {
                    if let Some(ref thumbnails) = self.thumbnails {
                        thumbnails.remove(&id);
                    }
                    deleted.push(id);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to delete photo");
                    last_error = Some(e);
                }
            }
        }

        self.assets.lock().retain(|a| !deleted.contains(&a.id));

        match last_error {
            Some(e) if deleted.is_empty() => Err(LibraryError::Rejected(e.to_string())),
            _ => Ok(deleted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrashConfig;
    use image::RgbImage;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn library_in(root: &Path, trash_dir: &Path) -> DirectoryLibrary {
        DirectoryLibrary::new(
            root,
            vec!["jpg".to_string(), "png".to_string()],
            None,
            TrashManager::new(TrashConfig {
                enabled: true,
                path: trash_dir.to_path_buf(),
            }),
        )
        .unwrap()
    }

    fn touch(path: &Path, age_secs: u64) {
        let file = File::create(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs))
            .unwrap();
    }

    #[test]
    fn test_discovers_images_newest_first() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("photos");
        fs::create_dir_all(root.join("sub")).unwrap();
        touch(&root.join("old.jpg"), 3000);
        touch(&root.join("new.png"), 10);
        touch(&root.join("sub/mid.JPG"), 600);
        touch(&root.join("notes.txt"), 5);

        let library = library_in(&root, &dir.path().join("trash"));
        let page = library.list_assets(0, 10).unwrap();

        let titles: Vec<_> = page.records.iter().filter_map(|r| r.title.clone()).collect();
        assert_eq!(titles, vec!["new.png", "mid.JPG", "old.jpg"]);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.records[0].id, asset_id(&root.join("new.png")));
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let dir = tempdir().unwrap();
        let result = DirectoryLibrary::new(
            dir.path().join("nope"),
            vec!["jpg".to_string()],
            None,
            TrashManager::new(TrashConfig::default()),
        );
        assert!(matches!(result, Err(LibraryError::NotFound(_))));
    }

    #[test]
    fn test_reads_bytes_and_dimensions() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("photos");
        fs::create_dir_all(&root).unwrap();
        let path = root.join("a.png");
        RgbImage::from_pixel(40, 30, image::Rgb([1, 2, 3])).save(&path).unwrap();

        let library = library_in(&root, &dir.path().join("trash"));
        let record = library.list_assets(0, 1).unwrap().records.remove(0);
        assert_eq!((record.width, record.height), (40, 30));

        let bytes = library.fetch_original_bytes(&record.id).unwrap().unwrap();
        assert_eq!(bytes, fs::read(&path).unwrap());
        assert_eq!(library.fetch_thumbnail(&record.id).unwrap(), None);
        assert!(matches!(
            library.fetch_original_bytes("unknown"),
            Err(LibraryError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_moves_to_trash_and_drops_listing() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("photos");
        fs::create_dir_all(&root).unwrap();
        touch(&root.join("a.jpg"), 10);
        touch(&root.join("b.jpg"), 20);

        let trash_dir = dir.path().join("trash");
        let library = library_in(&root, &trash_dir);
        let id_a = asset_id(&root.join("a.jpg"));

        let deleted = library.delete_assets(&[id_a.clone()]).unwrap();
        assert_eq!(deleted, vec![id_a]);
        assert!(!root.join("a.jpg").exists());
        assert_eq!(fs::read_dir(&trash_dir).unwrap().count(), 1);
        assert_eq!(library.list_assets(0, 10).unwrap().total_count, 1);
    }

    #[test]
    fn test_delete_of_vanished_file_is_rejected() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("photos");
        fs::create_dir_all(&root).unwrap();
        touch(&root.join("a.jpg"), 10);

        let library = library_in(&root, &dir.path().join("trash"));
        let id = asset_id(&root.join("a.jpg"));
        fs::remove_file(root.join("a.jpg")).unwrap();

        assert!(matches!(
            library.delete_assets(&[id]),
            Err(LibraryError::Rejected(_))
        ));
        assert_eq!(library.list_assets(0, 10).unwrap().total_count, 1);
    }

    #[test]
    fn test_refresh_picks_up_new_files() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("photos");
        fs::create_dir_all(&root).unwrap();
        let library = library_in(&root, &dir.path().join("trash"));
        assert_eq!(library.list_assets(0, 10).unwrap().total_count, 0);

        touch(&root.join("late.jpg"), 1);
        assert_eq!(library.refresh().unwrap(), 1);
    }
}
