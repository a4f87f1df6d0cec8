//! Platform photo-library seam.
//!
//! The engine and collection only ever see [`PhotoLibrary`]. Two
//! implementations ship here: a filesystem-backed one and an in-memory one.

pub mod directory;
pub mod memory;
pub mod thumbnails;

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

use crate::photo::Photo;

pub use directory::DirectoryLibrary;
pub use memory::MemoryLibrary;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("delete rejected: {0}")]
    Rejected(String),
    #[error("library I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Asset metadata as listed by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetRecord {
    pub id: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub file_size_bytes: u64,
    pub title: Option<String>,
}

impl AssetRecord {
    /// Fresh, unanalyzed photo for this asset.
    pub fn into_photo(self) -> Photo {
        let mut photo = Photo::new(self.id, self.path, self.created_at)
            .with_dimensions(self.width, self.height)
            .with_size(self.file_size_bytes);
        photo.title = self.title;
        photo
    }
}

/// One page of a listing plus the upstream total at the time of the call.
#[derive(Debug, Clone, Default)]
pub struct AssetPage {
    pub records: Vec<AssetRecord>,
    pub total_count: usize,
}

/// Access to the user's photo library.
pub trait PhotoLibrary: Send + Sync {
    /// Up to `limit` assets starting at `offset`, newest first.
    fn list_assets(&self, offset: usize, limit: usize) -> Result<AssetPage, LibraryError>;

    /// Reduced-size encoded image, if the platform can produce one.
    fn fetch_thumbnail(&self, photo_id: &str) -> Result<Option<Vec<u8>>, LibraryError>;

    fn fetch_original_bytes(&self, photo_id: &str) -> Result<Option<Vec<u8>>, LibraryError>;

    /// Delete assets, returning the ids that were actually deleted.
    fn delete_assets(&self, ids: &[String]) -> Result<Vec<String>, LibraryError>;
}
