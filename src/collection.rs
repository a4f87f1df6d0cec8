//! Ordered, incrementally loaded view of the photo library.

use std::collections::HashSet;

use crate::library::{LibraryError, PhotoLibrary};
use crate::photo::Photo;

/// Photos materialized so far, in the order the library returned them, plus
/// the upstream total.
#[derive(Debug, Clone, Default)]
pub struct PhotoCollection {
    photos: Vec<Photo>,
    total_asset_count: usize,
}

impl PhotoCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection over already-built photos, with no further upstream assets.
    pub fn from_photos(photos: Vec<Photo>) -> Self {
        let total_asset_count = photos.len();
        Self {
            photos,
            total_asset_count,
        }
    }

    /// Replace the contents with the first `limit` assets of the library.
    /// On error nothing changes.
    pub fn load_initial(
        &mut self,
        library: &dyn PhotoLibrary,
        limit: usize,
    ) -> Result<usize, LibraryError> {
        let page = library.list_assets(0, limit)?;
        let loaded = page.records.len();

        self.photos = page.records.into_iter().map(|r| r.into_photo()).collect();
        self.total_asset_count = page.total_count.max(self.photos.len());

        tracing::info!(loaded, total = self.total_asset_count, "Loaded initial photos");
        Ok(loaded)
    }

    /// Append up to `additional` assets following the ones already loaded.
    pub fn load_more(
        &mut self,
        library: &dyn PhotoLibrary,
        additional: usize,
    ) -> Result<usize, LibraryError> {
        if self.remaining() == 0 || additional == 0 {
            return Ok(0);
        }

        let page = library.list_assets(self.photos.len(), additional)?;

        // Guard against the listing shifting underneath us.
        let known: HashSet<&str> = self.photos.iter().map(|p| p.id.as_str()).collect();
        let fresh: Vec<Photo> = page
            .records
            .into_iter()
            .filter(|r| !known.contains(r.id.as_str()))
            .map(|r| r.into_photo())
            .collect();
        let loaded = fresh.len();

        self.photos.extend(fresh);
        self.total_asset_count = page.total_count.max(self.photos.len());

        tracing::debug!(loaded, total = self.total_asset_count, "Loaded more photos");
        Ok(loaded)
    }

    /// Remove photos with the given ids, keeping survivors in order.
    pub fn remove(&mut self, ids: &HashSet<String>) -> usize {
        let before = self.photos.len();
        self.photos.retain(|p| !ids.contains(&p.id));
        let removed = before - self.photos.len();
        self.total_asset_count = self.total_asset_count.saturating_sub(removed);
        removed
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub(crate) fn photos_mut(&mut self) -> &mut [Photo] {
        &mut self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn total_asset_count(&self) -> usize {
        self.total_asset_count
    }

    /// Assets that exist upstream but are not loaded yet.
    pub fn remaining(&self) -> usize {
        self.total_asset_count.saturating_sub(self.photos.len())
    }

    pub fn get(&self, id: &str) -> Option<&Photo> {
        self.photos.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Photo> {
        self.photos.iter_mut().find(|p| p.id == id)
    }

    pub fn first_unanalyzed(&self) -> Option<usize> {
        self.photos.iter().position(|p| !p.is_analyzed())
    }

    pub fn unanalyzed_count(&self) -> usize {
        self.photos.iter().filter(|p| !p.is_analyzed()).count()
    }

    pub fn analyzed_count(&self) -> usize {
        self.photos.len() - self.unanalyzed_count()
    }

    /// Analyzed photos judged bad, failures included.
    pub fn bad_photos(&self) -> Vec<&Photo> {
        self.photos.iter().filter(|p| p.is_bad()).collect()
    }

    pub fn good_photos(&self) -> Vec<&Photo> {
        self.photos.iter().filter(|p| p.is_good()).collect()
    }

    pub fn total_bad_size(&self) -> u64 {
        self.bad_photos().iter().map(|p| p.file_size_bytes).sum()
    }
}
