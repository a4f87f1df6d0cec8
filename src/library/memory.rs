use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::path::PathBuf;

use super::{AssetPage, AssetRecord, LibraryError, PhotoLibrary};

struct StoredAsset {
    record: AssetRecord,
    bytes: Vec<u8>,
}

/// Library held entirely in memory. Listing order is insertion order.
#[derive(Default)]
pub struct MemoryLibrary {
    assets: Mutex<Vec<StoredAsset>>,
    permission_denied: Mutex<bool>,
    reject_deletes: Mutex<bool>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` assets with ids `photo-0..`, each carrying its index as bytes.
    /// Creation times step back one minute per asset so the order is newest first.
    pub fn with_generated(count: usize) -> Self {
        let library = Self::new();
        let newest: DateTime<Utc> = Utc::now();
        for i in 0..count {
            let record = AssetRecord {
                id: format!("photo-{}", i),
                path: PathBuf::from(format!("/memory/IMG_{:04}.jpg", i)),
                created_at: newest - Duration::minutes(i as i64),
                width: 4032,
                height: 3024,
                file_size_bytes: 1_000_000 + i as u64,
                title: Some(format!("IMG_{:04}.jpg", i)),
            };
            library.add(record, i.to_string().into_bytes());
        }
        library
    }

    pub fn add(&self, record: AssetRecord, bytes: Vec<u8>) {
        self.assets.lock().push(StoredAsset { record, bytes });
    }

    pub fn len(&self) -> usize {
        self.assets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.assets.lock().iter().any(|a| a.record.id == id)
    }

    /// Simulate a revoked library permission.
    pub fn set_permission_denied(&self, denied: bool) {
        *self.permission_denied.lock() = denied;
    }

    pub fn set_reject_deletes(&self, reject: bool) {
        *self.reject_deletes.lock() = reject;
    }

    fn check_permission(&self) -> Result<(), LibraryError> {
        if *self.permission_denied.lock() {
            Err(LibraryError::PermissionDenied(
                "photo library access revoked".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl PhotoLibrary for MemoryLibrary {
    fn list_assets(&self, offset: usize, limit: usize) -> Result<AssetPage, LibraryError> {
        self.check_permission()?;
        let assets = self.assets.lock();
        let records = assets
            .iter()
            .skip(offset)
            .take(limit)
            .map(|a| a.record.clone())
            .collect();
        Ok(AssetPage {
            records,
            total_count: assets.len(),
        })
    }

    fn fetch_thumbnail(&self, _photo_id: &str) -> Result<Option<Vec<u8>>, LibraryError> {
        self.check_permission()?;
        Ok(None)
    }

    fn fetch_original_bytes(&self, photo_id: &str) -> Result<Option<Vec<u8>>, LibraryError> {
        self.check_permission()?;
        Ok(self
            .assets
            .lock()
            .iter()
            .find(|a| a.record.id == photo_id)
            .map(|a| a.bytes.clone()))
    }

    fn delete_assets(&self, ids: &[String]) -> Result<Vec<String>, LibraryError> {
        self.check_permission()?;
        if *self.reject_deletes.lock() {
            return Err(LibraryError::Rejected("user declined deletion".to_string()));
        }

        let mut assets = self.assets.lock();
        let mut deleted = Vec::new();
        assets.retain(|a| {
            if ids.contains(&a.record.id) {
                deleted.push(a.record.id.clone());
                false
            } else {
                true
            }
        });
        Ok(deleted)
    }
}
