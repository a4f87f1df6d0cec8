//! One triage session: a library, the photos loaded from it, the analysis
//! engine and the deletion selection, wired together.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::CacheStats;
use crate::collection::PhotoCollection;
use crate::engine::{AnalysisObserver, BatchAnalysisEngine, BatchOutcome};
use crate::library::{LibraryError, PhotoLibrary};
use crate::photo::{AnalysisMethod, Photo};
use crate::selection::SelectionLedger;

/// Whether an authenticated session is active. Analysis only runs while it is.
pub trait SessionGate: Send + Sync {
    fn is_active(&self) -> bool;
}

/// Gate for local use where there is nobody to sign in.
pub struct AlwaysActive;

impl SessionGate for AlwaysActive {
    fn is_active(&self) -> bool {
        true
    }
}

impl SessionGate for AtomicBool {
    fn is_active(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

pub struct TriageSession {
    library: Arc<dyn PhotoLibrary>,
    collection: PhotoCollection,
    selection: SelectionLedger,
    engine: BatchAnalysisEngine,
    gate: Arc<dyn SessionGate>,
}

impl TriageSession {
    pub fn new(library: Arc<dyn PhotoLibrary>, engine: BatchAnalysisEngine) -> Self {
        Self {
            library,
            collection: PhotoCollection::new(),
            selection: SelectionLedger::new(),
            engine,
            gate: Arc::new(AlwaysActive),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn SessionGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn collection(&self) -> &PhotoCollection {
        &self.collection
    }

    pub fn engine(&self) -> &BatchAnalysisEngine {
        &self.engine
    }

    pub fn library(&self) -> &Arc<dyn PhotoLibrary> {
        &self.library
    }

    /// Replace the loaded photos with the first `limit` library assets.
    /// The selection is dropped along with the old photos.
    pub fn load_initial(&mut self, limit: usize) -> Result<usize, LibraryError> {
        let loaded = self.collection.load_initial(self.library.as_ref(), limit)?;
        self.selection.clear();
        Ok(loaded)
    }

    pub fn load_more(&mut self, additional: usize) -> Result<usize, LibraryError> {
        self.collection.load_more(self.library.as_ref(), additional)
    }

    pub fn analyze_next_batch(&mut self, observer: &mut dyn AnalysisObserver) -> BatchOutcome {
        if !self.gate.is_active() {
            return signed_out(observer);
        }
        self.engine
            .analyze_next_batch(&mut self.collection, self.library.as_ref(), observer)
    }

    pub fn continue_to_next_batch(&mut self, observer: &mut dyn AnalysisObserver) -> BatchOutcome {
        if !self.gate.is_active() {
            return signed_out(observer);
        }
        self.engine
            .continue_to_next_batch(&mut self.collection, self.library.as_ref(), observer)
    }

    pub fn reset_photo(&mut self, photo_id: &str) -> bool {
        self.engine.reset_photo(&mut self.collection, photo_id)
    }

    /// Returns whether the photo is now selected.
    pub fn toggle_selection(&mut self, photo_id: &str) -> bool {
        let selected = self.selection.toggle(photo_id);
        if let Some(photo) = self.collection.get_mut(photo_id) {
            photo.selected = selected;
        }
        selected
    }

    /// Select every analyzed photo judged bad. Returns the selection count.
    pub fn select_all_bad(&mut self) -> usize {
        let bad: Vec<String> = self
            .collection
            .bad_photos()
            .iter()
            .map(|p| p.id.clone())
            .collect();
        self.selection.select_all(bad);
        self.mirror_selection();
        self.selection.count()
    }

    /// Select the bad photos the scorer actually judged. Failed analyses stay
    /// unselected since they say nothing about quality. Returns the selection count.
    pub fn select_all_bad_scored(&mut self) -> usize {
        let bad: Vec<String> = self
            .collection
            .bad_photos()
            .iter()
            .filter(|p| p.method != Some(AnalysisMethod::Failed))
            .map(|p| p.id.clone())
            .collect();
        self.selection.select_all(bad);
        self.mirror_selection();
        self.selection.count()
    }

    /// Photos whose analysis failed.
    pub fn failed_count(&self) -> usize {
        self.collection
            .photos()
            .iter()
            .filter(|p| p.method == Some(AnalysisMethod::Failed))
            .count()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.mirror_selection();
    }

    pub fn selection_count(&self) -> usize {
        self.selection.count()
    }

    pub fn selected_size(&self) -> u64 {
        self.selection.total_size(&self.collection)
    }

    pub fn is_selected(&self, photo_id: &str) -> bool {
        self.selection.is_selected(photo_id)
    }

    /// Ask the library to delete the selected photos. Whatever it reports as
    /// deleted is pruned from the collection, the selection and the cache.
    /// On error nothing is pruned.
    pub fn delete_selected(&mut self) -> Result<Vec<String>, LibraryError> {
        let mut ids: Vec<String> = self.selection.selected_ids().iter().cloned().collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        ids.sort();

        let deleted = match self.library.delete_assets(&ids) {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!(requested = ids.len(), error = %e, "Delete failed");
                return Err(e);
            }
        };

        let gone: HashSet<String> = deleted.iter().cloned().collect();
        let removed = self.collection.remove(&gone);
        self.selection.forget(&gone);
        for id in &gone {
            self.engine.cache().invalidate(id);
        }

        tracing::info!(
            requested = ids.len(),
            deleted = deleted.len(),
            removed,
            "Deleted selected photos"
        );
        Ok(deleted)
    }

    pub fn bad_photos(&self) -> Vec<&Photo> {
        self.collection.bad_photos()
    }

    pub fn good_photos(&self) -> Vec<&Photo> {
        self.collection.good_photos()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.engine.cache().stats()
    }

    fn mirror_selection(&mut self) {
        let selection = &self.selection;
        for photo in self.collection.photos_mut() {
            photo.selected = selection.is_selected(&photo.id);
        }
    }
}

fn signed_out(observer: &mut dyn AnalysisObserver) -> BatchOutcome {
    tracing::debug!("Analysis requested without an active session");
    observer.on_status("Sign in required");
    BatchOutcome::SignedOut
}
