//! Photos marked for deletion.

use std::collections::HashSet;

use crate::collection::PhotoCollection;

/// Set of selected photo ids. Counts and sizes are derived on demand.
#[derive(Debug, Clone, Default)]
pub struct SelectionLedger {
    selected: HashSet<String>,
}

impl SelectionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the selection of `id`. Returns whether it is now selected.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.selected.remove(id) {
            false
        } else {
            self.selected.insert(id.to_string());
            true
        }
    }

    pub fn select_all<I, S>(&mut self, candidate_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected
            .extend(candidate_ids.into_iter().map(Into::into));
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.contains(id)
    }

    pub fn selected_ids(&self) -> &HashSet<String> {
        &self.selected
    }

    /// Drop ids that no longer exist.
    pub fn forget(&mut self, ids: &HashSet<String>) {
        self.selected.retain(|id| !ids.contains(id));
    }

    /// Total bytes of the selected photos present in `collection`.
    pub fn total_size(&self, collection: &PhotoCollection) -> u64 {
        collection
            .photos()
            .iter()
            .filter(|p| self.selected.contains(&p.id))
            .map(|p| p.file_size_bytes)
            .sum()
    }
}
