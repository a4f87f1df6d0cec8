//! Batch analysis of a [`PhotoCollection`].
//!
//! Photos are scored one at a time in index order, in fixed-size batches.
//! Each call analyzes one batch starting at the first unanalyzed photo; the
//! engine never advances on its own. Cached results short-circuit the scorer, and every scoring problem
//! degrades the photo to a failed/bad result instead of aborting the batch.

pub mod observer;

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::{CachedResult, ResultCache};
use crate::collection::PhotoCollection;
use crate::config::AnalysisConfig;
use crate::library::{LibraryError, PhotoLibrary};
use crate::photo::{AnalysisMethod, Category, MethodDetails, Photo};
use crate::scorer::{QualityScorer, RemoteCategory, ScoreResult};

pub use observer::{AnalysisObserver, AnalysisUpdate, Callbacks, NullObserver, TaskProgress};

/// What a call to the engine did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The collection is empty.
    NoPhotos,
    /// Every loaded photo already has a result.
    AllAnalyzed,
    /// No active session; nothing was analyzed. Only returned by
    /// [`TriageSession`](crate::session::TriageSession), never by the engine itself.
    SignedOut,
    /// Cancelled between photos; earlier photos keep their results.
    Cancelled { processed: usize },
    Completed(BatchSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub batch_number: usize,
    pub total_batches: usize,
    pub start: usize,
    pub end: usize,
    pub good: usize,
    pub bad: usize,
    pub failed: usize,
    pub cache_hits: usize,
}

impl BatchSummary {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub batch_size: usize,
    pub low_water_mark: usize,
    pub good_threshold: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl From<&AnalysisConfig> for EngineSettings {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            low_water_mark: config.low_water_mark,
            good_threshold: config.good_threshold,
        }
    }
}

enum PhotoOutcome {
    AlreadyAnalyzed,
    CacheHit,
    Scored,
    Failed,
}

pub struct BatchAnalysisEngine {
    scorer: Arc<dyn QualityScorer>,
    cache: Arc<ResultCache>,
    settings: EngineSettings,
    cancel_flag: Option<Arc<AtomicBool>>,
}

fn reason(reason: &str) -> MethodDetails {
    let mut details = MethodDetails::new();
    details.insert("reason".to_string(), reason.into());
    details
}

impl BatchAnalysisEngine {
    pub fn new(scorer: Arc<dyn QualityScorer>, cache: Arc<ResultCache>) -> Self {
        Self {
            scorer,
            cache,
            settings: EngineSettings::default(),
            cancel_flag: None,
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self.settings.batch_size = self.settings.batch_size.max(1);
        self
    }

    /// Checked before every photo. Setting it stops the run at the next photo boundary.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    pub fn total_batches(&self, collection_len: usize) -> usize {
        collection_len.div_ceil(self.settings.batch_size)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Analyze the batch that starts at the first unanalyzed photo.
    pub fn analyze_next_batch(
        &self,
        collection: &mut PhotoCollection,
        library: &dyn PhotoLibrary,
        observer: &mut dyn AnalysisObserver,
    ) -> BatchOutcome {
        if collection.is_empty() {
            observer.on_status("No photos to analyze");
            return BatchOutcome::NoPhotos;
        }

        let Some(start) = collection.first_unanalyzed() else {
            observer.on_status("All photos analyzed");
            return BatchOutcome::AllAnalyzed;
        };

        let total = collection.len();
        let batch_size = self.settings.batch_size;
        let end = (start + batch_size).min(total);
        let batch_number = start / batch_size + 1;
        let total_batches = self.total_batches(total);

        tracing::info!(batch_number, total_batches, start, end, "Starting analysis batch");
        observer.on_status(&format!(
            "Analyzing batch {} of {} ({} photos)",
            batch_number,
            total_batches,
            end - start
        ));

        let mut summary = BatchSummary {
            batch_number,
            total_batches,
            start,
            end,
            good: 0,
            bad: 0,
            failed: 0,
            cache_hits: 0,
        };

        for index in start..end {
            if self.is_cancelled() {
                let processed = index - start;
                tracing::info!(processed, "Analysis cancelled");
                observer.on_status("Analysis cancelled");
                return BatchOutcome::Cancelled { processed };
            }

            let photo = &mut collection.photos_mut()[index];
            match self.analyze_photo(photo, library, observer) {
                PhotoOutcome::CacheHit => summary.cache_hits += 1,
                PhotoOutcome::Failed => summary.failed += 1,
                PhotoOutcome::Scored | PhotoOutcome::AlreadyAnalyzed => {}
            }
            match photo.category {
                Some(Category::Good) => summary.good += 1,
                _ => summary.bad += 1,
            }

            observer.on_progress(index + 1, total);
        }

        tracing::info!(
            batch_number,
            good = summary.good,
            bad = summary.bad,
            failed = summary.failed,
            cache_hits = summary.cache_hits,
            "Analysis batch complete"
        );
        observer.on_batch_complete(&collection.photos()[start..end], batch_number, total_batches);

        BatchOutcome::Completed(summary)
    }

    /// Top the collection up with another page when few loaded photos are
    /// left to analyze, then analyze the next batch.
    pub fn continue_to_next_batch(
        &self,
        collection: &mut PhotoCollection,
        library: &dyn PhotoLibrary,
        observer: &mut dyn AnalysisObserver,
    ) -> BatchOutcome {
        if collection.remaining() > 0
            && collection.unanalyzed_count() < self.settings.low_water_mark
        {
            match collection.load_more(library, self.settings.batch_size) {
                Ok(loaded) => tracing::debug!(loaded, "Loaded next page before continuing"),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load more photos");
                    observer.on_status(&format!("Could not load more photos: {}", e));
                }
            }
        }

        self.analyze_next_batch(collection, library, observer)
    }

    /// Forget the result for one photo so the next batch picks it up again.
    pub fn reset_photo(&self, collection: &mut PhotoCollection, photo_id: &str) -> bool {
        self.cache.invalidate(photo_id);
        match collection.get_mut(photo_id) {
            Some(photo) => {
                photo.reset_analysis();
                true
            }
            None => false,
        }
    }

    fn analyze_photo(
        &self,
        photo: &mut Photo,
        library: &dyn PhotoLibrary,
        observer: &mut dyn AnalysisObserver,
    ) -> PhotoOutcome {
        // Results, failures included, are final for the session.
        if photo.is_analyzed() {
            return PhotoOutcome::AlreadyAnalyzed;
        }

        photo.in_flight = true;
        let outcome = self.score_photo(photo, library, observer);
        photo.in_flight = false;
        outcome
    }

    fn score_photo(
        &self,
        photo: &mut Photo,
        library: &dyn PhotoLibrary,
        observer: &mut dyn AnalysisObserver,
    ) -> PhotoOutcome {
        if let Some(cached) = self.cache.get(&photo.id) {
            photo.category = Some(cached.category);
            photo.quality_score = Some(cached.quality_score);
            photo.method = Some(cached.method);
            photo.raw_method_details = cached.raw_method_details;
            photo.analyzed_at = Some(Utc::now());
            return PhotoOutcome::CacheHit;
        }

        // Re-checked for every photo so a recovering service is picked up mid-batch.
        if !self.scorer.is_healthy() {
            tracing::debug!(photo_id = %photo.id, scorer = self.scorer.scorer_name(), "Scorer unhealthy");
            photo.record_failure(reason("scorer_unhealthy"));
            return PhotoOutcome::Failed;
        }

        let bytes = match self.load_bytes(photo, library) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                photo.record_failure(reason("image_unavailable"));
                return PhotoOutcome::Failed;
            }
            Err(e) => {
                tracing::warn!(photo_id = %photo.id, error = %e, "Image bytes unavailable");
                observer.on_status(&format!("Could not read photo {}: {}", photo.id, e));
                let mut details = reason("library_error");
                details.insert("error".to_string(), e.to_string().into());
                photo.record_failure(details);
                return PhotoOutcome::Failed;
            }
        };

        let result = self.scorer.score_single(&bytes);
        if !result.success {
            tracing::warn!(
                photo_id = %photo.id,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Scoring failed"
            );
            photo.record_failure(result.method_details());
            return PhotoOutcome::Failed;
        }

        let cached = self.classify(&result);
        photo.category = Some(cached.category);
        photo.quality_score = Some(cached.quality_score);
        photo.method = Some(cached.method);
        photo.raw_method_details = cached.raw_method_details.clone();
        photo.analyzed_at = Some(Utc::now());

        self.cache.put(&photo.id, cached);
        PhotoOutcome::Scored
    }

    /// Fold a successful score into the two-way verdict. The remote category
    /// decides; the score threshold is only used when the category is unusable.
    fn classify(&self, result: &ScoreResult) -> CachedResult {
        let quality_score = result.normalized_score();
        let mut details = result.method_details();

        let (category, method) = match result.remote_category() {
            Some(RemoteCategory::Good) => (Category::Good, AnalysisMethod::Primary),
            Some(RemoteCategory::Moderate) | Some(RemoteCategory::Bad) => {
                (Category::Bad, AnalysisMethod::Primary)
            }
            None => {
                details.insert("decision".to_string(), "score_threshold".into());
                let category = if quality_score >= self.settings.good_threshold {
                    Category::Good
                } else {
                    Category::Bad
                };
                (category, AnalysisMethod::Fallback)
            }
        };

        CachedResult::new(category, quality_score, method, details)
    }

    /// Thumbnail if the library has one, otherwise the original. Only an
    /// error reading the original is surfaced.
    fn load_bytes(
        &self,
        photo: &Photo,
        library: &dyn PhotoLibrary,
    ) -> Result<Option<Vec<u8>>, LibraryError> {
        match library.fetch_thumbnail(&photo.id) {
            Ok(Some(bytes)) => return Ok(Some(bytes)),
            Ok(None) => {}
            Err(e) => tracing::debug!(photo_id = %photo.id, error = %e, "Thumbnail unavailable"),
        }

        library.fetch_original_bytes(&photo.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::MemoryLibrary;
    use crate::test_support::{engine_for, RecordingObserver, StubScorer};

    fn loaded(library: &MemoryLibrary, limit: usize) -> PhotoCollection {
        let mut collection = PhotoCollection::new();
        collection.load_initial(library, limit).unwrap();
        collection
    }

    fn completed(outcome: BatchOutcome) -> BatchSummary {
        match outcome {
            BatchOutcome::Completed(summary) => summary,
            other => panic!("expected a completed batch, got {:?}", other),
        }
    }

    #[test]
    fn test_batches_are_aligned_and_last_is_short() {
        let library = MemoryLibrary::with_generated(120);
        let mut collection = loaded(&library, 120);
        let (engine, _) = engine_for(StubScorer::odd_good_even_bad());
        let mut observer = RecordingObserver::default();

        let sizes: Vec<usize> = (0..3)
            .map(|_| completed(engine.analyze_next_batch(&mut collection, &library, &mut observer)).len())
            .collect();

        assert_eq!(sizes, vec![50, 50, 20]);
        assert_eq!(observer.batch_numbers(), vec![(1, 3), (2, 3), (3, 3)]);
        assert_eq!(
            engine.analyze_next_batch(&mut collection, &library, &mut observer),
            BatchOutcome::AllAnalyzed
        );
    }

    #[test]
    fn test_exact_multiple_has_full_last_batch() {
        let library = MemoryLibrary::with_generated(100);
        let mut collection = loaded(&library, 100);
        let (engine, _) = engine_for(StubScorer::odd_good_even_bad());
        let mut observer = RecordingObserver::default();

        completed(engine.analyze_next_batch(&mut collection, &library, &mut observer));
        let last = completed(engine.analyze_next_batch(&mut collection, &library, &mut observer));
        assert_eq!((last.batch_number, last.total_batches, last.len()), (2, 2, 50));
    }

    #[test]
    fn test_resumes_at_first_unanalyzed() {
        let library = MemoryLibrary::with_generated(60);
        let mut collection = loaded(&library, 60);
        for photo in collection.photos_mut().iter_mut().take(7) {
            photo.category = Some(Category::Good);
            photo.quality_score = Some(0.9);
            photo.method = Some(AnalysisMethod::Primary);
        }
        let scorer = StubScorer::odd_good_even_bad();
        let (engine, _) = engine_for(scorer.clone());
        let mut observer = RecordingObserver::default();

        let summary = completed(engine.analyze_next_batch(&mut collection, &library, &mut observer));

        assert_eq!((summary.start, summary.end), (7, 57));
        assert_eq!(summary.batch_number, 1);
        assert_eq!(observer.progress.first(), Some(&(8, 60)));
        assert_eq!(observer.batches[0].0.first().map(String::as_str), Some("photo-7"));
        assert_eq!(scorer.score_calls(), 50);
    }

    #[test]
    fn test_cache_hit_skips_scorer() {
        let library = MemoryLibrary::with_generated(5);
        let mut collection = loaded(&library, 5);
        let scorer = StubScorer::odd_good_even_bad();
        let (engine, cache) = engine_for(scorer.clone());
        for id in ["photo-0", "photo-1"] {
            cache.put(
                id,
                CachedResult::new(Category::Good, 0.99, AnalysisMethod::Primary, MethodDetails::new()),
            );
        }

        let summary = completed(engine.analyze_next_batch(
            &mut collection,
            &library,
            &mut RecordingObserver::default(),
        ));

        assert_eq!(summary.cache_hits, 2);
        assert_eq!(scorer.score_calls(), 3);
        assert_eq!(scorer.health_calls(), 3);
        let first = &collection.photos()[0];
        assert_eq!(first.quality_score, Some(0.99));
        assert_eq!(first.category, Some(Category::Good));
    }

    #[test]
    fn test_failing_scorer_degrades_every_photo() {
        let library = MemoryLibrary::with_generated(5);
        let mut collection = loaded(&library, 5);
        let (engine, cache) = engine_for(StubScorer::always(ScoreResult::failure("503")));
        let mut observer = RecordingObserver::default();

        let summary = completed(engine.analyze_next_batch(&mut collection, &library, &mut observer));

        assert_eq!(summary.failed, 5);
        assert_eq!(observer.batches.len(), 1);
        assert_eq!(observer.batches[0].0.len(), 5);
        for photo in collection.photos() {
            assert_eq!(photo.method, Some(AnalysisMethod::Failed));
            assert_eq!(photo.category, Some(Category::Bad));
            assert_eq!(photo.quality_score, Some(0.0));
            assert_eq!(photo.raw_method_details["error"], "503");
        }
        assert!(cache.is_empty());
        assert_eq!(
            engine.analyze_next_batch(&mut collection, &library, &mut observer),
            BatchOutcome::AllAnalyzed
        );
    }

    #[test]
    fn test_unhealthy_scorer_is_never_called() {
        let library = MemoryLibrary::with_generated(4);
        let mut collection = loaded(&library, 4);
        let scorer = StubScorer::odd_good_even_bad();
        scorer.set_healthy(false);
        let (engine, _) = engine_for(scorer.clone());

        let summary = completed(engine.analyze_next_batch(
            &mut collection,
            &library,
            &mut RecordingObserver::default(),
        ));

        assert_eq!(summary.failed, 4);
        assert_eq!(scorer.score_calls(), 0);
        assert_eq!(collection.photos()[0].raw_method_details["reason"], "scorer_unhealthy");
    }

    #[test]
    fn test_health_rechecked_per_photo() {
        let library = MemoryLibrary::with_generated(5);
        let mut collection = loaded(&library, 5);
        let scorer = StubScorer::odd_good_even_bad();
        scorer.script_health(vec![false, false, true]);
        let (engine, _) = engine_for(scorer.clone());

        let summary = completed(engine.analyze_next_batch(
            &mut collection,
            &library,
            &mut RecordingObserver::default(),
        ));

        assert_eq!(summary.failed, 2);
        assert_eq!(scorer.health_calls(), 5);
        assert_eq!(scorer.score_calls(), 3);
        assert_eq!(collection.photos()[2].method, Some(AnalysisMethod::Primary));
    }

    #[test]
    fn test_moderate_counts_as_bad_and_unknown_uses_threshold() {
        let library = MemoryLibrary::with_generated(4);
        let mut collection = loaded(&library, 4);
        let scorer = StubScorer::new(|bytes| match bytes {
            b"0" => ScoreResult::success(72.0, "Moderate", 5.0),
            b"1" => ScoreResult::success(70.0, "Excellent", 5.0),
            b"2" => ScoreResult::success(30.0, "", 5.0),
            _ => ScoreResult::success(95.0, "good", 5.0),
        });
        let (engine, cache) = engine_for(scorer);

        engine.analyze_next_batch(&mut collection, &library, &mut NullObserver);
        let photos = collection.photos();

        assert_eq!(photos[0].category, Some(Category::Bad));
        assert_eq!(photos[0].method, Some(AnalysisMethod::Primary));
        assert_eq!(photos[0].quality_score, Some(0.72));
        assert_eq!(photos[0].raw_method_details["remote_category"], "Moderate");

        assert_eq!(photos[1].category, Some(Category::Good));
        assert_eq!(photos[1].method, Some(AnalysisMethod::Fallback));
        assert_eq!(photos[2].category, Some(Category::Bad));
        assert_eq!(photos[2].method, Some(AnalysisMethod::Fallback));

        assert_eq!(photos[3].category, Some(Category::Good));
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.get("photo-1").unwrap().method, AnalysisMethod::Fallback);
    }

    #[test]
    fn test_empty_collection_reports_status() {
        let library = MemoryLibrary::new();
        let mut collection = PhotoCollection::new();
        let (engine, _) = engine_for(StubScorer::odd_good_even_bad());
        let mut observer = RecordingObserver::default();

        assert_eq!(
            engine.analyze_next_batch(&mut collection, &library, &mut observer),
            BatchOutcome::NoPhotos
        );
        assert_eq!(observer.statuses, vec!["No photos to analyze".to_string()]);
        assert!(observer.batches.is_empty());
    }

    #[test]
    fn test_missing_bytes_fail_the_photo() {
        let library = MemoryLibrary::new();
        let mut collection =
            PhotoCollection::from_photos(vec![Photo::new("ghost", "/gone.jpg", Utc::now())]);
        let scorer = StubScorer::odd_good_even_bad();
        let (engine, _) = engine_for(scorer.clone());

        engine.analyze_next_batch(&mut collection, &library, &mut NullObserver);

        let photo = &collection.photos()[0];
        assert_eq!(photo.method, Some(AnalysisMethod::Failed));
        assert_eq!(photo.raw_method_details["reason"], "image_unavailable");
        assert_eq!(scorer.score_calls(), 0);
    }

    #[test]
    fn test_library_error_is_reported_as_status() {
        let library = MemoryLibrary::with_generated(3);
        let mut collection = loaded(&library, 3);
        let scorer = StubScorer::odd_good_even_bad();
        let (engine, cache) = engine_for(scorer.clone());
        let mut observer = RecordingObserver::default();

        library.set_permission_denied(true);
        let summary = completed(engine.analyze_next_batch(&mut collection, &library, &mut observer));

        assert_eq!(summary.failed, 3);
        assert_eq!(scorer.score_calls(), 0);
        assert!(cache.is_empty());
        assert_eq!(
            observer.statuses[1],
            "Could not read photo photo-0: permission denied: photo library access revoked"
        );
        assert_eq!(observer.statuses.len(), 4);

        let photo = &collection.photos()[0];
        assert_eq!(photo.method, Some(AnalysisMethod::Failed));
        assert_eq!(photo.raw_method_details["reason"], "library_error");
        assert_eq!(
            photo.raw_method_details["error"],
            "permission denied: photo library access revoked"
        );
    }

    #[test]
    fn test_progress_strictly_increasing() {
        let library = MemoryLibrary::with_generated(70);
        let mut collection = loaded(&library, 70);
        let (engine, _) = engine_for(StubScorer::odd_good_even_bad());
        let mut observer = RecordingObserver::default();

        engine.analyze_next_batch(&mut collection, &library, &mut observer);
        engine.analyze_next_batch(&mut collection, &library, &mut observer);

        let currents: Vec<usize> = observer.progress.iter().map(|(c, _)| *c).collect();
        assert_eq!(currents, (1..=70).collect::<Vec<_>>());
        assert!(observer.progress.iter().all(|(_, total)| *total == 70));
    }

    #[test]
    fn test_continue_loads_next_page_when_low() {
        let library = MemoryLibrary::with_generated(120);
        let mut collection = loaded(&library, 50);
        let (engine, _) = engine_for(StubScorer::odd_good_even_bad());
        let mut observer = RecordingObserver::default();

        let first = completed(engine.analyze_next_batch(&mut collection, &library, &mut observer));
        assert_eq!((first.batch_number, first.total_batches), (1, 1));

        let second = completed(engine.continue_to_next_batch(&mut collection, &library, &mut observer));
        assert_eq!(collection.len(), 100);
        assert_eq!((second.start, second.batch_number, second.total_batches), (50, 2, 2));

        let third = completed(engine.continue_to_next_batch(&mut collection, &library, &mut observer));
        assert_eq!((third.len(), third.batch_number), (20, 3));
        assert_eq!(collection.remaining(), 0);
    }

    #[test]
    fn test_continue_does_not_load_when_plenty_left() {
        let library = MemoryLibrary::with_generated(200);
        let mut collection = loaded(&library, 100);
        let (engine, _) = engine_for(StubScorer::odd_good_even_bad());

        engine.analyze_next_batch(&mut collection, &library, &mut NullObserver);
        engine.continue_to_next_batch(&mut collection, &library, &mut NullObserver);
        assert_eq!(collection.len(), 100);
    }

    #[test]
    fn test_continue_survives_load_failure() {
        let library = MemoryLibrary::with_generated(60);
        let mut collection = loaded(&library, 50);
        let (engine, _) = engine_for(StubScorer::odd_good_even_bad());
        let mut observer = RecordingObserver::default();

        engine.analyze_next_batch(&mut collection, &library, &mut observer);
        library.set_permission_denied(true);

        assert_eq!(
            engine.continue_to_next_batch(&mut collection, &library, &mut observer),
            BatchOutcome::AllAnalyzed
        );
        assert!(observer
            .statuses
            .iter()
            .any(|s| s.starts_with("Could not load more photos")));
        assert_eq!(collection.len(), 50);
    }

    #[test]
    fn test_cancel_flag_stops_before_next_photo() {
        let library = MemoryLibrary::with_generated(10);
        let mut collection = loaded(&library, 10);
        let flag = Arc::new(AtomicBool::new(true));
        let (engine, _) = engine_for(StubScorer::odd_good_even_bad());
        let engine = engine.with_cancel_flag(flag.clone());
        let mut observer = RecordingObserver::default();

        assert_eq!(
            engine.analyze_next_batch(&mut collection, &library, &mut observer),
            BatchOutcome::Cancelled { processed: 0 }
        );
        assert!(observer.batches.is_empty());
        assert_eq!(collection.unanalyzed_count(), 10);

        flag.store(false, Ordering::SeqCst);
        completed(engine.analyze_next_batch(&mut collection, &library, &mut observer));
        assert_eq!(collection.unanalyzed_count(), 0);
    }

    #[test]
    fn test_reset_photo_requeues_it() {
        let library = MemoryLibrary::with_generated(3);
        let mut collection = loaded(&library, 3);
        let scorer = StubScorer::odd_good_even_bad();
        let (engine, cache) = engine_for(scorer.clone());
        engine.analyze_next_batch(&mut collection, &library, &mut NullObserver);

        assert!(engine.reset_photo(&mut collection, "photo-1"));
        assert!(cache.get("photo-1").is_none());
        assert_eq!(collection.first_unanalyzed(), Some(1));

        let summary = completed(engine.analyze_next_batch(&mut collection, &library, &mut NullObserver));
        assert_eq!((summary.start, summary.end), (1, 3));
        assert_eq!(summary.cache_hits, 0);
        assert_eq!(scorer.score_calls(), 4);
        assert!(collection.photos()[1].is_good());
    }

    #[test]
    fn test_callbacks_observer() {
        let library = MemoryLibrary::with_generated(3);
        let mut collection = loaded(&library, 3);
        let (engine, _) = engine_for(StubScorer::odd_good_even_bad());

        let mut last_progress = (0, 0);
        let mut statuses = 0;
        let mut completed_batches = Vec::new();
        let mut callbacks = Callbacks::new(
            |current, total| last_progress = (current, total),
            |_| statuses += 1,
            |photos, n, total| completed_batches.push((photos.len(), n, total)),
        );

        engine.analyze_next_batch(&mut collection, &library, &mut callbacks);
        drop(callbacks);

        assert_eq!(last_progress, (3, 3));
        assert_eq!(statuses, 1);
        assert_eq!(completed_batches, vec![(3, 1, 1)]);
    }
}
