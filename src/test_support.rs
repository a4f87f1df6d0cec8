//! Stubs shared by the unit tests.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cache::ResultCache;
use crate::engine::{AnalysisObserver, BatchAnalysisEngine};
use crate::photo::Photo;
use crate::scorer::{QualityScorer, ScoreResult};
use crate::storage::MemoryStore;

type Responder = Box<dyn Fn(&[u8]) -> ScoreResult + Send + Sync>;

pub(crate) struct StubScorer {
    respond: Responder,
    healthy: AtomicBool,
    scripted_health: Mutex<VecDeque<bool>>,
    score_calls: AtomicUsize,
    health_calls: AtomicUsize,
}

impl StubScorer {
    pub(crate) fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&[u8]) -> ScoreResult + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            healthy: AtomicBool::new(true),
            scripted_health: Mutex::new(VecDeque::new()),
            score_calls: AtomicUsize::new(0),
            health_calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn always(result: ScoreResult) -> Arc<Self> {
        Self::new(move |_| result.clone())
    }

    /// Reads the photo index from the bytes `MemoryLibrary::with_generated`
    /// stores: odd indices score Good/85, even ones Bad/10.
    pub(crate) fn odd_good_even_bad() -> Arc<Self> {
        Self::new(|bytes| {
            let index: usize = match std::str::from_utf8(bytes).ok().and_then(|s| s.parse().ok()) {
                Some(i) => i,
                None => return ScoreResult::failure("unexpected bytes"),
            };
            if index % 2 == 1 {
                ScoreResult::success(85.0, "Good", 12.0)
            } else {
                ScoreResult::success(10.0, "Bad", 12.0)
            }
        })
    }

    pub(crate) fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Answers for the next health probes, before falling back to `set_healthy`.
    pub(crate) fn script_health(&self, answers: Vec<bool>) {
        self.scripted_health.lock().extend(answers);
    }

    pub(crate) fn score_calls(&self) -> usize {
        self.score_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }
}

impl QualityScorer for StubScorer {
    fn score_single(&self, image_bytes: &[u8]) -> ScoreResult {
        self.score_calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(image_bytes)
    }

    fn is_healthy(&self) -> bool {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        self.scripted_health
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.healthy.load(Ordering::SeqCst))
    }
}

pub(crate) fn memory_cache() -> Arc<ResultCache> {
    Arc::new(ResultCache::new(Arc::new(MemoryStore::new())))
}

pub(crate) fn engine_for(scorer: Arc<StubScorer>) -> (BatchAnalysisEngine, Arc<ResultCache>) {
    let cache = memory_cache();
    (BatchAnalysisEngine::new(scorer, cache.clone()), cache)
}

#[derive(Default)]
pub(crate) struct RecordingObserver {
    pub progress: Vec<(usize, usize)>,
    pub statuses: Vec<String>,
    /// Photo ids, batch number, total batches.
    pub batches: Vec<(Vec<String>, usize, usize)>,
}

impl RecordingObserver {
    pub(crate) fn batch_numbers(&self) -> Vec<(usize, usize)> {
        self.batches.iter().map(|(_, n, total)| (*n, *total)).collect()
    }
}

impl AnalysisObserver for RecordingObserver {
    fn on_progress(&mut self, current: usize, total: usize) {
        self.progress.push((current, total));
    }

    fn on_status(&mut self, message: &str) {
        self.statuses.push(message.to_string());
    }

    fn on_batch_complete(&mut self, photos: &[Photo], batch_number: usize, total_batches: usize) {
        self.batches.push((
            photos.iter().map(|p| p.id.clone()).collect(),
            batch_number,
            total_batches,
        ));
    }
}
