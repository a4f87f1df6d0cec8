//! Progress, status and batch-completion reporting.

use tokio::sync::mpsc::UnboundedSender;

use crate::photo::Photo;

/// Receives engine events. Calls arrive on the thread running the engine, in order.
pub trait AnalysisObserver {
    /// `current` is 1-based over the whole collection.
    fn on_progress(&mut self, current: usize, total: usize);

    fn on_status(&mut self, message: &str);

    fn on_batch_complete(&mut self, photos: &[Photo], batch_number: usize, total_batches: usize);
}

/// Progress information for an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskProgress {
    pub current: usize,
    pub total: usize,
}

impl TaskProgress {
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }

    /// Calculate progress percentage (0-100).
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            ((self.current as f64 / self.total as f64) * 100.0).min(100.0) as u8
        }
    }
}

/// Engine events as messages, for consumers on another thread or task.
#[derive(Debug, Clone)]
pub enum AnalysisUpdate {
    Progress(TaskProgress),
    Status(String),
    BatchComplete {
        photos: Vec<Photo>,
        batch_number: usize,
        total_batches: usize,
    },
}

/// Forwards events over a channel. A dropped receiver is ignored.
impl AnalysisObserver for UnboundedSender<AnalysisUpdate> {
    fn on_progress(&mut self, current: usize, total: usize) {
        let _ = self.send(AnalysisUpdate::Progress(TaskProgress::new(current, total)));
    }

    fn on_status(&mut self, message: &str) {
        let _ = self.send(AnalysisUpdate::Status(message.to_string()));
    }

    fn on_batch_complete(&mut self, photos: &[Photo], batch_number: usize, total_batches: usize) {
        let _ = self.send(AnalysisUpdate::BatchComplete {
            photos: photos.to_vec(),
            batch_number,
            total_batches,
        });
    }
}

/// Observer built from three closures.
pub struct Callbacks<P, S, B> {
    pub on_progress: P,
    pub on_status: S,
    pub on_batch_complete: B,
}

impl<P, S, B> Callbacks<P, S, B>
where
    P: FnMut(usize, usize),
    S: FnMut(&str),
    B: FnMut(&[Photo], usize, usize),
{
    pub fn new(on_progress: P, on_status: S, on_batch_complete: B) -> Self {
        Self {
            on_progress,
            on_status,
            on_batch_complete,
        }
    }
}

impl<P, S, B> AnalysisObserver for Callbacks<P, S, B>
where
    P: FnMut(usize, usize),
    S: FnMut(&str),
    B: FnMut(&[Photo], usize, usize),
{
    fn on_progress(&mut self, current: usize, total: usize) {
        (self.on_progress)(current, total)
    }

    fn on_status(&mut self, message: &str) {
        (self.on_status)(message)
    }

    fn on_batch_complete(&mut self, photos: &[Photo], batch_number: usize, total_batches: usize) {
        (self.on_batch_complete)(photos, batch_number, total_batches)
    }
}

/// Observer that ignores everything.
pub struct NullObserver;

impl AnalysisObserver for NullObserver {
    fn on_progress(&mut self, _current: usize, _total: usize) {}
    fn on_status(&mut self, _message: &str) {}
    fn on_batch_complete(&mut self, _photos: &[Photo], _batch_number: usize, _total_batches: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_percent() {
        assert_eq!(TaskProgress::new(0, 0).percent(), 0);
        assert_eq!(TaskProgress::new(25, 50).percent(), 50);
        assert_eq!(TaskProgress::new(60, 50).percent(), 100);
    }

    #[test]
    fn test_channel_observer_forwards_in_order() {
        let (mut tx, mut rx) = unbounded_channel();
        tx.on_progress(1, 3);
        tx.on_status("working");
        tx.on_batch_complete(&[], 1, 1);

        assert!(matches!(rx.try_recv().unwrap(), AnalysisUpdate::Progress(p) if p == TaskProgress::new(1, 3)));
        assert!(matches!(rx.try_recv().unwrap(), AnalysisUpdate::Status(ref s) if s == "working"));
        assert!(matches!(
            rx.try_recv().unwrap(),
            AnalysisUpdate::BatchComplete { batch_number: 1, total_batches: 1, .. }
        ));
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (mut tx, rx) = unbounded_channel::<AnalysisUpdate>();
        drop(rx);
        tx.on_status("nobody listening");
    }
}
