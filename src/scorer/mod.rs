//! Quality scoring boundary.
//!
//! Scorers never fail loudly: every transport or protocol problem comes back
//! as a [`ScoreResult`] with `success == false`, and health probes collapse
//! to a plain `bool`.

pub mod encode;
pub mod remote;

use serde::{Deserialize, Serialize};

use crate::photo::MethodDetails;

pub use remote::{BatchScoreResponse, BatchSummary, RemoteScorer};

/// Trait for services that can score an encoded image.
pub trait QualityScorer: Send + Sync {
    /// Score one encoded image.
    fn score_single(&self, image_bytes: &[u8]) -> ScoreResult;

    /// Cheap liveness probe.
    fn is_healthy(&self) -> bool;

    /// Name for logs.
    fn scorer_name(&self) -> &'static str {
        "scorer"
    }
}

/// Outcome of one scoring call. `score` is on the remote 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub success: bool,
    pub score: f64,
    /// Category exactly as the service reported it.
    pub category: String,
    pub processing_time_ms: f64,
    pub error: Option<String>,
}

impl ScoreResult {
    pub fn success(score: f64, category: impl Into<String>, processing_time_ms: f64) -> Self {
        Self {
            success: true,
            score,
            category: category.into(),
            processing_time_ms,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            score: 0.0,
            category: String::new(),
            processing_time_ms: 0.0,
            error: Some(error.into()),
        }
    }

    /// Score mapped onto 0.0-1.0.
    pub fn normalized_score(&self) -> f64 {
        (self.score / 100.0).clamp(0.0, 1.0)
    }

    pub fn remote_category(&self) -> Option<RemoteCategory> {
        RemoteCategory::parse(&self.category)
    }

    /// Diagnostics kept alongside the analysis, including the untouched
    /// three-way category.
    pub fn method_details(&self) -> MethodDetails {
        let mut details = MethodDetails::new();
        if self.success {
            details.insert("remote_category".to_string(), self.category.clone().into());
            details.insert("remote_score".to_string(), self.score.into());
            details.insert("processing_time_ms".to_string(), self.processing_time_ms.into());
        } else if let Some(ref error) = self.error {
            details.insert("reason".to_string(), "scoring_failed".into());
            details.insert("error".to_string(), error.clone().into());
        }
        details
    }
}

/// Three-way verdict of the scoring service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCategory {
    Good,
    Moderate,
    Bad,
}

impl RemoteCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "good" => Some(RemoteCategory::Good),
            "moderate" => Some(RemoteCategory::Moderate),
            "bad" => Some(RemoteCategory::Bad),
            _ => None,
        }
    }
}
