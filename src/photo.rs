//! Photo records and their analysis fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Free-form diagnostic details attached to an analysis (remote category,
/// processing time, failure reason, ...).
pub type MethodDetails = BTreeMap<String, serde_json::Value>;

/// Coarse quality verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Good,
    Bad,
}

/// How an analysis result was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMethod {
    /// Remote service answered with a usable category.
    Primary,
    /// Remote service answered but the category was unusable; decided by score threshold.
    Fallback,
    /// No usable answer. Terminal for the session, never cached.
    Failed,
}

/// Per-photo analysis state as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Unanalyzed,
    /// Only visible from inside the engine while it holds the photo.
    Analyzing,
    AnalyzedGood,
    AnalyzedBad,
    AnalyzedFailed,
}

/// A photo materialized from the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub width: u32,
    pub height: u32,
    pub file_size_bytes: u64,
    pub title: Option<String>,

    pub quality_score: Option<f64>,
    pub category: Option<Category>,
    pub method: Option<AnalysisMethod>,
    pub analyzed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub raw_method_details: MethodDetails,

    #[serde(skip)]
    pub selected: bool,
    #[serde(skip)]
    pub(crate) in_flight: bool,
}

impl Photo {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            created_at,
            width: 0,
            height: 0,
            file_size_bytes: 0,
            title: None,
            quality_score: None,
            category: None,
            method: None,
            analyzed_at: None,
            raw_method_details: MethodDetails::new(),
            selected: false,
            in_flight: false,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_size(mut self, bytes: u64) -> Self {
        self.file_size_bytes = bytes;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// A photo is analyzed once both a category and a score are recorded.
    pub fn is_analyzed(&self) -> bool {
        self.category.is_some() && self.quality_score.is_some()
    }

    pub fn state(&self) -> AnalysisState {
        if self.in_flight {
            return AnalysisState::Analyzing;
        }
        match (self.category, self.quality_score, self.method) {
            (Some(_), Some(_), Some(AnalysisMethod::Failed)) => AnalysisState::AnalyzedFailed,
            (Some(Category::Good), Some(_), _) => AnalysisState::AnalyzedGood,
            (Some(Category::Bad), Some(_), _) => AnalysisState::AnalyzedBad,
            _ => AnalysisState::Unanalyzed,
        }
    }

    /// Failed analyses sort with the bad photos.
    pub fn is_bad(&self) -> bool {
        self.is_analyzed() && self.category == Some(Category::Bad)
    }

    pub fn is_good(&self) -> bool {
        self.is_analyzed() && self.category == Some(Category::Good)
    }

    pub(crate) fn record_failure(&mut self, details: MethodDetails) {
        self.quality_score = Some(0.0);
        self.category = Some(Category::Bad);
        self.method = Some(AnalysisMethod::Failed);
        self.analyzed_at = Some(Utc::now());
        self.raw_method_details = details;
    }

    /// Drop any analysis so the photo is picked up again.
    pub fn reset_analysis(&mut self) {
        self.quality_score = None;
        self.category = None;
        self.method = None;
        self.analyzed_at = None;
        self.raw_method_details.clear();
        self.in_flight = false;
    }
}
