use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::encode::encode_for_upload;
use super::{QualityScorer, ScoreResult};
use crate::config::ScorerConfig;

/// HTTP/JSON client for the hosted quality scoring service.
#[derive(Clone)]
pub struct RemoteScorer {
    endpoint: String,
    score_agent: ureq::Agent,
    health_agent: ureq::Agent,
    max_dimension: u32,
    jpeg_quality: u8,
}

#[derive(Debug, Serialize)]
struct SingleRequest<'a> {
    image: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchRequest {
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SingleResponse {
    quality_score: Option<f64>,
    category: Option<String>,
    /// Seconds.
    processing_time: Option<f64>,
    success: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    results: Vec<SingleResponse>,
    summary: BatchSummary,
}

/// Aggregate figures returned by the batch endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    #[serde(default)]
    pub total_images: usize,
    #[serde(default)]
    pub successful_analyses: usize,
    #[serde(default)]
    pub failed_analyses: usize,
    #[serde(default)]
    pub average_score: f64,
    #[serde(default)]
    pub best_score: f64,
    #[serde(default)]
    pub worst_score: f64,
    #[serde(default)]
    pub category_distribution: HashMap<String, usize>,
    #[serde(default)]
    pub total_processing_time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchScoreResponse {
    pub results: Vec<ScoreResult>,
    pub summary: BatchSummary,
}

impl SingleResponse {
    fn into_score_result(self) -> ScoreResult {
        if !self.success {
            return ScoreResult::failure(
                self.error
                    .unwrap_or_else(|| "Scoring service reported failure".to_string()),
            );
        }

        let score = match self.quality_score {
            Some(score) if score.is_finite() => score,
            Some(_) => return ScoreResult::failure("Non-finite quality_score in response"),
            None => return ScoreResult::failure("Response missing quality_score"),
        };

        let processing_ms = self.processing_time.unwrap_or(0.0) * 1000.0;
        ScoreResult::success(score, self.category.unwrap_or_default(), processing_ms)
    }
}

/// Map a raw `/analyze-single` body to a result. Malformed JSON is a failure.
pub(crate) fn parse_single_response(body: &str) -> ScoreResult {
    match serde_json::from_str::<SingleResponse>(body) {
        Ok(response) => response.into_score_result(),
        Err(e) => ScoreResult::failure(format!("Malformed scoring response: {}", e)),
    }
}

pub(crate) fn parse_batch_response(body: &str) -> Result<BatchScoreResponse> {
    let response: BatchResponse = serde_json::from_str(body)
        .map_err(|e| anyhow!("Malformed batch scoring response: {}", e))?;

    Ok(BatchScoreResponse {
        results: response
            .results
            .into_iter()
            .map(SingleResponse::into_score_result)
            .collect(),
        summary: response.summary,
    })
}

fn describe_error(err: ureq::Error) -> String {
    match err {
        ureq::Error::Status(code, _) => format!("Scoring service returned HTTP {}", code),
        ureq::Error::Transport(t) => format!("Scoring request failed: {}", t),
    }
}

impl RemoteScorer {
    pub fn new(config: &ScorerConfig) -> Self {
        let score_agent = ureq::AgentBuilder::new()
            .timeout(config.score_timeout())
            .build();
        let health_agent = ureq::AgentBuilder::new()
            .timeout(config.health_timeout())
            .build();

        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            score_agent,
            health_agent,
            max_dimension: config.max_dimension,
            jpeg_quality: config.jpeg_quality,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Score several images in one request through `/analyze-batch`.
    pub fn score_batch(&self, images: &[Vec<u8>]) -> Result<BatchScoreResponse> {
        let request = BatchRequest {
            images: images
                .iter()
                .map(|bytes| encode_for_upload(bytes, self.max_dimension, self.jpeg_quality))
                .collect(),
        };

        let url = format!("{}/analyze-batch", self.endpoint);
        let body = self
            .score_agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_json(&request)
            .map_err(|e| anyhow!(describe_error(e)))?
            .into_string()
            .map_err(|e| anyhow!("Failed to read batch scoring response: {}", e))?;

        let parsed = parse_batch_response(&body)?;
        if parsed.results.len() != images.len() {
            return Err(anyhow!(
                "Batch scoring returned {} results for {} images",
                parsed.results.len(),
                images.len()
            ));
        }
        Ok(parsed)
    }
}

impl QualityScorer for RemoteScorer {
    fn score_single(&self, image_bytes: &[u8]) -> ScoreResult {
        let image = encode_for_upload(image_bytes, self.max_dimension, self.jpeg_quality);
        let url = format!("{}/analyze-single", self.endpoint);

        let response = match self
            .score_agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_json(SingleRequest { image: &image })
        {
            Ok(response) => response,
            Err(e) => {
                let message = describe_error(e);
                tracing::warn!(error = %message, "Scoring request failed");
                return ScoreResult::failure(message);
            }
        };

        match response.into_string() {
            Ok(body) => parse_single_response(&body),
            Err(e) => ScoreResult::failure(format!("Failed to read scoring response: {}", e)),
        }
    }

    fn is_healthy(&self) -> bool {
        let url = format!("{}/health", self.endpoint);
        match self.health_agent.get(&url).call() {
            Ok(response) => response.status() == 200,
            Err(e) => {
                tracing::debug!(error = %e, "Scoring service health probe failed");
                false
            }
        }
    }

    fn scorer_name(&self) -> &'static str {
        "remote"
    }
}
