use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hard ceilings for remote calls.
pub const MAX_SCORE_TIMEOUT_SECS: u64 = 30;
pub const MAX_HEALTH_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub scorer: ScorerConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub thumbnails: ThumbnailConfig,

    #[serde(default)]
    pub trash: TrashConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_library_path")]
    pub path: PathBuf,

    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

fn default_library_path() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_image_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "webp", "bmp", "tiff"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path: default_library_path(),
            image_extensions: default_image_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    #[serde(default = "default_scorer_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_score_timeout")]
    pub score_timeout_secs: u64,

    #[serde(default = "default_health_timeout")]
    pub health_timeout_secs: u64,

    /// Longest side, in pixels, of the image sent for scoring.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_scorer_endpoint() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_score_timeout() -> u64 {
    MAX_SCORE_TIMEOUT_SECS
}

fn default_health_timeout() -> u64 {
    MAX_HEALTH_TIMEOUT_SECS
}

fn default_max_dimension() -> u32 {
    1024
}

fn default_jpeg_quality() -> u8 {
    85
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_scorer_endpoint(),
            score_timeout_secs: default_score_timeout(),
            health_timeout_secs: default_health_timeout(),
            max_dimension: default_max_dimension(),
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

impl ScorerConfig {
    pub fn score_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.score_timeout_secs.clamp(1, MAX_SCORE_TIMEOUT_SECS))
    }

    pub fn health_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.health_timeout_secs.clamp(1, MAX_HEALTH_TIMEOUT_SECS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Photos materialized by the first load.
    #[serde(default = "default_batch_size")]
    pub initial_load: usize,

    /// Below this many loaded-but-unanalyzed photos, continuing loads another page first.
    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: usize,

    /// Normalized score at or above which a photo counts as good when the
    /// remote category is unusable.
    #[serde(default = "default_good_threshold")]
    pub good_threshold: f64,
}

fn default_batch_size() -> usize {
    50
}

fn default_low_water_mark() -> usize {
    10
}

fn default_good_threshold() -> f64 {
    0.6
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            initial_load: default_batch_size(),
            low_water_mark: default_low_water_mark(),
            good_threshold: default_good_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_expiry_days")]
    pub expiry_days: u32,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_cache_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("phototriage")
        .join("cache.db")
}

fn default_expiry_days() -> u32 {
    7
}

fn default_max_entries() -> usize {
    1000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_cache_db_path(),
            expiry_days: default_expiry_days(),
            max_entries: default_max_entries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    #[serde(default = "default_thumb_cache_path")]
    pub path: PathBuf,

    #[serde(default = "default_thumb_size")]
    pub size: u32,
}

fn default_thumb_cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("phototriage/thumbnails")
}

fn default_thumb_size() -> u32 {
    512
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            path: default_thumb_cache_path(),
            size: default_thumb_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashConfig {
    /// When false, deleted photos are removed outright.
    #[serde(default = "default_trash_enabled")]
    pub enabled: bool,

    #[serde(default = "default_trash_path")]
    pub path: PathBuf,
}

fn default_trash_enabled() -> bool {
    true
}

fn default_trash_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("phototriage/.trash")
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            enabled: default_trash_enabled(),
            path: default_trash_path(),
        }
    }
}

impl Config {
    /// Load from `PHOTOTRIAGE_CONFIG` or the default location, writing defaults
    /// out if no file exists yet.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var_os("PHOTOTRIAGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(Self::config_path);

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("phototriage")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}
