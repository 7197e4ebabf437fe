use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Thresholds and dwell intervals of the frame selection engine, as written
/// in the config file. Use [`SelectionConfig::params`] to get a validated copy.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// Defaults to the midpoint between `similarity_threshold` and 1.0.
    #[serde(default)]
    pub backoff_threshold: Option<f64>,
    #[serde(default = "default_initial_interval_secs")]
    pub initial_interval_secs: f64,
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,
    #[serde(default)]
    pub clock: ClockKind,
}

/// Where the engine's notion of "now" comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockKind {
    /// Monotonic time at which each frame is processed.
    #[default]
    Wall,
    /// Presentation timestamp carried by the frame.
    Stream,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
    #[serde(default = "default_refresh_every")]
    pub refresh_every: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            backoff_threshold: None,
            initial_interval_secs: default_initial_interval_secs(),
            max_interval_secs: default_max_interval_secs(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            clock: ClockKind::default(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            recent_capacity: default_recent_capacity(),
            refresh_every: default_refresh_every(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate a config document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.selection.params()?;
        Ok(config)
    }
}

impl SelectionConfig {
    pub fn params(&self) -> Result<SelectionParams, ConfigError> {
        let backoff = self
            .backoff_threshold
            .unwrap_or_else(|| SelectionParams::midpoint(self.similarity_threshold));
        let initial = secs_to_duration("initial_interval_secs", self.initial_interval_secs)?;
        let max = secs_to_duration("max_interval_secs", self.max_interval_secs)?;
        SelectionParams::new(self.similarity_threshold, backoff, initial, max)
    }
}

fn secs_to_duration(field: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidDuration { field, secs })
}

/// Validated selection parameters.
///
/// Invariants: `0 < similarity_threshold < backoff_threshold < 1` and
/// `0 < initial_interval <= max_interval`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionParams {
    similarity_threshold: f64,
    backoff_threshold: f64,
    initial_interval: Duration,
    max_interval: Duration,
}

impl SelectionParams {
    pub fn new(
        similarity_threshold: f64,
        backoff_threshold: f64,
        initial_interval: Duration,
        max_interval: Duration,
    ) -> Result<Self, ConfigError> {
        let ordered = 0.0 < similarity_threshold
            && similarity_threshold < backoff_threshold
            && backoff_threshold < 1.0;
        if !ordered {
            return Err(ConfigError::InvalidThresholds {
                similarity: similarity_threshold,
                backoff: backoff_threshold,
            });
        }
        if initial_interval.is_zero() || initial_interval > max_interval {
            return Err(ConfigError::InvalidIntervals {
                initial: initial_interval.as_secs_f64(),
                max: max_interval.as_secs_f64(),
            });
        }
        Ok(Self {
            similarity_threshold,
            backoff_threshold,
            initial_interval,
            max_interval,
        })
    }

    /// Build parameters whose backoff threshold sits halfway between
    /// `similarity_threshold` and 1.0.
    pub fn with_midpoint(
        similarity_threshold: f64,
        initial_interval: Duration,
        max_interval: Duration,
    ) -> Result<Self, ConfigError> {
        Self::new(
            similarity_threshold,
            Self::midpoint(similarity_threshold),
            initial_interval,
            max_interval,
        )
    }

    pub fn midpoint(similarity_threshold: f64) -> f64 {
        similarity_threshold + (1.0 - similarity_threshold) / 2.0
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    pub fn backoff_threshold(&self) -> f64 {
        self.backoff_threshold
    }

    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }
}

impl Default for SelectionParams {
    fn default() -> Self {
        let similarity_threshold = default_similarity_threshold();
        Self {
            similarity_threshold,
            backoff_threshold: Self::midpoint(similarity_threshold),
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("thresholds must satisfy 0 < similarity ({similarity}) < backoff ({backoff}) < 1")]
    InvalidThresholds { similarity: f64, backoff: f64 },
    #[error("intervals must satisfy 0 < initial ({initial}s) <= max ({max}s)")]
    InvalidIntervals { initial: f64, max: f64 },
    #[error("{field} must be a non-negative number of seconds, got {secs}")]
    InvalidDuration { field: &'static str, secs: f64 },
}

// Default value functions
fn default_similarity_threshold() -> f64 {
    0.85
}
fn default_initial_interval_secs() -> f64 {
    0.1
}
fn default_max_interval_secs() -> f64 {
    2.0
}
fn default_ffmpeg_path() -> PathBuf {
    "ffmpeg".into()
}
fn default_ffprobe_path() -> PathBuf {
    "ffprobe".into()
}
fn default_recent_capacity() -> usize {
    5
}
fn default_refresh_every() -> u64 {
    5
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        let params = config.selection.params().unwrap();
        assert_eq!(params.similarity_threshold(), 0.85);
        assert_eq!(params.backoff_threshold(), 0.925);
        assert!((params.initial_interval().as_secs_f64() - 0.1).abs() < 1e-9);
        assert_eq!(params.max_interval(), Duration::from_secs(2));
        assert_eq!(config.source.clock, ClockKind::Wall);
        assert_eq!(config.report.recent_capacity, 5);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn default_params_match_default_config() {
        let defaults = SelectionParams::default();
        assert_eq!(defaults.backoff_threshold(), 0.925);
        assert_eq!(defaults.initial_interval(), Duration::from_millis(100));
    }

    #[test]
    fn explicit_backoff_overrides_midpoint() {
        let config = Config::from_toml_str(
            r#"
            [selection]
            similarity_threshold = 0.7
            backoff_threshold = 0.95
            "#,
        )
        .unwrap();
        let params = config.selection.params().unwrap();
        assert_eq!(params.backoff_threshold(), 0.95);
    }

    #[test]
    fn stream_clock_parses() {
        let config = Config::from_toml_str("[source]\nclock = \"stream\"\n").unwrap();
        assert_eq!(config.source.clock, ClockKind::Stream);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let err = Config::from_toml_str(
            "[selection]\nsimilarity_threshold = 0.9\nbackoff_threshold = 0.8\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThresholds { .. }));
    }

    #[test]
    fn threshold_of_one_rejected() {
        let err = SelectionParams::with_midpoint(1.0, Duration::from_millis(100), Duration::from_secs(2))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidThresholds { .. }));
    }

    #[test]
    fn initial_above_max_rejected() {
        let err = SelectionParams::with_midpoint(0.85, Duration::from_secs(3), Duration::from_secs(2))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIntervals { .. }));
    }

    #[test]
    fn negative_interval_rejected() {
        let err =
            Config::from_toml_str("[selection]\ninitial_interval_secs = -1.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration {
                field: "initial_interval_secs",
                ..
            }
        ));
    }

    #[test]
    fn bad_max_interval_names_the_field() {
        let err = Config::from_toml_str("[selection]\nmax_interval_secs = -1.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidDuration {
                field: "max_interval_secs",
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "max_interval_secs must be a non-negative number of seconds, got -1"
        );
    }

    #[test]
    fn zero_interval_rejected() {
        let err = Config::from_toml_str("[selection]\ninitial_interval_secs = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIntervals { .. }));
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let err = Config::from_toml_str("[selection\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
