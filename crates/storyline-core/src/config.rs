//! Configuration loading and typed config structures for the tracker.
//!
//! The canonical configuration lives in `storyline-config.yaml`. Every field
//! has a default, so an empty file (or no file at all) yields a working
//! setup.

use std::path::Path;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is out of range.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `storyline-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Event store cadence.
    #[serde(default)]
    pub store: StoreConfig,

    /// Extraction scheduling.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// List consolidation bounds.
    #[serde(default)]
    pub consolidation: ConsolidationConfig,

    /// Chapter detection.
    #[serde(default)]
    pub chapters: ChapterConfig,

    /// Generation call limits.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `STORYLINE_SNAPSHOT_INTERVAL` overrides
    /// `store.snapshot_interval_events` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.store.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.snapshot_interval_events == 0 {
            return Err(ConfigError::Invalid {
                field: "store.snapshot_interval_events",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.scheduler.consolidation_every == 0 {
            return Err(ConfigError::Invalid {
                field: "scheduler.consolidation_every",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.consolidation.min_entries > self.consolidation.max_entries {
            return Err(ConfigError::Invalid {
                field: "consolidation.min_entries",
                reason: format!(
                    "{} exceeds max_entries {}",
                    self.consolidation.min_entries, self.consolidation.max_entries
                ),
            });
        }
        if self.llm.max_concurrent_calls == 0 {
            return Err(ConfigError::Invalid {
                field: "llm.max_concurrent_calls",
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

/// Event store cadence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Write a snapshot once this many events follow the previous one.
    #[serde(default = "default_snapshot_interval_events")]
    pub snapshot_interval_events: usize,
}

impl StoreConfig {
    /// Override the snapshot interval from the environment when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("STORYLINE_SNAPSHOT_INTERVAL")
            && let Ok(parsed) = val.parse()
        {
            self.snapshot_interval_events = parsed;
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_events: default_snapshot_interval_events(),
        }
    }
}

/// Extraction scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Upper bound on messages handed to any extractor.
    #[serde(default = "default_max_window_messages")]
    pub max_window_messages: u32,

    /// Consolidation runs every this many messages.
    #[serde(default = "default_consolidation_every")]
    pub consolidation_every: u32,

    /// Offset for the consolidation cadence.
    #[serde(default)]
    pub consolidation_offset: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_window_messages: default_max_window_messages(),
            consolidation_every: default_consolidation_every(),
            consolidation_offset: 0,
        }
    }
}

/// List consolidation bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ConsolidationConfig {
    /// Never shrink a list below this many entries.
    #[serde(default = "default_min_entries")]
    pub min_entries: usize,

    /// Never let a consolidated list exceed this many entries.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            min_entries: default_min_entries(),
            max_entries: default_max_entries(),
        }
    }
}

/// Chapter detection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChapterConfig {
    /// Minimum messages between two chapter boundaries.
    #[serde(default = "default_chapter_min_messages")]
    pub min_messages: u32,
}

impl Default for ChapterConfig {
    fn default() -> Self {
        Self {
            min_messages: default_chapter_min_messages(),
        }
    }
}

/// Generation call limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LlmConfig {
    /// Per-call deadline in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Fan-out units that may call the generator at once.
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            max_concurrent_calls: default_max_concurrent_calls(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_snapshot_interval_events() -> usize {
    40
}

const fn default_max_window_messages() -> u32 {
    12
}

const fn default_consolidation_every() -> u32 {
    6
}

const fn default_min_entries() -> usize {
    2
}

const fn default_max_entries() -> usize {
    5
}

const fn default_chapter_min_messages() -> u32 {
    4
}

const fn default_request_timeout_ms() -> u64 {
    20_000
}

const fn default_max_concurrent_calls() -> usize {
    4
}

fn default_log_level() -> String {
    "info".to_owned()
}
