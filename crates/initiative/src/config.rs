//! Configuration file loading and parsing.
//!
//! The viewer reads an optional TOML file. Every field is optional; accessors
//! fall back to the defaults used against a stock Jira Data Center instance.

use anyhow::{Context, Result};
use chrono::Duration;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Directory name of the disk cache under the system temp directory.
pub const CACHE_DIR_NAME: &str = "initiative_viewer_data";

/// Upper bound of the cache TTL, one year.
const MAX_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewerConfig {
    /// Jira field ids and request limits (optional).
    #[serde(default)]
    pub jira: JiraConfig,
    /// Status names with workflow meaning (optional).
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Result cache settings (optional).
    #[serde(default)]
    pub cache: CacheConfig,
    /// Report layout settings (optional).
    #[serde(default)]
    pub report: ReportConfig,
}

/// Jira field ids and request limits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JiraConfig {
    /// Risk field id; discovered by display name when absent.
    pub risk_field: Option<String>,
    /// Rank field id (default: customfield_10019).
    pub rank_field: Option<String>,
    /// Sprint field id (default: customfield_10020).
    pub sprint_field: Option<String>,
    /// Page size for search requests (default: 200).
    pub batch_size: Option<usize>,
    /// Maximum issues fetched per search (default: 5000).
    pub max_results: Option<usize>,
    /// Connect timeout in seconds (default: 15).
    pub connect_timeout_secs: Option<u64>,
    /// Read timeout in seconds (default: 60).
    pub read_timeout_secs: Option<u64>,
}

impl JiraConfig {
    pub fn rank_field(&self) -> String {
        self.rank_field
            .clone()
            .unwrap_or_else(|| "customfield_10019".to_string())
    }

    pub fn sprint_field(&self) -> String {
        self.sprint_field
            .clone()
            .unwrap_or_else(|| "customfield_10020".to_string())
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(200).max(1)
    }

    pub fn max_results(&self) -> usize {
        self.max_results.unwrap_or(5000)
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_secs.unwrap_or(15))
    }

    pub fn read_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.read_timeout_secs.unwrap_or(60))
    }
}

/// Status names with workflow meaning.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowConfig {
    /// Statuses excluded from the backward check.
    pub closed_statuses: Option<Vec<String>>,
    /// Statuses counted as completed in statistics and reports.
    pub completed_statuses: Option<Vec<String>>,
}

impl WorkflowConfig {
    pub fn closed_statuses(&self) -> Vec<String> {
        self.closed_statuses.clone().unwrap_or_else(|| {
            ["Done", "Closed", "Resolved", "Completed", "Prod deployed"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
    }

    pub fn completed_statuses(&self) -> Vec<String> {
        self.completed_statuses.clone().unwrap_or_else(|| {
            ["Done", "Closed", "Completed", "Resolved", "Prod deployed"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds (default: 3600).
    pub ttl_secs: Option<i64>,
    /// Cache directory (default: `<temp dir>/initiative_viewer_data`).
    pub dir: Option<PathBuf>,
}

impl CacheConfig {
    /// Entry lifetime, clamped to 1 second .. 365 days.
    pub fn ttl(&self) -> Duration {
        Duration::seconds(self.ttl_secs.unwrap_or(3600).clamp(1, MAX_TTL_SECS))
    }

    pub fn dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(CACHE_DIR_NAME))
    }
}

/// Report layout settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    /// Area columns per PDF view before splitting (default: 5).
    pub max_areas_per_view: Option<usize>,
}

impl ReportConfig {
    pub fn max_areas_per_view(&self) -> usize {
        self.max_areas_per_view.unwrap_or(5).max(1)
    }
}

impl ViewerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns the default config if the file doesn't exist.
    /// Returns an error if the file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(ViewerConfig::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: ViewerConfig = toml::from_str(content)?;
        Ok(config)
    }
}
