//! Configuration for the token ledger

use crate::history::{MemoryBudget, RetentionPolicy};
use crate::Error;
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Bound of the writer mailbox (requests queued before callers wait)
    pub mailbox_capacity: usize,

    /// History configuration
    pub history: HistoryConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "token-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            mailbox_capacity: 1000,
            history: HistoryConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// History configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// How many entries stay in memory
    pub retention: RetentionPolicy,

    /// Largest page handed out by `get_history`, uncapped when unset
    pub max_page_limit: Option<u64>,

    /// Bytes the retained entries may occupy, unbounded when unset
    pub memory_budget_bytes: Option<u64>,

    /// Budget usage (percent) at which a low-memory warning is logged
    pub low_memory_threshold_percent: u8,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention: RetentionPolicy::Unbounded,
            max_page_limit: None,
            memory_budget_bytes: None,
            low_memory_threshold_percent: 90,
        }
    }
}

impl HistoryConfig {
    /// Memory budget for the history log, if one is configured
    pub fn memory_budget(&self) -> Option<MemoryBudget> {
        self.memory_budget_bytes
            .map(|max_bytes| MemoryBudget::new(max_bytes, self.low_memory_threshold_percent))
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Maintain the Prometheus collector
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(capacity) = std::env::var("TOKEN_LEDGER_MAILBOX_CAPACITY") {
            config.mailbox_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid TOKEN_LEDGER_MAILBOX_CAPACITY: {}", e))
            })?;
        }

        if let Ok(retention) = std::env::var("TOKEN_LEDGER_HISTORY_RETENTION") {
            config.history.retention = retention.parse()?;
        }

        if let Ok(limit) = std::env::var("TOKEN_LEDGER_MAX_PAGE_LIMIT") {
            config.history.max_page_limit = Some(limit.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid TOKEN_LEDGER_MAX_PAGE_LIMIT: {}", e))
            })?);
        }

        if let Ok(budget) = std::env::var("TOKEN_LEDGER_HISTORY_MEMORY_BUDGET") {
            config.history.memory_budget_bytes = Some(budget.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid TOKEN_LEDGER_HISTORY_MEMORY_BUDGET: {}", e))
            })?);
        }

        if let Ok(level) = std::env::var("TOKEN_LEDGER_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(json) = std::env::var("TOKEN_LEDGER_LOG_JSON") {
            config.logging.json = matches!(json.as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the ledger cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.mailbox_capacity == 0 {
            return Err(Error::Config(
                "mailbox_capacity must be greater than zero".to_string(),
            ));
        }

        if self.history.max_page_limit == Some(0) {
            return Err(Error::Config(
                "history.max_page_limit must be greater than zero".to_string(),
            ));
        }

        if self.history.retention == RetentionPolicy::KeepLast(0) {
            return Err(Error::Config(
                "history.retention must keep at least one entry".to_string(),
            ));
        }

        if self.history.memory_budget_bytes == Some(0) {
            return Err(Error::Config(
                "history.memory_budget_bytes must be greater than zero".to_string(),
            ));
        }

        if !(1..=100).contains(&self.history.low_memory_threshold_percent) {
            return Err(Error::Config(format!(
                "history.low_memory_threshold_percent must be within 1..=100, got {}",
                self.history.low_memory_threshold_percent
            )));
        }

        Ok(())
    }
}
