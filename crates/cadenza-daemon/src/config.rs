//! Configuration file management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use cadenza_royalty::fraud::FraudConfig;
use cadenza_treasury::splits::FundSplit;

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Stream qualification and fraud counting.
    #[serde(default)]
    pub fraud: FraudSettings,
    /// Fund split percentages and infrastructure cost.
    #[serde(default)]
    pub treasury: TreasurySettings,
    /// Period job scheduling and promotion thresholds.
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// RPC settings.
    #[serde(default)]
    pub rpc: RpcSettings,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Stream qualification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudSettings {
    /// Minimum play duration in seconds for a qualified stream.
    #[serde(default = "default_min_duration")]
    pub min_duration_secs: u32,
    /// Fraud score cutoff in [0, 1].
    #[serde(default = "default_score_cutoff")]
    pub score_cutoff: f64,
}

/// Treasury configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasurySettings {
    /// Platform operations share percentage.
    #[serde(default = "default_platform_ops_pct")]
    pub platform_ops_pct: u8,
    /// Priority-artist fund share percentage.
    #[serde(default = "default_priority_fund_pct")]
    pub priority_fund_pct: u8,
    /// Governance share percentage.
    #[serde(default = "default_governance_pct")]
    pub governance_pct: u8,
    /// R&D share percentage.
    #[serde(default = "default_research_dev_pct")]
    pub research_dev_pct: u8,
    /// General creator pool share percentage.
    #[serde(default = "default_creator_pool_pct")]
    pub creator_pool_pct: u8,
    /// Fixed infrastructure cost debited from platform-ops per period.
    #[serde(default = "default_infra_cost")]
    pub infra_cost_cents: i64,
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Run the period-job timer loop.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Timer tick interval in seconds.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Minimum uploads for priority auto-promotion.
    #[serde(default = "default_min_uploads")]
    pub priority_min_uploads: i64,
    /// Minimum quality score for priority auto-promotion.
    #[serde(default = "default_min_quality")]
    pub priority_min_quality: f64,
    /// Minimum qualified streams per period for priority auto-promotion.
    #[serde(default = "default_min_streams")]
    pub priority_min_streams: i64,
}

/// RPC configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcSettings {
    /// Token required by elevated (trigger/override) methods.
    /// Empty = generated at startup and logged.
    #[serde(default)]
    pub admin_token: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path. Empty = stderr.
    #[serde(default)]
    pub log_file: String,
}

// Default value functions

fn default_min_duration() -> u32 {
    cadenza_types::MIN_QUALIFIED_DURATION_SECS
}

fn default_score_cutoff() -> f64 {
    cadenza_types::FRAUD_SCORE_CUTOFF
}

fn default_platform_ops_pct() -> u8 {
    cadenza_treasury::splits::DEFAULT_PLATFORM_OPS_PCT
}

fn default_priority_fund_pct() -> u8 {
    cadenza_treasury::splits::DEFAULT_PRIORITY_FUND_PCT
}

fn default_governance_pct() -> u8 {
    cadenza_treasury::splits::DEFAULT_GOVERNANCE_PCT
}

fn default_research_dev_pct() -> u8 {
    cadenza_treasury::splits::DEFAULT_RESEARCH_DEV_PCT
}

fn default_creator_pool_pct() -> u8 {
    cadenza_treasury::splits::DEFAULT_CREATOR_POOL_PCT
}

fn default_infra_cost() -> i64 {
    250_000 // $2,500 per period
}

fn default_true() -> bool {
    true
}

fn default_tick_secs() -> u64 {
    300
}

fn default_min_uploads() -> i64 {
    10
}

fn default_min_quality() -> f64 {
    0.75
}

fn default_min_streams() -> i64 {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: String::new(),
        }
    }
}

impl Default for FraudSettings {
    fn default() -> Self {
        Self {
            min_duration_secs: default_min_duration(),
            score_cutoff: default_score_cutoff(),
        }
    }
}

impl Default for TreasurySettings {
    fn default() -> Self {
        Self {
            platform_ops_pct: default_platform_ops_pct(),
            priority_fund_pct: default_priority_fund_pct(),
            governance_pct: default_governance_pct(),
            research_dev_pct: default_research_dev_pct(),
            creator_pool_pct: default_creator_pool_pct(),
            infra_cost_cents: default_infra_cost(),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_secs: default_tick_secs(),
            priority_min_uploads: default_min_uploads(),
            priority_min_quality: default_min_quality(),
            priority_min_streams: default_min_streams(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// The configured fund split.
    pub fn fund_split(&self) -> FundSplit {
        FundSplit {
            platform_ops_pct: self.treasury.platform_ops_pct,
            priority_fund_pct: self.treasury.priority_fund_pct,
            governance_pct: self.treasury.governance_pct,
            research_dev_pct: self.treasury.research_dev_pct,
            creator_pool_pct: self.treasury.creator_pool_pct,
        }
    }

    /// The configured fraud thresholds.
    pub fn fraud_config(&self) -> FraudConfig {
        FraudConfig {
            min_duration_secs: self.fraud.min_duration_secs,
            score_cutoff: self.fraud.score_cutoff,
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        // Check env var override first
        if let Ok(dir) = std::env::var("CADENZA_DATA_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("CADENZA_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Cadenza")
        }
        #[cfg(target_os = "linux")]
        {
            dirs_fallback(".cadenza")
        }
        #[cfg(target_os = "windows")]
        {
            dirs_fallback("Cadenza")
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            dirs_fallback(".cadenza")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/cadenza"))
}
