use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::duration::{deserialize_duration, serialize_duration};

/// Default time zone used to decide whether the current period is already billed.
fn default_timezone() -> String {
    "America/Santiago".to_string()
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_base_url() -> String {
    "https://portalpersonas.bancochile.cl/mibancochile/rest/persona".to_string()
}

fn default_login_url() -> String {
    "https://login.portales.bancochile.cl/login".to_string()
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(500)
}

fn default_session_max_age() -> Duration {
    Duration::from_secs(10 * 60)
}

/// Retry behavior at the provider fetch boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request. `1` disables retries.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubled for every further attempt.
    #[serde(
        default = "default_initial_backoff",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub initial_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: default_initial_backoff(),
        }
    }
}

/// Data provider endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of the provider's REST API.
    pub base_url: String,

    /// Page opened by the browser login.
    pub login_url: String,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            login_url: default_login_url(),
            retry: RetryConfig::default(),
        }
    }
}

/// Which description heuristic the recurring-charge detector uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicyKind {
    /// A single shared word is enough.
    Weak,
    /// Word length, case and shared-word thresholds apply.
    Strict,
}

/// Similarity matcher configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub policy: MatchPolicyKind,

    /// Maximum absolute difference between two amounts, in currency units.
    pub amount_tolerance: Decimal,

    /// Strict policy only: compare words case-insensitively.
    pub ignore_case: bool,

    /// Strict policy only: shorter words are ignored.
    pub min_word_len: usize,

    /// Strict policy only: how many words must be shared.
    pub min_shared_words: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            policy: MatchPolicyKind::Weak,
            amount_tolerance: Decimal::new(6, 1),
            ignore_case: true,
            min_word_len: 3,
            min_shared_words: 1,
        }
    }
}

/// Session reuse settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cached sessions older than this trigger a fresh login.
    #[serde(
        default = "default_session_max_age",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub max_age: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_age: default_session_max_age(),
        }
    }
}

/// Run-level behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// When true, a card whose data cannot be fetched is skipped and listed in
    /// the snapshot instead of aborting the whole run.
    pub isolate_card_failures: bool,
}

/// Display/output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Decimal places for local currency values.
    pub currency_decimals: u32,

    /// Thousands separator, empty to disable grouping.
    pub grouping_separator: String,

    /// Decimal separator used when `currency_decimals > 0`.
    pub decimal_separator: String,

    /// Prefix for rendered amounts.
    pub currency_symbol: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_decimals: 0,
            grouping_separator: ".".to_string(),
            decimal_separator: ",".to_string(),
            currency_symbol: "$".to_string(),
        }
    }
}

/// A fixed monthly expense reported next to the computed totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedExpense {
    pub name: String,
    pub amount: Decimal,
}

/// Sum of the configured fixed expenses.
pub fn fixed_expenses_total(expenses: &[FixedExpense]) -> Decimal {
    expenses.iter().map(|e| e.amount).sum()
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// Snapshot directory, relative to the data directory unless absolute.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    /// IANA time zone name for the wall-clock "today".
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub matching: MatchingConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub fixed_expenses: Vec<FixedExpense>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            results_dir: default_results_dir(),
            timezone: default_timezone(),
            provider: ProviderConfig::default(),
            matching: MatchingConfig::default(),
            session: SessionConfig::default(),
            run: RunConfig::default(),
            display: DisplayConfig::default(),
            fixed_expenses: Vec::new(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }

    fn resolve(self, config_dir: &Path) -> Result<ResolvedConfig> {
        let data_dir = self.resolve_data_dir(config_dir);
        let results_dir = if self.results_dir.is_absolute() {
            self.results_dir.clone()
        } else {
            data_dir.join(&self.results_dir)
        };
        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid timezone {:?}: {e}", self.timezone))?;

        Ok(ResolvedConfig {
            data_dir,
            results_dir,
            timezone,
            provider: self.provider,
            matching: self.matching,
            session: self.session,
            run: self.run,
            display: self.display,
            fixed_expenses: self.fixed_expenses,
        })
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The resolved data directory path.
    pub data_dir: PathBuf,

    /// Where `latest.json` and archived snapshots live.
    pub results_dir: PathBuf,

    pub timezone: Tz,
    pub provider: ProviderConfig,
    pub matching: MatchingConfig,
    pub session: SessionConfig,
    pub run: RunConfig,
    pub display: DisplayConfig,
    pub fixed_expenses: Vec<FixedExpense>,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./cardbook.toml` if it exists in current directory
/// 2. `~/.local/share/cardbook/cardbook.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("cardbook.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("cardbook").join("cardbook.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        Config::load(&config_path)?.resolve(config_dir)
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// If the config file doesn't exist, uses the config file's intended
    /// parent directory as the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            let config_path = if config_path.is_relative() {
                std::env::current_dir()
                    .context("Failed to get current directory")?
                    .join(config_path)
            } else {
                config_path.to_path_buf()
            };

            let config_dir = config_path
                .parent()
                .context("Config path has no parent directory")?;

            Config::default().resolve(config_dir)
        }
    }

    pub fn fixed_expenses_total(&self) -> Decimal {
        fixed_expenses_total(&self.fixed_expenses)
    }
}
