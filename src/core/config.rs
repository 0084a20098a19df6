use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const SYMBOL_PLACEHOLDER: &str = "{symbol}";
pub const API_KEY_PLACEHOLDER: &str = "{apiKey}";
pub const API_KEY_ENV: &str = "BULLRUN_API_KEY";

/// Whether a record that already has a logo gets it downloaded again.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogoPolicy {
    #[default]
    SkipIfPresent,
    AlwaysRefetch,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    pub price_url: String,
    pub logo_url: String,
    pub profile_url: String,
    pub previous_close_url: String,
    /// RSS 2.0 headline feed. Needs no API key.
    #[serde(default = "default_news_url")]
    pub news_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn templates(&self) -> [(&'static str, &str); 5] {
        [
            ("price_url", &self.price_url),
            ("logo_url", &self.logo_url),
            ("profile_url", &self.profile_url),
            ("previous_close_url", &self.previous_close_url),
            ("news_url", &self.news_url),
        ]
    }
}

fn default_news_url() -> String {
    "https://feeds.finance.yahoo.com/rss/2.0/headline?s={symbol}".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub logo_policy: LogoPolicy,
}

fn default_concurrency() -> usize {
    4
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            concurrency: default_concurrency(),
            logo_policy: LogoPolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_true")]
    pub weekdays_only: bool,
    #[serde(default)]
    pub hour: u32,
    #[serde(default)]
    pub minute: u32,
    #[serde(default)]
    pub run_on_start: bool,
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            timezone: default_timezone(),
            weekdays_only: true,
            hour: 0,
            minute: 0,
            run_on_start: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "thompson", "bullrun")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("com", "thompson", "bullrun")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config = Self::from_yaml(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            debug!("Using API key from {}", API_KEY_ENV);
            config.provider.api_key = key;
        }
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (name, template) in self.provider.templates() {
            if !template.contains(SYMBOL_PLACEHOLDER) {
                bail!("provider.{name} must contain the {SYMBOL_PLACEHOLDER} placeholder");
            }
        }
        if self.sync.concurrency == 0 {
            bail!("sync.concurrency must be at least 1");
        }
        if self.provider.timeout_secs == 0 {
            bail!("provider.timeout_secs must be at least 1");
        }
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            bail!(
                "schedule time {:02}:{:02} is not a valid time of day",
                self.schedule.hour,
                self.schedule.minute
            );
        }
        Ok(())
    }
}
