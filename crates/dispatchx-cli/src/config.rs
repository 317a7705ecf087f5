//! Binary configuration
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML file,
//! then `DISPATCHX__*` environment variables (`.env` is loaded first when
//! present). Nested keys use `__`, e.g. `DISPATCHX__TIMEOUTS__EMAIL_MS=2000`.

use anyhow::{Context, Result};
use ::config::{Config as ConfigBuilder, Environment, File, FileFormat};
use dispatchx_core::logging_facility::Profile;
use dispatchx_engine::adapters::calendar::{DEFAULT_BUSINESS_HOURS, DEFAULT_BUSY_HOURS};
use dispatchx_engine::{EngineSettings, TimeoutConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "DISPATCHX";
const DEFAULT_CONFIG_FILE: &str = "dispatchx.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub database_path: PathBuf,
    /// Recipient of internal work orders
    pub property_manager_email: String,
    /// From-address of outbound email; its domain names outbox message ids
    pub sender_address: String,
    pub min_lead_time_hours: u32,
    pub search_horizon_days: u32,
    /// development, production or test
    pub log_profile: String,
    pub timeouts: TimeoutsConfig,
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub store_ms: u64,
    pub calendar_ms: u64,
    pub email_ms: u64,
    pub duplicate_wait_ms: u64,
}

/// Slot grid for the built-in calendar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// UTC hours at which slots start
    pub business_hours: Vec<u32>,
    /// Hours that are booked every day
    pub busy: Vec<u32>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        let engine = EngineSettings::default();
        Self {
            database_path: PathBuf::from(".dispatchx/dispatch.db"),
            property_manager_email: engine.property_manager_email,
            sender_address: "dispatch@building.example".to_string(),
            min_lead_time_hours: engine.min_lead_time_hours,
            search_horizon_days: engine.search_horizon_days,
            log_profile: "development".to_string(),
            timeouts: TimeoutsConfig::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        let t = TimeoutConfig::default();
        Self {
            store_ms: t.store.as_millis() as u64,
            calendar_ms: t.calendar.as_millis() as u64,
            email_ms: t.email.as_millis() as u64,
            duplicate_wait_ms: t.duplicate_wait.as_millis() as u64,
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            business_hours: DEFAULT_BUSINESS_HOURS.to_vec(),
            busy: DEFAULT_BUSY_HOURS.to_vec(),
        }
    }
}

impl DispatchConfig {
    /// Load from `path` (which must exist), or from `./dispatchx.toml` when
    /// present, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = ConfigBuilder::builder();
        match path {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("config file not found: {}", path.display());
                }
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                builder = builder.add_source(
                    File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false),
                );
            }
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("calendar.business_hours")
                .with_list_parse_key("calendar.busy"),
        );

        let config: DispatchConfig = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.property_manager_email.contains('@') {
            anyhow::bail!(
                "property_manager_email '{}' is not an email address",
                self.property_manager_email
            );
        }
        if self.search_horizon_days == 0 {
            anyhow::bail!("search_horizon_days must be at least 1");
        }
        if let Some(hour) = self
            .calendar
            .business_hours
            .iter()
            .chain(&self.calendar.busy)
            .find(|h| **h > 23)
        {
            anyhow::bail!("calendar hour {} is outside 0..=23", hour);
        }
        self.profile()?;
        Ok(())
    }

    pub fn profile(&self) -> Result<Profile> {
        self.log_profile
            .parse::<Profile>()
            .map_err(|e| anyhow::anyhow!(e))
    }

    pub fn engine_settings(&self) -> EngineSettings {
        let defaults = TimeoutConfig::default();
        EngineSettings {
            property_manager_email: self.property_manager_email.clone(),
            min_lead_time_hours: self.min_lead_time_hours,
            search_horizon_days: self.search_horizon_days,
            timeouts: TimeoutConfig {
                store: Duration::from_millis(self.timeouts.store_ms),
                calendar: Duration::from_millis(self.timeouts.calendar_ms),
                email: Duration::from_millis(self.timeouts.email_ms),
                duplicate_wait: Duration::from_millis(self.timeouts.duplicate_wait_ms),
                ..defaults
            },
        }
    }

    /// Render as TOML, the same shape `load` reads
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to render configuration")
    }
}
