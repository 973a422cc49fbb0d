//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/tripwatch/config.toml` by default. Every key is optional:
//!
//! ```toml
//! time_zone = "Europe/London"
//!
//! [upstream]
//! url = "https://mobile-api.jet2.com/holidays/booking"
//! image_base_url = "https://www.jet2holidays.com"
//! poll_interval_secs = 300
//! request_timeout_secs = 0    # 0 waits as long as the server does
//! image_timeout_secs = 10
//!
//! [calendar]
//! default_calendars = ["calendar.family"]
//! ics_dir = "/home/me/.local/share/tripwatch/calendars"
//!
//! [storage]
//! bookings_file = "/home/me/.local/share/tripwatch/bookings.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tripwatch_core::parse_time_zone;
use tripwatch_providers::{ImageClientConfig, Jet2Config};
use tripwatch_server::{DEFAULT_POLL_INTERVAL, RuntimeConfig, SchedulerConfig};

use crate::error::{ClientError, ClientResult};

const APP_DIR: &str = "tripwatch";

/// Configuration for the tripwatch client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// IANA zone booking times are localized to.
    pub time_zone: String,

    pub upstream: UpstreamSettings,

    pub calendar: CalendarSettings,

    pub storage: StorageSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            time_zone: "Europe/London".to_string(),
            upstream: UpstreamSettings::default(),
            calendar: CalendarSettings::default(),
            storage: StorageSettings::default(),
        }
    }
}

/// Booking API and image site settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    pub url: String,
    pub image_base_url: String,
    pub poll_interval_secs: u64,
    /// Booking lookup timeout, disabled when zero.
    pub request_timeout_secs: u64,
    pub image_timeout_secs: u64,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            url: Jet2Config::DEFAULT_URL.to_string(),
            image_base_url: ImageClientConfig::DEFAULT_BASE_URL.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            request_timeout_secs: 0,
            image_timeout_secs: ImageClientConfig::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Where projected events are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Calendars used by `booking add` when none are given.
    pub default_calendars: Vec<String>,

    /// Directory holding one `.ics` file per calendar.
    pub ics_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub bookings_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if it does not exist.
    pub fn load() -> ClientResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ClientError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ClientError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }

    pub fn time_zone(&self) -> ClientResult<Tz> {
        Ok(parse_time_zone(&self.time_zone)?)
    }

    pub fn bookings_path(&self) -> PathBuf {
        self.storage
            .bookings_file
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("bookings.json"))
    }

    pub fn ics_dir(&self) -> PathBuf {
        self.calendar
            .ics_dir
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join("calendars"))
    }

    pub fn jet2_config(&self) -> ClientResult<Jet2Config> {
        let mut config = Jet2Config::new(&self.upstream.url)?;
        if self.upstream.request_timeout_secs > 0 {
            config = config.with_timeout(Duration::from_secs(self.upstream.request_timeout_secs));
        }
        Ok(config)
    }

    pub fn image_config(&self) -> ClientResult<ImageClientConfig> {
        Ok(ImageClientConfig::new(&self.upstream.image_base_url)?
            .with_timeout(Duration::from_secs(self.upstream.image_timeout_secs)))
    }

    /// Runtime settings, failing on an unknown zone or a zero poll interval.
    pub fn runtime_config(&self) -> ClientResult<RuntimeConfig> {
        if self.upstream.poll_interval_secs == 0 {
            return Err(ClientError::config("upstream.poll_interval_secs must be positive"));
        }
        let scheduler =
            SchedulerConfig::new(Duration::from_secs(self.upstream.poll_interval_secs));
        Ok(RuntimeConfig::new(self.time_zone()?).with_scheduler(scheduler))
    }

    /// Checks every derived setting without touching the network.
    pub fn validate(&self) -> ClientResult<()> {
        self.runtime_config()?;
        self.jet2_config()?;
        self.image_config()?;
        Ok(())
    }
}
