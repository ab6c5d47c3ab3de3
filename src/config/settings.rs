//! Configuration settings for the Reserva engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::access::RenewalPolicy;
use crate::conflict::SuggestParams;
use crate::error::{ConfigError, Result};
use crate::time::MINUTES_PER_DAY;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub booking: BookingConfig,
    pub access: AccessConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("config.toml"),
            PathBuf::from("reserva.toml"),
            dirs::config_dir()
                .map(|p| p.join("reserva/config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".reserva/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        let booking = &self.booking;
        if booking.work_start_minute >= booking.work_end_minute {
            return Err(
                ConfigError::Invalid("work_start_minute must precede work_end_minute".into())
                    .into(),
            );
        }
        if booking.work_end_minute > MINUTES_PER_DAY {
            return Err(ConfigError::Invalid(format!(
                "work_end_minute out of range: {}",
                booking.work_end_minute
            ))
            .into());
        }
        if booking.suggestion_step_minutes == 0 {
            return Err(
                ConfigError::Invalid("suggestion_step_minutes must be > 0".into()).into(),
            );
        }
        if self.access.notify_window_hours <= 0 {
            return Err(ConfigError::Invalid("notify_window_hours must be > 0".into()).into());
        }
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Port the REST surface listens on.
    pub http_port: u16,
    /// Enable permissive CORS on the API.
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8085,
            enable_cors: true,
        }
    }
}

/// Booking and conflict-detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Symmetric grace buffer around existing commitments, in minutes.
    pub grace_minutes: u16,
    /// Start of the bookable working window, minutes since midnight.
    pub work_start_minute: u16,
    /// End of the bookable working window, minutes since midnight.
    pub work_end_minute: u16,
    /// Granularity of suggested alternative start times.
    pub suggestion_step_minutes: u16,
    /// Maximum number of suggested alternatives.
    pub max_suggestions: usize,
    /// Forward buffer before a slot becomes unselectable, in minutes.
    pub lead_buffer_minutes: u16,
    /// Fixed UTC offset of the service's wall clock, in minutes. Every
    /// date/time decision in the engine goes through this single offset.
    pub utc_offset_minutes: i32,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            grace_minutes: 30,
            work_start_minute: 8 * 60,
            work_end_minute: 20 * 60,
            suggestion_step_minutes: 30,
            max_suggestions: 5,
            lead_buffer_minutes: 5,
            // Buenos Aires wall clock (UTC-3).
            utc_offset_minutes: -180,
        }
    }
}

impl BookingConfig {
    /// Suggestion parameters derived from this configuration.
    pub fn suggest_params(&self) -> SuggestParams {
        SuggestParams {
            work_start_minute: self.work_start_minute,
            work_end_minute: self.work_end_minute,
            step_minutes: self.suggestion_step_minutes,
            max_suggestions: self.max_suggestions,
        }
    }
}

/// Access-window tracking configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// What an approved renewal does to an already-active window.
    pub renewal_policy: RenewalPolicy,
    /// Half-width of the notification-eligibility window around expiry.
    pub notify_window_hours: i64,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            renewal_policy: RenewalPolicy::Extend,
            notify_window_hours: 24,
        }
    }
}

/// Availability cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether the availability cache is enabled.
    pub enabled: bool,
    /// Maximum number of cached listings.
    pub max_entries: u64,
    /// Time-to-live in seconds. Invalidations after committing writes are
    /// synchronous regardless of this value.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1024,
            ttl_secs: 60,
        }
    }
}
