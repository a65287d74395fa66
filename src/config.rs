//! # Configuration Module
//!
//! Application settings read from the environment (after `.env` is loaded by
//! the binary). Unset variables fall back to defaults; set but unparsable
//! values are reported as [`ConfigError`].

use chrono::Duration;
use std::env;
use std::fmt::Display;
use std::str::FromStr;

use crate::duplicate_guard::{DuplicatePolicy, DEFAULT_DUPLICATE_WINDOW_SECS, DEFAULT_MIN_OVERLAP};
use crate::errors::ConfigError;
use crate::rate_limiter::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECS};

pub const DEFAULT_LOCALE: &str = "en";
pub const DEFAULT_MAX_RECIPES_PER_USER: i64 = 100;
/// Longest accepted rate-limit or duplicate window, one leap year
pub const MAX_WINDOW_SECS: i64 = 366 * 24 * 60 * 60;

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected `text` or `json`, got `{}`", other)),
        }
    }
}

/// Rate limiting settings
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Requests allowed per client and route in one window
    pub max_requests: u32,
    /// Window length in seconds
    pub window_secs: i64,
}

impl RateLimitConfig {
    /// Window length, clamped to 1 second ..= [`MAX_WINDOW_SECS`]
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_secs.clamp(1, MAX_WINDOW_SECS))
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// PostgreSQL connection string; commands that persist require it
    pub database_url: Option<String>,
    /// Language for user-facing messages
    pub locale: String,
    pub rate_limit: RateLimitConfig,
    pub duplicate_policy: DuplicatePolicy,
    /// Oldest recipes are removed once a user reaches this count
    pub max_recipes_per_user: i64,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            locale: DEFAULT_LOCALE.to_string(),
            rate_limit: RateLimitConfig::default(),
            duplicate_policy: DuplicatePolicy::default(),
            max_recipes_per_user: DEFAULT_MAX_RECIPES_PER_USER,
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// # Examples
    ///
    /// ```rust
    /// use smart_recipe::config::AppConfig;
    ///
    /// let config = AppConfig::from_lookup(|key| match key {
    ///     "RATE_LIMIT_MAX_REQUESTS" => Some("10".to_string()),
    ///     _ => None,
    /// })?;
    /// assert_eq!(config.rate_limit.max_requests, 10);
    /// # Ok::<(), smart_recipe::errors::ConfigError>(())
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let locale = lookup("APP_LOCALE")
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or(defaults.locale);

        let max_requests: u32 =
            parse_or(&lookup, "RATE_LIMIT_MAX_REQUESTS", defaults.rate_limit.max_requests)?;
        let window_secs: i64 =
            parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", defaults.rate_limit.window_secs)?;
        ensure_positive("RATE_LIMIT_MAX_REQUESTS", max_requests as f64)?;
        ensure_positive("RATE_LIMIT_WINDOW_SECS", window_secs as f64)?;
        window_duration("RATE_LIMIT_WINDOW_SECS", window_secs)?;

        let duplicate_window_secs: i64 =
            parse_or(&lookup, "DUPLICATE_WINDOW_SECS", DEFAULT_DUPLICATE_WINDOW_SECS)?;
        let min_overlap: f64 = parse_or(&lookup, "DUPLICATE_MIN_OVERLAP", DEFAULT_MIN_OVERLAP)?;
        if duplicate_window_secs < 0 {
            return Err(invalid("DUPLICATE_WINDOW_SECS", &duplicate_window_secs, "must not be negative"));
        }
        let duplicate_window = window_duration("DUPLICATE_WINDOW_SECS", duplicate_window_secs)?;
        if !(0.0..=1.0).contains(&min_overlap) {
            return Err(invalid("DUPLICATE_MIN_OVERLAP", &min_overlap, "must be between 0 and 1"));
        }

        let max_recipes_per_user: i64 =
            parse_or(&lookup, "MAX_RECIPES_PER_USER", defaults.max_recipes_per_user)?;
        ensure_positive("MAX_RECIPES_PER_USER", max_recipes_per_user as f64)?;

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw
                .parse()
                .map_err(|reason: String| invalid("LOG_FORMAT", &raw, &reason))?,
            None => defaults.log_format,
        };

        Ok(Self {
            database_url,
            locale,
            rate_limit: RateLimitConfig {
                max_requests,
                window_secs,
            },
            duplicate_policy: DuplicatePolicy {
                window: duplicate_window,
                min_overlap,
            },
            max_recipes_per_user,
            log_format,
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
        None => Ok(default),
    }
}

fn ensure_positive(key: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(invalid(key, &value, "must be greater than zero"))
    }
}

fn window_duration(key: &str, secs: i64) -> Result<Duration, ConfigError> {
    if secs > MAX_WINDOW_SECS {
        return Err(invalid(key, &secs, "must be at most one year"));
    }
    Duration::try_seconds(secs).ok_or_else(|| invalid(key, &secs, "is out of range"))
}

fn invalid(key: &str, value: &dyn Display, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
