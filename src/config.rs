use crate::error::{MosqueTimesError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "config.json5";

/// Public feed the mosque index and per-mosque files are published to
pub const DEFAULT_FEED_URL: &str =
    "https://raw.githubusercontent.com/tan-ahmed/inspire-prayer-scraper/main";

/// Default location of the persisted user preferences
pub const DEFAULT_PREFERENCES_FILE: &str = "preferences.json";

/// Application configuration structure
///
/// Every field is optional in the file; missing fields fall back to the
/// values from [`Config::default`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Name of the dashboard displayed in the page title
    pub site_name: String,
    /// Clock format used for every displayed prayer time
    pub clock: Clock,
    /// Whether displayed times include seconds when the feed provides them
    pub show_seconds: bool,
    /// Base URL of the static prayer times feed
    pub feed_base_url: String,
    /// File holding the selected mosque and theme; `null` keeps them in memory
    pub preferences_file: Option<PathBuf>,
    /// Seconds before the cached mosque index is refetched
    pub index_stale_secs: u64,
    /// Seconds an unused mosque index stays cached
    pub index_gc_secs: u64,
    /// Seconds before cached prayer timings are refetched
    pub data_stale_secs: u64,
    /// Seconds unused prayer timings stay cached
    pub data_gc_secs: u64,
    /// Additional attempts after a failed feed request
    pub fetch_retries: u32,
    /// Delay before the first retry, doubled on every further attempt
    pub retry_base_delay_ms: u64,
    /// Per-request timeout for feed requests
    pub request_timeout_secs: u64,
    /// Interval between live status updates pushed to open pages
    pub live_update_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_name: "Mosque Prayer Times".to_string(),
            clock: Clock::default(),
            show_seconds: false,
            feed_base_url: DEFAULT_FEED_URL.to_string(),
            preferences_file: Some(PathBuf::from(DEFAULT_PREFERENCES_FILE)),
            index_stale_secs: 30 * 60,
            index_gc_secs: 60 * 60,
            data_stale_secs: 15 * 60,
            data_gc_secs: 30 * 60,
            fetch_retries: 2,
            retry_base_delay_ms: 1000,
            request_timeout_secs: 10,
            live_update_secs: 30,
        }
    }
}

impl Config {
    /// Load the application configuration.
    ///
    /// When `path` is `None` the default `config.json5` is used, and a missing
    /// default file yields the built-in defaults. An explicitly given path
    /// must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read, parsed or
    /// fails validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    tracing::info!("No {CONFIG_FILE} found, using default configuration");
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading application configuration from {}", path.display());
        let config_str = fs::read_to_string(path)?;
        let config: Config = json5::from_str(&config_str)?;

        tracing::info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the feed URL is not an absolute http(s) URL or an
    /// interval is zero
    pub fn validate(&self) -> Result<()> {
        if self.site_name.trim().is_empty() {
            return Err(MosqueTimesError::from("Site name cannot be empty"));
        }

        self.feed_base()?;

        let intervals = [
            ("index_stale_secs", self.index_stale_secs),
            ("data_stale_secs", self.data_stale_secs),
            ("request_timeout_secs", self.request_timeout_secs),
            ("live_update_secs", self.live_update_secs),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(MosqueTimesError::from(format!("{name} must be greater than zero")));
            }
        }

        Ok(())
    }

    /// Feed base URL with a trailing slash so relative paths join beneath it
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or is not http(s)
    pub fn feed_base(&self) -> Result<Url> {
        let trimmed = self.feed_base_url.trim();
        let with_slash = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };

        let url = Url::parse(&with_slash).map_err(|_| {
            MosqueTimesError::from(format!("Invalid URL format: {}", self.feed_base_url))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(MosqueTimesError::from(format!(
                "Unsupported feed URL scheme: {other}"
            ))),
        }
    }

    #[must_use]
    pub fn index_stale_time(&self) -> Duration {
        Duration::from_secs(self.index_stale_secs)
    }

    #[must_use]
    pub fn index_gc_time(&self) -> Duration {
        Duration::from_secs(self.index_gc_secs)
    }

    #[must_use]
    pub fn data_stale_time(&self) -> Duration {
        Duration::from_secs(self.data_stale_secs)
    }

    #[must_use]
    pub fn data_gc_time(&self) -> Duration {
        Duration::from_secs(self.data_gc_secs)
    }

    #[must_use]
    pub fn live_update_interval(&self) -> Duration {
        Duration::from_secs(self.live_update_secs)
    }
}

/// Clock format options
///
/// Defines the format in which prayer times are displayed
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum Clock {
    /// 24-hour format (e.g., 13:00)
    #[serde(rename = "24hour")]
    Hour24,
    /// 12-hour format with AM/PM (e.g., 01:00 PM)
    #[default]
    #[serde(rename = "12hour")]
    Hour12,
}

impl Clock {
    #[must_use]
    pub fn is_24_hour(self) -> bool {
        self == Clock::Hour24
    }
}

impl std::fmt::Display for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Clock::Hour24 => f.write_str("24hour"),
            Clock::Hour12 => f.write_str("12hour"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.clock, Clock::Hour12);
        assert_eq!(config.data_stale_time(), Duration::from_secs(900));
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "{{ site_name: 'Luton Mosques', clock: '24hour', fetch_retries: 0 }}"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.site_name, "Luton Mosques");
        assert_eq!(config.clock, Clock::Hour24);
        assert_eq!(config.fetch_retries, 0);
        assert_eq!(config.feed_base_url, DEFAULT_FEED_URL);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let result = Config::load(Some(Path::new("/definitely/not/here/config.json5")));
        assert!(matches!(result, Err(MosqueTimesError::Io(_))));
    }

    #[test]
    fn test_feed_base_gets_trailing_slash() {
        let config = Config {
            feed_base_url: "http://localhost:8080/feed".to_string(),
            ..Config::default()
        };
        let base = config.feed_base().unwrap();
        assert_eq!(base.as_str(), "http://localhost:8080/feed/");
        assert_eq!(
            base.join("mosque-index.json").unwrap().as_str(),
            "http://localhost:8080/feed/mosque-index.json"
        );
    }

    #[test]
    fn test_validate_rejects_bad_feed_url() {
        let config = Config {
            feed_base_url: "not a url".to_string(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.to_string(), "Error: Invalid URL format: not a url");

        let config = Config {
            feed_base_url: "ftp://example.com".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let config = Config {
            live_update_secs: 0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("live_update_secs"));
    }

    #[test]
    fn test_clock_display_matches_serde_names() {
        assert_eq!(Clock::Hour24.to_string(), "24hour");
        assert_eq!(Clock::Hour12.to_string(), "12hour");
        assert_eq!(serde_json::to_string(&Clock::Hour24).unwrap(), "\"24hour\"");
    }
}
