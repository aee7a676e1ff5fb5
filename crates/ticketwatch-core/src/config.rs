//! Configuration management for ticketwatch.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "TICKETWATCH_CONFIG";

/// Main application configuration.
///
/// This is loaded from `~/.config/ticketwatch/config.toml` (or platform
/// equivalent, or the file named by `TICKETWATCH_CONFIG`). If the file
/// doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Portal location, selectors and marker phrases
    pub portal: PortalConfig,
    /// Discovery loop timing and retry policy
    pub discovery: DiscoveryConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Evidence image OCR settings
    pub ocr: OcrConfig,
    /// Challenge solver settings
    pub solver: SolverConfig,
    /// Durable store settings
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => PathBuf::from(path),
            Err(_) => Self::config_path()?,
        };
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific file, falling back to defaults if
    /// the file does not exist.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `TICKETWATCH_PORTAL_URL`: Override the portal search URL
    /// - `TICKETWATCH_START_ID`: Override the starting identifier
    /// - `TICKETWATCH_HEADLESS`: Override browser headless mode (true/false)
    /// - `TICKETWATCH_SOLVER_API_KEY`: Challenge solver credential
    /// - `TICKETWATCH_DATABASE_PATH`: Override the database file
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("TICKETWATCH_PORTAL_URL") {
            tracing::debug!("Override portal.url from env: {}", url);
            self.portal.url = url;
        }

        if let Some(start_id) = lookup("TICKETWATCH_START_ID") {
            tracing::debug!("Override portal.start_id from env: {}", start_id);
            self.portal.start_id = start_id;
        }

        if let Some(val) = lookup("TICKETWATCH_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(key) = lookup("TICKETWATCH_SOLVER_API_KEY") {
            if !key.trim().is_empty() {
                self.solver.api_key = Some(key);
                tracing::debug!("Challenge solver credential loaded from env");
            }
        }

        if let Some(path) = lookup("TICKETWATCH_DATABASE_PATH") {
            tracing::debug!("Override database.path from env: {}", path);
            self.database.path = Some(PathBuf::from(path));
        }
    }

    /// Check values that would make the discovery loop misbehave.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.portal.url.trim().is_empty() {
            return Err(invalid("portal.url", "must not be empty"));
        }
        if self.discovery.backoff_secs.is_empty() {
            return Err(invalid("discovery.backoff_secs", "must not be empty"));
        }
        if self.discovery.challenge_max_attempts == 0 {
            return Err(invalid(
                "discovery.challenge_max_attempts",
                "must be at least 1",
            ));
        }
        if self.ocr.crop_band_height == 0 {
            return Err(invalid("ocr.crop_band_height", "must be at least 1"));
        }
        if self.browser.operation_timeout_secs == 0 {
            return Err(invalid("browser.operation_timeout_secs", "must be at least 1"));
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/ticketwatch/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/ticketwatch`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.data_dir().to_path_buf())
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("org", "ticketwatch", "ticketwatch").ok_or(ConfigError::NoConfigDir)
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Portal location, page selectors and marker phrases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Search page URL
    pub url: String,
    /// Id the cursor is seeded with on first run; probing starts after it
    pub start_id: String,
    /// Search form text input
    pub search_input: String,
    /// Search form submit control
    pub search_submit: String,
    /// One result card
    pub result_card: String,
    /// Ticket number inside a card
    pub card_id: String,
    /// Issuing officer inside a card
    pub card_officer: String,
    /// Issuing department inside a card
    pub card_department: String,
    /// Location label inside a card
    pub card_location: String,
    /// Issuance timestamp inside a card
    pub card_issued_at: String,
    /// Evidence `<img>` inside a card
    pub card_evidence_image: String,
    /// Interactive challenge widget; carries `data-sitekey`
    pub challenge_marker: String,
    /// Hidden field that receives a solved challenge token
    pub challenge_response: String,
    /// Text shown when a challenge answer was rejected
    pub failed_challenge_phrase: String,
    /// Text shown for a ticket that has been paid
    pub remittance_phrase: String,
    /// Text shown for a ticket that has been closed
    pub closed_phrase: String,
    /// Text shown when nothing matches the id
    pub no_results_phrase: String,
    /// `chrono` formats tried for non-RFC 3339 issuance timestamps
    pub issued_at_formats: Vec<String>,
    /// Offset of the portal's local time from UTC, in minutes
    pub utc_offset_minutes: i32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: "https://tickets.example.gov/search".to_string(),
            start_id: "cab000".to_string(),
            search_input: "#ticket-number".to_string(),
            search_submit: "#search-button".to_string(),
            result_card: ".ticket-card".to_string(),
            card_id: ".ticket-number".to_string(),
            card_officer: ".officer".to_string(),
            card_department: ".department".to_string(),
            card_location: ".location".to_string(),
            card_issued_at: ".issued-at".to_string(),
            card_evidence_image: "img.evidence".to_string(),
            challenge_marker: ".g-recaptcha".to_string(),
            challenge_response: "#g-recaptcha-response".to_string(),
            failed_challenge_phrase: "captcha validation failed".to_string(),
            remittance_phrase: "remittance".to_string(),
            closed_phrase: "ticket is closed".to_string(),
            no_results_phrase: "no results found".to_string(),
            issued_at_formats: vec![
                "%m/%d/%Y %I:%M %p".to_string(),
                "%m/%d/%Y %H:%M".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string(),
            ],
            utc_offset_minutes: 0,
        }
    }
}

/// Discovery loop timing and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Waits between searches for an id that has not appeared yet, in seconds
    pub backoff_secs: Vec<u64>,
    /// Reissued searches allowed per challenge episode
    pub challenge_max_attempts: u32,
    /// Maximum record age still published to the notification sink
    pub freshness_window_minutes: u64,
    /// Pause after an unclassified fault
    pub fault_cooldown_secs: u64,
    /// Pause after a page-operation timeout
    pub transient_retry_secs: u64,
}

impl DiscoveryConfig {
    /// Backoff schedule as durations.
    #[must_use]
    pub fn backoff(&self) -> Vec<Duration> {
        self.backoff_secs
            .iter()
            .copied()
            .map(Duration::from_secs)
            .collect()
    }

    /// Freshness window as a duration.
    #[must_use]
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_minutes * 60)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            backoff_secs: vec![10, 30, 60, 120, 300],
            challenge_max_attempts: 5,
            freshness_window_minutes: 10,
            fault_cooldown_secs: 60,
            transient_retry_secs: 5,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Timeout applied to every individual page operation, in seconds
    pub operation_timeout_secs: u64,
    /// Fixed user agent; a randomized fingerprint is used when unset
    pub user_agent: Option<String>,
    /// Extra settle time after navigation for script-rendered content
    pub settle_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1366,
            window_height: 768,
            operation_timeout_secs: 30,
            user_agent: None,
            settle_ms: 500,
        }
    }
}

/// Evidence image OCR settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Height of the top band holding the coordinate overlay
    pub crop_band_height: u32,
    /// Luma value at or above which a pixel becomes white
    pub binarize_threshold: u8,
    /// Tesseract language
    pub language: String,
    /// Tesseract page segmentation mode
    pub page_segmentation_mode: i32,
    /// Timeout for fetching remote evidence images
    pub fetch_timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            crop_band_height: 60,
            binarize_threshold: 128,
            language: "eng".to_string(),
            page_segmentation_mode: 6,
            fetch_timeout_secs: 20,
        }
    }
}

/// Challenge solver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Base URL of the 2Captcha-compatible API
    pub api_base: String,
    /// Delay between result polls
    pub poll_interval_secs: u64,
    /// Polls before giving up on one challenge
    pub max_polls: u32,
    /// API credential (read from the environment, never written to disk)
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            api_base: "https://2captcha.com".to_string(),
            poll_interval_secs: 5,
            max_polls: 24,
            api_key: None,
        }
    }
}

/// Durable store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; defaults to `<data dir>/ticketwatch.db`
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// The configured path, or the default under the data directory.
    pub fn resolve_path(&self) -> ConfigResult<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(AppConfig::data_dir()?.join("ticketwatch.db")),
        }
    }
}
