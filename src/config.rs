//! Centralized configuration management for edinet-yuho

use crate::edinet::{DocumentFormat, ListingType, ReportFilter};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite download ledger
    pub database_path: PathBuf,
    /// Root of the `<YYYY>/<MM>/<DD>/` archive tree
    pub download_dir: PathBuf,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// EDINET API key (optional)
    pub edinet_api_key: Option<String>,
    /// EDINET endpoint configuration
    pub api: ApiConfig,
    /// Which submissions count as securities reports
    pub filter: ReportFilter,
    /// Rate limiting configuration
    pub rate_limits: RateLimits,
    /// HTTP client configuration
    pub http: HttpConfig,
}

/// EDINET endpoints and request selectors
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://api.edinet-fsa.go.jp/api/v2`
    pub base_url: String,
    /// `type` sent to the listing endpoint
    pub listing_type: ListingType,
    /// `type` sent to the document endpoint
    pub document_format: DocumentFormat,
}

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimits {
    /// Delay between EDINET API calls (milliseconds)
    pub edinet_request_delay_ms: u64,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connect timeout, listing deadline and document idle timeout, in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

pub const DEFAULT_BASE_URL: &str = "https://api.edinet-fsa.go.jp/api/v2";
pub const DEFAULT_DB_PATH: &str = "./data/edinet_submissions.db";
pub const DEFAULT_DOWNLOAD_DIR: &str = "./downloads";
pub const DEFAULT_LOG_DIR: &str = "./logs";

impl ApiConfig {
    /// Listing endpoint URL
    pub fn listing_url(&self) -> String {
        format!("{}/documents.json", self.base_url.trim_end_matches('/'))
    }

    /// Document endpoint URL for one document id
    pub fn document_url(&self, doc_id: &str) -> String {
        format!("{}/documents/{}", self.base_url.trim_end_matches('/'), doc_id)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            listing_type: ListingType::default(),
            document_format: DocumentFormat::default(),
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            edinet_request_delay_ms: 100,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DB_PATH.into(),
            download_dir: DEFAULT_DOWNLOAD_DIR.into(),
            log_dir: DEFAULT_LOG_DIR.into(),
            edinet_api_key: None,
            api: ApiConfig::default(),
            filter: ReportFilter::default(),
            rate_limits: RateLimits::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `.env`, environment variables and defaults
    pub fn from_env() -> Result<Self> {
        // a missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let database_path = lookup("EDINET_YUHO_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let download_dir = lookup("EDINET_YUHO_DOWNLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.download_dir);

        let log_dir = lookup("EDINET_YUHO_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);

        let edinet_api_key = lookup("EDINET_API_KEY").filter(|key| !key.is_empty());

        let api = ApiConfig {
            base_url: lookup("EDINET_YUHO_API_BASE_URL").unwrap_or(defaults.api.base_url),
            listing_type: parse_var(&lookup, "EDINET_YUHO_LISTING_TYPE")?
                .unwrap_or(defaults.api.listing_type),
            document_format: parse_var(&lookup, "EDINET_YUHO_DOCUMENT_FORMAT")?
                .unwrap_or(defaults.api.document_format),
        };

        let rate_limits = RateLimits {
            edinet_request_delay_ms: parse_var(&lookup, "EDINET_YUHO_REQUEST_DELAY_MS")?
                .unwrap_or(defaults.rate_limits.edinet_request_delay_ms),
        };

        let http = HttpConfig {
            timeout_seconds: parse_var(&lookup, "EDINET_YUHO_HTTP_TIMEOUT_SECONDS")?
                .unwrap_or(defaults.http.timeout_seconds),
            user_agent: lookup("EDINET_YUHO_USER_AGENT").unwrap_or(defaults.http.user_agent),
        };

        Ok(Config {
            database_path,
            download_dir,
            log_dir,
            edinet_api_key,
            api,
            filter: defaults.filter,
            rate_limits,
            http,
        })
    }

    /// Get EDINET request delay as Duration
    pub fn edinet_request_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limits.edinet_request_delay_ms)
    }

    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_seconds == 0 {
            anyhow::bail!("HTTP timeout must be at least one second");
        }

        reqwest::Url::parse(&self.api.base_url)
            .with_context(|| format!("Invalid EDINET base URL: {}", self.api.base_url))?;

        if self.database_path.as_os_str().is_empty() {
            anyhow::bail!("Database path must not be empty");
        }

        Ok(())
    }
}

fn default_user_agent() -> String {
    format!("edinet-yuho/{}", env!("CARGO_PKG_VERSION"))
}

/// Helper function to parse a variable as a specific type
fn parse_var<T, F>(lookup: &F, var_name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var_name) {
        Some(val) => val
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Failed to parse environment variable {} = '{}': {}", var_name, val, e)),
        None => Ok(None),
    }
}
