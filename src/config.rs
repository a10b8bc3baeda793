use std::fmt;
use std::time::Duration;

use reqwest::Url;

use crate::error::{Result, ScanError};

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";
pub const SNAPSHOT_PATH: &str = "/v3/snapshot/options";

/// Query parameter carrying the credential on every page request.
pub const API_KEY_PARAM: &str = "apiKey";

pub const DEFAULT_PAGE_LIMIT: u32 = 250;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

// Scan request defaults and floors
pub const DEFAULT_MIN_ROI: f64 = 1.0;
pub const DEFAULT_MIN_DTE: i64 = 7;
pub const DEFAULT_MAX_DTE: i64 = 45;
pub const MIN_ROI_FLOOR: f64 = 0.1;
pub const MIN_DTE_FLOOR: i64 = 1;

// Position advice thresholds
pub const CLOSE_AT_PROFIT_PCT: f64 = 90.0;
pub const ROLL_WITHIN_DTE: i64 = 3;

/// Connection settings for the snapshot provider.
///
/// Built once and handed to [`ChainFetcher`](crate::fetcher::ChainFetcher);
/// nothing here is read from process-wide state.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub page_limit: u32,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// URL of the first snapshot page for `ticker`, without query parameters.
    ///
    /// The ticker is one percent-encoded path segment, so `BRK/B` stays a
    /// single segment.
    pub fn snapshot_url(&self, ticker: &str) -> Result<Url> {
        let base = format!("{}{}", self.base_url.trim_end_matches('/'), SNAPSHOT_PATH);
        let mut url = Url::parse(&base).map_err(|e| ScanError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ScanError::InvalidUrl(format!("{} cannot be a base URL", self.base_url)))?
            .push(ticker);
        Ok(url)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("page_limit", &self.page_limit)
            .field("timeout", &self.timeout)
            .finish()
    }
}
