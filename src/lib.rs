//! Wheel-strategy options screener.
//!
//! Retrieves option chains for an underlying, normalizes the provider's
//! records into one canonical [`Contract`] model and filters them for
//! cash-secured put and covered call candidates by ROI, DTE, moneyness and,
//! optionally, delta.
//!
//! # Quick start
//!
//! ```no_run
//! use wheel_scanner::WheelScanner;
//!
//! let scanner = WheelScanner::builder().api_key("my-key").build().unwrap();
//!
//! // Puts on SPY, measured against a spot price supplied by the caller
//! let puts = scanner.cash_secured_puts("SPY", Some(512.40), 1.0, 7, 45).unwrap();
//! for candidate in &puts {
//!     println!("{}", candidate);
//! }
//! ```
//!
//! Only a rejected credential fails a scan. Failed pages or expirations are
//! skipped, and a missing spot price or empty chain gives an empty list.

pub mod advisor;
#[cfg(feature = "async")]
pub mod async_client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod models;
pub mod normalizer;
pub mod scanner;
#[cfg(feature = "table")]
pub mod sql_builder;
#[cfg(feature = "table")]
pub mod table;

pub use advisor::PositionAdvisor;
#[cfg(feature = "async")]
pub use async_client::AsyncWheelScanner;
pub use config::ClientConfig;
pub use error::{ErrorKind, Result, ScanError};
pub use fetcher::{ChainFetcher, HttpTransport, PageRequest, PageResponse, PageTransport};
pub use filter::{CandidateFilter, DeltaBand, FilterCriteria, Strategy};
pub use models::{Advice, CandidateResult, Contract, Greeks, OptionType, Position};
pub use normalizer::ContractNormalizer;
pub use scanner::{ExpirationSource, ScanOrchestrator, ScanReport, ScanRequest, Unavailable};
#[cfg(feature = "table")]
pub use sql_builder::SqlBuilder;
#[cfg(feature = "table")]
pub use table::ChainTable;

use std::fmt;
use std::time::Duration;

use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// WheelScannerBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`WheelScanner`].
#[derive(Default)]
pub struct WheelScannerBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    page_limit: Option<u32>,
    timeout: Option<Duration>,
    as_of: Option<NaiveDate>,
}

impl WheelScannerBuilder {
    /// Provider credential. Required.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Override the provider base URL (defaults to [`config::DEFAULT_BASE_URL`]).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Records per snapshot page. Defaults to 250.
    pub fn page_limit(mut self, limit: u32) -> Self {
        self.page_limit = Some(limit);
        self
    }

    /// Per-request timeout. Defaults to 15 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Pin every scan to a fixed as-of date instead of today's UTC date.
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    /// Resolve the builder into a [`ClientConfig`] without opening a client.
    pub fn config(&self) -> Result<ClientConfig> {
        let key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ScanError::InvalidArgument("api key must be set".into()))?;

        let mut config = ClientConfig::new(key);
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(limit) = self.page_limit {
            if limit == 0 {
                return Err(ScanError::InvalidArgument("page limit must be positive".into()));
            }
            config.page_limit = limit;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        Ok(config)
    }

    pub fn build(self) -> Result<WheelScanner> {
        let config = self.config()?;
        let fetcher = ChainFetcher::new(config)?;
        let orchestrator = match self.as_of {
            Some(date) => ScanOrchestrator::with_as_of(date),
            None => ScanOrchestrator::new(),
        };
        Ok(WheelScanner {
            fetcher,
            orchestrator,
        })
    }
}

// ---------------------------------------------------------------------------
// WheelScanner
// ---------------------------------------------------------------------------

/// Entry point: a snapshot fetcher plus the scan orchestrator.
///
/// Created via [`WheelScanner::builder()`].
#[derive(Debug)]
pub struct WheelScanner {
    fetcher: ChainFetcher<HttpTransport>,
    orchestrator: ScanOrchestrator,
}

impl WheelScanner {
    pub fn builder() -> WheelScannerBuilder {
        WheelScannerBuilder::default()
    }

    /// Run a scan and return the full report.
    pub fn scan(&self, request: &ScanRequest) -> Result<ScanReport> {
        self.orchestrator.scan_snapshot(&self.fetcher, request)
    }

    /// Cash-secured put candidates, in fetch order.
    pub fn cash_secured_puts(
        &self,
        ticker: &str,
        reference_price: Option<f64>,
        min_roi: f64,
        min_dte: i64,
        max_dte: i64,
    ) -> Result<Vec<CandidateResult>> {
        let request = ScanRequest::new(ticker, Strategy::CashSecuredPut, reference_price)
            .min_roi(min_roi)
            .dte_range(min_dte, max_dte);
        Ok(self.scan(&request)?.candidates)
    }

    /// Covered call candidates, in fetch order.
    pub fn covered_calls(
        &self,
        ticker: &str,
        reference_price: Option<f64>,
        min_roi: f64,
        min_dte: i64,
        max_dte: i64,
    ) -> Result<Vec<CandidateResult>> {
        let request = ScanRequest::new(ticker, Strategy::CoveredCall, reference_price)
            .min_roi(min_roi)
            .dte_range(min_dte, max_dte);
        Ok(self.scan(&request)?.candidates)
    }

    /// Scan a tabular chain instead of the snapshot API.
    #[cfg(feature = "table")]
    pub fn scan_table(&self, table: &ChainTable, request: &ScanRequest) -> Result<ScanReport> {
        self.orchestrator.scan_expirations(table, request)
    }

    pub fn advisor(&self) -> PositionAdvisor {
        PositionAdvisor::default()
    }

    pub fn fetcher(&self) -> &ChainFetcher<HttpTransport> {
        &self.fetcher
    }

    pub fn orchestrator(&self) -> &ScanOrchestrator {
        &self.orchestrator
    }
}

impl fmt::Display for WheelScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.fetcher.config();
        write!(
            f,
            "WheelScanner(base_url={}, page_limit={}, timeout={:?})",
            config.base_url, config.page_limit, config.timeout
        )
    }
}
