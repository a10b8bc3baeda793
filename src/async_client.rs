//! Async wrapper around [`WheelScanner`] for use in async runtimes (Tokio, etc.).
//!
//! Scans block on network round-trips, so every operation is dispatched to
//! Tokio's blocking pool via [`tokio::task::spawn_blocking`].
//!
//! # Example
//!
//! ```no_run
//! use wheel_scanner::{AsyncWheelScanner, ScanRequest, Strategy};
//!
//! #[tokio::main]
//! async fn main() {
//!     let scanner = AsyncWheelScanner::builder().api_key("my-key").build().await.unwrap();
//!
//!     let request = ScanRequest::new("AAPL", Strategy::CoveredCall, Some(231.5));
//!     let report = scanner.scan(request).await.unwrap();
//!     println!("{} candidates", report.candidates.len());
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::{Result, ScanError};
use crate::scanner::{ScanReport, ScanRequest};
use crate::{WheelScanner, WheelScannerBuilder};

// ---------------------------------------------------------------------------
// AsyncWheelScannerBuilder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct AsyncWheelScannerBuilder {
    inner: WheelScannerBuilder,
}

impl AsyncWheelScannerBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.inner = self.inner.api_key(key);
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.inner = self.inner.base_url(url);
        self
    }

    pub fn page_limit(mut self, limit: u32) -> Self {
        self.inner = self.inner.page_limit(limit);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.inner = self.inner.as_of(date);
        self
    }

    /// Build the scanner on the blocking pool; the blocking HTTP client
    /// must not be constructed on an async worker thread.
    pub async fn build(self) -> Result<AsyncWheelScanner> {
        let inner = self.inner;
        tokio::task::spawn_blocking(move || {
            let scanner = inner.build()?;
            Ok(AsyncWheelScanner {
                inner: Arc::new(scanner),
            })
        })
        .await
        .map_err(|e| ScanError::InvalidArgument(format!("Task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// AsyncWheelScanner
// ---------------------------------------------------------------------------

/// Async wrapper around [`WheelScanner`].
#[derive(Clone)]
pub struct AsyncWheelScanner {
    inner: Arc<WheelScanner>,
}

impl AsyncWheelScanner {
    pub fn builder() -> AsyncWheelScannerBuilder {
        AsyncWheelScannerBuilder::default()
    }

    /// Run a sync scanner operation on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&WheelScanner) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let scanner = self.inner.clone();
        tokio::task::spawn_blocking(move || f(&scanner))
            .await
            .map_err(|e| ScanError::InvalidArgument(format!("Task join error: {e}")))?
    }

    pub async fn scan(&self, request: ScanRequest) -> Result<ScanReport> {
        self.run(move |s| s.scan(&request)).await
    }
}
