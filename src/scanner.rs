//! Scan orchestration: fetch, normalize, filter, aggregate.
//!
//! Two kinds of chain source are supported. A snapshot fetcher pages through
//! every expiration in the window at once; an [`ExpirationSource`] lists
//! expirations and loads them one by one. Either way, a failure scoped to
//! one page or expiration is logged and skipped, and only an authentication
//! failure aborts the scan.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{Result, ScanError};
use crate::fetcher::{ChainFetcher, PageTransport};
use crate::filter::{CandidateFilter, DeltaBand, FilterCriteria, Strategy};
use crate::models::{CandidateResult, DteWindow, OptionType, RawContract};
use crate::normalizer::ContractNormalizer;

// ---------------------------------------------------------------------------
// ScanRequest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    pub ticker: String,
    pub strategy: Strategy,
    /// Underlying price the scan is measured against. `None` yields an
    /// empty result.
    pub reference_price: Option<f64>,
    pub min_roi: f64,
    pub min_dte: i64,
    pub max_dte: i64,
    /// Optional delta gate applied on top of the strategy rules.
    #[serde(default)]
    pub delta_band: Option<DeltaBand>,
}

impl ScanRequest {
    /// Request with the default ROI and DTE thresholds.
    pub fn new(ticker: &str, strategy: Strategy, reference_price: Option<f64>) -> Self {
        Self {
            ticker: ticker.trim().to_uppercase(),
            strategy,
            reference_price,
            min_roi: config::DEFAULT_MIN_ROI,
            min_dte: config::DEFAULT_MIN_DTE,
            max_dte: config::DEFAULT_MAX_DTE,
            delta_band: None,
        }
    }

    pub fn min_roi(mut self, min_roi: f64) -> Self {
        self.min_roi = min_roi;
        self
    }

    pub fn dte_range(mut self, min_dte: i64, max_dte: i64) -> Self {
        self.min_dte = min_dte;
        self.max_dte = max_dte;
        self
    }

    pub fn delta_band(mut self, band: DeltaBand) -> Self {
        self.delta_band = Some(band);
        self
    }

    /// Reject requests outside the accepted input ranges.
    pub fn validate(&self) -> Result<()> {
        if self.ticker.trim().is_empty() {
            return Err(ScanError::InvalidArgument("ticker must not be empty".into()));
        }
        if !self.min_roi.is_finite() || self.min_roi < config::MIN_ROI_FLOOR {
            return Err(ScanError::InvalidArgument(format!(
                "min_roi must be >= {}, got {}",
                config::MIN_ROI_FLOOR,
                self.min_roi
            )));
        }
        if self.min_dte < config::MIN_DTE_FLOOR || self.max_dte < config::MIN_DTE_FLOOR {
            return Err(ScanError::InvalidArgument(format!(
                "min_dte and max_dte must be >= {}, got {} and {}",
                config::MIN_DTE_FLOOR,
                self.min_dte,
                self.max_dte
            )));
        }
        Ok(())
    }

    fn criteria(&self) -> FilterCriteria {
        FilterCriteria::new(self.min_roi, self.max_dte).with_min_dte(self.min_dte)
    }
}

// ---------------------------------------------------------------------------
// ScanReport
// ---------------------------------------------------------------------------

/// Why a scan produced nothing without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unavailable {
    NoReferencePrice,
    EmptyChain,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedBatch {
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub ticker: String,
    pub strategy: Strategy,
    pub as_of: NaiveDate,
    pub candidates: Vec<CandidateResult>,
    pub batches_scanned: usize,
    pub skipped: Vec<SkippedBatch>,
    pub contracts_seen: usize,
    pub parse_failures: usize,
    pub outside_window: usize,
    pub unavailable: Option<Unavailable>,
}

impl ScanReport {
    fn new(request: &ScanRequest, as_of: NaiveDate) -> Self {
        Self {
            ticker: request.ticker.clone(),
            strategy: request.strategy,
            as_of,
            candidates: Vec::new(),
            batches_scanned: 0,
            skipped: Vec::new(),
            contracts_seen: 0,
            parse_failures: 0,
            outside_window: 0,
            unavailable: None,
        }
    }

    fn unavailable(mut self, reason: Unavailable) -> Self {
        self.unavailable = Some(reason);
        self
    }

    fn skip(&mut self, label: String, error: &ScanError) {
        tracing::warn!(ticker = %self.ticker, batch = %label, error = %error, "skipping batch");
        self.skipped.push(SkippedBatch {
            label,
            reason: error.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// ExpirationSource
// ---------------------------------------------------------------------------

/// A chain source that enumerates expirations and loads each separately.
pub trait ExpirationSource {
    fn expirations(&self, ticker: &str) -> Result<Vec<NaiveDate>>;

    /// Raw records for one expiration and contract kind. Individual records
    /// may fail without failing the batch.
    fn contracts(
        &self,
        ticker: &str,
        option_type: OptionType,
        expiration: NaiveDate,
    ) -> Result<Vec<Result<RawContract>>>;
}

// ---------------------------------------------------------------------------
// ScanOrchestrator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOrchestrator {
    as_of: Option<NaiveDate>,
}

impl ScanOrchestrator {
    /// Orchestrator that captures today's UTC date at the start of each scan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Orchestrator pinned to a fixed as-of date.
    pub fn with_as_of(as_of: NaiveDate) -> Self {
        Self { as_of: Some(as_of) }
    }

    fn capture_as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Scan through a paginated snapshot fetcher, one page per batch.
    pub fn scan_snapshot<T: PageTransport>(
        &self,
        fetcher: &ChainFetcher<T>,
        request: &ScanRequest,
    ) -> Result<ScanReport> {
        request.validate()?;
        let as_of = self.capture_as_of();
        let mut report = ScanReport::new(request, as_of);
        let Some(reference_price) = usable_price(request.reference_price) else {
            return Ok(report.unavailable(Unavailable::NoReferencePrice));
        };
        let window = DteWindow::new(as_of, request.min_dte, request.max_dte);
        if window.is_empty() {
            return Ok(report);
        }

        let ctx = BatchContext::new(request, as_of, reference_price, window);
        let option_type = request.strategy.option_type();
        for page in fetcher.pages(&request.ticker, option_type, &window) {
            match page {
                Ok(page) => {
                    let records = page
                        .records
                        .into_iter()
                        .map(|r| r.map(RawContract::Snapshot))
                        .collect();
                    ctx.absorb(records, &mut report);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    let index = report.batches_scanned + report.skipped.len() + 1;
                    let label = format!("page {}", index);
                    report.skip(label, &e);
                }
            }
        }

        Ok(ctx.finish(report))
    }

    /// Scan expiration by expiration, skipping those outside the window
    /// before any rows are loaded.
    pub fn scan_expirations<S: ExpirationSource>(
        &self,
        source: &S,
        request: &ScanRequest,
    ) -> Result<ScanReport> {
        request.validate()?;
        let as_of = self.capture_as_of();
        let mut report = ScanReport::new(request, as_of);
        let Some(reference_price) = usable_price(request.reference_price) else {
            return Ok(report.unavailable(Unavailable::NoReferencePrice));
        };
        let window = DteWindow::new(as_of, request.min_dte, request.max_dte);

        let expirations = match source.expirations(&request.ticker) {
            Ok(list) => list,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                report.skip("expirations".to_string(), &e);
                return Ok(report.unavailable(Unavailable::EmptyChain));
            }
        };

        let ctx = BatchContext::new(request, as_of, reference_price, window);
        let option_type = request.strategy.option_type();
        for expiration in expirations {
            if !window.contains_date(expiration) {
                continue;
            }
            match source.contracts(&request.ticker, option_type, expiration) {
                Ok(records) => ctx.absorb(records, &mut report),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => report.skip(expiration.to_string(), &e),
            }
        }

        Ok(ctx.finish(report))
    }
}

fn usable_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

// ---------------------------------------------------------------------------
// BatchContext — per-scan state shared by both source kinds
// ---------------------------------------------------------------------------

struct BatchContext {
    normalizer: ContractNormalizer,
    filter: CandidateFilter,
    delta_band: Option<DeltaBand>,
    reference_price: f64,
    window: DteWindow,
}

impl BatchContext {
    fn new(
        request: &ScanRequest,
        as_of: NaiveDate,
        reference_price: f64,
        window: DteWindow,
    ) -> Self {
        Self {
            normalizer: ContractNormalizer::new(as_of),
            filter: CandidateFilter::new(request.strategy, request.criteria()),
            delta_band: request.delta_band,
            reference_price,
            window,
        }
    }

    fn absorb(&self, records: Vec<Result<RawContract>>, report: &mut ScanReport) {
        report.batches_scanned += 1;
        let mut contracts = Vec::with_capacity(records.len());
        for record in records {
            let parsed = record.and_then(|raw| self.normalizer.normalize(&raw));
            match parsed {
                Ok(contract) if self.window.contains(contract.dte) => contracts.push(contract),
                Ok(_) => report.outside_window += 1,
                Err(e) => {
                    tracing::debug!(error = %e, "dropping unparseable record");
                    report.parse_failures += 1;
                }
            }
        }
        report.contracts_seen += contracts.len();

        let gated = contracts
            .iter()
            .filter(|c| self.delta_band.map_or(true, |band| band.admits(c)));
        report
            .candidates
            .extend(self.filter.select(gated, self.reference_price));
    }

    fn finish(&self, mut report: ScanReport) -> ScanReport {
        if report.contracts_seen == 0 {
            report.unavailable = Some(Unavailable::EmptyChain);
        }
        tracing::info!(
            ticker = %report.ticker,
            strategy = ?report.strategy,
            batches = report.batches_scanned,
            skipped = report.skipped.len(),
            contracts = report.contracts_seen,
            candidates = report.candidates.len(),
            "scan complete"
        );
        report
    }
}
