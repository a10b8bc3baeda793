//! Strategy selection rules for cash-secured puts and covered calls.
//!
//! Everything here is pure: contracts in, candidates out, no I/O.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config;
use crate::error::{Result, ScanError};
use crate::models::{CandidateResult, Contract, OptionType};

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Sell puts against cash collateral.
    CashSecuredPut,
    /// Sell calls against shares already held.
    CoveredCall,
}

impl Strategy {
    /// The contract kind this strategy sells.
    pub fn option_type(&self) -> OptionType {
        match self {
            Strategy::CashSecuredPut => OptionType::Put,
            Strategy::CoveredCall => OptionType::Call,
        }
    }

    pub fn is_otm(&self, strike: f64, reference_price: f64) -> bool {
        match self {
            Strategy::CashSecuredPut => strike < reference_price,
            Strategy::CoveredCall => strike > reference_price,
        }
    }

    /// Unrounded ROI in percent.
    ///
    /// CSP measures against the strike (the collateral); CC measures against
    /// the underlying price (the capital already in the shares).
    pub fn roi(&self, price: f64, strike: f64, reference_price: f64) -> Option<f64> {
        let base = match self {
            Strategy::CashSecuredPut => strike,
            Strategy::CoveredCall => reference_price,
        };
        (base > 0.0 && base.is_finite()).then(|| price / base * 100.0)
    }
}

// ---------------------------------------------------------------------------
// FilterCriteria
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub min_roi: f64,
    pub max_dte: i64,
    /// Lower DTE bound; not enforced when `None`.
    pub min_dte: Option<i64>,
}

impl FilterCriteria {
    pub fn new(min_roi: f64, max_dte: i64) -> Self {
        Self {
            min_roi,
            max_dte,
            min_dte: None,
        }
    }

    pub fn with_min_dte(mut self, min_dte: i64) -> Self {
        self.min_dte = Some(min_dte);
        self
    }

    fn accepts_dte(&self, dte: i64) -> bool {
        dte <= self.max_dte && self.min_dte.map_or(true, |min| dte >= min)
    }
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self::new(config::DEFAULT_MIN_ROI, config::DEFAULT_MAX_DTE)
    }
}

// ---------------------------------------------------------------------------
// CandidateFilter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct CandidateFilter {
    strategy: Strategy,
    criteria: FilterCriteria,
}

impl CandidateFilter {
    pub fn new(strategy: Strategy, criteria: FilterCriteria) -> Self {
        Self { strategy, criteria }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Evaluate one contract, returning a candidate when every rule passes.
    pub fn evaluate(&self, contract: &Contract, reference_price: f64) -> Option<CandidateResult> {
        if !reference_price.is_finite() || reference_price <= 0.0 {
            return None;
        }
        if contract.option_type != self.strategy.option_type() {
            return None;
        }
        let price = contract.price?;
        if !self.strategy.is_otm(contract.strike, reference_price) {
            return None;
        }
        if !self.criteria.accepts_dte(contract.dte) {
            return None;
        }
        let roi = self.strategy.roi(price, contract.strike, reference_price)?;
        if roi < self.criteria.min_roi {
            return None;
        }
        Some(CandidateResult {
            contract: contract.clone(),
            roi_pct: round_to(roi, 2),
        })
    }

    /// Select qualifying contracts in iteration order.
    pub fn select<'a, I>(&self, contracts: I, reference_price: f64) -> Vec<CandidateResult>
    where
        I: IntoIterator<Item = &'a Contract>,
    {
        contracts
            .into_iter()
            .filter_map(|c| self.evaluate(c, reference_price))
            .collect()
    }
}

/// One-shot form of [`CandidateFilter::select`].
pub fn select(
    strategy: Strategy,
    contracts: &[Contract],
    reference_price: f64,
    min_roi: f64,
    max_dte: i64,
    min_dte: Option<i64>,
) -> Vec<CandidateResult> {
    let criteria = FilterCriteria {
        min_roi,
        max_dte,
        min_dte,
    };
    CandidateFilter::new(strategy, criteria).select(contracts, reference_price)
}

// ---------------------------------------------------------------------------
// DeltaBand
// ---------------------------------------------------------------------------

/// Inclusive band on delta magnitude.
///
/// Puts carry negative deltas, so the band is compared against `|delta|`
/// and one band serves both contract kinds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaBand {
    pub min: f64,
    pub max: f64,
}

impl DeltaBand {
    pub const WIDE: DeltaBand = DeltaBand { min: 0.10, max: 0.90 };
    pub const NARROW: DeltaBand = DeltaBand { min: 0.15, max: 0.50 };

    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min > max {
            return Err(ScanError::InvalidArgument(format!(
                "delta band [{}, {}] must satisfy 0 <= min <= max <= 1",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, delta: f64) -> bool {
        let d = delta.abs();
        d >= self.min && d <= self.max
    }

    /// Contracts without a delta never pass the gate.
    pub fn admits(&self, contract: &Contract) -> bool {
        contract.delta().is_some_and(|d| self.contains(d))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Order candidates by DTE, then strike. Presentation only.
pub fn rank_by_expiry(candidates: &mut [CandidateResult]) {
    candidates.sort_by(|a, b| {
        a.dte().cmp(&b.dte()).then_with(|| {
            a.strike()
                .partial_cmp(&b.strike())
                .unwrap_or(Ordering::Equal)
        })
    });
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
