use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

// ---------------------------------------------------------------------------
// OptionType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Put,
    Call,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Put => "put",
            OptionType::Call => "call",
        }
    }

    /// Parse a provider contract type, case-insensitively.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "put" | "p" => Ok(OptionType::Put),
            "call" | "c" => Ok(OptionType::Call),
            other => Err(ScanError::Parse(format!("unknown contract type '{}'", other))),
        }
    }

    /// Whether a contract of this type at `strike` is in the money.
    pub fn is_itm(&self, strike: f64, reference_price: f64) -> bool {
        match self {
            OptionType::Put => reference_price < strike,
            OptionType::Call => reference_price > strike,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Greeks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
}

impl Greeks {
    pub fn is_empty(&self) -> bool {
        self.delta.is_none() && self.gamma.is_none() && self.theta.is_none() && self.vega.is_none()
    }
}

// ---------------------------------------------------------------------------
// Contract — canonical option contract
// ---------------------------------------------------------------------------

/// A single option contract after normalization.
///
/// `dte` is derived from the scan's as-of date and may be negative for
/// contracts that have already expired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub symbol: String,
    pub strike: f64,
    pub expiration: NaiveDate,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub price: Option<f64>,
    pub dte: i64,
    pub greeks: Option<Greeks>,
    pub implied_volatility: Option<f64>,
    pub open_interest: u64,
    pub volume: Option<u64>,
}

impl Contract {
    pub fn delta(&self) -> Option<f64> {
        self.greeks.and_then(|g| g.delta)
    }
}

// ---------------------------------------------------------------------------
// CandidateResult — a contract that passed a strategy filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    #[serde(flatten)]
    pub contract: Contract,
    pub roi_pct: f64,
}

impl CandidateResult {
    pub fn symbol(&self) -> &str {
        &self.contract.symbol
    }

    pub fn strike(&self) -> f64 {
        self.contract.strike
    }

    pub fn dte(&self) -> i64 {
        self.contract.dte
    }
}

impl fmt::Display for CandidateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.contract;
        let delta = c
            .delta()
            .map(|d| format!("{:+.3}", d))
            .unwrap_or_else(|| "  n/a ".to_string());
        let price = c
            .price
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{:>22}  delta={}  DTE={:>3}  Strike={:<8}  Price={:<8}  ROI={:.2}%",
            c.symbol, delta, c.dte, c.strike, price, self.roi_pct
        )
    }
}
