//! Maps provider records of either shape into canonical [`Contract`]s.
//!
//! A normalizer is pinned to one as-of date for its whole lifetime, so every
//! contract produced during a scan shares the same DTE reference.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Result, ScanError};
use crate::models::{ChainRow, Contract, Greeks, OptionType, RawContract, SnapshotRecord};

// ---------------------------------------------------------------------------
// ContractNormalizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct ContractNormalizer {
    as_of: NaiveDate,
}

impl ContractNormalizer {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    /// Normalizer pinned to the current UTC calendar date.
    pub fn today() -> Self {
        Self::new(Utc::now().date_naive())
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Days from the as-of date to `expiration`. Negative once expired.
    pub fn dte(&self, expiration: NaiveDate) -> i64 {
        (expiration - self.as_of).num_days()
    }

    pub fn normalize(&self, raw: &RawContract) -> Result<Contract> {
        match raw {
            RawContract::Snapshot(record) => self.from_snapshot(record),
            RawContract::Row(row) => self.from_row(row),
        }
    }

    /// Shape A: nested snapshot record.
    pub fn from_snapshot(&self, record: &SnapshotRecord) -> Result<Contract> {
        let details = record
            .details
            .as_ref()
            .ok_or_else(|| ScanError::Parse("snapshot record has no details".into()))?;

        let symbol = required(details.ticker.clone(), "details.ticker")?;
        let strike = strike(details.strike_price, &symbol)?;
        let expiration = parse_expiration(&required(
            details.expiration_date.clone(),
            "details.expiration_date",
        )?)?;
        let option_type =
            OptionType::parse(&required(details.contract_type.clone(), "details.contract_type")?)?;

        let price = resolve_price(
            record.last_trade.as_ref().and_then(|t| t.price),
            record.last_quote.as_ref().and_then(|q| q.bid_price),
            record.last_quote.as_ref().and_then(|q| q.ask_price),
        );

        let greeks = record.greeks.as_ref().map(|g| Greeks {
            delta: g.delta,
            gamma: g.gamma,
            theta: g.theta,
            vega: g.vega,
        });

        Ok(Contract {
            dte: self.dte(expiration),
            symbol,
            strike,
            expiration,
            option_type,
            price,
            greeks: clean_greeks(greeks),
            implied_volatility: clean_iv(record.implied_volatility),
            open_interest: count(record.open_interest).unwrap_or(0),
            volume: count(record.day.as_ref().and_then(|d| d.volume)),
        })
    }

    /// Shape B: flat chain row. The premium is the row's bid.
    pub fn from_row(&self, row: &ChainRow) -> Result<Contract> {
        let symbol = required(row.symbol.clone(), "symbol")?;
        let strike = strike(row.strike, &symbol)?;
        let expiration = parse_expiration(&required(row.expiration.clone(), "expiration")?)?;
        let option_type = OptionType::parse(&required(row.option_type.clone(), "type")?)?;

        let greeks = Greeks {
            delta: row.delta,
            gamma: row.gamma,
            theta: row.theta,
            vega: row.vega,
        };

        Ok(Contract {
            dte: self.dte(expiration),
            symbol,
            strike,
            expiration,
            option_type,
            price: row.bid.filter(|b| b.is_finite()),
            greeks: clean_greeks(Some(greeks)),
            implied_volatility: clean_iv(row.implied_volatility),
            open_interest: count(row.open_interest).unwrap_or(0),
            volume: count(row.volume),
        })
    }
}

// ---------------------------------------------------------------------------
// Price and date helpers
// ---------------------------------------------------------------------------

/// Premium resolution: last trade, else bid/ask mid rounded to 4 places,
/// else absent.
pub fn resolve_price(last_trade: Option<f64>, bid: Option<f64>, ask: Option<f64>) -> Option<f64> {
    if let Some(px) = last_trade.filter(|p| p.is_finite()) {
        return Some(px);
    }
    match (bid, ask) {
        (Some(b), Some(a)) if b.is_finite() && a.is_finite() => {
            Some(((b + a) / 2.0 * 10_000.0).round() / 10_000.0)
        }
        _ => None,
    }
}

/// Parse an expiration given as a plain date or a full ISO-8601 timestamp.
pub fn parse_expiration(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }
    // Timestamp-with-zone text as SQL engines render it: "2025-06-13 00:00:00+00"
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(dt.date());
        }
    }
    Err(ScanError::Parse(format!("unparseable expiration '{}'", value)))
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ScanError::Parse(format!("missing {}", field))),
    }
}

fn strike(value: Option<f64>, symbol: &str) -> Result<f64> {
    match value {
        Some(k) if k.is_finite() && k > 0.0 => Ok(k),
        Some(k) => Err(ScanError::Parse(format!("{}: invalid strike {}", symbol, k))),
        None => Err(ScanError::Parse(format!("{}: missing strike", symbol))),
    }
}

/// Drops non-finite greeks and any delta outside [-1, 1].
fn clean_greeks(greeks: Option<Greeks>) -> Option<Greeks> {
    let g = greeks?;
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
    let cleaned = Greeks {
        delta: finite(g.delta).filter(|d| (-1.0..=1.0).contains(d)),
        gamma: finite(g.gamma),
        theta: finite(g.theta),
        vega: finite(g.vega),
    };
    if cleaned.delta.is_none() && g.delta.is_some_and(|d| d.is_finite()) {
        tracing::debug!(delta = ?g.delta, "discarding out-of-range delta");
    }
    (!cleaned.is_empty()).then_some(cleaned)
}

fn clean_iv(iv: Option<f64>) -> Option<f64> {
    iv.filter(|v| v.is_finite() && *v >= 0.0)
}

fn count(value: Option<f64>) -> Option<u64> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
}
