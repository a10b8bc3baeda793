//! Shared fixtures for the wheel-scanner integration tests.
//!
//! Provides snapshot-record builders, a scripted [`PageTransport`] that
//! records every request it receives, and NDJSON chain files for the DuckDB
//! table.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::Write;

use chrono::NaiveDate;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use wheel_scanner::{
    ChainFetcher, ClientConfig, PageRequest, PageResponse, PageTransport, Result, ScanError,
};

pub const API_KEY: &str = "test-key";
pub const BASE_URL: &str = "https://api.example.test";

/// Fixed as-of date for every test (a Monday).
pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

// ---------------------------------------------------------------------------
// Snapshot records
// ---------------------------------------------------------------------------

/// A Shape A record priced by its last trade.
pub fn snapshot(ticker: &str, kind: &str, strike: f64, expiration: &str, last: f64) -> Value {
    json!({
        "details": {
            "ticker": ticker,
            "strike_price": strike,
            "expiration_date": expiration,
            "contract_type": kind
        },
        "last_trade": { "price": last },
        "open_interest": 1200,
        "implied_volatility": 0.21
    })
}

/// A Shape A record with greeks and a quote but no trade.
pub fn quoted_snapshot(
    ticker: &str,
    kind: &str,
    strike: f64,
    expiration: &str,
    bid: f64,
    ask: f64,
    delta: f64,
) -> Value {
    json!({
        "details": {
            "ticker": ticker,
            "strike_price": strike,
            "expiration_date": expiration,
            "contract_type": kind
        },
        "greeks": { "delta": delta, "gamma": 0.02, "theta": -0.05, "vega": 0.11 },
        "last_quote": { "bid_price": bid, "ask_price": ask },
        "open_interest": 300
    })
}

pub fn page_body(records: Vec<Value>, next_url: Option<&str>) -> String {
    let mut body = json!({ "status": "OK", "results": records });
    if let Some(url) = next_url {
        body["next_url"] = json!(url);
    }
    body.to_string()
}

pub fn ok(body: String) -> Result<PageResponse> {
    Ok(PageResponse { status: 200, body })
}

pub fn status(code: u16) -> Result<PageResponse> {
    Ok(PageResponse {
        status: code,
        body: json!({ "status": "ERROR", "message": "nope" }).to_string(),
    })
}

pub fn network_failure() -> Result<PageResponse> {
    Err(ScanError::Io(std::io::Error::new(
        std::io::ErrorKind::TimedOut,
        "operation timed out",
    )))
}

pub fn cursor(n: u32) -> String {
    format!("{}/v3/snapshot/options/SPY?cursor=page{}", BASE_URL, n)
}

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

/// Replays queued responses in order and records every request.
///
/// Runs out as a network failure, so a runaway pager fails loudly.
pub struct ScriptedTransport {
    responses: RefCell<VecDeque<Result<PageResponse>>>,
    requests: RefCell<Vec<PageRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<PageResponse>>) -> Self {
        Self {
            responses: RefCell::new(responses.into_iter().collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.borrow().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl PageTransport for ScriptedTransport {
    fn send(&self, request: &PageRequest) -> Result<PageResponse> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(network_failure)
    }
}

pub fn config() -> ClientConfig {
    let mut config = ClientConfig::new(API_KEY);
    config.base_url = BASE_URL.to_string();
    config
}

pub fn fetcher(responses: Vec<Result<PageResponse>>) -> ChainFetcher<ScriptedTransport> {
    ChainFetcher::with_transport(config(), ScriptedTransport::new(responses))
}

/// Query value for `key` in a recorded request, if present.
pub fn query_values(request: &PageRequest, key: &str) -> Vec<String> {
    request
        .url
        .query_pairs()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .collect()
}

// ---------------------------------------------------------------------------
// Tabular chain fixtures
// ---------------------------------------------------------------------------

pub fn chain_rows() -> Vec<Value> {
    vec![
        json!({"underlying": "SPY", "symbol": "SPY250613P00095000", "strike": 95.0, "expiration": "2025-06-13", "type": "put", "bid": 1.50, "ask": 1.60, "last_price": 1.55, "volume": 40, "open_interest": 900, "implied_volatility": 0.22, "delta": -0.21}),
        json!({"underlying": "SPY", "symbol": "SPY250613P00105000", "strike": 105.0, "expiration": "2025-06-13", "type": "put", "bid": 6.10, "ask": 6.30, "last_price": 6.20, "volume": 12, "open_interest": 150, "implied_volatility": 0.25, "delta": -0.71}),
        json!({"underlying": "SPY", "symbol": "SPY250613C00110000", "strike": 110.0, "expiration": "2025-06-13", "type": "call", "bid": 2.00, "ask": 2.10, "last_price": 2.05, "volume": 33, "open_interest": 400, "implied_volatility": 0.19, "delta": 0.18}),
        json!({"underlying": "SPY", "symbol": "SPY250620P00090000", "strike": 90.0, "expiration": "2025-06-20", "type": "put", "bid": 1.20, "ask": 1.30, "last_price": 1.25, "volume": 8, "open_interest": 75, "implied_volatility": 0.24, "delta": -0.12}),
        json!({"underlying": "SPY", "symbol": "SPY250606P00097000", "strike": 97.0, "expiration": "2025-06-06", "type": "put", "bid": 1.40, "ask": 1.50, "last_price": 1.45, "volume": 90, "open_interest": 2000, "implied_volatility": 0.30, "delta": -0.33}),
        json!({"underlying": "QQQ", "symbol": "QQQ250613P00095000", "strike": 95.0, "expiration": "2025-06-13", "type": "put", "bid": 3.00, "ask": 3.10, "last_price": 3.05, "volume": 5, "open_interest": 10, "implied_volatility": 0.28, "delta": -0.30}),
    ]
}

pub fn write_ndjson(rows: &[Value]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".ndjson").tempfile().unwrap();
    for row in rows {
        writeln!(file, "{}", serde_json::to_string(row).unwrap()).unwrap();
    }
    file.flush().unwrap();
    file
}
