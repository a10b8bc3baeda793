//! Contract normalization tests for both record shapes.

mod common;

use common::*;
use serde_json::json;
use wheel_scanner::models::{ChainRow, RawContract, SnapshotRecord};
use wheel_scanner::normalizer::{parse_expiration, resolve_price};
use wheel_scanner::{ContractNormalizer, ErrorKind, OptionType};

fn record(value: serde_json::Value) -> RawContract {
    RawContract::Snapshot(serde_json::from_value::<SnapshotRecord>(value).unwrap())
}

fn row(value: serde_json::Value) -> RawContract {
    RawContract::Row(serde_json::from_value::<ChainRow>(value).unwrap())
}

// ---------------------------------------------------------------------------
// Price resolution
// ---------------------------------------------------------------------------

#[test]
fn last_trade_wins_over_quote() {
    assert_eq!(resolve_price(Some(1.42), Some(1.0), Some(2.0)), Some(1.42));
}

#[test]
fn mid_quote_is_rounded_to_four_places() {
    assert_eq!(resolve_price(None, Some(1.0), Some(1.25)), Some(1.125));
    assert_eq!(resolve_price(None, Some(1.00001), Some(1.00004)), Some(1.0));
}

#[test]
fn incomplete_quote_means_no_price() {
    assert_eq!(resolve_price(None, Some(1.0), None), None);
    assert_eq!(resolve_price(None, None, Some(1.0)), None);
    assert_eq!(resolve_price(None, None, None), None);
}

// ---------------------------------------------------------------------------
// Shape A
// ---------------------------------------------------------------------------

#[test]
fn snapshot_record_maps_to_contract() {
    let normalizer = ContractNormalizer::new(as_of());
    let raw = record(quoted_snapshot(
        "O:SPY250613P00095000",
        "put",
        95.0,
        "2025-06-13",
        1.40,
        1.60,
        -0.21,
    ));

    let contract = normalizer.normalize(&raw).unwrap();
    assert_eq!(contract.symbol, "O:SPY250613P00095000");
    assert_eq!(contract.strike, 95.0);
    assert_eq!(contract.expiration, date("2025-06-13"));
    assert_eq!(contract.option_type, OptionType::Put);
    assert_eq!(contract.price, Some(1.5));
    assert_eq!(contract.dte, 11);
    assert_eq!(contract.delta(), Some(-0.21));
    assert_eq!(contract.open_interest, 300);
    assert_eq!(contract.implied_volatility, None);
}

#[test]
fn snapshot_without_any_price_keeps_price_absent() {
    let normalizer = ContractNormalizer::new(as_of());
    let raw = record(json!({
        "details": {
            "ticker": "O:X",
            "strike_price": 50,
            "expiration_date": "2025-06-20",
            "contract_type": "call"
        },
        "last_quote": { "bid_price": 0.8 }
    }));

    let contract = normalizer.normalize(&raw).unwrap();
    assert_eq!(contract.price, None);
    assert_eq!(contract.open_interest, 0);
    assert!(contract.greeks.is_none());
}

#[test]
fn dte_shares_one_as_of_date() {
    let normalizer = ContractNormalizer::new(as_of());
    let expirations = ["2025-06-06", "2025-06-13", "2025-07-18", "2025-05-30"];
    let dtes: Vec<i64> = expirations
        .iter()
        .map(|e| {
            let raw = record(snapshot("O:X", "put", 10.0, e, 0.5));
            normalizer.normalize(&raw).unwrap().dte
        })
        .collect();
    assert_eq!(dtes, vec![4, 11, 46, -3]);
}

#[test]
fn missing_identity_fields_are_parse_errors() {
    let normalizer = ContractNormalizer::new(as_of());
    let cases = vec![
        json!({}),
        json!({"details": {"strike_price": 95, "expiration_date": "2025-06-13", "contract_type": "put"}}),
        json!({"details": {"ticker": "O:X", "expiration_date": "2025-06-13", "contract_type": "put"}}),
        json!({"details": {"ticker": "O:X", "strike_price": 95, "contract_type": "put"}}),
        json!({"details": {"ticker": "O:X", "strike_price": 95, "expiration_date": "2025-06-13"}}),
        json!({"details": {"ticker": "O:X", "strike_price": 95, "expiration_date": "soon", "contract_type": "put"}}),
        json!({"details": {"ticker": "O:X", "strike_price": 95, "expiration_date": "2025-06-13", "contract_type": "straddle"}}),
        json!({"details": {"ticker": "O:X", "strike_price": 0, "expiration_date": "2025-06-13", "contract_type": "put"}}),
    ];
    for case in cases {
        let err = normalizer.normalize(&record(case.clone())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse, "case: {}", case);
    }
}

#[test]
fn out_of_range_delta_is_discarded() {
    let normalizer = ContractNormalizer::new(as_of());
    let raw = record(quoted_snapshot("O:X", "call", 110.0, "2025-06-13", 1.0, 1.2, 1.7));
    let contract = normalizer.normalize(&raw).unwrap();
    assert_eq!(contract.delta(), None);
    assert_eq!(contract.greeks.unwrap().gamma, Some(0.02));
}

// ---------------------------------------------------------------------------
// Shape B
// ---------------------------------------------------------------------------

#[test]
fn chain_row_uses_bid_as_price() {
    let normalizer = ContractNormalizer::new(as_of());
    let raw = row(json!({
        "symbol": "SPY250613C00110000",
        "strike": 110.0,
        "expiration": "2025-06-13",
        "type": "call",
        "bid": 2.0,
        "ask": 2.2,
        "last_price": 2.1,
        "open_interest": 400,
        "volume": 33,
        "delta": 0.18
    }));

    let contract = normalizer.normalize(&raw).unwrap();
    assert_eq!(contract.price, Some(2.0));
    assert_eq!(contract.option_type, OptionType::Call);
    assert_eq!(contract.dte, 11);
    assert_eq!(contract.open_interest, 400);
    assert_eq!(contract.volume, Some(33));
    assert_eq!(contract.delta(), Some(0.18));
}

#[test]
fn chain_row_without_bid_has_no_price() {
    let normalizer = ContractNormalizer::new(as_of());
    let raw = row(json!({
        "symbol": "SPY250613C00110000",
        "strike": 110.0,
        "expiration": "2025-06-13 00:00:00",
        "type": "CALL"
    }));
    let contract = normalizer.normalize(&raw).unwrap();
    assert_eq!(contract.price, None);
    assert_eq!(contract.option_type, OptionType::Call);
}

#[test]
fn chain_row_requires_type() {
    let normalizer = ContractNormalizer::new(as_of());
    let raw = row(json!({"symbol": "X", "strike": 1.0, "expiration": "2025-06-13"}));
    assert_eq!(normalizer.normalize(&raw).unwrap_err().kind(), ErrorKind::Parse);
}

// ---------------------------------------------------------------------------
// Date parsing
// ---------------------------------------------------------------------------

#[test]
fn parses_plain_and_iso_timestamps() {
    let expected = date("2025-06-20");
    for value in [
        "2025-06-20",
        "2025-06-20T16:00:00Z",
        "2025-06-20T16:00:00-04:00",
        "2025-06-20T00:00:00",
        "2025-06-20T00:00:00.000",
        "2025-06-20 00:00:00",
        "2025-06-20 00:00:00+00",
    ] {
        assert_eq!(parse_expiration(value).unwrap(), expected, "value: {}", value);
    }
}

#[test]
fn rejects_unrecognized_dates() {
    assert!(parse_expiration("06/20/2025").is_err());
    assert!(parse_expiration("").is_err());
}
