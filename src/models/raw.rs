//! Provider record shapes, deserialized as-is before normalization.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Shape A — snapshot API record
// ---------------------------------------------------------------------------

/// One entry of a snapshot page's `results` array.
///
/// Every field is optional at this layer; missing identity fields are
/// reported by the normalizer, not by serde.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotRecord {
    #[serde(default)]
    pub details: Option<SnapshotDetails>,
    #[serde(default)]
    pub greeks: Option<SnapshotGreeks>,
    #[serde(default)]
    pub last_trade: Option<SnapshotTrade>,
    #[serde(default)]
    pub last_quote: Option<SnapshotQuote>,
    #[serde(default)]
    pub day: Option<SnapshotDay>,
    #[serde(default)]
    pub open_interest: Option<f64>,
    #[serde(default)]
    pub implied_volatility: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDetails {
    pub ticker: Option<String>,
    pub strike_price: Option<f64>,
    pub expiration_date: Option<String>,
    pub contract_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotGreeks {
    pub delta: Option<f64>,
    pub gamma: Option<f64>,
    pub theta: Option<f64>,
    pub vega: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotTrade {
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotQuote {
    pub bid_price: Option<f64>,
    pub ask_price: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDay {
    pub volume: Option<f64>,
}

/// Body of one snapshot page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotPage {
    /// An absent or `null` result list is an empty page.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<serde_json::Value>,
    #[serde(default)]
    pub next_url: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Shape B — tabular chain row
// ---------------------------------------------------------------------------

/// A flat chain row, as exported by consumer market-data libraries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainRow {
    pub symbol: Option<String>,
    pub strike: Option<f64>,
    pub expiration: Option<String>,
    #[serde(rename = "type")]
    pub option_type: Option<String>,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub open_interest: Option<f64>,
    #[serde(default)]
    pub implied_volatility: Option<f64>,
    #[serde(default)]
    pub delta: Option<f64>,
    #[serde(default)]
    pub gamma: Option<f64>,
    #[serde(default)]
    pub theta: Option<f64>,
    #[serde(default)]
    pub vega: Option<f64>,
}

// ---------------------------------------------------------------------------
// RawContract
// ---------------------------------------------------------------------------

/// A raw record in one of the two supported provider shapes.
#[derive(Debug, Clone)]
pub enum RawContract {
    Snapshot(SnapshotRecord),
    Row(ChainRow),
}

impl From<SnapshotRecord> for RawContract {
    fn from(record: SnapshotRecord) -> Self {
        RawContract::Snapshot(record)
    }
}

impl From<ChainRow> for RawContract {
    fn from(row: ChainRow) -> Self {
        RawContract::Row(row)
    }
}
