use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::OptionType;

/// An already-open short option position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    pub strike: f64,
    pub expiration: NaiveDate,
    /// Share of the collected premium already captured, in percent.
    #[serde(default)]
    pub profit_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advice {
    Hold,
    Roll,
    Close,
}

impl fmt::Display for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Advice::Hold => "Hold",
            Advice::Roll => "Roll",
            Advice::Close => "Close",
        };
        f.write_str(s)
    }
}
