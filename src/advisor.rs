//! Hold / Roll / Close rule for an open short option position.
//!
//! Each call decides from the snapshot it is given; nothing carries over
//! between calls.

use chrono::NaiveDate;

use crate::config;
use crate::models::{Advice, Position};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionAdvisor {
    pub close_at_profit_pct: f64,
    pub roll_within_dte: i64,
}

impl Default for PositionAdvisor {
    fn default() -> Self {
        Self {
            close_at_profit_pct: config::CLOSE_AT_PROFIT_PCT,
            roll_within_dte: config::ROLL_WITHIN_DTE,
        }
    }
}

impl PositionAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close wins over Roll when both apply.
    pub fn decide(&self, profit_pct: f64, itm: bool, dte: i64) -> Advice {
        if profit_pct >= self.close_at_profit_pct {
            Advice::Close
        } else if itm && dte <= self.roll_within_dte {
            Advice::Roll
        } else {
            Advice::Hold
        }
    }

    pub fn advise(&self, position: &Position, reference_price: f64, as_of: NaiveDate) -> Advice {
        let dte = (position.expiration - as_of).num_days();
        let itm = position.option_type.is_itm(position.strike, reference_price);
        let advice = self.decide(position.profit_pct, itm, dte);
        tracing::debug!(
            symbol = %position.symbol,
            profit_pct = position.profit_pct,
            itm,
            dte,
            advice = %advice,
            "position advice"
        );
        advice
    }
}
