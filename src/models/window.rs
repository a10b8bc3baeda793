use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive days-to-expiration window anchored on one as-of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DteWindow {
    pub as_of: NaiveDate,
    pub min_dte: i64,
    pub max_dte: i64,
}

impl DteWindow {
    pub fn new(as_of: NaiveDate, min_dte: i64, max_dte: i64) -> Self {
        Self {
            as_of,
            min_dte,
            max_dte,
        }
    }

    pub fn dte_of(&self, expiration: NaiveDate) -> i64 {
        (expiration - self.as_of).num_days()
    }

    pub fn contains(&self, dte: i64) -> bool {
        self.min_dte <= dte && dte <= self.max_dte
    }

    pub fn contains_date(&self, expiration: NaiveDate) -> bool {
        self.contains(self.dte_of(expiration))
    }

    pub fn is_empty(&self) -> bool {
        self.min_dte > self.max_dte
    }

    /// Earliest expiration inside the window (`expiration_date.gte`).
    pub fn first_date(&self) -> NaiveDate {
        shift(self.as_of, self.min_dte)
    }

    /// Latest expiration inside the window (`expiration_date.lte`).
    pub fn last_date(&self) -> NaiveDate {
        shift(self.as_of, self.max_dte)
    }
}

fn shift(date: NaiveDate, days: i64) -> NaiveDate {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}
