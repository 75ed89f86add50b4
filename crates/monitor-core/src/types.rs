use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One completed (or in-progress) daily session close for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyClose {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Rise,
    Drop,
}

impl Direction {
    /// `Rise` only for a strictly positive change; zero and below count as a drop.
    pub fn from_change(pct_change: f64) -> Self {
        if pct_change > 0.0 {
            Direction::Rise
        } else {
            Direction::Drop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Rise => "rise",
            Direction::Drop => "drop",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A price deviation from baseline that crossed the alert threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMove {
    pub symbol: String,
    pub baseline: f64,
    pub current: f64,
    pub pct_change: f64,
    pub direction: Direction,
}

/// Percentage change of `current` relative to `baseline`.
pub fn percent_change(baseline: f64, current: f64) -> f64 {
    (current - baseline) / baseline * 100.0
}
