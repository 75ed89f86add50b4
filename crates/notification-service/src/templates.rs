use chrono::{DateTime, TimeZone};
use monitor_core::PriceMove;
use std::fmt::Display;

pub struct AlertTemplate;

impl AlertTemplate {
    /// Plain-text SMS body for a threshold crossing, e.g.
    /// `SPY: rise >= 1%, Timestamp: 2024-03-06 10:31:00`.
    pub fn render<Tz>(price_move: &PriceMove, threshold_pct: f64, at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        format!(
            "{}: {} >= {}%, Timestamp: {}",
            price_move.symbol,
            price_move.direction,
            threshold_pct,
            at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}
