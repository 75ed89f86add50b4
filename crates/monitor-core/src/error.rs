use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Market data error: {0}")]
    MarketData(String),

    #[error("Current price unavailable for {0}")]
    PriceUnavailable(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
