//! Broker error types.

/// Errors that can occur at the broker boundary.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("order error: {0}")]
    Order(String),

    #[error("not connected")]
    NotConnected,

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("{0}")]
    Other(String),
}

impl BrokerError {
    /// True for failures that should skip the current cycle rather than abort.
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, BrokerError::DataUnavailable(_) | BrokerError::NotConnected)
    }
}
