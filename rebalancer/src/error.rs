//! Error types for the rebalancer.

use std::path::PathBuf;

use cryptofolio::RebalanceError;
use cryptofolio_broker::BrokerError;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("portfolio total value is zero or unknown")]
    EmptyPortfolio,

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("cycle aborted: {0}")]
    Aborted(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

impl Error {
    /// Errors after which the next scheduled cycle may still succeed.
    pub fn skips_cycle(&self) -> bool {
        matches!(self, Error::DataUnavailable(_) | Error::EmptyPortfolio)
    }
}

impl From<RebalanceError> for Error {
    fn from(e: RebalanceError) -> Self {
        match e {
            RebalanceError::InvalidConfiguration(msg) => Error::InvalidConfiguration(msg),
            RebalanceError::EmptyPortfolio => Error::EmptyPortfolio,
        }
    }
}

impl From<BrokerError> for Error {
    fn from(e: BrokerError) -> Self {
        match e {
            BrokerError::DataUnavailable(msg) => Error::DataUnavailable(msg),
            e if e.is_data_unavailable() => Error::DataUnavailable(e.to_string()),
            e => Error::Execution(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_classification() {
        assert!(Error::DataUnavailable("x".into()).skips_cycle());
        assert!(Error::EmptyPortfolio.skips_cycle());
        assert!(!Error::InvalidConfiguration("x".into()).skips_cycle());
        assert!(!Error::Execution("x".into()).skips_cycle());
    }

    #[test]
    fn from_core_errors() {
        let e: Error = RebalanceError::EmptyPortfolio.into();
        assert!(matches!(e, Error::EmptyPortfolio));
        let e: Error = RebalanceError::InvalidConfiguration("bad".into()).into();
        assert_eq!(e.to_string(), "invalid configuration: bad");
    }

    #[test]
    fn from_broker_errors() {
        let e: Error = BrokerError::DataUnavailable("feed down".into()).into();
        assert!(matches!(e, Error::DataUnavailable(_)));
        assert_eq!(e.to_string(), "data unavailable: feed down");
        let e: Error = BrokerError::NotConnected.into();
        assert_eq!(e.to_string(), "data unavailable: not connected");
        let e: Error = BrokerError::Order("rejected".into()).into();
        assert!(matches!(e, Error::Execution(_)));
    }
}
