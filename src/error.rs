//! Errors raised by the rebalancing core.

/// Why a portfolio could not be built or a rebalance could not be computed.
///
/// The core fails fast: no partial or best-effort trade list is ever returned
/// alongside one of these.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RebalanceError {
    /// Weight sum or range invariant violated, or a bad policy parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Total portfolio value is zero, negative, or not a number.
    #[error("portfolio total value is zero or unknown")]
    EmptyPortfolio,
}

pub type Result<T> = std::result::Result<T, RebalanceError>;
