use chrono::{DateTime, Utc};
use dca::ExchangeError;
use thiserror::Error;

/// Reasons a scheduler run stops before (or instead of) placing orders.
///
/// Every variant is fatal to the run as a whole. Per-coin order failures are
/// not represented here, see [`ExecutionError`](crate::executor::ExecutionError).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Malformed or incomplete run configuration.
    #[error("{0}")]
    Configuration(String),

    /// Coin weights must add up to exactly 100.
    #[error("Total percentages must be exactly 100, provided {total}")]
    InvalidWeights { total: u32 },

    /// A coin's share of the budget is below what the venue will accept.
    #[error(
        "{venue} minimum {coin} trade amount is ${minimum:.2}, but you're trying to purchase ${amount:.2}"
    )]
    BelowMinimum {
        venue: String,
        coin: String,
        minimum: f64,
        amount: f64,
    },

    #[error("Detected a recent purchase, waiting for next purchase window")]
    WindowNotElapsed,

    /// The `until` bound is in the past.
    #[error("Deadline has passed, not taking any action")]
    DeadlinePassed,

    /// The `after` bound has not been reached.
    #[error("Configured to start after {after}, not taking any action")]
    NotStarted { after: DateTime<Utc> },

    /// The operator declined a forced run.
    #[error("User rejected the trade")]
    Declined,

    #[error("No sufficient amount for trade and autofund is disabled. Deposit money to proceed")]
    InsufficientFunds,

    /// A previous deposit is still in flight; stacking another one is refused.
    #[error("Not enough available funds, wait for transfers to settle")]
    TransfersSettling,

    #[error("No ACH bank account found on this account")]
    NoBankAccount,

    /// Anything the venue reported, passed through untouched.
    #[error("{0}")]
    Venue(ExchangeError),
}

impl From<ExchangeError> for SyncError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::NoBankAccount => SyncError::NoBankAccount,
            other => SyncError::Venue(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
