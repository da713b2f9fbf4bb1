use thiserror::Error;

/// Failures reported by a venue behind the [`Exchange`](crate::Exchange) capability.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    /// The venue cannot provide this capability at all.
    #[error("{venue} does not support {operation}")]
    Unsupported {
        venue: &'static str,
        operation: &'static str,
    },

    /// No ACH-linked payment method is available for deposits.
    #[error("No ACH bank account found on this account")]
    NoBankAccount,

    #[error("No {0} wallet on this account")]
    AccountNotFound(String),

    #[error("{0} not found")]
    UnknownSymbol(String),

    /// The venue accepted the request but refused it (insufficient funds,
    /// below minimum, market closed, ...).
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    /// Missing or unusable credentials.
    #[error("{0}")]
    Auth(String),
}

impl ExchangeError {
    pub fn unsupported(venue: &'static str, operation: &'static str) -> Self {
        Self::Unsupported { venue, operation }
    }
}

pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
