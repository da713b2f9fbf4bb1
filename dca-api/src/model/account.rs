use serde::{Deserialize, Serialize};

/// Snapshot of a fiat wallet on the venue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub available: f64,
}

impl Account {
    pub fn new(available: f64) -> Self {
        Self { available }
    }
}

/// A deposit that has been initiated but has not settled yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub amount: f64,
}

impl PendingTransfer {
    pub fn new(amount: f64) -> Self {
        Self { amount }
    }
}
