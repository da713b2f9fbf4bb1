use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One `COIN:PERCENT` entry of the allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinWeight {
    symbol: String,
    percentage: u32,
}

impl CoinWeight {
    pub fn new(symbol: impl Into<String>, percentage: u32) -> Self {
        Self {
            symbol: symbol.into(),
            percentage,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn percentage(&self) -> u32 {
        self.percentage
    }
}

impl fmt::Display for CoinWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.symbol, self.percentage)
    }
}

impl FromStr for CoinWeight {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (symbol, percentage) = s.split_once(':').ok_or_else(|| {
            SyncError::Configuration(format!("coin '{}' must be formatted as COIN:PERCENT", s))
        })?;

        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(SyncError::Configuration(format!(
                "coin '{}' is missing the coin symbol",
                s
            )));
        }

        let percentage = percentage.trim().parse::<u32>().map_err(|e| {
            SyncError::Configuration(format!("invalid percentage in '{}': {}", s, e))
        })?;

        Ok(Self::new(symbol.to_ascii_uppercase(), percentage))
    }
}
