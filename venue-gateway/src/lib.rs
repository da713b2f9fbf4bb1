//! # Venue Gateway
//!
//! Concrete [`Exchange`](dca::Exchange) implementations, one per supported
//! venue, plus an in-process paper venue for dry runs.

pub mod auth;
pub mod coinbase;
pub mod coinbase_v3;
pub mod ftx;
pub mod gemini;
pub mod http;
pub mod paper;

pub use coinbase::Coinbase;
pub use coinbase_v3::CoinbaseV3;
pub use ftx::Ftx;
pub use gemini::Gemini;
pub use paper::{PaperConfig, PaperExchange};

use dca::{Exchange, ExchangeResult};
use std::fmt;
use std::str::FromStr;

/// Venues selectable with `--exchange`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Coinbase,
    CoinbaseV3,
    Gemini,
    Ftx,
    FtxUs,
    Paper,
}

impl Venue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::Coinbase => "coinbase",
            Venue::CoinbaseV3 => "coinbasev3",
            Venue::Gemini => "gemini",
            Venue::Ftx => "ftx",
            Venue::FtxUs => "ftxus",
            Venue::Paper => "paper",
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Venue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coinbase" | "coinbasepro" => Ok(Venue::Coinbase),
            "coinbasev3" => Ok(Venue::CoinbaseV3),
            "gemini" => Ok(Venue::Gemini),
            "ftx" => Ok(Venue::Ftx),
            "ftxus" => Ok(Venue::FtxUs),
            "paper" => Ok(Venue::Paper),
            other => Err(format!(
                "unknown exchange '{}', expected one of coinbase, coinbasev3, gemini, ftx, ftxus, paper",
                other
            )),
        }
    }
}

/// Builds the adapter for `venue`, reading its credentials from the
/// environment. `paper` is only used by [`Venue::Paper`].
pub fn connect(venue: Venue, paper: PaperConfig) -> ExchangeResult<Box<dyn Exchange>> {
    let exchange: Box<dyn Exchange> = match venue {
        Venue::Coinbase => Box::new(Coinbase::from_env()?),
        Venue::CoinbaseV3 => Box::new(CoinbaseV3::from_env()?),
        Venue::Gemini => Box::new(Gemini::from_env()?),
        Venue::Ftx => Box::new(Ftx::from_env(false)?),
        Venue::FtxUs => Box::new(Ftx::from_env(true)?),
        Venue::Paper => Box::new(PaperExchange::new(paper)),
    };
    Ok(exchange)
}
