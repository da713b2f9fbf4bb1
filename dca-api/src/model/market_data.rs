use serde::{Deserialize, Serialize};

/// Current price of a trading symbol. Venues report either the best ask
/// or the last trade here, whichever they expose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub price: f64,
}

impl Ticker {
    pub fn new(price: f64) -> Self {
        Self { price }
    }
}

/// Trading rules of a currency pair.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Product {
    pub base_currency: String,
    pub quote_currency: String,
    /// Smallest order size accepted, in base currency units.
    pub base_min_size: f64,
}

impl Product {
    pub fn new(
        base_currency: impl Into<String>,
        quote_currency: impl Into<String>,
        base_min_size: f64,
    ) -> Self {
        Self {
            base_currency: base_currency.into(),
            quote_currency: quote_currency.into(),
            base_min_size,
        }
    }

    /// Cheapest purchase the venue will accept, expressed in the quote
    /// currency. Venues with tiny minimum sizes still enforce a $1 floor.
    pub fn minimum_purchase(&self, price: f64) -> f64 {
        (self.base_min_size * price).max(1.0)
    }
}
