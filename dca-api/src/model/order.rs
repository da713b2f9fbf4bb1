use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
        }
    }
}

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            other => Err(format!("unknown order type '{}', expected market or limit", other)),
        }
    }
}

/// An order accepted by the venue. Write-once: venues hand it back after
/// placement and nothing mutates it afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    order_id: String,
    symbol: String,
}

impl Order {
    pub fn new(order_id: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            symbol: symbol.into(),
        }
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}
