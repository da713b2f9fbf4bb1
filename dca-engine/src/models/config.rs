use super::coin::CoinWeight;
use chrono::{DateTime, Duration, Utc};
use dca::OrderType;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_SPREAD: f64 = 1.0;

/// Everything one scheduler run needs to know. Built once from the CLI and
/// config file, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncRequest {
    /// Fiat to spend per purchase window. Zero means "the smallest amount
    /// the venue accepts".
    usd: f64,
    coins: Vec<CoinWeight>,
    /// Minimum time between two purchases.
    every: Duration,
    after: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    auto_fund: bool,
    force: bool,
    order_type: OrderType,
    /// Percent above the ask used as the limit price.
    order_spread: f64,
    /// Trading fee percent reserved out of each limit order.
    fee: f64,
    currency: String,
}

impl SyncRequest {
    pub fn new(coins: Vec<CoinWeight>, every: Duration) -> Self {
        Self {
            usd: 0.0,
            coins,
            every,
            after: None,
            until: None,
            auto_fund: false,
            force: false,
            order_type: OrderType::Market,
            order_spread: DEFAULT_SPREAD,
            fee: 0.0,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    pub fn with_usd(mut self, usd: f64) -> Self {
        self.usd = usd;
        self
    }

    pub fn with_after(mut self, after: Option<DateTime<Utc>>) -> Self {
        self.after = after;
        self
    }

    pub fn with_until(mut self, until: Option<DateTime<Utc>>) -> Self {
        self.until = until;
        self
    }

    pub fn with_auto_fund(mut self, auto_fund: bool) -> Self {
        self.auto_fund = auto_fund;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    pub fn with_order_spread(mut self, spread: f64) -> Self {
        self.order_spread = spread;
        self
    }

    pub fn with_fee(mut self, fee: f64) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn usd(&self) -> f64 {
        self.usd
    }

    pub fn coins(&self) -> &[CoinWeight] {
        &self.coins
    }

    pub fn every(&self) -> Duration {
        self.every
    }

    pub fn after(&self) -> Option<DateTime<Utc>> {
        self.after
    }

    pub fn until(&self) -> Option<DateTime<Utc>> {
        self.until
    }

    pub fn auto_fund(&self) -> bool {
        self.auto_fund
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn order_spread(&self) -> f64 {
        self.order_spread
    }

    pub fn fee(&self) -> f64 {
        self.fee
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}
