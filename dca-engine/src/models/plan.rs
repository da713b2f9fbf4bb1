use serde::{Deserialize, Serialize};

/// Spend planned for one coin in the current run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlan {
    coin: String,
    symbol: String,
    amount: f64,
}

impl OrderPlan {
    pub fn new(coin: impl Into<String>, symbol: impl Into<String>, amount: f64) -> Self {
        Self {
            coin: coin.into(),
            symbol: symbol.into(),
            amount,
        }
    }

    pub fn coin(&self) -> &str {
        &self.coin
    }

    /// Venue trading symbol, e.g. `BTC-USD`.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Fiat to spend, already truncated to cents.
    pub fn amount(&self) -> f64 {
        self.amount
    }
}

/// Output of the allocation planner: the resolved budget and one plan per
/// coin, in the order the coins were configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    budget: f64,
    plans: Vec<OrderPlan>,
}

impl Allocation {
    pub fn new(budget: f64, plans: Vec<OrderPlan>) -> Self {
        Self { budget, plans }
    }

    /// Total fiat the run needs. Equals the configured budget, or the
    /// computed minimum when none was configured.
    pub fn budget(&self) -> f64 {
        self.budget
    }

    pub fn plans(&self) -> &[OrderPlan] {
        &self.plans
    }

    /// Coin whose trade history stands in for the whole batch when checking
    /// the purchase window.
    pub fn marker_coin(&self) -> Option<&str> {
        self.plans.first().map(|p| p.coin())
    }
}
