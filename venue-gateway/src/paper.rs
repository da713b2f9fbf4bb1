use crate::http::decimal;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dca::{
    Account, Exchange, ExchangeError, ExchangeResult, LimitPricer, Order, OrderType,
    PendingTransfer, Product, Ticker,
};
use log::info;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Starting state of the simulated venue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperConfig {
    balance: f64,
    price: f64,
    min_size: f64,
}

impl PaperConfig {
    pub fn new(balance: f64, price: f64, min_size: f64) -> Self {
        Self {
            balance,
            price,
            min_size,
        }
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn min_size(&self) -> f64 {
        self.min_size
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self::new(1000.0, 100.0, 0.0001)
    }
}

#[derive(Debug, Default)]
struct PaperState {
    cash: f64,
    holdings: HashMap<String, f64>,
    last_purchase: HashMap<String, DateTime<Utc>>,
}

/// In-process venue: every coin trades at one fixed price, deposits land
/// instantly and orders fill in full. Nothing survives the process.
#[derive(Debug)]
pub struct PaperExchange {
    config: PaperConfig,
    state: Mutex<PaperState>,
}

impl PaperExchange {
    pub fn new(config: PaperConfig) -> Self {
        Self {
            config,
            state: Mutex::new(PaperState {
                cash: config.balance(),
                ..PaperState::default()
            }),
        }
    }

    pub fn cash(&self) -> f64 {
        self.lock().cash
    }

    /// Units of `coin` bought so far.
    pub fn holding(&self, coin: &str) -> f64 {
        self.lock().holdings.get(coin).copied().unwrap_or(0.0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn base_of(symbol: &str) -> &str {
    symbol.split('-').next().unwrap_or(symbol)
}

#[async_trait]
impl Exchange for PaperExchange {
    fn name(&self) -> &str {
        "Paper"
    }

    fn ticker_symbol(&self, base: &str, quote: &str) -> String {
        format!("{}-{}", base, quote)
    }

    async fn ticker(&self, _symbol: &str) -> ExchangeResult<Ticker> {
        Ok(Ticker::new(self.config.price()))
    }

    async fn product(&self, symbol: &str) -> ExchangeResult<Product> {
        match symbol.split_once('-') {
            Some((base, quote)) if !base.is_empty() && !quote.is_empty() => {
                Ok(Product::new(base, quote, self.config.min_size()))
            }
            _ => Err(ExchangeError::UnknownSymbol(symbol.to_string())),
        }
    }

    async fn fiat_account(&self, _currency: &str) -> ExchangeResult<Account> {
        Ok(Account::new(self.cash()))
    }

    async fn pending_transfers(&self, _currency: &str) -> ExchangeResult<Vec<PendingTransfer>> {
        Ok(Vec::new())
    }

    async fn deposit(&self, currency: &str, amount: f64) -> ExchangeResult<DateTime<Utc>> {
        self.lock().cash += amount;
        info!("Paper deposit: currency={} amount={:.2}", currency, amount);
        Ok(Utc::now())
    }

    async fn create_order(
        &self,
        symbol: &str,
        amount: f64,
        order_type: OrderType,
        pricer: &dyn LimitPricer,
    ) -> ExchangeResult<Order> {
        let price = self.config.price();
        if price <= 0.0 {
            return Err(ExchangeError::Rejected(format!("no price for {}", symbol)));
        }

        let (cost, size) = match order_type {
            OrderType::Market => (amount, amount / price),
            OrderType::Limit => {
                let (limit, size) = pricer.price_and_size(decimal(price), decimal(amount));
                let cost = (limit * size).to_f64().unwrap_or_default();
                (cost, size.to_f64().unwrap_or_default())
            }
        };

        let mut state = self.lock();
        if cost > state.cash {
            return Err(ExchangeError::Rejected(format!(
                "insufficient funds: need {:.2}, have {:.2}",
                cost, state.cash
            )));
        }

        let coin = base_of(symbol).to_string();
        state.cash -= cost;
        *state.holdings.entry(coin.clone()).or_insert(0.0) += size;
        state.last_purchase.insert(coin, Utc::now());

        Ok(Order::new(Uuid::new_v4().to_string(), symbol))
    }

    async fn last_purchase_time(
        &self,
        coin: &str,
        _currency: &str,
        since: DateTime<Utc>,
    ) -> ExchangeResult<Option<DateTime<Utc>>> {
        Ok(self
            .lock()
            .last_purchase
            .get(coin)
            .copied()
            .filter(|t| *t >= since))
    }
}
