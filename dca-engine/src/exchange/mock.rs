use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dca::{
    Account, Exchange, ExchangeError, ExchangeResult, LimitPricer, Order, OrderType,
    PendingTransfer, Product, Ticker,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::{to_decimal, to_f64};

/// One recorded call into the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Ticker(String),
    Product(String),
    FiatAccount(String),
    PendingTransfers(String),
    Deposit {
        currency: String,
        amount: f64,
    },
    CreateOrder {
        symbol: String,
        amount: f64,
        order_type: OrderType,
        /// Price and size returned by the pricer, for limit orders.
        limit: Option<(Decimal, Decimal)>,
    },
    LastPurchaseTime {
        coin: String,
        currency: String,
        since: DateTime<Utc>,
    },
}

#[derive(Debug, Default)]
struct MockState {
    markets: HashMap<String, (f64, f64)>,
    balances: HashMap<String, f64>,
    pending: HashMap<String, Vec<f64>>,
    payout_at: Option<DateTime<Utc>>,
    deposit_error: Option<ExchangeError>,
    last_purchase: Option<DateTime<Utc>>,
    last_purchase_error: Option<ExchangeError>,
    order_failures: HashMap<String, ExchangeError>,
    next_order_id: u64,
    calls: Vec<Call>,
}

/// Scriptable in-memory venue that records every call made against it.
///
/// Symbols are formatted `BASE-QUOTE`. Unknown markets fail with
/// `UnknownSymbol`, unknown currencies with `AccountNotFound`.
#[derive(Debug)]
pub struct MockExchange {
    name: String,
    state: Mutex<MockState>,
}

impl Default for MockExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExchange {
    pub fn new() -> Self {
        Self::named("Coinbase")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a market with its current price and minimum base size.
    pub fn with_market(self, symbol: &str, price: f64, base_min_size: f64) -> Self {
        self.state()
            .markets
            .insert(symbol.to_string(), (price, base_min_size));
        self
    }

    pub fn with_balance(self, currency: &str, available: f64) -> Self {
        self.state()
            .balances
            .insert(currency.to_string(), available);
        self
    }

    pub fn with_pending_transfer(self, currency: &str, amount: f64) -> Self {
        self.state()
            .pending
            .entry(currency.to_string())
            .or_default()
            .push(amount);
        self
    }

    pub fn with_payout_at(self, payout_at: DateTime<Utc>) -> Self {
        self.state().payout_at = Some(payout_at);
        self
    }

    pub fn with_deposit_error(self, err: ExchangeError) -> Self {
        self.state().deposit_error = Some(err);
        self
    }

    pub fn with_last_purchase(self, last: Option<DateTime<Utc>>) -> Self {
        self.state().last_purchase = last;
        self
    }

    pub fn with_last_purchase_error(self, err: ExchangeError) -> Self {
        self.state().last_purchase_error = Some(err);
        self
    }

    pub fn with_order_failure(self, symbol: &str, err: ExchangeError) -> Self {
        self.state().order_failures.insert(symbol.to_string(), err);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// `(currency, amount)` of every deposit requested.
    pub fn deposits(&self) -> Vec<(String, f64)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Deposit { currency, amount } => Some((currency, amount)),
                _ => None,
            })
            .collect()
    }

    /// `(symbol, amount, order_type)` of every order requested.
    pub fn orders(&self) -> Vec<(String, f64, OrderType)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateOrder {
                    symbol,
                    amount,
                    order_type,
                    ..
                } => Some((symbol, amount, order_type)),
                _ => None,
            })
            .collect()
    }

    /// `(price, size)` the pricer produced for every limit order.
    pub fn limit_orders(&self) -> Vec<(Decimal, Decimal)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateOrder { limit, .. } => limit,
                _ => None,
            })
            .collect()
    }

    pub fn last_purchase_queries(&self) -> Vec<(String, String, DateTime<Utc>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::LastPurchaseTime {
                    coin,
                    currency,
                    since,
                } => Some((coin, currency, since)),
                _ => None,
            })
            .collect()
    }

    fn market(&self, symbol: &str) -> ExchangeResult<(f64, f64)> {
        self.state()
            .markets
            .get(symbol)
            .copied()
            .ok_or_else(|| ExchangeError::UnknownSymbol(symbol.to_string()))
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }
}

#[async_trait]
impl Exchange for MockExchange {
    fn name(&self) -> &str {
        &self.name
    }

    fn ticker_symbol(&self, base: &str, quote: &str) -> String {
        format!("{}-{}", base, quote)
    }

    async fn ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        self.record(Call::Ticker(symbol.to_string()));
        let (price, _) = self.market(symbol)?;
        Ok(Ticker::new(price))
    }

    async fn product(&self, symbol: &str) -> ExchangeResult<Product> {
        self.record(Call::Product(symbol.to_string()));
        let (_, min_size) = self.market(symbol)?;
        let (base, quote) = symbol.split_once('-').unwrap_or((symbol, ""));
        Ok(Product::new(base, quote, min_size))
    }

    async fn fiat_account(&self, currency: &str) -> ExchangeResult<Account> {
        self.record(Call::FiatAccount(currency.to_string()));
        self.state()
            .balances
            .get(currency)
            .map(|available| Account::new(*available))
            .ok_or_else(|| ExchangeError::AccountNotFound(currency.to_string()))
    }

    async fn pending_transfers(&self, currency: &str) -> ExchangeResult<Vec<PendingTransfer>> {
        self.record(Call::PendingTransfers(currency.to_string()));
        Ok(self
            .state()
            .pending
            .get(currency)
            .map(|amounts| amounts.iter().map(|a| PendingTransfer::new(*a)).collect())
            .unwrap_or_default())
    }

    async fn deposit(&self, currency: &str, amount: f64) -> ExchangeResult<DateTime<Utc>> {
        self.record(Call::Deposit {
            currency: currency.to_string(),
            amount,
        });
        let state = self.state();
        if let Some(err) = &state.deposit_error {
            return Err(err.clone());
        }
        Ok(state.payout_at.unwrap_or_else(Utc::now))
    }

    async fn create_order(
        &self,
        symbol: &str,
        amount: f64,
        order_type: OrderType,
        pricer: &dyn LimitPricer,
    ) -> ExchangeResult<Order> {
        let limit = match order_type {
            OrderType::Market => None,
            OrderType::Limit => {
                let (ask, _) = self.market(symbol)?;
                Some(pricer.price_and_size(to_decimal(ask), to_decimal(amount)))
            }
        };

        self.record(Call::CreateOrder {
            symbol: symbol.to_string(),
            amount,
            order_type,
            limit,
        });

        let mut state = self.state();
        if let Some(err) = state.order_failures.get(symbol) {
            return Err(err.clone());
        }

        if let Some((price, size)) = limit {
            if to_f64(price * size) > amount {
                return Err(ExchangeError::Rejected(format!(
                    "limit order for {} exceeds budget {:.2}",
                    symbol, amount
                )));
            }
        }

        state.next_order_id += 1;
        Ok(Order::new(state.next_order_id.to_string(), symbol))
    }

    async fn last_purchase_time(
        &self,
        coin: &str,
        currency: &str,
        since: DateTime<Utc>,
    ) -> ExchangeResult<Option<DateTime<Utc>>> {
        self.record(Call::LastPurchaseTime {
            coin: coin.to_string(),
            currency: currency.to_string(),
            since,
        });
        let state = self.state();
        if let Some(err) = &state.last_purchase_error {
            return Err(err.clone());
        }
        Ok(state.last_purchase)
    }
}
