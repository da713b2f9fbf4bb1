use crate::error::ExchangeResult;
use crate::model::{
    account::{Account, PendingTransfer},
    market_data::{Product, Ticker},
    order::{Order, OrderType},
};
use crate::traits::limit::LimitPricer;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Uniform view of a trading venue.
///
/// Every operation is a live query; implementations keep no state the
/// scheduler relies on between runs. Capabilities a venue cannot provide
/// fail with [`ExchangeError::Unsupported`](crate::ExchangeError::Unsupported)
/// instead of silently doing nothing.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Human readable venue name, used in operator-facing messages.
    fn name(&self) -> &str;

    /// Venue specific symbol for a currency pair, e.g. `BTC-USD` or `btcusd`.
    fn ticker_symbol(&self, base: &str, quote: &str) -> String;

    async fn ticker(&self, symbol: &str) -> ExchangeResult<Ticker>;

    async fn product(&self, symbol: &str) -> ExchangeResult<Product>;

    async fn fiat_account(&self, currency: &str) -> ExchangeResult<Account>;

    async fn pending_transfers(&self, currency: &str) -> ExchangeResult<Vec<PendingTransfer>>;

    /// Starts a bank deposit and returns the time the venue expects the
    /// funds to become available.
    async fn deposit(&self, currency: &str, amount: f64) -> ExchangeResult<DateTime<Utc>>;

    /// Places a buy order spending `amount` of the quote currency.
    ///
    /// For [`OrderType::Limit`] the venue looks up its ask and asks `pricer`
    /// for the limit price and size.
    async fn create_order(
        &self,
        symbol: &str,
        amount: f64,
        order_type: OrderType,
        pricer: &dyn LimitPricer,
    ) -> ExchangeResult<Order>;

    /// Time of the most recent completed purchase of `coin` priced in
    /// `currency`, looking no further back than `since`. `None` when there
    /// is no such purchase.
    async fn last_purchase_time(
        &self,
        coin: &str,
        currency: &str,
        since: DateTime<Utc>,
    ) -> ExchangeResult<Option<DateTime<Utc>>>;
}

#[async_trait]
impl<E: Exchange + ?Sized> Exchange for Box<E> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn ticker_symbol(&self, base: &str, quote: &str) -> String {
        (**self).ticker_symbol(base, quote)
    }

    async fn ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        (**self).ticker(symbol).await
    }

    async fn product(&self, symbol: &str) -> ExchangeResult<Product> {
        (**self).product(symbol).await
    }

    async fn fiat_account(&self, currency: &str) -> ExchangeResult<Account> {
        (**self).fiat_account(currency).await
    }

    async fn pending_transfers(&self, currency: &str) -> ExchangeResult<Vec<PendingTransfer>> {
        (**self).pending_transfers(currency).await
    }

    async fn deposit(&self, currency: &str, amount: f64) -> ExchangeResult<DateTime<Utc>> {
        (**self).deposit(currency, amount).await
    }

    async fn create_order(
        &self,
        symbol: &str,
        amount: f64,
        order_type: OrderType,
        pricer: &dyn LimitPricer,
    ) -> ExchangeResult<Order> {
        (**self).create_order(symbol, amount, order_type, pricer).await
    }

    async fn last_purchase_time(
        &self,
        coin: &str,
        currency: &str,
        since: DateTime<Utc>,
    ) -> ExchangeResult<Option<DateTime<Utc>>> {
        (**self).last_purchase_time(coin, currency, since).await
    }
}
