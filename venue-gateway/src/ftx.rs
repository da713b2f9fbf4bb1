//! FTX and FTX US REST adapter. Both hosts share one API; they differ in
//! host name and auth header prefix.

use crate::auth::{prehash, require_env, sign_hex_sha256};
use crate::http::{self, decimal, flexible_f64, optional_time};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dca::{
    Account, Exchange, ExchangeError, ExchangeResult, LimitPricer, Order, OrderType,
    PendingTransfer, Product, Ticker,
};
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use rust_decimal::prelude::ToPrimitive;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

pub const FTX_URL: &str = "https://ftx.com";
pub const FTX_US_URL: &str = "https://ftx.us";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Market {
    #[serde(default)]
    base_currency: Option<String>,
    #[serde(default)]
    quote_currency: Option<String>,
    #[serde(deserialize_with = "flexible_f64")]
    last: f64,
    #[serde(deserialize_with = "flexible_f64")]
    ask: f64,
    #[serde(deserialize_with = "flexible_f64")]
    min_provide_size: f64,
}

#[derive(Debug, Deserialize)]
struct WalletBalance {
    coin: String,
    #[serde(deserialize_with = "flexible_f64")]
    free: f64,
}

#[derive(Debug, Deserialize)]
struct PlacedOrder {
    id: i64,
    market: String,
}

#[derive(Debug, Deserialize)]
struct Fill {
    side: String,
    #[serde(default, deserialize_with = "optional_time")]
    time: Option<DateTime<Utc>>,
}

pub struct Ftx {
    client: Client,
    base_url: String,
    header_prefix: &'static str,
    name: &'static str,
    key: String,
    secret: String,
}

impl Ftx {
    /// Reads `FTX_KEY` and `FTX_SECRET`. `us` selects the FTX US host.
    pub fn from_env(us: bool) -> ExchangeResult<Self> {
        let key = require_env("FTX_KEY")?;
        let secret = require_env("FTX_SECRET")?;
        Ok(Self::new(key, secret, us))
    }

    pub fn new(key: impl Into<String>, secret: impl Into<String>, us: bool) -> Self {
        let (base_url, header_prefix, name) = if us {
            (FTX_US_URL, "FTXUS", "FTX US")
        } else {
            (FTX_URL, "FTX", "FTX")
        };
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            header_prefix,
            name,
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `path_and_query` is signed as sent, query string included.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path_and_query: &str,
        body: Option<Value>,
    ) -> ExchangeResult<T> {
        let path = format!("/api{}", path_and_query);
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = sign_hex_sha256(
            &self.secret,
            &prehash(&timestamp, method.as_str(), &path, &body),
        )?;

        debug!("{} request: {} {}", self.name, method, path);
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(CONTENT_TYPE, "application/json")
            .header(format!("{}-KEY", self.header_prefix), &self.key)
            .header(format!("{}-SIGN", self.header_prefix), signature)
            .header(format!("{}-TS", self.header_prefix), timestamp);
        if !body.is_empty() {
            request = request.body(body);
        }

        let envelope: Envelope<T> = http::send(request).await?;
        unwrap_envelope(envelope)
    }

    async fn market(&self, symbol: &str) -> ExchangeResult<Market> {
        self.request(Method::GET, &format!("/markets/{}", symbol), None)
            .await
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> ExchangeResult<T> {
    if !envelope.success {
        return Err(ExchangeError::Rejected(
            envelope.error.unwrap_or_else(|| "request failed".to_string()),
        ));
    }
    envelope
        .result
        .ok_or_else(|| ExchangeError::Decode("response has no result".to_string()))
}

fn split_symbol(symbol: &str) -> (String, String) {
    match symbol.split_once('/') {
        Some((base, quote)) => (base.to_string(), quote.to_string()),
        None => (symbol.to_string(), String::new()),
    }
}

/// Fills come newest first.
fn first_buy(fills: &[Fill]) -> Option<DateTime<Utc>> {
    fills
        .iter()
        .filter(|f| f.side == "buy")
        .find_map(|f| f.time)
}

#[async_trait]
impl Exchange for Ftx {
    fn name(&self) -> &str {
        self.name
    }

    fn ticker_symbol(&self, base: &str, quote: &str) -> String {
        format!("{}/{}", base, quote)
    }

    async fn ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        Ok(Ticker::new(self.market(symbol).await?.last))
    }

    async fn product(&self, symbol: &str) -> ExchangeResult<Product> {
        let market = self.market(symbol).await?;
        let (base, quote) = split_symbol(symbol);
        Ok(Product::new(
            market.base_currency.unwrap_or(base),
            market.quote_currency.unwrap_or(quote),
            market.min_provide_size,
        ))
    }

    async fn fiat_account(&self, currency: &str) -> ExchangeResult<Account> {
        let balances: Vec<WalletBalance> =
            self.request(Method::GET, "/wallet/balances", None).await?;
        balances
            .iter()
            .find(|b| b.coin == currency)
            .map(|b| Account::new(b.free))
            .ok_or_else(|| ExchangeError::AccountNotFound(currency.to_string()))
    }

    async fn pending_transfers(&self, _currency: &str) -> ExchangeResult<Vec<PendingTransfer>> {
        Ok(Vec::new())
    }

    async fn deposit(&self, _currency: &str, _amount: f64) -> ExchangeResult<DateTime<Utc>> {
        Err(ExchangeError::unsupported(self.name, "bank deposits"))
    }

    async fn create_order(
        &self,
        symbol: &str,
        amount: f64,
        order_type: OrderType,
        pricer: &dyn LimitPricer,
    ) -> ExchangeResult<Order> {
        // Market orders are sized in the base currency here, not in fiat.
        if order_type == OrderType::Market {
            return Err(ExchangeError::unsupported(self.name, "market orders"));
        }

        let market = self.market(symbol).await?;
        let (price, size) = pricer.price_and_size(decimal(market.ask), decimal(amount));

        let order: PlacedOrder = self
            .request(
                Method::POST,
                "/orders",
                Some(json!({
                    "market": symbol,
                    "side": "buy",
                    "type": "limit",
                    "price": price.to_f64().unwrap_or_default(),
                    "size": size.to_f64().unwrap_or_default(),
                    "clientId": Uuid::new_v4().to_string(),
                })),
            )
            .await?;
        Ok(Order::new(order.id.to_string(), order.market))
    }

    async fn last_purchase_time(
        &self,
        coin: &str,
        currency: &str,
        since: DateTime<Utc>,
    ) -> ExchangeResult<Option<DateTime<Utc>>> {
        let fills: Vec<Fill> = self
            .request(
                Method::GET,
                &format!(
                    "/fills?market={}&start_time={}",
                    self.ticker_symbol(coin, currency),
                    since.timestamp()
                ),
                None,
            )
            .await?;
        Ok(first_buy(&fills))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_symbol_and_names() {
        let ftx = Ftx::new("key", "secret", false);
        let us = Ftx::new("key", "secret", true);
        assert_eq!(ftx.ticker_symbol("BTC", "USD"), "BTC/USD");
        assert_eq!(ftx.name(), "FTX");
        assert_eq!(us.name(), "FTX US");
        assert_eq!(us.header_prefix, "FTXUS");
        assert_eq!(us.base_url, FTX_US_URL);
    }

    #[test]
    fn test_decode_market() {
        let envelope: Envelope<Market> = http::decode(
            r#"{"success": true, "result": {"name": "BTC/USD", "baseCurrency": "BTC", "quoteCurrency": "USD",
                "last": 43000.5, "bid": 42999.0, "ask": 43001.0, "minProvideSize": 0.0001, "sizeIncrement": 0.0001}}"#,
        )
        .unwrap();
        let market = unwrap_envelope(envelope).unwrap();
        assert_eq!(market.last, 43000.5);
        assert_eq!(market.ask, 43001.0);
        assert_eq!(market.min_provide_size, 0.0001);
    }

    #[test]
    fn test_failed_envelope() {
        let envelope: Envelope<Market> =
            http::decode(r#"{"success": false, "error": "No such market: DOGE/USD"}"#).unwrap();
        assert_eq!(
            unwrap_envelope(envelope).unwrap_err(),
            ExchangeError::Rejected("No such market: DOGE/USD".to_string())
        );
    }

    #[test]
    fn test_first_buy() {
        let fills: Vec<Fill> = http::decode(
            r#"[
                {"side": "sell", "time": "2024-02-29T20:00:00+00:00"},
                {"side": "buy", "time": "2024-02-29T18:00:00+00:00"},
                {"side": "buy", "time": "2024-02-28T18:00:00+00:00"}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            first_buy(&fills),
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 18, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_split_symbol() {
        assert_eq!(split_symbol("ETH/USD"), ("ETH".to_string(), "USD".to_string()));
    }

    #[tokio::test]
    async fn test_unsupported_capabilities() {
        let venue = Ftx::new("key", "secret", true);
        let pricer = |ask: rust_decimal::Decimal, fiat: rust_decimal::Decimal| (ask, fiat);
        let err = venue
            .create_order("BTC/USD", 10.0, OrderType::Market, &pricer)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "FTX US does not support market orders");

        let err = venue.deposit("USD", 10.0).await.unwrap_err();
        assert_eq!(err.to_string(), "FTX US does not support bank deposits");
    }
}
