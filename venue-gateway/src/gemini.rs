//! Gemini REST adapter. Only limit orders are supported and bank deposits
//! are not exposed by the API.

use crate::auth::{require_env, sign_gemini_payload};
use crate::http::{self, decimal, flexible_f64};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use dca::{
    Account, Exchange, ExchangeError, ExchangeResult, LimitPricer, Order, OrderType,
    PendingTransfer, Product, Ticker,
};
use log::debug;
use reqwest::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

pub const BASE_URL: &str = "https://api.gemini.com";
const VENUE: &str = "Gemini";

#[derive(Debug, Deserialize)]
struct TickerV2 {
    #[serde(deserialize_with = "flexible_f64")]
    bid: f64,
    #[serde(deserialize_with = "flexible_f64")]
    ask: f64,
}

#[derive(Debug, Deserialize)]
struct SymbolDetails {
    base_currency: String,
    quote_currency: String,
    #[serde(deserialize_with = "flexible_f64")]
    tick_size: f64,
    #[serde(deserialize_with = "flexible_f64")]
    min_order_size: f64,
}

#[derive(Debug, Deserialize)]
struct FundBalance {
    currency: String,
    #[serde(deserialize_with = "flexible_f64")]
    available: f64,
}

#[derive(Debug, Deserialize)]
struct Trade {
    timestamp: i64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct NewOrder {
    order_id: String,
    symbol: String,
}

pub struct Gemini {
    client: Client,
    base_url: String,
    key: String,
    secret: String,
}

impl Gemini {
    /// Reads `GEMINI_KEY` and `GEMINI_SECRET`.
    pub fn from_env() -> ExchangeResult<Self> {
        let key = require_env("GEMINI_KEY")?;
        let secret = require_env("GEMINI_SECRET")?;
        Ok(Self::new(key, secret))
    }

    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Points at `https://api.sandbox.gemini.com` or a local stand-in.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn public<T: DeserializeOwned>(&self, path: &str) -> ExchangeResult<T> {
        debug!("Gemini request: GET {}", path);
        http::send(self.client.get(format!("{}{}", self.base_url, path))).await
    }

    /// Private endpoints take no body; the signed payload travels in headers.
    async fn private<T: DeserializeOwned>(&self, path: &str, params: Value) -> ExchangeResult<T> {
        let payload = payload(path, Utc::now().timestamp_millis(), params);
        let (encoded, signature) = sign_gemini_payload(&self.secret, &payload)?;

        debug!("Gemini request: POST {}", path);
        let request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header(CONTENT_TYPE, "text/plain")
            .header(CONTENT_LENGTH, "0")
            .header(CACHE_CONTROL, "no-cache")
            .header("X-GEMINI-APIKEY", &self.key)
            .header("X-GEMINI-PAYLOAD", encoded)
            .header("X-GEMINI-SIGNATURE", signature);

        http::send(request).await
    }

    async fn symbol_details(&self, symbol: &str) -> ExchangeResult<SymbolDetails> {
        self.public(&format!("/v1/symbols/details/{}", wire_symbol(symbol)))
            .await
    }

    async fn raw_ticker(&self, symbol: &str) -> ExchangeResult<TickerV2> {
        self.public(&format!("/v2/ticker/{}", wire_symbol(symbol)))
            .await
    }
}

fn wire_symbol(symbol: &str) -> String {
    symbol.to_lowercase()
}

fn payload(path: &str, nonce: i64, params: Value) -> String {
    let mut body = json!({ "request": path, "nonce": nonce });
    if let (Some(target), Value::Object(extra)) = (body.as_object_mut(), params) {
        target.extend(extra);
    }
    body.to_string()
}

/// Decimal places allowed by a tick size, 0 for ticks of 1 or more.
fn tick_precision(tick_size: f64) -> u32 {
    if tick_size >= 1.0 || tick_size <= 0.0 {
        return 0;
    }
    decimal(tick_size).normalize().scale()
}

fn truncate_size(size: Decimal, tick_size: f64) -> Decimal {
    size.round_dp_with_strategy(tick_precision(tick_size), RoundingStrategy::ToZero)
}

/// Trades come newest first.
fn last_buy(trades: &[Trade]) -> Option<DateTime<Utc>> {
    trades
        .iter()
        .find(|t| t.kind.eq_ignore_ascii_case("buy"))
        .and_then(|t| Utc.timestamp_opt(t.timestamp, 0).single())
}

#[async_trait]
impl Exchange for Gemini {
    fn name(&self) -> &str {
        VENUE
    }

    fn ticker_symbol(&self, base: &str, quote: &str) -> String {
        format!("{}{}", base, quote)
    }

    async fn ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        Ok(Ticker::new(self.raw_ticker(symbol).await?.bid))
    }

    async fn product(&self, symbol: &str) -> ExchangeResult<Product> {
        let details = self.symbol_details(symbol).await?;
        Ok(Product::new(
            details.base_currency,
            details.quote_currency,
            details.min_order_size,
        ))
    }

    async fn fiat_account(&self, currency: &str) -> ExchangeResult<Account> {
        let balances: Vec<FundBalance> = self.private("/v1/balances", json!({})).await?;
        balances
            .iter()
            .find(|b| b.currency.eq_ignore_ascii_case(currency))
            .map(|b| Account::new(b.available))
            .ok_or_else(|| ExchangeError::AccountNotFound(currency.to_string()))
    }

    async fn pending_transfers(&self, _currency: &str) -> ExchangeResult<Vec<PendingTransfer>> {
        Ok(Vec::new())
    }

    async fn deposit(&self, _currency: &str, _amount: f64) -> ExchangeResult<DateTime<Utc>> {
        Err(ExchangeError::unsupported(VENUE, "bank deposits"))
    }

    async fn create_order(
        &self,
        symbol: &str,
        amount: f64,
        order_type: OrderType,
        pricer: &dyn LimitPricer,
    ) -> ExchangeResult<Order> {
        if order_type == OrderType::Market {
            return Err(ExchangeError::unsupported(VENUE, "market orders"));
        }

        let details = self.symbol_details(symbol).await?;
        let ticker = self.raw_ticker(symbol).await?;
        let (price, size) = pricer.price_and_size(decimal(ticker.ask), decimal(amount));
        let size = truncate_size(size, details.tick_size);

        let order: NewOrder = self
            .private(
                "/v1/order/new",
                json!({
                    "client_order_id": Uuid::new_v4().to_string(),
                    "symbol": wire_symbol(symbol),
                    "amount": size.to_string(),
                    "price": price.to_string(),
                    "side": "buy",
                    "type": "exchange limit",
                }),
            )
            .await?;
        Ok(Order::new(order.order_id, order.symbol.to_uppercase()))
    }

    async fn last_purchase_time(
        &self,
        coin: &str,
        currency: &str,
        since: DateTime<Utc>,
    ) -> ExchangeResult<Option<DateTime<Utc>>> {
        let trades: Vec<Trade> = self
            .private(
                "/v1/mytrades",
                json!({
                    "symbol": wire_symbol(&self.ticker_symbol(coin, currency)),
                    "timestamp": since.timestamp(),
                }),
            )
            .await?;
        Ok(last_buy(&trades))
    }
}
