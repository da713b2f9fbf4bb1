//! Coinbase Exchange (formerly Pro) REST adapter.

use crate::auth::{prehash, require_env, sign_base64_sha256};
use crate::http::{self, decimal, flexible_f64, optional_time};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dca::{
    Account, Exchange, ExchangeError, ExchangeResult, LimitPricer, Order, OrderType,
    PendingTransfer, Product, Ticker,
};
use log::{debug, info};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

pub const BASE_URL: &str = "https://api.exchange.coinbase.com";

/// Transfers pending for longer than this are considered stuck and ignored.
const STUCK_TRANSFER_HOURS: i64 = 24;

/// Response header carrying the cursor of the next, older page.
const CURSOR_HEADER: &str = "CB-AFTER";
/// Largest page the listing endpoints return.
const PAGE_LIMIT: u32 = 100;
/// Upper bound on pages followed for one listing.
const MAX_PAGES: usize = 50;

#[derive(Debug, Deserialize)]
struct CoinbaseTicker {
    #[serde(deserialize_with = "flexible_f64")]
    price: f64,
    #[serde(deserialize_with = "flexible_f64")]
    ask: f64,
}

#[derive(Debug, Deserialize)]
struct CoinbaseProduct {
    base_currency: String,
    quote_currency: String,
    #[serde(default, deserialize_with = "flexible_f64")]
    base_min_size: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct CoinbaseAccount {
    id: String,
    currency: String,
    #[serde(deserialize_with = "flexible_f64")]
    available: f64,
}

#[derive(Debug, Deserialize)]
struct CoinbaseTransfer {
    #[serde(deserialize_with = "flexible_f64")]
    amount: f64,
    #[serde(default, deserialize_with = "optional_time")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_time")]
    canceled_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_time")]
    processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct PaymentMethod {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct DepositResponse {
    #[serde(default, deserialize_with = "optional_time")]
    payout_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct CoinbaseOrder {
    id: String,
    product_id: String,
}

#[derive(Debug, Deserialize)]
struct LedgerEntry {
    #[serde(default, deserialize_with = "optional_time")]
    created_at: Option<DateTime<Utc>>,
    #[serde(rename = "type")]
    kind: String,
}

pub struct Coinbase {
    client: Client,
    base_url: String,
    key: String,
    secret: String,
    passphrase: String,
}

impl Coinbase {
    /// Reads `COINBASE_SECRET`, `COINBASE_KEY` and `COINBASE_PASSPHRASE`.
    pub fn from_env() -> ExchangeResult<Self> {
        let secret = require_env("COINBASE_SECRET")?;
        let key = require_env("COINBASE_KEY")?;
        let passphrase = require_env("COINBASE_PASSPHRASE")?;
        Ok(Self::new(key, secret, passphrase))
    }

    pub fn new(
        key: impl Into<String>,
        secret: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
            key: key.into(),
            secret: secret.into(),
            passphrase: passphrase.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `path` is signed as sent, query string included.
    fn signed(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ExchangeResult<RequestBuilder> {
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_base64_sha256(
            &self.secret,
            &prehash(&timestamp, method.as_str(), path, &body),
        )?;

        debug!("Coinbase request: {} {}", method, path);
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, "dca")
            .header("CB-ACCESS-KEY", &self.key)
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", timestamp)
            .header("CB-ACCESS-PASSPHRASE", &self.passphrase);
        if !body.is_empty() {
            request = request.body(body);
        }
        Ok(request)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> ExchangeResult<T> {
        http::send(self.signed(method, path, body)?).await
    }

    /// Walks a newest-first listing page by page until a page reaches back
    /// before `floor` or there is nothing older.
    async fn list_since<T, F>(
        &self,
        path: &str,
        floor: DateTime<Utc>,
        created_at: F,
    ) -> ExchangeResult<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> Option<DateTime<Utc>>,
    {
        let mut items = Vec::new();
        let mut after: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let request = self.signed(Method::GET, &page_path(path, after.as_deref()), None)?;
            let (page, cursor): (Vec<T>, _) = http::send_paged(request, CURSOR_HEADER).await?;

            let oldest = page.last().and_then(|item| created_at(item));
            after = next_cursor(cursor, page.is_empty(), oldest, floor);
            items.extend(page);

            if after.is_none() {
                return Ok(items);
            }
        }

        debug!("Coinbase listing truncated: path={} pages={}", path, MAX_PAGES);
        Ok(items)
    }

    async fn account_for(&self, currency: &str) -> ExchangeResult<CoinbaseAccount> {
        let accounts: Vec<CoinbaseAccount> = self.request(Method::GET, "/accounts", None).await?;
        accounts
            .into_iter()
            .find(|a| a.currency == currency)
            .ok_or_else(|| ExchangeError::AccountNotFound(currency.to_string()))
    }

    async fn raw_ticker(&self, symbol: &str) -> ExchangeResult<CoinbaseTicker> {
        self.request(Method::GET, &format!("/products/{}/ticker", symbol), None)
            .await
    }
}

/// Transfers that are still on their way: not processed, not cancelled and
/// created within the last day.
fn pending_from(transfers: &[CoinbaseTransfer], now: DateTime<Utc>) -> Vec<PendingTransfer> {
    let stuck_before = now - Duration::hours(STUCK_TRANSFER_HOURS);
    transfers
        .iter()
        .filter(|t| t.processed_at.is_none() && t.canceled_at.is_none())
        .filter(|t| t.created_at.map_or(true, |created| created >= stuck_before))
        .map(|t| PendingTransfer::new(t.amount))
        .collect()
}

fn page_path(path: &str, after: Option<&str>) -> String {
    match after {
        Some(cursor) => format!("{}?limit={}&after={}", path, PAGE_LIMIT, cursor),
        None => format!("{}?limit={}", path, PAGE_LIMIT),
    }
}

/// Cursor to follow next, or `None` once the listing is exhausted or the
/// page already reaches back past `floor`.
fn next_cursor(
    cursor: Option<String>,
    page_empty: bool,
    oldest: Option<DateTime<Utc>>,
    floor: DateTime<Utc>,
) -> Option<String> {
    if page_empty || oldest.map_or(false, |t| t < floor) {
        return None;
    }
    cursor.filter(|c| !c.is_empty())
}

fn latest_match(entries: &[LedgerEntry], since: DateTime<Utc>) -> Option<DateTime<Utc>> {
    entries
        .iter()
        .filter(|e| e.kind == "match")
        .filter_map(|e| e.created_at)
        .filter(|t| *t >= since)
        .max()
}

fn market_order_body(symbol: &str, amount: f64) -> Value {
    json!({
        "type": "market",
        "side": "buy",
        "product_id": symbol,
        "funds": format!("{:.2}", amount),
    })
}

fn limit_order_body(symbol: &str, ask: f64, amount: f64, pricer: &dyn LimitPricer) -> Value {
    let (price, size) = pricer.price_and_size(decimal(ask), decimal(amount));
    json!({
        "type": "limit",
        "side": "buy",
        "product_id": symbol,
        "price": price.normalize().to_string(),
        "size": size.normalize().to_string(),
    })
}

#[async_trait]
impl Exchange for Coinbase {
    fn name(&self) -> &str {
        "Coinbase"
    }

    fn ticker_symbol(&self, base: &str, quote: &str) -> String {
        format!("{}-{}", base, quote)
    }

    async fn ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        Ok(Ticker::new(self.raw_ticker(symbol).await?.price))
    }

    async fn product(&self, symbol: &str) -> ExchangeResult<Product> {
        let product: CoinbaseProduct = self
            .request(Method::GET, &format!("/products/{}", symbol), None)
            .await?;
        Ok(Product::new(
            product.base_currency,
            product.quote_currency,
            product.base_min_size,
        ))
    }

    async fn fiat_account(&self, currency: &str) -> ExchangeResult<Account> {
        Ok(Account::new(self.account_for(currency).await?.available))
    }

    async fn pending_transfers(&self, currency: &str) -> ExchangeResult<Vec<PendingTransfer>> {
        let account = self.account_for(currency).await?;
        let now = Utc::now();
        let transfers: Vec<CoinbaseTransfer> = self
            .list_since(
                &format!("/accounts/{}/transfers", account.id),
                now - Duration::hours(STUCK_TRANSFER_HOURS),
                |t: &CoinbaseTransfer| t.created_at,
            )
            .await?;
        Ok(pending_from(&transfers, now))
    }

    async fn deposit(&self, currency: &str, amount: f64) -> ExchangeResult<DateTime<Utc>> {
        let methods: Vec<PaymentMethod> =
            self.request(Method::GET, "/payment-methods", None).await?;
        let bank = methods
            .iter()
            .find(|m| m.kind == "ach_bank_account")
            .ok_or(ExchangeError::NoBankAccount)?;

        let response: DepositResponse = self
            .request(
                Method::POST,
                "/deposits/payment-method",
                Some(json!({
                    "amount": format!("{:.2}", amount),
                    "currency": currency,
                    "payment_method_id": bank.id,
                })),
            )
            .await?;

        let payout_at = response
            .payout_at
            .ok_or_else(|| ExchangeError::Decode("deposit response has no payout_at".to_string()))?;
        info!(
            "Coinbase deposit initiated: currency={} amount={:.2} payout_at={}",
            currency, amount, payout_at
        );
        Ok(payout_at)
    }

    async fn create_order(
        &self,
        symbol: &str,
        amount: f64,
        order_type: OrderType,
        pricer: &dyn LimitPricer,
    ) -> ExchangeResult<Order> {
        let body = match order_type {
            OrderType::Market => market_order_body(symbol, amount),
            OrderType::Limit => {
                let ticker = self.raw_ticker(symbol).await?;
                limit_order_body(symbol, ticker.ask, amount, pricer)
            }
        };

        let order: CoinbaseOrder = self.request(Method::POST, "/orders", Some(body)).await?;
        Ok(Order::new(order.id, order.product_id))
    }

    async fn last_purchase_time(
        &self,
        coin: &str,
        _currency: &str,
        since: DateTime<Utc>,
    ) -> ExchangeResult<Option<DateTime<Utc>>> {
        let account = self.account_for(coin).await?;
        let entries: Vec<LedgerEntry> = self
            .list_since(
                &format!("/accounts/{}/ledger", account.id),
                since,
                |e: &LedgerEntry| e.created_at,
            )
            .await?;
        Ok(latest_match(&entries, since))
    }
}
