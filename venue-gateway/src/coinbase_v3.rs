//! Coinbase Advanced Trade (v3 brokerage API) adapter. Bank deposits still
//! go through the v2 API.

use crate::auth::{prehash, require_env, sign_hex_sha256};
use crate::http::{self, decimal, flexible_f64, optional_time};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use dca::{
    Account, Exchange, ExchangeError, ExchangeResult, LimitPricer, Order, OrderType,
    PendingTransfer, Product, Ticker,
};
use log::{debug, info};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use rust_decimal::RoundingStrategy;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

pub const BASE_URL: &str = "https://api.coinbase.com";
const BROKERAGE: &str = "/api/v3/brokerage";

#[derive(Debug, Deserialize)]
struct MarketTrades {
    #[serde(deserialize_with = "flexible_f64")]
    best_ask: f64,
}

#[derive(Debug, Deserialize)]
struct V3Product {
    base_currency_id: String,
    quote_currency_id: String,
    #[serde(default, deserialize_with = "flexible_f64")]
    base_min_size: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct Balance {
    #[serde(deserialize_with = "flexible_f64")]
    value: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct V3Account {
    uuid: String,
    currency: String,
    available_balance: Balance,
}

#[derive(Debug, Deserialize)]
struct AccountList {
    accounts: Vec<V3Account>,
}

#[derive(Debug, Default, Deserialize)]
struct SuccessResponse {
    #[serde(default)]
    order_id: String,
    #[serde(default)]
    product_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    success: bool,
    #[serde(default)]
    failure_reason: String,
    #[serde(default)]
    order_id: String,
    #[serde(default)]
    success_response: Option<SuccessResponse>,
    #[serde(default)]
    error_response: Option<ErrorResponse>,
}

#[derive(Debug, Deserialize)]
struct HistoricalOrder {
    #[serde(default, deserialize_with = "optional_time")]
    created_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct OrderList {
    #[serde(default)]
    orders: Vec<HistoricalOrder>,
}

#[derive(Debug, Deserialize)]
struct V2PaymentMethod {
    id: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct V2Data<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct V2Deposit {
    #[serde(default, deserialize_with = "optional_time")]
    payout_at: Option<DateTime<Utc>>,
}

pub struct CoinbaseV3 {
    client: Client,
    base_url: String,
    key: String,
    secret: String,
    /// Accounts by currency, fetched once per adapter.
    accounts: Mutex<HashMap<String, V3Account>>,
}

impl CoinbaseV3 {
    /// Reads `COINBASE_SECRET` and `COINBASE_KEY`.
    pub fn from_env() -> ExchangeResult<Self> {
        let secret = require_env("COINBASE_SECRET")?;
        let key = require_env("COINBASE_KEY")?;
        Ok(Self::new(key, secret))
    }

    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: BASE_URL.to_string(),
            key: key.into(),
            secret: secret.into(),
            accounts: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// `path` is signed without its query string.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> ExchangeResult<T> {
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_hex_sha256(
            &self.secret,
            &prehash(&timestamp, method.as_str(), path, &body),
        )?;

        debug!("Coinbase v3 request: {} {}", method, path);
        let mut request = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(CONTENT_TYPE, "application/json")
            .header("CB-ACCESS-KEY", &self.key)
            .header("CB-ACCESS-SIGN", signature)
            .header("CB-ACCESS-TIMESTAMP", timestamp);
        if !query.is_empty() {
            request = request.query(query);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        http::send(request).await
    }

    async fn account_for(&self, currency: &str) -> ExchangeResult<V3Account> {
        if let Some(account) = self.cached_account(currency) {
            return Ok(account);
        }

        let list: AccountList = self
            .request(
                Method::GET,
                &format!("{}/accounts", BROKERAGE),
                &[("limit", "100".to_string())],
                None,
            )
            .await?;

        let mut cache = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        for account in list.accounts {
            cache.insert(account.currency.clone(), account);
        }
        cache
            .get(currency)
            .cloned()
            .ok_or_else(|| ExchangeError::AccountNotFound(currency.to_string()))
    }

    fn cached_account(&self, currency: &str) -> Option<V3Account> {
        self.accounts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(currency)
            .cloned()
    }

    async fn best_ask(&self, symbol: &str) -> ExchangeResult<f64> {
        let trades: MarketTrades = self
            .request(
                Method::GET,
                &format!("{}/products/{}/ticker", BROKERAGE, symbol),
                &[("limit", "10".to_string())],
                None,
            )
            .await?;
        Ok(trades.best_ask)
    }
}

/// Market orders spend a quote amount rounded to cents.
fn market_order_body(client_order_id: &str, symbol: &str, amount: f64) -> Value {
    let quote_size = decimal(amount).round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    json!({
        "client_order_id": client_order_id,
        "product_id": symbol,
        "side": "BUY",
        "order_configuration": {
            "market_market_ioc": { "quote_size": format!("{:.2}", quote_size) }
        }
    })
}

fn limit_order_body(
    client_order_id: &str,
    symbol: &str,
    ask: f64,
    amount: f64,
    pricer: &dyn LimitPricer,
) -> Value {
    let (price, size) = pricer.price_and_size(decimal(ask), decimal(amount));
    json!({
        "client_order_id": client_order_id,
        "product_id": symbol,
        "side": "BUY",
        "order_configuration": {
            "limit_limit_gtc": {
                "base_size": size.to_string(),
                "limit_price": price.to_string(),
            }
        }
    })
}

fn order_result(response: CreateOrderResponse, symbol: &str) -> ExchangeResult<Order> {
    if !response.success {
        let detail = response
            .error_response
            .map(|e| if e.message.is_empty() { e.error } else { e.message })
            .unwrap_or_default();
        return Err(ExchangeError::Rejected(format!(
            "order failed with {}, {}",
            response.failure_reason, detail
        )));
    }

    let success = response.success_response.unwrap_or_default();
    let order_id = if success.order_id.is_empty() {
        response.order_id
    } else {
        success.order_id
    };
    let product_id = if success.product_id.is_empty() {
        symbol.to_string()
    } else {
        success.product_id
    };
    Ok(Order::new(order_id, product_id))
}

fn latest_fill(orders: &OrderList, since: DateTime<Utc>) -> Option<DateTime<Utc>> {
    orders
        .orders
        .iter()
        .filter_map(|o| o.created_time)
        .filter(|t| *t >= since)
        .max()
}

#[async_trait]
impl Exchange for CoinbaseV3 {
    fn name(&self) -> &str {
        "Coinbase"
    }

    fn ticker_symbol(&self, base: &str, quote: &str) -> String {
        format!("{}-{}", base, quote)
    }

    async fn ticker(&self, symbol: &str) -> ExchangeResult<Ticker> {
        Ok(Ticker::new(self.best_ask(symbol).await?))
    }

    async fn product(&self, symbol: &str) -> ExchangeResult<Product> {
        let product: V3Product = self
            .request(
                Method::GET,
                &format!("{}/products/{}", BROKERAGE, symbol),
                &[],
                None,
            )
            .await?;
        Ok(Product::new(
            product.base_currency_id,
            product.quote_currency_id,
            product.base_min_size,
        ))
    }

    async fn fiat_account(&self, currency: &str) -> ExchangeResult<Account> {
        let account = self.account_for(currency).await?;
        Ok(Account::new(account.available_balance.value))
    }

    /// The brokerage API has no transfer listing.
    async fn pending_transfers(&self, _currency: &str) -> ExchangeResult<Vec<PendingTransfer>> {
        Ok(Vec::new())
    }

    async fn deposit(&self, currency: &str, amount: f64) -> ExchangeResult<DateTime<Utc>> {
        let account = self.account_for(currency).await?;

        let methods: V2Data<Vec<V2PaymentMethod>> = self
            .request(Method::GET, "/v2/payment-methods", &[], None)
            .await?;
        let bank = methods
            .data
            .iter()
            .find(|m| m.kind == "ach_bank_account")
            .ok_or(ExchangeError::NoBankAccount)?;

        let deposit: V2Data<V2Deposit> = self
            .request(
                Method::POST,
                &format!("/v2/accounts/{}/deposits", account.uuid),
                &[],
                Some(json!({
                    "amount": format!("{:.2}", amount),
                    "currency": currency,
                    "payment_method": bank.id,
                })),
            )
            .await?;

        let payout_at = deposit
            .data
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
        let client_order_id = Uuid::new_v4().to_string();
        let body = match order_type {
            OrderType::Market => market_order_body(&client_order_id, symbol, amount),
            OrderType::Limit => {
                let ask = self.best_ask(symbol).await?;
                limit_order_body(&client_order_id, symbol, ask, amount, pricer)
            }
        };

        let response: CreateOrderResponse = self
            .request(Method::POST, &format!("{}/orders", BROKERAGE), &[], Some(body))
            .await?;
        order_result(response, symbol)
    }

    async fn last_purchase_time(
        &self,
        coin: &str,
        currency: &str,
        since: DateTime<Utc>,
    ) -> ExchangeResult<Option<DateTime<Utc>>> {
        let orders: OrderList = self
            .request(
                Method::GET,
                &format!("{}/orders/historical/batch", BROKERAGE),
                &[
                    ("product_id", self.ticker_symbol(coin, currency)),
                    ("order_status", "FILLED".to_string()),
                    (
                        "start_date",
                        since.to_rfc3339_opts(SecondsFormat::Secs, true),
                    ),
                ],
                None,
            )
            .await?;
        Ok(latest_fill(&orders, since))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    #[test]
    fn test_market_order_quote_size() {
        let body = market_order_body("id-1", "BTC-USD", 10.0);
        assert_eq!(
            body["order_configuration"]["market_market_ioc"]["quote_size"],
            "10.00"
        );
        assert_eq!(body["side"], "BUY");
        assert_eq!(body["client_order_id"], "id-1");
    }

    #[test]
    fn test_limit_order_sizes() {
        let pricer = |_ask: Decimal, _fiat: Decimal| {
            (Decimal::new(4342704, 2), Decimal::new(230271, 8))
        };
        let body = limit_order_body("id-2", "BTC-USD", 43210.99, 100.0, &pricer);
        let config = &body["order_configuration"]["limit_limit_gtc"];
        assert_eq!(config["base_size"], "0.00230271");
        assert_eq!(config["limit_price"], "43427.04");
    }

    #[test]
    fn test_failed_order_is_rejected() {
        let response: CreateOrderResponse = http::decode(
            r#"{"success": false, "failure_reason": "UNKNOWN_FAILURE_REASON",
                "error_response": {"error": "INSUFFICIENT_FUND", "message": "Insufficient balance in source account"}}"#,
        )
        .unwrap();

        let err = order_result(response, "BTC-USD").unwrap_err();
        assert_eq!(
            err,
            ExchangeError::Rejected(
                "order failed with UNKNOWN_FAILURE_REASON, Insufficient balance in source account"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_successful_order() {
        let response: CreateOrderResponse = http::decode(
            r#"{"success": true, "order_id": "abc",
                "success_response": {"order_id": "abc", "product_id": "ETH-USD", "side": "BUY"}}"#,
        )
        .unwrap();

        let order = order_result(response, "ETH-USD").unwrap();
        assert_eq!(order.order_id(), "abc");
        assert_eq!(order.symbol(), "ETH-USD");
    }

    #[test]
    fn test_decode_accounts() {
        let list: AccountList = http::decode(
            r#"{"accounts": [{"uuid": "u-1", "name": "USD Wallet", "currency": "USD",
                "available_balance": {"value": "125.50", "currency": "USD"},
                "hold": {"value": "0", "currency": "USD"}}], "has_next": false}"#,
        )
        .unwrap();
        assert_eq!(list.accounts[0].uuid, "u-1");
        assert_eq!(list.accounts[0].available_balance.value, 125.5);
    }

    #[test]
    fn test_latest_fill() {
        let orders: OrderList = http::decode(
            r#"{"orders": [
                {"order_id": "2", "created_time": "2024-02-29T18:00:00.123Z"},
                {"order_id": "1", "created_time": "2024-02-20T18:00:00Z"}
            ]}"#,
        )
        .unwrap();
        let since = Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap();
        let latest = latest_fill(&orders, since).unwrap();
        assert_eq!(latest.date_naive().to_string(), "2024-02-29");

        assert_eq!(latest_fill(&OrderList { orders: vec![] }, since), None);
    }

    #[tokio::test]
    async fn test_no_pending_transfers() {
        let venue = CoinbaseV3::new("key", "secret");
        assert!(venue.pending_transfers("USD").await.unwrap().is_empty());
    }
}
