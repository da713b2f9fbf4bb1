use super::args::Args;
use crate::error::SyncError;
use crate::models::{parse_cadence, parse_date, CoinWeight, SyncRequest, DEFAULT_CURRENCY, DEFAULT_SPREAD};
use config::{Config, Environment, File};
use dca::OrderType;
use serde::Deserialize;

/// `coins` is a list in TOML but a single comma separated string when it
/// comes from `DCA_COINS`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CoinList {
    Many(Vec<String>),
    One(String),
}

impl Default for CoinList {
    fn default() -> Self {
        CoinList::Many(Vec::new())
    }
}

impl CoinList {
    pub fn entries(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            CoinList::Many(items) => items.iter().map(String::as_str).collect(),
            CoinList::One(item) => item.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Fully resolved run settings: defaults, then the TOML file, then `DCA_*`
/// environment variables, then command line flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub exchange: String,
    pub coins: CoinList,
    pub every: Option<String>,
    pub usd: f64,
    pub currency: String,
    pub after: Option<String>,
    pub until: Option<String>,
    pub trade: bool,
    pub autofund: bool,
    pub force: bool,
    pub order_type: String,
    pub spread: f64,
    pub fee: f64,
    pub log_level: String,

    // Paper venue only
    pub paper_balance: f64,
    pub paper_price: f64,
    pub paper_min_size: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exchange: "coinbase".to_string(),
            coins: CoinList::default(),
            every: None,
            usd: 0.0,
            currency: DEFAULT_CURRENCY.to_string(),
            after: None,
            until: None,
            trade: false,
            autofund: false,
            force: false,
            order_type: OrderType::Market.to_string(),
            spread: DEFAULT_SPREAD,
            fee: 0.0,
            log_level: "info".to_string(),
            paper_balance: 1000.0,
            paper_price: 100.0,
            paper_min_size: 0.0001,
        }
    }
}

impl Settings {
    /// Reads the config file named by `--config` (if it exists) and the
    /// environment, then lays the given flags on top.
    pub fn load(args: &Args) -> Result<Self, SyncError> {
        let settings: Settings = Config::builder()
            .add_source(File::with_name(&args.config).required(false))
            .add_source(Environment::with_prefix("DCA"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| SyncError::Configuration(format!("invalid configuration: {}", e)))?;

        Ok(settings.merge_args(args))
    }

    /// Flags that were given win. Switches can only turn a setting on.
    pub fn merge_args(mut self, args: &Args) -> Self {
        if let Some(exchange) = &args.exchange {
            self.exchange = exchange.clone();
        }
        if !args.coins.is_empty() {
            self.coins = CoinList::Many(args.coins.clone());
        }
        if args.every.is_some() {
            self.every = args.every.clone();
        }
        if let Some(usd) = args.usd {
            self.usd = usd;
        }
        if let Some(currency) = &args.currency {
            self.currency = currency.clone();
        }
        if args.after.is_some() {
            self.after = args.after.clone();
        }
        if args.until.is_some() {
            self.until = args.until.clone();
        }
        self.trade |= args.trade;
        self.autofund |= args.autofund;
        self.force |= args.force;
        if let Some(order_type) = &args.order_type {
            self.order_type = order_type.clone();
        }
        if let Some(spread) = args.spread {
            self.spread = spread;
        }
        if let Some(fee) = args.fee {
            self.fee = fee;
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        self
    }

    /// Dry runs skip deposits and orders.
    pub fn debug(&self) -> bool {
        !self.trade
    }

    pub fn to_request(&self) -> Result<SyncRequest, SyncError> {
        if self.coins.is_empty() {
            return Err(SyncError::Configuration(
                "at least one --coin is required".to_string(),
            ));
        }
        let coins = self
            .coins
            .entries()
            .iter()
            .map(|c| c.parse::<CoinWeight>())
            .collect::<Result<Vec<_>, _>>()?;

        let every = self
            .every
            .as_deref()
            .ok_or_else(|| SyncError::Configuration("--every is required".to_string()))
            .and_then(parse_cadence)?;

        let after = self.after.as_deref().map(parse_date).transpose()?;
        let until = self.until.as_deref().map(parse_date).transpose()?;

        let order_type = self
            .order_type
            .parse::<OrderType>()
            .map_err(SyncError::Configuration)?;

        if self.usd < 0.0 {
            return Err(SyncError::Configuration(
                "--usd must not be negative".to_string(),
            ));
        }

        if !(0.0..100.0).contains(&self.fee) {
            return Err(SyncError::Configuration(
                "--fee must be at least 0 and below 100".to_string(),
            ));
        }

        if self.spread < 0.0 {
            return Err(SyncError::Configuration(
                "--spread must not be negative".to_string(),
            ));
        }

        Ok(SyncRequest::new(coins, every)
            .with_usd(self.usd)
            .with_currency(self.currency.to_uppercase())
            .with_after(after)
            .with_until(until)
            .with_auto_fund(self.autofund)
            .with_force(self.force)
            .with_order_type(order_type)
            .with_order_spread(self.spread)
            .with_fee(self.fee))
    }
}
