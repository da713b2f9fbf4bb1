use clap::Parser;

/// Command line flags. Every value is optional so that anything left out
/// falls back to the config file, `DCA_*` variables, then the defaults.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about = "Recurring crypto purchases on a fixed cadence", long_about = None)]
pub struct Args {
    /// Venue to trade on: coinbase, coinbasev3, gemini, ftx, ftxus or paper
    #[arg(long)]
    pub exchange: Option<String>,

    /// Coin and its share of the budget as SYMBOL:PERCENT. Repeat per coin;
    /// the first one is used to detect the last purchase.
    #[arg(long = "coin", value_name = "SYMBOL:PERCENT")]
    pub coins: Vec<String>,

    /// Purchase cadence, e.g. 12h, 1d or 2w
    #[arg(long)]
    pub every: Option<String>,

    /// Fiat to spend per purchase. 0 buys the smallest amount the venue accepts
    #[arg(long)]
    pub usd: Option<f64>,

    /// Fiat currency to buy with
    #[arg(long)]
    pub currency: Option<String>,

    /// Do nothing before this date (YYYY-MM-DD)
    #[arg(long)]
    pub after: Option<String>,

    /// Do nothing after this date (YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<String>,

    /// Actually deposit and place orders. Without it the run is a dry run
    #[arg(long)]
    pub trade: bool,

    /// Deposit the shortfall from the linked bank account when funds run low
    #[arg(long)]
    pub autofund: bool,

    /// Skip the purchase window check after an interactive confirmation
    #[arg(long)]
    pub force: bool,

    /// market or limit
    #[arg(long)]
    pub order_type: Option<String>,

    /// Percent above the ask used as the limit price
    #[arg(long)]
    pub spread: Option<f64>,

    /// Trading fee percent reserved out of each limit order
    #[arg(long)]
    pub fee: Option<f64>,

    /// TOML settings file
    #[arg(long, default_value = "dca.toml")]
    pub config: String,

    /// Default log filter when RUST_LOG is not set
    #[arg(long)]
    pub log_level: Option<String>,
}
