//! Turns `COIN:PERCENT` weights and a fiat budget into per-coin order plans.

use crate::error::{Result, SyncError};
use crate::models::{truncate, Allocation, CoinWeight, OrderPlan, FIAT_PLACES};
use dca::Exchange;
use log::{debug, info};

/// Added on top of the venue minimum when no budget is configured, so the
/// first coin clears its minimum.
const MINIMUM_BUDGET_MARGIN: f64 = 0.1;

/// Cheapest purchase of `symbol` the venue will accept, in quote currency.
pub async fn minimum_purchase<E: Exchange + ?Sized>(exchange: &E, symbol: &str) -> Result<f64> {
    let product = exchange.product(symbol).await?;
    let ticker = exchange.ticker(symbol).await?;
    Ok(product.minimum_purchase(ticker.price))
}

/// Builds the spend plan for one run.
///
/// `budget == 0.0` resolves to the first coin's minimum plus a small margin,
/// and that value then applies to every coin. Fails if any coin's share
/// falls below its venue minimum, or if the weights do not sum to exactly 100.
pub async fn plan_allocation<E: Exchange + ?Sized>(
    exchange: &E,
    coins: &[CoinWeight],
    budget: f64,
    currency: &str,
) -> Result<Allocation> {
    if coins.is_empty() {
        return Err(SyncError::Configuration(
            "at least one coin must be configured".to_string(),
        ));
    }

    let mut budget = budget;
    let mut total = 0u32;
    let mut plans = Vec::with_capacity(coins.len());

    for coin in coins {
        total += coin.percentage();

        let symbol = exchange.ticker_symbol(coin.symbol(), currency);
        let minimum = minimum_purchase(exchange, &symbol).await?;

        if budget == 0.0 {
            budget = minimum + MINIMUM_BUDGET_MARGIN;
            info!(
                "No budget configured, using venue minimum: budget={:.2} coin={}",
                budget,
                coin.symbol()
            );
        }

        let amount = truncate(budget * f64::from(coin.percentage()) / 100.0, FIAT_PLACES);
        debug!(
            "Planned purchase: coin={} symbol={} amount={:.2} minimum={:.2}",
            coin.symbol(),
            symbol,
            amount,
            minimum
        );

        if amount < minimum {
            return Err(SyncError::BelowMinimum {
                venue: exchange.name().to_string(),
                coin: coin.symbol().to_string(),
                minimum,
                amount,
            });
        }

        plans.push(OrderPlan::new(coin.symbol(), symbol, amount));
    }

    if total != 100 {
        return Err(SyncError::InvalidWeights { total });
    }

    Ok(Allocation::new(budget, plans))
}
