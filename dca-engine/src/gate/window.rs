use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use dca::Exchange;
use log::info;

/// Whether the purchase window for `marker_coin` has elapsed.
///
/// Only the marker coin's trade history is consulted; the other coins of the
/// batch are assumed to have been bought in the same run. Cadence is not
/// tracked per coin.
pub async fn should_purchase<E: Exchange + ?Sized>(
    exchange: &E,
    marker_coin: &str,
    currency: &str,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<bool> {
    let since = now - window;
    let last = exchange
        .last_purchase_time(marker_coin, currency, since)
        .await?;

    let Some(last) = last else {
        info!("No previous purchase found: coin={}", marker_coin);
        return Ok(true);
    };

    let elapsed = now - last;
    info!(
        "Time since last purchase: coin={} hours={:.2}",
        marker_coin,
        elapsed.num_seconds() as f64 / 3600.0
    );

    Ok(elapsed >= window)
}
