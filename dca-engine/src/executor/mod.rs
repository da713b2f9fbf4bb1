pub mod limit;

pub use limit::LimitOrderParams;

use crate::models::OrderPlan;
use dca::{Exchange, ExchangeError, Order, OrderType};
use log::{info, warn};
use thiserror::Error;

/// Why a single coin's purchase did not happen.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// Dry run: the order was intentionally not sent.
    #[error("Skipping because trades are not enabled")]
    SkippedForDebug,

    #[error(transparent)]
    Venue(#[from] ExchangeError),
}

/// A coin whose purchase failed while its siblings went ahead.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinFailure {
    pub coin: String,
    pub symbol: String,
    pub error: ExecutionError,
}

/// Places one buy order per plan.
#[derive(Debug, Clone, Copy)]
pub struct OrderExecutor {
    order_type: OrderType,
    limit: LimitOrderParams,
    debug: bool,
}

impl OrderExecutor {
    pub fn new(order_type: OrderType, limit: LimitOrderParams, debug: bool) -> Self {
        Self {
            order_type,
            limit,
            debug,
        }
    }

    pub async fn execute<E: Exchange + ?Sized>(
        &self,
        exchange: &E,
        plan: &OrderPlan,
    ) -> Result<Order, ExecutionError> {
        if self.debug {
            return Err(ExecutionError::SkippedForDebug);
        }

        let order = exchange
            .create_order(plan.symbol(), plan.amount(), self.order_type, &self.limit)
            .await?;

        info!(
            "Placed order: symbol={} orderId={} type={} amount={:.2}",
            plan.symbol(),
            order.order_id(),
            self.order_type,
            plan.amount()
        );
        Ok(order)
    }

    /// Runs every plan in order. A failing coin is logged and recorded; the
    /// remaining coins are still attempted.
    pub async fn execute_all<E: Exchange + ?Sized>(
        &self,
        exchange: &E,
        plans: &[OrderPlan],
    ) -> (Vec<Order>, Vec<CoinFailure>) {
        let mut placed = Vec::with_capacity(plans.len());
        let mut failures = Vec::new();

        for plan in plans {
            match self.execute(exchange, plan).await {
                Ok(order) => placed.push(order),
                Err(error) => {
                    warn!("{}: {}", plan.symbol(), error);
                    failures.push(CoinFailure {
                        coin: plan.coin().to_string(),
                        symbol: plan.symbol().to_string(),
                        error,
                    });
                }
            }
        }

        (placed, failures)
    }
}
