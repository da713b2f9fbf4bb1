use crate::clock::{Clock, SystemClock};
use crate::confirm::{Confirmation, ConsoleConfirmation};
use crate::error::{Result, SyncError};
use crate::executor::{CoinFailure, LimitOrderParams, OrderExecutor};
use crate::gate::{should_purchase, FundingDecision, FundingGate};
use crate::models::{Allocation, OrderPlan, SyncRequest};
use crate::planner::plan_allocation;
use chrono::Duration;
use dca::{Exchange, Order};
use log::{info, warn};
use std::sync::Arc;

pub const FORCE_PROMPT: &str = "Force method is used proceed?";

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncReport {
    /// Every coin was attempted. `failures` lists the coins that did not
    /// go through; a partially successful run is still a successful run.
    Completed {
        placed: Vec<Order>,
        failures: Vec<CoinFailure>,
    },
    /// A deposit was started but settles later; nothing was bought. The next
    /// scheduled run picks up from here.
    Deferred { settles_in: Duration },
}

impl SyncReport {
    pub fn placed(&self) -> &[Order] {
        match self {
            SyncReport::Completed { placed, .. } => placed,
            SyncReport::Deferred { .. } => &[],
        }
    }

    pub fn failures(&self) -> &[CoinFailure] {
        match self {
            SyncReport::Completed { failures, .. } => failures,
            SyncReport::Deferred { .. } => &[],
        }
    }
}

/// One dollar-cost-averaging pass over a venue.
///
/// Holds no state between runs: every gate is re-evaluated against the
/// venue on each [`sync`](Scheduler::sync). The window gate infers the
/// last purchase from the marker coin (the first configured coin) only.
pub struct Scheduler<E: Exchange> {
    exchange: E,
    request: SyncRequest,
    allocation: Allocation,
    debug: bool,
    clock: Arc<dyn Clock>,
    confirmation: Box<dyn Confirmation>,
}

impl<E: Exchange> Scheduler<E> {
    /// Plans the allocation against live venue data and fails fast on bad
    /// weights or below-minimum amounts.
    ///
    /// `debug` turns the run into a dry run: no deposits, no orders.
    pub async fn new(exchange: E, request: SyncRequest, debug: bool) -> Result<Self> {
        let allocation = plan_allocation(
            &exchange,
            request.coins(),
            request.usd(),
            request.currency(),
        )
        .await?;

        Ok(Self::with_allocation(exchange, request, allocation, debug))
    }

    /// Uses an allocation that was planned elsewhere.
    pub fn with_allocation(
        exchange: E,
        request: SyncRequest,
        allocation: Allocation,
        debug: bool,
    ) -> Self {
        Self {
            exchange,
            request,
            allocation,
            debug,
            clock: Arc::new(SystemClock),
            confirmation: Box::new(ConsoleConfirmation),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_confirmation(mut self, confirmation: impl Confirmation + 'static) -> Self {
        self.confirmation = Box::new(confirmation);
        self
    }

    pub fn request(&self) -> &SyncRequest {
        &self.request
    }

    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    pub fn plans(&self) -> &[OrderPlan] {
        self.allocation.plans()
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Runs the gates in order (validity window, purchase window or
    /// confirmation, funding) and then buys every planned coin.
    pub async fn sync(&self) -> Result<SyncReport> {
        let req = &self.request;
        let now = self.clock.now();

        if let Some(until) = req.until() {
            if now > until {
                return Err(SyncError::DeadlinePassed);
            }
        }

        if let Some(after) = req.after() {
            if now <= after {
                return Err(SyncError::NotStarted { after });
            }
        }

        info!(
            "Dollar cost averaging: {}={:.2} every={}h until={}",
            req.currency(),
            self.allocation.budget(),
            req.every().num_hours(),
            req.until()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        if req.force() {
            if !self.confirmation.confirm(FORCE_PROMPT) {
                return Err(SyncError::Declined);
            }
        } else {
            let marker = self.allocation.marker_coin().ok_or_else(|| {
                SyncError::Configuration("no coins planned for this run".to_string())
            })?;

            if !should_purchase(&self.exchange, marker, req.currency(), req.every(), now).await? {
                return Err(SyncError::WindowNotElapsed);
            }
        }

        let gate = FundingGate::new(req.auto_fund(), self.debug);
        match gate
            .ensure_funds(
                &self.exchange,
                self.allocation.budget(),
                req.currency(),
                self.clock.as_ref(),
            )
            .await?
        {
            FundingDecision::Proceed => {}
            FundingDecision::Wait(wait) => self.clock.sleep(wait).await,
            FundingDecision::Defer { settles_in } => {
                return Ok(SyncReport::Deferred { settles_in });
            }
        }

        info!(
            "Placing orders: coins={} currency={} amount={:.2}",
            self.plans()
                .iter()
                .map(|p| format!("{}={:.2}", p.coin(), p.amount()))
                .collect::<Vec<_>>()
                .join(","),
            req.currency(),
            self.allocation.budget()
        );

        let executor = OrderExecutor::new(
            req.order_type(),
            LimitOrderParams::new(req.order_spread(), req.fee()),
            self.debug,
        );
        let (placed, failures) = executor.execute_all(&self.exchange, self.plans()).await;

        if !failures.is_empty() {
            warn!(
                "Run finished with failures: placed={} failed={}",
                placed.len(),
                failures.len()
            );
        }

        Ok(SyncReport::Completed { placed, failures })
    }
}

#[cfg(test)]
mod tests;
