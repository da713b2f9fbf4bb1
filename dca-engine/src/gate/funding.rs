use crate::clock::Clock;
use crate::error::{Result, SyncError};
use crate::models::{to_decimal, to_f64, truncate_decimal, FIAT_PLACES};
use chrono::{DateTime, Duration, Utc};
use dca::Exchange;
use log::{info, warn};

/// Deposits settle no earlier than this many seconds after the venue's
/// payout time.
pub const SETTLEMENT_GRACE_SECS: i64 = 60;

/// Waits of at least this many seconds are left to the next scheduled run.
pub const DEFER_THRESHOLD_SECS: i64 = 120;

/// What the scheduler should do before placing orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingDecision {
    /// Funds are available (or the deposit was skipped in a dry run).
    Proceed,
    /// A deposit is about to settle; block for this long, then proceed.
    Wait(std::time::Duration),
    /// A deposit was started but settles too late for this run.
    Defer { settles_in: Duration },
}

/// Makes sure enough fiat is available, topping up by bank deposit when
/// auto-funding is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct FundingGate {
    auto_fund: bool,
    debug: bool,
}

impl FundingGate {
    pub fn new(auto_fund: bool, debug: bool) -> Self {
        Self { auto_fund, debug }
    }

    pub async fn ensure_funds<E: Exchange + ?Sized>(
        &self,
        exchange: &E,
        required: f64,
        currency: &str,
        clock: &dyn Clock,
    ) -> Result<FundingDecision> {
        let account = exchange.fiat_account(currency).await?;
        if account.available >= required {
            return Ok(FundingDecision::Proceed);
        }

        let shortfall = shortfall(required, account.available);
        if shortfall <= 0.0 {
            return Ok(FundingDecision::Proceed);
        }

        info!(
            "Insufficient funds: currency={} available={:.2} required={:.2} needed={:.2}",
            currency, account.available, required, shortfall
        );

        let pending = exchange.pending_transfers(currency).await?;
        if !pending.is_empty() {
            let inbound: f64 = pending.iter().map(|t| t.amount).sum();
            warn!(
                "Deposit is in progress: transfers={} amount={:.2}",
                pending.len(),
                inbound
            );
            return Err(SyncError::TransfersSettling);
        }

        if !self.auto_fund {
            return Err(SyncError::InsufficientFunds);
        }

        if self.debug {
            info!("Deposit skipped for debug: amount={:.2}", shortfall);
            return Ok(FundingDecision::Proceed);
        }

        info!(
            "Creating a transfer request: currency={} amount={:.2}",
            currency, shortfall
        );
        let payout_at = exchange.deposit(currency, shortfall).await?;
        info!("Deposit initiated successfully: payout={}", payout_at);

        Ok(settlement_decision(payout_at, clock.now()))
    }
}

/// Fiat missing to cover `required`. Both sides are cut to whole cents
/// first, so leftover fractions of a cent on the account never count.
pub fn shortfall(required: f64, available: f64) -> f64 {
    let required = truncate_decimal(to_decimal(required), FIAT_PLACES);
    let available = truncate_decimal(to_decimal(available), FIAT_PLACES);
    to_f64(required - available)
}

fn settlement_decision(payout_at: DateTime<Utc>, now: DateTime<Utc>) -> FundingDecision {
    let wait = payout_at + Duration::seconds(SETTLEMENT_GRACE_SECS) - now;

    if wait < Duration::seconds(DEFER_THRESHOLD_SECS) {
        let wait = wait.to_std().unwrap_or_default();
        info!("Sleeping until deposit settles: seconds={}", wait.as_secs());
        FundingDecision::Wait(wait)
    } else {
        info!(
            "Deposit money will be available later, exiting now: minutes={}",
            wait.num_minutes()
        );
        FundingDecision::Defer { settles_in: wait }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::exchange::mock::{Call, MockExchange};
    use chrono::TimeZone;
    use dca::ExchangeError;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn clock() -> ManualClock {
        ManualClock::new(now())
    }

    #[test]
    fn test_shortfall_truncates() {
        assert_eq!(shortfall(50.0, 25.0), 25.0);
        assert_eq!(shortfall(50.0, 24.996), 25.01);
        assert_eq!(shortfall(50.0, 25.004), 25.0);
        assert_eq!(shortfall(50.0, 49.999), 0.01);
        assert_eq!(shortfall(50.004, 50.001), 0.0);
        assert_eq!(shortfall(100.1, 0.0), 100.1);
    }

    #[test]
    fn test_settlement_decision_threshold() {
        // payout now: wait = 1 minute
        assert_eq!(
            settlement_decision(now(), now()),
            FundingDecision::Wait(std::time::Duration::from_secs(60))
        );
        // payout already passed: no waiting at all
        assert_eq!(
            settlement_decision(now() - Duration::hours(1), now()),
            FundingDecision::Wait(std::time::Duration::ZERO)
        );
        // payout in one minute: wait = 2 minutes, which defers
        assert_eq!(
            settlement_decision(now() + Duration::minutes(1), now()),
            FundingDecision::Defer {
                settles_in: Duration::minutes(2)
            }
        );
    }

    #[tokio::test]
    async fn test_enough_balance_proceeds_without_transfer_lookup() {
        let exchange = MockExchange::new().with_balance("USD", 50.0);
        let decision = FundingGate::new(true, false)
            .ensure_funds(&exchange, 50.0, "USD", &clock())
            .await
            .unwrap();
        assert_eq!(decision, FundingDecision::Proceed);
        assert_eq!(exchange.calls(), vec![Call::FiatAccount("USD".into())]);
    }

    #[tokio::test]
    async fn test_pending_transfer_blocks_new_deposit() {
        let exchange = MockExchange::new()
            .with_balance("USD", 25.0)
            .with_pending_transfer("USD", 25.0);
        let err = FundingGate::new(true, false)
            .ensure_funds(&exchange, 50.0, "USD", &clock())
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::TransfersSettling);
        assert!(exchange.deposits().is_empty());
    }

    #[tokio::test]
    async fn test_autofund_disabled_fails() {
        let exchange = MockExchange::new().with_balance("USD", 25.0);
        let err = FundingGate::new(false, false)
            .ensure_funds(&exchange, 50.0, "USD", &clock())
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::InsufficientFunds);
    }

    #[tokio::test]
    async fn test_deposits_shortfall_and_waits_for_imminent_payout() {
        let exchange = MockExchange::new()
            .with_balance("USD", 25.0)
            .with_payout_at(now());
        let decision = FundingGate::new(true, false)
            .ensure_funds(&exchange, 50.0, "USD", &clock())
            .await
            .unwrap();
        assert_eq!(
            decision,
            FundingDecision::Wait(std::time::Duration::from_secs(60))
        );
        assert_eq!(exchange.deposits(), vec![("USD".to_string(), 25.0)]);
    }

    #[tokio::test]
    async fn test_slow_payout_defers() {
        let exchange = MockExchange::new()
            .with_balance("USD", 0.0)
            .with_payout_at(now() + Duration::days(3));
        let decision = FundingGate::new(true, false)
            .ensure_funds(&exchange, 50.0, "USD", &clock())
            .await
            .unwrap();
        assert!(matches!(decision, FundingDecision::Defer { .. }));
        assert_eq!(exchange.deposits(), vec![("USD".to_string(), 50.0)]);
    }

    #[tokio::test]
    async fn test_missing_bank_account_is_surfaced() {
        let exchange = MockExchange::new()
            .with_balance("USD", 0.0)
            .with_deposit_error(ExchangeError::NoBankAccount);
        let err = FundingGate::new(true, false)
            .ensure_funds(&exchange, 50.0, "USD", &clock())
            .await
            .unwrap_err();
        assert_eq!(err, SyncError::NoBankAccount);
        assert_eq!(err.to_string(), "No ACH bank account found on this account");
    }

    #[tokio::test]
    async fn test_debug_skips_deposit() {
        let exchange = MockExchange::new().with_balance("USD", 25.0);
        let decision = FundingGate::new(true, true)
            .ensure_funds(&exchange, 50.0, "USD", &clock())
            .await
            .unwrap();
        assert_eq!(decision, FundingDecision::Proceed);
        assert!(exchange.deposits().is_empty());
    }

    #[tokio::test]
    async fn test_sub_cent_gap_deposits_one_cent() {
        let exchange = MockExchange::new()
            .with_balance("USD", 49.999)
            .with_payout_at(now());
        FundingGate::new(true, false)
            .ensure_funds(&exchange, 50.0, "USD", &clock())
            .await
            .unwrap();
        assert_eq!(exchange.deposits(), vec![("USD".to_string(), 0.01)]);
    }

    #[tokio::test]
    async fn test_fraction_of_a_cent_short_needs_no_deposit() {
        let exchange = MockExchange::new().with_balance("USD", 50.001);
        let decision = FundingGate::new(true, false)
            .ensure_funds(&exchange, 50.004, "USD", &clock())
            .await
            .unwrap();
        assert_eq!(decision, FundingDecision::Proceed);
        assert!(exchange.deposits().is_empty());
    }

    #[tokio::test]
    async fn test_wait_measured_from_clock_after_deposit() {
        let exchange = MockExchange::new()
            .with_balance("USD", 25.0)
            .with_payout_at(now());
        let later = ManualClock::new(now() + Duration::seconds(30));
        let decision = FundingGate::new(true, false)
            .ensure_funds(&exchange, 50.0, "USD", &later)
            .await
            .unwrap();
        assert_eq!(
            decision,
            FundingDecision::Wait(std::time::Duration::from_secs(30))
        );
    }
}
