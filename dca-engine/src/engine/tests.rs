use super::*;
use crate::clock::ManualClock;
use crate::exchange::mock::{Call, MockExchange};
use crate::executor::ExecutionError;
use crate::models::{CoinWeight, OrderPlan};
use chrono::{DateTime, TimeZone, Utc};
use dca::{ExchangeError, OrderType};
use std::sync::atomic::{AtomicUsize, Ordering};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn request() -> SyncRequest {
    // run every 24 hrs
    SyncRequest::new(vec![CoinWeight::new("BTC", 100)], Duration::hours(24))
        .with_usd(50.0)
        .with_currency("USD")
        .with_order_type(OrderType::Market)
}

fn btc_only() -> Allocation {
    Allocation::new(50.0, vec![OrderPlan::new("BTC", "btcusd", 50.0)])
}

fn create_test_scheduler(
    exchange: MockExchange,
    request: SyncRequest,
    debug: bool,
) -> (Scheduler<MockExchange>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(now()));
    let scheduler = Scheduler::with_allocation(exchange, request, btc_only(), debug)
        .with_clock(clock.clone())
        .with_confirmation(|_: &str| -> bool { panic!("confirmation must not be requested") });
    (scheduler, clock)
}

#[tokio::test]
async fn test_sync_when_deadline_passed() {
    let req = request().with_until(Some(now() - Duration::days(1)));
    let (scheduler, _) = create_test_scheduler(MockExchange::new(), req, false);

    let err = scheduler.sync().await.unwrap_err();

    assert_eq!(err.to_string(), "Deadline has passed, not taking any action");
    assert!(scheduler.exchange().calls().is_empty());
}

#[tokio::test]
async fn test_sync_when_not_started_yet() {
    let after = now() + Duration::days(1);
    let req = request().with_after(Some(after));
    let (scheduler, _) = create_test_scheduler(MockExchange::new(), req, false);

    let err = scheduler.sync().await.unwrap_err();

    assert_eq!(
        err.to_string(),
        format!("Configured to start after {}, not taking any action", after)
    );
    assert!(scheduler.exchange().calls().is_empty());
}

#[tokio::test]
async fn test_sync_at_exact_after_bound_does_not_start() {
    let req = request().with_after(Some(now()));
    let (scheduler, _) = create_test_scheduler(MockExchange::new(), req, false);

    let err = scheduler.sync().await.unwrap_err();

    assert_eq!(err, SyncError::NotStarted { after: now() });
}

#[tokio::test]
async fn test_sync_when_recent_purchase() {
    // last run was 12 hours ago
    let exchange = MockExchange::new().with_last_purchase(Some(now() - Duration::hours(12)));
    let (scheduler, _) = create_test_scheduler(exchange, request(), false);

    let err = scheduler.sync().await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "Detected a recent purchase, waiting for next purchase window"
    );
    assert_eq!(
        scheduler.exchange().last_purchase_queries(),
        vec![(
            "BTC".to_string(),
            "USD".to_string(),
            now() - Duration::hours(24)
        )]
    );
}

#[tokio::test]
async fn test_sync_proceeds_when_window_elapsed() {
    let exchange = MockExchange::new()
        .with_last_purchase(Some(now() - Duration::hours(48)))
        .with_balance("USD", 50.0);
    let (scheduler, _) = create_test_scheduler(exchange, request(), false);

    let report = scheduler.sync().await.unwrap();

    assert_eq!(report.placed().len(), 1);
    assert_eq!(
        scheduler.exchange().orders(),
        vec![("btcusd".to_string(), 50.0, OrderType::Market)]
    );
}

#[tokio::test]
async fn test_sync_surfaces_window_lookup_error() {
    let exchange = MockExchange::new()
        .with_last_purchase_error(ExchangeError::Transport("some error".into()));
    let (scheduler, _) = create_test_scheduler(exchange, request(), false);

    let err = scheduler.sync().await.unwrap_err();

    assert_eq!(
        err,
        SyncError::Venue(ExchangeError::Transport("some error".into()))
    );
}

#[tokio::test]
async fn test_sync_when_successful() {
    let exchange = MockExchange::new()
        .with_balance("USD", 25.0)
        .with_payout_at(now());
    let req = request().with_auto_fund(true);
    let (scheduler, clock) = create_test_scheduler(exchange, req, false);

    let report = scheduler.sync().await.unwrap();

    let calls = scheduler.exchange().calls();
    assert_eq!(
        calls,
        vec![
            Call::LastPurchaseTime {
                coin: "BTC".into(),
                currency: "USD".into(),
                since: now() - Duration::hours(24),
            },
            Call::FiatAccount("USD".into()),
            Call::PendingTransfers("USD".into()),
            Call::Deposit {
                currency: "USD".into(),
                amount: 25.0,
            },
            Call::CreateOrder {
                symbol: "btcusd".into(),
                amount: 50.0,
                order_type: OrderType::Market,
                limit: None,
            },
        ]
    );
    assert_eq!(report.placed()[0].symbol(), "btcusd");
    assert!(report.failures().is_empty());
    // payout now + 1 minute grace
    assert_eq!(clock.sleeps(), vec![std::time::Duration::from_secs(60)]);
}

#[tokio::test]
async fn test_sync_defers_when_deposit_settles_later() {
    let exchange = MockExchange::new()
        .with_balance("USD", 25.0)
        .with_payout_at(now() + Duration::days(2));
    let req = request().with_auto_fund(true);
    let (scheduler, clock) = create_test_scheduler(exchange, req, false);

    let report = scheduler.sync().await.unwrap();

    assert!(matches!(report, SyncReport::Deferred { .. }));
    assert_eq!(scheduler.exchange().deposits(), vec![("USD".into(), 25.0)]);
    assert!(scheduler.exchange().orders().is_empty());
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_sync_when_not_sufficient_balance_and_autofund_is_off() {
    let exchange = MockExchange::new().with_balance("USD", 25.0);
    let (scheduler, _) = create_test_scheduler(exchange, request(), false);

    let err = scheduler.sync().await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "No sufficient amount for trade and autofund is disabled. Deposit money to proceed"
    );
    assert!(scheduler.exchange().orders().is_empty());
}

#[tokio::test]
async fn test_sync_when_transfers_settling() {
    let exchange = MockExchange::new()
        .with_balance("USD", 25.0)
        .with_pending_transfer("USD", 25.0);
    let req = request().with_auto_fund(true);
    let (scheduler, _) = create_test_scheduler(exchange, req, false);

    let err = scheduler.sync().await.unwrap_err();

    assert_eq!(err, SyncError::TransfersSettling);
    assert!(scheduler.exchange().deposits().is_empty());
}

#[tokio::test]
async fn test_sync_should_ask_for_confirmation_when_force_is_on() {
    let req = request().with_force(true);

    // when rejected
    let (scheduler, _) = create_test_scheduler(MockExchange::new(), req.clone(), false);
    let scheduler = scheduler.with_confirmation(|_: &str| false);

    let err = scheduler.sync().await.unwrap_err();

    assert_eq!(err.to_string(), "User rejected the trade");
    assert!(scheduler.exchange().calls().is_empty());

    // when approved
    let asked = Arc::new(AtomicUsize::new(0));
    let counter = asked.clone();
    let exchange = MockExchange::new().with_balance("USD", 50.0);
    let (scheduler, _) = create_test_scheduler(exchange, req, false);
    let scheduler = scheduler.with_confirmation(move |prompt: &str| {
        assert_eq!(prompt, FORCE_PROMPT);
        counter.fetch_add(1, Ordering::SeqCst);
        true
    });

    let report = scheduler.sync().await.unwrap();

    assert_eq!(asked.load(Ordering::SeqCst), 1);
    assert_eq!(report.placed().len(), 1);
    assert!(scheduler.exchange().last_purchase_queries().is_empty());
}

#[tokio::test]
async fn test_sync_when_debug_is_on() {
    let exchange = MockExchange::new().with_balance("USD", 25.0);
    let req = request().with_auto_fund(true);
    let (scheduler, clock) = create_test_scheduler(exchange, req, true);

    let report = scheduler.sync().await.unwrap();

    assert!(report.placed().is_empty());
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.failures()[0].error, ExecutionError::SkippedForDebug);
    assert!(scheduler.exchange().deposits().is_empty());
    assert!(scheduler.exchange().orders().is_empty());
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_sync_partial_failure_is_still_success() {
    let exchange = MockExchange::new()
        .with_balance("USD", 100.0)
        .with_order_failure("BTC-USD", ExchangeError::Rejected("insufficient funds".into()));
    let allocation = Allocation::new(
        100.0,
        vec![
            OrderPlan::new("BTC", "BTC-USD", 60.0),
            OrderPlan::new("ETH", "ETH-USD", 40.0),
        ],
    );
    let clock = Arc::new(ManualClock::new(now()));
    let scheduler = Scheduler::with_allocation(exchange, request().with_usd(100.0), allocation, false)
        .with_clock(clock);

    let report = scheduler.sync().await.unwrap();

    assert_eq!(report.placed().len(), 1);
    assert_eq!(report.placed()[0].symbol(), "ETH-USD");
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.failures()[0].symbol, "BTC-USD");
}

#[tokio::test]
async fn test_new_plans_allocation_before_syncing() {
    let exchange = MockExchange::new()
        .with_market("BTC-USD", 1000.0, 0.001)
        .with_market("ETH-USD", 10.0, 0.5)
        .with_balance("USD", 50.0);
    let req = SyncRequest::new(
        vec![CoinWeight::new("BTC", 50), CoinWeight::new("ETH", 50)],
        Duration::hours(24),
    )
    .with_usd(50.0);

    let scheduler = Scheduler::new(exchange, req, false)
        .await
        .unwrap()
        .with_clock(Arc::new(ManualClock::new(now())));

    assert_eq!(scheduler.allocation().marker_coin(), Some("BTC"));
    scheduler.sync().await.unwrap();
    assert_eq!(
        scheduler.exchange().orders(),
        vec![
            ("BTC-USD".to_string(), 25.0, OrderType::Market),
            ("ETH-USD".to_string(), 25.0, OrderType::Market),
        ]
    );
}
