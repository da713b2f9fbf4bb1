use anyhow::Result;
use chrono::{Duration, Utc};
use dca::OrderType;
use dca_engine::clock::ManualClock;
use dca_engine::{CoinWeight, ExecutionError, Scheduler, SyncError, SyncReport, SyncRequest};
use std::sync::Arc;
use venue_gateway::{PaperConfig, PaperExchange};

fn request(usd: f64) -> SyncRequest {
    SyncRequest::new(
        vec![CoinWeight::new("BTC", 60), CoinWeight::new("ETH", 40)],
        Duration::days(1),
    )
    .with_usd(usd)
    .with_auto_fund(true)
}

#[tokio::test]
async fn test_paper_run_funds_buys_and_then_waits() -> Result<()> {
    let venue = PaperExchange::new(PaperConfig::new(20.0, 100.0, 0.0001));
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let scheduler = Scheduler::new(venue, request(100.0), false)
        .await?
        .with_clock(clock.clone());

    assert_eq!(scheduler.allocation().budget(), 100.0);
    assert_eq!(scheduler.plans()[0].symbol(), "BTC-USD");
    assert_eq!(scheduler.plans()[0].amount(), 60.0);
    assert_eq!(scheduler.plans()[1].amount(), 40.0);

    let report = scheduler.sync().await?;
    assert_eq!(report.placed().len(), 2);
    assert!(report.failures().is_empty());

    // 80 deposited, everything spent
    assert_eq!(scheduler.exchange().cash(), 0.0);
    assert_eq!(scheduler.exchange().holding("BTC"), 0.6);
    assert_eq!(scheduler.exchange().holding("ETH"), 0.4);

    // Instant payout still waits out the settlement grace
    let sleeps = clock.sleeps();
    assert_eq!(sleeps.len(), 1);
    assert!(sleeps[0] >= std::time::Duration::from_secs(59));
    assert!(sleeps[0] <= std::time::Duration::from_secs(120));

    // Same window: the purchase just made blocks the next one
    assert_eq!(scheduler.sync().await.unwrap_err(), SyncError::WindowNotElapsed);
    Ok(())
}

#[tokio::test]
async fn test_paper_dry_run_touches_nothing() -> Result<()> {
    let venue = PaperExchange::new(PaperConfig::new(0.0, 100.0, 0.0001));
    let clock = Arc::new(ManualClock::new(Utc::now()));

    let scheduler = Scheduler::new(venue, request(50.0), true)
        .await?
        .with_clock(clock.clone());

    let report = scheduler.sync().await?;
    match report {
        SyncReport::Completed { placed, failures } => {
            assert!(placed.is_empty());
            assert_eq!(failures.len(), 2);
            assert!(failures
                .iter()
                .all(|f| f.error == ExecutionError::SkippedForDebug));
        }
        other => panic!("unexpected report {:?}", other),
    }

    assert_eq!(scheduler.exchange().cash(), 0.0);
    assert!(clock.sleeps().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_paper_limit_order_stays_within_budget() -> Result<()> {
    let venue = PaperExchange::new(PaperConfig::new(100.0, 100.0, 0.0001));
    let req = SyncRequest::new(vec![CoinWeight::new("BTC", 100)], Duration::hours(12))
        .with_usd(50.0)
        .with_order_type(OrderType::Limit)
        .with_order_spread(1.0);

    let scheduler = Scheduler::new(venue, req, false)
        .await?
        .with_clock(Arc::new(ManualClock::new(Utc::now())));

    let report = scheduler.sync().await?;
    assert_eq!(report.placed().len(), 1);

    // 0.49504950 BTC at 101.00
    let spent = 100.0 - scheduler.exchange().cash();
    assert!(spent <= 50.0);
    assert!(spent > 49.99);
    assert!((scheduler.exchange().holding("BTC") - 0.4950495).abs() < 1e-12);
    Ok(())
}

#[tokio::test]
async fn test_paper_rejects_allocation_below_minimum() {
    // min size 1 at price 100 means $100 per coin
    let venue = PaperExchange::new(PaperConfig::new(1000.0, 100.0, 1.0));

    let err = Scheduler::new(venue, request(100.0), false)
        .await
        .err()
        .unwrap();

    assert_eq!(
        err.to_string(),
        "Paper minimum BTC trade amount is $100.00, but you're trying to purchase $60.00"
    );
}
