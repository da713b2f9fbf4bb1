use anyhow::Result;
use clap::Parser;
use dca_engine::io::{Args, Settings};
use dca_engine::{Scheduler, SyncReport};
use log::{error, info};
use venue_gateway::{PaperConfig, Venue};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let settings = match Settings::load(&args) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_level))
        .init();

    if let Err(e) = run(settings).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> Result<()> {
    let request = settings.to_request()?;
    let venue: Venue = settings.exchange.parse().map_err(anyhow::Error::msg)?;
    let paper = PaperConfig::new(
        settings.paper_balance,
        settings.paper_price,
        settings.paper_min_size,
    );

    let exchange = venue_gateway::connect(venue, paper)?;
    info!(
        "=== DCA starting: exchange={} trade={} ===",
        venue,
        settings.trade
    );

    let scheduler = Scheduler::new(exchange, request, settings.debug()).await?;
    match scheduler.sync().await? {
        SyncReport::Completed { placed, failures } => {
            for order in &placed {
                info!(
                    "Order placed: symbol={} order_id={}",
                    order.symbol(),
                    order.order_id()
                );
            }
            info!(
                "Run complete: placed={} failed={}",
                placed.len(),
                failures.len()
            );
        }
        SyncReport::Deferred { settles_in } => {
            info!(
                "Deposit settles in {}m, purchase deferred to the next run",
                settles_in.num_minutes()
            );
        }
    }

    Ok(())
}
