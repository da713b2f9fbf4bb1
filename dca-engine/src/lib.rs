//! # DCA Engine
//!
//! Recurring fixed-budget crypto purchases against a single venue.
//!
//! ## Modules
//! - `planner`: splits the budget across coins and checks venue minimums.
//! - `gate`: purchase window and funding checks run before buying.
//! - `executor`: places one order per planned coin.
//! - `engine`: the `Scheduler` that runs a whole pass.
//! - `io`: command line flags and layered settings.

pub mod clock;
pub mod confirm;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod executor;
pub mod gate;
pub mod io;
pub mod models;
pub mod planner;

pub use clock::{Clock, SystemClock};
pub use confirm::{Confirmation, ConsoleConfirmation};
pub use engine::{Scheduler, SyncReport, FORCE_PROMPT};
pub use error::{Result, SyncError};
pub use executor::{CoinFailure, ExecutionError, LimitOrderParams, OrderExecutor};
pub use models::{Allocation, CoinWeight, OrderPlan, SyncRequest};
