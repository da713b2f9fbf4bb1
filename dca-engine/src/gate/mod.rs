pub mod funding;
pub mod window;

pub use funding::{FundingDecision, FundingGate, DEFER_THRESHOLD_SECS, SETTLEMENT_GRACE_SECS};
pub use window::should_purchase;
