pub mod cadence;
pub mod coin;
pub mod config;
pub mod numeric;
pub mod plan;

pub use cadence::*;
pub use coin::*;
pub use config::*;
pub use numeric::*;
pub use plan::*;
