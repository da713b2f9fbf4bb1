pub mod args;
pub mod settings;

pub use args::Args;
pub use settings::{CoinList, Settings};
