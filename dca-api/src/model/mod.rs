pub mod account;
pub mod market_data;
pub mod order;
