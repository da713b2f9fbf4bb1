pub mod exchange;
pub mod limit;
