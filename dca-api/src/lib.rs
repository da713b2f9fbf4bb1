pub mod error;
pub mod model;
pub mod traits;

pub use error::{ExchangeError, ExchangeResult};
pub use model::account::{Account, PendingTransfer};
pub use model::market_data::{Product, Ticker};
pub use model::order::{Order, OrderType};
pub use traits::exchange::Exchange;
pub use traits::limit::LimitPricer;

pub mod prelude {
    pub use crate::error::{ExchangeError, ExchangeResult};
    pub use crate::model::account::{Account, PendingTransfer};
    pub use crate::model::market_data::{Product, Ticker};
    pub use crate::model::order::{Order, OrderType};
    pub use crate::traits::exchange::Exchange;
    pub use crate::traits::limit::LimitPricer;
}
