use rust_decimal::Decimal;

/// Turns a venue's best ask and a fiat budget into a limit order.
///
/// Venues that place limit orders read their own order book and call back
/// into this hook, so the pricing rules live in one place regardless of
/// which venue executes the order.
pub trait LimitPricer: Send + Sync {
    /// # Arguments
    ///
    /// * `ask` - Best ask (or closest equivalent) reported by the venue.
    /// * `fiat_amount` - Fiat budget allocated to this order.
    ///
    /// # Returns
    ///
    /// * `(Decimal, Decimal)` - Limit price and order size in base units.
    fn price_and_size(&self, ask: Decimal, fiat_amount: Decimal) -> (Decimal, Decimal);
}

impl<F> LimitPricer for F
where
    F: Fn(Decimal, Decimal) -> (Decimal, Decimal) + Send + Sync,
{
    fn price_and_size(&self, ask: Decimal, fiat_amount: Decimal) -> (Decimal, Decimal) {
        self(ask, fiat_amount)
    }
}
