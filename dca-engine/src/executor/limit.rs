use crate::models::{to_decimal, truncate_decimal, FIAT_PLACES, SIZE_PLACES};
use dca::LimitPricer;
use rust_decimal::Decimal;

/// Pricing rules for marketable limit orders.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LimitOrderParams {
    /// Percent added on top of the ask.
    spread_percent: Decimal,
    /// Percent of the budget held back for trading fees.
    fee_percent: Decimal,
}

impl LimitOrderParams {
    pub fn new(spread_percent: f64, fee_percent: f64) -> Self {
        Self {
            spread_percent: to_decimal(spread_percent),
            fee_percent: to_decimal(fee_percent),
        }
    }

    pub fn spread_percent(&self) -> Decimal {
        self.spread_percent
    }

    pub fn fee_percent(&self) -> Decimal {
        self.fee_percent
    }
}

impl LimitPricer for LimitOrderParams {
    /// Price is the ask plus the spread, cut to cents. Size is the fee-adjusted
    /// budget divided by that price, cut to 8 decimals, so the filled order
    /// plus fees stays within the budget.
    fn price_and_size(&self, ask: Decimal, fiat_amount: Decimal) -> (Decimal, Decimal) {
        let hundred = Decimal::ONE_HUNDRED;
        let effective = fiat_amount * (hundred - self.fee_percent) / hundred;
        let price = truncate_decimal(
            ask * (Decimal::ONE + self.spread_percent / hundred),
            FIAT_PLACES,
        );
        let size = effective
            .checked_div(price)
            .map(|s| truncate_decimal(s, SIZE_PLACES))
            .unwrap_or(Decimal::ZERO);
        (price, size)
    }
}
