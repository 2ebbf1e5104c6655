use bourse_instrument::Side;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Constants of the volume-share slippage model, injected into the
/// [`SimulatedExecution`](crate::simulator::SimulatedExecution) handler rather than read from
/// process-wide state.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Maximum fraction of a bar's volume a strategy may consume, across all of its orders on
    /// that symbol in that bar.
    pub slippage_limit: Decimal,
    /// Minimum absolute price impact per share once anything fills, standing in for the
    /// bid-ask spread.
    pub min_impact: Decimal,
    /// Coefficient of the quadratic participation-rate impact term.
    pub impact_coef: Decimal,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            slippage_limit: Decimal::new(25, 3),
            min_impact: Decimal::new(3, 3),
            impact_coef: Decimal::new(1, 1),
        }
    }
}

impl ExecutionConfig {
    /// Estimate the filled quantity and impacted price for one order against one bar.
    ///
    /// The fillable quantity is the remainder of the per-bar volume cap after subtracting
    /// `filled_volume` already consumed on this symbol by earlier orders in the same bar. Price
    /// impact is `max(min_impact, share^2 * impact_coef * price)` in absolute price units,
    /// signed by the order direction, and the impacted price is rounded to 3 decimal places.
    ///
    /// Returns `(0, 0)` for bars that traded no volume.
    pub fn volume_share(
        &self,
        price: Decimal,
        bar_volume: i64,
        open_quantity: i64,
        side: Side,
        filled_volume: i64,
    ) -> (i64, Decimal) {
        if bar_volume <= 0 {
            return (0, Decimal::ZERO);
        }

        let cap = (self.slippage_limit * Decimal::from(bar_volume)
            - Decimal::from(filled_volume))
        .max(Decimal::ZERO);

        let filled = Decimal::from(open_quantity)
            .min(cap)
            .floor()
            .to_i64()
            .unwrap_or(0);

        let share = (Decimal::from(filled) / Decimal::from(bar_volume)).min(self.slippage_limit);
        let impact =
            Decimal::from(side.sign()) * (share * share * self.impact_coef * price).max(self.min_impact);

        (filled, (price + impact).round_dp(3))
    }
}
