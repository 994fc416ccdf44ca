//! Purchase cost averaging for margin display.
//!
//! Averages are always weighted by quantity: `Σ total_cost / Σ quantity`.
//! Averaging per-batch unit costs would bias the figure toward small batches.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freshcart_core::{Money, ProductId, Quantity, StoreId, checked_ratio, round_2dp};

use crate::batch::Batch;

/// Cost and quantity of one purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLine {
    pub total_cost: Money,
    pub quantity: Quantity,
}

impl CostLine {
    pub fn new(total_cost: Money, quantity: Quantity) -> Self {
        Self { total_cost, quantity }
    }
}

impl From<&Batch> for CostLine {
    fn from(batch: &Batch) -> Self {
        Self {
            total_cost: batch.total_cost(),
            quantity: batch.initial_quantity,
        }
    }
}

/// `total_cost / quantity` rounded to 2 places; `None` for zero quantity.
pub fn average_cost_per_quantity(total_cost: Money, quantity: Quantity) -> Option<Money> {
    checked_ratio(total_cost, quantity).map(round_2dp)
}

/// Quantity-weighted average cost across purchases.
pub fn weighted_average_cost(lines: impl IntoIterator<Item = CostLine>) -> Option<Money> {
    let (cost, quantity) = lines
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(cost, qty), line| {
            (cost + line.total_cost, qty + line.quantity)
        });
    average_cost_per_quantity(cost, quantity)
}

/// Weighted average purchase cost of a product in a store.
///
/// Considers every batch of that store/product regardless of status or
/// expiry: cost history is not sellable stock.
pub fn product_average_cost(batches: &[Batch], store_id: &StoreId, product_id: &ProductId) -> Option<Money> {
    weighted_average_cost(
        batches
            .iter()
            .filter(|b| &b.store_id == store_id && &b.product_id == product_id)
            .map(CostLine::from),
    )
}

/// Gross margin `(selling_price - cost) / selling_price * 100`, 2 places.
pub fn margin_percent(selling_price: Money, average_cost: Money) -> Option<Decimal> {
    checked_ratio(selling_price - average_cost, selling_price)
        .map(|ratio| round_2dp(ratio * Decimal::ONE_HUNDRED))
}

/// Remaining stock value of contributing batches at `now`.
pub fn stock_value_at(batches: &[Batch], now: DateTime<Utc>) -> Money {
    batches
        .iter()
        .map(|b| b.contribution_at(now) * b.cost_price)
        .sum()
}
