//! Goods receipt (GRN): validating a new batch before the create call.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freshcart_catalog::{StoreProduct, Unit};
use freshcart_core::{BatchId, DomainError, DomainResult, Money, ProductId, Quantity, StoreId};
use freshcart_events::Event;

use crate::batch::BatchStatus;

/// Which stock a received batch will feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReceiptMode {
    Variant { variant_sku: String },
    Shared { base_unit: Option<Unit> },
}

/// Operator input for receiving goods into a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceipt {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub mode: ReceiptMode,
    pub quantity: Quantity,
    /// Cost per base unit.
    pub cost_price: Money,
    pub expiry_date: Option<DateTime<Utc>>,
    pub supplier: Option<String>,
    pub invoice_number: Option<String>,
}

/// Create-batch request body, as the inventory service expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBatch {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub uses_shared_stock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_unit: Option<Unit>,
    pub initial_quantity: Quantity,
    pub available_quantity: Quantity,
    pub cost_price: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    pub status: BatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
}

impl GoodsReceipt {
    /// Validate against the store product the goods are received for.
    pub fn validate(&self, store_product: &StoreProduct, now: DateTime<Utc>) -> DomainResult<NewBatch> {
        if self.store_id != store_product.store_id {
            return Err(DomainError::validation("store does not match the store product"));
        }
        if self.product_id != store_product.product_id {
            return Err(DomainError::validation("product does not match the store product"));
        }
        if self.quantity <= Decimal::ZERO {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if self.cost_price < Decimal::ZERO {
            return Err(DomainError::validation("cost price cannot be negative"));
        }
        if self.expiry_date.is_some_and(|expiry| expiry < now) {
            return Err(DomainError::validation("expiry date is already in the past"));
        }

        let (uses_shared_stock, variant_sku, base_unit) = match &self.mode {
            ReceiptMode::Variant { variant_sku } => {
                let sku = variant_sku.trim();
                if sku.is_empty() {
                    return Err(DomainError::validation("variant sku is required"));
                }
                if !store_product.has_variant(sku) {
                    return Err(DomainError::validation(format!(
                        "unknown variant sku for this product: {sku}"
                    )));
                }
                (false, Some(sku.to_string()), None)
            }
            ReceiptMode::Shared { base_unit } => {
                if base_unit.is_none() {
                    return Err(DomainError::validation("base unit is required for shared stock"));
                }
                (true, None, *base_unit)
            }
        };

        Ok(NewBatch {
            store_id: self.store_id.clone(),
            product_id: self.product_id.clone(),
            uses_shared_stock,
            variant_sku,
            base_unit,
            initial_quantity: self.quantity,
            available_quantity: self.quantity,
            cost_price: self.cost_price,
            expiry_date: self.expiry_date,
            status: BatchStatus::Active,
            supplier: non_blank(&self.supplier),
            invoice_number: non_blank(&self.invoice_number),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Event: GoodsReceived (the backend recorded a new batch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceived {
    pub batch_id: BatchId,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryEvent {
    GoodsReceived(GoodsReceived),
}

impl Event for InventoryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            InventoryEvent::GoodsReceived(_) => "inventory.batch.received",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            InventoryEvent::GoodsReceived(e) => e.occurred_at,
        }
    }
}
