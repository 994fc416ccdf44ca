//! Inventory view state: the last stock resolution that fully succeeded.
//!
//! A refresh that fails halfway never replaces the displayed numbers, so an
//! outage shows stale stock rather than zeros.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use freshcart_core::{BatchId, DomainError, ProductId, StoreId};
use freshcart_events::{EventBus, EventEnvelope};
use freshcart_inventory::{
    BatchRecord, GoodsReceipt, GoodsReceived, InventoryEvent, LOW_STOCK_THRESHOLD, LowStockAlert,
    StockSummary, VariantStockRow, low_stock_alerts, resolve_stock_records,
};

use crate::backend::{BackendError, InventoryBackend};
use crate::config::InventoryConfig;

pub type InventoryEnvelope = EventEnvelope<InventoryEvent>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error(transparent)]
    Invalid(#[from] DomainError),

    #[error("product {product_id} is not listed in store {store_id}")]
    UnknownStoreProduct { store_id: StoreId, product_id: ProductId },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub rows: Vec<VariantStockRow>,
    pub summary: StockSummary,
    pub alerts: Vec<LowStockAlert>,
    pub resolved_at: DateTime<Utc>,
}

impl BoardSnapshot {
    fn build(rows: Vec<VariantStockRow>, threshold: u32, resolved_at: DateTime<Utc>) -> Self {
        Self {
            summary: StockSummary::from_rows(&rows, threshold),
            alerts: low_stock_alerts(&rows, threshold),
            rows,
            resolved_at,
        }
    }
}

#[derive(Debug)]
pub struct ReceiptOutcome {
    /// The batch as the service recorded it.
    pub batch: BatchRecord,
    /// The follow-up refresh; on failure the previous snapshot is still shown.
    pub refresh: Result<BoardSnapshot, BoardError>,
}

#[derive(Debug)]
pub struct InventoryBoard<B, E> {
    backend: B,
    bus: E,
    /// `None` for the all-stores view.
    store_id: Option<StoreId>,
    low_stock_threshold: u32,
    snapshot: RwLock<Option<BoardSnapshot>>,
}

impl<B, E> InventoryBoard<B, E> {
    pub fn new(backend: B, bus: E, store_id: Option<StoreId>) -> Self {
        Self {
            backend,
            bus,
            store_id,
            low_stock_threshold: LOW_STOCK_THRESHOLD,
            snapshot: RwLock::new(None),
        }
    }

    /// Board using the configured low-stock threshold.
    pub fn from_config(backend: B, bus: E, store_id: Option<StoreId>, config: &InventoryConfig) -> Self {
        Self::new(backend, bus, store_id).with_low_stock_threshold(config.low_stock_threshold)
    }

    pub fn with_low_stock_threshold(mut self, threshold: u32) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn store_id(&self) -> Option<&StoreId> {
        self.store_id.as_ref()
    }

    /// What the operator currently sees.
    pub fn snapshot(&self) -> Option<BoardSnapshot> {
        self.snapshot.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl<B, E> InventoryBoard<B, E>
where
    B: InventoryBackend,
    E: EventBus<InventoryEnvelope>,
{
    /// Fetch store products and batches, resolve, and replace the snapshot.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<BoardSnapshot, BoardError> {
        let store_id = self.store_id.as_ref();
        let fetched = match self.backend.list_store_products(store_id).await {
            Ok(products) => self
                .backend
                .list_batches(store_id, None)
                .await
                .map(|records| (products, records)),
            Err(err) => Err(err),
        };
        let (products, records) = fetched.map_err(|err| {
            tracing::warn!(store_id = ?store_id, error = %err, "inventory refresh failed; keeping previous snapshot");
            BoardError::from(err)
        })?;

        let rows = resolve_stock_records(&products, &records, now);
        let snapshot = BoardSnapshot::build(rows, self.low_stock_threshold, now);
        tracing::info!(
            store_id = ?store_id,
            rows = snapshot.summary.total_rows,
            low_stock = snapshot.summary.low_stock,
            out_of_stock = snapshot.summary.out_of_stock,
            "inventory resolved"
        );

        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Record a goods receipt (GRN) and refresh.
    ///
    /// Validation failures never reach the service.
    pub async fn receive_goods(&self, receipt: &GoodsReceipt, now: DateTime<Utc>) -> Result<ReceiptOutcome, BoardError> {
        if self.store_id.as_ref().is_some_and(|s| s != &receipt.store_id) {
            return Err(DomainError::validation("receipt is for a different store than this board").into());
        }

        let products = self.backend.list_store_products(Some(&receipt.store_id)).await?;
        let store_product = products
            .iter()
            .find(|sp| sp.product_id == receipt.product_id)
            .ok_or_else(|| BoardError::UnknownStoreProduct {
                store_id: receipt.store_id.clone(),
                product_id: receipt.product_id.clone(),
            })?;

        let new_batch = receipt.validate(store_product, now)?;
        let batch = self.backend.create_batch(&new_batch).await.map_err(|err| {
            tracing::warn!(product_id = %receipt.product_id, error = %err, "batch creation failed");
            BoardError::from(err)
        })?;

        match batch.id.as_deref().map(BatchId::parse) {
            Some(Ok(batch_id)) => self.publish_received(batch_id, receipt, now),
            _ => tracing::warn!(product_id = %receipt.product_id, "created batch came back without an id"),
        }

        let refresh = self.refresh(now).await;
        Ok(ReceiptOutcome { batch, refresh })
    }

    fn publish_received(&self, batch_id: BatchId, receipt: &GoodsReceipt, now: DateTime<Utc>) {
        let event = InventoryEvent::GoodsReceived(GoodsReceived {
            batch_id: batch_id.clone(),
            store_id: receipt.store_id.clone(),
            product_id: receipt.product_id.clone(),
            quantity: receipt.quantity,
            occurred_at: now,
        });
        let envelope = EventEnvelope::wrap(batch_id.as_str(), "inventory.batch", 1, event);
        if let Err(err) = self.bus.publish(envelope) {
            tracing::warn!(batch_id = %batch_id, error = ?err, "failed to publish goods receipt");
        }
    }
}
