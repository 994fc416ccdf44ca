//! Contract with the external order/inventory service.
//!
//! Every mutating call returns the canonical record after the change. Callers
//! adopt it instead of predicting the outcome.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use freshcart_catalog::StoreProduct;
use freshcart_core::{OrderId, PartnerId, ProductId, StoreId};
use freshcart_inventory::{BatchRecord, NewBatch};
use freshcart_orders::{OrderSnapshot, OrderStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The service refused the request; `message` is shown to the operator as-is.
    #[error("{message}")]
    Rejected { message: String },

    /// Network or server failure; safe to retry.
    #[error("backend unavailable: {0}")]
    Transport(String),
}

impl BackendError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Transport(_))
    }
}

/// Response envelope used by the service: `{ success, message, data }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn into_result(self) -> Result<T, BackendError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(BackendError::transport("response carried no data")),
            (false, _) => Err(BackendError::rejected(
                self.message.unwrap_or_else(|| "request failed".to_string()),
            )),
        }
    }
}

#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<OrderSnapshot, BackendError>;

    async fn update_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        reason: Option<&str>,
    ) -> Result<OrderSnapshot, BackendError>;

    async fn collect_payment(&self, order_id: &OrderId, notes: Option<&str>) -> Result<OrderSnapshot, BackendError>;

    /// The service may advance the order itself (e.g. `ready` → `out_for_delivery`).
    async fn assign_delivery_partner(
        &self,
        order_id: &OrderId,
        partner_id: &PartnerId,
    ) -> Result<OrderSnapshot, BackendError>;
}

#[async_trait]
pub trait InventoryBackend: Send + Sync {
    /// All stores when `store_id` is `None`.
    async fn list_store_products(&self, store_id: Option<&StoreId>) -> Result<Vec<StoreProduct>, BackendError>;

    async fn list_batches(
        &self,
        store_id: Option<&StoreId>,
        product_id: Option<&ProductId>,
    ) -> Result<Vec<BatchRecord>, BackendError>;

    async fn create_batch(&self, batch: &NewBatch) -> Result<BatchRecord, BackendError>;
}

#[async_trait]
impl<T> OrderBackend for Arc<T>
where
    T: OrderBackend + ?Sized,
{
    async fn fetch_order(&self, order_id: &OrderId) -> Result<OrderSnapshot, BackendError> {
        (**self).fetch_order(order_id).await
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        reason: Option<&str>,
    ) -> Result<OrderSnapshot, BackendError> {
        (**self).update_status(order_id, status, reason).await
    }

    async fn collect_payment(&self, order_id: &OrderId, notes: Option<&str>) -> Result<OrderSnapshot, BackendError> {
        (**self).collect_payment(order_id, notes).await
    }

    async fn assign_delivery_partner(
        &self,
        order_id: &OrderId,
        partner_id: &PartnerId,
    ) -> Result<OrderSnapshot, BackendError> {
        (**self).assign_delivery_partner(order_id, partner_id).await
    }
}

#[async_trait]
impl<T> InventoryBackend for Arc<T>
where
    T: InventoryBackend + ?Sized,
{
    async fn list_store_products(&self, store_id: Option<&StoreId>) -> Result<Vec<StoreProduct>, BackendError> {
        (**self).list_store_products(store_id).await
    }

    async fn list_batches(
        &self,
        store_id: Option<&StoreId>,
        product_id: Option<&ProductId>,
    ) -> Result<Vec<BatchRecord>, BackendError> {
        (**self).list_batches(store_id, product_id).await
    }

    async fn create_batch(&self, batch: &NewBatch) -> Result<BatchRecord, BackendError> {
        (**self).create_batch(batch).await
    }
}
