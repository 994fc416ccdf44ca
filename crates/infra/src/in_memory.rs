//! In-memory order/inventory service for tests/dev.
//!
//! Applies the service's own rules, including the ones the dashboard cannot
//! predict (assigning a partner dispatches a `ready` order).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use freshcart_catalog::StoreProduct;
use freshcart_core::{OrderId, PartnerId, ProductId, StoreId};
use freshcart_inventory::{BatchRecord, NewBatch, RecordRef};
use freshcart_orders::{OrderSnapshot, OrderStatus, PaymentMethod, PaymentStatus};

use crate::backend::{BackendError, InventoryBackend, OrderBackend};

#[derive(Debug, Default)]
struct State {
    orders: HashMap<OrderId, OrderSnapshot>,
    store_products: Vec<StoreProduct>,
    batches: Vec<BatchRecord>,
    next_batch: u64,
    calls: usize,
    scheduled: HashMap<usize, BackendError>,
    mutations: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_order(&self, order: OrderSnapshot) {
        self.state().orders.insert(order.id.clone(), order);
    }

    pub fn insert_store_product(&self, store_product: StoreProduct) {
        self.state().store_products.push(store_product);
    }

    pub fn insert_batch(&self, record: BatchRecord) {
        self.state().batches.push(record);
    }

    pub fn order(&self, order_id: &OrderId) -> Option<OrderSnapshot> {
        self.state().orders.get(order_id).cloned()
    }

    /// Mutate an order behind the dashboard's back (another operator, a rider app).
    pub fn amend_order(&self, order_id: &OrderId, amend: impl FnOnce(&mut OrderSnapshot)) {
        if let Some(order) = self.state().orders.get_mut(order_id) {
            amend(order);
        }
    }

    /// The next call (of any kind) fails with `error`.
    pub fn fail_next(&self, error: BackendError) {
        self.fail_after(0, error);
    }

    /// Let `skip` calls through, then fail the one after with `error`.
    pub fn fail_after(&self, skip: usize, error: BackendError) {
        let mut state = self.state();
        let at = state.calls + skip + 1;
        state.scheduled.insert(at, error);
    }

    /// Number of mutating calls that reached the service.
    pub fn mutation_count(&self) -> usize {
        self.state().mutations
    }

    pub fn batch_count(&self) -> usize {
        self.state().batches.len()
    }
}

impl State {
    fn take_injected(&mut self) -> Result<(), BackendError> {
        self.calls += 1;
        match self.scheduled.remove(&self.calls) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn begin_mutation(&mut self) -> Result<(), BackendError> {
        self.take_injected()?;
        self.mutations += 1;
        Ok(())
    }

    fn open_order(&mut self, order_id: &OrderId) -> Result<&mut OrderSnapshot, BackendError> {
        let order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| BackendError::rejected("Order not found"))?;
        if order.status.is_terminal() {
            return Err(BackendError::rejected(format!(
                "Order is already {} and cannot be changed",
                order.status
            )));
        }
        Ok(order)
    }
}

fn matches_ref(reference: &Option<RecordRef>, id: Option<&str>) -> bool {
    match id {
        None => true,
        Some(id) => reference.as_ref().and_then(RecordRef::id) == Some(id),
    }
}

#[async_trait]
impl OrderBackend for InMemoryBackend {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<OrderSnapshot, BackendError> {
        let mut state = self.state();
        state.take_injected()?;
        state
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| BackendError::rejected("Order not found"))
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        reason: Option<&str>,
    ) -> Result<OrderSnapshot, BackendError> {
        let mut state = self.state();
        state.begin_mutation()?;
        let order = state.open_order(order_id)?;

        if !order.status.can_transition_to(status) {
            return Err(BackendError::rejected(format!(
                "Invalid status transition from {} to {}",
                order.status, status
            )));
        }
        match status {
            OrderStatus::Delivered
                if order.payment_method == PaymentMethod::Cod && order.payment_status == PaymentStatus::Pending =>
            {
                return Err(BackendError::rejected("Please collect payment before marking as delivered"));
            }
            OrderStatus::OutForDelivery if order.delivery_partner.is_none() => {
                return Err(BackendError::rejected("Please assign a delivery partner first"));
            }
            OrderStatus::Cancelled if reason.is_none_or(|r| r.trim().is_empty()) => {
                return Err(BackendError::rejected("Cancellation reason is required"));
            }
            OrderStatus::Refunded if order.payment_status == PaymentStatus::Paid => {
                order.payment_status = PaymentStatus::Refunded;
            }
            _ => {}
        }

        order.status = status;
        Ok(order.clone())
    }

    async fn collect_payment(&self, order_id: &OrderId, _notes: Option<&str>) -> Result<OrderSnapshot, BackendError> {
        let mut state = self.state();
        state.begin_mutation()?;
        let order = state.open_order(order_id)?;

        if order.payment_status == PaymentStatus::Paid {
            return Err(BackendError::rejected("Payment already collected"));
        }
        order.payment_status = PaymentStatus::Paid;
        Ok(order.clone())
    }

    async fn assign_delivery_partner(
        &self,
        order_id: &OrderId,
        partner_id: &PartnerId,
    ) -> Result<OrderSnapshot, BackendError> {
        let mut state = self.state();
        state.begin_mutation()?;
        let order = state.open_order(order_id)?;

        order.delivery_partner = Some(partner_id.clone());
        if order.status == OrderStatus::Ready {
            order.status = OrderStatus::OutForDelivery;
        }
        Ok(order.clone())
    }
}

#[async_trait]
impl InventoryBackend for InMemoryBackend {
    async fn list_store_products(&self, store_id: Option<&StoreId>) -> Result<Vec<StoreProduct>, BackendError> {
        let mut state = self.state();
        state.take_injected()?;
        Ok(state
            .store_products
            .iter()
            .filter(|sp| store_id.is_none_or(|s| &sp.store_id == s))
            .cloned()
            .collect())
    }

    async fn list_batches(
        &self,
        store_id: Option<&StoreId>,
        product_id: Option<&ProductId>,
    ) -> Result<Vec<BatchRecord>, BackendError> {
        let mut state = self.state();
        state.take_injected()?;
        Ok(state
            .batches
            .iter()
            .filter(|b| matches_ref(&b.store, store_id.map(StoreId::as_str)))
            .filter(|b| matches_ref(&b.product, product_id.map(ProductId::as_str)))
            .cloned()
            .collect())
    }

    async fn create_batch(&self, batch: &NewBatch) -> Result<BatchRecord, BackendError> {
        let mut state = self.state();
        state.begin_mutation()?;

        state.next_batch += 1;
        let record = BatchRecord {
            id: Some(format!("batch-{}", state.next_batch)),
            store: Some(RecordRef::Id(batch.store_id.to_string())),
            product: Some(RecordRef::Id(batch.product_id.to_string())),
            uses_shared_stock: batch.uses_shared_stock,
            variant_sku: batch.variant_sku.clone(),
            base_unit: batch.base_unit.map(|u| u.as_str().to_string()),
            initial_quantity: Some(batch.initial_quantity),
            available_quantity: Some(batch.available_quantity),
            cost_price: Some(batch.cost_price),
            expiry_date: batch.expiry_date.map(|e| e.to_rfc3339()),
            status: Some(batch.status),
        };
        state.batches.push(record.clone());
        Ok(record)
    }
}
