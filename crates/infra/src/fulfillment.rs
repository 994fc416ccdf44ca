//! Order fulfillment coordination.
//!
//! ```text
//! command
//!   ↓
//! 1. claim the order (one request in flight per order)
//!   ↓
//! 2. check the caller's expected version (reject stale snapshots)
//!   ↓
//! 3. aggregate.handle(command) → requests (local guards; nothing sent on failure)
//!   ↓
//! 4. send each request; the service answers with the canonical order
//!   ↓
//! 5. adopt the answer, publish it on the bus, release the claim
//! ```
//!
//! A rejection or transport failure leaves the local state untouched. After a
//! rejection the order is re-fetched, so a retry starts from whatever the
//! service now holds.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use thiserror::Error;

use freshcart_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, OrderId};
use freshcart_events::{EventBus, EventEnvelope};
use freshcart_orders::{
    AvailableAction, BlockReason, FulfillmentError, OrderCommand, OrderEvent, OrderFulfillment,
    OrderRequest, OrderSnapshot, SyncCause,
};

use crate::backend::{BackendError, OrderBackend};

pub type OrderEnvelope = EventEnvelope<OrderEvent>;

const STREAM_TYPE: &str = "orders.order";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// A local guard failed; nothing was sent.
    #[error(transparent)]
    Blocked(#[from] BlockReason),

    #[error("a request for order {0} is already in progress")]
    Busy(OrderId),

    #[error("order {0} changed since it was displayed; refresh and retry")]
    Stale(OrderId),

    #[error("order {0} has not been loaded")]
    NotLoaded(OrderId),

    /// The service refused; its message verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("could not reach the order service: {0}")]
    Transient(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<FulfillmentError> for CoordinatorError {
    fn from(value: FulfillmentError) -> Self {
        match value {
            FulfillmentError::Blocked(reason) => CoordinatorError::Blocked(reason),
            FulfillmentError::Domain(err) => CoordinatorError::Domain(err),
        }
    }
}

impl From<BackendError> for CoordinatorError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Rejected { message } => CoordinatorError::Rejected(message),
            BackendError::Transport(msg) => CoordinatorError::Transient(msg),
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    orders: HashMap<OrderId, OrderFulfillment>,
    in_flight: HashSet<OrderId>,
}

/// Releases an order's in-flight claim when dropped, including when the
/// request future is abandoned mid-flight.
struct Claim<'a> {
    registry: &'a Mutex<Registry>,
    order_id: OrderId,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        lock(self.registry).in_flight.remove(&self.order_id);
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps the last confirmed state of each order the operator is working on
/// and serializes requests per order.
#[derive(Debug)]
pub struct FulfillmentCoordinator<B, E> {
    backend: B,
    bus: E,
    registry: Mutex<Registry>,
}

impl<B, E> FulfillmentCoordinator<B, E> {
    pub fn new(backend: B, bus: E) -> Self {
        Self {
            backend,
            bus,
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Last adopted state of an order.
    pub fn order(&self, order_id: &OrderId) -> Option<OrderFulfillment> {
        lock(&self.registry).orders.get(order_id).cloned()
    }

    pub fn available_actions(&self, order_id: &OrderId) -> Option<Vec<AvailableAction>> {
        lock(&self.registry)
            .orders
            .get(order_id)
            .map(OrderFulfillment::available_actions)
    }

    pub fn is_in_flight(&self, order_id: &OrderId) -> bool {
        lock(&self.registry).in_flight.contains(order_id)
    }

    fn claim(&self, order_id: &OrderId) -> Result<Claim<'_>, CoordinatorError> {
        let mut registry = lock(&self.registry);
        if !registry.in_flight.insert(order_id.clone()) {
            return Err(CoordinatorError::Busy(order_id.clone()));
        }
        Ok(Claim {
            registry: &self.registry,
            order_id: order_id.clone(),
        })
    }

    /// Steps 1-3: everything that happens before the first request is sent.
    fn prepare(
        &self,
        order_id: &OrderId,
        expected: ExpectedVersion,
        command: &OrderCommand,
    ) -> Result<(Vec<OrderRequest>, Claim<'_>), CoordinatorError> {
        let mut registry = lock(&self.registry);
        if registry.in_flight.contains(order_id) {
            return Err(CoordinatorError::Busy(order_id.clone()));
        }
        let order = registry
            .orders
            .get(order_id)
            .ok_or_else(|| CoordinatorError::NotLoaded(order_id.clone()))?;

        expected
            .check(order.version())
            .map_err(|_| CoordinatorError::Stale(order_id.clone()))?;

        let requests = order.handle(command).map_err(|err| {
            tracing::debug!(order_id = %order_id, error = %err, "request blocked locally");
            CoordinatorError::from(err)
        })?;

        registry.in_flight.insert(order_id.clone());
        Ok((
            requests,
            Claim {
                registry: &self.registry,
                order_id: order_id.clone(),
            },
        ))
    }
}

impl<B, E> FulfillmentCoordinator<B, E>
where
    B: OrderBackend,
    E: EventBus<OrderEnvelope>,
{
    /// Fetch an order and adopt the service's current state.
    pub async fn load(&self, order_id: &OrderId) -> Result<OrderFulfillment, CoordinatorError> {
        let _claim = self.claim(order_id)?;
        let snapshot = self.backend.fetch_order(order_id).await.map_err(|err| {
            tracing::warn!(order_id = %order_id, error = %err, "order fetch failed");
            CoordinatorError::from(err)
        })?;
        self.adopt(order_id, snapshot, SyncCause::Fetched)
    }

    /// Run a command against an order the caller saw at `expected`.
    pub async fn execute(
        &self,
        order_id: &OrderId,
        expected: ExpectedVersion,
        command: OrderCommand,
    ) -> Result<OrderFulfillment, CoordinatorError> {
        let (requests, _claim) = self.prepare(order_id, expected, &command)?;

        let mut adopted = None;
        for request in requests {
            let snapshot = match send(&self.backend, &request).await {
                Ok(snapshot) => snapshot,
                Err(err) => return Err(self.on_failure(order_id, err).await),
            };
            adopted = Some(self.adopt(order_id, snapshot, request.sync_cause())?);
        }

        match adopted {
            Some(order) => Ok(order),
            None => self
                .order(order_id)
                .ok_or_else(|| CoordinatorError::NotLoaded(order_id.clone())),
        }
    }

    async fn on_failure(&self, order_id: &OrderId, err: BackendError) -> CoordinatorError {
        match &err {
            BackendError::Rejected { message } => {
                tracing::warn!(order_id = %order_id, message = %message, "order service rejected request");
                self.resync(order_id).await;
            }
            BackendError::Transport(msg) => {
                tracing::warn!(order_id = %order_id, error = %msg, "order service unreachable");
            }
        }
        err.into()
    }

    /// Best effort: adopt the service's state if it moved on without us.
    async fn resync(&self, order_id: &OrderId) {
        match self.backend.fetch_order(order_id).await {
            Ok(snapshot) => {
                let changed = self
                    .order(order_id)
                    .is_none_or(|current| current.snapshot() != &snapshot);
                if changed {
                    if let Err(err) = self.adopt(order_id, snapshot, SyncCause::Fetched) {
                        tracing::warn!(order_id = %order_id, error = %err, "could not adopt refreshed order");
                    }
                }
            }
            Err(err) => {
                tracing::warn!(order_id = %order_id, error = %err, "order refresh after rejection failed");
            }
        }
    }

    fn adopt(
        &self,
        order_id: &OrderId,
        snapshot: OrderSnapshot,
        cause: SyncCause,
    ) -> Result<OrderFulfillment, CoordinatorError> {
        let (order, envelope) = {
            let mut registry = lock(&self.registry);
            let order = registry
                .orders
                .entry(order_id.clone())
                .or_insert_with(|| OrderFulfillment::new(snapshot.clone()));

            let event = order.synced(snapshot, cause, Utc::now())?;
            order.apply(&event);

            tracing::info!(
                order_id = %order_id,
                status = %order.status(),
                version = order.version(),
                cause = ?cause,
                "order state adopted"
            );

            let envelope = EventEnvelope::wrap(order_id.as_str(), STREAM_TYPE, order.version(), event);
            (order.clone(), envelope)
        };

        if let Err(err) = self.bus.publish(envelope) {
            tracing::warn!(order_id = %order_id, error = ?err, "failed to publish order update");
        }
        Ok(order)
    }
}

async fn send<B>(backend: &B, request: &OrderRequest) -> Result<OrderSnapshot, BackendError>
where
    B: OrderBackend + ?Sized,
{
    match request {
        OrderRequest::UpdateStatus {
            order_id,
            status,
            reason,
        } => backend.update_status(order_id, *status, reason.as_deref()).await,
        OrderRequest::CollectPayment { order_id, notes } => backend.collect_payment(order_id, notes.as_deref()).await,
        OrderRequest::AssignDeliveryPartner { order_id, partner_id } => {
            backend.assign_delivery_partner(order_id, partner_id).await
        }
    }
}
