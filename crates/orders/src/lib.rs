//! Order fulfillment domain module.
//!
//! Status progression, payment and delivery-partner gating, and cancellation
//! rules for customer orders, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage). The order service is authoritative: this
//! crate decides which requests may be sent and adopts whatever state the
//! service returns.

pub mod cancel;
pub mod guard;
pub mod order;
pub mod status;

pub use cancel::{CancelReason, CancellationReason};
pub use guard::{BlockReason, Guard, TransitionDecision, TransitionIntent, evaluate, guard_for};
pub use order::{
    AvailableAction, FulfillmentError, OrderAction, OrderCommand, OrderEvent, OrderFulfillment,
    OrderRequest, OrderSnapshot, OrderSynced, SyncCause,
};
pub use status::{OrderStatus, PaymentMethod, PaymentStatus};
