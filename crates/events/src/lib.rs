//! Domain events and their distribution.
//!
//! Events here are facts the backend has confirmed (an order status was
//! adopted, a goods receipt was recorded). Views subscribe to learn that their
//! snapshot is stale and must be re-fetched.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::InMemoryEventBus;
