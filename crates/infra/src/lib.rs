//! Infrastructure layer: backend clients, coordination, configuration.
//!
//! The order/inventory service owns persistence. Everything here either talks
//! to it through the [`backend`] traits or keeps the last state it confirmed.

pub mod backend;
pub mod config;
pub mod fulfillment;
pub mod in_memory;
pub mod inventory_board;


pub use backend::{ApiResponse, BackendError, InventoryBackend, OrderBackend};
pub use config::{BackendConfig, DashboardConfig, InventoryConfig};
pub use fulfillment::{CoordinatorError, FulfillmentCoordinator, OrderEnvelope};
pub use in_memory::InMemoryBackend;
pub use inventory_board::{BoardError, BoardSnapshot, InventoryBoard, InventoryEnvelope, ReceiptOutcome};
