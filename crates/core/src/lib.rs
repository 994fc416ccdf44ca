//! `freshcart-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BatchId, OrderId, PartnerId, ProductId, StoreId, StoreProductId};
pub use money::{Money, Quantity, checked_ratio, round_2dp};
pub use value_object::ValueObject;
