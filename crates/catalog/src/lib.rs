//! Store catalog records (read side).
//!
//! Products, their sellable variants and per-store assignments are owned by
//! the external service. This crate models what the inventory and order views
//! need from them, plus the validation applied before a variant list is sent
//! back for create/update.

pub mod store_product;
pub mod variant;

pub use store_product::StoreProduct;
pub use variant::{Pricing, Unit, Variant, discount_percent, validate_variants};
