//! Inventory domain module: batch ledger and stock resolution.
//!
//! Stock is never stored per variant. It is derived on every read from the
//! purchase batches (goods receipts) of a store, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod batch;
pub mod costing;
pub mod receipt;
pub mod resolver;

pub use batch::{Batch, BatchKind, BatchRecord, BatchStatus, RecordRef};
pub use costing::{
    CostLine, average_cost_per_quantity, margin_percent, product_average_cost, stock_value_at,
    weighted_average_cost,
};
pub use receipt::{GoodsReceipt, GoodsReceived, InventoryEvent, NewBatch, ReceiptMode};
pub use resolver::{
    LOW_STOCK_THRESHOLD, LowStockAlert, StockSummary, VariantStockRow, low_stock_alerts,
    resolve_stock, resolve_stock_records,
};
