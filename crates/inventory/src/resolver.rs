//! Batch ledger resolver: per-variant sellable stock.
//!
//! For each active store product:
//!
//! 1. keep only batches of the same store and product
//! 2. split them into shared-pool batches and variant-specific batches
//! 3. if any shared batch exists, every variant reports the pooled quantity
//!    and variant-specific batches are ignored (shared supersedes, never merges)
//! 4. otherwise each variant sums its own batches
//!
//! Only `active`, unexpired batches contribute. The function is pure: the
//! caller passes the full snapshot and the current time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freshcart_catalog::{StoreProduct, Variant};
use freshcart_core::{Money, ProductId, Quantity, StoreId, StoreProductId};

use crate::batch::{Batch, BatchRecord};

/// Rows with stock strictly below this are flagged as low stock.
pub const LOW_STOCK_THRESHOLD: u32 = 20;

/// One row of the inventory table: a variant of a store product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantStockRow {
    pub store_product_id: StoreProductId,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub size_label: String,
    pub mrp: Money,
    pub selling_price: Money,
    pub discount: Decimal,
    pub stock: Quantity,
    pub is_available: bool,
    /// Stock came from the product's shared pool.
    pub shared_stock: bool,
}

impl VariantStockRow {
    pub fn is_low_stock(&self, threshold: u32) -> bool {
        self.stock < Decimal::from(threshold)
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock.is_zero()
    }
}

#[derive(Default)]
struct ProductBatches<'a> {
    shared: Vec<&'a Batch>,
    variant: Vec<&'a Batch>,
}

/// Resolve stock for every variant of every active store product.
///
/// Always returns one row per (active store product, variant) pair, in input
/// order; a variant with no usable batches resolves to zero.
pub fn resolve_stock(
    store_products: &[StoreProduct],
    batches: &[Batch],
    now: DateTime<Utc>,
) -> Vec<VariantStockRow> {
    let mut index: HashMap<(&StoreId, &ProductId), ProductBatches<'_>> = HashMap::new();
    for batch in batches {
        let entry = index.entry((&batch.store_id, &batch.product_id)).or_default();
        if batch.is_shared() {
            entry.shared.push(batch);
        } else {
            entry.variant.push(batch);
        }
    }

    let empty = ProductBatches::default();
    let mut rows = Vec::new();

    for store_product in store_products.iter().filter(|sp| sp.is_active) {
        let group = index
            .get(&(&store_product.store_id, &store_product.product_id))
            .unwrap_or(&empty);

        let shared_stock: Quantity = group.shared.iter().map(|b| b.contribution_at(now)).sum();
        // An exhausted pool still marks the product as shared-mode.
        let has_shared_stock = shared_stock > Decimal::ZERO || !group.shared.is_empty();

        for variant in &store_product.variants {
            let stock = if has_shared_stock {
                shared_stock
            } else {
                group
                    .variant
                    .iter()
                    .filter(|b| b.variant_sku().is_some_and(|sku| variant.matches_sku(sku)))
                    .map(|b| b.contribution_at(now))
                    .sum()
            };

            rows.push(row(store_product, variant, stock, has_shared_stock));
        }
    }

    tracing::trace!(rows = rows.len(), batches = batches.len(), "resolved stock");
    rows
}

/// Ingest raw backend records, then resolve.
pub fn resolve_stock_records(
    store_products: &[StoreProduct],
    records: &[BatchRecord],
    now: DateTime<Utc>,
) -> Vec<VariantStockRow> {
    let batches = Batch::from_records(records);
    resolve_stock(store_products, &batches, now)
}

fn row(store_product: &StoreProduct, variant: &Variant, stock: Quantity, shared: bool) -> VariantStockRow {
    VariantStockRow {
        store_product_id: store_product.id.clone(),
        store_id: store_product.store_id.clone(),
        product_id: store_product.product_id.clone(),
        product_name: store_product.product_name.clone(),
        sku: variant.sku.clone(),
        size_label: variant.size_label(),
        mrp: variant.mrp(),
        selling_price: variant.selling_price(),
        discount: variant.discount(),
        stock,
        is_available: variant.is_available,
        shared_stock: shared,
    }
}

/// A low-stock alert surfaced to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockAlert {
    pub store_id: StoreId,
    pub product_name: String,
    pub sku: String,
    pub stock: Quantity,
    pub threshold: u32,
}

/// Rows whose stock is strictly below `threshold`.
pub fn low_stock_alerts(rows: &[VariantStockRow], threshold: u32) -> Vec<LowStockAlert> {
    rows.iter()
        .filter(|row| row.is_low_stock(threshold))
        .map(|row| LowStockAlert {
            store_id: row.store_id.clone(),
            product_name: row.product_name.clone(),
            sku: row.sku.clone(),
            stock: row.stock,
            threshold,
        })
        .collect()
}

/// Counts shown above the inventory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub total_rows: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
}

impl StockSummary {
    pub fn from_rows(rows: &[VariantStockRow], threshold: u32) -> Self {
        Self {
            total_rows: rows.len(),
            low_stock: rows.iter().filter(|r| r.is_low_stock(threshold)).count(),
            out_of_stock: rows.iter().filter(|r| r.is_out_of_stock()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use freshcart_catalog::{Pricing, Unit};

    use crate::batch::BatchStatus;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 9, 0, 0).unwrap()
    }

    fn qty(n: i64) -> Decimal {
        Decimal::from(n)
    }

    fn variant(sku: &str) -> Variant {
        Variant::new(sku, Decimal::ONE, Unit::Kg, Pricing::new(qty(120), qty(108)))
    }

    fn store_product(store: &str, product: &str, skus: &[&str]) -> StoreProduct {
        StoreProduct {
            id: format!("{store}-{product}").as_str().into(),
            store_id: store.into(),
            product_id: product.into(),
            product_name: format!("Product {product}"),
            variants: skus.iter().map(|s| variant(s)).collect(),
            is_active: true,
            is_featured: false,
        }
    }

    fn vb(store: &str, product: &str, sku: &str, n: i64) -> Batch {
        Batch::variant_specific(store.into(), product.into(), sku, qty(n))
    }

    fn sb(store: &str, product: &str, n: i64) -> Batch {
        Batch::shared(store.into(), product.into(), Some(Unit::Kg), qty(n))
    }

    fn stocks(rows: &[VariantStockRow]) -> Vec<(String, Decimal)> {
        rows.iter().map(|r| (r.sku.clone(), r.stock)).collect()
    }

    #[test]
    fn sums_variant_specific_batches_per_sku() {
        let sps = [store_product("s1", "rice", &["R1", "R5"])];
        let batches = [vb("s1", "rice", "R1", 10), vb("s1", "rice", "R1", 15), vb("s1", "rice", "R5", 3)];

        let rows = resolve_stock(&sps, &batches, now());
        assert_eq!(stocks(&rows), vec![("R1".into(), qty(25)), ("R5".into(), qty(3))]);
        assert!(rows.iter().all(|r| !r.shared_stock));
        assert_eq!(rows[0].discount, Decimal::new(1000, 2));
    }

    #[test]
    fn shared_pool_supersedes_variant_batches() {
        let sps = [store_product("s1", "dal", &["D500", "D1K", "D5K"])];
        let batches = [
            sb("s1", "dal", 40),
            sb("s1", "dal", 2),
            vb("s1", "dal", "D500", 99),
        ];

        let rows = resolve_stock(&sps, &batches, now());
        assert!(rows.iter().all(|r| r.stock == qty(42) && r.shared_stock));
    }

    #[test]
    fn exhausted_shared_pool_still_suppresses_variant_batches() {
        let sps = [store_product("s1", "oil", &["O1"])];
        let batches = [
            sb("s1", "oil", 10).with_status(BatchStatus::Depleted),
            vb("s1", "oil", "O1", 30),
        ];

        let rows = resolve_stock(&sps, &batches, now());
        assert_eq!(rows[0].stock, Decimal::ZERO);
        assert!(rows[0].shared_stock);
    }

    #[test]
    fn never_leaks_stock_across_stores() {
        let sps = [store_product("s1", "milk", &["M1"]), store_product("s2", "milk", &["M1"])];
        let batches = [vb("s1", "milk", "M1", 8), sb("s2", "milk", 50)];

        let rows = resolve_stock(&sps, &batches, now());
        assert_eq!(rows[0].stock, qty(8));
        assert!(!rows[0].shared_stock);
        assert_eq!(rows[1].stock, qty(50));
    }

    #[test]
    fn expired_and_inactive_batches_do_not_contribute() {
        let sps = [store_product("s1", "eggs", &["E12"])];
        let batches = [
            vb("s1", "eggs", "E12", 100).with_expiry(now() - Duration::days(1)),
            vb("s1", "eggs", "E12", 7).with_status(BatchStatus::Expired),
            vb("s1", "eggs", "E12", 9).with_status(BatchStatus::Depleted),
            vb("s1", "eggs", "E12", 5).with_expiry(now() + Duration::days(3)),
        ];

        let rows = resolve_stock(&sps, &batches, now());
        assert_eq!(rows[0].stock, qty(5));
    }

    #[test]
    fn inactive_store_products_are_skipped() {
        let mut sp = store_product("s1", "tea", &["T1"]);
        sp.is_active = false;
        let rows = resolve_stock(&[sp], &[vb("s1", "tea", "T1", 3)], now());
        assert!(rows.is_empty());
    }

    #[test]
    fn variant_without_batches_resolves_to_zero() {
        let sps = [store_product("s1", "salt", &["S1"])];
        let rows = resolve_stock(&sps, &[], now());
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_out_of_stock());
    }

    #[test]
    fn unavailable_flag_is_independent_of_stock() {
        let mut sp = store_product("s1", "jam", &["J1"]);
        sp.variants[0].is_available = false;
        let rows = resolve_stock(&[sp], &[vb("s1", "jam", "J1", 30)], now());
        assert_eq!(rows[0].stock, qty(30));
        assert!(!rows[0].is_available);
    }

    #[test]
    fn resolves_from_raw_records_skipping_malformed() {
        let sps = [store_product("s1", "rice", &["R1"])];
        let records: Vec<BatchRecord> = serde_json::from_str(
            r#"[
                { "store": "s1", "product": { "_id": "rice" }, "variantSku": "R1",
                  "initialQuantity": 20, "availableQuantity": 12, "status": "active" },
                { "product": "rice", "variantSku": "R1", "availableQuantity": 500, "status": "active" },
                { "store": "s1", "product": "rice", "variantSku": "R1",
                  "availableQuantity": 4, "status": "active", "expiryDate": "2026-06-14" }
            ]"#,
        )
        .unwrap();

        let rows = resolve_stock_records(&sps, &records, now());
        assert_eq!(rows[0].stock, qty(12));
    }

    #[test]
    fn shared_record_without_quantity_still_suppresses_variant_batches() {
        let sps = [store_product("s1", "dal", &["D1", "D2"])];
        let records: Vec<BatchRecord> = serde_json::from_str(
            r#"[
                { "store": "s1", "product": "dal", "usesSharedStock": true, "baseUnit": "kg",
                  "initialQuantity": 100, "status": "active" },
                { "store": "s1", "product": "dal", "variantSku": "D1",
                  "availableQuantity": 30, "status": "active" }
            ]"#,
        )
        .unwrap();

        let rows = resolve_stock_records(&sps, &records, now());
        assert!(rows.iter().all(|r| r.shared_stock));
        assert_eq!(stocks(&rows), vec![("D1".into(), qty(0)), ("D2".into(), qty(0))]);
    }

    #[test]
    fn padded_store_product_ids_still_match_batches() {
        let sps: Vec<StoreProduct> = serde_json::from_str(
            r#"[{ "_id": "sp-1", "storeId": " s1", "productId": "oil ", "productName": "Oil",
                  "variants": [{ "sku": "O1", "size": 1, "unit": "liter", "mrp": 200, "sellingPrice": 180 }] }]"#,
        )
        .unwrap();
        let records: Vec<BatchRecord> = serde_json::from_str(
            r#"[{ "store": { "_id": "s1 " }, "product": "oil", "variantSku": "O1",
                  "availableQuantity": 9, "status": "active" }]"#,
        )
        .unwrap();

        let rows = resolve_stock_records(&sps, &records, now());
        assert_eq!(stocks(&rows), vec![("O1".into(), qty(9))]);
    }

    #[test]
    fn low_stock_alerts_use_strict_threshold() {
        let sps = [store_product("s1", "rice", &["R1", "R2", "R3"])];
        let batches = [vb("s1", "rice", "R1", 19), vb("s1", "rice", "R2", 20)];

        let rows = resolve_stock(&sps, &batches, now());
        let alerts = low_stock_alerts(&rows, LOW_STOCK_THRESHOLD);
        let skus: Vec<_> = alerts.iter().map(|a| a.sku.as_str()).collect();
        assert_eq!(skus, vec!["R1", "R3"]);

        let summary = StockSummary::from_rows(&rows, LOW_STOCK_THRESHOLD);
        assert_eq!(summary, StockSummary { total_rows: 3, low_stock: 2, out_of_stock: 1 });
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn arb_batch() -> impl Strategy<Value = Batch> {
            (
                prop_oneof![Just("s1"), Just("s2")],
                prop_oneof![Just("A"), Just("B")],
                any::<bool>(),
                0i64..500,
                prop_oneof![
                    Just(BatchStatus::Active),
                    Just(BatchStatus::Expired),
                    Just(BatchStatus::Depleted)
                ],
                -5i64..5,
            )
                .prop_map(|(store, sku, shared, n, status, expiry_days)| {
                    let batch = if shared {
                        sb(store, "p", n)
                    } else {
                        vb(store, "p", sku, n)
                    };
                    batch
                        .with_status(status)
                        .with_expiry(now() + Duration::days(expiry_days))
                })
        }

        proptest! {
            #![proptest_config(ProptestConfig { cases: 500, ..ProptestConfig::default() })]

            /// Stock is non-negative and bounded by the contributing batches.
            #[test]
            fn stock_is_bounded(batches in prop::collection::vec(arb_batch(), 0..30)) {
                let sps = [store_product("s1", "p", &["A", "B"])];
                let rows = resolve_stock(&sps, &batches, now());
                let ceiling: Decimal = batches
                    .iter()
                    .filter(|b| b.store_id.as_str() == "s1")
                    .map(|b| b.contribution_at(now()))
                    .sum();

                for row in &rows {
                    prop_assert!(row.stock >= Decimal::ZERO);
                    prop_assert!(row.stock <= ceiling);
                }
            }

            /// Any shared batch forces identical stock across variants.
            #[test]
            fn shared_mode_is_uniform(batches in prop::collection::vec(arb_batch(), 0..30)) {
                let sps = [store_product("s1", "p", &["A", "B"])];
                let rows = resolve_stock(&sps, &batches, now());
                let any_shared = batches.iter().any(|b| b.is_shared() && b.store_id.as_str() == "s1");

                if any_shared {
                    prop_assert_eq!(rows[0].stock, rows[1].stock);
                    prop_assert!(rows.iter().all(|r| r.shared_stock));
                }
            }

            /// Expired batches contribute nothing regardless of quantity.
            #[test]
            fn expired_batches_never_count(n in 1i64..1000, days in 1i64..365) {
                let sps = [store_product("s1", "p", &["A"])];
                let batches = [vb("s1", "p", "A", n).with_expiry(now() - Duration::days(days))];
                let rows = resolve_stock(&sps, &batches, now());
                prop_assert_eq!(rows[0].stock, Decimal::ZERO);
            }
        }
    }
}
