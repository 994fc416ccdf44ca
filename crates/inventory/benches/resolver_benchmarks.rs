use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use freshcart_catalog::{Pricing, StoreProduct, Unit, Variant};
use freshcart_inventory::{Batch, BatchStatus, resolve_stock};

/// `products` store products across 4 stores, 3 variants each; every third
/// product is shared-stock, every fifth batch is expired.
fn fixture(products: usize, batches_per_product: usize) -> (Vec<StoreProduct>, Vec<Batch>) {
    let now = Utc::now();
    let mut store_products = Vec::with_capacity(products);
    let mut batches = Vec::with_capacity(products * batches_per_product);

    for p in 0..products {
        let store = format!("store-{}", p % 4);
        let product = format!("product-{p}");
        let skus: Vec<String> = (0..3).map(|v| format!("P{p}-V{v}")).collect();

        store_products.push(StoreProduct {
            id: format!("sp-{p}").as_str().into(),
            store_id: store.as_str().into(),
            product_id: product.as_str().into(),
            product_name: format!("Product {p}"),
            variants: skus
                .iter()
                .map(|sku| {
                    Variant::new(
                        sku.clone(),
                        Decimal::ONE,
                        Unit::Piece,
                        Pricing::new(Decimal::from(100), Decimal::from(90)),
                    )
                })
                .collect(),
            is_active: true,
            is_featured: false,
        });

        for b in 0..batches_per_product {
            let qty = Decimal::from((b % 40) as i64 + 1);
            let batch = if p % 3 == 0 {
                Batch::shared(store.as_str().into(), product.as_str().into(), Some(Unit::Kg), qty)
            } else {
                Batch::variant_specific(
                    store.as_str().into(),
                    product.as_str().into(),
                    skus[b % skus.len()].clone(),
                    qty,
                )
            };
            let batch = if b % 5 == 0 {
                batch.with_expiry(now - Duration::days(1))
            } else {
                batch.with_status(BatchStatus::Active)
            };
            batches.push(batch);
        }
    }

    (store_products, batches)
}

fn bench_resolve_stock(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_stock");

    for products in [100usize, 1_000, 5_000] {
        let (store_products, batches) = fixture(products, 8);
        let now = Utc::now();
        group.throughput(Throughput::Elements(batches.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(products), &products, |b, _| {
            b.iter(|| black_box(resolve_stock(black_box(&store_products), black_box(&batches), now)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve_stock);
criterion_main!(benches);
