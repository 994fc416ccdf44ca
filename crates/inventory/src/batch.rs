//! Inventory batches: loose backend records and their typed form.
//!
//! Batch payloads arrive with optional, sometimes nested, references. They are
//! resolved once into [`Batch`], whose [`BatchKind`] says which stock a batch
//! feeds. Records that cannot be attributed are dropped here, so the resolver
//! never has to branch on field presence.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freshcart_catalog::Unit;
use freshcart_core::{BatchId, Money, ProductId, Quantity, StoreId};

/// Reference to another record: either a bare id or a populated object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordRef {
    Id(String),
    Object {
        #[serde(rename = "_id", alias = "id", default)]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

impl RecordRef {
    /// The referenced id, if present and non-blank.
    pub fn id(&self) -> Option<&str> {
        let raw = match self {
            RecordRef::Id(id) => Some(id.as_str()),
            RecordRef::Object { id, .. } => id.as_deref(),
        };
        raw.map(str::trim).filter(|id| !id.is_empty())
    }
}

/// Batch lifecycle status as recorded by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Active,
    Expired,
    Depleted,
    /// Missing or unrecognized status; never contributes stock.
    #[serde(other)]
    Unknown,
}

/// Batch payload as returned by the inventory service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: Option<String>,
    #[serde(alias = "storeId", default)]
    pub store: Option<RecordRef>,
    #[serde(alias = "productId", default)]
    pub product: Option<RecordRef>,
    #[serde(default)]
    pub uses_shared_stock: bool,
    #[serde(default)]
    pub variant_sku: Option<String>,
    #[serde(default)]
    pub base_unit: Option<String>,
    #[serde(default)]
    pub initial_quantity: Option<Decimal>,
    #[serde(default)]
    pub available_quantity: Option<Decimal>,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub status: Option<BatchStatus>,
}

/// Which stock a batch contributes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BatchKind {
    /// Feeds exactly one variant of the product.
    VariantSpecific { variant_sku: String },
    /// Feeds a pool shared by every variant of the product in the store.
    ///
    /// The base unit is informational; pooling does not depend on it.
    Shared { base_unit: Option<Unit> },
}

/// A resolved purchase batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: Option<BatchId>,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub kind: BatchKind,
    pub initial_quantity: Quantity,
    /// Never above `initial_quantity`, never negative.
    pub available_quantity: Quantity,
    /// Cost per base unit.
    pub cost_price: Money,
    pub expiry_date: Option<DateTime<Utc>>,
    pub status: BatchStatus,
}

impl Batch {
    /// Active, unexpired batch feeding a single variant.
    pub fn variant_specific(
        store_id: StoreId,
        product_id: ProductId,
        variant_sku: impl Into<String>,
        quantity: Quantity,
    ) -> Self {
        Self::with_kind(
            store_id,
            product_id,
            BatchKind::VariantSpecific {
                variant_sku: variant_sku.into(),
            },
            quantity,
        )
    }

    /// Active, unexpired batch feeding the product's shared pool.
    pub fn shared(
        store_id: StoreId,
        product_id: ProductId,
        base_unit: Option<Unit>,
        quantity: Quantity,
    ) -> Self {
        Self::with_kind(store_id, product_id, BatchKind::Shared { base_unit }, quantity)
    }

    fn with_kind(store_id: StoreId, product_id: ProductId, kind: BatchKind, quantity: Quantity) -> Self {
        let quantity = quantity.max(Decimal::ZERO);
        Self {
            id: None,
            store_id,
            product_id,
            kind,
            initial_quantity: quantity,
            available_quantity: quantity,
            cost_price: Decimal::ZERO,
            expiry_date: None,
            status: BatchStatus::Active,
        }
    }

    pub fn with_id(mut self, id: BatchId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_status(mut self, status: BatchStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry_date = Some(expiry);
        self
    }

    pub fn with_cost_price(mut self, cost_price: Money) -> Self {
        self.cost_price = cost_price;
        self
    }

    /// Set the remaining quantity (clamped to `[0, initial_quantity]`).
    pub fn with_available(mut self, available: Quantity) -> Self {
        self.available_quantity = available.max(Decimal::ZERO).min(self.initial_quantity);
        self
    }

    pub fn is_shared(&self) -> bool {
        matches!(self.kind, BatchKind::Shared { .. })
    }

    pub fn variant_sku(&self) -> Option<&str> {
        match &self.kind {
            BatchKind::VariantSpecific { variant_sku } => Some(variant_sku),
            BatchKind::Shared { .. } => None,
        }
    }

    /// An expiry strictly before `now` excludes the batch; no expiry never does.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date.is_some_and(|expiry| expiry < now)
    }

    /// Whether this batch's remaining quantity counts as sellable stock.
    pub fn contributes_at(&self, now: DateTime<Utc>) -> bool {
        self.status == BatchStatus::Active && !self.is_expired_at(now)
    }

    /// Quantity counted toward stock at `now` (zero when not contributing).
    pub fn contribution_at(&self, now: DateTime<Utc>) -> Quantity {
        if self.contributes_at(now) {
            self.available_quantity
        } else {
            Decimal::ZERO
        }
    }

    /// Purchase cost of the whole batch.
    pub fn total_cost(&self) -> Money {
        self.cost_price * self.initial_quantity
    }

    /// Resolve a loose backend record.
    ///
    /// Returns `None` when the record cannot be attributed: missing store or
    /// product reference, or a variant-mode batch without a SKU. Missing or
    /// negative quantities and unparseable expiry dates keep the batch with
    /// zero quantity and `Unknown` status.
    pub fn from_record(record: &BatchRecord) -> Option<Self> {
        let store_id = record.store.as_ref().and_then(RecordRef::id).map(StoreId::from)?;
        let product_id = record
            .product
            .as_ref()
            .and_then(RecordRef::id)
            .map(ProductId::from)?;

        let kind = if record.uses_shared_stock {
            BatchKind::Shared {
                base_unit: record.base_unit.as_deref().and_then(parse_unit),
            }
        } else {
            let sku = record
                .variant_sku
                .as_deref()
                .map(str::trim)
                .filter(|sku| !sku.is_empty())?;
            BatchKind::VariantSpecific {
                variant_sku: sku.to_string(),
            }
        };

        let quantities = record.available_quantity.and_then(|available| {
            let initial = record.initial_quantity.unwrap_or(available);
            (available >= Decimal::ZERO && initial >= Decimal::ZERO).then(|| (initial, available.min(initial)))
        });
        let expiry_date = match record.expiry_date.as_deref().map(str::trim) {
            None | Some("") => Some(None),
            Some(raw) => parse_expiry(raw).map(Some),
        };

        let mut batch = Self {
            id: record
                .id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .map(BatchId::from),
            store_id,
            product_id,
            kind,
            initial_quantity: Decimal::ZERO,
            available_quantity: Decimal::ZERO,
            cost_price: record.cost_price.unwrap_or(Decimal::ZERO),
            expiry_date: None,
            status: record.status.unwrap_or(BatchStatus::Unknown),
        };
        match (quantities, expiry_date) {
            (Some((initial, available)), Some(expiry_date)) => {
                batch.initial_quantity = initial;
                batch.available_quantity = available;
                batch.expiry_date = expiry_date;
            }
            // Kept with zero stock so a shared batch still puts the product in pooled mode.
            _ => {
                tracing::debug!(
                    batch_id = record.id.as_deref().unwrap_or("<none>"),
                    "batch record has unusable quantity or expiry; counting it as empty"
                );
                batch.status = BatchStatus::Unknown;
            }
        }
        Some(batch)
    }

    /// Resolve a set of records, dropping (and logging) the unusable ones.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a BatchRecord>) -> Vec<Self> {
        records
            .into_iter()
            .filter_map(|record| {
                let batch = Self::from_record(record);
                if batch.is_none() {
                    tracing::debug!(
                        batch_id = record.id.as_deref().unwrap_or("<none>"),
                        "skipping malformed batch record"
                    );
                }
                batch
            })
            .collect()
    }
}

fn parse_unit(raw: &str) -> Option<Unit> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "kg" => Some(Unit::Kg),
        "g" => Some(Unit::G),
        "ml" => Some(Unit::Ml),
        "liter" | "l" | "litre" => Some(Unit::Liter),
        "piece" | "pcs" => Some(Unit::Piece),
        "pack" => Some(Unit::Pack),
        _ => None,
    }
}

/// RFC 3339 timestamps, or bare dates taken as midnight UTC.
fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
