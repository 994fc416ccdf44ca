use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freshcart_core::{DomainError, DomainResult, Money, ValueObject, round_2dp};

/// Unit a variant is declared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Kg,
    G,
    Ml,
    Liter,
    Piece,
    Pack,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Kg => "kg",
            Unit::G => "g",
            Unit::Ml => "ml",
            Unit::Liter => "liter",
            Unit::Piece => "piece",
            Unit::Pack => "pack",
        }
    }
}

impl core::fmt::Display for Unit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MRP and selling price of a variant.
///
/// There is no discount field: it is always derived, see [`Pricing::discount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub mrp: Money,
    pub selling_price: Money,
}

impl ValueObject for Pricing {}

impl Pricing {
    pub fn new(mrp: Money, selling_price: Money) -> Self {
        Self { mrp, selling_price }
    }

    pub fn discount(&self) -> Decimal {
        discount_percent(self.mrp, self.selling_price)
    }
}

/// Discount percentage `(mrp - selling_price) / mrp * 100`, 2 decimal places.
///
/// Clamped to zero when the selling price exceeds the MRP; zero when the MRP
/// is zero or negative.
pub fn discount_percent(mrp: Money, selling_price: Money) -> Decimal {
    if mrp <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let off = (mrp - selling_price) / mrp * Decimal::ONE_HUNDRED;
    round_2dp(off.max(Decimal::ZERO))
}

/// A sellable package size of a product (e.g. "Rice 5 kg").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    /// Unique within the product.
    pub sku: String,
    pub size: Decimal,
    pub unit: Unit,
    #[serde(flatten)]
    pub pricing: Pricing,
    /// Operator toggle; independent of computed stock.
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

impl Variant {
    pub fn new(sku: impl Into<String>, size: Decimal, unit: Unit, pricing: Pricing) -> Self {
        Self {
            sku: sku.into(),
            size,
            unit,
            pricing,
            is_available: true,
        }
    }

    pub fn mrp(&self) -> Money {
        self.pricing.mrp
    }

    pub fn selling_price(&self) -> Money {
        self.pricing.selling_price
    }

    pub fn discount(&self) -> Decimal {
        self.pricing.discount()
    }

    /// SKU comparison key (trimmed; SKUs are case-sensitive).
    pub fn sku_key(&self) -> String {
        normalize_sku(&self.sku)
    }

    /// Whether `sku` names this variant.
    pub fn matches_sku(&self, sku: &str) -> bool {
        self.sku_key() == normalize_sku(sku)
    }

    /// Label shown in tables, e.g. "5 kg".
    pub fn size_label(&self) -> String {
        format!("{} {}", self.size.normalize(), self.unit)
    }
}

fn normalize_sku(sku: &str) -> String {
    sku.trim().to_string()
}

/// Validate a variant list before a create/update request.
///
/// Returns the first violation found.
pub fn validate_variants(variants: &[Variant]) -> DomainResult<()> {
    if variants.is_empty() {
        return Err(DomainError::validation("at least one variant is required"));
    }

    let mut seen = HashSet::new();
    for variant in variants {
        if variant.sku.trim().is_empty() {
            return Err(DomainError::validation("variant sku cannot be empty"));
        }
        if !seen.insert(variant.sku_key()) {
            return Err(DomainError::validation(format!(
                "duplicate variant sku: {}",
                variant.sku.trim()
            )));
        }
        if variant.size <= Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "variant {}: size must be positive",
                variant.sku
            )));
        }
        if variant.mrp() < Decimal::ZERO || variant.selling_price() < Decimal::ZERO {
            return Err(DomainError::validation(format!(
                "variant {}: prices cannot be negative",
                variant.sku
            )));
        }
        if variant.selling_price() > variant.mrp() {
            return Err(DomainError::validation(format!(
                "variant {}: selling price cannot exceed MRP",
                variant.sku
            )));
        }
    }

    Ok(())
}
