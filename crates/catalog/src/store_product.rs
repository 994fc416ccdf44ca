use serde::{Deserialize, Serialize};

use freshcart_core::{Entity, ProductId, StoreId, StoreProductId};

use crate::variant::Variant;

/// Assignment of a product to a store, with store-specific variants/pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreProduct {
    #[serde(rename = "_id", alias = "id")]
    pub id: StoreProductId,
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

fn default_true() -> bool {
    true
}

impl StoreProduct {
    pub fn variant(&self, sku: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.matches_sku(sku))
    }

    pub fn has_variant(&self, sku: &str) -> bool {
        self.variant(sku).is_some()
    }
}

impl Entity for StoreProduct {
    type Id = StoreProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let json = r#"{
            "_id": "sp-1",
            "storeId": "store-1",
            "productId": "prod-1",
            "productName": "Basmati Rice",
            "variants": [
                { "sku": "RICE-1KG", "size": 1, "unit": "kg", "mrp": 100, "sellingPrice": 95 }
            ]
        }"#;
        let sp: StoreProduct = serde_json::from_str(json).unwrap();
        assert!(sp.is_active);
        assert!(!sp.is_featured);
        assert_eq!(sp.id().as_str(), "sp-1");
        assert!(sp.has_variant(" RICE-1KG"));
        assert!(sp.variant("RICE-5KG").is_none());
    }
}
