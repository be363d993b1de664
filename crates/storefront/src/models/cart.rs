//! Cart line type.

use serde::{Deserialize, Serialize};

use bestmarket_core::{ItemKey, ProductId};

use super::Product;

/// One line of a session cart: a product variant, its quantity, and a
/// snapshot of the product for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_key: ItemKey,
    pub product_id: ProductId,
    pub name: String,
    pub brand: String,
    pub price: i64,
    #[serde(rename = "originalPrice", default)]
    pub original_price: Option<i64>,
    #[serde(default)]
    pub image: String,
    pub quantity: u32,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub stock: u32,
}

impl CartLine {
    /// Snapshot `product` into a new line for `key`.
    #[must_use]
    pub fn new(product: &Product, key: ItemKey, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            name: product.name.clone(),
            brand: product.brand.clone(),
            price: product.price,
            original_price: product.original_price,
            image: product.image.clone(),
            quantity,
            size: key.size.clone(),
            color: key.color.clone(),
            stock: product.stock,
            item_key: key,
        }
    }

    /// `(unit price, quantity)` pair for pricing.
    #[must_use]
    pub const fn priced(&self) -> (i64, u32) {
        (self.price, self.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_serializes_in_frontend_shape() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "3", "name": "Leather Jacket", "brand": "Urban Edge",
            "price": 85000, "category": "Outerwear", "stock": 8
        }))
        .unwrap();
        let key = ItemKey::new(product.id.clone(), Some("Brown"), Some("M"));
        let line = CartLine::new(&product, key, 2);

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["item_key"], "3_Brown_M");
        assert_eq!(json["product_id"], "3");
        assert_eq!(json["quantity"], 2);
        assert_eq!(json["color"], "Brown");
        assert!(json["originalPrice"].is_null());

        let back: CartLine = serde_json::from_value(json).unwrap();
        assert_eq!(back, line);
    }
}
