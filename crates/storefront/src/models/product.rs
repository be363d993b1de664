//! Catalog product types.

use serde::{Deserialize, Serialize};

use bestmarket_core::ProductId;

const DEFAULT_RATING: f64 = 4.0;

/// A catalog product.
///
/// Serialized in the camelCase shape the storefront frontend expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    /// Unit price in minor units.
    pub price: i64,
    /// Price before a sale, shown struck through.
    #[serde(default)]
    pub original_price: Option<i64>,
    #[serde(default)]
    pub image: String,
    pub category: String,
    #[serde(default = "default_rating")]
    pub rating: f64,
    #[serde(default)]
    pub reviews: u32,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    /// Units on hand. Checked on cart changes, never decremented.
    pub stock: u32,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub on_sale: bool,
}

const fn default_rating() -> f64 {
    DEFAULT_RATING
}

/// Query filters for listing products. Blank values are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub search: Option<String>,
}

impl ProductFilter {
    /// Category filter, if set and non-blank.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }

    /// Brand filter, if set and non-blank.
    #[must_use]
    pub fn brand(&self) -> Option<&str> {
        non_blank(self.brand.as_deref())
    }

    /// Search term, if set and non-blank.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        non_blank(self.search.as_deref())
    }

    /// Local matching: exact (case-insensitive) category and brand,
    /// inclusive price bounds, substring search over name and brand.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category()
            && !same_ignoring_case(&product.category, category)
        {
            return false;
        }
        if let Some(brand) = self.brand()
            && !same_ignoring_case(&product.brand, brand)
        {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min)
            || self.max_price.is_some_and(|max| product.price > max)
        {
            return false;
        }
        if let Some(term) = self.search() {
            let term = term.to_lowercase();
            return product.name.to_lowercase().contains(&term)
                || product.brand.to_lowercase().contains(&term);
        }
        true
    }
}

/// Unicode-aware case-insensitive equality.
fn same_ignoring_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Admin payload for creating or updating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub brand: String,
    pub price: i64,
    #[serde(default)]
    pub original_price: Option<i64>,
    #[serde(default)]
    pub image: String,
    pub category: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub colors: Option<Vec<String>>,
    #[serde(default)]
    pub sizes: Option<Vec<String>>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub reviews: Option<u32>,
    #[serde(default)]
    pub is_new: Option<bool>,
    #[serde(default)]
    pub on_sale: Option<bool>,
}

impl ProductInput {
    /// Check the fields a product cannot do without.
    ///
    /// # Errors
    ///
    /// Returns a client-facing message for the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Product name is required".to_owned());
        }
        if self.category.trim().is_empty() {
            return Err("Product category is required".to_owned());
        }
        if self.price < 0 || self.original_price.is_some_and(|p| p < 0) {
            return Err("Price cannot be negative".to_owned());
        }
        Ok(())
    }

    /// Build a new product, filling catalog defaults for omitted fields.
    #[must_use]
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            brand: self.brand,
            price: self.price,
            original_price: self.original_price,
            image: self.image,
            category: self.category,
            rating: self.rating.unwrap_or(DEFAULT_RATING),
            reviews: self.reviews.unwrap_or(0),
            colors: self.colors.unwrap_or_else(|| vec!["Default".to_owned()]),
            sizes: self.sizes.unwrap_or_else(|| vec!["One Size".to_owned()]),
            stock: self.stock,
            is_new: self.is_new.unwrap_or(true),
            on_sale: self.on_sale.unwrap_or(false),
        }
    }

    /// Overwrite the editable fields of an existing product.
    ///
    /// Colors and sizes are kept when omitted.
    pub fn apply_to(&self, product: &mut Product) {
        product.name.clone_from(&self.name);
        product.brand.clone_from(&self.brand);
        product.price = self.price;
        product.image.clone_from(&self.image);
        product.category.clone_from(&self.category);
        product.stock = self.stock;
        if let Some(colors) = &self.colors {
            product.colors.clone_from(colors);
        }
        if let Some(sizes) = &self.sizes {
            product.sizes.clone_from(sizes);
        }
    }
}
