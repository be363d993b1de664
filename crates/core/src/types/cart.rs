//! Cart identity types: the browser session a cart belongs to, and the key of
//! a single cart line.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Placeholder used in item keys when a line has no color or size.
const DEFAULT_VARIANT: &str = "default";

/// Opaque cart session identifier chosen by the client.
///
/// Sessions are trusted at face value; the only requirement is that the
/// identifier is non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Parse a session identifier, trimming whitespace.
    ///
    /// Returns `None` for blank input.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        (!s.is_empty()).then(|| Self(s.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors parsing an [`ItemKey`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemKeyError {
    /// The key was blank.
    #[error("item key cannot be empty")]
    Empty,
    /// The key did not have the `product_color_size` shape.
    #[error("malformed item key: {0}")]
    Malformed(String),
}

/// Composite key of a cart line: product plus chosen color and size.
///
/// Rendered as `"{product_id}_{color}_{size}"`, with `default` standing in
/// for a missing color or size, e.g. `"3_Brown_default"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    /// Product on the line.
    pub product_id: ProductId,
    /// Chosen color, if any.
    pub color: Option<String>,
    /// Chosen size, if any.
    pub size: Option<String>,
}

impl ItemKey {
    /// Build a key, treating blank variants as absent.
    #[must_use]
    pub fn new(product_id: ProductId, color: Option<&str>, size: Option<&str>) -> Self {
        Self {
            product_id,
            color: normalize_variant(color),
            size: normalize_variant(size),
        }
    }

    /// Parse a key previously produced by `Display`.
    ///
    /// The product ID never contains `_`; the size is taken from the last
    /// segment so that colors may contain underscores.
    ///
    /// # Errors
    ///
    /// Returns `ItemKeyError` if the key is blank or lacks any of its parts.
    pub fn parse(s: &str) -> Result<Self, ItemKeyError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ItemKeyError::Empty);
        }

        let (product, rest) = s
            .split_once('_')
            .ok_or_else(|| ItemKeyError::Malformed(s.to_owned()))?;
        let (color, size) = rest
            .rsplit_once('_')
            .ok_or_else(|| ItemKeyError::Malformed(s.to_owned()))?;

        if product.is_empty() || color.is_empty() || size.is_empty() {
            return Err(ItemKeyError::Malformed(s.to_owned()));
        }

        Ok(Self::new(ProductId::new(product), Some(color), Some(size)))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.product_id,
            self.color.as_deref().unwrap_or(DEFAULT_VARIANT),
            self.size.as_deref().unwrap_or(DEFAULT_VARIANT)
        )
    }
}

impl Serialize for ItemKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ItemKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn normalize_variant(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != DEFAULT_VARIANT)
        .map(str::to_owned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_default_placeholder() {
        let key = ItemKey::new(ProductId::new("3"), Some("Brown"), None);
        assert_eq!(key.to_string(), "3_Brown_default");

        let key = ItemKey::new(ProductId::new("1"), Some(""), Some("  "));
        assert_eq!(key.to_string(), "1_default_default");
    }

    #[test]
    fn test_parse_restores_variants() {
        let key = ItemKey::parse("2_Light Blue_32").unwrap();
        assert_eq!(key.product_id, ProductId::new("2"));
        assert_eq!(key.color.as_deref(), Some("Light Blue"));
        assert_eq!(key.size.as_deref(), Some("32"));

        let key = ItemKey::parse("11_default_One Size").unwrap();
        assert_eq!(key.color, None);
        assert_eq!(key.size.as_deref(), Some("One Size"));
    }

    #[test]
    fn test_parse_color_with_underscore() {
        let key = ItemKey::parse("5_navy_blue_M").unwrap();
        assert_eq!(key.color.as_deref(), Some("navy_blue"));
        assert_eq!(key.size.as_deref(), Some("M"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(ItemKey::parse(""), Err(ItemKeyError::Empty));
        assert!(matches!(ItemKey::parse("7"), Err(ItemKeyError::Malformed(_))));
        assert!(matches!(ItemKey::parse("7_Red"), Err(ItemKeyError::Malformed(_))));
        assert!(matches!(ItemKey::parse("_Red_M"), Err(ItemKeyError::Malformed(_))));
    }

    #[test]
    fn test_session_id_rejects_blank() {
        assert!(SessionId::parse("  ").is_none());
        assert_eq!(SessionId::parse(" abc ").unwrap().as_str(), "abc");
    }
}
