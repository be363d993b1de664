//! Checkout pricing rules.
//!
//! All amounts are integers in the smallest currency unit (kobo for NGN).
//! Fractional results (percentage discounts, VAT) are rounded to the nearest
//! unit, halves away from zero.
//!
//! ```text
//! taxable  = subtotal - discount
//! tax      = 7.5% of taxable
//! shipping = 0 if taxable > 50_000 else 2_500
//! total    = taxable + tax + shipping
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Taxable amount above which shipping is free.
pub const FREE_SHIPPING_THRESHOLD: i64 = 50_000;

/// Flat shipping fee charged at or below the threshold.
pub const FLAT_SHIPPING_FEE: i64 = 2_500;

/// VAT rate in tenths of a percent (75 = 7.5%).
const TAX_RATE_PER_MILLE: i64 = 75;

/// Promo codes the store currently honours.
const PROMO_CODES: &[(&str, PromoKind, &str)] =
    &[("234567", PromoKind::Percentage(10), "10% off your order")];

/// How a promo code reduces the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoKind {
    /// Percentage of the subtotal (0-100).
    Percentage(u8),
    /// Fixed amount in minor units, capped at the subtotal.
    Fixed(i64),
}

impl PromoKind {
    /// Type tag reported to clients.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Percentage(_) => "percentage",
            Self::Fixed(_) => "fixed",
        }
    }

    /// The headline discount value (percent or minor units).
    #[must_use]
    pub const fn value(self) -> i64 {
        match self {
            Self::Percentage(p) => p as i64,
            Self::Fixed(amount) => amount,
        }
    }
}

/// A validated promo code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promo {
    /// The code as entered by the customer.
    pub code: String,
    /// Discount rule.
    pub kind: PromoKind,
    /// Human-readable description, e.g. "10% off your order".
    pub description: String,
}

impl Promo {
    /// Look up a promo code, ignoring surrounding whitespace.
    #[must_use]
    pub fn lookup(code: &str) -> Option<Self> {
        let code = code.trim();
        PROMO_CODES
            .iter()
            .find(|(c, _, _)| *c == code)
            .map(|(c, kind, description)| Self {
                code: (*c).to_owned(),
                kind: *kind,
                description: (*description).to_owned(),
            })
    }

    /// Discount this promo grants on `subtotal`.
    #[must_use]
    pub fn discount_on(&self, subtotal: i64) -> i64 {
        let subtotal = subtotal.max(0);
        match self.kind {
            PromoKind::Percentage(pct) => {
                let pct = i64::from(pct.min(100));
                round_to_unit(Decimal::from(subtotal) * Decimal::from(pct) / Decimal::from(100))
            }
            PromoKind::Fixed(amount) => amount.clamp(0, subtotal),
        }
    }
}

/// Computed order totals, all in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: i64,
    pub discount: i64,
    pub tax: i64,
    pub shipping: i64,
    pub total: i64,
}

impl Totals {
    /// Compute totals for a subtotal and an optional promo.
    #[must_use]
    pub fn compute(subtotal: i64, promo: Option<&Promo>) -> Self {
        let discount = promo.map_or(0, |p| p.discount_on(subtotal));
        let taxable = subtotal.saturating_sub(discount);
        let tax = tax_on(taxable);
        let shipping = shipping_for(taxable);

        Self {
            subtotal,
            discount,
            tax,
            shipping,
            total: taxable.saturating_add(tax).saturating_add(shipping),
        }
    }

    /// Compute totals from `(unit price, quantity)` lines.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = (i64, u32)>, promo: Option<&Promo>) -> Self {
        Self::compute(subtotal(lines), promo)
    }
}

/// Sum of unit price times quantity.
#[must_use]
pub fn subtotal(lines: impl IntoIterator<Item = (i64, u32)>) -> i64 {
    lines.into_iter().fold(0_i64, |acc, (price, quantity)| {
        acc.saturating_add(price.saturating_mul(i64::from(quantity)))
    })
}

/// VAT on a taxable amount.
#[must_use]
pub fn tax_on(taxable: i64) -> i64 {
    round_to_unit(Decimal::from(taxable) * Decimal::new(TAX_RATE_PER_MILLE, 3))
}

/// Shipping fee for a taxable amount.
#[must_use]
pub const fn shipping_for(taxable: i64) -> i64 {
    if taxable > FREE_SHIPPING_THRESHOLD {
        0
    } else {
        FLAT_SHIPPING_FEE
    }
}

/// Convert a gateway amount in kobo to whole naira, rounding half away
/// from zero like every other priced amount.
#[must_use]
pub fn kobo_to_naira(kobo: i64) -> i64 {
    round_to_unit(Decimal::new(kobo, 2))
}

fn round_to_unit(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kobo_to_naira_rounds() {
        assert_eq!(kobo_to_naira(2_550_000), 25_500);
        assert_eq!(kobo_to_naira(12_349), 123);
        assert_eq!(kobo_to_naira(12_350), 124);
        assert_eq!(kobo_to_naira(99), 1);
        assert_eq!(kobo_to_naira(0), 0);
    }

    #[test]
    fn test_totals_below_free_shipping() {
        // 2 x 18000 = 36000; tax 2700; shipping 2500
        let totals = Totals::from_lines([(18_000, 2)], None);
        assert_eq!(totals.subtotal, 36_000);
        assert_eq!(totals.discount, 0);
        assert_eq!(totals.tax, 2_700);
        assert_eq!(totals.shipping, FLAT_SHIPPING_FEE);
        assert_eq!(totals.total, 36_000 + 2_700 + 2_500);
    }

    #[test]
    fn test_totals_above_free_shipping() {
        let totals = Totals::from_lines([(28_000, 1), (48_000, 1)], None);
        assert_eq!(totals.subtotal, 76_000);
        assert_eq!(totals.tax, 5_700);
        assert_eq!(totals.shipping, 0);
        assert_eq!(totals.total, 81_700);
    }

    #[test]
    fn test_shipping_threshold_is_exclusive() {
        assert_eq!(shipping_for(50_000), FLAT_SHIPPING_FEE);
        assert_eq!(shipping_for(50_001), 0);
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        // 7.5% of 10 = 0.75 -> 1; 7.5% of 6 = 0.45 -> 0; 7.5% of 20 = 1.5 -> 2
        assert_eq!(tax_on(10), 1);
        assert_eq!(tax_on(6), 0);
        assert_eq!(tax_on(20), 2);
    }

    #[test]
    fn test_percentage_promo_applies_before_tax_and_shipping() {
        let promo = Promo::lookup(" 234567 ").unwrap();
        // 55000 - 5500 = 49500 taxable, below the free shipping threshold
        let totals = Totals::compute(55_000, Some(&promo));
        assert_eq!(totals.discount, 5_500);
        assert_eq!(totals.tax, 3_713);
        assert_eq!(totals.shipping, FLAT_SHIPPING_FEE);
        assert_eq!(totals.total, 49_500 + 3_713 + 2_500);
    }

    #[test]
    fn test_fixed_promo_is_capped() {
        let promo = Promo {
            code: "FIXED".to_owned(),
            kind: PromoKind::Fixed(10_000),
            description: "flat".to_owned(),
        };
        assert_eq!(promo.discount_on(4_000), 4_000);
        assert_eq!(promo.discount_on(25_000), 10_000);
    }

    #[test]
    fn test_unknown_promo() {
        assert!(Promo::lookup("NOPE").is_none());
        let promo = Promo::lookup("234567").unwrap();
        assert_eq!(promo.kind.type_name(), "percentage");
        assert_eq!(promo.kind.value(), 10);
    }
}
