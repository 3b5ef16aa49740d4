use brewline_core::{MenuPricing, Modifier, OrderTotals};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// How size and type surcharges scale with the line quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ModifierCharge {
    /// Added once per line regardless of quantity.
    #[default]
    PerLine,
    /// Multiplied by the line quantity.
    PerUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Applied to the order subtotal, not per line.
    #[serde(default = "default_tax_rate")]
    pub tax_rate: Decimal,

    #[serde(default)]
    pub modifier_charge: ModifierCharge,

    /// Decimal places money is rounded to.
    #[serde(default = "default_scale")]
    pub scale: u32,
}

fn default_tax_rate() -> Decimal {
    Decimal::new(10, 2)
}

fn default_scale() -> u32 {
    2
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
            modifier_charge: ModifierCharge::default(),
            scale: default_scale(),
        }
    }
}

/// Breakdown of one priced cart line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub menu_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub modifiers: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("menu {menu_id} has discount {discount} outside 0..=100")]
    DiscountOutOfRange { menu_id: i32, discount: Decimal },

    #[error("menu {menu_id} has negative price {price}")]
    NegativePrice { menu_id: i32, price: Decimal },

    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("line amount overflowed for menu {0}")]
    Overflow(i32),

    #[error("order amount overflowed")]
    OrderOverflow,
}

/// Cart pricing: discounts, modifier surcharges, tax
#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Discount per unit. The stored discount is a percentage, so a value of
    /// 10 takes 10% off the base price.
    pub fn discount_amount(&self, menu: &MenuPricing) -> Result<Decimal, PricingError> {
        if menu.discount < Decimal::ZERO || menu.discount > Decimal::ONE_HUNDRED {
            return Err(PricingError::DiscountOutOfRange {
                menu_id: menu.menu_id,
                discount: menu.discount,
            });
        }
        if menu.price < Decimal::ZERO {
            return Err(PricingError::NegativePrice {
                menu_id: menu.menu_id,
                price: menu.price,
            });
        }

        let amount = menu
            .price
            .checked_mul(menu.discount)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or(PricingError::Overflow(menu.menu_id))?;
        Ok(self.round(amount))
    }

    /// `(price - discount) * quantity + size + type`
    pub fn price_line(
        &self,
        menu: &MenuPricing,
        quantity: i32,
        size: &Modifier,
        kind: &Modifier,
    ) -> Result<PricedLine, PricingError> {
        if quantity < 1 {
            return Err(PricingError::InvalidQuantity(quantity));
        }

        let discount_amount = self.discount_amount(menu)?;
        let qty = Decimal::from(quantity);

        let modifiers = size
            .price
            .checked_add(kind.price)
            .ok_or(PricingError::Overflow(menu.menu_id))?;
        let modifiers = match self.config.modifier_charge {
            ModifierCharge::PerLine => modifiers,
            ModifierCharge::PerUnit => modifiers
                .checked_mul(qty)
                .ok_or(PricingError::Overflow(menu.menu_id))?,
        };

        let subtotal = (menu.price - discount_amount)
            .checked_mul(qty)
            .and_then(|v| v.checked_add(modifiers))
            .ok_or(PricingError::Overflow(menu.menu_id))?;

        Ok(PricedLine {
            menu_id: menu.menu_id,
            quantity,
            unit_price: menu.price,
            discount_amount,
            modifiers,
            subtotal: self.round(subtotal),
        })
    }

    /// Tax is taken once over the whole subtotal.
    pub fn totals(&self, subtotal: Decimal) -> Result<OrderTotals, PricingError> {
        let subtotal = self.round(subtotal);
        let tax = subtotal
            .checked_mul(self.config.tax_rate)
            .map(|v| self.round(v))
            .ok_or(PricingError::OrderOverflow)?;
        let total = subtotal.checked_add(tax).ok_or(PricingError::OrderOverflow)?;
        Ok(OrderTotals { subtotal, tax, total })
    }

    /// Adds a priced line to a running order subtotal.
    pub fn accumulate(&self, subtotal: Decimal, line: &PricedLine) -> Result<Decimal, PricingError> {
        subtotal.checked_add(line.subtotal).ok_or(PricingError::OrderOverflow)
    }

    fn round(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.config.scale, RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewline_core::ModifierKind;
    use rust_decimal_macros::dec;

    fn menu(price: Decimal, discount: Decimal) -> MenuPricing {
        MenuPricing {
            menu_id: 5,
            price,
            discount,
            stock: 10,
        }
    }

    fn modifier(kind: ModifierKind, price: Decimal) -> Modifier {
        Modifier {
            id: 1,
            kind,
            name: "regular".to_string(),
            price,
        }
    }

    #[test]
    fn test_discount_is_a_percentage() {
        let engine = PricingEngine::default();
        let amount = engine.discount_amount(&menu(dec!(20000), dec!(10))).unwrap();
        assert_eq!(amount, dec!(2000));
    }

    #[test]
    fn test_discount_out_of_range_rejected() {
        let engine = PricingEngine::default();
        let err = engine.discount_amount(&menu(dec!(20000), dec!(150))).unwrap_err();
        assert!(matches!(err, PricingError::DiscountOutOfRange { menu_id: 5, .. }));

        let err = engine.discount_amount(&menu(dec!(20000), dec!(-1))).unwrap_err();
        assert!(matches!(err, PricingError::DiscountOutOfRange { .. }));
    }

    #[test]
    fn test_line_with_flat_modifiers() {
        let engine = PricingEngine::default();
        let line = engine
            .price_line(
                &menu(dec!(20000), dec!(10)),
                2,
                &modifier(ModifierKind::Size, dec!(3000)),
                &modifier(ModifierKind::Type, dec!(1500)),
            )
            .unwrap();

        // (20000 - 2000) * 2 + 3000 + 1500
        assert_eq!(line.subtotal, dec!(40500));
        assert_eq!(line.modifiers, dec!(4500));
    }

    #[test]
    fn test_line_with_per_unit_modifiers() {
        let engine = PricingEngine::new(PricingConfig {
            modifier_charge: ModifierCharge::PerUnit,
            ..PricingConfig::default()
        });
        let line = engine
            .price_line(
                &menu(dec!(20000), dec!(10)),
                2,
                &modifier(ModifierKind::Size, dec!(3000)),
                &modifier(ModifierKind::Type, dec!(1500)),
            )
            .unwrap();

        assert_eq!(line.subtotal, dec!(45000));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let engine = PricingEngine::default();
        let err = engine
            .price_line(
                &menu(dec!(100), dec!(0)),
                0,
                &modifier(ModifierKind::Size, dec!(0)),
                &modifier(ModifierKind::Type, dec!(0)),
            )
            .unwrap_err();
        assert_eq!(err, PricingError::InvalidQuantity(0));
    }

    #[test]
    fn test_totals_round_tax() {
        let engine = PricingEngine::default();
        let totals = engine.totals(dec!(12.35)).unwrap();
        assert_eq!(totals.tax, dec!(1.24));
        assert_eq!(totals.total, dec!(13.59));

        let totals = engine.totals(dec!(36000)).unwrap();
        assert_eq!(totals.tax, dec!(3600));
        assert_eq!(totals.total, dec!(39600));
    }

    #[test]
    fn test_huge_modifiers_overflow_instead_of_panicking() {
        let engine = PricingEngine::default();
        let err = engine
            .price_line(
                &menu(dec!(1), dec!(0)),
                1,
                &modifier(ModifierKind::Size, Decimal::MAX),
                &modifier(ModifierKind::Type, dec!(1)),
            )
            .unwrap_err();
        assert_eq!(err, PricingError::Overflow(5));
    }

    #[test]
    fn test_huge_order_totals_overflow_instead_of_panicking() {
        let engine = PricingEngine::default();
        assert_eq!(engine.totals(Decimal::MAX).unwrap_err(), PricingError::OrderOverflow);

        let line = engine
            .price_line(
                &menu(dec!(1), dec!(0)),
                1,
                &modifier(ModifierKind::Size, dec!(0)),
                &modifier(ModifierKind::Type, dec!(0)),
            )
            .unwrap();
        assert_eq!(engine.accumulate(dec!(10), &line).unwrap(), dec!(11));
        assert_eq!(engine.accumulate(Decimal::MAX, &line).unwrap_err(), PricingError::OrderOverflow);
    }
}
