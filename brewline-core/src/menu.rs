use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Price, discount and stock of one menu entry, read at placement time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuPricing {
    pub menu_id: i32,
    pub price: Decimal,
    /// Percentage in the 0..=100 range.
    pub discount: Decimal,
    pub stock: i32,
}

/// Which modifier table an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModifierKind {
    Size,
    Type,
}

/// A size or type selection with the flat price delta it adds to a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modifier {
    pub id: i32,
    pub kind: ModifierKind,
    pub name: String,
    pub price: Decimal,
}

/// Compare-and-swap write of a menu's stock column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockAdjustment {
    pub menu_id: i32,
    pub expected_stock: i32,
    pub new_stock: i32,
}

impl StockAdjustment {
    /// Builds the adjustment for taking `quantity` units out of `pricing`.
    /// Returns `None` when the remaining stock would go negative.
    pub fn take(pricing: &MenuPricing, quantity: i32) -> Option<Self> {
        let remaining = pricing.stock.checked_sub(quantity)?;
        if remaining < 0 {
            return None;
        }
        Some(Self {
            menu_id: pricing.menu_id,
            expected_stock: pricing.stock,
            new_stock: remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pricing(stock: i32) -> MenuPricing {
        MenuPricing {
            menu_id: 7,
            price: Decimal::new(20000, 0),
            discount: Decimal::ZERO,
            stock,
        }
    }

    #[test]
    fn test_take_within_stock() {
        let adj = StockAdjustment::take(&pricing(10), 4).unwrap();
        assert_eq!(adj.expected_stock, 10);
        assert_eq!(adj.new_stock, 6);
    }

    #[test]
    fn test_take_entire_stock() {
        let adj = StockAdjustment::take(&pricing(3), 3).unwrap();
        assert_eq!(adj.new_stock, 0);
    }

    #[test]
    fn test_take_beyond_stock() {
        assert!(StockAdjustment::take(&pricing(1), 5).is_none());
    }
}
