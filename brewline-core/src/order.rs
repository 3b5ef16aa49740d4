use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::UserId;

pub type OrderId = Uuid;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OrderStatus {
    #[default]
    Pending,
    Done,
    Canceled,
}

/// Header written at the start of a placement, before totals are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub shipping: String,
    pub payment_id: i32,
    pub user_id: UserId,
}

/// One priced cart line, ready to be persisted under its order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
    pub order_id: OrderId,
    pub menu_id: i32,
    pub quantity: i32,
    pub size_id: i32,
    pub type_id: i32,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    pub order_line_id: i32,
    pub rating: i16,
}

/// Admin listing row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    /// Aggregated `"<product> - <qty>x"` entries joined by `", "`.
    pub items: String,
    pub status: OrderStatus,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderHistoryEntry {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub payment_method: Option<String>,
    pub shipping: String,
    pub status: OrderStatus,
    pub tax: Decimal,
    pub total: Decimal,
    pub lines: Vec<OrderDetailLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetailLine {
    pub id: i32,
    pub item_name: String,
    pub size: String,
    pub kind: String,
    pub quantity: i32,
    pub subtotal: Decimal,
    pub images: Vec<String>,
}

/// Admin listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub order_id: Option<OrderId>,
}

/// A 1-based page request. Page 0 is read as the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }

    pub fn total_pages(&self, count: u64) -> u64 {
        count.div_ceil(u64::from(self.size))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!(OrderStatus::from_str("Done").unwrap(), OrderStatus::Done);
        assert_eq!(OrderStatus::from_str("CANCELED").unwrap(), OrderStatus::Canceled);
        assert!(OrderStatus::from_str("shipped").is_err());
        assert_eq!(OrderStatus::Pending.as_ref(), "pending");
    }

    #[test]
    fn test_new_orders_start_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_page_math() {
        let first = Page::new(0, 5);
        assert_eq!(first.number, 1);
        assert_eq!(first.offset(), 0);

        let third = Page::new(3, 5);
        assert_eq!(third.offset(), 10);
        assert_eq!(third.total_pages(11), 3);
        assert_eq!(third.total_pages(10), 2);
        assert_eq!(third.total_pages(0), 0);
    }
}
