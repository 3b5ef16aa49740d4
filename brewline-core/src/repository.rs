use async_trait::async_trait;

use crate::menu::{MenuPricing, Modifier, ModifierKind, StockAdjustment};
use crate::order::{
    NewOrder, NewOrderLine, NewReview, OrderDetail, OrderFilter, OrderHistoryEntry, OrderId,
    OrderStatus, OrderSummary, OrderTotals, Page,
};
use crate::UserId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("corrupt row in {table}: {reason}")]
    CorruptRow { table: &'static str, reason: String },
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Catalog reads performed inside a placement session
#[async_trait]
pub trait CatalogReader: Send {
    /// Reads a menu entry and holds it for the rest of the session.
    async fn menu_pricing(&mut self, menu_id: i32) -> StoreResult<Option<MenuPricing>>;

    async fn modifier(&mut self, kind: ModifierKind, id: i32) -> StoreResult<Option<Modifier>>;
}

/// A unit of work against the order store. Dropping a session without
/// committing discards every write made through it.
#[async_trait]
pub trait PlacementSession: CatalogReader {
    async fn insert_order(&mut self, header: &NewOrder) -> StoreResult<OrderId>;

    /// Applies the adjustment only if the stored stock still equals
    /// `expected_stock`. Returns the number of rows affected.
    async fn decrement_stock(&mut self, adjustment: &StockAdjustment) -> StoreResult<u64>;

    async fn insert_order_line(&mut self, line: &NewOrderLine) -> StoreResult<u64>;

    async fn update_order_totals(
        &mut self,
        order_id: OrderId,
        totals: &OrderTotals,
    ) -> StoreResult<u64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Repository trait for order data access
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn PlacementSession>>;

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<u64>;

    async fn add_review(&self, review: &NewReview) -> StoreResult<u64>;

    async fn count_orders(&self, filter: &OrderFilter) -> StoreResult<u64>;

    async fn list_orders(&self, filter: &OrderFilter, page: Page) -> StoreResult<Vec<OrderSummary>>;

    async fn count_history(&self, user_id: UserId) -> StoreResult<u64>;

    async fn list_history(&self, user_id: UserId, page: Page) -> StoreResult<Vec<OrderHistoryEntry>>;

    async fn order_detail(&self, id: OrderId, user_id: UserId) -> StoreResult<Option<OrderDetail>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Valid,
    Expired,
    Mismatch,
}

/// Access tokens currently registered per user
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn check_session(&self, user_id: UserId, token: &str) -> StoreResult<SessionState>;
}
