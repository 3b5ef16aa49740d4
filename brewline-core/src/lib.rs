pub mod menu;
pub mod order;
pub mod repository;

pub use menu::{MenuPricing, Modifier, ModifierKind, StockAdjustment};
pub use order::{
    NewOrder, NewOrderLine, NewReview, OrderDetail, OrderDetailLine, OrderFilter, OrderHistoryEntry,
    OrderId, OrderStatus, OrderSummary, OrderTotals, Page, Paged,
};
pub use repository::{
    CatalogReader, OrderStore, PlacementSession, SessionState, SessionStore, StoreError, StoreResult,
};

/// Identifier of a registered customer or admin.
pub type UserId = i32;
