use std::str::FromStr;
use std::sync::Arc;

use brewline_core::{
    NewReview, OrderDetail, OrderFilter, OrderHistoryEntry, OrderId, OrderStatus, OrderStore,
    OrderSummary, Page, Paged, SessionState, SessionStore, StoreError, UserId,
};
use tracing::{info, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Order administration and read paths: status changes, listings, history,
/// detail and reviews.
pub struct OrderManager {
    store: Arc<dyn OrderStore>,
    sessions: Arc<dyn SessionStore>,
    page_size: u32,
}

impl OrderManager {
    pub fn new(store: Arc<dyn OrderStore>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            sessions,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn page(&self, number: u32) -> Page {
        Page::new(number, self.page_size)
    }

    /// Status is checked against the allowed set before the store is touched.
    pub async fn update_status(&self, order_id: OrderId, status: &str) -> Result<OrderStatus, OrderError> {
        let status = OrderStatus::from_str(status.trim())
            .map_err(|_| OrderError::InvalidStatus(status.to_string()))?;

        let affected = self.store.update_order_status(order_id, status).await?;
        if affected == 0 {
            return Err(OrderError::NotFound(order_id.to_string()));
        }

        info!("Order {} moved to {}", order_id, status);
        Ok(status)
    }

    pub async fn list_orders(&self, filter: &OrderFilter, page: u32) -> Result<Paged<OrderSummary>, OrderError> {
        let page = self.page(page);
        let count = self.store.count_orders(filter).await?;
        let items = self.store.list_orders(filter, page).await?;

        Ok(Paged {
            items,
            page: page.number,
            total_pages: page.total_pages(count),
        })
    }

    pub async fn history(&self, user_id: UserId, page: u32) -> Result<Paged<OrderHistoryEntry>, OrderError> {
        let page = self.page(page);
        let count = self.store.count_history(user_id).await?;
        let items = self.store.list_history(user_id, page).await?;

        Ok(Paged {
            items,
            page: page.number,
            total_pages: page.total_pages(count),
        })
    }

    /// Only the owning user can see an order.
    pub async fn detail(&self, order_id: OrderId, user_id: UserId) -> Result<OrderDetail, OrderError> {
        self.store
            .order_detail(order_id, user_id)
            .await?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))
    }

    /// The caller's token must still be the one registered for the user.
    pub async fn add_review(&self, user_id: UserId, token: &str, review: NewReview) -> Result<(), OrderError> {
        match self.sessions.check_session(user_id, token).await? {
            SessionState::Valid => {}
            SessionState::Expired => return Err(OrderError::SessionExpired),
            SessionState::Mismatch => {
                warn!("Review rejected for user {}: token does not match session", user_id);
                return Err(OrderError::InvalidSession);
            }
        }

        if !(1..=5).contains(&review.rating) {
            return Err(OrderError::InvalidRating(review.rating));
        }

        let affected = self.store.add_review(&review).await?;
        if affected == 0 {
            return Err(OrderError::NotFound(format!("order line {}", review.order_line_id)));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Status is not valid: {0}")]
    InvalidStatus(String),

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(i16),

    #[error("Session expired, please login again")]
    SessionExpired,

    #[error("Invalid session, please login again")]
    InvalidSession,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
