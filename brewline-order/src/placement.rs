use std::sync::Arc;
use std::time::Duration;

use brewline_catalog::{PricedLine, PricingEngine, PricingError};
use brewline_core::{
    Modifier, ModifierKind, NewOrder, NewOrderLine, OrderId, OrderStore, OrderTotals,
    PlacementSession, StockAdjustment, StoreError, UserId,
};
use rust_decimal::Decimal;
use serde::Serialize;
use strum::Display;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, warn};

use crate::cart::{Cart, CartValidationError, ValidLine};

pub const DEFAULT_PLACEMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Writes whose affected-row count is checked during placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum WriteOp {
    StockUpdate,
    LineInsert,
    TotalsUpdate,
}

#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    #[error(transparent)]
    Validation(#[from] CartValidationError),

    #[error("menu {0} not found")]
    MenuNotFound(i32),

    #[error("{kind} modifier {id} not found")]
    ModifierNotFound { kind: ModifierKind, id: i32 },

    #[error("insufficient stock for menu {menu_id}: requested {requested}, available {available}")]
    InsufficientStock {
        menu_id: i32,
        requested: i32,
        available: i32,
    },

    #[error("no rows affected by {operation} on {key}")]
    NoRowsUpdated { operation: WriteOp, key: String },

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("commit failed: {0}")]
    Commit(#[source] StoreError),

    #[error("placement timed out after {0:?}")]
    TimedOut(Duration),
}

impl PlacementError {
    /// Whether the caller may resubmit the same cart unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlacementError::Store(_) | PlacementError::Commit(_) | PlacementError::TimedOut(_)
        )
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PlacementError::Validation(_) => "validation",
            PlacementError::MenuNotFound(_) | PlacementError::ModifierNotFound { .. } => "not_found",
            PlacementError::InsufficientStock { .. } => "insufficient_stock",
            PlacementError::NoRowsUpdated { .. } => "consistency",
            PlacementError::Pricing(_) => "pricing",
            PlacementError::Store(_) | PlacementError::Commit(_) => "store",
            PlacementError::TimedOut(_) => "timeout",
        }
    }
}

/// Result of a committed placement
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub lines: Vec<PricedLine>,
    pub totals: OrderTotals,
}

/// Prices a cart and persists it as one order, all or nothing
pub struct PlacementEngine {
    store: Arc<dyn OrderStore>,
    pricing: PricingEngine,
    timeout: Duration,
}

impl PlacementEngine {
    pub fn new(store: Arc<dyn OrderStore>, pricing: PricingEngine) -> Self {
        Self {
            store,
            pricing,
            timeout: DEFAULT_PLACEMENT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    /// Validates the cart, then runs the placement in a single session.
    /// Any failure, timeout included, leaves no order, line or stock change
    /// behind. The deadline covers everything before commit; commit itself
    /// is never cut short.
    pub async fn place_order(&self, cart: &Cart, user_id: UserId) -> Result<PlacedOrder, PlacementError> {
        let cart = cart.validate()?;
        let header = NewOrder {
            shipping: cart.shipping,
            payment_id: cart.payment_id,
            user_id,
        };
        let deadline = Instant::now() + self.timeout;

        let mut session = match timeout_at(deadline, self.store.begin()).await {
            Ok(session) => session?,
            Err(_) => return Err(self.timed_out(user_id)),
        };

        let outcome = match timeout_at(deadline, self.apply(session.as_mut(), &header, &cart.lines)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(self.timed_out(user_id)),
        };

        match outcome {
            Ok(placed) => {
                session.commit().await.map_err(PlacementError::Commit)?;
                info!(
                    "Order {} placed for user {}: {} line(s), total {}",
                    placed.order_id,
                    user_id,
                    placed.lines.len(),
                    placed.totals.total
                );
                Ok(placed)
            }
            Err(err) => {
                match &err {
                    PlacementError::NoRowsUpdated { operation, key } => {
                        error!("Placement for user {} aborted: {} affected no rows on {}", user_id, operation, key)
                    }
                    PlacementError::TimedOut(_) => {}
                    other => warn!("Placement for user {} rejected: {}", user_id, other),
                }
                if let Err(rollback_err) = session.rollback().await {
                    error!("Rollback failed for user {}: {}", user_id, rollback_err);
                }
                Err(err)
            }
        }
    }

    fn timed_out(&self, user_id: UserId) -> PlacementError {
        warn!("Order placement for user {} timed out after {:?}", user_id, self.timeout);
        PlacementError::TimedOut(self.timeout)
    }

    async fn apply(
        &self,
        session: &mut dyn PlacementSession,
        header: &NewOrder,
        lines: &[ValidLine],
    ) -> Result<PlacedOrder, PlacementError> {
        let order_id = session.insert_order(header).await?;

        let mut priced = Vec::with_capacity(lines.len());
        let mut subtotal = Decimal::ZERO;

        // Strictly sequential: a later line on the same menu must see the
        // stock left by the earlier one.
        for line in lines {
            let menu = session
                .menu_pricing(line.menu_id)
                .await?
                .ok_or(PlacementError::MenuNotFound(line.menu_id))?;
            let size = fetch_modifier(session, ModifierKind::Size, line.size_id).await?;
            let kind = fetch_modifier(session, ModifierKind::Type, line.type_id).await?;

            let priced_line = self.pricing.price_line(&menu, line.quantity, &size, &kind)?;

            let adjustment = StockAdjustment::take(&menu, line.quantity).ok_or(
                PlacementError::InsufficientStock {
                    menu_id: menu.menu_id,
                    requested: line.quantity,
                    available: menu.stock,
                },
            )?;
            if session.decrement_stock(&adjustment).await? == 0 {
                return Err(PlacementError::NoRowsUpdated {
                    operation: WriteOp::StockUpdate,
                    key: format!("menu {}", menu.menu_id),
                });
            }

            let row = NewOrderLine {
                order_id,
                menu_id: line.menu_id,
                quantity: line.quantity,
                size_id: line.size_id,
                type_id: line.type_id,
                subtotal: priced_line.subtotal,
            };
            if session.insert_order_line(&row).await? == 0 {
                return Err(PlacementError::NoRowsUpdated {
                    operation: WriteOp::LineInsert,
                    key: format!("order {} menu {}", order_id, line.menu_id),
                });
            }

            subtotal = self.pricing.accumulate(subtotal, &priced_line)?;
            priced.push(priced_line);
        }

        let totals = self.pricing.totals(subtotal)?;
        if session.update_order_totals(order_id, &totals).await? == 0 {
            return Err(PlacementError::NoRowsUpdated {
                operation: WriteOp::TotalsUpdate,
                key: format!("order {}", order_id),
            });
        }

        Ok(PlacedOrder {
            order_id,
            lines: priced,
            totals,
        })
    }
}

async fn fetch_modifier(
    session: &mut dyn PlacementSession,
    kind: ModifierKind,
    id: i32,
) -> Result<Modifier, PlacementError> {
    session
        .modifier(kind, id)
        .await?
        .ok_or(PlacementError::ModifierNotFound { kind, id })
}
