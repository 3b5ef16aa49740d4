//! In-memory order store with real transaction semantics.
//!
//! A placement session takes the store lock for its whole lifetime and works
//! on a private copy of the tables; `commit` swaps the copy in, anything else
//! throws it away. Faults can be injected to exercise failure paths.

use async_trait::async_trait;
use brewline_core::{
    CatalogReader, MenuPricing, Modifier, ModifierKind, NewOrder, NewOrderLine, NewReview,
    OrderDetail, OrderDetailLine, OrderFilter, OrderHistoryEntry, OrderId, OrderStatus, OrderStore,
    OrderSummary, OrderTotals, Page, PlacementSession, SessionState, SessionStore, StockAdjustment,
    StoreError, StoreResult, UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
#[error("injected fault: {0}")]
pub struct InjectedFault(pub &'static str);

/// Failure to simulate on the next matching store call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The stock update for this menu affects zero rows.
    StockUpdateMisses(i32),
    /// Inserting a line for this menu fails with a backend error.
    LineInsertFails(i32),
    /// The totals update affects zero rows.
    TotalsUpdateMisses,
    CommitFails,
    /// Every menu read sleeps this long first.
    SlowCatalog(Duration),
    /// Commit sleeps this long before applying the work.
    SlowCommit(Duration),
}

#[derive(Debug, Clone)]
pub struct MenuRecord {
    pub product_name: String,
    pub price: Decimal,
    pub discount: Decimal,
    pub stock: i32,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CustomerProfile {
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipping: String,
    pub payment_id: i32,
    pub status: OrderStatus,
    pub tax: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredLine {
    pub id: i32,
    pub order_id: OrderId,
    pub menu_id: i32,
    pub quantity: i32,
    pub size_id: i32,
    pub type_id: i32,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredReview {
    pub id: i32,
    pub order_line_id: i32,
    pub rating: i16,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    menus: BTreeMap<i32, MenuRecord>,
    sizes: BTreeMap<i32, Modifier>,
    types: BTreeMap<i32, Modifier>,
    customers: HashMap<UserId, CustomerProfile>,
    payment_methods: BTreeMap<i32, String>,
    // Insertion order is creation order.
    orders: Vec<StoredOrder>,
    lines: Vec<StoredLine>,
    reviews: Vec<StoredReview>,
    next_line_id: i32,
    next_review_id: i32,
}

impl Tables {
    fn modifiers(&self, kind: ModifierKind) -> &BTreeMap<i32, Modifier> {
        match kind {
            ModifierKind::Size => &self.sizes,
            ModifierKind::Type => &self.types,
        }
    }

    fn matches(order: &StoredOrder, filter: &OrderFilter) -> bool {
        filter.status.map_or(true, |s| order.status == s)
            && filter.order_id.map_or(true, |id| order.id == id)
    }

    fn summary(&self, order: &StoredOrder) -> OrderSummary {
        let items = self
            .lines
            .iter()
            .filter(|l| l.order_id == order.id)
            .map(|l| {
                let name = self
                    .menus
                    .get(&l.menu_id)
                    .map(|m| m.product_name.as_str())
                    .unwrap_or_default();
                format!("{} - {}x", name, l.quantity)
            })
            .collect::<Vec<_>>()
            .join(", ");

        OrderSummary {
            id: order.id,
            created_at: order.created_at,
            items,
            status: order.status,
            total: order.total,
        }
    }
}

struct Inner {
    tables: Tables,
    faults: Vec<Fault>,
}

#[derive(Clone)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                tables: Tables {
                    next_line_id: 1,
                    next_review_id: 1,
                    ..Tables::default()
                },
                faults: Vec::new(),
            })),
        }
    }

    pub async fn add_menu(&self, id: i32, product_name: &str, price: Decimal, discount: Decimal, stock: i32) {
        self.inner.lock().await.tables.menus.insert(
            id,
            MenuRecord {
                product_name: product_name.to_string(),
                price,
                discount,
                stock,
                images: Vec::new(),
            },
        );
    }

    pub async fn add_menu_image(&self, menu_id: i32, path: &str) {
        if let Some(menu) = self.inner.lock().await.tables.menus.get_mut(&menu_id) {
            menu.images.push(path.to_string());
        }
    }

    pub async fn add_modifier(&self, kind: ModifierKind, id: i32, name: &str, price: Decimal) {
        let modifier = Modifier {
            id,
            kind,
            name: name.to_string(),
            price,
        };
        let mut inner = self.inner.lock().await;
        match kind {
            ModifierKind::Size => inner.tables.sizes.insert(id, modifier),
            ModifierKind::Type => inner.tables.types.insert(id, modifier),
        };
    }

    pub async fn add_customer(&self, user_id: UserId, profile: CustomerProfile) {
        self.inner.lock().await.tables.customers.insert(user_id, profile);
    }

    pub async fn add_payment_method(&self, id: i32, name: &str) {
        self.inner.lock().await.tables.payment_methods.insert(id, name.to_string());
    }

    /// Removes a menu outside of any placement, as a concurrent admin would.
    pub async fn remove_menu(&self, id: i32) {
        self.inner.lock().await.tables.menus.remove(&id);
    }

    pub async fn inject(&self, fault: Fault) {
        self.inner.lock().await.faults.push(fault);
    }

    pub async fn clear_faults(&self) {
        self.inner.lock().await.faults.clear();
    }

    pub async fn menu_stock(&self, id: i32) -> Option<i32> {
        self.inner.lock().await.tables.menus.get(&id).map(|m| m.stock)
    }

    pub async fn orders(&self) -> Vec<StoredOrder> {
        self.inner.lock().await.tables.orders.clone()
    }

    pub async fn lines(&self) -> Vec<StoredLine> {
        self.inner.lock().await.tables.lines.clone()
    }

    pub async fn reviews(&self) -> Vec<StoredReview> {
        self.inner.lock().await.tables.reviews.clone()
    }
}

pub struct MemorySession {
    guard: OwnedMutexGuard<Inner>,
    work: Tables,
}

impl MemorySession {
    fn has_fault(&self, wanted: Fault) -> bool {
        self.guard.faults.contains(&wanted)
    }

    fn catalog_delay(&self) -> Option<Duration> {
        self.guard.faults.iter().find_map(|f| match f {
            Fault::SlowCatalog(d) => Some(*d),
            _ => None,
        })
    }

    fn commit_delay(&self) -> Option<Duration> {
        self.guard.faults.iter().find_map(|f| match f {
            Fault::SlowCommit(d) => Some(*d),
            _ => None,
        })
    }
}

#[async_trait]
impl CatalogReader for MemorySession {
    async fn menu_pricing(&mut self, menu_id: i32) -> StoreResult<Option<MenuPricing>> {
        if let Some(delay) = self.catalog_delay() {
            tokio::time::sleep(delay).await;
        }
        Ok(self.work.menus.get(&menu_id).map(|m| MenuPricing {
            menu_id,
            price: m.price,
            discount: m.discount,
            stock: m.stock,
        }))
    }

    async fn modifier(&mut self, kind: ModifierKind, id: i32) -> StoreResult<Option<Modifier>> {
        Ok(self.work.modifiers(kind).get(&id).cloned())
    }
}

#[async_trait]
impl PlacementSession for MemorySession {
    async fn insert_order(&mut self, header: &NewOrder) -> StoreResult<OrderId> {
        let id = Uuid::new_v4();
        self.work.orders.push(StoredOrder {
            id,
            user_id: header.user_id,
            shipping: header.shipping.clone(),
            payment_id: header.payment_id,
            status: OrderStatus::Pending,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn decrement_stock(&mut self, adjustment: &StockAdjustment) -> StoreResult<u64> {
        if self.has_fault(Fault::StockUpdateMisses(adjustment.menu_id)) {
            return Ok(0);
        }
        match self.work.menus.get_mut(&adjustment.menu_id) {
            Some(menu) if menu.stock == adjustment.expected_stock => {
                menu.stock = adjustment.new_stock;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn insert_order_line(&mut self, line: &NewOrderLine) -> StoreResult<u64> {
        if self.has_fault(Fault::LineInsertFails(line.menu_id)) {
            return Err(StoreError::backend(InjectedFault("order line insert")));
        }
        if !self.work.orders.iter().any(|o| o.id == line.order_id) {
            return Err(StoreError::backend(InjectedFault("order line references a missing order")));
        }

        let id = self.work.next_line_id;
        self.work.next_line_id += 1;
        self.work.lines.push(StoredLine {
            id,
            order_id: line.order_id,
            menu_id: line.menu_id,
            quantity: line.quantity,
            size_id: line.size_id,
            type_id: line.type_id,
            subtotal: line.subtotal,
        });
        Ok(1)
    }

    async fn update_order_totals(&mut self, order_id: OrderId, totals: &OrderTotals) -> StoreResult<u64> {
        if self.has_fault(Fault::TotalsUpdateMisses) {
            return Ok(0);
        }
        match self.work.orders.iter_mut().find(|o| o.id == order_id) {
            Some(order) => {
                order.tax = totals.tax;
                order.total = totals.total;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        if self.has_fault(Fault::CommitFails) {
            return Err(StoreError::backend(InjectedFault("commit")));
        }
        if let Some(delay) = self.commit_delay() {
            tokio::time::sleep(delay).await;
        }
        let MemorySession { mut guard, work } = *self;
        guard.tables = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn PlacementSession>> {
        let guard = self.inner.clone().lock_owned().await;
        let work = guard.tables.clone();
        Ok(Box::new(MemorySession { guard, work }))
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        match inner.tables.orders.iter_mut().find(|o| o.id == id) {
            Some(order) => {
                order.status = status;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn add_review(&self, review: &NewReview) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let tables = &mut inner.tables;
        if !tables.lines.iter().any(|l| l.id == review.order_line_id) {
            return Ok(0);
        }
        let id = tables.next_review_id;
        tables.next_review_id += 1;
        tables.reviews.push(StoredReview {
            id,
            order_line_id: review.order_line_id,
            rating: review.rating,
        });
        Ok(1)
    }

    async fn count_orders(&self, filter: &OrderFilter) -> StoreResult<u64> {
        let inner = self.inner.lock().await;
        let count = inner
            .tables
            .orders
            .iter()
            .filter(|o| Tables::matches(o, filter))
            .count();
        Ok(count as u64)
    }

    async fn list_orders(&self, filter: &OrderFilter, page: Page) -> StoreResult<Vec<OrderSummary>> {
        let inner = self.inner.lock().await;
        let tables = &inner.tables;
        Ok(tables
            .orders
            .iter()
            .rev()
            .filter(|o| Tables::matches(o, filter))
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|o| tables.summary(o))
            .collect())
    }

    async fn count_history(&self, user_id: UserId) -> StoreResult<u64> {
        let inner = self.inner.lock().await;
        Ok(inner.tables.orders.iter().filter(|o| o.user_id == user_id).count() as u64)
    }

    async fn list_history(&self, user_id: UserId, page: Page) -> StoreResult<Vec<OrderHistoryEntry>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .tables
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|o| OrderHistoryEntry {
                id: o.id,
                created_at: o.created_at,
                status: o.status,
                total: o.total,
            })
            .collect())
    }

    async fn order_detail(&self, id: OrderId, user_id: UserId) -> StoreResult<Option<OrderDetail>> {
        let inner = self.inner.lock().await;
        let tables = &inner.tables;
        let Some(order) = tables.orders.iter().find(|o| o.id == id && o.user_id == user_id) else {
            return Ok(None);
        };

        let profile = tables.customers.get(&user_id).cloned().unwrap_or_default();
        let name_of = |kind: ModifierKind, id: i32| {
            tables
                .modifiers(kind)
                .get(&id)
                .map(|m| m.name.clone())
                .unwrap_or_default()
        };

        let lines = tables
            .lines
            .iter()
            .filter(|l| l.order_id == id)
            .map(|l| {
                let menu = tables.menus.get(&l.menu_id);
                OrderDetailLine {
                    id: l.id,
                    item_name: menu.map(|m| m.product_name.clone()).unwrap_or_default(),
                    size: name_of(ModifierKind::Size, l.size_id),
                    kind: name_of(ModifierKind::Type, l.type_id),
                    quantity: l.quantity,
                    subtotal: l.subtotal,
                    images: menu.map(|m| m.images.clone()).unwrap_or_default(),
                }
            })
            .collect();

        Ok(Some(OrderDetail {
            id: order.id,
            created_at: order.created_at,
            full_name: profile.full_name,
            address: profile.address,
            phone: profile.phone,
            payment_method: tables.payment_methods.get(&order.payment_id).cloned(),
            shipping: order.shipping.clone(),
            status: order.status,
            tax: order.tax,
            total: order.total,
            lines,
        }))
    }
}

/// Session tokens kept in a map, keyed by user
#[derive(Clone, Default)]
pub struct InMemorySessions {
    tokens: Arc<Mutex<HashMap<UserId, String>>>,
}

impl InMemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_token(&self, user_id: UserId, token: &str) {
        self.tokens.lock().await.insert(user_id, token.to_string());
    }

    pub async fn revoke(&self, user_id: UserId) {
        self.tokens.lock().await.remove(&user_id);
    }
}

#[async_trait]
impl SessionStore for InMemorySessions {
    async fn check_session(&self, user_id: UserId, token: &str) -> StoreResult<SessionState> {
        Ok(match self.tokens.lock().await.get(&user_id) {
            None => SessionState::Expired,
            Some(cached) if cached == token => SessionState::Valid,
            Some(_) => SessionState::Mismatch,
        })
    }
}
