use async_trait::async_trait;
use brewline_core::{
    NewOrder, NewOrderLine, NewReview, OrderDetail, OrderDetailLine, OrderFilter,
    OrderHistoryEntry, OrderId, OrderStatus, OrderStore, OrderSummary, OrderTotals, Page,
    PlacementSession, StockAdjustment, StoreError, StoreResult, UserId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use std::str::FromStr;
use uuid::Uuid;

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// A placement running inside one Postgres transaction. Dropping it without
/// `commit` rolls the transaction back.
pub struct PgPlacementSession {
    pub(crate) tx: Transaction<'static, Postgres>,
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    items: String,
    status: String,
    total: Decimal,
}

#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    status: String,
    total: Decimal,
}

#[derive(sqlx::FromRow)]
struct DetailRow {
    id: Uuid,
    created_at: DateTime<Utc>,
    full_name: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    payment_method: Option<String>,
    shipping: String,
    status: String,
    tax: Decimal,
    total: Decimal,
}

#[derive(sqlx::FromRow)]
struct DetailLineRow {
    id: i32,
    item_name: String,
    size: String,
    kind: String,
    qty: i32,
    subtotal: Decimal,
    images: Vec<String>,
}

fn parse_status(raw: &str) -> StoreResult<OrderStatus> {
    OrderStatus::from_str(raw).map_err(|_| StoreError::CorruptRow {
        table: "orders",
        reason: format!("unknown status {raw:?}"),
    })
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

const SUMMARY_FILTER: &str = r#"
    ($1::TEXT IS NULL OR o.status = $1)
    AND ($2::UUID IS NULL OR o.id = $2)
"#;

#[async_trait]
impl PlacementSession for PgPlacementSession {
    async fn insert_order(&mut self, header: &NewOrder) -> StoreResult<OrderId> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO orders (shipping, tax, total, user_id, payment_id)
            VALUES ($1, 0, 0, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&header.shipping)
        .bind(header.user_id)
        .bind(header.payment_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;

        Ok(id)
    }

    async fn decrement_stock(&mut self, adjustment: &StockAdjustment) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE menus SET stock = $1 WHERE id = $2 AND stock = $3")
            .bind(adjustment.new_stock)
            .bind(adjustment.menu_id)
            .bind(adjustment.expected_stock)
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::backend)?;

        Ok(result.rows_affected())
    }

    async fn insert_order_line(&mut self, line: &NewOrderLine) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO order_lines (order_id, qty, subtotal, menu_id, product_size_id, product_type_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(line.order_id)
        .bind(line.quantity)
        .bind(line.subtotal)
        .bind(line.menu_id)
        .bind(line.size_id)
        .bind(line.type_id)
        .execute(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected())
    }

    async fn update_order_totals(&mut self, order_id: OrderId, totals: &OrderTotals) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE orders SET tax = $1, total = $2 WHERE id = $3")
            .bind(totals.tax)
            .bind(totals.total)
            .bind(order_id)
            .execute(&mut *self.tx)
            .await
            .map_err(StoreError::backend)?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await.map_err(StoreError::backend)
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await.map_err(StoreError::backend)
    }
}

#[async_trait]
impl OrderStore for StoreOrderRepository {
    async fn begin(&self) -> StoreResult<Box<dyn PlacementSession>> {
        let tx = self.pool.begin().await.map_err(StoreError::backend)?;
        Ok(Box::new(PgPlacementSession { tx }))
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatus) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
            .bind(status.as_ref())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(result.rows_affected())
    }

    async fn add_review(&self, review: &NewReview) -> StoreResult<u64> {
        // Selecting the line keeps a missing id at zero rows instead of a
        // foreign key error.
        let result = sqlx::query(
            r#"
            INSERT INTO reviews (rating, order_line_id)
            SELECT $1, id FROM order_lines WHERE id = $2
            "#,
        )
        .bind(review.rating)
        .bind(review.order_line_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected())
    }

    async fn count_orders(&self, filter: &OrderFilter) -> StoreResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM orders o WHERE {SUMMARY_FILTER}");
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.status.map(|s| s.as_ref().to_string()))
            .bind(filter.order_id)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(to_u64(count))
    }

    async fn list_orders(&self, filter: &OrderFilter, page: Page) -> StoreResult<Vec<OrderSummary>> {
        let sql = format!(
            r#"
            SELECT
                o.id,
                o.created_at,
                COALESCE(
                    STRING_AGG(CONCAT(p.name, ' - ', l.qty, 'x'), ', ' ORDER BY l.id)
                        FILTER (WHERE l.id IS NOT NULL),
                    ''
                ) AS items,
                o.status,
                o.total
            FROM orders o
            LEFT JOIN order_lines l ON l.order_id = o.id
            LEFT JOIN menus m ON m.id = l.menu_id
            LEFT JOIN products p ON p.id = m.product_id
            WHERE {SUMMARY_FILTER}
            GROUP BY o.id
            ORDER BY o.created_at DESC
            LIMIT $3 OFFSET $4
            "#
        );

        let rows: Vec<SummaryRow> = sqlx::query_as(&sql)
            .bind(filter.status.map(|s| s.as_ref().to_string()))
            .bind(filter.order_id)
            .bind(to_i64(page.limit()))
            .bind(to_i64(page.offset()))
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderSummary {
                    id: row.id,
                    created_at: row.created_at,
                    items: row.items,
                    status: parse_status(&row.status)?,
                    total: row.total,
                })
            })
            .collect()
    }

    async fn count_history(&self, user_id: UserId) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(to_u64(count))
    }

    async fn list_history(&self, user_id: UserId, page: Page) -> StoreResult<Vec<OrderHistoryEntry>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT id, created_at, status, total
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(to_i64(page.limit()))
        .bind(to_i64(page.offset()))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        rows.into_iter()
            .map(|row| {
                Ok(OrderHistoryEntry {
                    id: row.id,
                    created_at: row.created_at,
                    status: parse_status(&row.status)?,
                    total: row.total,
                })
            })
            .collect()
    }

    async fn order_detail(&self, id: OrderId, user_id: UserId) -> StoreResult<Option<OrderDetail>> {
        let header: Option<DetailRow> = sqlx::query_as(
            r#"
            SELECT
                o.id,
                o.created_at,
                u.full_name,
                u.address,
                u.phone,
                pm.name AS payment_method,
                o.shipping,
                o.status,
                o.tax,
                o.total
            FROM orders o
            LEFT JOIN users u ON u.id = o.user_id
            LEFT JOIN payment_methods pm ON pm.id = o.payment_id
            WHERE o.id = $1 AND o.user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        let Some(header) = header else {
            return Ok(None);
        };

        let lines: Vec<DetailLineRow> = sqlx::query_as(
            r#"
            SELECT
                l.id,
                p.name AS item_name,
                s.name AS size,
                t.name AS kind,
                l.qty,
                l.subtotal,
                COALESCE(
                    ARRAY_AGG(pi.path ORDER BY pi.id) FILTER (WHERE pi.path IS NOT NULL),
                    '{}'
                ) AS images
            FROM order_lines l
            JOIN menus m ON m.id = l.menu_id
            JOIN products p ON p.id = m.product_id
            JOIN product_sizes s ON s.id = l.product_size_id
            JOIN product_types t ON t.id = l.product_type_id
            LEFT JOIN product_images pi ON pi.product_id = p.id
            WHERE l.order_id = $1
            GROUP BY l.id, p.name, s.name, t.name
            ORDER BY l.id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(Some(OrderDetail {
            id: header.id,
            created_at: header.created_at,
            full_name: header.full_name,
            address: header.address,
            phone: header.phone,
            payment_method: header.payment_method,
            shipping: header.shipping,
            status: parse_status(&header.status)?,
            tax: header.tax,
            total: header.total,
            lines: lines
                .into_iter()
                .map(|line| OrderDetailLine {
                    id: line.id,
                    item_name: line.item_name,
                    size: line.size,
                    kind: line.kind,
                    quantity: line.qty,
                    subtotal: line.subtotal,
                    images: line.images,
                })
                .collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_rejects_unknown() {
        assert_eq!(parse_status("done").unwrap(), OrderStatus::Done);
        assert!(matches!(
            parse_status("shipped"),
            Err(StoreError::CorruptRow { table: "orders", .. })
        ));
    }

    #[test]
    fn test_count_conversions_saturate() {
        assert_eq!(to_u64(-1), 0);
        assert_eq!(to_i64(u64::MAX), i64::MAX);
    }
}
