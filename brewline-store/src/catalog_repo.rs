use async_trait::async_trait;
use brewline_core::{CatalogReader, MenuPricing, Modifier, ModifierKind, StoreError, StoreResult};
use rust_decimal::Decimal;

use crate::order_repo::PgPlacementSession;

#[derive(sqlx::FromRow)]
struct MenuPricingRow {
    id: i32,
    price: Decimal,
    discount: Decimal,
    stock: i32,
}

#[derive(sqlx::FromRow)]
struct ModifierRow {
    id: i32,
    name: String,
    price: Decimal,
}

fn modifier_query(kind: ModifierKind) -> &'static str {
    match kind {
        ModifierKind::Size => "SELECT id, name, price FROM product_sizes WHERE id = $1",
        ModifierKind::Type => "SELECT id, name, price FROM product_types WHERE id = $1",
    }
}

#[async_trait]
impl CatalogReader for PgPlacementSession {
    async fn menu_pricing(&mut self, menu_id: i32) -> StoreResult<Option<MenuPricing>> {
        // Row lock is held until the placement commits or rolls back, so
        // concurrent placements on the same menu queue up here.
        let row: Option<MenuPricingRow> = sqlx::query_as(
            r#"
            SELECT m.id, p.price, m.discount, m.stock
            FROM menus m
            JOIN products p ON p.id = m.product_id
            WHERE m.id = $1
            FOR UPDATE OF m
            "#,
        )
        .bind(menu_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(StoreError::backend)?;

        Ok(row.map(|row| MenuPricing {
            menu_id: row.id,
            price: row.price,
            discount: row.discount,
            stock: row.stock,
        }))
    }

    async fn modifier(&mut self, kind: ModifierKind, id: i32) -> StoreResult<Option<Modifier>> {
        let row: Option<ModifierRow> = sqlx::query_as(modifier_query(kind))
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(StoreError::backend)?;

        Ok(row.map(|row| Modifier {
            id: row.id,
            kind,
            name: row.name,
            price: row.price,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_query_targets_table() {
        assert!(modifier_query(ModifierKind::Size).contains("product_sizes"));
        assert!(modifier_query(ModifierKind::Type).contains("product_types"));
    }
}
