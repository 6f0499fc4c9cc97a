use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, sea_query::Expr};
use uuid::Uuid;

use crate::{
    entity::products::{Column, Entity as Products, Model as ProductModel},
    error::AppResult,
    models::Product,
};

/// Batch lookup; only existing rows come back, callers compare counts.
pub async fn find_by_ids<C: ConnectionTrait>(conn: &C, ids: &[Uuid]) -> AppResult<Vec<Product>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let products = Products::find()
        .filter(Column::Id.is_in(ids.iter().copied()))
        .all(conn)
        .await?
        .into_iter()
        .map(product_from_entity)
        .collect();
    Ok(products)
}

/// Subtract `quantity` only while enough stock remains. Returns `false` when
/// the row is missing or would go negative, leaving it untouched.
pub async fn decrement_stock<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    quantity: i32,
) -> AppResult<bool> {
    let result = Products::update_many()
        .col_expr(Column::Stock, Expr::col(Column::Stock).sub(quantity))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id))
        .filter(Column::Stock.gte(quantity))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Add `quantity` back onto the current stock. Returns `false` if the product is gone.
pub async fn restore_stock<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    quantity: i32,
) -> AppResult<bool> {
    let result = Products::update_many()
        .col_expr(Column::Stock, Expr::col(Column::Stock).add(quantity))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::Id.eq(id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected == 1)
}

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        category_id: model.category_id,
        brand: model.brand,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        is_visible: model.is_visible,
        is_best_seller: model.is_best_seller,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
