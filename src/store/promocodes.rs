use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    entity::promocodes::{ActiveModel, Column, Entity as Promocodes, Model as PromocodeModel},
    error::{AppError, AppResult},
    models::{NewPromocode, Promocode},
};

#[derive(Debug, Clone, Default)]
pub struct PromocodeFilter {
    /// Case-insensitive substring match.
    pub code: Option<String>,
    pub active_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
}

/// Exact, case-sensitive lookup of a single code.
pub async fn find_by_code<C: ConnectionTrait>(conn: &C, code: &str) -> AppResult<Promocode> {
    let mut matches = Promocodes::find()
        .filter(Column::Code.eq(code))
        .limit(2)
        .all(conn)
        .await?;

    match matches.len() {
        0 => Err(AppError::not_found(format!("promo code {code} not found"))),
        1 => Ok(promocode_from_entity(matches.remove(0))),
        _ => Err(AppError::AlreadyExists(format!(
            "promo code {code} is ambiguous"
        ))),
    }
}

pub async fn insert<C: ConnectionTrait>(conn: &C, promo: &NewPromocode) -> AppResult<Promocode> {
    let now = Utc::now();
    let model = ActiveModel {
        id: Set(promo.id),
        code: Set(promo.code.clone()),
        discount: Set(promo.discount),
        expires_at: Set(promo.expires_at.into()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(conn)
    .await
    .map_err(|err| {
        AppError::from_db(err, format!("promo code {} already exists", promo.code))
    })?;
    Ok(promocode_from_entity(model))
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    filter: &PromocodeFilter,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<Promocode>, i64)> {
    let finder = Promocodes::find()
        .filter(condition(filter))
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(conn).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(conn)
        .await?
        .into_iter()
        .map(promocode_from_entity)
        .collect();
    Ok((items, total))
}

/// Codes whose expiry lies strictly before `now`.
pub async fn list_expired<C: ConnectionTrait>(
    conn: &C,
    now: DateTime<Utc>,
) -> AppResult<Vec<Promocode>> {
    let items = Promocodes::find()
        .filter(Column::ExpiresAt.lt(now))
        .all(conn)
        .await?
        .into_iter()
        .map(promocode_from_entity)
        .collect();
    Ok(items)
}

pub async fn delete<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<()> {
    let result = Promocodes::delete_by_id(id).exec(conn).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found(format!("promo code {id} not found")));
    }
    Ok(())
}

fn condition(filter: &PromocodeFilter) -> Condition {
    let mut condition = Condition::all();
    if let Some(code) = filter.code.as_ref().filter(|c| !c.is_empty()) {
        condition = condition.add(Expr::col(Column::Code).ilike(format!("%{code}%")));
    }
    if let Some(now) = filter.active_at {
        condition = condition.add(Column::ExpiresAt.gte(now));
    }
    if let Some(now) = filter.expired_at {
        condition = condition.add(Column::ExpiresAt.lt(now));
    }
    condition
}

pub fn promocode_from_entity(model: PromocodeModel) -> Promocode {
    Promocode {
        id: model.id,
        code: model.code,
        discount: model.discount,
        expires_at: model.expires_at.with_timezone(&Utc),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
