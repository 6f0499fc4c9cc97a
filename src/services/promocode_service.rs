use chrono::Utc;
use sea_orm::ConnectionTrait;
use uuid::Uuid;

use crate::{
    dto::promocodes::{CreatePromocodeRequest, PromocodeList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{NewPromocode, Promocode},
    response::{ApiResponse, Meta},
    routes::params::PromocodeQuery,
    state::AppState,
    store,
};

pub async fn create_promocode(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePromocodeRequest,
) -> AppResult<ApiResponse<Promocode>> {
    ensure_admin(user)?;
    let promo = NewPromocode::new(&payload.code, payload.discount, payload.expires_at, Utc::now())?;
    let promo = store::promocodes::insert(&state.orm, &promo).await?;

    tracing::info!(code = %promo.code, expires_at = %promo.expires_at, "promo code created");
    Ok(ApiResponse::success(
        "Promo code created",
        promo,
        Some(Meta::empty()),
    ))
}

pub async fn list_promocodes(
    state: &AppState,
    user: &AuthUser,
    query: PromocodeQuery,
) -> AppResult<ApiResponse<PromocodeList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let filter = query.filter(Utc::now());

    let (items, total) = store::promocodes::list(&state.orm, &filter, limit, offset).await?;

    Ok(ApiResponse::success(
        "Promo codes",
        PromocodeList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn delete_promocode(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    store::promocodes::delete(&state.orm, id).await?;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Remove every code whose expiry has passed; returns how many were deleted.
/// Codes removed by someone else meanwhile are skipped.
pub async fn delete_expired_promocodes<C: ConnectionTrait>(conn: &C) -> AppResult<u64> {
    let expired = store::promocodes::list_expired(conn, Utc::now()).await?;
    delete_each(&expired, |id| store::promocodes::delete(conn, id)).await
}

async fn delete_each<F, Fut>(promos: &[Promocode], mut delete: F) -> AppResult<u64>
where
    F: FnMut(Uuid) -> Fut,
    Fut: Future<Output = AppResult<()>>,
{
    let mut deleted = 0;
    for promo in promos {
        match delete(promo.id).await {
            Ok(()) => deleted += 1,
            Err(AppError::NotFound(_)) => {
                tracing::debug!(code = %promo.code, "expired promo code already gone");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(deleted)
}
