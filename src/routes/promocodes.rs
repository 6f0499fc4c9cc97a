use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};
use uuid::Uuid;

use crate::{
    dto::promocodes::{CreatePromocodeRequest, PromocodeList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Promocode,
    response::ApiResponse,
    routes::params::PromocodeQuery,
    services::promocode_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_promocodes).post(create_promocode))
        .route("/{id}", delete(delete_promocode))
}

#[utoipa::path(
    get,
    path = "/api/promocodes",
    params(PromocodeQuery),
    responses(
        (status = 200, description = "List promo codes", body = ApiResponse<PromocodeList>)
    ),
    tag = "Promocodes"
)]
pub async fn list_promocodes(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PromocodeQuery>,
) -> AppResult<Json<ApiResponse<PromocodeList>>> {
    let resp = promocode_service::list_promocodes(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/promocodes",
    request_body = CreatePromocodeRequest,
    responses(
        (status = 201, description = "Create promo code", body = ApiResponse<Promocode>),
        (status = 400, description = "Invalid code, discount or expiry"),
        (status = 409, description = "Code already exists"),
    ),
    tag = "Promocodes"
)]
pub async fn create_promocode(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePromocodeRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Promocode>>)> {
    let resp = promocode_service::create_promocode(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/promocodes/{id}",
    params(
        ("id" = Uuid, Path, description = "Promo code ID")
    ),
    responses(
        (status = 200, description = "Deleted promo code"),
        (status = 404, description = "Promo code not found"),
    ),
    tag = "Promocodes"
)]
pub async fn delete_promocode(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = promocode_service::delete_promocode(&state, &user, id).await?;
    Ok(Json(resp))
}
