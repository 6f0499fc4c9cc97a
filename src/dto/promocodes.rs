use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Promocode;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePromocodeRequest {
    pub code: String,
    pub discount: i32,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct PromocodeList {
    #[schema(value_type = Vec<Promocode>)]
    pub items: Vec<Promocode>,
}
