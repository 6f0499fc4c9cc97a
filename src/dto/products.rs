use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub category_id: Uuid,
    pub brand: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[schema(value_type = String, example = "100.00")]
    pub price: Decimal,
    pub stock: i32,
    #[serde(default)]
    pub is_best_seller: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub category_id: Option<Uuid>,
    pub brand: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, example = "120.00")]
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub is_visible: Option<bool>,
    pub is_best_seller: Option<bool>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

/// Distinct brands of the storefront catalog.
#[derive(Serialize, ToSchema)]
pub struct BrandList {
    pub brands: Vec<String>,
}
