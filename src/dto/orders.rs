use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{ContactType, Order, OrderStatus, PaymentMethod};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub volume: i16,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub payment_method: PaymentMethod,
    pub contact_type: ContactType,
    pub promo_code: Option<String>,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub contact_type: Option<ContactType>,
    pub status: Option<OrderStatus>,
}

impl UpdateOrderRequest {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.phone_number.is_none()
            && self.address.is_none()
            && self.payment_method.is_none()
            && self.contact_type.is_none()
            && self.status.is_none()
    }
}

/// An order line joined with the product it refers to.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemView {
    pub product_id: Uuid,
    pub brand: String,
    pub name: String,
    #[schema(value_type = String, example = "100.00")]
    pub price: Decimal,
    pub quantity: i32,
    pub volume: i16,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItemView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub count: i64,
    pub items: Vec<OrderWithItems>,
}
