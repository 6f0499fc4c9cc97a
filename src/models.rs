use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// Ukrainian mobile numbers, with or without the `+38` country prefix.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?38)?(0\d{9})$").expect("phone pattern is valid")
});

pub const MIN_VOLUME: i16 = 2;
pub const MAX_VOLUME: i16 = 10;

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Iban,
    CashOnDelivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContactType {
    Telegram,
    Phone,
    DontDisturb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

macro_rules! text_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(AppError::Internal(anyhow::anyhow!(
                        "unknown {} value: {}",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

text_enum!(PaymentMethod {
    Iban => "iban",
    CashOnDelivery => "cash_on_delivery",
});

text_enum!(ContactType {
    Telegram => "telegram",
    Phone => "phone",
    DontDisturb => "dont_disturb",
});

text_enum!(OrderStatus {
    Pending => "pending",
    Cancelled => "cancelled",
    Completed => "completed",
});

impl OrderStatus {
    /// Only `pending` may move, and only to a terminal status.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Pending, OrderStatus::Completed)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub category_id: Uuid,
    pub brand: String,
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "100.00")]
    pub price: Decimal,
    pub stock: i32,
    pub is_visible: bool,
    pub is_best_seller: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Promocode {
    pub id: Uuid,
    pub code: String,
    pub discount: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Promocode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// A promo code that passed creation-time checks.
#[derive(Debug, Clone)]
pub struct NewPromocode {
    pub id: Uuid,
    pub code: String,
    pub discount: i32,
    pub expires_at: DateTime<Utc>,
}

impl NewPromocode {
    pub fn new(
        code: &str,
        discount: i32,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Self, AppError> {
        let code = code.trim();
        let len = code.chars().count();
        if !(3..=10).contains(&len) {
            return Err(AppError::bad_request(
                "code must be between 3 and 10 characters",
            ));
        }
        if discount <= 0 || discount >= 100 {
            return Err(AppError::bad_request(
                "discount must be greater than 0 and less than 100",
            ));
        }
        if expires_at <= now {
            return Err(AppError::bad_request("expiration cannot be in the past"));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            code: code.to_string(),
            discount,
            expires_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub payment_method: PaymentMethod,
    pub contact_type: ContactType,
    pub promo_code: Option<String>,
    #[schema(value_type = String, example = "250.00")]
    pub amount_to_pay: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer-facing fields of an order before it is persisted.
#[derive(Debug, Clone)]
pub struct CustomerProfile {
    pub full_name: String,
    pub phone_number: String,
    pub address: String,
    pub payment_method: PaymentMethod,
    pub contact_type: ContactType,
    pub promo_code: Option<String>,
}

/// A validated order aggregate, always `pending` when built.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub customer: CustomerProfile,
    pub amount_to_pay: Decimal,
    pub status: OrderStatus,
}

impl NewOrder {
    pub fn new(id: Uuid, customer: CustomerProfile, amount_to_pay: Decimal) -> Result<Self, AppError> {
        let customer = CustomerProfile {
            full_name: customer.full_name.trim().to_string(),
            phone_number: customer.phone_number.trim().to_string(),
            address: customer.address.trim().to_string(),
            promo_code: customer
                .promo_code
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty()),
            ..customer
        };

        if customer.full_name.is_empty() {
            return Err(AppError::bad_request("full name is required"));
        }
        if !is_valid_phone(&customer.phone_number) {
            return Err(AppError::bad_request("phone number is invalid"));
        }
        if customer.address.is_empty() {
            return Err(AppError::bad_request("address is required"));
        }
        if amount_to_pay <= Decimal::ZERO {
            return Err(AppError::bad_request("amount to pay must be greater than 0"));
        }

        Ok(Self {
            id,
            customer,
            amount_to_pay,
            status: OrderStatus::Pending,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub volume: i16,
}

impl OrderLine {
    pub fn new(order_id: Uuid, product_id: Uuid, quantity: i32, volume: i16) -> Result<Self, AppError> {
        if quantity <= 0 {
            return Err(AppError::bad_request("quantity must be greater than zero"));
        }
        if !(MIN_VOLUME..=MAX_VOLUME).contains(&volume) {
            return Err(AppError::bad_request(format!(
                "volume must be between {MIN_VOLUME} and {MAX_VOLUME}"
            )));
        }

        Ok(Self {
            order_id,
            product_id,
            quantity,
            volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    fn customer() -> CustomerProfile {
        CustomerProfile {
            full_name: "Olena Kovalenko".into(),
            phone_number: "+380501234567".into(),
            address: "Kyiv, Khreshchatyk 1".into(),
            payment_method: PaymentMethod::CashOnDelivery,
            contact_type: ContactType::Telegram,
            promo_code: Some("  ".into()),
        }
    }

    #[test]
    fn phone_accepts_national_formats() {
        assert!(is_valid_phone("0501234567"));
        assert!(is_valid_phone("380501234567"));
        assert!(is_valid_phone("+380501234567"));
        assert!(!is_valid_phone("501234567"));
        assert!(!is_valid_phone("+1 555 0100"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn new_order_is_pending_and_drops_blank_promo() {
        let order = NewOrder::new(Uuid::new_v4(), customer(), dec("250.00")).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.customer.promo_code, None);
    }

    #[test]
    fn new_order_rejects_bad_fields() {
        let mut bad_phone = customer();
        bad_phone.phone_number = "12345".into();
        assert!(matches!(
            NewOrder::new(Uuid::new_v4(), bad_phone, dec("10")),
            Err(AppError::BadRequest(_))
        ));

        let mut no_name = customer();
        no_name.full_name = "   ".into();
        assert!(NewOrder::new(Uuid::new_v4(), no_name, dec("10")).is_err());

        assert!(NewOrder::new(Uuid::new_v4(), customer(), Decimal::ZERO).is_err());
    }

    #[test]
    fn order_line_bounds() {
        let (order, product) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(OrderLine::new(order, product, 1, 2).is_ok());
        assert!(OrderLine::new(order, product, 1, 10).is_ok());
        assert!(OrderLine::new(order, product, 0, 5).is_err());
        assert!(OrderLine::new(order, product, 1, 1).is_err());
        assert!(OrderLine::new(order, product, 1, 11).is_err());
    }

    #[test]
    fn status_machine_is_one_way_from_pending() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
    }

    #[test]
    fn status_text_round_trips_through_storage_form() {
        assert_eq!("cancelled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
        assert_eq!(PaymentMethod::CashOnDelivery.as_str(), "cash_on_delivery");
        assert!("processing".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn promocode_validation() {
        let now = Utc::now();
        let later = now + Duration::hours(1);
        assert!(NewPromocode::new("SPRING", 15, later, now).is_ok());
        assert!(NewPromocode::new("AB", 15, later, now).is_err());
        assert!(NewPromocode::new("ABCDEFGHIJK", 15, later, now).is_err());
        assert!(NewPromocode::new("SPRING", 0, later, now).is_err());
        assert!(NewPromocode::new("SPRING", 100, later, now).is_err());
        assert!(NewPromocode::new("SPRING", 15, now - Duration::seconds(1), now).is_err());
    }

    #[test]
    fn promo_expiry_boundary() {
        let now = Utc::now();
        let promo = |expires_at| Promocode {
            id: Uuid::new_v4(),
            code: "SUMMER".into(),
            discount: 10,
            expires_at,
            created_at: now,
            updated_at: now,
        };
        assert!(promo(now - Duration::seconds(1)).is_expired_at(now));
        assert!(!promo(now + Duration::hours(1)).is_expired_at(now));
    }
}
