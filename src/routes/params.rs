use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{ContactType, OrderStatus, PaymentMethod, SortOrder},
    store::{orders::OrderFilter, promocodes::PromocodeFilter},
};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// 1-based page number, default 1
    pub page: Option<i64>,
    /// Items per page, default 10, at most 100
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self { page, limit }
    }

    /// Returns `(page, limit, offset)`.
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let limit = match self.limit {
            Some(limit) if limit > 0 => limit.min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        };
        // Pages far past the end still yield an empty slice.
        let offset = (page - 1).saturating_mul(limit);
        (page, limit, offset)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    CreatedAt,
    Price,
    Name,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Search in brand, name and description
    pub q: Option<String>,
    pub category_id: Option<Uuid>,
    pub brand: Option<String>,
    #[param(value_type = Option<String>)]
    pub min_price: Option<Decimal>,
    #[param(value_type = Option<String>)]
    pub max_price: Option<Decimal>,
    pub best_sellers: Option<bool>,
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
}

impl ProductQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    /// Comma-separated order ids
    pub ids: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub contact_type: Option<ContactType>,
    pub status: Option<OrderStatus>,
    /// Inclusive start date, YYYY-MM-DD
    pub from_date: Option<String>,
    /// Inclusive end date, YYYY-MM-DD
    pub to_date: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl OrderListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }

    pub fn filter(&self) -> AppResult<OrderFilter> {
        let ids = match self.ids.as_deref() {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| {
                    Uuid::parse_str(part)
                        .map_err(|_| AppError::bad_request(format!("invalid order id: {part}")))
                })
                .collect::<AppResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        let from = self
            .from_date
            .as_deref()
            .map(|raw| parse_date(raw, "from_date").and_then(|date| at(date, 0, 0, 0)))
            .transpose()?;
        let to = self
            .to_date
            .as_deref()
            .map(|raw| parse_date(raw, "to_date").and_then(end_of_day))
            .transpose()?;

        Ok(OrderFilter {
            ids,
            payment_method: self.payment_method,
            contact_type: self.contact_type,
            status: self.status,
            from,
            before: to,
            sort_order: self.sort_order,
        })
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PromocodeQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub code: Option<String>,
    /// Only codes that have not expired yet
    pub active: Option<bool>,
    /// Only codes that already expired
    pub expired: Option<bool>,
}

impl PromocodeQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination::new(self.page, self.limit)
    }

    pub fn filter(&self, now: DateTime<Utc>) -> PromocodeFilter {
        PromocodeFilter {
            code: self.code.clone(),
            active_at: self.active.unwrap_or(false).then_some(now),
            expired_at: self.expired.unwrap_or(false).then_some(now),
        }
    }
}

fn parse_date(raw: &str, field: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::bad_request(format!("invalid {field} format, expected YYYY-MM-DD")))
}

fn at(date: NaiveDate, hour: u32, min: u32, sec: u32) -> AppResult<DateTime<Utc>> {
    date.and_hms_opt(hour, min, sec)
        .map(|datetime| datetime.and_utc())
        .ok_or_else(|| AppError::bad_request(format!("invalid date: {date}")))
}

/// Exclusive upper bound covering the whole of `date`.
fn end_of_day(date: NaiveDate) -> AppResult<DateTime<Utc>> {
    let next = date
        .succ_opt()
        .ok_or_else(|| AppError::bad_request(format!("invalid date: {date}")))?;
    at(next, 0, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(Pagination::new(None, None).normalize(), (1, 10, 0));
        assert_eq!(Pagination::new(Some(3), Some(20)).normalize(), (3, 20, 40));
        assert_eq!(Pagination::new(Some(0), Some(0)).normalize(), (1, 10, 0));
        assert_eq!(Pagination::new(Some(2), Some(500)).normalize(), (2, 100, 100));
        assert_eq!(Pagination::new(Some(-4), Some(-1)).normalize(), (1, 10, 0));
    }

    #[test]
    fn pagination_offset_saturates_on_huge_page() {
        let (page, limit, offset) = Pagination::new(Some(i64::MAX), Some(10)).normalize();
        assert_eq!(page, i64::MAX);
        assert_eq!(limit, 10);
        assert_eq!(offset, i64::MAX);

        let (_, _, offset) = Pagination::new(Some(i64::MAX / 2), Some(MAX_LIMIT)).normalize();
        assert_eq!(offset, i64::MAX);
    }

    #[test]
    fn order_filter_parses_ids_and_inclusive_dates() {
        let id = Uuid::new_v4();
        let query = OrderListQuery {
            ids: Some(format!(" {id} ,")),
            from_date: Some("2026-10-01".into()),
            to_date: Some("2026-10-16".into()),
            status: Some(OrderStatus::Pending),
            ..Default::default()
        };

        let filter = query.filter().unwrap();
        assert_eq!(filter.ids, vec![id]);
        assert_eq!(filter.from.unwrap().to_rfc3339(), "2026-10-01T00:00:00+00:00");
        assert_eq!(filter.before.unwrap().to_rfc3339(), "2026-10-17T00:00:00+00:00");
        assert_eq!(filter.status, Some(OrderStatus::Pending));
    }

    #[test]
    fn order_filter_rejects_malformed_input() {
        let bad_date = OrderListQuery {
            from_date: Some("16.10.2026".into()),
            ..Default::default()
        };
        assert!(matches!(bad_date.filter(), Err(AppError::BadRequest(_))));

        let bad_id = OrderListQuery {
            ids: Some("not-a-uuid".into()),
            ..Default::default()
        };
        assert!(matches!(bad_id.filter(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn to_date_covers_month_and_year_ends() {
        let query = OrderListQuery {
            to_date: Some("2026-12-31".into()),
            ..Default::default()
        };
        let before = query.filter().unwrap().before.unwrap();
        assert_eq!(before.to_rfc3339(), "2027-01-01T00:00:00+00:00");
    }
}
