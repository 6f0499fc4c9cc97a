use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::LockType,
};
use sea_orm::ActiveValue::Unchanged;
use uuid::Uuid;

use crate::{
    entity::{
        order_lines::{
            ActiveModel as OrderLineActive, Column as OrderLineCol, Entity as OrderLines,
            Model as OrderLineModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    models::{ContactType, NewOrder, Order, OrderLine, OrderStatus, PaymentMethod, SortOrder},
};

/// Criteria for listing orders; empty fields do not constrain.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub ids: Vec<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    pub contact_type: Option<ContactType>,
    pub status: Option<OrderStatus>,
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub before: Option<DateTime<Utc>>,
    pub sort_order: Option<SortOrder>,
}

/// Field changes for a partial order update.
#[derive(Debug, Clone, Default)]
pub struct OrderChanges {
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub contact_type: Option<ContactType>,
    pub status: Option<OrderStatus>,
}

pub async fn insert_order<C: ConnectionTrait>(conn: &C, order: &NewOrder) -> AppResult<Order> {
    let now = Utc::now();
    let model = OrderActive {
        id: Set(order.id),
        full_name: Set(order.customer.full_name.clone()),
        phone_number: Set(order.customer.phone_number.clone()),
        address: Set(order.customer.address.clone()),
        payment_method: Set(order.customer.payment_method.as_str().to_string()),
        contact_type: Set(order.customer.contact_type.as_str().to_string()),
        promo_code: Set(order.customer.promo_code.clone()),
        amount_to_pay: Set(order.amount_to_pay),
        status: Set(order.status.as_str().to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(conn)
    .await
    .map_err(|err| AppError::from_db(err, format!("order {} already exists", order.id)))?;

    order_from_entity(model)
}

pub async fn insert_order_line<C: ConnectionTrait>(conn: &C, line: &OrderLine) -> AppResult<()> {
    OrderLines::insert(OrderLineActive {
        order_id: Set(line.order_id),
        product_id: Set(line.product_id),
        quantity: Set(line.quantity),
        volume: Set(line.volume),
    })
    .exec_without_returning(conn)
    .await
    .map_err(|err| {
        AppError::from_db(
            err,
            format!(
                "order line for order {} and product {} already exists",
                line.order_id, line.product_id
            ),
        )
    })?;
    Ok(())
}

/// Fetch exactly one order and lock its row until the transaction ends.
pub async fn find_order_for_update<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Order> {
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(format!("order {id} not found")))?;
    order_from_entity(order)
}

pub async fn list_orders<C: ConnectionTrait>(
    conn: &C,
    filter: &OrderFilter,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<Order>, i64)> {
    let mut condition = Condition::all();
    if !filter.ids.is_empty() {
        condition = condition.add(OrderCol::Id.is_in(filter.ids.iter().copied()));
    }
    if let Some(method) = filter.payment_method {
        condition = condition.add(OrderCol::PaymentMethod.eq(method.as_str()));
    }
    if let Some(contact) = filter.contact_type {
        condition = condition.add(OrderCol::ContactType.eq(contact.as_str()));
    }
    if let Some(status) = filter.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }
    if let Some(from) = filter.from {
        condition = condition.add(OrderCol::CreatedAt.gte(from));
    }
    if let Some(before) = filter.before {
        condition = condition.add(OrderCol::CreatedAt.lt(before));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match filter.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(conn).await? as i64;
    if total == 0 {
        return Ok((Vec::new(), 0));
    }

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(conn)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok((orders, total))
}

/// Lines of the given orders; no matches is an empty list, not an error.
pub async fn list_order_lines<C: ConnectionTrait>(
    conn: &C,
    order_ids: &[Uuid],
) -> AppResult<Vec<OrderLine>> {
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }

    let lines = OrderLines::find()
        .filter(OrderLineCol::OrderId.is_in(order_ids.iter().copied()))
        .order_by_asc(OrderLineCol::OrderId)
        .order_by_asc(OrderLineCol::ProductId)
        .all(conn)
        .await?
        .into_iter()
        .map(order_line_from_entity)
        .collect();
    Ok(lines)
}

pub async fn update_order<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    changes: &OrderChanges,
) -> AppResult<Order> {
    let mut active = OrderActive {
        id: Unchanged(id),
        ..Default::default()
    };
    if let Some(full_name) = &changes.full_name {
        active.full_name = Set(full_name.clone());
    }
    if let Some(phone_number) = &changes.phone_number {
        active.phone_number = Set(phone_number.clone());
    }
    if let Some(address) = &changes.address {
        active.address = Set(address.clone());
    }
    if let Some(method) = changes.payment_method {
        active.payment_method = Set(method.as_str().to_string());
    }
    if let Some(contact) = changes.contact_type {
        active.contact_type = Set(contact.as_str().to_string());
    }
    if let Some(status) = changes.status {
        active.status = Set(status.as_str().to_string());
    }
    active.updated_at = Set(Utc::now().into());

    match active.update(conn).await {
        Ok(model) => order_from_entity(model),
        Err(DbErr::RecordNotUpdated) => Err(AppError::not_found(format!("order {id} not found"))),
        Err(err) => Err(err.into()),
    }
}

/// Hard delete; order lines go with the order.
pub async fn delete_order<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<()> {
    OrderLines::delete_many()
        .filter(OrderLineCol::OrderId.eq(id))
        .exec(conn)
        .await?;

    let result = Orders::delete_many()
        .filter(OrderCol::Id.eq(id))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found(format!("order {id} not found")));
    }
    Ok(())
}

pub fn order_from_entity(model: OrderModel) -> AppResult<Order> {
    Ok(Order {
        id: model.id,
        full_name: model.full_name,
        phone_number: model.phone_number,
        address: model.address,
        payment_method: model.payment_method.parse()?,
        contact_type: model.contact_type.parse()?,
        promo_code: model.promo_code,
        amount_to_pay: model.amount_to_pay,
        status: model.status.parse()?,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_line_from_entity(model: OrderLineModel) -> OrderLine {
    OrderLine {
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        volume: model.volume,
    }
}
