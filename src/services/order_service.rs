use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, TransactionTrait};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CreateOrderRequest, OrderItemRequest, OrderItemView, OrderList, OrderWithItems,
        UpdateOrderRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{CustomerProfile, NewOrder, Order, OrderLine, OrderStatus, Product, is_valid_phone},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    state::AppState,
    store::{
        self,
        orders::OrderChanges,
    },
};

/// Validated outcome of pricing a cart against current product data.
#[derive(Debug)]
pub struct OrderPlan {
    pub total: Decimal,
    pub lines: Vec<OrderLine>,
    /// Quantity to take from each product, in product id order.
    pub deductions: BTreeMap<Uuid, i32>,
}

/// Check every requested line against the fetched products and price the order.
pub fn plan_order(
    order_id: Uuid,
    items: &[OrderItemRequest],
    products: &HashMap<Uuid, Product>,
) -> AppResult<OrderPlan> {
    let mut seen = HashSet::with_capacity(items.len());
    let mut plan = OrderPlan {
        total: Decimal::ZERO,
        lines: Vec::with_capacity(items.len()),
        deductions: BTreeMap::new(),
    };

    for item in items {
        if !seen.insert(item.product_id) {
            return Err(AppError::bad_request(format!(
                "product {} appears more than once in the order",
                item.product_id
            )));
        }

        let product = match products.get(&item.product_id) {
            Some(product) => product,
            None => {
                return Err(AppError::not_found(format!(
                    "product {} not found",
                    item.product_id
                )));
            }
        };

        if product.stock <= 0 {
            return Err(AppError::bad_request(format!(
                "{} {} is out of stock",
                product.brand, product.name
            )));
        }
        if item.quantity > product.stock {
            return Err(AppError::bad_request(format!(
                "insufficient stock for {} {}: requested {}, available {}",
                product.brand, product.name, item.quantity, product.stock
            )));
        }

        let line = OrderLine::new(order_id, product.id, item.quantity, item.volume)?;
        plan.total = product
            .price
            .checked_mul(Decimal::from(line.quantity))
            .and_then(|subtotal| plan.total.checked_add(subtotal))
            .ok_or_else(|| AppError::bad_request("order total is out of range"))?;
        *plan.deductions.entry(product.id).or_insert(0) += line.quantity;
        plan.lines.push(line);
    }

    Ok(plan)
}

pub async fn create_order(
    state: &AppState,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let CreateOrderRequest {
        full_name,
        phone_number,
        address,
        payment_method,
        contact_type,
        promo_code,
        items,
    } = payload;

    if items.is_empty() {
        return Err(AppError::bad_request("order has no items"));
    }

    let promo_code = promo_code
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty());
    if let Some(code) = promo_code.as_deref() {
        let promo = store::promocodes::find_by_code(&state.orm, code).await?;
        if promo.is_expired_at(Utc::now()) {
            return Err(AppError::Forbidden(format!("promo code {code} has expired")));
        }
    }

    let product_ids: Vec<Uuid> = items
        .iter()
        .map(|item| item.product_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let txn = state.orm.begin().await?;

    let products: HashMap<Uuid, Product> = store::products::find_by_ids(&txn, &product_ids)
        .await?
        .into_iter()
        .filter(|product| product.is_visible)
        .map(|product| (product.id, product))
        .collect();
    if products.len() != product_ids.len() {
        return Err(AppError::not_found("one or more products not found"));
    }

    let order_id = Uuid::new_v4();
    let plan = plan_order(order_id, &items, &products)?;
    let customer = CustomerProfile {
        full_name,
        phone_number,
        address,
        payment_method,
        contact_type,
        promo_code,
    };
    let new_order = NewOrder::new(order_id, customer, plan.total)?;

    let order = store::orders::insert_order(&txn, &new_order).await?;

    for (&product_id, &quantity) in &plan.deductions {
        if !store::products::decrement_stock(&txn, product_id, quantity).await? {
            let label = products
                .get(&product_id)
                .map(|product| format!("{} {}", product.brand, product.name))
                .unwrap_or_else(|| product_id.to_string());
            return Err(AppError::bad_request(format!(
                "insufficient stock for {label}"
            )));
        }
    }

    for line in &plan.lines {
        store::orders::insert_order_line(&txn, line).await?;
    }

    txn.commit().await?;

    let created = OrderWithItems {
        items: item_views(&plan.lines, &products),
        order,
    };
    tracing::info!(
        order_id = %created.order.id,
        amount = %created.order.amount_to_pay,
        lines = created.items.len(),
        "order created"
    );
    state.notifications.dispatch(created.clone());

    Ok(ApiResponse::success("Order created", created, None))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let filter = query.filter()?;
    let (page, limit, offset) = query.pagination().normalize();

    let (orders, total) = store::orders::list_orders(&state.orm, &filter, limit, offset).await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
    let lines = store::orders::list_order_lines(&state.orm, &order_ids).await?;

    let product_ids: Vec<Uuid> = lines
        .iter()
        .map(|line| line.product_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let products: HashMap<Uuid, Product> = store::products::find_by_ids(&state.orm, &product_ids)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let items = assemble_orders(orders, lines, &products);
    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList {
            count: total,
            items,
        },
        Some(meta),
    ))
}

pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    if payload.is_empty() {
        return Err(AppError::bad_request("no fields to update"));
    }
    let changes = order_changes(payload)?;

    let txn = state.orm.begin().await?;
    let current = store::orders::find_order_for_update(&txn, id).await?;

    if current.status != OrderStatus::Pending {
        return Err(AppError::bad_request(format!(
            "order is already {}",
            current.status
        )));
    }
    if let Some(next) = changes.status {
        if next != current.status && !current.status.can_transition_to(next) {
            return Err(AppError::bad_request(format!(
                "cannot change order status from {} to {next}",
                current.status
            )));
        }
        if next == OrderStatus::Cancelled {
            restore_order_stock(&txn, id).await?;
        }
    }

    let order = store::orders::update_order(&txn, id, &changes).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, status = %order.status, "order updated");
    Ok(ApiResponse::success("Order updated", order, None))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let current = store::orders::find_order_for_update(&txn, id).await?;
    let order = cancel_in_txn(&txn, &current).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, "order cancelled");
    Ok(ApiResponse::success("Order cancelled", order, None))
}

pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let txn = state.orm.begin().await?;
    let current = store::orders::find_order_for_update(&txn, id).await?;

    match current.status {
        OrderStatus::Cancelled => return Err(AppError::bad_request("order already cancelled")),
        OrderStatus::Completed => return Err(AppError::bad_request("order already completed")),
        OrderStatus::Pending => {}
    }

    cancel_in_txn(&txn, &current).await?;
    store::orders::delete_order(&txn, id).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, "order deleted");
    Ok(ApiResponse::success(
        "Order deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Flip a pending order to `cancelled` and give its quantities back to stock.
async fn cancel_in_txn<C: ConnectionTrait>(conn: &C, order: &Order) -> AppResult<Order> {
    if order.status != OrderStatus::Pending {
        return Err(AppError::bad_request("only pending orders can be canceled"));
    }

    let changes = OrderChanges {
        status: Some(OrderStatus::Cancelled),
        ..Default::default()
    };
    let cancelled = store::orders::update_order(conn, order.id, &changes).await?;
    restore_order_stock(conn, order.id).await?;
    Ok(cancelled)
}

/// Additive restore: current stock plus each line's quantity.
async fn restore_order_stock<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<()> {
    let mut lines = store::orders::list_order_lines(conn, &[order_id]).await?;
    lines.sort_by_key(|line| line.product_id);

    for line in &lines {
        if !store::products::restore_stock(conn, line.product_id, line.quantity).await? {
            tracing::warn!(
                order_id = %order_id,
                product_id = %line.product_id,
                quantity = line.quantity,
                "product missing, stock not restored"
            );
        }
    }
    Ok(())
}

fn order_changes(payload: UpdateOrderRequest) -> AppResult<OrderChanges> {
    let full_name = payload.full_name.map(|name| name.trim().to_string());
    if full_name.as_deref().is_some_and(str::is_empty) {
        return Err(AppError::bad_request("full name is required"));
    }
    let address = payload.address.map(|address| address.trim().to_string());
    if address.as_deref().is_some_and(str::is_empty) {
        return Err(AppError::bad_request("address is required"));
    }
    let phone_number = payload.phone_number.map(|phone| phone.trim().to_string());
    if let Some(phone) = phone_number.as_deref() {
        if !is_valid_phone(phone) {
            return Err(AppError::bad_request("phone number is invalid"));
        }
    }

    Ok(OrderChanges {
        full_name,
        phone_number,
        address,
        payment_method: payload.payment_method,
        contact_type: payload.contact_type,
        status: payload.status,
    })
}

fn item_views(lines: &[OrderLine], products: &HashMap<Uuid, Product>) -> Vec<OrderItemView> {
    lines
        .iter()
        .filter_map(|line| {
            let product = products.get(&line.product_id)?;
            Some(OrderItemView {
                product_id: line.product_id,
                brand: product.brand.clone(),
                name: product.name.clone(),
                price: product.price,
                quantity: line.quantity,
                volume: line.volume,
            })
        })
        .collect()
}

/// Nest lines under their orders, keeping the order sequence of `orders`.
/// Lines pointing at products that no longer exist are left out.
fn assemble_orders(
    orders: Vec<Order>,
    lines: Vec<OrderLine>,
    products: &HashMap<Uuid, Product>,
) -> Vec<OrderWithItems> {
    let mut by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for line in lines {
        by_order.entry(line.order_id).or_default().push(line);
    }

    orders
        .into_iter()
        .map(|order| {
            let lines = by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems {
                items: item_views(&lines, products),
                order,
            }
        })
        .collect()
}
