use std::{sync::Arc, time::Duration};

use chrono::Utc;
use perfume_order_api::{
    config::{AppConfig, TelegramConfig},
    db::{create_orm_conn, create_pool, run_migrations},
    dto::orders::{CreateOrderRequest, OrderItemRequest, UpdateOrderRequest},
    entity::{
        categories::ActiveModel as CategoryActive,
        order_lines::{Column as OrderLineCol, Entity as OrderLines},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{ActiveModel as ProductActive, Entity as Products},
        promocodes::ActiveModel as PromocodeActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::{ContactType, OrderStatus, PaymentMethod},
    notify::{MockNotifier, NotificationDispatcher},
    routes::params::OrderListQuery,
    services::{order_service, product_service},
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

struct TestApp {
    state: AppState,
    notifier: Arc<MockNotifier>,
}

// Each test seeds its own category, products and promo codes, so tests can
// share one database and run in parallel.
async fn setup() -> anyhow::Result<Option<TestApp>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run order flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url, 10).await?;
    run_migrations(&pool).await?;
    let orm = create_orm_conn(pool);

    let config = AppConfig {
        database_url,
        database_max_connections: 10,
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        jwt_ttl_hours: 1,
        telegram: TelegramConfig::default(),
        notify_queue_capacity: 64,
        promo_sweep_interval: Duration::from_secs(3600),
        cors_allowed_origins: Vec::new(),
    };

    let notifier = Arc::new(MockNotifier::new());
    let (notifications, _worker) = NotificationDispatcher::spawn(notifier.clone(), 64);

    Ok(Some(TestApp {
        state: AppState {
            orm,
            config: Arc::new(config),
            notifications,
        },
        notifier,
    }))
}

fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: "admin".into(),
    }
}

fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

async fn seed_product(state: &AppState, price: &str, stock: i32) -> anyhow::Result<Uuid> {
    let now = Utc::now();
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(format!("category-{}", Uuid::new_v4())),
        created_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        category_id: Set(category.id),
        brand: Set("Maison Test".into()),
        name: Set(format!("Eau {}", &Uuid::new_v4().simple().to_string()[..6])),
        description: Set(String::new()),
        price: Set(dec(price)),
        stock: Set(stock),
        is_visible: Set(true),
        is_best_seller: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

async fn seed_promocode(state: &AppState, expires_in: chrono::Duration) -> anyhow::Result<String> {
    let now = Utc::now();
    let code = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    PromocodeActive {
        id: Set(Uuid::new_v4()),
        code: Set(code.clone()),
        discount: Set(10),
        expires_at: Set((now + expires_in).into()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(code)
}

async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product {product_id} vanished"))?;
    Ok(product.stock)
}

async fn lines_for_product(state: &AppState, product_id: Uuid) -> anyhow::Result<u64> {
    Ok(OrderLines::find()
        .filter(OrderLineCol::ProductId.eq(product_id))
        .count(&state.orm)
        .await?)
}

fn order_request(items: &[(Uuid, i32)], promo_code: Option<String>) -> CreateOrderRequest {
    CreateOrderRequest {
        full_name: "Olena Kovalenko".into(),
        phone_number: "+380501234567".into(),
        address: "Kyiv, Khreshchatyk 1".into(),
        payment_method: PaymentMethod::CashOnDelivery,
        contact_type: ContactType::Telegram,
        promo_code,
        items: items
            .iter()
            .map(|&(product_id, quantity)| OrderItemRequest {
                product_id,
                quantity,
                volume: 5,
            })
            .collect(),
    }
}

async fn place_order(state: &AppState, items: &[(Uuid, i32)]) -> anyhow::Result<Uuid> {
    let resp = order_service::create_order(state, order_request(items, None)).await?;
    Ok(resp.data.expect("created order").order.id)
}

#[tokio::test]
async fn create_order_prices_lines_and_deducts_stock() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;

    let p1 = seed_product(state, "100.00", 10).await?;
    let p2 = seed_product(state, "50.00", 5).await?;

    let resp = order_service::create_order(state, order_request(&[(p1, 2), (p2, 1)], None)).await?;
    let created = resp.data.expect("created order");

    assert_eq!(created.order.amount_to_pay, dec("250.00"));
    assert_eq!(created.order.status, OrderStatus::Pending);
    assert_eq!(created.items.len(), 2);
    assert_eq!(stock_of(state, p1).await?, 8);
    assert_eq!(stock_of(state, p2).await?, 4);

    let listed = order_service::list_orders(
        state,
        &admin(),
        OrderListQuery {
            ids: Some(created.order.id.to_string()),
            ..Default::default()
        },
    )
    .await?;
    let listed = listed.data.expect("order list");
    assert_eq!(listed.count, 1);
    assert_eq!(listed.items[0].items.len(), 2);

    // Delivery happens on the worker task, after the response.
    let mut delivered = false;
    for _ in 0..50 {
        if app
            .notifier
            .sent()
            .iter()
            .any(|text| text.contains(&created.order.amount_to_pay.to_string()))
        {
            delivered = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(delivered, "order notification was not delivered");

    Ok(())
}

#[tokio::test]
async fn insufficient_stock_writes_nothing() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    let product = seed_product(state, "80.00", 3).await?;

    let err = order_service::create_order(state, order_request(&[(product, 5)], None))
        .await
        .unwrap_err();
    match err {
        AppError::BadRequest(message) => assert!(message.contains("requested 5, available 3")),
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(stock_of(state, product).await?, 3);
    assert_eq!(lines_for_product(state, product).await?, 0);
    Ok(())
}

#[tokio::test]
async fn missing_product_fails_the_whole_order() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    let product = seed_product(state, "40.00", 10).await?;

    let err = order_service::create_order(
        state,
        order_request(&[(product, 1), (Uuid::new_v4(), 1)], None),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(stock_of(state, product).await?, 10);
    assert_eq!(lines_for_product(state, product).await?, 0);
    Ok(())
}

#[tokio::test]
async fn empty_cart_is_rejected() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };

    let err = order_service::create_order(&app.state, order_request(&[], None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn promo_expiry_boundary() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    let product = seed_product(state, "60.00", 10).await?;

    let expired = seed_promocode(state, chrono::Duration::seconds(-1)).await?;
    let err = order_service::create_order(state, order_request(&[(product, 1)], Some(expired)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let unknown = order_service::create_order(
        state,
        order_request(&[(product, 1)], Some("NOPE0000".into())),
    )
    .await
    .unwrap_err();
    assert!(matches!(unknown, AppError::NotFound(_)));
    assert_eq!(stock_of(state, product).await?, 10);

    let active = seed_promocode(state, chrono::Duration::hours(1)).await?;
    let resp = order_service::create_order(
        state,
        order_request(&[(product, 1)], Some(active.clone())),
    )
    .await?;
    let order = resp.data.expect("created order").order;
    assert_eq!(order.promo_code.as_deref(), Some(active.as_str()));
    // The discount is recorded, not applied.
    assert_eq!(order.amount_to_pay, dec("60.00"));
    Ok(())
}

#[tokio::test]
async fn cancel_restores_stock_once() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    let p1 = seed_product(state, "100.00", 10).await?;
    let p2 = seed_product(state, "50.00", 5).await?;
    let order_id = place_order(state, &[(p1, 2), (p2, 1)]).await?;

    let cancelled = order_service::cancel_order(state, &admin(), order_id).await?;
    assert_eq!(cancelled.data.expect("order").status, OrderStatus::Cancelled);
    assert_eq!(stock_of(state, p1).await?, 10);
    assert_eq!(stock_of(state, p2).await?, 5);

    let again = order_service::cancel_order(state, &admin(), order_id)
        .await
        .unwrap_err();
    assert!(matches!(again, AppError::BadRequest(_)));
    assert_eq!(stock_of(state, p1).await?, 10);

    let delete = order_service::delete_order(state, &admin(), order_id)
        .await
        .unwrap_err();
    assert!(matches!(delete, AppError::BadRequest(ref m) if m.contains("already cancelled")));
    Ok(())
}

#[tokio::test]
async fn restore_is_additive_to_current_stock() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    let product = seed_product(state, "30.00", 10).await?;
    let order_id = place_order(state, &[(product, 3)]).await?;

    // Restock happens while the order is pending.
    let mut restock: ProductActive = Products::find_by_id(product)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product missing"))?
        .into();
    restock.stock = Set(20);
    restock.update(&state.orm).await?;

    order_service::cancel_order(state, &admin(), order_id).await?;
    assert_eq!(stock_of(state, product).await?, 23);
    Ok(())
}

#[tokio::test]
async fn delete_pending_order_cancels_then_removes_rows() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    let product = seed_product(state, "45.50", 6).await?;
    let order_id = place_order(state, &[(product, 2)]).await?;
    assert_eq!(stock_of(state, product).await?, 4);

    order_service::delete_order(state, &admin(), order_id).await?;

    assert_eq!(stock_of(state, product).await?, 6);
    assert!(Orders::find_by_id(order_id).one(&state.orm).await?.is_none());
    assert_eq!(lines_for_product(state, product).await?, 0);

    let missing = order_service::delete_order(state, &admin(), order_id)
        .await
        .unwrap_err();
    assert!(matches!(missing, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn completed_orders_are_final() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    let product = seed_product(state, "70.00", 5).await?;
    let order_id = place_order(state, &[(product, 1)]).await?;

    let completed = order_service::update_order(
        state,
        &admin(),
        order_id,
        UpdateOrderRequest {
            status: Some(OrderStatus::Completed),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(completed.data.expect("order").status, OrderStatus::Completed);
    assert_eq!(stock_of(state, product).await?, 4);

    let cancel = order_service::cancel_order(state, &admin(), order_id)
        .await
        .unwrap_err();
    assert!(matches!(cancel, AppError::BadRequest(_)));

    let delete = order_service::delete_order(state, &admin(), order_id)
        .await
        .unwrap_err();
    assert!(matches!(delete, AppError::BadRequest(ref m) if m.contains("already completed")));

    let edit = order_service::update_order(
        state,
        &admin(),
        order_id,
        UpdateOrderRequest {
            address: Some("Dnipro".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(edit, AppError::BadRequest(_)));
    assert_eq!(stock_of(state, product).await?, 4);
    Ok(())
}

#[tokio::test]
async fn update_to_cancelled_restores_stock() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    let product = seed_product(state, "25.00", 8).await?;
    let order_id = place_order(state, &[(product, 3)]).await?;

    let updated = order_service::update_order(
        state,
        &admin(),
        order_id,
        UpdateOrderRequest {
            address: Some("Kharkiv, Sumska 10".into()),
            status: Some(OrderStatus::Cancelled),
            ..Default::default()
        },
    )
    .await?;
    let order = updated.data.expect("order");
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(order.address, "Kharkiv, Sumska 10");
    assert_eq!(stock_of(state, product).await?, 8);

    let empty = order_service::update_order(state, &admin(), order_id, UpdateOrderRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(empty, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn non_admin_cannot_manage_orders() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    let product = seed_product(state, "25.00", 8).await?;
    let order_id = place_order(state, &[(product, 1)]).await?;

    let viewer = AuthUser {
        user_id: Uuid::new_v4(),
        role: "viewer".into(),
    };
    let err = order_service::cancel_order(state, &viewer, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(stock_of(state, product).await?, 7);
    Ok(())
}

#[tokio::test]
async fn concurrent_orders_never_oversell() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let product = seed_product(&app.state, "10.00", 5).await?;

    let customer = format!("Race {}", Uuid::new_v4().simple());
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let state = app.state.clone();
        let mut request = order_request(&[(product, 1)], None);
        request.full_name = customer.clone();
        tasks.push(tokio::spawn(async move {
            order_service::create_order(&state, request).await
        }));
    }

    let mut placed = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => placed += 1,
            Err(AppError::BadRequest(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(placed, 5);
    assert_eq!(stock_of(&app.state, product).await?, 0);
    assert_eq!(lines_for_product(&app.state, product).await?, 5);
    // Losers had inserted their order row before the stock check failed.
    let order_rows = Orders::find()
        .filter(OrderCol::FullName.eq(customer.as_str()))
        .count(&app.state.orm)
        .await?;
    assert_eq!(order_rows, placed);
    Ok(())
}

#[tokio::test]
async fn to_date_includes_the_last_microseconds_of_the_day() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    let product = seed_product(state, "10.00", 3).await?;
    let order_id = place_order(state, &[(product, 1)]).await?;

    let late = "2026-10-16T23:59:59.500+00:00"
        .parse::<chrono::DateTime<chrono::FixedOffset>>()?;
    OrderActive {
        id: Unchanged(order_id),
        created_at: Set(late),
        ..Default::default()
    }
    .update(&state.orm)
    .await?;

    let list = |to_date: &str| OrderListQuery {
        ids: Some(order_id.to_string()),
        to_date: Some(to_date.into()),
        ..Default::default()
    };

    let same_day = order_service::list_orders(state, &admin(), list("2026-10-16")).await?;
    assert_eq!(same_day.data.expect("order list").count, 1);

    let day_before = order_service::list_orders(state, &admin(), list("2026-10-15")).await?;
    assert_eq!(day_before.data.expect("order list").count, 0);
    Ok(())
}

#[tokio::test]
async fn brands_list_only_visible_products_once() -> anyhow::Result<()> {
    let Some(app) = setup().await? else {
        return Ok(());
    };
    let state = &app.state;
    let tag = Uuid::new_v4().simple().to_string();
    let shown = format!("Atelier {tag}");
    let hidden = format!("Backroom {tag}");

    for (brand, visible) in [(&shown, true), (&shown, true), (&hidden, false)] {
        let id = seed_product(state, "40.00", 2).await?;
        ProductActive {
            id: Unchanged(id),
            brand: Set(brand.clone()),
            is_visible: Set(visible),
            ..Default::default()
        }
        .update(&state.orm)
        .await?;
    }

    let brands = product_service::list_brands(state).await?.data.expect("brands").brands;
    assert_eq!(brands.iter().filter(|b| **b == shown).count(), 1);
    assert!(!brands.contains(&hidden));
    Ok(())
}
