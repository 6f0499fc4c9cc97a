use perfume_order_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;
use uuid::Uuid;

struct SeedProduct {
    category: &'static str,
    brand: &'static str,
    name: &'static str,
    description: &'static str,
    price_cents: i64,
    stock: i32,
    best_seller: bool,
}

const CATEGORIES: &[&str] = &["Women", "Men", "Unisex"];

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        category: "Women",
        brand: "Chanel",
        name: "Coco Mademoiselle",
        description: "Fresh oriental with orange, rose and patchouli",
        price_cents: 9_500,
        stock: 40,
        best_seller: true,
    },
    SeedProduct {
        category: "Men",
        brand: "Dior",
        name: "Sauvage",
        description: "Bergamot, Sichuan pepper and ambroxan",
        price_cents: 8_700,
        stock: 35,
        best_seller: true,
    },
    SeedProduct {
        category: "Unisex",
        brand: "Le Labo",
        name: "Santal 33",
        description: "Sandalwood, cardamom and leather",
        price_cents: 14_000,
        stock: 12,
        best_seller: false,
    },
    SeedProduct {
        category: "Unisex",
        brand: "Maison Margiela",
        name: "Jazz Club",
        description: "Rum, tobacco leaf and vanilla",
        price_cents: 7_200,
        stock: 0,
        best_seller: false,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, 2).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    let email = std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".into());
    let password = std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into());
    let admin_id = ensure_admin(&pool, &email, &password).await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_admin(pool: &sqlx::PgPool, email: &str, password: &str) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO admins (id, email, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE SET password_hash = EXCLUDED.password_hash
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    println!("Ensured admin {email}");
    Ok(id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for name in CATEGORIES {
        sqlx::query("INSERT INTO categories (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
            .bind(Uuid::new_v4())
            .bind(*name)
            .execute(pool)
            .await?;
    }

    let mut inserted = 0;
    for product in PRODUCTS {
        let (category_id,): (Uuid,) = sqlx::query_as("SELECT id FROM categories WHERE name = $1")
            .bind(product.category)
            .fetch_one(pool)
            .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO products (id, category_id, brand, name, description, price, stock, is_best_seller)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE brand = $3 AND name = $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(category_id)
        .bind(product.brand)
        .bind(product.name)
        .bind(product.description)
        .bind(Decimal::new(product.price_cents, 2))
        .bind(product.stock)
        .bind(product.best_seller)
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }

    println!("Seeded {inserted} products");
    Ok(())
}
