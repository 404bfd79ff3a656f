//! Scenario: stock policies at checkout
//!
//! # Invariants under test
//!
//! 1. Strict: q ≤ s decrements to s − q.
//! 2. Strict: q > s fails the whole checkout; no order, stock and cart intact.
//! 3. Lenient: q > s leaves stock unchanged and the order still succeeds.
//!
//! DB-backed test. Skips if `SF_DATABASE_URL` is not set.

use sf_core::checkout::StockPolicy;
use sf_core::orders::DateRange;
use sf_core::ShopError;
use sf_db::catalog::{NewCategory, NewProduct};
use sf_schemas::{CartOwner, Money, ShippingDetails};
use sqlx::PgPool;
use uuid::Uuid;

async fn pool_or_skip() -> anyhow::Result<Option<PgPool>> {
    let url = match std::env::var(sf_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: SF_DATABASE_URL not set");
            return Ok(None);
        }
    };
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await?;
    sf_db::migrate(&pool).await?;
    Ok(Some(pool))
}

fn fresh_user_id() -> i64 {
    (Uuid::new_v4().as_u128() & 0x7fff_ffff_ffff) as i64
}

async fn seed(pool: &PgPool, stock: i32) -> anyhow::Result<i64> {
    let cat = sf_db::catalog::create_category(
        pool,
        &NewCategory {
            name: format!("Stock {}", Uuid::new_v4()),
            ..Default::default()
        },
    )
    .await?;
    let p = sf_db::catalog::create_product(
        pool,
        &NewProduct {
            category_id: cat.id,
            name: format!("Steel Tumbler {}", Uuid::new_v4()),
            slug: None,
            sku: String::new(),
            short_description: String::new(),
            description: String::new(),
            price: Money::from_major(25),
            discount_price: None,
            stock,
            image: None,
            is_active: true,
        },
    )
    .await?;
    Ok(p.id)
}

fn shipping() -> ShippingDetails {
    ShippingDetails {
        full_name: "Ravi Kumar".into(),
        email: "ravi@example.in".into(),
        phone: "9876543210".into(),
        address_line1: "4 Park Street".into(),
        address_line2: String::new(),
        city: "Kolkata".into(),
        state: "West Bengal".into(),
        postal_code: "700016".into(),
        country: "India".into(),
    }
}

async fn order_count(pool: &PgPool, user: i64) -> anyhow::Result<usize> {
    let today = chrono::Utc::now().date_naive();
    Ok(sf_db::orders::list_orders_for_user(pool, user, DateRange::last_days(today, 1))
        .await?
        .len())
}

#[tokio::test]
async fn strict_decrements_when_enough() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let product = seed(&pool, 5).await?;
    let user = fresh_user_id();
    let cart = sf_db::cart::resolve_cart(&pool, &CartOwner::User(user)).await?;
    sf_db::cart::cart_add(&pool, cart, product, 5).await?;

    sf_db::checkout::checkout(&pool, cart, Some(user), &shipping(), StockPolicy::Strict).await?;
    assert_eq!(sf_db::catalog::fetch_product(&pool, product).await?.stock, 0);
    Ok(())
}

#[tokio::test]
async fn strict_short_stock_commits_nothing() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let product = seed(&pool, 2).await?;
    let user = fresh_user_id();
    let cart = sf_db::cart::resolve_cart(&pool, &CartOwner::User(user)).await?;
    sf_db::cart::cart_add(&pool, cart, product, 3).await?;

    let err = sf_db::checkout::checkout(&pool, cart, Some(user), &shipping(), StockPolicy::Strict)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShopError>(),
        Some(ShopError::InsufficientStock {
            requested: 3,
            available: 2,
            ..
        })
    ));

    assert_eq!(sf_db::catalog::fetch_product(&pool, product).await?.stock, 2);
    assert_eq!(sf_db::cart::cart_count(&pool, cart).await?, 3);
    assert_eq!(order_count(&pool, user).await?, 0);
    Ok(())
}

#[tokio::test]
async fn lenient_short_stock_keeps_stock_and_places_order() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let product = seed(&pool, 2).await?;
    let user = fresh_user_id();
    let cart = sf_db::cart::resolve_cart(&pool, &CartOwner::User(user)).await?;
    sf_db::cart::cart_add(&pool, cart, product, 3).await?;

    let placed =
        sf_db::checkout::checkout(&pool, cart, Some(user), &shipping(), StockPolicy::Lenient).await?;
    assert_eq!(placed.short_stock, vec![product]);
    assert_eq!(placed.total, Money::from_major(75));

    assert_eq!(sf_db::catalog::fetch_product(&pool, product).await?.stock, 2);
    assert_eq!(sf_db::cart::cart_count(&pool, cart).await?, 0);
    assert_eq!(order_count(&pool, user).await?, 1);
    Ok(())
}
