//! Scenario: catalog listing and product lifecycle
//!
//! # Invariants under test
//!
//! 1. Listing is restricted to active products of the category.
//! 2. Price sort uses the sale price when one is set.
//! 3. Out-of-range page numbers clamp to the last page.
//! 4. Search is a case-insensitive substring match; `%` matches literally.
//! 5. An unknown category slug is `NotFound`.
//! 6. Slug and category-name collisions are validation errors.
//! 7. A product referenced by an order cannot be deleted; an unreferenced
//!    one can.
//!
//! DB-backed test. Skips if `SF_DATABASE_URL` is not set.

use sf_core::catalog::ProductSort;
use sf_core::checkout::StockPolicy;
use sf_core::ShopError;
use sf_db::catalog::{NewCategory, NewProduct, ProductQuery};
use sf_schemas::{CartOwner, Category, Money, ShippingDetails};
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

async fn fresh_category(pool: &PgPool) -> anyhow::Result<Category> {
    sf_db::catalog::create_category(
        pool,
        &NewCategory {
            name: format!("Listing {}", Uuid::new_v4()),
            ..Default::default()
        },
    )
    .await
}

fn product(category_id: i64, name: &str, price: i64, discount: Option<i64>) -> NewProduct {
    NewProduct {
        category_id,
        name: name.to_string(),
        slug: None,
        sku: String::new(),
        short_description: String::new(),
        description: String::new(),
        price: Money::from_major(price),
        discount_price: discount.map(Money::from_major),
        stock: 5,
        image: None,
        is_active: true,
    }
}

fn query(slug: &str) -> ProductQuery {
    ProductQuery {
        category_slug: Some(slug.to_string()),
        per_page: 12,
        ..Default::default()
    }
}

#[tokio::test]
async fn price_sort_uses_sale_price_and_hides_inactive() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let cat = fresh_category(&pool).await?;
    let a = sf_db::catalog::create_product(&pool, &product(cat.id, "Brass Lamp", 900, None)).await?;
    let b = sf_db::catalog::create_product(&pool, &product(cat.id, "Copper Jug", 1000, Some(500))).await?;
    let c = sf_db::catalog::create_product(&pool, &product(cat.id, "Clay Cup", 700, None)).await?;
    let mut hidden = product(cat.id, "Old Stock", 1, None);
    hidden.is_active = false;
    sf_db::catalog::create_product(&pool, &hidden).await?;

    let page = sf_db::catalog::list_products(
        &pool,
        &ProductQuery {
            sort: ProductSort::PriceLow,
            ..query(&cat.slug)
        },
    )
    .await?;
    let ids: Vec<i64> = page.products.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![b.id, c.id, a.id]);
    assert_eq!(page.window.total_items, 3);
    assert_eq!(page.category.map(|c| c.id), Some(cat.id));
    Ok(())
}

#[tokio::test]
async fn page_past_the_end_clamps_to_last() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let cat = fresh_category(&pool).await?;
    for i in 0..5 {
        sf_db::catalog::create_product(&pool, &product(cat.id, &format!("Bowl {i}"), 10, None)).await?;
    }

    let page = sf_db::catalog::list_products(
        &pool,
        &ProductQuery {
            per_page: 2,
            page: Some("99".into()),
            sort: ProductSort::NameAsc,
            ..query(&cat.slug)
        },
    )
    .await?;
    assert_eq!(page.window.page, 3);
    assert_eq!(page.window.total_pages, 3);
    assert_eq!(page.products.len(), 1);
    assert_eq!(page.products[0].name, "Bowl 4");
    Ok(())
}

#[tokio::test]
async fn search_is_case_insensitive_and_literal() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let cat = fresh_category(&pool).await?;
    let silk = sf_db::catalog::create_product(&pool, &product(cat.id, "Silk Saree", 3000, None)).await?;
    sf_db::catalog::create_product(&pool, &product(cat.id, "Cotton Kurta", 800, None)).await?;
    let pct = sf_db::catalog::create_product(&pool, &product(cat.id, "100% Wool Shawl", 1500, None)).await?;

    let page = sf_db::catalog::list_products(
        &pool,
        &ProductQuery {
            search: Some("  sIlK ".into()),
            ..query(&cat.slug)
        },
    )
    .await?;
    assert_eq!(page.products.iter().map(|p| p.id).collect::<Vec<_>>(), vec![silk.id]);

    let page = sf_db::catalog::list_products(
        &pool,
        &ProductQuery {
            search: Some("0%".into()),
            ..query(&cat.slug)
        },
    )
    .await?;
    assert_eq!(page.products.iter().map(|p| p.id).collect::<Vec<_>>(), vec![pct.id]);
    Ok(())
}

#[tokio::test]
async fn unknown_category_is_not_found() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let err = sf_db::catalog::list_products(&pool, &query(&format!("missing-{}", Uuid::new_v4())))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShopError>(),
        Some(ShopError::NotFound { what: "category", .. })
    ));
    Ok(())
}

#[tokio::test]
async fn slug_and_name_collisions_are_validation_errors() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let cat = fresh_category(&pool).await?;
    let name = format!("Tea Tin {}", Uuid::new_v4().simple());
    let one = sf_db::catalog::create_product(&pool, &product(cat.id, &name, 10, None)).await?;
    assert!(one.slug.ends_with(&format!("-{}", cat.id)));
    let err = sf_db::catalog::create_product(&pool, &product(cat.id, &name, 10, None))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShopError>(),
        Some(ShopError::Validation { field: "slug", .. })
    ));

    let err = sf_db::catalog::create_category(
        &pool,
        &NewCategory {
            name: cat.name.clone(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShopError>(),
        Some(ShopError::Validation { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn ordered_product_cannot_be_deleted() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await? else {
        return Ok(());
    };
    let cat = fresh_category(&pool).await?;
    let sold = sf_db::catalog::create_product(&pool, &product(cat.id, "Sold Vase", 50, None)).await?;
    let unsold = sf_db::catalog::create_product(&pool, &product(cat.id, "Spare Vase", 50, None)).await?;

    let user = (Uuid::new_v4().as_u128() & 0x7fff_ffff_ffff) as i64;
    let cart = sf_db::cart::resolve_cart(&pool, &CartOwner::User(user)).await?;
    sf_db::cart::cart_add(&pool, cart, sold.id, 1).await?;
    let shipping = ShippingDetails {
        full_name: "Ravi Kumar".into(),
        email: "ravi@example.in".into(),
        phone: "080 1234 5678".into(),
        address_line1: "12 MG Road".into(),
        address_line2: String::new(),
        city: "Bengaluru".into(),
        state: "Karnataka".into(),
        postal_code: "560001".into(),
        country: "India".into(),
    };
    sf_db::checkout::checkout(&pool, cart, Some(user), &shipping, StockPolicy::Strict).await?;

    let err = sf_db::catalog::delete_product(&pool, sold.id).await.unwrap_err();
    assert_eq!(err.downcast_ref::<ShopError>(), Some(&ShopError::ProductInUse(sold.id)));
    assert_eq!(sf_db::catalog::fetch_product(&pool, sold.id).await?.id, sold.id);

    sf_db::catalog::delete_product(&pool, unsold.id).await?;
    let err = sf_db::catalog::fetch_product(&pool, unsold.id).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShopError>(),
        Some(ShopError::NotFound { what: "product", .. })
    ));
    Ok(())
}
