//! Checkout: cart → order in one transaction.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sf_core::checkout::{plan_checkout, validate_shipping, StockPolicy, StockedLine};
use sf_core::status::stamp;
use sf_core::ShopError;
use sf_schemas::{Money, OrderStatus, OrderTracking, ShippingDetails, UserId};
use sqlx::{PgPool, Row};

use crate::rows::upsert_tracking;

pub const DEFAULT_PAYMENT_METHOD: &str = "COD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedOrder {
    pub order_id: i64,
    pub total: Money,
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
    /// Lenient stock policy only: products whose stock was left unchanged.
    pub short_stock: Vec<i64>,
}

/// Convert the cart into an order. Either everything commits (order, items,
/// tracking row, stock decrements, emptied cart) or nothing does.
pub async fn checkout(
    pool: &PgPool,
    cart_id: i64,
    user_id: Option<UserId>,
    shipping: &ShippingDetails,
    policy: StockPolicy,
) -> Result<PlacedOrder> {
    let shipping = validate_shipping(shipping)?;
    crate::with_retry("checkout", || checkout_once(pool, cart_id, user_id, &shipping, policy)).await
}

async fn checkout_once(
    pool: &PgPool,
    cart_id: i64,
    user_id: Option<UserId>,
    shipping: &ShippingDetails,
    policy: StockPolicy,
) -> Result<PlacedOrder> {
    let mut tx = pool.begin().await.context("begin checkout failed")?;

    // Product rows are locked in product-id order.
    let rows = sqlx::query(
        r#"
        select ci.product_id, ci.quantity,
               p.name, p.price, p.discount_price, p.stock
        from cart_items ci
        join products p on p.id = ci.product_id
        where ci.cart_id = $1
        order by ci.product_id
        for update of ci, p
        "#,
    )
    .bind(cart_id)
    .fetch_all(&mut *tx)
    .await
    .context("lock cart lines failed")?;

    let mut lines = Vec::with_capacity(rows.len());
    for row in &rows {
        lines.push(StockedLine {
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("name")?,
            price: Money::from_minor(row.try_get("price")?),
            discount_price: row
                .try_get::<Option<i64>, _>("discount_price")?
                .map(Money::from_minor),
            stock: row.try_get("stock")?,
            quantity: row.try_get("quantity")?,
        });
    }

    let plan = plan_checkout(&lines, policy)?;

    let row = sqlx::query(
        r#"
        insert into orders (
          user_id, full_name, email, phone, address_line1, address_line2,
          city, state, postal_code, country, total, status, payment_method
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13
        )
        returning id, created_at
        "#,
    )
    .bind(user_id)
    .bind(&shipping.full_name)
    .bind(&shipping.email)
    .bind(&shipping.phone)
    .bind(&shipping.address_line1)
    .bind(&shipping.address_line2)
    .bind(&shipping.city)
    .bind(&shipping.state)
    .bind(&shipping.postal_code)
    .bind(&shipping.country)
    .bind(plan.total.minor())
    .bind(OrderStatus::Placed.as_str())
    .bind(DEFAULT_PAYMENT_METHOD)
    .fetch_one(&mut *tx)
    .await
    .context("insert order failed")?;
    let order_id: i64 = row.try_get("id")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    for item in &plan.items {
        sqlx::query(
            r#"
            insert into order_items (order_id, product_id, product_name, unit_price, quantity)
            values ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.unit_price.minor())
        .bind(item.quantity)
        .execute(&mut *tx)
        .await
        .context("insert order_item failed")?;
    }

    let mut tracking = OrderTracking {
        order_id,
        delivery_address: shipping.delivery_address(),
        ..Default::default()
    };
    stamp(&mut tracking, OrderStatus::Placed, created_at);
    upsert_tracking(&mut *tx, &tracking).await?;

    for d in &plan.decrements {
        let res = sqlx::query("update products set stock = stock - $1 where id = $2 and stock >= $1")
            .bind(d.quantity)
            .bind(d.product_id)
            .execute(&mut *tx)
            .await
            .context("decrement stock failed")?;
        if res.rows_affected() == 0 {
            // Rows are locked, so this only happens if the product vanished.
            return Err(ShopError::InsufficientStock {
                product_id: d.product_id,
                requested: d.quantity,
                available: 0,
            }
            .into());
        }
    }
    for product_id in &plan.short_stock {
        tracing::warn!(order_id, product_id, "insufficient stock; order accepted without decrement");
    }

    sqlx::query("delete from cart_items where cart_id = $1")
        .bind(cart_id)
        .execute(&mut *tx)
        .await
        .context("empty cart failed")?;
    sqlx::query("update carts set updated_at = now() where id = $1")
        .bind(cart_id)
        .execute(&mut *tx)
        .await
        .context("touch cart failed")?;

    tx.commit().await.context("commit checkout failed")?;

    tracing::info!(
        order_id,
        cart_id,
        total = %plan.total,
        items = plan.items.len(),
        "order placed"
    );

    Ok(PlacedOrder {
        order_id,
        total: plan.total,
        item_count: plan.items.len(),
        created_at,
        short_stock: plan.short_stock,
    })
}
