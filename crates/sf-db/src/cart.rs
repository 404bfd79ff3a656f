//! Carts: owner resolution, line mutations, login merge, abandoned-cart purge.
//!
//! Every line operation is scoped to a cart id the caller resolved for its
//! own identity; an item id from another cart is reported as not found.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sf_core::cart::{CartLine, CartView, QuantityChange};
use sf_core::catalog::effective_price;
use sf_core::merge::{plan_merge, LineRef};
use sf_core::ShopError;
use sf_schemas::{CartOwner, Money, UserId};
use sqlx::{PgConnection, PgPool, Row};

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// The owner's cart id, created on first use. Concurrent first requests for
/// the same owner converge on one row.
pub async fn resolve_cart(pool: &PgPool, owner: &CartOwner) -> Result<i64> {
    let mut conn = pool.acquire().await.context("acquire connection failed")?;
    resolve_cart_in(&mut *conn, owner).await
}

async fn resolve_cart_in(conn: &mut PgConnection, owner: &CartOwner) -> Result<i64> {
    let row = match owner {
        CartOwner::User(user_id) => {
            sqlx::query(
                r#"
                insert into carts (user_id) values ($1)
                on conflict (user_id) where user_id is not null do nothing
                "#,
            )
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .context("insert user cart failed")?;

            sqlx::query("select id from carts where user_id = $1")
                .bind(user_id)
                .fetch_one(&mut *conn)
                .await
                .context("select user cart failed")?
        }
        CartOwner::Session(key) => {
            sqlx::query(
                r#"
                insert into carts (session_key) values ($1)
                on conflict (session_key) where session_key is not null do nothing
                "#,
            )
            .bind(key)
            .execute(&mut *conn)
            .await
            .context("insert session cart failed")?;

            sqlx::query("select id from carts where session_key = $1")
                .bind(key)
                .fetch_one(&mut *conn)
                .await
                .context("select session cart failed")?
        }
    };
    Ok(row.try_get("id")?)
}

/// Row-lock the cart before touching its lines. Merge takes the cart rows
/// first too, so a line mutation and a merge queue instead of deadlocking.
/// A cart deleted underneath us (merged or purged) is not found.
async fn lock_cart(conn: &mut PgConnection, cart_id: i64) -> Result<()> {
    let found: Option<i64> = sqlx::query_scalar("select id from carts where id = $1 for update")
        .bind(cart_id)
        .fetch_optional(&mut *conn)
        .await
        .context("lock cart failed")?;
    match found {
        Some(_) => Ok(()),
        None => Err(ShopError::not_found("cart", cart_id).into()),
    }
}

async fn touch_cart(conn: &mut PgConnection, cart_id: i64) -> Result<()> {
    sqlx::query("update carts set updated_at = now() where id = $1")
        .bind(cart_id)
        .execute(&mut *conn)
        .await
        .context("touch cart failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Lines priced from the live catalog.
pub async fn load_cart(pool: &PgPool, cart_id: i64) -> Result<CartView> {
    let mut conn = pool.acquire().await.context("acquire connection failed")?;
    load_cart_in(&mut *conn, cart_id).await
}

async fn load_cart_in(conn: &mut PgConnection, cart_id: i64) -> Result<CartView> {
    let rows = sqlx::query(
        r#"
        select ci.id, ci.product_id, ci.quantity,
               p.name, p.slug, p.price, p.discount_price
        from cart_items ci
        join products p on p.id = ci.product_id
        where ci.cart_id = $1
        order by ci.id
        "#,
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await
    .context("load_cart failed")?;

    let mut lines = Vec::with_capacity(rows.len());
    for row in rows {
        let price = Money::from_minor(row.try_get("price")?);
        let discount = row
            .try_get::<Option<i64>, _>("discount_price")?
            .map(Money::from_minor);
        lines.push(CartLine {
            item_id: row.try_get("id")?,
            product_id: row.try_get("product_id")?,
            product_name: row.try_get("name")?,
            product_slug: row.try_get("slug")?,
            unit_price: effective_price(price, discount),
            quantity: row.try_get("quantity")?,
        });
    }
    Ok(CartView { cart_id, lines })
}

/// Sum of line quantities.
pub async fn cart_count(pool: &PgPool, cart_id: i64) -> Result<i64> {
    let (n,): (i64,) = sqlx::query_as(
        "select coalesce(sum(quantity), 0)::bigint from cart_items where cart_id = $1",
    )
    .bind(cart_id)
    .fetch_one(pool)
    .await
    .context("cart_count failed")?;
    Ok(n)
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// New line with `quantity`, or the existing line incremented by it.
pub async fn cart_add(pool: &PgPool, cart_id: i64, product_id: i64, quantity: i32) -> Result<CartView> {
    if quantity < 1 {
        return Err(ShopError::validation("quantity", "must be at least 1").into());
    }

    crate::with_retry("cart_add", || cart_add_once(pool, cart_id, product_id, quantity)).await
}

async fn cart_add_once(pool: &PgPool, cart_id: i64, product_id: i64, quantity: i32) -> Result<CartView> {
    let mut tx = pool.begin().await.context("begin cart_add failed")?;
    lock_cart(&mut *tx, cart_id).await?;

    let active: Option<bool> = sqlx::query_scalar("select is_active from products where id = $1")
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await
        .context("product lookup failed")?;
    if active != Some(true) {
        return Err(ShopError::not_found("product", product_id).into());
    }

    let res = sqlx::query(
        r#"
        insert into cart_items (cart_id, product_id, quantity)
        values ($1, $2, $3)
        on conflict (cart_id, product_id)
        do update set quantity = cart_items.quantity + excluded.quantity
        "#,
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(quantity)
    .execute(&mut *tx)
    .await;

    match res {
        Ok(_) => {}
        // integer overflow on the increment
        Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("22003") => {
            return Err(ShopError::validation("quantity", "too large").into())
        }
        Err(e) => return Err(anyhow::Error::new(e).context("upsert cart_item failed")),
    }

    touch_cart(&mut *tx, cart_id).await?;
    let view = load_cart_in(&mut *tx, cart_id).await?;
    tx.commit().await.context("commit cart_add failed")?;
    Ok(view)
}

/// `Remove` deletes the line; `Set(q)` sets it to exactly `q`.
pub async fn cart_update(
    pool: &PgPool,
    cart_id: i64,
    item_id: i64,
    change: QuantityChange,
) -> Result<CartView> {
    crate::with_retry("cart_update", || cart_update_once(pool, cart_id, item_id, change)).await
}

async fn cart_update_once(
    pool: &PgPool,
    cart_id: i64,
    item_id: i64,
    change: QuantityChange,
) -> Result<CartView> {
    let mut tx = pool.begin().await.context("begin cart_update failed")?;
    lock_cart(&mut *tx, cart_id).await?;

    let affected = match change {
        QuantityChange::Remove => sqlx::query("delete from cart_items where id = $1 and cart_id = $2")
            .bind(item_id)
            .bind(cart_id)
            .execute(&mut *tx)
            .await
            .context("delete cart_item failed")?,
        QuantityChange::Set(q) => {
            sqlx::query("update cart_items set quantity = $3 where id = $1 and cart_id = $2")
                .bind(item_id)
                .bind(cart_id)
                .bind(q)
                .execute(&mut *tx)
                .await
                .context("update cart_item failed")?
        }
    }
    .rows_affected();

    if affected == 0 {
        return Err(ShopError::not_found("cart item", item_id).into());
    }

    touch_cart(&mut *tx, cart_id).await?;
    let view = load_cart_in(&mut *tx, cart_id).await?;
    tx.commit().await.context("commit cart_update failed")?;
    Ok(view)
}

pub async fn cart_remove(pool: &PgPool, cart_id: i64, item_id: i64) -> Result<CartView> {
    cart_update(pool, cart_id, item_id, QuantityChange::Remove).await
}

// ---------------------------------------------------------------------------
// Login merge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub anonymous_cart_id: Option<i64>,
    pub user_cart_id: Option<i64>,
    pub moved: usize,
    pub combined: usize,
}

async fn lock_lines(conn: &mut PgConnection, cart_id: i64) -> Result<Vec<LineRef>> {
    let rows = sqlx::query(
        "select id, product_id, quantity from cart_items where cart_id = $1 order by id for update",
    )
    .bind(cart_id)
    .fetch_all(&mut *conn)
    .await
    .context("lock cart_items failed")?;

    rows.iter()
        .map(|r| -> Result<LineRef> {
            Ok(LineRef {
                item_id: r.try_get("id")?,
                product_id: r.try_get("product_id")?,
                quantity: r.try_get("quantity")?,
            })
        })
        .collect()
}

/// Fold the session's anonymous cart into the user's cart, then delete it.
/// No anonymous cart is a no-op.
pub async fn merge_on_login(pool: &PgPool, session_key: &str, user_id: UserId) -> Result<MergeSummary> {
    crate::with_retry("merge_on_login", || merge_once(pool, session_key, user_id)).await
}

async fn merge_once(pool: &PgPool, session_key: &str, user_id: UserId) -> Result<MergeSummary> {
    let mut tx = pool.begin().await.context("begin merge failed")?;

    let anon: Option<i64> =
        sqlx::query_scalar("select id from carts where session_key = $1 for update")
            .bind(session_key)
            .fetch_optional(&mut *tx)
            .await
            .context("lock anonymous cart failed")?;
    let Some(anon_id) = anon else {
        return Ok(MergeSummary::default());
    };

    let user_cart = resolve_cart_in(&mut *tx, &CartOwner::User(user_id)).await?;
    sqlx::query("select id from carts where id = $1 for update")
        .bind(user_cart)
        .execute(&mut *tx)
        .await
        .context("lock user cart failed")?;

    let user_lines = lock_lines(&mut *tx, user_cart).await?;
    let guest_lines = lock_lines(&mut *tx, anon_id).await?;
    let plan = plan_merge(&user_lines, &guest_lines)?;

    for c in &plan.combine {
        sqlx::query("update cart_items set quantity = $2 where id = $1")
            .bind(c.target_item_id)
            .bind(c.new_quantity)
            .execute(&mut *tx)
            .await
            .context("combine cart_item failed")?;
    }
    if !plan.reassign.is_empty() {
        sqlx::query("update cart_items set cart_id = $1 where id = any($2)")
            .bind(user_cart)
            .bind(&plan.reassign)
            .execute(&mut *tx)
            .await
            .context("move cart_items failed")?;
    }

    // Cascades to the combined source lines.
    sqlx::query("delete from carts where id = $1")
        .bind(anon_id)
        .execute(&mut *tx)
        .await
        .context("delete anonymous cart failed")?;
    touch_cart(&mut *tx, user_cart).await?;

    tx.commit().await.context("commit merge failed")?;

    let summary = MergeSummary {
        anonymous_cart_id: Some(anon_id),
        user_cart_id: Some(user_cart),
        moved: plan.reassign.len(),
        combined: plan.combine.len(),
    };
    tracing::info!(
        user_id,
        anonymous_cart_id = anon_id,
        user_cart_id = user_cart,
        moved = summary.moved,
        combined = summary.combined,
        "anonymous cart merged on login"
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Abandoned anonymous carts
// ---------------------------------------------------------------------------

/// Delete anonymous carts untouched for more than `ttl_days`. User carts are
/// never purged. Returns the number of carts deleted.
pub async fn purge_stale_anonymous_carts(pool: &PgPool, ttl_days: u32, now: DateTime<Utc>) -> Result<u64> {
    if ttl_days == 0 {
        return Err(ShopError::validation("ttl_days", "must be at least 1").into());
    }
    let cutoff = Duration::try_days(i64::from(ttl_days))
        .and_then(|ttl| now.checked_sub_signed(ttl))
        .ok_or_else(|| ShopError::validation("ttl_days", "too large"))?;
    let res = sqlx::query("delete from carts where session_key is not null and updated_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await
        .context("purge anonymous carts failed")?;
    let n = res.rows_affected();
    tracing::info!(purged = n, ttl_days, cutoff = %cutoff, "stale anonymous carts purged");
    Ok(n)
}
