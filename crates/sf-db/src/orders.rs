//! Order status transitions, tracking metadata, and order queries.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_core::orders::{DateRange, OrderDetail, OrderFilter};
use sf_core::status::{parse_status, plan_transition, stamp, TransitionPolicy};
use sf_core::ShopError;
use sf_schemas::{Order, OrderStatus, OrderTracking, UserId};
use sqlx::PgPool;

use crate::rows::{
    history_from_row, item_from_row, lock_tracking, order_from_row, parse_db_status,
    tracking_from_row, upsert_tracking, ORDER_COLUMNS, TRACKING_COLUMNS,
};

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub order_id: i64,
    pub from: OrderStatus,
    pub to: OrderStatus,
    /// False when the requested status was already current.
    pub changed: bool,
}

/// The only way an order's status changes. A real change writes the status,
/// one history row and the new stage's tracking timestamp in one transaction;
/// re-requesting the current status writes nothing.
pub async fn set_order_status(
    pool: &PgPool,
    order_id: i64,
    requested: &str,
    note: Option<&str>,
    actor: Option<UserId>,
    policy: TransitionPolicy,
) -> Result<StatusChange> {
    let to = parse_status(requested)?;
    crate::with_retry("set_order_status", || {
        set_status_once(pool, order_id, to, note, actor, policy)
    })
    .await
}

async fn set_status_once(
    pool: &PgPool,
    order_id: i64,
    to: OrderStatus,
    note: Option<&str>,
    actor: Option<UserId>,
    policy: TransitionPolicy,
) -> Result<StatusChange> {
    let mut tx = pool.begin().await.context("begin set_order_status failed")?;

    let current: Option<String> = sqlx::query_scalar("select status from orders where id = $1 for update")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .context("lock order failed")?;
    let current = parse_db_status(&current.ok_or_else(|| ShopError::not_found("order", order_id))?)?;

    let Some(t) = plan_transition(current, to, note, actor, policy)? else {
        return Ok(StatusChange {
            order_id,
            from: current,
            to,
            changed: false,
        });
    };

    sqlx::query("update orders set status = $2 where id = $1")
        .bind(order_id)
        .bind(t.to.as_str())
        .execute(&mut *tx)
        .await
        .context("update order status failed")?;

    sqlx::query(
        r#"
        insert into order_status_history (order_id, old_status, new_status, note, actor_user_id)
        values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(order_id)
    .bind(t.from.as_str())
    .bind(t.to.as_str())
    .bind(&t.note)
    .bind(t.actor)
    .execute(&mut *tx)
    .await
    .context("insert status history failed")?;

    let mut tracking = lock_tracking(&mut *tx, order_id).await?;
    stamp(&mut tracking, t.to, Utc::now());
    upsert_tracking(&mut *tx, &tracking).await?;

    tx.commit().await.context("commit set_order_status failed")?;

    tracing::info!(
        order_id,
        from = t.from.as_str(),
        to = t.to.as_str(),
        actor = ?t.actor,
        "order status changed"
    );

    Ok(StatusChange {
        order_id,
        from: t.from,
        to: t.to,
        changed: true,
    })
}

// ---------------------------------------------------------------------------
// Courier metadata
// ---------------------------------------------------------------------------

/// Staff edits to courier fields. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingPatch {
    pub tracking_number: Option<String>,
    pub courier_service: Option<String>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub current_location: Option<String>,
    pub notes: Option<String>,
}

/// Never touches status or history. A new tracking number is mirrored onto
/// the order's `tracking_code`.
pub async fn update_tracking_details(
    pool: &PgPool,
    order_id: i64,
    patch: &TrackingPatch,
) -> Result<OrderTracking> {
    let mut tx = pool.begin().await.context("begin update_tracking_details failed")?;

    let exists: Option<i64> = sqlx::query_scalar("select id from orders where id = $1 for update")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .context("lock order failed")?;
    if exists.is_none() {
        return Err(ShopError::not_found("order", order_id).into());
    }

    let mut t = lock_tracking(&mut *tx, order_id).await?;
    if let Some(v) = &patch.tracking_number {
        t.tracking_number = v.trim().to_string();
    }
    if let Some(v) = &patch.courier_service {
        t.courier_service = v.trim().to_string();
    }
    if let Some(v) = patch.estimated_delivery {
        t.estimated_delivery = Some(v);
    }
    if let Some(v) = &patch.current_location {
        t.current_location = v.trim().to_string();
    }
    if let Some(v) = &patch.notes {
        t.notes = v.trim().to_string();
    }
    t.last_updated = Some(Utc::now());
    upsert_tracking(&mut *tx, &t).await?;

    if patch.tracking_number.is_some() {
        sqlx::query("update orders set tracking_code = $2 where id = $1")
            .bind(order_id)
            .bind(&t.tracking_number)
            .execute(&mut *tx)
            .await
            .context("update tracking_code failed")?;
    }

    tx.commit().await.context("commit update_tracking_details failed")?;
    tracing::info!(order_id, "tracking details updated");
    Ok(t)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub async fn fetch_order(pool: &PgPool, order_id: i64) -> Result<Order> {
    let sql = format!("select {ORDER_COLUMNS} from orders where id = $1");
    let row = sqlx::query(&sql)
        .bind(order_id)
        .fetch_optional(pool)
        .await
        .context("fetch_order failed")?
        .ok_or_else(|| ShopError::not_found("order", order_id))?;
    order_from_row(&row)
}

/// Order, items, tracking, history (newest first) and progress.
pub async fn fetch_order_detail(pool: &PgPool, order_id: i64) -> Result<OrderDetail> {
    let order = fetch_order(pool, order_id).await?;

    let items = sqlx::query(
        r#"
        select id, order_id, product_id, product_name, unit_price, quantity
        from order_items
        where order_id = $1
        order by id
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
    .context("fetch order_items failed")?
    .iter()
    .map(item_from_row)
    .collect::<Result<Vec<_>>>()?;

    let tracking_sql = format!("select {TRACKING_COLUMNS} from order_tracking where order_id = $1");
    let tracking = sqlx::query(&tracking_sql)
        .bind(order_id)
        .fetch_optional(pool)
        .await
        .context("fetch order_tracking failed")?
        .as_ref()
        .map(tracking_from_row)
        .transpose()?;

    let history = sqlx::query(
        r#"
        select id, order_id, old_status, new_status, note, actor_user_id, created_at
        from order_status_history
        where order_id = $1
        order by created_at desc, id desc
        "#,
    )
    .bind(order_id)
    .fetch_all(pool)
    .await
    .context("fetch status history failed")?
    .iter()
    .map(history_from_row)
    .collect::<Result<Vec<_>>>()?;

    Ok(OrderDetail::assemble(order, items, tracking, history))
}

/// A customer's orders within `range`, newest first.
pub async fn list_orders_for_user(pool: &PgPool, user_id: UserId, range: DateRange) -> Result<Vec<Order>> {
    let (lo, hi) = range.bounds_utc();
    let sql = format!(
        "select {ORDER_COLUMNS} from orders \
         where user_id = $1 and created_at >= $2 and created_at < $3 \
         order by created_at desc, id desc"
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(lo)
        .bind(hi)
        .fetch_all(pool)
        .await
        .context("list_orders_for_user failed")?;
    rows.iter().map(order_from_row).collect()
}

/// Staff listing: every order matching the filter, newest first.
pub async fn list_orders(pool: &PgPool, filter: &OrderFilter) -> Result<Vec<Order>> {
    let (lo, hi) = match filter.range.map(|r| r.bounds_utc()) {
        Some((lo, hi)) => (Some(lo), Some(hi)),
        None => (None, None),
    };
    let sql = format!(
        "select {ORDER_COLUMNS} from orders \
         where ($1::text is null or status = $1) \
           and ($2::timestamptz is null or created_at >= $2) \
           and ($3::timestamptz is null or created_at < $3) \
         order by created_at desc, id desc"
    );
    let rows = sqlx::query(&sql)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(lo)
        .bind(hi)
        .fetch_all(pool)
        .await
        .context("list_orders failed")?;
    rows.iter().map(order_from_row).collect()
}
