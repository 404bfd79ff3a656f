//! Row → record mapping shared by the query modules.

use anyhow::{anyhow, Context, Result};
use sf_schemas::{
    Category, Money, Order, OrderItem, OrderStatus, OrderTracking, Product, ShippingDetails,
    StatusHistoryEntry,
};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};

pub(crate) const CATEGORY_COLUMNS: &str = "id, name, slug, description, banner_image";

pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.category_id, p.name, p.slug, p.sku, \
     p.short_description, p.description, p.price, p.discount_price, p.stock, p.image, \
     p.is_active, p.created_at";

pub(crate) const ORDER_COLUMNS: &str = "id, user_id, full_name, email, phone, address_line1, \
     address_line2, city, state, postal_code, country, total, status, payment_method, \
     tracking_code, created_at";

pub(crate) const TRACKING_COLUMNS: &str = "order_id, placed_at, in_process_at, delivery_soon_at, \
     out_for_delivery_at, delivered_at, cancelled_at, estimated_delivery, tracking_number, \
     courier_service, delivery_address, current_location, notes, last_updated";

pub(crate) fn parse_db_status(raw: &str) -> Result<OrderStatus> {
    OrderStatus::parse(raw).ok_or_else(|| anyhow!("unknown order status in db: {raw}"))
}

pub(crate) fn category_from_row(row: &PgRow) -> Result<Category> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        banner_image: row.try_get("banner_image")?,
    })
}

pub(crate) fn product_from_row(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: row.try_get("id")?,
        category_id: row.try_get("category_id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        sku: row.try_get("sku")?,
        short_description: row.try_get("short_description")?,
        description: row.try_get("description")?,
        price: Money::from_minor(row.try_get("price")?),
        discount_price: row
            .try_get::<Option<i64>, _>("discount_price")?
            .map(Money::from_minor),
        stock: row.try_get("stock")?,
        image: row.try_get("image")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn order_from_row(row: &PgRow) -> Result<Order> {
    let status: String = row.try_get("status")?;
    Ok(Order {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        shipping: ShippingDetails {
            full_name: row.try_get("full_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address_line1: row.try_get("address_line1")?,
            address_line2: row.try_get("address_line2")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            postal_code: row.try_get("postal_code")?,
            country: row.try_get("country")?,
        },
        total: Money::from_minor(row.try_get("total")?),
        status: parse_db_status(&status)?,
        payment_method: row.try_get("payment_method")?,
        tracking_code: row.try_get("tracking_code")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn item_from_row(row: &PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        product_id: row.try_get("product_id")?,
        product_name: row.try_get("product_name")?,
        unit_price: Money::from_minor(row.try_get("unit_price")?),
        quantity: row.try_get("quantity")?,
    })
}

pub(crate) fn history_from_row(row: &PgRow) -> Result<StatusHistoryEntry> {
    let old: String = row.try_get("old_status")?;
    let new: String = row.try_get("new_status")?;
    Ok(StatusHistoryEntry {
        id: row.try_get("id")?,
        order_id: row.try_get("order_id")?,
        old_status: parse_db_status(&old)?,
        new_status: parse_db_status(&new)?,
        note: row.try_get("note")?,
        actor_user_id: row.try_get("actor_user_id")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn tracking_from_row(row: &PgRow) -> Result<OrderTracking> {
    Ok(OrderTracking {
        order_id: row.try_get("order_id")?,
        placed_at: row.try_get("placed_at")?,
        in_process_at: row.try_get("in_process_at")?,
        delivery_soon_at: row.try_get("delivery_soon_at")?,
        out_for_delivery_at: row.try_get("out_for_delivery_at")?,
        delivered_at: row.try_get("delivered_at")?,
        cancelled_at: row.try_get("cancelled_at")?,
        estimated_delivery: row.try_get("estimated_delivery")?,
        tracking_number: row.try_get("tracking_number")?,
        courier_service: row.try_get("courier_service")?,
        delivery_address: row.try_get("delivery_address")?,
        current_location: row.try_get("current_location")?,
        notes: row.try_get("notes")?,
        last_updated: row.try_get("last_updated")?,
    })
}

/// Write the whole tracking row, inserting it if the order has none yet.
pub(crate) async fn upsert_tracking(conn: &mut PgConnection, t: &OrderTracking) -> Result<()> {
    sqlx::query(
        r#"
        insert into order_tracking (
          order_id, placed_at, in_process_at, delivery_soon_at, out_for_delivery_at,
          delivered_at, cancelled_at, estimated_delivery, tracking_number, courier_service,
          delivery_address, current_location, notes, last_updated
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14
        )
        on conflict (order_id) do update set
          placed_at = excluded.placed_at,
          in_process_at = excluded.in_process_at,
          delivery_soon_at = excluded.delivery_soon_at,
          out_for_delivery_at = excluded.out_for_delivery_at,
          delivered_at = excluded.delivered_at,
          cancelled_at = excluded.cancelled_at,
          estimated_delivery = excluded.estimated_delivery,
          tracking_number = excluded.tracking_number,
          courier_service = excluded.courier_service,
          delivery_address = excluded.delivery_address,
          current_location = excluded.current_location,
          notes = excluded.notes,
          last_updated = excluded.last_updated
        "#,
    )
    .bind(t.order_id)
    .bind(t.placed_at)
    .bind(t.in_process_at)
    .bind(t.delivery_soon_at)
    .bind(t.out_for_delivery_at)
    .bind(t.delivered_at)
    .bind(t.cancelled_at)
    .bind(t.estimated_delivery)
    .bind(&t.tracking_number)
    .bind(&t.courier_service)
    .bind(&t.delivery_address)
    .bind(&t.current_location)
    .bind(&t.notes)
    .bind(t.last_updated)
    .execute(&mut *conn)
    .await
    .context("upsert order_tracking failed")?;
    Ok(())
}

/// Tracking row under `FOR UPDATE`, or an empty one for the order.
pub(crate) async fn lock_tracking(conn: &mut PgConnection, order_id: i64) -> Result<OrderTracking> {
    let sql = format!("select {TRACKING_COLUMNS} from order_tracking where order_id = $1 for update");
    let row = sqlx::query(&sql)
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await
        .context("lock order_tracking failed")?;
    match row {
        Some(r) => tracking_from_row(&r),
        None => Ok(OrderTracking {
            order_id,
            ..Default::default()
        }),
    }
}
