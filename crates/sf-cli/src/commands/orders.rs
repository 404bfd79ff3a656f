//! Order command handlers: `sf order set-status | show | list`.

use anyhow::Result;
use sf_core::orders::OrderFilter;
use sf_core::status::parse_status;

pub async fn set_status(
    config_paths: &[String],
    order_id: i64,
    status: &str,
    note: Option<&str>,
    actor: Option<i64>,
) -> Result<()> {
    // Refuse a bad status before opening a connection.
    parse_status(status)?;

    let (pool, cfg) = super::connect(config_paths).await?;
    let change = sf_db::orders::set_order_status(
        &pool,
        order_id,
        status,
        note,
        actor,
        cfg.orders.transition_policy,
    )
    .await?;
    println!(
        "order_id={} from={} to={} changed={}",
        change.order_id,
        change.from.as_str(),
        change.to.as_str(),
        change.changed
    );
    Ok(())
}

pub async fn show(config_paths: &[String], order_id: i64) -> Result<()> {
    let (pool, _) = super::connect(config_paths).await?;
    let d = sf_db::orders::fetch_order_detail(&pool, order_id).await?;

    println!("order_id={}", d.order.id);
    println!("status={}", d.order.status.as_str());
    println!("progress_percent={}", d.progress_percent);
    println!("total={}", d.order.total);
    println!("items_total={}", d.items_total());
    println!("created_at_utc={}", d.order.created_at.to_rfc3339());
    println!("tracking_code={}", d.order.tracking_code);
    for item in &d.items {
        println!(
            "item product_id={} name={:?} unit_price={} quantity={}",
            item.product_id.map(|id| id.to_string()).unwrap_or_default(),
            item.product_name,
            item.unit_price,
            item.quantity
        );
    }
    for stage in &d.completed_stages {
        println!("stage status={} at_utc={}", stage.status.as_str(), stage.at.to_rfc3339());
    }
    for h in &d.history {
        println!(
            "history from={} to={} at_utc={} note={:?}",
            h.old_status.as_str(),
            h.new_status.as_str(),
            h.created_at.to_rfc3339(),
            h.note
        );
    }
    Ok(())
}

pub async fn list(
    config_paths: &[String],
    status: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<()> {
    let filter = OrderFilter::from_query(status, start_date, end_date)?;

    let (pool, _) = super::connect(config_paths).await?;
    let orders = sf_db::orders::list_orders(&pool, &filter).await?;
    for o in &orders {
        println!(
            "order_id={} status={} total={} created_at_utc={}",
            o.id,
            o.status.as_str(),
            o.total,
            o.created_at.to_rfc3339()
        );
    }
    println!("orders={}", orders.len());
    Ok(())
}
