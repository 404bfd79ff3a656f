/// JSON-pointer prefixes read by [`crate::ShopConfig::from_json`].
///
/// Keep this in step with `settings.rs`: a key added there and not here is
/// reported as unused.
pub static CONSUMED_POINTERS: &[&str] = &[
    "/server/bind_addr",
    "/server/session_cookie",
    "/database/url_env",
    "/database/max_connections",
    "/database/migrate_on_boot",
    "/cart/anonymous_ttl_days",
    "/checkout/stock_policy",
    "/orders/transition_policy",
    "/orders/my_orders_default_days",
    "/catalog/page_size",
];
