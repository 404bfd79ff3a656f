//! Catalog rules: slug derivation, effective price, listing parameters.
//!
//! Discount semantics: `discount_price` is an absolute override (the sale
//! price), applied when present and non-zero. The alternative reading seen in
//! older data, "subtract the discount from the list price", is not supported.
//! A sale price above the list price is refused when the product is written.

use serde::Serialize;
use sf_schemas::Money;

use crate::ShopError;

/// Maximum stored slug length for products.
pub const PRODUCT_SLUG_MAX: usize = 220;

/// Lowercase ASCII slug. Whitespace, `-` and `_` runs become one `-`; every
/// other non-alphanumeric character is dropped.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }
    out
}

/// Category slug: the explicit one if given, else derived from the name.
pub fn category_slug(name: &str, explicit: Option<&str>) -> Result<String, ShopError> {
    let slug = match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => slugify(s),
        None => slugify(name),
    };
    if slug.is_empty() {
        return Err(ShopError::validation("slug", "name produces an empty slug"));
    }
    Ok(slug)
}

/// Product slug: the explicit one if given, else `slugify("{name}-{category_id}")`.
pub fn product_slug(
    name: &str,
    category_id: i64,
    explicit: Option<&str>,
) -> Result<String, ShopError> {
    let mut slug = match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => slugify(s),
        None => slugify(&format!("{name}-{category_id}")),
    };
    // slugify output is ASCII, so byte truncation is char-safe.
    slug.truncate(PRODUCT_SLUG_MAX);
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        return Err(ShopError::validation("slug", "name produces an empty slug"));
    }
    Ok(slug)
}

/// Price actually charged.
pub fn effective_price(price: Money, discount_price: Option<Money>) -> Money {
    match discount_price {
        Some(d) if !d.is_zero() => d,
        _ => price,
    }
}

pub fn validate_prices(price: Money, discount_price: Option<Money>) -> Result<(), ShopError> {
    if price < Money::ZERO {
        return Err(ShopError::validation("price", "must not be negative"));
    }
    if let Some(d) = discount_price {
        if d < Money::ZERO {
            return Err(ShopError::validation("discount_price", "must not be negative"));
        }
        if d > price {
            return Err(ShopError::validation(
                "discount_price",
                format!("sale price {d} exceeds list price {price}"),
            ));
        }
    }
    Ok(())
}

pub fn validate_stock(stock: i32) -> Result<(), ShopError> {
    if stock < 0 {
        return Err(ShopError::validation("stock", "must not be negative"));
    }
    Ok(())
}

/// Listing order. Unknown values fall back to newest-first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Newest,
    NameAsc,
    NameDesc,
    PriceLow,
    PriceHigh,
}

impl ProductSort {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("az") => ProductSort::NameAsc,
            Some("za") => ProductSort::NameDesc,
            Some("price_low") => ProductSort::PriceLow,
            Some("price_high") => ProductSort::PriceHigh,
            _ => ProductSort::Newest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductSort::Newest => "new",
            ProductSort::NameAsc => "az",
            ProductSort::NameDesc => "za",
            ProductSort::PriceLow => "price_low",
            ProductSort::PriceHigh => "price_high",
        }
    }
}

/// Resolved pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl PageWindow {
    /// Non-numeric or non-positive page numbers land on page 1; numbers past
    /// the end land on the last page.
    pub fn resolve(requested: Option<&str>, per_page: i64, total_items: i64) -> Self {
        let per_page = per_page.max(1);
        let total_items = total_items.max(0);
        let total_pages = ((total_items + per_page - 1) / per_page).max(1);
        let page = requested
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
            .min(total_pages);
        Self {
            page,
            per_page,
            total_items,
            total_pages,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}
