//! Cart aggregate: lines priced from the live catalog.

use serde::{Deserialize, Serialize};
use sf_schemas::Money;

use crate::ShopError;

/// One (product, quantity) line with the product's *current* effective price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_slug: String,
    pub unit_price: Money,
    pub quantity: i32,
}

impl CartLine {
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub cart_id: i64,
    pub lines: Vec<CartLine>,
}

impl CartView {
    /// Sum of line quantities.
    pub fn count(&self) -> i64 {
        self.lines.iter().map(|l| i64::from(l.quantity)).sum()
    }

    /// Always computed from live prices; never cached.
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, item_id: i64) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.item_id == item_id)
    }
}

/// What an `update(item, quantity)` request does to the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    Remove,
    Set(i32),
}

/// `<= 0` removes, anything else sets exactly (not additive).
pub fn quantity_change(requested: i64) -> Result<QuantityChange, ShopError> {
    if requested <= 0 {
        return Ok(QuantityChange::Remove);
    }
    i32::try_from(requested)
        .map(QuantityChange::Set)
        .map_err(|_| ShopError::validation("quantity", "too large"))
}

/// Quantity for `add`: at least one, and it becomes the line quantity as-is
/// on first add.
pub fn add_quantity(requested: i64) -> Result<i32, ShopError> {
    if requested < 1 {
        return Err(ShopError::validation("quantity", "must be at least 1"));
    }
    i32::try_from(requested).map_err(|_| ShopError::validation("quantity", "too large"))
}
