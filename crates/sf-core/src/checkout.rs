//! Checkout planning: cart lines → frozen order lines + stock decrements.
//!
//! The plan is computed from rows the caller has already locked; applying it
//! (insert order, items, tracking, decrement stock, empty cart) happens in one
//! storage transaction.

use serde::{Deserialize, Serialize};
use sf_schemas::{Money, ShippingDetails};

use crate::catalog::effective_price;
use crate::ShopError;

/// What to do when a line asks for more than the product has in stock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    /// Fail the whole checkout; nothing is committed.
    #[default]
    Strict,
    /// Accept the order and leave that product's stock unchanged.
    Lenient,
}

/// A cart line joined with its product row as read under lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockedLine {
    pub product_id: i64,
    pub product_name: String,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub stock: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub product_id: i64,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockDecrement {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub items: Vec<PlannedItem>,
    pub total: Money,
    pub decrements: Vec<StockDecrement>,
    /// Lenient policy only: products whose stock is left untouched.
    pub short_stock: Vec<i64>,
}

pub fn plan_checkout(lines: &[StockedLine], policy: StockPolicy) -> Result<CheckoutPlan, ShopError> {
    if lines.is_empty() {
        return Err(ShopError::EmptyCart);
    }

    let mut items = Vec::with_capacity(lines.len());
    let mut decrements = Vec::with_capacity(lines.len());
    let mut short_stock = Vec::new();

    for line in lines {
        items.push(PlannedItem {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            unit_price: effective_price(line.price, line.discount_price),
            quantity: line.quantity,
        });

        if line.stock >= line.quantity {
            decrements.push(StockDecrement {
                product_id: line.product_id,
                quantity: line.quantity,
            });
            continue;
        }

        match policy {
            StockPolicy::Strict => {
                return Err(ShopError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: line.stock,
                })
            }
            StockPolicy::Lenient => short_stock.push(line.product_id),
        }
    }

    let total = items.iter().map(|i| i.unit_price.times(i.quantity)).sum();

    Ok(CheckoutPlan {
        items,
        total,
        decrements,
        short_stock,
    })
}

/// Trim every field and check presence, length and shape.
pub fn validate_shipping(raw: &ShippingDetails) -> Result<ShippingDetails, ShopError> {
    let s = ShippingDetails {
        full_name: raw.full_name.trim().to_string(),
        email: raw.email.trim().to_string(),
        phone: raw.phone.trim().to_string(),
        address_line1: raw.address_line1.trim().to_string(),
        address_line2: raw.address_line2.trim().to_string(),
        city: raw.city.trim().to_string(),
        state: raw.state.trim().to_string(),
        postal_code: raw.postal_code.trim().to_string(),
        country: match raw.country.trim() {
            "" => sf_schemas::default_country(),
            c => c.to_string(),
        },
    };

    required("full_name", &s.full_name, 200)?;
    required("email", &s.email, 254)?;
    required("phone", &s.phone, 30)?;
    required("address_line1", &s.address_line1, 250)?;
    max_len("address_line2", &s.address_line2, 250)?;
    required("city", &s.city, 120)?;
    required("state", &s.state, 120)?;
    required("postal_code", &s.postal_code, 20)?;
    max_len("country", &s.country, 50)?;

    if !looks_like_email(&s.email) {
        return Err(ShopError::validation("email", "not a valid email address"));
    }
    let digits = s.phone.chars().filter(char::is_ascii_digit).count();
    let phone_chars_ok = s
        .phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
    if !phone_chars_ok || digits < 7 {
        return Err(ShopError::validation("phone", "not a valid phone number"));
    }

    Ok(s)
}

fn required(field: &'static str, value: &str, max: usize) -> Result<(), ShopError> {
    if value.is_empty() {
        return Err(ShopError::validation(field, "this field is required"));
    }
    max_len(field, value, max)
}

fn max_len(field: &'static str, value: &str, max: usize) -> Result<(), ShopError> {
    if value.chars().count() > max {
        return Err(ShopError::validation(
            field,
            format!("at most {max} characters"),
        ));
    }
    Ok(())
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(looks_like_email("a@b.in"));
        assert!(looks_like_email("first.last@shop.co.in"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.in"));
        assert!(!looks_like_email("a@@b.in"));
        assert!(!looks_like_email("a b@c.in"));
        assert!(!looks_like_email("a@.in"));
    }
}
