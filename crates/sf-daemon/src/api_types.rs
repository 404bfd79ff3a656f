//! Request and response types for the sf-daemon HTTP endpoints.
//!
//! Responses are `Serialize + Deserialize` where tests decode them. No
//! business logic lives here beyond turning raw form strings into typed
//! values.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sf_core::ShopError;
use sf_schemas::{Money, Product, ShippingDetails};

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub config_hash: String,
}

/// Body of every refused or failed request.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Always false; lets cart scripts branch on one field.
    pub success: bool,
    pub error: String,
    pub kind: &'static str,
}

/// Integer form field. Missing or blank fields count as absent.
pub fn form_int(field: &'static str, raw: Option<&str>) -> Result<Option<i64>, ShopError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ShopError::validation(field, "must be a whole number")),
    }
}

pub fn required_int(field: &'static str, raw: Option<&str>) -> Result<i64, ShopError> {
    form_int(field, raw)?.ok_or_else(|| ShopError::validation(field, "this field is required"))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductListParams {
    pub category: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetailResponse {
    pub product: Product,
    pub effective_price: Money,
    pub related: Vec<Product>,
}

/// Staff product edit. `clear_discount` / `clear_image` null the column.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductPatchRequest {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub discount_price: Option<Money>,
    pub clear_discount: bool,
    pub stock: Option<i32>,
    pub image: Option<String>,
    pub clear_image: bool,
    pub is_active: Option<bool>,
}

impl ProductPatchRequest {
    pub fn into_patch(self) -> sf_db::catalog::ProductPatch {
        let discount_price = match (self.clear_discount, self.discount_price) {
            (true, _) => Some(None),
            (false, Some(d)) => Some(Some(d)),
            (false, None) => None,
        };
        let image = match (self.clear_image, self.image) {
            (true, _) => Some(None),
            (false, Some(i)) => Some(Some(i)),
            (false, None) => None,
        };
        sf_db::catalog::ProductPatch {
            category_id: self.category_id,
            name: self.name,
            sku: self.sku,
            short_description: self.short_description,
            description: self.description,
            price: self.price,
            discount_price,
            stock: self.stock,
            image,
            is_active: self.is_active,
        }
    }
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartAddForm {
    pub product_id: Option<String>,
    pub quantity: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartUpdateForm {
    pub item_id: Option<String>,
    pub quantity: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartRemoveForm {
    pub item_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartMutationResponse {
    pub success: bool,
    pub cart_count: i64,
    pub total: Money,
    /// Line subtotal after an update that kept the line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartCountResponse {
    pub cart_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub item_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub product_slug: String,
    pub unit_price: Money,
    pub quantity: i32,
    pub subtotal: Money,
}

#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    pub cart_id: i64,
    pub lines: Vec<CartLineView>,
    pub cart_count: i64,
    pub total: Money,
}

impl From<sf_core::cart::CartView> for CartResponse {
    fn from(view: sf_core::cart::CartView) -> Self {
        let cart_count = view.count();
        let total = view.total();
        let lines = view
            .lines
            .into_iter()
            .map(|l| CartLineView {
                subtotal: l.subtotal(),
                item_id: l.item_id,
                product_id: l.product_id,
                product_name: l.product_name,
                product_slug: l.product_slug,
                unit_price: l.unit_price,
                quantity: l.quantity,
            })
            .collect();
        Self {
            cart_id: view.cart_id,
            lines,
            cart_count,
            total,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginEvent {
    pub user_id: i64,
    pub session_key: String,
}

// ---------------------------------------------------------------------------
// Checkout
// ---------------------------------------------------------------------------

/// Checkout form. Every field is optional on the wire so a missing field is
/// reported as a field validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CheckoutForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl From<CheckoutForm> for ShippingDetails {
    fn from(f: CheckoutForm) -> Self {
        ShippingDetails {
            full_name: f.full_name,
            email: f.email,
            phone: f.phone,
            address_line1: f.address_line1,
            address_line2: f.address_line2,
            city: f.city,
            state: f.state,
            postal_code: f.postal_code,
            country: f.country,
        }
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DateRangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffOrderParams {
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<sf_schemas::Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<sf_core::orders::DateRange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusForm {
    pub status: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackingForm {
    pub tracking_number: Option<String>,
    pub courier_service: Option<String>,
    /// RFC 3339 instant or a bare `YYYY-MM-DD` date.
    pub estimated_delivery: Option<String>,
    pub current_location: Option<String>,
    pub notes: Option<String>,
}

impl TrackingForm {
    pub fn into_patch(self) -> Result<sf_db::orders::TrackingPatch, ShopError> {
        let estimated_delivery = match self
            .estimated_delivery
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            None => None,
            Some(raw) => Some(parse_instant(raw).ok_or_else(|| {
                ShopError::validation("estimated_delivery", "expected YYYY-MM-DD or RFC 3339")
            })?),
        };
        Ok(sf_db::orders::TrackingPatch {
            tracking_number: self.tracking_number,
            courier_service: self.courier_service,
            estimated_delivery,
            current_location: self.current_location,
            notes: self.notes,
        })
    }
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
}
