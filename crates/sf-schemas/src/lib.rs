//! sf-schemas
//!
//! Plain data records shared by every storefront crate. No business logic and
//! no IO lives here; the rules that operate on these records are in `sf-core`
//! and persistence is in `sf-db`.

mod money;

pub use money::{Money, MoneyParseError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier handed to us by the auth collaborator. Users are not stored here.
pub type UserId = i64;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Who is making the current request, as reported by the auth collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Option<UserId>,
    pub is_staff: bool,
    pub session_key: Option<String>,
}

impl Identity {
    pub fn anonymous(session_key: Option<String>) -> Self {
        Self {
            user_id: None,
            is_staff: false,
            session_key,
        }
    }

    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            is_staff: false,
            session_key: None,
        }
    }

    pub fn staff(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            is_staff: true,
            session_key: None,
        }
    }
}

/// The single key a cart row is owned by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum CartOwner {
    User(UserId),
    Session(String),
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub banner_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    pub name: String,
    pub slug: String,
    pub sku: String,
    pub short_description: String,
    pub description: String,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub stock: i32,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Canonical order lifecycle. The six-stage set is the one the tracking model
/// (per-stage timestamps, progress table) is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
    InProcess,
    DeliverySoon,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Stage order used for display.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Placed,
        OrderStatus::InProcess,
        OrderStatus::DeliverySoon,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::InProcess => "IN_PROCESS",
            OrderStatus::DeliverySoon => "DELIVERY_SOON",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// Human label shown to customers and staff.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Order Placed",
            OrderStatus::InProcess => "Order in Process",
            OrderStatus::DeliverySoon => "Delivery Soon",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Exact match on the stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PLACED" => Some(OrderStatus::Placed),
            "IN_PROCESS" => Some(OrderStatus::InProcess),
            "DELIVERY_SOON" => Some(OrderStatus::DeliverySoon),
            "OUT_FOR_DELIVERY" => Some(OrderStatus::OutForDelivery),
            "DELIVERED" => Some(OrderStatus::Delivered),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shipping/contact fields captured at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
}

pub fn default_country() -> String {
    "India".to_string()
}

impl ShippingDetails {
    /// `line1[, line2], city, state, postal_code` as stored on the tracking row.
    pub fn delivery_address(&self) -> String {
        let mut parts: Vec<&str> = vec![self.address_line1.as_str()];
        if !self.address_line2.trim().is_empty() {
            parts.push(self.address_line2.as_str());
        }
        parts.extend([
            self.city.as_str(),
            self.state.as_str(),
            self.postal_code.as_str(),
        ]);
        parts.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: Option<UserId>,
    pub shipping: ShippingDetails,
    pub total: Money,
    pub status: OrderStatus,
    pub payment_method: String,
    pub tracking_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: Option<i64>,
    pub product_name: String,
    /// Frozen at checkout; never follows later catalog changes.
    pub unit_price: Money,
    pub quantity: i32,
}

impl OrderItem {
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// Append-only status log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub order_id: i64,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub note: String,
    pub actor_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Per-stage timestamps plus courier metadata, one row per order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTracking {
    pub order_id: i64,
    pub placed_at: Option<DateTime<Utc>>,
    pub in_process_at: Option<DateTime<Utc>>,
    pub delivery_soon_at: Option<DateTime<Utc>>,
    pub out_for_delivery_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub tracking_number: String,
    pub courier_service: String,
    pub delivery_address: String,
    pub current_location: String,
    pub notes: String,
    pub last_updated: Option<DateTime<Utc>>,
}

impl OrderTracking {
    pub fn stage_timestamp(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
        match status {
            OrderStatus::Placed => self.placed_at,
            OrderStatus::InProcess => self.in_process_at,
            OrderStatus::DeliverySoon => self.delivery_soon_at,
            OrderStatus::OutForDelivery => self.out_for_delivery_at,
            OrderStatus::Delivered => self.delivered_at,
            OrderStatus::Cancelled => self.cancelled_at,
        }
    }

    pub fn stage_timestamp_mut(&mut self, status: OrderStatus) -> &mut Option<DateTime<Utc>> {
        match status {
            OrderStatus::Placed => &mut self.placed_at,
            OrderStatus::InProcess => &mut self.in_process_at,
            OrderStatus::DeliverySoon => &mut self.delivery_soon_at,
            OrderStatus::OutForDelivery => &mut self.out_for_delivery_at,
            OrderStatus::Delivered => &mut self.delivered_at,
            OrderStatus::Cancelled => &mut self.cancelled_at,
        }
    }
}
