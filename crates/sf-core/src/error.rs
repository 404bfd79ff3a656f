use sf_schemas::OrderStatus;
use thiserror::Error;

/// Domain failures. Each one is recovered at the request boundary and turned
/// into a structured response; none of them is a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShopError {
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid status: {0:?}")]
    InvalidStatus(String),

    #[error("order status {from} cannot change to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("authentication required")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: i64,
        requested: i32,
        available: i32,
    },

    #[error("product {0} is referenced by existing orders")]
    ProductInUse(i64),
}

impl ShopError {
    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        ShopError::NotFound {
            what,
            id: id.to_string(),
        }
    }

    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        ShopError::Validation {
            field,
            reason: reason.into(),
        }
    }
}
