//! sf-core
//!
//! Storefront domain rules: pricing, slugs, cart arithmetic, the login-time
//! cart merge, checkout planning and the order status machine.
//!
//! Pure deterministic logic. No IO, no wall clock: callers load rows, pass
//! `now` where a timestamp is needed, and persist whatever plan comes back.

pub mod cart;
pub mod catalog;
pub mod checkout;
mod error;
pub mod identity;
pub mod merge;
pub mod orders;
pub mod status;

pub use error::ShopError;
