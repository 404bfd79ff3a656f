//! Cart-identity resolution over an explicit [`Identity`] value.

use sf_schemas::{CartOwner, Identity, UserId};

use crate::ShopError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOwner {
    pub owner: CartOwner,
    /// Set when the caller had no session and one was minted for it. The
    /// HTTP layer must hand it back to the browser.
    pub minted_session: Option<String>,
}

/// Authenticated callers own their user cart and any session is ignored.
/// Anonymous callers own their session cart; without a session, `mint` is
/// called first so the cart has a durable key.
pub fn resolve_owner(identity: &Identity, mint: impl FnOnce() -> String) -> ResolvedOwner {
    if let Some(user_id) = identity.user_id {
        return ResolvedOwner {
            owner: CartOwner::User(user_id),
            minted_session: None,
        };
    }

    match identity
        .session_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
    {
        Some(key) => ResolvedOwner {
            owner: CartOwner::Session(key.to_string()),
            minted_session: None,
        },
        None => {
            let key = mint();
            ResolvedOwner {
                owner: CartOwner::Session(key.clone()),
                minted_session: Some(key),
            }
        }
    }
}

pub fn require_user(identity: &Identity) -> Result<UserId, ShopError> {
    identity.user_id.ok_or(ShopError::Unauthorized)
}

pub fn require_staff(identity: &Identity) -> Result<UserId, ShopError> {
    let user_id = require_user(identity)?;
    if !identity.is_staff {
        return Err(ShopError::Forbidden("staff only"));
    }
    Ok(user_id)
}

/// Owners see their own orders; staff see every order.
pub fn can_view_order(identity: &Identity, order_user_id: Option<UserId>) -> Result<(), ShopError> {
    let user_id = require_user(identity)?;
    if identity.is_staff || order_user_id == Some(user_id) {
        return Ok(());
    }
    Err(ShopError::Forbidden("not your order"))
}

/// A login merge may only fold the caller's own browser session into the
/// caller's own account. Returns the trimmed session key to merge.
pub fn authorize_login_merge<'a>(
    identity: &Identity,
    user_id: UserId,
    session_key: &'a str,
) -> Result<&'a str, ShopError> {
    let caller = require_user(identity)?;
    if caller != user_id {
        return Err(ShopError::Forbidden("login event for another user"));
    }
    let key = session_key.trim();
    if key.is_empty() {
        return Err(ShopError::validation("session_key", "this field is required"));
    }
    match identity.session_key.as_deref().map(str::trim) {
        Some(own) if own == key => Ok(key),
        _ => Err(ShopError::Forbidden("session does not belong to the caller")),
    }
}
