//! Order status machine.
//!
//! `plan_transition` is the only way a status change is decided. A planned
//! [`Transition`] is persisted as exactly three writes in one transaction: the
//! new status on the order, one history row, and the stage timestamp on the
//! tracking row (see [`stamp`]). Re-entering the current status plans nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sf_schemas::{OrderStatus, OrderTracking, UserId};

use crate::ShopError;

/// Which moves between statuses are allowed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Any status may move to any other status.
    #[default]
    Open,
    /// DELIVERED and CANCELLED are final.
    TerminalLocked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub note: String,
    pub actor: Option<UserId>,
}

pub fn parse_status(raw: &str) -> Result<OrderStatus, ShopError> {
    OrderStatus::parse(raw.trim()).ok_or_else(|| ShopError::InvalidStatus(raw.to_string()))
}

pub fn is_terminal(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Delivered | OrderStatus::Cancelled)
}

/// `Ok(None)` when `to` equals the current status.
pub fn plan_transition(
    current: OrderStatus,
    to: OrderStatus,
    note: Option<&str>,
    actor: Option<UserId>,
    policy: TransitionPolicy,
) -> Result<Option<Transition>, ShopError> {
    if current == to {
        return Ok(None);
    }
    if policy == TransitionPolicy::TerminalLocked && is_terminal(current) {
        return Err(ShopError::InvalidTransition { from: current, to });
    }

    let note = match note.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) => n.to_string(),
        None => default_note(current, to),
    };

    Ok(Some(Transition {
        from: current,
        to,
        note,
        actor,
    }))
}

pub fn default_note(from: OrderStatus, to: OrderStatus) -> String {
    format!("Status changed from {} to {}", from.label(), to.label())
}

/// Display-only progress; independent of the history log.
pub fn progress_percent(status: OrderStatus) -> u8 {
    match status {
        OrderStatus::Placed => 20,
        OrderStatus::InProcess => 40,
        OrderStatus::DeliverySoon => 60,
        OrderStatus::OutForDelivery => 80,
        OrderStatus::Delivered => 100,
        OrderStatus::Cancelled => 0,
    }
}

/// Set the stage timestamp for `status`. Re-entry overwrites (last write wins).
pub fn stamp(tracking: &mut OrderTracking, status: OrderStatus, now: DateTime<Utc>) {
    *tracking.stage_timestamp_mut(status) = Some(now);
    tracking.last_updated = Some(now);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedStage {
    pub status: OrderStatus,
    pub label: &'static str,
    pub at: DateTime<Utc>,
}

/// Stages that have a timestamp, in stage order.
pub fn completed_stages(tracking: &OrderTracking) -> Vec<CompletedStage> {
    OrderStatus::ALL
        .iter()
        .filter_map(|s| {
            tracking.stage_timestamp(*s).map(|at| CompletedStage {
                status: *s,
                label: s.label(),
                at,
            })
        })
        .collect()
}
