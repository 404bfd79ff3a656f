//! Scenario: order status changes and their tracking side effects
//!
//! # Invariants under test
//!
//! 1. Re-entering the current status plans no transition.
//! 2. A real change carries the caller's note, or a default note built from
//!    the two labels.
//! 3. Unknown status strings are refused before any state is read.
//! 4. Open policy allows any move; terminal-locked policy freezes DELIVERED
//!    and CANCELLED.
//! 5. Stamping sets exactly the stage timestamp for the new status, and the
//!    completed-stage list follows stage order.
//!
//! All tests are pure; no IO, no DB.

use chrono::{TimeZone, Utc};
use sf_core::status::{
    completed_stages, parse_status, plan_transition, stamp, TransitionPolicy,
};
use sf_core::ShopError;
use sf_schemas::{OrderStatus, OrderTracking};

// ---------------------------------------------------------------------------
// 1. Same status is a no-op
// ---------------------------------------------------------------------------

#[test]
fn same_status_plans_nothing() {
    for s in OrderStatus::ALL {
        for policy in [TransitionPolicy::Open, TransitionPolicy::TerminalLocked] {
            assert_eq!(plan_transition(s, s, Some("again"), Some(1), policy), Ok(None));
        }
    }
}

// ---------------------------------------------------------------------------
// 2. Notes
// ---------------------------------------------------------------------------

#[test]
fn explicit_note_wins_blank_note_defaults() {
    let t = plan_transition(
        OrderStatus::Placed,
        OrderStatus::InProcess,
        Some("  packed  "),
        Some(9),
        TransitionPolicy::Open,
    )
    .unwrap()
    .unwrap();
    assert_eq!(t.note, "packed");
    assert_eq!(t.actor, Some(9));

    let t = plan_transition(
        OrderStatus::Placed,
        OrderStatus::InProcess,
        Some("   "),
        None,
        TransitionPolicy::Open,
    )
    .unwrap()
    .unwrap();
    assert_eq!(t.note, "Status changed from Order Placed to Order in Process");
}

// ---------------------------------------------------------------------------
// 3. Invalid status
// ---------------------------------------------------------------------------

#[test]
fn unknown_status_is_invalid() {
    assert_eq!(
        parse_status("SHIPPED"),
        Err(ShopError::InvalidStatus("SHIPPED".into()))
    );
    assert!(parse_status("").is_err());
}

// ---------------------------------------------------------------------------
// 4. Policies
// ---------------------------------------------------------------------------

#[test]
fn open_policy_allows_backwards_and_out_of_terminal() {
    assert!(plan_transition(
        OrderStatus::Delivered,
        OrderStatus::Placed,
        None,
        None,
        TransitionPolicy::Open
    )
    .unwrap()
    .is_some());
    assert!(plan_transition(
        OrderStatus::Cancelled,
        OrderStatus::InProcess,
        None,
        None,
        TransitionPolicy::Open
    )
    .unwrap()
    .is_some());
}

#[test]
fn terminal_locked_policy_freezes_final_states() {
    assert_eq!(
        plan_transition(
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            None,
            None,
            TransitionPolicy::TerminalLocked
        ),
        Err(ShopError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Cancelled
        })
    );
    assert!(plan_transition(
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        None,
        None,
        TransitionPolicy::TerminalLocked
    )
    .unwrap()
    .is_some());
}

// ---------------------------------------------------------------------------
// 5. Stamping and completed stages
// ---------------------------------------------------------------------------

#[test]
fn stamp_sets_only_the_matching_stage() {
    let t0 = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2026, 1, 6, 9, 30, 0).unwrap();

    let mut tracking = OrderTracking {
        order_id: 1,
        ..Default::default()
    };
    stamp(&mut tracking, OrderStatus::Placed, t0);
    stamp(&mut tracking, OrderStatus::OutForDelivery, t1);

    assert_eq!(tracking.placed_at, Some(t0));
    assert_eq!(tracking.out_for_delivery_at, Some(t1));
    assert_eq!(tracking.in_process_at, None);
    assert_eq!(tracking.last_updated, Some(t1));

    let stages: Vec<OrderStatus> = completed_stages(&tracking).iter().map(|c| c.status).collect();
    assert_eq!(stages, vec![OrderStatus::Placed, OrderStatus::OutForDelivery]);
}

#[test]
fn re_entry_overwrites_stage_timestamp() {
    let t0 = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2026, 1, 7, 10, 0, 0).unwrap();
    let mut tracking = OrderTracking::default();
    stamp(&mut tracking, OrderStatus::InProcess, t0);
    stamp(&mut tracking, OrderStatus::InProcess, t1);
    assert_eq!(tracking.in_process_at, Some(t1));
}
