//! Login-time merge of an anonymous cart into the user's cart.

use std::collections::HashMap;

use crate::ShopError;

/// Minimal line shape the merge needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRef {
    pub item_id: i64,
    pub product_id: i64,
    pub quantity: i32,
}

/// Anonymous line folded into an existing user line for the same product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combine {
    pub target_item_id: i64,
    pub source_item_id: i64,
    pub new_quantity: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    pub combine: Vec<Combine>,
    /// Anonymous lines whose product the user cart lacks; they move as-is.
    pub reassign: Vec<i64>,
}

impl MergePlan {
    pub fn is_empty(&self) -> bool {
        self.combine.is_empty() && self.reassign.is_empty()
    }
}

/// For every anonymous line: same product in the user cart → add quantities,
/// otherwise move the line. Input order of `guest` is preserved.
pub fn plan_merge(user: &[LineRef], guest: &[LineRef]) -> Result<MergePlan, ShopError> {
    let by_product: HashMap<i64, &LineRef> = user.iter().map(|l| (l.product_id, l)).collect();

    let mut plan = MergePlan::default();
    for g in guest {
        match by_product.get(&g.product_id) {
            Some(u) => {
                let new_quantity = u
                    .quantity
                    .checked_add(g.quantity)
                    .ok_or_else(|| ShopError::validation("quantity", "merged quantity overflows"))?;
                plan.combine.push(Combine {
                    target_item_id: u.item_id,
                    source_item_id: g.item_id,
                    new_quantity,
                });
            }
            None => plan.reassign.push(g.item_id),
        }
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l(item_id: i64, product_id: i64, quantity: i32) -> LineRef {
        LineRef {
            item_id,
            product_id,
            quantity,
        }
    }

    #[test]
    fn empty_guest_cart_is_a_noop_plan() {
        let plan = plan_merge(&[l(1, 100, 1)], &[]).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn overflow_is_refused() {
        let err = plan_merge(&[l(1, 100, i32::MAX)], &[l(2, 100, 1)]).unwrap_err();
        assert!(matches!(err, ShopError::Validation { field: "quantity", .. }));
    }
}
