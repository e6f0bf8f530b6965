//! Stock effect of document lifecycle events.
//!
//! Each function returns the net stock effect an event must apply. The caller reads the stored
//! state under a row lock, calls one of these, applies the result and commits.

use serde::Serialize;

use crate::delta::{DeltaMap, Direction, SnapshotDeltas};
use crate::document::Statut;
use crate::item::LineItem;
use crate::policy::StockPolicy;

/// How a status change relates to the cancelled state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Active to cancelled: the items' effect is removed.
    EnteringCancelled,
    /// Cancelled to active: the items' effect is applied again.
    LeavingCancelled,
    /// Between two active or two cancelled statuses.
    Unaffected,
}

impl Transition {
    /// Classify a change from `old` to `new`.
    #[must_use]
    pub const fn between(old: Statut, new: Statut) -> Self {
        match (old.is_cancelled(), new.is_cancelled()) {
            (false, true) => Self::EnteringCancelled,
            (true, false) => Self::LeavingCancelled,
            _ => Self::Unaffected,
        }
    }
}

/// Everything one lifecycle event moves: product and variant stock, plus snapshot lots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockEffect {
    /// Product and variant stock.
    pub stock: DeltaMap,
    /// Snapshot lots, only filled for kinds that track them.
    pub snapshots: SnapshotDeltas,
}

impl StockEffect {
    /// The effect of `items` moved in `direction` under `policy`.
    #[must_use]
    pub fn of(policy: &StockPolicy, items: &[LineItem], direction: Direction) -> Self {
        let snapshots = if policy.tracks_snapshots {
            SnapshotDeltas::build(items, direction)
        } else {
            SnapshotDeltas::new()
        };
        Self {
            stock: DeltaMap::build(items, direction),
            snapshots,
        }
    }

    /// Fold `other` into `self`.
    pub fn merge(&mut self, other: &Self) -> &mut Self {
        self.stock.merge(&other.stock);
        self.snapshots.merge(&other.snapshots);
        self
    }

    /// Sum any number of effects into one.
    #[must_use]
    pub fn merged<'a, I>(effects: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        let mut total = Self::default();
        for effect in effects {
            total.merge(effect);
        }
        total
    }

    /// The opposite effect.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self {
            stock: self.stock.negated(),
            snapshots: self.snapshots.negated(),
        }
    }

    /// Whether nothing moves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stock.is_empty() && self.snapshots.is_empty()
    }
}

/// Effect of creating a document with `statut` and `items`.
#[must_use]
pub fn on_create(policy: &StockPolicy, statut: Statut, items: &[LineItem]) -> StockEffect {
    if statut.is_cancelled() {
        return StockEffect::default();
    }
    StockEffect::of(policy, items, policy.active_direction)
}

/// Effect of replacing a document's status and items.
///
/// The old items' effect is reversed if it was applied, and the new items' effect is applied
/// if the new status is active. Both halves are merged so only the net change is written.
#[must_use]
pub fn on_update(
    policy: &StockPolicy,
    old_statut: Statut,
    old_items: &[LineItem],
    new_statut: Statut,
    new_items: &[LineItem],
) -> StockEffect {
    let mut effect = StockEffect::default();
    if !old_statut.is_cancelled() {
        effect.merge(&StockEffect::of(
            policy,
            old_items,
            policy.active_direction.reversed(),
        ));
    }
    if !new_statut.is_cancelled() {
        effect.merge(&StockEffect::of(policy, new_items, policy.active_direction));
    }
    effect
}

/// Effect of moving a document with stored `items` from `old` to `new`.
#[must_use]
pub fn on_status_change(
    policy: &StockPolicy,
    old: Statut,
    new: Statut,
    items: &[LineItem],
) -> (Transition, StockEffect) {
    let transition = Transition::between(old, new);
    let effect = match transition {
        Transition::EnteringCancelled => {
            StockEffect::of(policy, items, policy.active_direction.reversed())
        }
        Transition::LeavingCancelled => StockEffect::of(policy, items, policy.active_direction),
        Transition::Unaffected => StockEffect::default(),
    };
    (transition, effect)
}

/// Effect of deleting a document currently in `statut`.
#[must_use]
pub fn on_delete(policy: &StockPolicy, statut: Statut, items: &[LineItem]) -> StockEffect {
    if statut.is_cancelled() {
        return StockEffect::default();
    }
    StockEffect::of(policy, items, policy.active_direction.reversed())
}
