//! Property-based tests for delta maps and lifecycle deltas.

use boukir_core::lifecycle::{on_create, on_delete, on_status_change, on_update};
use boukir_core::{
    policy, DeltaMap, Direction, DocumentKind, LineItem, ProductId, SnapshotId, Statut,
    StockEffect, VariantId,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn line_strategy() -> impl Strategy<Value = LineItem> {
    (
        1i64..6,
        prop::option::of(1i64..3),
        prop::option::of(1i64..4),
        0i64..50,
    )
        .prop_map(|(product, variant, lot, qty)| LineItem {
            product_snapshot_id: lot.map(SnapshotId::new),
            ..LineItem::stock_line(
                ProductId::new(product),
                variant.map(VariantId::new),
                Decimal::from(qty),
            )
        })
}

fn items_strategy() -> impl Strategy<Value = Vec<LineItem>> {
    prop::collection::vec(line_strategy(), 0..8)
}

fn statut_strategy() -> impl Strategy<Value = Statut> {
    prop::sample::select(vec![
        Statut::EnAttente,
        Statut::Valide,
        Statut::Applique,
        Statut::Annule,
    ])
}

fn kind_strategy() -> impl Strategy<Value = DocumentKind> {
    prop::sample::select(DocumentKind::ALL.to_vec())
}

fn sum(maps: &[&DeltaMap]) -> DeltaMap {
    DeltaMap::merged(maps.iter().copied())
}

fn total(effects: &[&StockEffect]) -> StockEffect {
    StockEffect::merged(effects.iter().copied())
}

proptest! {
    #[test]
    fn opposite_directions_cancel(items in items_strategy()) {
        let add = DeltaMap::build(&items, Direction::Add);
        let remove = DeltaMap::build(&items, Direction::Remove);
        prop_assert_eq!(&add.negated(), &remove);
        prop_assert!(sum(&[&add, &remove]).is_empty());
    }

    #[test]
    fn merge_is_commutative_and_associative(
        a in items_strategy(),
        b in items_strategy(),
        c in items_strategy(),
    ) {
        let a = DeltaMap::build(&a, Direction::Add);
        let b = DeltaMap::build(&b, Direction::Remove);
        let c = DeltaMap::build(&c, Direction::Add);

        prop_assert_eq!(sum(&[&a, &b]), sum(&[&b, &a]));
        prop_assert_eq!(sum(&[&sum(&[&a, &b]), &c]), sum(&[&a, &sum(&[&b, &c])]));
        prop_assert_eq!(sum(&[&a, &DeltaMap::new()]), a);
    }

    #[test]
    fn maps_never_hold_zero_entries(a in items_strategy(), b in items_strategy()) {
        let map = sum(&[
            &DeltaMap::build(&a, Direction::Add),
            &DeltaMap::build(&b, Direction::Remove),
        ]);
        for (_, delta) in map.iter() {
            prop_assert!(!delta.is_zero());
        }
    }

    #[test]
    fn create_then_delete_is_neutral(
        kind in kind_strategy(),
        statut in statut_strategy(),
        items in items_strategy(),
    ) {
        let policy = policy(kind);
        let net = total(&[
            &on_create(policy, statut, &items),
            &on_delete(policy, statut, &items),
        ]);
        prop_assert!(net.is_empty());
    }

    #[test]
    fn update_equals_delete_then_create(
        kind in kind_strategy(),
        old_statut in statut_strategy(),
        new_statut in statut_strategy(),
        old_items in items_strategy(),
        new_items in items_strategy(),
    ) {
        let policy = policy(kind);
        let update = on_update(policy, old_statut, &old_items, new_statut, &new_items);
        let replay = total(&[
            &on_delete(policy, old_statut, &old_items),
            &on_create(policy, new_statut, &new_items),
        ]);
        prop_assert_eq!(update, replay);
    }

    #[test]
    fn status_round_trip_is_neutral(
        kind in kind_strategy(),
        from in statut_strategy(),
        to in statut_strategy(),
        items in items_strategy(),
    ) {
        let policy = policy(kind);
        let (_, there) = on_status_change(policy, from, to, &items);
        let (_, back) = on_status_change(policy, to, from, &items);
        prop_assert!(total(&[&there, &back]).is_empty());
    }

    #[test]
    fn net_effect_matches_final_state(
        kind in kind_strategy(),
        path in prop::collection::vec(statut_strategy(), 1..6),
        items in items_strategy(),
    ) {
        let policy = policy(kind);
        let mut applied = on_create(policy, path[0], &items);
        for window in path.windows(2) {
            let (_, effect) = on_status_change(policy, window[0], window[1], &items);
            applied.merge(&effect);
        }
        let last = path[path.len() - 1];
        prop_assert_eq!(applied, on_create(policy, last, &items));
    }

    #[test]
    fn only_snapshot_kinds_move_lots(kind in kind_strategy(), items in items_strategy()) {
        let policy = policy(kind);
        let effect = on_create(policy, Statut::Valide, &items);
        if policy.tracks_snapshots {
            let expected: Decimal = items
                .iter()
                .filter(|item| item.product_snapshot_id.is_some())
                .map(LineItem::stock_quantity)
                .sum();
            let moved: Decimal = effect.snapshots.iter().map(|(_, delta)| delta).sum();
            prop_assert_eq!(moved, expected);
        } else {
            prop_assert!(effect.snapshots.is_empty());
        }
    }
}
