//! Stock delta maps.
//!
//! A delta map says, for every stock row, by how much stock must move. Rows are either a
//! `(product, variant)` pair or a product snapshot (stock lot).
//! Maps are built from line items with a direction, merged with plain addition, and handed
//! to the store for application inside a transaction.
//!
//! Entries that sum to zero are dropped, so applying a map never issues a no-op write.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::item::LineItem;
use crate::{ProductId, SnapshotId, VariantId};

/// Composite stock identity.
///
/// A line without variant and a line with a variant of the same product are different keys:
/// they move different stock columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DeltaKey {
    /// The product.
    pub product_id: ProductId,
    /// The variant, if any.
    pub variant_id: Option<VariantId>,
}

impl DeltaKey {
    /// Create a key.
    #[must_use]
    pub const fn new(product_id: ProductId, variant_id: Option<VariantId>) -> Self {
        Self {
            product_id,
            variant_id,
        }
    }

    /// Key for a product sold without variant.
    #[must_use]
    pub const fn product(product_id: ProductId) -> Self {
        Self::new(product_id, None)
    }
}

impl fmt::Display for DeltaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant_id {
            Some(variant) => write!(f, "{}/{}", self.product_id, variant),
            None => write!(f, "{}", self.product_id),
        }
    }
}

/// Direction in which a set of items moves stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Items go back into stock.
    Add,
    /// Items leave stock.
    Remove,
}

impl Direction {
    /// The opposite direction.
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Add => Self::Remove,
            Self::Remove => Self::Add,
        }
    }

    fn apply(self, quantity: Decimal) -> Decimal {
        match self {
            Self::Add => quantity,
            Self::Remove => -quantity,
        }
    }
}

/// A stock row a line item can move.
pub trait StockKey: Copy + Ord + fmt::Display {
    /// The key `item` moves, if any.
    fn of(item: &LineItem) -> Option<Self>;
}

impl StockKey for DeltaKey {
    fn of(item: &LineItem) -> Option<Self> {
        item.delta_key()
    }
}

impl StockKey for SnapshotId {
    fn of(item: &LineItem) -> Option<Self> {
        item.product_snapshot_id
    }
}

/// Mapping from a stock row to a signed quantity adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deltas<K> {
    entries: BTreeMap<K, Decimal>,
}

/// Product and variant deltas.
pub type DeltaMap = Deltas<DeltaKey>;

/// Product snapshot (stock lot) deltas.
pub type SnapshotDeltas = Deltas<SnapshotId>;

impl<K> Default for Deltas<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: StockKey> Deltas<K> {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the deltas of `items` moved in `direction`.
    ///
    /// Items without a key are skipped, and quantities are coerced to non-negative numbers
    /// (missing or unparsable quantities contribute nothing).
    #[must_use]
    pub fn build<'a, I>(items: I, direction: Direction) -> Self
    where
        I: IntoIterator<Item = &'a LineItem>,
    {
        let mut map = Self::new();
        for item in items {
            let Some(key) = K::of(item) else {
                continue;
            };
            map.add(key, direction.apply(item.stock_quantity()));
        }
        map
    }

    /// Add `delta` to the entry for `key`, dropping the entry if it reaches zero.
    ///
    /// Sums saturate at the decimal bounds; validated items stay far below them.
    pub fn add(&mut self, key: K, delta: Decimal) {
        if delta.is_zero() {
            return;
        }
        let total = self
            .entries
            .get(&key)
            .copied()
            .unwrap_or(Decimal::ZERO)
            .saturating_add(delta);
        if total.is_zero() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, total);
        }
    }

    /// Fold every entry of `other` into `self`.
    pub fn merge(&mut self, other: &Self) -> &mut Self {
        for (key, delta) in &other.entries {
            self.add(*key, *delta);
        }
        self
    }

    /// Sum any number of maps into one.
    #[must_use]
    pub fn merged<'a, I>(maps: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
        K: 'a,
    {
        let mut total = Self::new();
        for map in maps {
            total.merge(map);
        }
        total
    }

    /// The same map with every delta negated.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self {
            entries: self.entries.iter().map(|(k, v)| (*k, -*v)).collect(),
        }
    }

    /// The delta for `key`, zero when absent.
    #[must_use]
    pub fn get(&self, key: &K) -> Decimal {
        self.entries.get(key).copied().unwrap_or(Decimal::ZERO)
    }

    /// Iterate over non-zero entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (K, Decimal)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    /// The keys in key order.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.entries.keys().copied()
    }

    /// Number of non-zero entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map moves nothing at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(product: i64, variant: Option<i64>, qty: Decimal) -> LineItem {
        LineItem::stock_line(ProductId::new(product), variant.map(VariantId::new), qty)
    }

    #[test]
    fn sums_quantities_per_key() {
        let items = vec![
            line(5, None, dec!(3)),
            line(5, None, dec!(2)),
            line(6, None, dec!(1)),
        ];
        let map = DeltaMap::build(&items, Direction::Add);
        assert_eq!(map.get(&DeltaKey::product(ProductId::new(5))), dec!(5));
        assert_eq!(map.get(&DeltaKey::product(ProductId::new(6))), dec!(1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn variants_do_not_collapse_into_product() {
        let items = vec![
            line(5, None, dec!(3)),
            line(5, Some(10), dec!(2)),
            line(5, Some(11), dec!(4)),
        ];
        let map = DeltaMap::build(&items, Direction::Remove);
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&DeltaKey::product(ProductId::new(5))), dec!(-3));
        assert_eq!(
            map.get(&DeltaKey::new(ProductId::new(5), Some(VariantId::new(10)))),
            dec!(-2)
        );
    }

    #[test]
    fn skips_items_without_product() {
        let items = vec![
            LineItem {
                quantite: Some(dec!(4)),
                ..LineItem::default()
            },
            line(2, None, dec!(1)),
        ];
        let map = DeltaMap::build(&items, Direction::Add);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn zero_and_missing_quantities_contribute_nothing() {
        let items = vec![
            line(1, None, Decimal::ZERO),
            LineItem {
                product_id: Some(ProductId::new(2)),
                ..LineItem::default()
            },
        ];
        assert!(DeltaMap::build(&items, Direction::Add).is_empty());
    }

    #[test]
    fn merge_prunes_zero_net_entries() {
        let old = vec![line(5, None, dec!(3))];
        let new = vec![line(5, None, dec!(3)), line(7, None, dec!(1))];
        let mut map = DeltaMap::build(&old, Direction::Remove);
        map.merge(&DeltaMap::build(&new, Direction::Add));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&DeltaKey::product(ProductId::new(7))), dec!(1));
    }

    #[test]
    fn replacing_quantities_yields_the_net_difference() {
        let old = vec![line(5, None, dec!(3))];
        let new = vec![line(5, None, dec!(7))];
        let map = DeltaMap::merged([
            &DeltaMap::build(&old, Direction::Remove),
            &DeltaMap::build(&new, Direction::Add),
        ]);
        assert_eq!(map.get(&DeltaKey::product(ProductId::new(5))), dec!(4));
    }

    #[test]
    fn snapshot_deltas_follow_the_lot_only() {
        let items = vec![
            LineItem {
                product_snapshot_id: Some(SnapshotId::new(3)),
                ..line(5, None, dec!(2))
            },
            LineItem {
                product_snapshot_id: Some(SnapshotId::new(3)),
                ..line(6, Some(10), dec!(1))
            },
            line(5, None, dec!(4)),
        ];
        let lots = SnapshotDeltas::build(&items, Direction::Add);
        assert_eq!(lots.len(), 1);
        assert_eq!(lots.get(&SnapshotId::new(3)), dec!(3));
        assert_eq!(DeltaMap::build(&items, Direction::Add).len(), 2);
    }

    #[test]
    fn huge_sums_saturate() {
        let mut map = DeltaMap::new();
        let key = DeltaKey::product(ProductId::new(1));
        map.add(key, Decimal::MAX);
        map.add(key, Decimal::MAX);
        assert_eq!(map.get(&key), Decimal::MAX);
    }

    #[test]
    fn key_display() {
        assert_eq!(DeltaKey::product(ProductId::new(5)).to_string(), "5");
        assert_eq!(
            DeltaKey::new(ProductId::new(5), Some(VariantId::new(9))).to_string(),
            "5/9"
        );
    }
}
