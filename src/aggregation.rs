//! Season / scenario aggregation
//!
//! Folds per-record contributions into a total, ordered per-group subtotals
//! and a band. Groups keep first-appearance order unless seeded up front
//! (`with_groups`), so output order is stable across runs.

use crate::utils::bands::{Band, BandSet};
use serde::Serialize;

/// Subtotal of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSubtotal<K> {
    pub key: K,
    pub subtotal: f64,
    /// Number of records folded into this group
    pub count: usize,
}

/// Aggregated result: total, per-group subtotals, band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate<K> {
    pub total: f64,
    pub groups: Vec<GroupSubtotal<K>>,
    pub band: Band,
}

impl<K: PartialEq> Aggregate<K> {
    pub fn subtotal(&self, key: &K) -> Option<f64> {
        self.groups.iter().find(|g| &g.key == key).map(|g| g.subtotal)
    }
}

/// Incremental aggregator
///
/// Groups are few (three tillage groups, a handful of product types), so a
/// linear scan over a Vec keeps insertion order without an index map.
#[derive(Debug, Clone)]
pub struct Aggregator<K> {
    total: f64,
    groups: Vec<GroupSubtotal<K>>,
}

impl<K: PartialEq> Default for Aggregator<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: PartialEq> Aggregator<K> {
    pub fn new() -> Self {
        Self {
            total: 0.0,
            groups: Vec::new(),
        }
    }

    /// Pre-seed groups so they are reported (with 0) even when empty
    pub fn with_groups(keys: impl IntoIterator<Item = K>) -> Self {
        let mut aggregator = Self::new();
        for key in keys {
            if !aggregator.groups.iter().any(|g| g.key == key) {
                aggregator.groups.push(GroupSubtotal {
                    key,
                    subtotal: 0.0,
                    count: 0,
                });
            }
        }
        aggregator
    }

    pub fn add(&mut self, key: K, value: f64) {
        self.total += value;
        match self.groups.iter_mut().find(|g| g.key == key) {
            Some(group) => {
                group.subtotal += value;
                group.count += 1;
            }
            None => self.groups.push(GroupSubtotal {
                key,
                subtotal: value,
                count: 1,
            }),
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn finish(self, bands: &BandSet) -> Aggregate<K> {
        let band = if self.groups.iter().all(|g| g.count == 0) {
            bands.lowest().clone()
        } else {
            bands.classify(self.total).clone()
        };
        Aggregate {
            total: self.total,
            groups: self.groups,
            band,
        }
    }
}

/// Aggregate a collection in one call.
///
/// An empty collection yields total 0 and the lowest band.
pub fn aggregate<T, K, G, V>(items: &[T], group_key: G, value: V, bands: &BandSet) -> Aggregate<K>
where
    K: PartialEq,
    G: Fn(&T) -> K,
    V: Fn(&T) -> f64,
{
    let mut aggregator = Aggregator::new();
    for item in items {
        aggregator.add(group_key(item), value(item));
    }
    aggregator.finish(bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_empty_collection() {
        let items: Vec<(&str, f64)> = vec![];
        let agg = aggregate(&items, |i| i.0, |i| i.1, &BandSet::stir_default());
        assert_eq!(agg.total, 0.0);
        assert!(agg.groups.is_empty());
        assert_eq!(agg.band.label, "Light");
    }

    #[test]
    fn test_group_order_is_first_appearance() {
        let items = vec![("harvest", 50.0), ("pre-plant", 150.0), ("harvest", 50.0)];
        let agg = aggregate(&items, |i| i.0, |i| i.1, &BandSet::stir_default());

        let keys: Vec<&str> = agg.groups.iter().map(|g| g.key).collect();
        assert_eq!(keys, vec!["harvest", "pre-plant"]);
        assert_relative_eq!(agg.total, 250.0);
        assert_eq!(agg.subtotal(&"harvest"), Some(100.0));
        assert_eq!(agg.groups[0].count, 2);
        assert_eq!(agg.band.label, "Medium");
    }

    #[test]
    fn test_total_on_boundary() {
        let items = vec![("a", 600.0)];
        let agg = aggregate(&items, |i| i.0, |i| i.1, &BandSet::stir_default());
        assert_eq!(agg.band.label, "Very Intense");
    }

    #[test]
    fn test_seeded_groups_report_zero() {
        let mut aggregator = Aggregator::with_groups(["pre-plant", "in-season", "harvest"]);
        aggregator.add("in-season", 40.0);
        let agg = aggregator.finish(&BandSet::stir_default());

        assert_eq!(agg.groups.len(), 3);
        assert_eq!(agg.groups[0].key, "pre-plant");
        assert_eq!(agg.subtotal(&"pre-plant"), Some(0.0));
        assert_eq!(agg.subtotal(&"in-season"), Some(40.0));
    }

    #[test]
    fn test_seeded_but_empty_is_lowest_band() {
        let aggregator: Aggregator<&str> = Aggregator::with_groups(["x"]);
        let agg = aggregator.finish(&BandSet::eiq_default());
        assert_eq!(agg.band, *BandSet::eiq_default().lowest());
    }

    #[test]
    fn test_total_equals_sum_of_subtotals() {
        let items: Vec<(u8, f64)> = (0..30).map(|i| (i % 4, i as f64 * 1.5 - 10.0)).collect();
        let agg = aggregate(&items, |i| i.0, |i| i.1, &BandSet::stir_default());
        let sum: f64 = agg.groups.iter().map(|g| g.subtotal).sum();
        assert_relative_eq!(agg.total, sum, epsilon = 1e-9);
    }
}
