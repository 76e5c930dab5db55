//! The element operator cache: a two-level mapping `(ElementKind, order) ->
//! OperatorSet`, built lazily on first observation and read-only
//! thereafter (§9 design note). `Solver` owns exactly one of these and
//! hands out shared references to `Element::setup`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::basis::PointSet;
use crate::element::kind::ElementKind;
use crate::operators::build::{build_operators, OperatorSet};

/// Keyed by `(ElementKind, order)`; `Quad` and `Hex` at the same order get
/// distinct entries since their tensor-product dimensionality differs.
type Key = (ElementKind, usize);

pub struct OperatorCache {
    spts_type: PointSet,
    table: RwLock<HashMap<Key, std::sync::Arc<OperatorSet>>>,
}

impl OperatorCache {
    pub fn new(spts_type: PointSet) -> Self {
        Self {
            spts_type,
            table: RwLock::new(HashMap::new()),
        }
    }

    /// Return the operator bundle for `(kind, order)`, building and caching
    /// it on first use. Cheap on repeat calls: a read-lock hit returns a
    /// cloned `Arc`.
    pub fn get(&self, kind: ElementKind, order: usize) -> std::sync::Arc<OperatorSet> {
        let key = (kind, order);
        if let Some(ops) = self.table.read().unwrap().get(&key) {
            return ops.clone();
        }
        let mut table = self.table.write().unwrap();
        table
            .entry(key)
            .or_insert_with(|| std::sync::Arc::new(build_operators(kind, order, self.spts_type)))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.table.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn repeated_lookups_reuse_the_same_bundle() {
        let cache = OperatorCache::new(PointSet::GaussLegendre);
        let a = cache.get(ElementKind::Quad, 3);
        let b = cache.get(ElementKind::Quad, 3);
        assert!(std::sync::Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_orders_and_kinds_get_distinct_entries() {
        let cache = OperatorCache::new(PointSet::GaussLegendre);
        cache.get(ElementKind::Quad, 1);
        cache.get(ElementKind::Quad, 2);
        cache.get(ElementKind::Hex, 1);
        assert_eq!(cache.len(), 3);
    }
}
