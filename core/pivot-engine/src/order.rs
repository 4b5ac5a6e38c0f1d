//! FILENAME: core/pivot-engine/src/order.rs
//! Manual Order Overlay - a caller-imposed ordering of one axis.
//!
//! Once a swap or drag has been applied the axis shows the manual order
//! instead of the computed (sorted) one. On every recompute the manual list
//! drops keys that disappeared and appends newly appeared keys in their
//! computed order. Only `reset` returns the axis to computed order, or a
//! change that removes every manually placed key.

use std::hash::Hash;

use rustc_hash::FxHashSet;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisOrder<K> {
    manual: Option<Vec<K>>,
}

impl<K> Default for AxisOrder<K> {
    fn default() -> Self {
        AxisOrder { manual: None }
    }
}

impl<K: Clone + Eq + Hash> AxisOrder<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_manual(&self) -> bool {
        self.manual.is_some()
    }

    /// The stored manual order, if any.
    pub fn keys(&self) -> Option<&[K]> {
        self.manual.as_deref()
    }

    /// Returns the visible order for `computed`, syncing the stored manual
    /// order to the keys that are still present.
    pub fn apply(&mut self, computed: &[K]) -> Vec<K> {
        let Some(manual) = self.manual.as_mut() else {
            return computed.to_vec();
        };

        let present: FxHashSet<&K> = computed.iter().collect();
        let mut positioned: FxHashSet<K> = FxHashSet::default();
        let mut visible: Vec<K> = Vec::with_capacity(computed.len());

        for key in manual.iter() {
            if present.contains(key) && positioned.insert(key.clone()) {
                visible.push(key.clone());
            }
        }
        // No manual key survived: an empty manual order means computed order.
        if visible.is_empty() {
            self.manual = None;
            return computed.to_vec();
        }
        for key in computed {
            if positioned.insert(key.clone()) {
                visible.push(key.clone());
            }
        }

        *manual = visible.clone();
        visible
    }

    /// Swaps the keys at two visible positions. Out-of-range or identical
    /// indices are a no-op.
    pub fn swap(&mut self, visible: &[K], from: usize, to: usize) -> bool {
        if from == to || from >= visible.len() || to >= visible.len() {
            return false;
        }
        let mut order = visible.to_vec();
        order.swap(from, to);
        self.manual = Some(order);
        true
    }

    /// Removes the key at `from` and reinserts it at `to`, shifting the keys
    /// in between.
    pub fn drag(&mut self, visible: &[K], from: usize, to: usize) -> bool {
        if from == to || from >= visible.len() || to >= visible.len() {
            return false;
        }
        let mut order = visible.to_vec();
        let key = order.remove(from);
        order.insert(to, key);
        self.manual = Some(order);
        true
    }

    /// Clears the manual order. Returns whether there was one.
    pub fn reset(&mut self) -> bool {
        self.manual.take().is_some()
    }
}
