// Copyright 2025 the Declutter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Symmetric obstruction graph over generic keys.

use alloc::collections::{BTreeMap, BTreeSet};

/// An undirected, irreflexive adjacency structure.
///
/// The graph records which pairs of entities currently obstruct each other.
/// Every mutation goes through a symmetric helper, so an edge is always
/// present on both endpoints or on neither; self edges are rejected. Keys
/// are any copyable ordered identifier (marker handles in practice), and
/// iteration order is the key order, which keeps traversals deterministic.
///
/// Nodes are implicit: a key exists in the graph exactly while it has at
/// least one incident edge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObstructionGraph<K> {
    edges: BTreeMap<K, BTreeSet<K>>,
}

impl<K> ObstructionGraph<K> {
    /// Create an empty graph.
    pub const fn new() -> Self {
        Self {
            edges: BTreeMap::new(),
        }
    }
}

impl<K: Copy + Ord> ObstructionGraph<K> {
    /// Record a mutual obstruction between `a` and `b`.
    ///
    /// Returns `true` if the edge was newly inserted. Self edges are
    /// rejected and return `false`.
    pub fn link(&mut self, a: K, b: K) -> bool {
        if a == b {
            return false;
        }
        let fresh = self.edges.entry(a).or_default().insert(b);
        self.edges.entry(b).or_default().insert(a);
        fresh
    }

    /// Remove the mutual obstruction between `a` and `b`, if present.
    ///
    /// Returns `true` if an edge was removed.
    pub fn unlink(&mut self, a: K, b: K) -> bool {
        let removed = self.remove_half(a, b);
        self.remove_half(b, a);
        removed
    }

    /// Whether `a` and `b` currently obstruct each other.
    pub fn obstructs(&self, a: K, b: K) -> bool {
        self.edges.get(&a).is_some_and(|set| set.contains(&b))
    }

    /// The keys currently obstructing `k`, in key order.
    pub fn neighbors(&self, k: K) -> impl Iterator<Item = K> + '_ {
        self.edges
            .get(&k)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// The number of keys currently obstructing `k`.
    pub fn degree(&self, k: K) -> usize {
        self.edges.get(&k).map_or(0, BTreeSet::len)
    }

    /// Remove every edge incident to `k`, clearing the reverse halves too.
    pub fn clear_node(&mut self, k: K) {
        let Some(set) = self.edges.remove(&k) else {
            return;
        };
        for other in set {
            self.remove_half(other, k);
        }
    }

    /// Keys that currently have at least one incident edge, in key order.
    pub fn nodes(&self) -> impl Iterator<Item = K> + '_ {
        self.edges.keys().copied()
    }

    /// The number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    /// Whether the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Drop all edges.
    pub fn clear(&mut self) {
        self.edges.clear();
    }

    /// Remove the `a -> b` half edge, pruning `a`'s entry when it empties.
    fn remove_half(&mut self, a: K, b: K) -> bool {
        let Some(set) = self.edges.get_mut(&a) else {
            return false;
        };
        let removed = set.remove(&b);
        if set.is_empty() {
            self.edges.remove(&a);
        }
        removed
    }
}

impl<K> Default for ObstructionGraph<K> {
    fn default() -> Self {
        Self::new()
    }
}
