//! # Graph Model
//!
//! The static rTFPG store for the faultline CORE: signals, nodes, and timed
//! propagation edges.
//!
//! The model is immutable during diagnosis and prognosis. Only the
//! refinement optimizer mutates it, through `add_node` / `remove_node` /
//! `add_edge` / `remove_edge`; id indexes are rebuilt after every mutation,
//! and consumers must tolerate reindexing between invocations.
//!
//! All indexes use `BTreeMap` for deterministic ordering.

use crate::{Edge, FaultlineError, Node, Signal};
use std::collections::{BTreeMap, BTreeSet};

/// The refined Timed Failure Propagation Graph.
///
/// Nodes and edges live in parallel arrays; `BTreeMap` indexes provide
/// amortized O(log n) lookup by id without any cyclic ownership.
#[derive(Debug, Clone, Default)]
pub struct RtfpgModel {
    signals: Vec<Signal>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,

    /// Node id -> position in `nodes`.
    node_index: BTreeMap<String, usize>,
    /// Signal id -> position in `signals`.
    signal_index: BTreeMap<String, usize>,
    /// Signal `source_name` -> position in `signals`.
    source_index: BTreeMap<String, usize>,
}

impl RtfpgModel {
    /// Build a model from parsed parts, validating structural invariants:
    ///
    /// 1. `range_max >= range_min` for every signal.
    /// 2. `time_min_ms <= time_max_ms` for every edge.
    /// 3. Node ids are unique; edge endpoints reference existing nodes.
    pub fn from_parts(
        signals: Vec<Signal>,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<Self, FaultlineError> {
        for signal in &signals {
            if signal.range_max < signal.range_min {
                return Err(FaultlineError::InvalidModel(format!(
                    "signal '{}' has inverted range [{}, {}]",
                    signal.id, signal.range_min, signal.range_max
                )));
            }
        }

        for edge in &edges {
            if edge.time_min_ms > edge.time_max_ms {
                return Err(FaultlineError::InvalidModel(format!(
                    "edge {} -> {} has inverted interval [{}, {}]",
                    edge.from, edge.to, edge.time_min_ms, edge.time_max_ms
                )));
            }
        }

        let mut seen_nodes = BTreeSet::new();
        for node in &nodes {
            if !seen_nodes.insert(node.id().to_string()) {
                return Err(FaultlineError::InvalidModel(format!(
                    "duplicate node id '{}'",
                    node.id()
                )));
            }
        }

        let mut seen_signals = BTreeSet::new();
        for signal in &signals {
            if !seen_signals.insert(signal.id.clone()) {
                return Err(FaultlineError::InvalidModel(format!(
                    "duplicate signal id '{}'",
                    signal.id
                )));
            }
        }

        for edge in &edges {
            for endpoint in [&edge.from, &edge.to] {
                if !seen_nodes.contains(endpoint) {
                    return Err(FaultlineError::InvalidModel(format!(
                        "edge {} -> {} references unknown node '{}'",
                        edge.from, edge.to, endpoint
                    )));
                }
            }
        }

        let mut model = Self {
            signals,
            nodes,
            edges,
            ..Self::default()
        };
        model.reindex();
        Ok(model)
    }

    /// Rebuild every id index from the backing arrays.
    fn reindex(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id().to_string(), i))
            .collect();
        self.signal_index = self
            .signals
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        self.source_index = self
            .signals
            .iter()
            .enumerate()
            .map(|(i, s)| (s.source_name.clone(), i))
            .collect();
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    #[must_use]
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Lookup a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&i| &self.nodes[i])
    }

    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Lookup a signal by its id (the name predicates reference).
    #[must_use]
    pub fn signal(&self, id: &str) -> Option<&Signal> {
        self.signal_index.get(id).map(|&i| &self.signals[i])
    }

    /// Lookup a signal by its `source_name` (the name samples carry).
    #[must_use]
    pub fn signal_by_source(&self, source_name: &str) -> Option<&Signal> {
        self.source_index.get(source_name).map(|&i| &self.signals[i])
    }

    /// Edges entering `id`, in declaration order.
    pub fn edges_into<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.to == id)
    }

    /// Edges leaving `id`, in declaration order.
    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.from == id)
    }

    /// All nodes with `criticality_level >= n` (the criticality front).
    #[must_use]
    pub fn criticality_front(&self, n: i32) -> Vec<&Node> {
        self.nodes
            .iter()
            .filter(|node| node.criticality_level() >= n)
            .collect()
    }

    // =========================================================================
    // REFINEMENT MUTATIONS
    // =========================================================================

    /// Insert a node. Idempotent on id: an existing node with the same id
    /// is left untouched.
    pub fn add_node(&mut self, node: Node) {
        if self.node_index.contains_key(node.id()) {
            return;
        }
        self.nodes.push(node);
        self.reindex();
    }

    /// Remove a node and cascade: every edge touching it is removed too.
    pub fn remove_node(&mut self, id: &str) {
        self.nodes.retain(|n| n.id() != id);
        self.edges.retain(|e| e.from != id && e.to != id);
        self.reindex();
    }

    /// Insert an edge. An edge whose endpoints are not both present is
    /// silently ignored, keeping the endpoint invariant intact.
    pub fn add_edge(&mut self, edge: Edge) {
        if !self.node_index.contains_key(&edge.from) || !self.node_index.contains_key(&edge.to) {
            return;
        }
        self.edges.push(edge);
    }

    /// Remove every edge matching the `from -> to` pair.
    pub fn remove_edge(&mut self, from: &str, to: &str) {
        self.edges.retain(|e| !(e.from == from && e.to == to));
    }
}

// =============================================================================
// TESTS
// =============================================================================
