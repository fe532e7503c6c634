//! # Graph
//!
//! This module contains the directed multigraph used as the storage layer
//! for the whole engine: a `GraphStore` holding `Node`s and `Arc`s in flat
//! vectors, addressed by stable, dense identifiers. Nothing in here knows
//! about cell tracking, mitosis, or time-expansion — those semantics live in
//! [`crate::flow_graph`]. `GraphStore` only knows about nodes, arcs, cost
//! vectors, and integer flow.

mod arc;
mod node;
#[cfg(test)]
mod test;

use crate::error::{StateError, TrackingError};

/// Stable node identifier. Dense and valid for the lifetime of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Stable arc identifier. Dense and valid for the lifetime of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArcId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn from_index(index: usize) -> NodeId {
        NodeId(index)
    }
}

impl ArcId {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn from_index(index: usize) -> ArcId {
        ArcId(index)
    }
}

/// A directed multigraph: a collection of nodes and the arcs that connect
/// them. Node and arc ids never get reused or reordered once assigned.
pub struct GraphStore {
    nodes: Vec<node::Node>,
    arcs: Vec<arc::Arc>,
}

impl GraphStore {
    pub fn new() -> GraphStore {
        GraphStore {
            nodes: Vec::new(),
            arcs: Vec::new(),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    /// Add a new node at the given timestep and return its id.
    pub fn add_node(&mut self, timestep: i64) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node::Node::new(timestep));
        id
    }

    /// Add a new arc `src -> tgt` carrying `costs`. Fails if `costs` is empty
    ///.
    pub fn add_arc(&mut self, src: NodeId, tgt: NodeId, costs: Vec<f64>) -> Result<ArcId, TrackingError> {
        if costs.is_empty() {
            return Err(crate::error::ConstructionError::EmptyCostVector.into());
        }
        let id = ArcId(self.arcs.len());
        self.arcs.push(arc::Arc::new(src, tgt, costs));
        self.nodes[src.0].add_out_arc(id);
        self.nodes[tgt.0].add_in_arc(id);
        Ok(id)
    }

    pub fn node_timestep(&self, n: NodeId) -> i64 {
        self.nodes[n.0].timestep()
    }

    pub fn set_node_timestep(&mut self, n: NodeId, timestep: i64) {
        self.nodes[n.0].set_timestep(timestep);
    }

    pub fn out_arcs(&self, n: NodeId) -> &[ArcId] {
        self.nodes[n.0].out_arcs()
    }

    pub fn in_arcs(&self, n: NodeId) -> &[ArcId] {
        self.nodes[n.0].in_arcs()
    }

    pub fn arc_start(&self, a: ArcId) -> NodeId {
        self.arcs[a.0].start_node()
    }

    pub fn arc_end(&self, a: ArcId) -> NodeId {
        self.arcs[a.0].end_node()
    }

    pub fn capacity(&self, a: ArcId) -> usize {
        self.arcs[a.0].capacity()
    }

    pub fn flow(&self, a: ArcId) -> usize {
        self.arcs[a.0].flow()
    }

    /// `arcCost(a, n)`
    pub fn marginal_cost(&self, a: ArcId, n: i64) -> f64 {
        self.arcs[a.0].marginal_cost(n)
    }

    pub fn first_unit_cost(&self, a: ArcId) -> f64 {
        self.arcs[a.0].first_unit_cost()
    }

    /// Set an arc's flow directly, validating `0 <= flow <= capacity`
    /// ( `StateError`).
    pub fn set_flow(&mut self, a: ArcId, flow: i64) -> Result<(), TrackingError> {
        if flow < 0 {
            return Err(StateError::NegativeFlow { arc: a, flow }.into());
        }
        let capacity = self.capacity(a);
        if flow as usize > capacity {
            return Err(StateError::FlowExceedsCapacity {
                arc: a,
                flow,
                capacity,
            }
            .into());
        }
        self.arcs[a.0].set_flow(flow as usize);
        Ok(())
    }

    /// Apply `delta` (+1 or -1 in practice) to an arc's flow.
    pub fn add_flow(&mut self, a: ArcId, delta: i64) -> Result<(), TrackingError> {
        let new_flow = self.flow(a) as i64 + delta;
        self.set_flow(a, new_flow)
    }

    /// Sum of flow over a node's in-arcs.
    pub fn sum_in_flow(&self, n: NodeId) -> usize {
        self.in_arcs(n).iter().map(|a| self.flow(*a)).sum()
    }

    /// Sum of flow over a node's out-arcs.
    pub fn sum_out_flow(&self, n: NodeId) -> usize {
        self.out_arcs(n).iter().map(|a| self.flow(*a)).sum()
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}
