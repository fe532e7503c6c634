//! # FlowGraph
//!
//! The time-expanded construction layer on top of [`crate::graph::GraphStore`].
//! `GraphStore` only knows about nodes and arcs; `FlowGraph` is where cell-
//! tracking semantics live: the source, the target set, `FullNode` detection
//! pairs, appearance/disappearance arcs, and the parent-to-division-duplicate
//! bookkeeping.

use std::collections::{HashMap, HashSet};

use crate::error::{ConstructionError, TrackingError};
use crate::graph::{ArcId, GraphStore, NodeId};

/// One cell detection: an entry node `u`, an exit node `v`, and the
/// intermediate arc `u -> v` that carries the detection's cost vector.
/// `timestep(u) = 2t+1`, `timestep(v) = 2t+2` for a detection at time `t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullNodeId {
    pub entry: NodeId,
    pub exit: NodeId,
}

/// The time-expanded flow graph: owns the `GraphStore`, the source and
/// target nodes, and every piece of bookkeeping `TrackingLoop` needs to
/// enforce mitosis and no-partial-(dis)appearance without re-deriving it
/// from scratch on every iteration.
pub struct FlowGraph {
    store: GraphStore,
    source: NodeId,
    target: NodeId,
    target_timestep: i64,

    intermediate_arcs: HashSet<ArcId>,
    appearance_arcs: HashSet<ArcId>,
    disappearance_arcs: HashSet<ArcId>,
    division_arcs: HashSet<ArcId>,

    appearance_of: HashMap<NodeId, ArcId>,
    disappearance_of: HashMap<NodeId, ArcId>,

    parent_to_duplicate: HashMap<NodeId, NodeId>,
    duplicate_to_parent: HashMap<NodeId, NodeId>,
    /// For a parent exit `v`: the `(v -> w, d -> w)` arc pairs created by
    /// `allow_mitosis`, keyed by parent so `TrackingLoop` can enumerate a
    /// duplicate's mirrored out-arcs without scanning the whole graph.
    mirror_pairs: HashMap<NodeId, Vec<(ArcId, ArcId)>>,
    /// Reverse index: arc -> its mirror counterpart, either direction.
    mirror_of: HashMap<ArcId, ArcId>,
}

impl FlowGraph {
    /// Create a new graph with its source (timestep 0) and a single target
    /// node. `addArcToTarget` always routes to this node; `ShortestPathFinder`
    /// treats the target set as `{self.target}` but is written against a
    /// slice so a caller extending this graph with more sink nodes later is
    /// a structural, not algorithmic, change.
    pub fn new() -> FlowGraph {
        let mut store = GraphStore::new();
        let source = store.add_node(0);
        let target = store.add_node(1);
        FlowGraph {
            store,
            source,
            target,
            target_timestep: 1,
            intermediate_arcs: HashSet::new(),
            appearance_arcs: HashSet::new(),
            disappearance_arcs: HashSet::new(),
            division_arcs: HashSet::new(),
            appearance_of: HashMap::new(),
            disappearance_of: HashMap::new(),
            parent_to_duplicate: HashMap::new(),
            duplicate_to_parent: HashMap::new(),
            mirror_pairs: HashMap::new(),
            mirror_of: HashMap::new(),
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn targets(&self) -> &[NodeId] {
        std::slice::from_ref(&self.target)
    }

    /// Add a detection at `timestep`, re-labelling the target node if this
    /// detection's exit timestep would no longer be strictly below it.
    pub fn add_node(&mut self, costs: Vec<f64>, timestep: i64) -> Result<FullNodeId, TrackingError> {
        if costs.is_empty() {
            return Err(ConstructionError::EmptyCostVector.into());
        }
        let entry = self.store.add_node(2 * timestep + 1);
        let exit = self.store.add_node(2 * timestep + 2);
        let intermediate = self.store.add_arc(entry, exit, costs)?;
        self.intermediate_arcs.insert(intermediate);

        let exit_ts = self.store.node_timestep(exit);
        if exit_ts >= self.target_timestep {
            self.target_timestep = exit_ts + 1;
            self.store.set_node_timestep(self.target, self.target_timestep);
        }

        Ok(FullNodeId { entry, exit })
    }

    /// Add an arc `parent.exit -> child.entry`.
    pub fn add_arc(
        &mut self,
        parent: FullNodeId,
        child: FullNodeId,
        costs: Vec<f64>,
    ) -> Result<ArcId, TrackingError> {
        if costs.is_empty() {
            return Err(ConstructionError::EmptyCostVector.into());
        }
        self.store.add_arc(parent.exit, child.entry, costs)
    }

    /// Add an appearance arc `source -> child.entry`.
    pub fn add_arc_to_source(&mut self, child: FullNodeId, costs: Vec<f64>) -> Result<ArcId, TrackingError> {
        if costs.is_empty() {
            return Err(ConstructionError::EmptyCostVector.into());
        }
        let arc = self.store.add_arc(self.source, child.entry, costs)?;
        self.appearance_arcs.insert(arc);
        self.appearance_of.insert(child.entry, arc);
        Ok(arc)
    }

    /// Add a disappearance arc `parent.exit -> target`.
    pub fn add_arc_to_target(&mut self, parent: FullNodeId, costs: Vec<f64>) -> Result<ArcId, TrackingError> {
        if costs.is_empty() {
            return Err(ConstructionError::EmptyCostVector.into());
        }
        let arc = self.store.add_arc(parent.exit, self.target, costs)?;
        self.disappearance_arcs.insert(arc);
        self.disappearance_of.insert(parent.exit, arc);
        Ok(arc)
    }

    /// Allocate `parent`'s division duplicate. Must be called after all of
    /// `parent.exit`'s non-terminal out-arcs exist: calling earlier
    /// leaves the duplicate with fewer mirror arcs, and this crate resolves
    /// that open question by rejecting the call outright rather than
    /// silently under-mirroring (see DESIGN.md).
    pub fn allow_mitosis(&mut self, parent: FullNodeId, division_cost: f64) -> Result<ArcId, TrackingError> {
        if self.parent_to_duplicate.contains_key(&parent.exit) {
            return Err(ConstructionError::MitosisAlreadyAllowed(parent.exit).into());
        }
        let non_terminal_out_arcs: Vec<ArcId> = self
            .store
            .out_arcs(parent.exit)
            .iter()
            .copied()
            .filter(|a| self.store.arc_end(*a) != self.target)
            .collect();
        if non_terminal_out_arcs.is_empty() {
            return Err(ConstructionError::PrematureMitosis(parent.exit).into());
        }

        let duplicate_timestep = self.store.node_timestep(parent.exit);
        let duplicate = self.store.add_node(duplicate_timestep);
        let division_arc = self.store.add_arc(self.source, duplicate, vec![division_cost])?;
        self.division_arcs.insert(division_arc);

        let mut pairs = Vec::with_capacity(non_terminal_out_arcs.len());
        for original in non_terminal_out_arcs {
            let w = self.store.arc_end(original);
            let unit_cost = self.store.first_unit_cost(original);
            let mirror = self.store.add_arc(duplicate, w, vec![unit_cost])?;
            pairs.push((original, mirror));
            self.mirror_of.insert(original, mirror);
            self.mirror_of.insert(mirror, original);
        }

        self.mirror_pairs.insert(parent.exit, pairs);
        self.parent_to_duplicate.insert(parent.exit, duplicate);
        self.duplicate_to_parent.insert(duplicate, parent.exit);

        Ok(division_arc)
    }

    pub fn is_intermediate(&self, arc: ArcId) -> bool {
        self.intermediate_arcs.contains(&arc)
    }

    pub fn is_appearance(&self, arc: ArcId) -> bool {
        self.appearance_arcs.contains(&arc)
    }

    pub fn is_disappearance(&self, arc: ArcId) -> bool {
        self.disappearance_arcs.contains(&arc)
    }

    pub fn is_division_arc(&self, arc: ArcId) -> bool {
        self.division_arcs.contains(&arc)
    }

    pub fn duplicate_of(&self, parent_exit: NodeId) -> Option<NodeId> {
        self.parent_to_duplicate.get(&parent_exit).copied()
    }

    /// All `(parent exit, duplicate)` pairs, for residual-token seeding.
    pub fn parent_to_duplicate_pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.parent_to_duplicate.iter().map(|(&v, &d)| (v, d))
    }

    pub fn parent_of(&self, duplicate: NodeId) -> Option<NodeId> {
        self.duplicate_to_parent.get(&duplicate).copied()
    }

    pub fn mirror_pairs_for_parent(&self, parent_exit: NodeId) -> &[(ArcId, ArcId)] {
        self.mirror_pairs
            .get(&parent_exit)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The counterpart of a mirrored arc pair, either direction: `v -> w`
    /// maps to `d -> w` and vice versa.
    pub fn mirror_of(&self, arc: ArcId) -> Option<ArcId> {
        self.mirror_of.get(&arc).copied()
    }

    pub fn appearance_arc_of(&self, node: NodeId) -> Option<ArcId> {
        self.appearance_of.get(&node).copied()
    }

    pub fn disappearance_arc_of(&self, node: NodeId) -> Option<ArcId> {
        self.disappearance_of.get(&node).copied()
    }

    /// Sum of flow on `node`'s in-arcs that are appearance arcs (normally
    /// either 0 or 1, since there's at most one appearance arc per node).
    pub fn appearance_flow(&self, node: NodeId) -> usize {
        self.store
            .in_arcs(node)
            .iter()
            .filter(|a| self.appearance_arcs.contains(a))
            .map(|a| self.store.flow(*a))
            .sum()
    }

    /// Sum of flow on `node`'s out-arcs that are disappearance arcs.
    pub fn disappearance_flow(&self, node: NodeId) -> usize {
        self.store
            .out_arcs(node)
            .iter()
            .filter(|a| self.disappearance_arcs.contains(a))
            .map(|a| self.store.flow(*a))
            .sum()
    }

    /// Enforce the division coupling invariant, `flow(d->w) =
    /// min(flow(v->w), 1)`, as a post-hoc synchronisation pass. Recorded in
    /// DESIGN.md: the main successive-shortest-paths loop does *not* keep
    /// this live at every step, since augmenting one unit at a time can
    /// leave it transiently unsynced between a parent's commit and its
    /// duplicate's mirrored commit, so this is exposed for the alternative
    /// solver's output and for callers that want the coupling checked
    /// explicitly after a solve.
    pub fn synchronize_division_duplicate_arc_flows(&mut self) -> Result<(), TrackingError> {
        let parents: Vec<NodeId> = self.mirror_pairs.keys().copied().collect();
        for parent in parents {
            let pairs = self.mirror_pairs[&parent].clone();
            for (original, mirror) in pairs {
                let synced = self.store.flow(original).min(1);
                self.store.set_flow(mirror, synced as i64)?;
            }
        }
        Ok(())
    }
}

impl Default for FlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_node_relabels_target_timestep() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(vec![-1.0], 0).unwrap();
        assert!(graph.store().node_timestep(graph.targets()[0]) > graph.store().node_timestep(a.exit));

        let prev_target_ts = graph.store().node_timestep(graph.targets()[0]);
        let b = graph.add_node(vec![-1.0], 5).unwrap();
        assert!(graph.store().node_timestep(graph.targets()[0]) > graph.store().node_timestep(b.exit));
        assert!(graph.store().node_timestep(graph.targets()[0]) > prev_target_ts);
    }

    #[test]
    fn allow_mitosis_requires_prior_out_arc() {
        let mut graph = FlowGraph::new();
        let parent = graph.add_node(vec![-2.0], 0).unwrap();
        assert!(graph.allow_mitosis(parent, -4.0).is_err());

        let child = graph.add_node(vec![-3.0], 1).unwrap();
        graph.add_arc(parent, child, vec![0.0]).unwrap();
        assert!(graph.allow_mitosis(parent, -4.0).is_ok());
    }

    #[test]
    fn allow_mitosis_mirrors_non_terminal_out_arcs_only() {
        let mut graph = FlowGraph::new();
        let parent = graph.add_node(vec![-2.0], 0).unwrap();
        let child = graph.add_node(vec![-3.0], 1).unwrap();
        graph.add_arc(parent, child, vec![0.25]).unwrap();
        graph.add_arc_to_target(parent, vec![1.0]).unwrap();

        graph.allow_mitosis(parent, -4.0).unwrap();
        let duplicate = graph.duplicate_of(parent.exit).unwrap();
        // only the child arc is mirrored, not the disappearance arc
        assert_eq!(graph.store().out_arcs(duplicate).len(), 1);
        let pairs = graph.mirror_pairs_for_parent(parent.exit);
        assert_eq!(pairs.len(), 1);
        assert_eq!(graph.store().arc_end(pairs[0].1), child.entry);
        assert_eq!(graph.store().first_unit_cost(pairs[0].1), 0.25);
    }

    #[test]
    fn allow_mitosis_rejected_twice() {
        let mut graph = FlowGraph::new();
        let parent = graph.add_node(vec![-2.0], 0).unwrap();
        let child = graph.add_node(vec![-3.0], 1).unwrap();
        graph.add_arc(parent, child, vec![0.0]).unwrap();
        graph.allow_mitosis(parent, -4.0).unwrap();
        assert!(graph.allow_mitosis(parent, -4.0).is_err());
    }
}
