//! # ResidualGraph
//!
//! A mirror of the base graph built once per solve and refreshed in place as
//! flow changes: for every base arc there is a forward and a backward
//! residual arc, each with a residual cost, a residual capacity, an enabled
//! bit, and a token system used to express the mitosis side-constraints to
//! the shortest-path search.

use crate::flow_graph::FlowGraph;
use crate::graph::{ArcId, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Index into `ResidualGraph::arcs`. Forward and backward residual arcs for
/// base arc `a` live at `2*a.index()` and `2*a.index()+1` respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResidualArcId(pub usize);

pub struct ResidualArc {
    pub base_arc: ArcId,
    pub direction: Direction,
    pub from: NodeId,
    pub to: NodeId,
    pub enabled: bool,
    pub capacity: usize,
    pub cost: f64,
    /// Tokens contributed when this arc is taken.
    pub provided: Vec<NodeId>,
    /// Tokens whose presence earlier on the path excludes this arc.
    pub forbidden: Vec<NodeId>,
}

impl ResidualArc {
    fn new(base_arc: ArcId, direction: Direction, from: NodeId, to: NodeId) -> ResidualArc {
        ResidualArc {
            base_arc,
            direction,
            from,
            to,
            enabled: true,
            capacity: 0,
            cost: 0.0,
            provided: Vec::new(),
            forbidden: Vec::new(),
        }
    }
}

pub struct ResidualGraph {
    arcs: Vec<ResidualArc>,
    out_index: Vec<Vec<ResidualArcId>>,
}

impl ResidualGraph {
    fn forward_id(base: ArcId) -> ResidualArcId {
        ResidualArcId(2 * base.index())
    }

    fn backward_id(base: ArcId) -> ResidualArcId {
        ResidualArcId(2 * base.index() + 1)
    }

    /// Build the residual graph for `graph`, enabling every arc and seeding
    /// the division tokens.
    pub fn build(graph: &FlowGraph) -> ResidualGraph {
        let store = graph.store();
        let mut arcs = Vec::with_capacity(2 * store.num_arcs());
        for idx in 0..store.num_arcs() {
            let base = ArcId::from_index(idx);
            let src = store.arc_start(base);
            let tgt = store.arc_end(base);
            arcs.push(ResidualArc::new(base, Direction::Forward, src, tgt));
            arcs.push(ResidualArc::new(base, Direction::Backward, tgt, src));
        }

        let mut out_index = vec![Vec::new(); store.num_nodes()];
        for (id, arc) in arcs.iter().enumerate() {
            out_index[arc.from.index()].push(ResidualArcId(id));
        }

        let mut residual = ResidualGraph { arcs, out_index };
        for idx in 0..store.num_arcs() {
            residual.refresh_arc(graph, ArcId::from_index(idx));
        }
        residual.seed_division_tokens(graph);
        residual
    }

    fn seed_division_tokens(&mut self, graph: &FlowGraph) {
        // for every parent v with duplicate d: in-arcs of d provide token
        // id(v) on their forward residual arc; out-arcs of v forbid token
        // id(v) on their backward residual arc.
        let store = graph.store();
        for (v, d) in graph.parent_to_duplicate_pairs() {
            for &in_arc in store.in_arcs(d) {
                let fwd = Self::forward_id(in_arc);
                self.arcs[fwd.0].provided.push(v);
            }
            for &out_arc in store.out_arcs(v) {
                let bwd = Self::backward_id(out_arc);
                self.arcs[bwd.0].forbidden.push(v);
            }
        }
    }

    /// Recompute capacity and cost for both residual counterparts of `base`
    /// from the graph's current flow.
    pub fn refresh_arc(&mut self, graph: &FlowGraph, base: ArcId) {
        let store = graph.store();
        let flow = store.flow(base) as i64;
        let capacity = store.capacity(base);

        let fwd = Self::forward_id(base);
        self.arcs[fwd.0].capacity = capacity - flow as usize;
        self.arcs[fwd.0].cost = store.marginal_cost(base, flow);

        let bwd = Self::backward_id(base);
        self.arcs[bwd.0].capacity = flow as usize;
        self.arcs[bwd.0].cost = -store.marginal_cost(base, flow - 1);
    }

    pub fn arc(&self, id: ResidualArcId) -> &ResidualArc {
        &self.arcs[id.0]
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    pub fn out_arcs(&self, node: NodeId) -> &[ResidualArcId] {
        &self.out_index[node.index()]
    }

    pub fn set_enabled(&mut self, id: ResidualArcId, enabled: bool) {
        self.arcs[id.0].enabled = enabled;
    }

    /// Enable or disable both residual directions of a base arc together;
    /// the side-constraint state machine in `tracking_loop` reasons about
    /// whole base arcs, not individual residual directions.
    pub fn set_base_arc_enabled(&mut self, base: ArcId, enabled: bool) {
        self.set_enabled(Self::forward_id(base), enabled);
        self.set_enabled(Self::backward_id(base), enabled);
    }

    pub fn is_base_arc_enabled(&self, base: ArcId) -> bool {
        self.arcs[Self::forward_id(base).0].enabled
    }

    pub fn is_traversable(&self, id: ResidualArcId) -> bool {
        let a = &self.arcs[id.0];
        a.enabled && a.capacity > 0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::flow_graph::FlowGraph;

    #[test]
    fn forward_and_backward_costs_mirror_base_arc() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(vec![-5.0], 0).unwrap();
        graph.add_arc_to_source(a, vec![1.0]).unwrap();
        graph.add_arc_to_target(a, vec![1.0]).unwrap();

        let residual = ResidualGraph::build(&graph);
        let arc = graph
            .store()
            .out_arcs(a.entry)
            .iter()
            .copied()
            .find(|&arc| graph.is_intermediate(arc))
            .unwrap();
        let fwd = ResidualGraph::forward_id(arc);
        let bwd = ResidualGraph::backward_id(arc);
        assert_eq!(residual.arc(fwd).cost, -5.0);
        assert_eq!(residual.arc(fwd).capacity, 1);
        assert_eq!(residual.arc(bwd).capacity, 0);
    }

    #[test]
    fn division_tokens_seeded_on_build() {
        let mut graph = FlowGraph::new();
        let parent = graph.add_node(vec![-2.0], 0).unwrap();
        let child = graph.add_node(vec![-3.0], 1).unwrap();
        graph.add_arc(parent, child, vec![0.0]).unwrap();
        graph.allow_mitosis(parent, -4.0).unwrap();

        let residual = ResidualGraph::build(&graph);
        let duplicate = graph.duplicate_of(parent.exit).unwrap();
        let division_arc = graph.store().in_arcs(duplicate)[0];
        let fwd = ResidualGraph::forward_id(division_arc);
        assert_eq!(residual.arc(fwd).provided, vec![parent.exit]);

        let out_arc = graph.store().out_arcs(parent.exit)[0];
        let bwd = ResidualGraph::backward_id(out_arc);
        assert_eq!(residual.arc(bwd).forbidden, vec![parent.exit]);
    }
}
