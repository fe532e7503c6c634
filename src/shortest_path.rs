//! # ShortestPathFinder
//!
//! A Bellman-Ford variant, adapted from the worklist-driven relaxation in
//! `bill-pace-assignment-solver`'s `Network::find_shortest_path`, extended
//! with token propagation, optional timestep-ordered relaxation, optional
//! back-arc traversal, negative-cycle reconstruction, and partial re-
//! relaxation after augmentation.

use crate::flow_graph::FlowGraph;
use crate::graph::{ArcId, NodeId};
use crate::residual::{Direction, ResidualArcId, ResidualGraph};

/// Cost threshold below which a path/cycle counts as improving.
pub const TOLERANCE: f64 = -1e-8;

#[derive(Debug, Clone, Copy)]
pub struct PathStep {
    pub residual_arc: ResidualArcId,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub steps: Vec<PathStep>,
    pub cost: f64,
    pub is_cycle: bool,
}

#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Improving(SearchResult),
    NoImprovement,
}

/// Distance labels, carried tokens, and predecessor pointers, kept across
/// iterations so `partialBFUpdates` can seed the next search instead of
/// resetting from scratch.
#[derive(Clone)]
pub struct DistanceState {
    distances: Vec<f64>,
    tokens: Vec<Vec<NodeId>>,
    predecessors: Vec<Option<ResidualArcId>>,
}

impl DistanceState {
    pub fn reset(num_nodes: usize, source: NodeId) -> DistanceState {
        let mut distances = vec![f64::INFINITY; num_nodes];
        distances[source.index()] = 0.0;
        DistanceState {
            distances,
            tokens: vec![Vec::new(); num_nodes],
            predecessors: vec![None; num_nodes],
        }
    }

    pub fn distance(&self, n: NodeId) -> f64 {
        self.distances[n.index()]
    }
}

pub struct ShortestPathFinder<'a> {
    residual: &'a ResidualGraph,
    graph: &'a FlowGraph,
    use_back_arcs: bool,
    use_ordered_node_list: bool,
    node_rank: Vec<usize>,
}

impl<'a> ShortestPathFinder<'a> {
    pub fn new(
        residual: &'a ResidualGraph,
        graph: &'a FlowGraph,
        use_back_arcs: bool,
        use_ordered_node_list: bool,
    ) -> ShortestPathFinder<'a> {
        let store = graph.store();
        let mut order: Vec<NodeId> = (0..store.num_nodes()).map(NodeId::from_index).collect();
        order.sort_by_key(|&n| (store.node_timestep(n), n.index()));
        let mut node_rank = vec![0usize; store.num_nodes()];
        for (rank, n) in order.into_iter().enumerate() {
            node_rank[n.index()] = rank;
        }

        ShortestPathFinder {
            residual,
            graph,
            use_back_arcs,
            use_ordered_node_list,
            node_rank,
        }
    }

    /// Run a full search from the source, as on the first iteration. Falls
    /// back to a graph-wide negative cycle search if no augmenting path
    /// from the source improves the objective — a cycle need not touch
    /// the source or any target.
    pub fn search_full(&self) -> (SearchOutcome, DistanceState) {
        let state = DistanceState::reset(self.graph.store().num_nodes(), self.graph.source());
        let seed = vec![self.graph.source()];
        let (outcome, state) = self.search_from(state, &seed);
        match outcome {
            SearchOutcome::Improving(_) => (outcome, state),
            SearchOutcome::NoImprovement => match self.find_floating_negative_cycle() {
                Some(cycle) => (SearchOutcome::Improving(cycle), state),
                None => (SearchOutcome::NoImprovement, state),
            },
        }
    }

    /// Reuse `seed`'s distance labels after an augmentation instead of
    /// resetting from scratch. `touched_arcs` are the base arcs whose
    /// residual capacity, cost, or enabled bit just changed: any node whose
    /// predecessor chain in `seed` runs through one of them has a label
    /// that's no longer a valid upper bound (relaxation only ever
    /// decreases distances, so it can't self-correct a label that's now
    /// too optimistic) and must be invalidated before relaxing again.
    pub fn search_partial(&self, mut seed: DistanceState, touched_arcs: &[ArcId]) -> (SearchOutcome, DistanceState) {
        let (outcome, state) = if touched_arcs.is_empty() {
            self.conclude(seed)
        } else {
            self.invalidate_stale_labels(&mut seed, touched_arcs);
            let worklist: Vec<NodeId> = (0..self.graph.store().num_nodes())
                .map(NodeId::from_index)
                .filter(|&n| seed.distance(n).is_finite())
                .collect();
            self.search_from(seed, &worklist)
        };
        match outcome {
            SearchOutcome::Improving(_) => (outcome, state),
            SearchOutcome::NoImprovement => match self.find_floating_negative_cycle() {
                Some(cycle) => (SearchOutcome::Improving(cycle), state),
                None => (SearchOutcome::NoImprovement, state),
            },
        }
    }

    /// Reset to unvisited every node whose current predecessor arc's base
    /// arc is in `touched_arcs`, plus every node transitively depending on
    /// one of those (its predecessor chain runs through an invalidated
    /// node at some depth). Everything left with a finite distance is
    /// still a valid upper bound and can seed the next relaxation round.
    fn invalidate_stale_labels(&self, state: &mut DistanceState, touched_arcs: &[ArcId]) {
        let num_nodes = self.graph.store().num_nodes();
        let mut stale = vec![false; num_nodes];
        for idx in 0..num_nodes {
            if let Some(rid) = state.predecessors[idx] {
                if touched_arcs.contains(&self.residual.arc(rid).base_arc) {
                    stale[idx] = true;
                }
            }
        }

        loop {
            let mut changed = false;
            for idx in 0..num_nodes {
                if stale[idx] {
                    continue;
                }
                if let Some(rid) = state.predecessors[idx] {
                    let parent = self.residual.arc(rid).from;
                    if stale[parent.index()] {
                        stale[idx] = true;
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }

        for (idx, is_stale) in stale.into_iter().enumerate() {
            if is_stale {
                state.distances[idx] = f64::INFINITY;
                state.tokens[idx].clear();
                state.predecessors[idx] = None;
            }
        }
    }

    fn search_from(&self, mut state: DistanceState, initial: &[NodeId]) -> (SearchOutcome, DistanceState) {
        let num_nodes = self.graph.store().num_nodes();
        let targets = self.graph.targets();

        let mut worklist: Vec<NodeId> = initial.to_vec();
        self.normalize_worklist(&mut worklist);

        let mut rounds = 0usize;
        while !worklist.is_empty() && rounds < num_nodes {
            let mut next_worklist = Vec::new();
            for &u in &worklist {
                for &rid in self.residual.out_arcs(u) {
                    self.try_relax(rid, &mut state, &mut next_worklist, targets);
                }
            }
            self.normalize_worklist(&mut next_worklist);
            worklist = next_worklist;
            rounds += 1;
        }

        // A round bound hit while relaxations are still happening means a
        // source-reachable negative cycle exists.
        if rounds == num_nodes && !worklist.is_empty() {
            if let Some(witness) = worklist.first().copied() {
                if let Some(cycle) = self.reconstruct_cycle(&state.predecessors, witness) {
                    return (SearchOutcome::Improving(cycle), state);
                }
            }
        }

        self.conclude(state)
    }

    /// Negative cycles that don't touch the source (so a source-seeded
    /// search never relaxes into them) still make the objective
    /// improvable. Re-run Bellman-Ford with every node starting at
    /// distance zero, which makes every node eligible for relaxation from
    /// round one, and check whether relaxation is still happening after
    /// `numNodes` rounds. Doesn't consider division tokens: a cycle
    /// crossing a division duplicate without ever touching the source is
    /// not a scenario the mitosis model produces.
    fn find_floating_negative_cycle(&self) -> Option<SearchResult> {
        let num_nodes = self.graph.store().num_nodes();
        let mut distance = vec![0.0; num_nodes];
        let mut predecessors: Vec<Option<ResidualArcId>> = vec![None; num_nodes];
        let mut last_relaxed = None;

        for _ in 0..num_nodes {
            last_relaxed = None;
            for idx in 0..self.residual.len() {
                let rid = ResidualArcId(idx);
                let arc = self.residual.arc(rid);
                if matches!(arc.direction, Direction::Backward) && !self.use_back_arcs {
                    continue;
                }
                if !self.residual.is_traversable(rid) {
                    continue;
                }
                let candidate = distance[arc.from.index()] + arc.cost;
                if candidate < distance[arc.to.index()] {
                    distance[arc.to.index()] = candidate;
                    predecessors[arc.to.index()] = Some(rid);
                    last_relaxed = Some(arc.to);
                }
            }
        }

        self.reconstruct_cycle(&predecessors, last_relaxed?)
    }

    fn conclude(&self, state: DistanceState) -> (SearchOutcome, DistanceState) {
        let targets = self.graph.targets();
        let best_target = targets
            .iter()
            .copied()
            .filter(|&t| state.distance(t).is_finite())
            .min_by(|&a, &b| state.distance(a).partial_cmp(&state.distance(b)).unwrap());

        match best_target {
            Some(t) if state.distance(t) < TOLERANCE => {
                let steps = self.reconstruct_path(&state, t);
                let cost = state.distance(t);
                (
                    SearchOutcome::Improving(SearchResult {
                        steps,
                        cost,
                        is_cycle: false,
                    }),
                    state,
                )
            }
            _ => (SearchOutcome::NoImprovement, state),
        }
    }

    fn normalize_worklist(&self, worklist: &mut Vec<NodeId>) {
        worklist.sort_by_key(|&n| {
            if self.use_ordered_node_list {
                self.node_rank[n.index()]
            } else {
                n.index()
            }
        });
        worklist.dedup();
    }

    fn try_relax(
        &self,
        rid: ResidualArcId,
        state: &mut DistanceState,
        next_worklist: &mut Vec<NodeId>,
        targets: &[NodeId],
    ) {
        let arc = self.residual.arc(rid);
        if matches!(arc.direction, Direction::Backward) && !self.use_back_arcs {
            return;
        }
        if !self.residual.is_traversable(rid) {
            return;
        }

        let u = arc.from;
        let v = arc.to;
        let dist_u = state.distance(u);
        if !dist_u.is_finite() {
            return;
        }
        if arc.forbidden.iter().any(|t| state.tokens[u.index()].contains(t)) {
            return;
        }

        let new_dist = dist_u + arc.cost;
        if new_dist < state.distance(v) {
            state.distances[v.index()] = new_dist;
            let mut new_tokens = state.tokens[u.index()].clone();
            for t in &arc.provided {
                if !new_tokens.contains(t) {
                    new_tokens.push(*t);
                }
            }
            state.tokens[v.index()] = new_tokens;
            state.predecessors[v.index()] = Some(rid);
            if !targets.contains(&v) {
                next_worklist.push(v);
            }
        }
    }

    fn reconstruct_path(&self, state: &DistanceState, target: NodeId) -> Vec<PathStep> {
        let mut steps = Vec::new();
        let mut current = target;
        while let Some(rid) = state.predecessors[current.index()] {
            steps.push(PathStep { residual_arc: rid });
            current = self.residual.arc(rid).from;
        }
        steps.reverse();
        steps
    }

    /// Walk predecessors `num_nodes` times from `witness` to guarantee
    /// landing inside the cycle, then walk again until a node repeats
    ///.
    fn reconstruct_cycle(&self, predecessors: &[Option<ResidualArcId>], witness: NodeId) -> Option<SearchResult> {
        let num_nodes = self.graph.store().num_nodes();
        let mut node = witness;
        for _ in 0..num_nodes {
            node = match predecessors[node.index()] {
                Some(rid) => self.residual.arc(rid).from,
                None => return None,
            };
        }

        let start = node;
        let mut steps = Vec::new();
        let mut cost = 0.0;
        let mut current = start;
        loop {
            let rid = predecessors[current.index()]?;
            let arc = self.residual.arc(rid);
            steps.push(PathStep { residual_arc: rid });
            cost += arc.cost;
            current = arc.from;
            if current == start {
                break;
            }
        }
        steps.reverse();
        if cost < TOLERANCE {
            Some(SearchResult {
                steps,
                cost,
                is_cycle: true,
            })
        } else {
            None
        }
    }
}
