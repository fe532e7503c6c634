//! # TrackingLoop
//!
//! Repeatedly asks [`crate::shortest_path::ShortestPathFinder`] for the
//! cheapest augmenting path or cycle in the residual graph, applies it, and
//! keeps the "enabled" bits of arcs whose traversability depends on a
//! *different* arc's flow in sync. Everything that capacity and the
//! division tokens already enforce on their own is left alone here.

use tracing::{debug, info, instrument, trace};

use crate::error::TrackingError;
use crate::flow_graph::FlowGraph;
use crate::graph::ArcId;
use crate::residual::{Direction, ResidualGraph};
use crate::shortest_path::{DistanceState, SearchOutcome, SearchResult, ShortestPathFinder};

/// Tunables for [`FlowGraph::max_flow_min_cost_tracking`], named so callers
/// can build and reuse a configuration instead of threading five positional
/// arguments through their own code.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    pub initial_energy: f64,
    pub use_back_arcs: bool,
    pub max_num_paths: usize,
    pub use_ordered_bf: bool,
    pub partial_bf_updates: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            initial_energy: 0.0,
            use_back_arcs: true,
            max_num_paths: usize::MAX,
            use_ordered_bf: true,
            partial_bf_updates: true,
        }
    }
}

/// Outcome of a solve: the final energy, how many augmenting
/// paths/cycles were applied, and whether `max_num_paths` cut the search
/// short before it ran dry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveReport {
    pub energy: f64,
    pub iterations: usize,
    pub bound_exhausted: bool,
}

impl FlowGraph {
    /// Run successive-shortest-paths to local optimality: augment the
    /// cheapest path or negative cycle in the residual graph, one unit of
    /// flow at a time, until no improving path or cycle remains or
    /// `max_num_paths` augmentations have been applied.
    #[instrument(skip(self), fields(max_num_paths = config.max_num_paths))]
    pub fn max_flow_min_cost_tracking(&mut self, config: SolverConfig) -> Result<SolveReport, TrackingError> {
        let mut residual = ResidualGraph::build(self);
        self.refresh_enabled_arcs(&mut residual);

        let mut energy = config.initial_energy;
        let mut iterations = 0usize;
        let mut carried_state: Option<DistanceState> = None;
        let mut touched_arcs = Vec::new();

        let bound_exhausted = loop {
            if iterations >= config.max_num_paths {
                break true;
            }

            let finder = ShortestPathFinder::new(&residual, self, config.use_back_arcs, config.use_ordered_bf);
            let (outcome, state) = if config.partial_bf_updates {
                match carried_state.take() {
                    Some(seed) => finder.search_partial(seed, &touched_arcs),
                    None => finder.search_full(),
                }
            } else {
                finder.search_full()
            };

            let result = match outcome {
                SearchOutcome::Improving(result) => result,
                SearchOutcome::NoImprovement => {
                    debug!(iterations, energy, "no improving path or cycle remains");
                    break false;
                }
            };

            trace!(cost = result.cost, steps = result.steps.len(), is_cycle = result.is_cycle, "augmenting");
            touched_arcs = self.augment_unit_flow(&mut residual, &result)?;
            energy += result.cost;
            iterations += 1;
            carried_state = Some(state);
        };

        info!(iterations, energy, bound_exhausted, "tracking solve finished");
        Ok(SolveReport {
            energy,
            iterations,
            bound_exhausted,
        })
    }

    /// Apply one unit of flow along every step of `result`, refresh the
    /// residual arcs that changed, and return the base arcs whose residual
    /// capacity, cost, or enabled bit just changed, so the next
    /// `partialBFUpdates` search knows which stale labels to invalidate.
    fn augment_unit_flow(&mut self, residual: &mut ResidualGraph, result: &SearchResult) -> Result<Vec<ArcId>, TrackingError> {
        let mut touched_arcs = Vec::with_capacity(result.steps.len());
        for step in &result.steps {
            let arc = residual.arc(step.residual_arc);
            let base = arc.base_arc;
            let delta = match arc.direction {
                Direction::Forward => 1,
                Direction::Backward => -1,
            };
            self.store_mut().add_flow(base, delta)?;
            touched_arcs.push(base);
        }

        for &base in &touched_arcs {
            residual.refresh_arc(self, base);
        }

        touched_arcs.extend(self.refresh_enabled_arcs(residual));
        touched_arcs.sort_by_key(|a| a.index());
        touched_arcs.dedup();
        Ok(touched_arcs)
    }

    /// Keep arcs whose traversability depends on another arc's flow in
    /// sync with the graph's current state. A division arc
    /// `source -> d` only becomes available once its parent has already
    /// committed a unit of flow to one of its own non-terminal children —
    /// capacity alone can't express that, since it's a constraint on a
    /// *different* arc, so it needs an explicit enabled bit. Returns the
    /// division arcs that just got *disabled*: a label relying on one of
    /// those needs invalidating the same way a saturated arc would,
    /// whereas a newly *enabled* arc only ever opens up new relaxation
    /// opportunities and can't make an existing label stale.
    fn refresh_enabled_arcs(&self, residual: &mut ResidualGraph) -> Vec<ArcId> {
        let mut disabled = Vec::new();
        for (parent, duplicate) in self.parent_to_duplicate_pairs() {
            let committed = self
                .store()
                .out_arcs(parent)
                .iter()
                .filter(|a| !self.is_division_arc(**a) && self.store().arc_end(**a) != self.targets()[0])
                .any(|a| self.store().flow(*a) > 0);

            if let Some(&division_arc) = self.store().in_arcs(duplicate).iter().find(|a| self.is_division_arc(**a)) {
                let was_enabled = residual.is_base_arc_enabled(division_arc);
                residual.set_base_arc_enabled(division_arc, committed);
                if was_enabled && !committed {
                    disabled.push(division_arc);
                }
            }
        }
        disabled
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn single_cell_chain_finds_negative_energy() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(vec![-5.0], 0).unwrap();
        graph.add_arc_to_source(a, vec![1.0]).unwrap();
        graph.add_arc_to_target(a, vec![1.0]).unwrap();

        let report = graph.max_flow_min_cost_tracking(SolverConfig::default()).unwrap();
        assert!((report.energy - (1.0 - 5.0 + 1.0)).abs() < 1e-6);
        assert_eq!(report.iterations, 1);
        assert!(!report.bound_exhausted);
    }

    #[test]
    fn no_profitable_flow_leaves_energy_at_zero() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(vec![5.0], 0).unwrap();
        graph.add_arc_to_source(a, vec![1.0]).unwrap();
        graph.add_arc_to_target(a, vec![1.0]).unwrap();

        let report = graph.max_flow_min_cost_tracking(SolverConfig::default()).unwrap();
        assert_eq!(report.iterations, 0);
        assert_eq!(report.energy, 0.0);
    }

    #[test]
    fn two_timestep_chain_tracks_through_intermediate_node() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(vec![-2.0], 0).unwrap();
        let b = graph.add_node(vec![-2.0], 1).unwrap();
        graph.add_arc_to_source(a, vec![1.0]).unwrap();
        graph.add_arc(a, b, vec![0.5]).unwrap();
        graph.add_arc_to_target(b, vec![1.0]).unwrap();

        let report = graph.max_flow_min_cost_tracking(SolverConfig::default()).unwrap();
        assert!((report.energy - (1.0 - 2.0 + 0.5 - 2.0 + 1.0)).abs() < 1e-6);
        assert_eq!(report.iterations, 1);
    }

    #[test]
    fn max_num_paths_bound_is_reported_when_hit() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(vec![-5.0], 0).unwrap();
        graph.add_arc_to_source(a, vec![1.0]).unwrap();
        graph.add_arc_to_target(a, vec![1.0]).unwrap();

        let config = SolverConfig {
            max_num_paths: 0,
            ..SolverConfig::default()
        };
        let report = graph.max_flow_min_cost_tracking(config).unwrap();
        assert_eq!(report.iterations, 0);
        assert!(report.bound_exhausted);
    }

    #[test]
    fn division_commits_both_children_with_expected_energy() {
        let mut graph = FlowGraph::new();
        let parent = graph.add_node(vec![-2.0], 0).unwrap();
        let child_b = graph.add_node(vec![-3.0], 1).unwrap();
        let child_c = graph.add_node(vec![-3.0], 1).unwrap();
        graph.add_arc_to_source(parent, vec![1.0]).unwrap();
        graph.add_arc(parent, child_b, vec![0.0]).unwrap();
        graph.add_arc(parent, child_c, vec![0.0]).unwrap();
        graph.add_arc_to_target(child_b, vec![1.0]).unwrap();
        graph.add_arc_to_target(child_c, vec![1.0]).unwrap();
        graph.allow_mitosis(parent, -4.0).unwrap();

        let report = graph.max_flow_min_cost_tracking(SolverConfig::default()).unwrap();
        assert!(report.energy < 0.0);
        assert!(report.iterations >= 2);
    }
}
