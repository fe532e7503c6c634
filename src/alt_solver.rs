//! # Reference solver
//!
//! A second, independent way to solve the same problem, used to cross-check
//! [`crate::tracking_loop`] on small instances rather than as the primary
//! solve path. It has two stages: a BFS augmenting-path search that
//! establishes the maximum flow value the network can carry (ignoring
//! cost), adapted from `kena0ki-rustrithm`'s `Dinic` BFS level search, and a
//! Bellman-Ford-seeded, potentials-based shortest path search that finds a
//! minimum-cost flow of exactly that value, adapted from the same crate's
//! `FlowGraph::mcf_flow_limit`.
//!
//! This solver does not know about division tokens: it treats the division
//! arc and its mirrors like any other arc, so it does not enforce the
//! parent/duplicate exclusivity `ShortestPathFinder` enforces via tokens.
//! It exists to check *flow value* and *cost* against the tracking loop on
//! instances without mitosis, not to replace it.

use std::collections::VecDeque;

use crate::error::{InfeasibilityError, TrackingError};
use crate::flow_graph::FlowGraph;
use crate::graph::{ArcId, NodeId};
use crate::residual::{Direction, ResidualArcId, ResidualGraph};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltSolveReport {
    pub energy: f64,
    pub max_flow: usize,
}

impl FlowGraph {
    /// Solve via max-flow-then-min-cost instead of successive shortest
    /// paths. Resets all flow in the graph before solving.
    pub fn reference_max_flow_min_cost(&mut self) -> Result<AltSolveReport, TrackingError> {
        self.reset_all_flow()?;
        let max_flow = self.max_flow_via_bfs()?;
        self.reset_all_flow()?;
        let energy = self.min_cost_for_flow(max_flow)?;
        Ok(AltSolveReport { energy, max_flow })
    }

    fn reset_all_flow(&mut self) -> Result<(), TrackingError> {
        for idx in 0..self.store().num_arcs() {
            self.store_mut().set_flow(ArcId::from_index(idx), 0)?;
        }
        Ok(())
    }

    fn max_flow_via_bfs(&mut self) -> Result<usize, TrackingError> {
        let mut max_flow = 0usize;
        while let Some(path) = self.bfs_augmenting_path() {
            for (arc, forward) in &path {
                self.store_mut().add_flow(*arc, if *forward { 1 } else { -1 })?;
            }
            max_flow += 1;
        }
        Ok(max_flow)
    }

    /// Plain BFS over spare forward and backward capacity, level by level,
    /// simplified from Dinic down to a single augmenting path per call
    /// since blocking-flow batching isn't needed at this scale.
    fn bfs_augmenting_path(&self) -> Option<Vec<(ArcId, bool)>> {
        let source = self.source();
        let target = self.targets()[0];
        let num_nodes = self.store().num_nodes();

        let mut visited = vec![false; num_nodes];
        let mut pred: Vec<Option<(ArcId, bool)>> = vec![None; num_nodes];
        let mut queue = VecDeque::new();
        visited[source.index()] = true;
        queue.push_back(source);

        while let Some(u) = queue.pop_front() {
            if u == target {
                break;
            }
            for &arc in self.store().out_arcs(u) {
                if self.store().flow(arc) < self.store().capacity(arc) {
                    let v = self.store().arc_end(arc);
                    if !visited[v.index()] {
                        visited[v.index()] = true;
                        pred[v.index()] = Some((arc, true));
                        queue.push_back(v);
                    }
                }
            }
            for &arc in self.store().in_arcs(u) {
                if self.store().flow(arc) > 0 {
                    let v = self.store().arc_start(arc);
                    if !visited[v.index()] {
                        visited[v.index()] = true;
                        pred[v.index()] = Some((arc, false));
                        queue.push_back(v);
                    }
                }
            }
        }

        if !visited[target.index()] {
            return None;
        }

        let mut path = Vec::new();
        let mut current = target;
        while current != source {
            let (arc, forward) = pred[current.index()]?;
            path.push((arc, forward));
            current = if forward {
                self.store().arc_start(arc)
            } else {
                self.store().arc_end(arc)
            };
        }
        path.reverse();
        Some(path)
    }

    fn min_cost_for_flow(&mut self, target_flow: usize) -> Result<f64, TrackingError> {
        let mut residual = ResidualGraph::build(self);
        let mut potentials = self.init_potentials(&residual);
        let mut energy = 0.0;

        for _ in 0..target_flow {
            let (distance, pred) = self.dijkstra_with_potentials(&residual, &mut potentials);
            let target = self.targets()[0];
            if !distance[target.index()].is_finite() {
                return Err(InfeasibilityError::MaxFlowUnreachable(target_flow).into());
            }

            let path = reconstruct_residual_path(&residual, &pred, self.source(), target);
            for &rid in &path {
                let arc = residual.arc(rid);
                let base = arc.base_arc;
                energy += arc.cost;
                let delta = match arc.direction {
                    Direction::Forward => 1,
                    Direction::Backward => -1,
                };
                self.store_mut().add_flow(base, delta)?;
                residual.refresh_arc(self, base);
            }
        }

        Ok(energy)
    }

    /// Bellman-Ford pass over the zero-flow residual graph so every arc's
    /// reduced cost is non-negative before the first Dijkstra run.
    fn init_potentials(&self, residual: &ResidualGraph) -> Vec<f64> {
        let num_nodes = self.store().num_nodes();
        let mut potentials = vec![0.0; num_nodes];
        for _ in 1..num_nodes {
            for idx in 0..residual.len() {
                let rid = ResidualArcId(idx);
                if !residual.is_traversable(rid) {
                    continue;
                }
                let arc = residual.arc(rid);
                let candidate = potentials[arc.from.index()] + arc.cost;
                if candidate < potentials[arc.to.index()] {
                    potentials[arc.to.index()] = candidate;
                }
            }
        }
        potentials
    }

    /// Dijkstra restricted to non-negative reduced costs, with potentials
    /// updated as nodes settle so the next call stays valid after flow
    /// changes (Johnson's technique).
    fn dijkstra_with_potentials(
        &self,
        residual: &ResidualGraph,
        potentials: &mut [f64],
    ) -> (Vec<f64>, Vec<Option<ResidualArcId>>) {
        let num_nodes = self.store().num_nodes();
        let mut visited = vec![false; num_nodes];
        let mut distance = vec![f64::INFINITY; num_nodes];
        let mut pred: Vec<Option<ResidualArcId>> = vec![None; num_nodes];
        distance[self.source().index()] = 0.0;

        while let Some(u) = (0..num_nodes)
            .filter(|&u| !visited[u] && distance[u].is_finite())
            .min_by(|&a, &b| (distance[a] - potentials[a]).partial_cmp(&(distance[b] - potentials[b])).unwrap())
        {
            visited[u] = true;
            potentials[u] = distance[u];
            for &rid in residual.out_arcs(NodeId::from_index(u)) {
                if !residual.is_traversable(rid) {
                    continue;
                }
                let arc = residual.arc(rid);
                let v = arc.to.index();
                let candidate = distance[u] + arc.cost;
                if distance[v] > candidate {
                    distance[v] = candidate;
                    pred[v] = Some(rid);
                }
            }
        }

        (distance, pred)
    }
}

fn reconstruct_residual_path(
    residual: &ResidualGraph,
    pred: &[Option<ResidualArcId>],
    source: NodeId,
    target: NodeId,
) -> Vec<ResidualArcId> {
    let mut path = Vec::new();
    let mut current = target;
    while current != source {
        let rid = match pred[current.index()] {
            Some(rid) => rid,
            None => break,
        };
        path.push(rid);
        current = residual.arc(rid).from;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn matches_tracking_loop_on_single_cell_chain() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(vec![-5.0], 0).unwrap();
        graph.add_arc_to_source(a, vec![1.0]).unwrap();
        graph.add_arc_to_target(a, vec![1.0]).unwrap();

        let report = graph.reference_max_flow_min_cost().unwrap();
        assert_eq!(report.max_flow, 1);
        assert!((report.energy - (1.0 - 5.0 + 1.0)).abs() < 1e-6);
    }

    #[test]
    fn zero_profitable_arcs_still_reports_max_flow() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(vec![5.0], 0).unwrap();
        graph.add_arc_to_source(a, vec![1.0]).unwrap();
        graph.add_arc_to_target(a, vec![1.0]).unwrap();

        let report = graph.reference_max_flow_min_cost().unwrap();
        assert_eq!(report.max_flow, 1);
        assert!((report.energy - 7.0).abs() < 1e-6);
    }
}
