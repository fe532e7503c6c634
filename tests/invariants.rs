//! Property-based invariants, run across randomly generated tracking graphs
//! rather than the six literal scenarios in `tracking_scenarios.rs`: flow
//! stays within capacity, non-terminal nodes conserve flow, a division
//! duplicate never out-commits its parent, and letting the solver run
//! longer never raises the reported energy.

use cell_tracker_flow::{ArcId, FlowGraph, NodeId, SolverConfig};
use proptest::prelude::*;

fn build_chain(detection_costs: &[f64], transition_costs: &[f64]) -> FlowGraph {
    let mut graph = FlowGraph::new();
    let mut prev = graph.add_node(vec![detection_costs[0]], 0).unwrap();
    graph.add_arc_to_source(prev, vec![1.0]).unwrap();
    for (t, (&cost, &transition)) in detection_costs[1..].iter().zip(transition_costs).enumerate() {
        let next = graph.add_node(vec![cost], (t + 1) as i64).unwrap();
        graph.add_arc(prev, next, vec![transition]).unwrap();
        prev = next;
    }
    graph.add_arc_to_target(prev, vec![1.0]).unwrap();
    graph
}

fn assert_flow_bounds_and_conservation(graph: &FlowGraph) {
    let store = graph.store();
    for idx in 0..store.num_arcs() {
        let arc = ArcId::from_index(idx);
        assert!(store.flow(arc) <= store.capacity(arc));
    }

    let source = graph.source();
    let target = graph.targets()[0];
    for idx in 0..store.num_nodes() {
        let node = NodeId::from_index(idx);
        if node == source || node == target {
            continue;
        }
        assert_eq!(store.sum_in_flow(node), store.sum_out_flow(node));
    }
}

// A chain's length and its transition costs are generated together so the
// two vectors always line up one-to-one (length n detections, n-1 transitions).
fn chain_params() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (1usize..6).prop_flat_map(|n| {
        (
            prop::collection::vec(-10.0..10.0f64, n),
            prop::collection::vec(-5.0..5.0f64, n - 1),
        )
    })
}

proptest! {
    #[test]
    fn flow_stays_within_capacity_and_conserves_at_every_node(
        (detection_costs, transition_costs) in chain_params(),
    ) {
        let mut graph = build_chain(&detection_costs, &transition_costs);
        graph.max_flow_min_cost_tracking(SolverConfig::default()).unwrap();
        assert_flow_bounds_and_conservation(&graph);
    }

    #[test]
    fn division_duplicate_flow_never_exceeds_parent_flow(
        parent_cost in -10.0..10.0f64,
        child_b_cost in -10.0..10.0f64,
        child_c_cost in -10.0..10.0f64,
        division_cost in -10.0..10.0f64,
    ) {
        let mut graph = FlowGraph::new();
        let parent = graph.add_node(vec![parent_cost], 0).unwrap();
        let child_b = graph.add_node(vec![child_b_cost], 1).unwrap();
        let child_c = graph.add_node(vec![child_c_cost], 1).unwrap();
        graph.add_arc_to_source(parent, vec![1.0]).unwrap();
        graph.add_arc(parent, child_b, vec![0.0]).unwrap();
        graph.add_arc(parent, child_c, vec![0.0]).unwrap();
        graph.add_arc_to_target(child_b, vec![1.0]).unwrap();
        graph.add_arc_to_target(child_c, vec![1.0]).unwrap();
        graph.allow_mitosis(parent, division_cost).unwrap();

        graph.max_flow_min_cost_tracking(SolverConfig::default()).unwrap();
        assert_flow_bounds_and_conservation(&graph);

        for (original, mirror) in graph.mirror_pairs_for_parent(parent.exit).iter().copied() {
            let original_flow = graph.store().flow(original);
            let mirror_flow = graph.store().flow(mirror);
            prop_assert!(mirror_flow <= 1);
            prop_assert!(original_flow >= mirror_flow);
        }
    }

    #[test]
    fn energy_never_increases_as_more_augmenting_paths_are_allowed(
        (detection_costs, transition_costs) in chain_params(),
        bound in 0usize..4,
    ) {
        let mut fewer = build_chain(&detection_costs, &transition_costs);
        let report_fewer = fewer
            .max_flow_min_cost_tracking(SolverConfig { max_num_paths: bound, ..SolverConfig::default() })
            .unwrap();

        let mut more = build_chain(&detection_costs, &transition_costs);
        let report_more = more
            .max_flow_min_cost_tracking(SolverConfig { max_num_paths: bound + 1, ..SolverConfig::default() })
            .unwrap();

        prop_assert!(report_more.energy <= report_fewer.energy + 1e-9);
    }
}
