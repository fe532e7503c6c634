#[macro_use]
extern crate bencher;

use bencher::Bencher;
use cell_tracker_flow::residual::ResidualGraph;
use cell_tracker_flow::FlowGraph;

fn build_chain(len: usize) -> FlowGraph {
    let mut graph = FlowGraph::new();
    let mut prev = graph.add_node(vec![-1.0], 0).unwrap();
    graph.add_arc_to_source(prev, vec![1.0]).unwrap();
    for t in 1..len {
        let next = graph.add_node(vec![-1.0], t as i64).unwrap();
        graph.add_arc(prev, next, vec![-0.1]).unwrap();
        prev = next;
    }
    graph.add_arc_to_target(prev, vec![1.0]).unwrap();
    graph
}

fn residual_build_small(bench: &mut Bencher) {
    let graph = build_chain(20);
    bench.iter(|| {
        ResidualGraph::build(&graph);
    })
}

fn residual_build_large(bench: &mut Bencher) {
    let graph = build_chain(200);
    bench.iter(|| {
        ResidualGraph::build(&graph);
    })
}

benchmark_group!(residual_construction, residual_build_small, residual_build_large);
benchmark_main!(residual_construction);
