use std::process::ExitCode;

use cell_tracker_flow::{FlowGraph, SolverConfig};
use tracing::info;

/// Thin demonstration driver: builds one worked tracking scenario, solves
/// it, and exits non-zero if the solve doesn't land where the scenario
/// says it should. There's no CLI surface here; the engine is meant to be
/// used as a library.
fn main() -> ExitCode {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run_division_scenario() {
        Ok(energy) => {
            info!(energy, "solve finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("tracking solve failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_division_scenario() -> Result<f64, cell_tracker_flow::TrackingError> {
    let mut graph = FlowGraph::new();
    let parent = graph.add_node(vec![-2.0], 0)?;
    let child_b = graph.add_node(vec![-3.0], 1)?;
    let child_c = graph.add_node(vec![-3.0], 1)?;
    graph.add_arc_to_source(parent, vec![1.0])?;
    graph.add_arc(parent, child_b, vec![0.0])?;
    graph.add_arc(parent, child_c, vec![0.0])?;
    graph.add_arc_to_target(child_b, vec![1.0])?;
    graph.add_arc_to_target(child_c, vec![1.0])?;
    graph.allow_mitosis(parent, -4.0)?;

    let report = graph.max_flow_min_cost_tracking(SolverConfig::default())?;
    if report.energy >= 0.0 {
        return Err(cell_tracker_flow::InfeasibilityError::MaxFlowUnreachable(2).into());
    }
    Ok(report.energy)
}
