//! A min-cost flow engine for tracking objects (e.g. cells in a microscopy
//! time series) across discrete timesteps, with explicit support for
//! division/mitosis events, appearance, and disappearance.
//!
//! Callers build a [`FlowGraph`] detection by detection with
//! [`FlowGraph::add_node`], wire up transition, appearance, disappearance,
//! and division arcs, then call [`FlowGraph::max_flow_min_cost_tracking`]
//! to solve. [`alt_solver`] offers an independent max-flow-then-min-cost
//! implementation for cross-checking small instances.

mod error;
mod graph;

pub mod alt_solver;
pub mod flow_graph;
pub mod residual;
pub mod shortest_path;
pub mod tracking_loop;

pub use alt_solver::AltSolveReport;
pub use error::{ConstructionError, InfeasibilityError, StateError, TrackingError};
pub use flow_graph::{FlowGraph, FullNodeId};
pub use graph::{ArcId, GraphStore, NodeId};
pub use shortest_path::{DistanceState, PathStep, SearchOutcome, SearchResult, ShortestPathFinder};
pub use tracking_loop::{SolveReport, SolverConfig};
