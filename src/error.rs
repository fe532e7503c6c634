//! Error types for construction, internal state, and infeasibility failures.
//!
//! Hitting `max_num_paths` is deliberately not a variant here: it's a soft,
//! successful outcome, so it's folded into `SolveReport` instead (see
//! `tracking_loop`).

use thiserror::Error;

use crate::graph::{ArcId, NodeId};

/// Top-level error returned by the construction and solving API.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Infeasibility(#[from] InfeasibilityError),
}

/// Errors reported synchronously at the failing construction call.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("cost vector must have at least one entry")]
    EmptyCostVector,
    #[error(
        "allowMitosis called for parent exit {0:?} before it had any non-terminal out-arc; \
         add all of the parent's non-division out-arcs first"
    )]
    PrematureMitosis(NodeId),
    #[error("node {0:?} already has a division duplicate")]
    MitosisAlreadyAllowed(NodeId),
}

/// Fatal internal errors detected while refreshing residual state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("arc {arc:?} flow {flow} exceeds capacity {capacity}")]
    FlowExceedsCapacity {
        arc: ArcId,
        flow: i64,
        capacity: usize,
    },
    #[error("arc {arc:?} flow went negative: {flow}")]
    NegativeFlow { arc: ArcId, flow: i64 },
}

/// Fatal only for the alternative max-flow-then-min-cost reference solver.
#[derive(Debug, Error)]
pub enum InfeasibilityError {
    #[error("reference solver could not route the required max-flow supply of {0} units")]
    MaxFlowUnreachable(usize),
}
