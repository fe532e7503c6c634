use super::NodeId;

/// An arc connecting two nodes in the graph store. The cost vector `costs`
/// gives the marginal cost of each unit of flow; its length is the arc's
/// integer capacity.
pub struct Arc {
    start_node: NodeId,
    end_node: NodeId,
    costs: Vec<f64>,
    flow: usize,
}

impl Arc {
    pub fn new(start_node: NodeId, end_node: NodeId, costs: Vec<f64>) -> Arc {
        Arc {
            start_node,
            end_node,
            costs,
            flow: 0,
        }
    }

    pub fn start_node(&self) -> NodeId {
        self.start_node
    }

    pub fn end_node(&self) -> NodeId {
        self.end_node
    }

    pub fn capacity(&self) -> usize {
        self.costs.len()
    }

    pub fn flow(&self) -> usize {
        self.flow
    }

    pub(super) fn set_flow(&mut self, flow: usize) {
        self.flow = flow;
    }

    /// Marginal cost of unit `n` (`arcCost`): `c[n]` in range, `+inf`
    /// past the end of the cost vector, `-inf` below zero. Callers only ever
    /// query `n in {flow, flow - 1}`.
    pub fn marginal_cost(&self, n: i64) -> f64 {
        if n < 0 {
            f64::NEG_INFINITY
        } else if (n as usize) >= self.costs.len() {
            f64::INFINITY
        } else {
            self.costs[n as usize]
        }
    }

    pub fn first_unit_cost(&self) -> f64 {
        self.costs[0]
    }
}
