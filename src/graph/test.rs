use super::GraphStore;

#[test]
fn add_arc_rejects_empty_cost_vector() {
    let mut store = GraphStore::new();
    let a = store.add_node(0);
    let b = store.add_node(1);
    assert!(store.add_arc(a, b, vec![]).is_err());
}

#[test]
fn add_arc_wires_in_and_out_lists() {
    let mut store = GraphStore::new();
    let a = store.add_node(0);
    let b = store.add_node(1);
    let arc = store.add_arc(a, b, vec![1.5, 2.5]).unwrap();

    assert_eq!(store.out_arcs(a), &[arc]);
    assert_eq!(store.in_arcs(b), &[arc]);
    assert_eq!(store.capacity(arc), 2);
    assert_eq!(store.flow(arc), 0);
}

#[test]
fn marginal_cost_bounds() {
    let mut store = GraphStore::new();
    let a = store.add_node(0);
    let b = store.add_node(1);
    let arc = store.add_arc(a, b, vec![3.0, 4.0]).unwrap();

    assert_eq!(store.marginal_cost(arc, -1), f64::NEG_INFINITY);
    assert_eq!(store.marginal_cost(arc, 0), 3.0);
    assert_eq!(store.marginal_cost(arc, 1), 4.0);
    assert_eq!(store.marginal_cost(arc, 2), f64::INFINITY);
}

#[test]
fn set_flow_validates_bounds() {
    let mut store = GraphStore::new();
    let a = store.add_node(0);
    let b = store.add_node(1);
    let arc = store.add_arc(a, b, vec![1.0]).unwrap();

    assert!(store.set_flow(arc, -1).is_err());
    assert!(store.set_flow(arc, 2).is_err());
    assert!(store.set_flow(arc, 1).is_ok());
    assert_eq!(store.flow(arc), 1);
}

#[test]
fn sum_in_and_out_flow() {
    let mut store = GraphStore::new();
    let a = store.add_node(0);
    let b = store.add_node(1);
    let c = store.add_node(2);
    let ab = store.add_arc(a, b, vec![1.0]).unwrap();
    let ac = store.add_arc(a, c, vec![1.0]).unwrap();
    store.set_flow(ab, 1).unwrap();

    assert_eq!(store.sum_out_flow(a), 1);
    assert_eq!(store.sum_in_flow(b), 1);
    assert_eq!(store.sum_in_flow(c), 0);
    let _ = ac;
}
