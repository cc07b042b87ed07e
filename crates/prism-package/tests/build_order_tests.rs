//! Compile order tests for the entry-point dependency graph

use prism_package::{DependencyGraph, PackageError};
use proptest::prelude::*;
use rstest::rstest;
use std::path::{Path, PathBuf};

fn node(i: usize) -> PathBuf {
    PathBuf::from(format!("/nm/ep{}", i))
}

fn build(count: usize, edges: &[(usize, usize)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for i in 0..count {
        graph.add_node(node(i));
    }
    for &(from, to) in edges {
        graph.add_dependency(&node(from), &node(to));
    }
    graph
}

fn position(order: &[PathBuf], path: &Path) -> usize {
    order.iter().position(|p| p == path).unwrap()
}

#[rstest]
#[case::chain(3, vec![(0, 1), (1, 2)], vec![2, 1, 0])]
#[case::diamond(4, vec![(0, 1), (0, 2), (1, 3), (2, 3)], vec![3, 1, 2, 0])]
#[case::independent(3, vec![], vec![0, 1, 2])]
#[case::late_root(3, vec![(2, 0)], vec![0, 1, 2])]
#[case::shared_leaf(3, vec![(0, 2), (1, 2)], vec![2, 0, 1])]
fn test_order_cases(
    #[case] count: usize,
    #[case] edges: Vec<(usize, usize)>,
    #[case] expected: Vec<usize>,
) {
    let order = build(count, &edges).topological_order().unwrap();
    let expected: Vec<PathBuf> = expected.into_iter().map(node).collect();
    pretty_assertions::assert_eq!(order, expected);
}

#[test]
fn test_two_node_cycle_is_reported() {
    let graph = build(2, &[(0, 1), (1, 0)]);
    let err = graph.topological_order().unwrap_err();
    assert!(matches!(err, PackageError::CircularDependency(_)));
    assert_eq!(
        err.to_string(),
        "Circular dependency detected: /nm/ep0 -> /nm/ep1 -> /nm/ep0"
    );
}

#[test]
fn test_cycle_below_acyclic_root() {
    let graph = build(4, &[(0, 1), (1, 2), (2, 3), (3, 1)]);
    match graph.topological_order() {
        Err(PackageError::CircularDependency(cycle)) => {
            assert_eq!(cycle, "/nm/ep1 -> /nm/ep2 -> /nm/ep3 -> /nm/ep1");
        }
        other => panic!("Expected CircularDependency error, got {:?}", other),
    }
}

proptest! {
    #[test]
    fn prop_order_respects_every_edge(
        count in 1usize..12,
        raw_edges in proptest::collection::vec((0usize..12, 0usize..12), 0..30),
    ) {
        // Edges only point at lower indices, so the graph is acyclic
        let edges: Vec<(usize, usize)> = raw_edges
            .into_iter()
            .filter(|&(from, to)| from < count && to < count && to < from)
            .collect();
        let graph = build(count, &edges);

        let order = graph.topological_order().unwrap();
        prop_assert_eq!(order.len(), count);
        for &(from, to) in &edges {
            prop_assert!(position(&order, &node(to)) < position(&order, &node(from)));
        }

        let again = build(count, &edges).topological_order().unwrap();
        prop_assert_eq!(order, again);
    }
}
