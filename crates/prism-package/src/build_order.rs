//! Build order computation for entry-points using depth-first topological sort
use crate::{PackageError, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// DFS node state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not visited yet
    White,
    /// On the current DFS path
    Gray,
    /// Finished, already in the order
    Black,
}

/// Dependency graph over entry-points.
///
/// Nodes keep their insertion (discovery) order, which is the tie-breaker
/// for every traversal so repeated runs produce identical orders.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Entry-point paths by insertion index
    nodes: Vec<PathBuf>,
    /// Path → insertion index
    index: HashMap<PathBuf, usize>,
    /// Insertion index → indices of the entry-points it depends on
    edges: Vec<BTreeSet<usize>>,
    /// Insertion index → indices of the entry-points depending on it
    dependents: Vec<BTreeSet<usize>>,
}

impl DependencyGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry-point; adding a known path is a no-op
    pub fn add_node(&mut self, path: impl Into<PathBuf>) -> usize {
        let path = path.into();
        if let Some(&idx) = self.index.get(&path) {
            return idx;
        }
        let idx = self.nodes.len();
        self.index.insert(path.clone(), idx);
        self.nodes.push(path);
        self.edges.push(BTreeSet::new());
        self.dependents.push(BTreeSet::new());
        idx
    }

    /// Record that `from` imports `to`. Both must be nodes; duplicate edges
    /// and self edges are dropped. Returns whether an edge was added.
    pub fn add_dependency(&mut self, from: &Path, to: &Path) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&from), Some(&to)) if from != to => {
                self.dependents[to].insert(from);
                self.edges[from].insert(to)
            }
            _ => false,
        }
    }

    /// Whether `path` is a node
    pub fn contains(&self, path: &Path) -> bool {
        self.index.contains_key(path)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> &[PathBuf] {
        &self.nodes
    }

    /// Direct dependencies of `path`, in insertion order
    pub fn dependencies_of(&self, path: &Path) -> Vec<&Path> {
        self.index
            .get(path)
            .map(|&idx| {
                self.edges[idx]
                    .iter()
                    .map(|&dep| self.nodes[dep].as_path())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Direct dependents of `path`, in insertion order
    pub fn dependents_of(&self, path: &Path) -> Vec<&Path> {
        self.index
            .get(path)
            .map(|&idx| {
                self.dependents[idx]
                    .iter()
                    .map(|&dependent| self.nodes[dependent].as_path())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Node count
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Compute the compile order: every entry-point after all of its
    /// dependencies.
    ///
    /// Roots are visited in insertion order and each node's dependencies in
    /// insertion order, so the result is a stable function of the graph.
    pub fn topological_order(&self) -> Result<Vec<PathBuf>> {
        let mut colors = vec![Color::White; self.nodes.len()];
        let mut order = Vec::with_capacity(self.nodes.len());

        for root in 0..self.nodes.len() {
            if colors[root] == Color::White {
                self.visit(root, &mut colors, &mut order)?;
            }
        }

        Ok(order.into_iter().map(|idx| self.nodes[idx].clone()).collect())
    }

    /// DFS from `root` with an explicit frame stack; the frames are the
    /// current gray path
    fn visit(&self, root: usize, colors: &mut [Color], order: &mut Vec<usize>) -> Result<()> {
        colors[root] = Color::Gray;
        let mut frames = vec![(root, self.edges[root].iter())];

        while let Some(frame) = frames.last_mut() {
            let node = frame.0;
            match frame.1.next().copied() {
                Some(dep) => match colors[dep] {
                    Color::White => {
                        colors[dep] = Color::Gray;
                        frames.push((dep, self.edges[dep].iter()));
                    }
                    Color::Gray => {
                        let path: Vec<usize> = frames.iter().map(|(n, _)| *n).collect();
                        return Err(self.cycle_error(&path, dep));
                    }
                    Color::Black => {}
                },
                None => {
                    frames.pop();
                    colors[node] = Color::Black;
                    order.push(node);
                }
            }
        }
        Ok(())
    }

    /// Describe the cycle closing at `back_to`
    fn cycle_error(&self, stack: &[usize], back_to: usize) -> PackageError {
        let start = stack.iter().position(|&n| n == back_to).unwrap_or(0);
        let cycle = stack[start..]
            .iter()
            .chain(std::iter::once(&back_to))
            .map(|&n| self.nodes[n].display().to_string())
            .collect::<Vec<_>>()
            .join(" -> ");
        PackageError::CircularDependency(cycle)
    }
}
