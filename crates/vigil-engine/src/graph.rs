//! Dependency graph over plan node names.

use std::collections::BTreeMap;

/// Directed edges from a node to the nodes it depends on.
///
/// Edges cover static input bindings and fork-join role references
/// (enumerator, root, combiner).
#[derive(Debug, Default)]
pub struct PlanGraph {
  dependencies: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
  Unvisited,
  InProgress,
  Done,
}

impl PlanGraph {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_node(&mut self, name: impl Into<String>) {
    self.dependencies.entry(name.into()).or_default();
  }

  /// Record that `from` depends on `to`.
  pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) {
    let to = to.into();
    self.add_node(to.clone());
    self.dependencies.entry(from.into()).or_default().push(to);
  }

  pub fn dependencies(&self, name: &str) -> &[String] {
    self
      .dependencies
      .get(name)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  /// Find a cycle with a depth-first three-colour search.
  ///
  /// Returns the cycle as a path whose first and last entries are the same
  /// node. Nodes are visited in name order so the result is deterministic.
  pub fn find_cycle(&self) -> Option<Vec<String>> {
    let mut marks: BTreeMap<&str, Mark> = self
      .dependencies
      .keys()
      .map(|name| (name.as_str(), Mark::Unvisited))
      .collect();
    let mut stack: Vec<&str> = Vec::new();

    for name in self.dependencies.keys() {
      if marks.get(name.as_str()) == Some(&Mark::Unvisited) {
        if let Some(cycle) = self.visit(name, &mut marks, &mut stack) {
          return Some(cycle);
        }
      }
    }
    None
  }

  fn visit<'a>(
    &'a self,
    name: &'a str,
    marks: &mut BTreeMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
  ) -> Option<Vec<String>> {
    marks.insert(name, Mark::InProgress);
    stack.push(name);

    for next in self.dependencies(name) {
      match marks.get(next.as_str()) {
        Some(Mark::InProgress) => {
          // Back edge: the cycle is the stack suffix starting at `next`.
          let start = stack.iter().position(|n| *n == next.as_str()).unwrap_or(0);
          let mut path: Vec<String> = stack[start..].iter().map(|n| n.to_string()).collect();
          path.push(next.clone());
          return Some(path);
        }
        Some(Mark::Unvisited) => {
          if let Some(cycle) = self.visit(next, marks, stack) {
            return Some(cycle);
          }
        }
        _ => {}
      }
    }

    stack.pop();
    marks.insert(name, Mark::Done);
    None
  }
}
