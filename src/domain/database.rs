//! In-memory requirements database.
//!
//! The [`Database`] holds the requirements in file order, indexes them by
//! identifier, and answers graph queries over the local dependency relation.
//! Reading and writing files is delegated to [`crate::storage::csv`];
//! [`Database::load`] and [`Database::save`] are thin wrappers over it.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    path::Path,
};

use petgraph::{
    algo::{is_cyclic_directed, tarjan_scc},
    graph::{DiGraph, NodeIndex},
};
use thiserror::Error;
use tracing::instrument;

use crate::{
    Requirement,
    domain::requirement::is_local_reference,
    storage::{LoadError, SaveError, csv},
};

/// An ordered collection of requirements.
///
/// Insertion order is file order and is preserved on save. Identifiers are
/// expected to be unique, but duplicates read from disk are kept so that
/// schema validation can report them; lookups resolve to the first
/// occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Database {
    requirements: Vec<Requirement>,

    /// Position of the first requirement with each identifier.
    index: HashMap<String, usize>,

    /// Column order read from the file header, in normalised form.
    columns: Vec<String>,
}

/// Error returned when a requirement identifier is not in the database.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("requirement {0} not found")]
pub struct NotFoundError(pub String);

impl Database {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty database with the given column layout.
    #[must_use]
    pub(crate) fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }

    /// Load a database from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, malformed, or empty.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        csv::load(path)
    }

    /// Save the database to a CSV file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is empty or the file cannot be
    /// written.
    pub fn save(&self, path: &Path) -> Result<(), SaveError> {
        csv::save(self, path)
    }

    /// The column layout read from disk, in normalised (snake case) form.
    ///
    /// Empty for databases that were built in memory.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Appends a requirement.
    ///
    /// If the identifier is already present the requirement is still stored,
    /// but lookups continue to resolve to the earlier entry.
    pub fn push(&mut self, requirement: Requirement) {
        let position = self.requirements.len();
        self.index
            .entry(requirement.req_id.clone())
            .or_insert(position);
        self.requirements.push(requirement);
    }

    /// The number of requirements, including duplicates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    /// Whether the database holds no requirements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Iterates over the requirements in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Requirement> {
        self.requirements.iter()
    }

    /// Iterates mutably over the requirements in insertion order.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Requirement> {
        self.requirements.iter_mut()
    }

    /// Whether a requirement with this identifier exists.
    #[must_use]
    pub fn exists(&self, req_id: &str) -> bool {
        self.index.contains_key(req_id)
    }

    /// Looks up a requirement by identifier.
    #[must_use]
    pub fn find(&self, req_id: &str) -> Option<&Requirement> {
        self.index.get(req_id).map(|&i| &self.requirements[i])
    }

    /// Looks up a requirement by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] if no requirement has this identifier.
    pub fn get(&self, req_id: &str) -> Result<&Requirement, NotFoundError> {
        self.find(req_id)
            .ok_or_else(|| NotFoundError(req_id.to_string()))
    }

    /// Looks up a requirement by identifier for modification.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] if no requirement has this identifier.
    pub fn get_mut(&mut self, req_id: &str) -> Result<&mut Requirement, NotFoundError> {
        match self.index.get(req_id) {
            Some(&i) => Ok(&mut self.requirements[i]),
            None => Err(NotFoundError(req_id.to_string())),
        }
    }

    /// Requirements whose local dependencies include `req_id`.
    pub fn dependents<'a>(&'a self, req_id: &'a str) -> impl Iterator<Item = &'a Requirement> {
        self.requirements
            .iter()
            .filter(move |req| req.dependencies.contains(req_id))
    }

    /// The number of requirements that depend on `req_id`.
    #[must_use]
    pub fn blocking_count(&self, req_id: &str) -> usize {
        self.dependents(req_id).count()
    }

    /// Whether the local dependency graph contains any cycle, including
    /// self-dependencies.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.dependency_graph())
    }

    /// Find all circular dependency groups.
    ///
    /// The graph has an edge `A -> B` for every local dependency of `A` on
    /// an existing requirement `B`; cross-repo and dangling references are
    /// ignored. Each strongly connected component with two or more members
    /// is reported as one cycle, as is any requirement that depends on
    /// itself. Components are returned in the order Tarjan's algorithm
    /// completes them (reverse topological order).
    ///
    /// Each cycle is a closed walk along dependency edges that starts at the
    /// member inserted first: every entry depends on the next, and the last
    /// entry depends on the first. A simple cycle through all members is
    /// preferred, trying dependencies in sorted order. When there is none,
    /// the walk repeats members as needed to reach the whole group.
    #[must_use]
    #[instrument(level = "debug", skip(self), fields(requirements = self.len()))]
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let graph = self.dependency_graph();

        tarjan_scc(&graph)
            .into_iter()
            .filter(|component| match component.as_slice() {
                [node] => graph.contains_edge(*node, *node),
                _ => true,
            })
            .map(|component| self.walk_component(&graph, &component))
            .collect()
    }

    /// Builds the local dependency graph.
    ///
    /// Node weights are positions in `requirements`. Nodes are added in
    /// insertion order and edges in sorted dependency order.
    fn dependency_graph(&self) -> DiGraph<usize, ()> {
        let mut graph = DiGraph::with_capacity(self.index.len(), self.index.len());
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::with_capacity(self.index.len());

        for (position, req) in self.requirements.iter().enumerate() {
            if self.index.get(&req.req_id) == Some(&position) {
                nodes.insert(&req.req_id, graph.add_node(position));
            }
        }

        for (position, req) in self.requirements.iter().enumerate() {
            let Some(&source) = nodes.get(req.req_id.as_str()) else {
                continue;
            };
            if graph[source] != position {
                continue;
            }
            for dep in req.dependencies.iter().filter(|dep| is_local_reference(dep)) {
                if let Some(&target) = nodes.get(dep.trim()) {
                    graph.add_edge(source, target, ());
                }
            }
        }

        graph
    }

    fn walk_component(&self, graph: &DiGraph<usize, ()>, component: &[NodeIndex]) -> Vec<String> {
        let Some(&start) = component.iter().min() else {
            return Vec::new();
        };

        let walk = ComponentWalk {
            db: self,
            graph,
            members: component.iter().copied().collect(),
        };

        walk.simple_cycle(start)
            .unwrap_or_else(|| walk.closed_walk(start))
            .into_iter()
            .map(|node| walk.id(node).to_string())
            .collect()
    }
}

/// Upper bound on the extensions tried while searching for a simple cycle
/// through every member of a component.
const CYCLE_SEARCH_LIMIT: usize = 10_000;

/// Walks along dependency edges inside one strongly connected component.
struct ComponentWalk<'a> {
    db: &'a Database,
    graph: &'a DiGraph<usize, ()>,
    members: HashSet<NodeIndex>,
}

impl<'a> ComponentWalk<'a> {
    fn id(&self, node: NodeIndex) -> &'a str {
        self.db.requirements[self.graph[node]].req_id.as_str()
    }

    /// Successors inside the component, in identifier order.
    fn successors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut next: Vec<NodeIndex> = self
            .graph
            .neighbors(node)
            .filter(|n| self.members.contains(n))
            .collect();
        next.sort_by_key(|&n| self.id(n));
        next.dedup();
        next
    }

    /// A cycle through every member exactly once, if one is found within
    /// [`CYCLE_SEARCH_LIMIT`] steps.
    fn simple_cycle(&self, start: NodeIndex) -> Option<Vec<NodeIndex>> {
        let mut path = vec![start];
        let mut on_path = HashSet::from([start]);
        let mut choices = vec![self.successors(start).into_iter()];
        let mut budget = CYCLE_SEARCH_LIMIT;

        while let Some(options) = choices.last_mut() {
            let current = *path.last()?;
            if path.len() == self.members.len() && self.graph.contains_edge(current, start) {
                return Some(path);
            }

            match options.find(|next| !on_path.contains(next)) {
                Some(_) if budget == 0 => return None,
                Some(next) => {
                    budget -= 1;
                    path.push(next);
                    on_path.insert(next);
                    choices.push(self.successors(next).into_iter());
                }
                None => {
                    choices.pop();
                    if let Some(node) = path.pop() {
                        on_path.remove(&node);
                    }
                }
            }
        }

        None
    }

    /// A closed walk that reaches every member, repeating members where the
    /// component has to be crossed again. From each position it moves along
    /// the shortest path to the nearest unvisited member, then returns to
    /// `start`. The walk's last element depends on `start`.
    fn closed_walk(&self, start: NodeIndex) -> Vec<NodeIndex> {
        let mut walk = vec![start];
        let mut seen = HashSet::from([start]);
        let mut current = start;

        while seen.len() < self.members.len() {
            let Some(path) = self.shortest_path(current, |node| !seen.contains(&node)) else {
                break;
            };
            seen.extend(path.iter().copied());
            current = path.last().copied().unwrap_or(current);
            walk.extend(path);
        }

        let back = self
            .shortest_path(current, |node| node == start)
            .unwrap_or_default();
        if let Some((_, rest)) = back.split_last() {
            walk.extend_from_slice(rest);
        }

        walk
    }

    /// Breadth-first search from `from` to the first node satisfying `goal`.
    ///
    /// The path excludes `from` and ends at the goal.
    fn shortest_path(
        &self,
        from: NodeIndex,
        goal: impl Fn(NodeIndex) -> bool,
    ) -> Option<Vec<NodeIndex>> {
        let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            for next in self.successors(node) {
                if next == from || parents.contains_key(&next) {
                    continue;
                }
                parents.insert(next, node);
                if goal(next) {
                    let mut path = vec![next];
                    let mut step = node;
                    while step != from {
                        path.push(step);
                        step = parents[&step];
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }

        None
    }
}

impl FromIterator<Requirement> for Database {
    fn from_iter<I: IntoIterator<Item = Requirement>>(iter: I) -> Self {
        let mut db = Self::new();
        for requirement in iter {
            db.push(requirement);
        }
        db
    }
}

impl<'a> IntoIterator for &'a Database {
    type Item = &'a Requirement;
    type IntoIter = std::slice::Iter<'a, Requirement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
