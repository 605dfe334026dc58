//! Directed, edge-labelled graphs and the traversals the automata are built on.
//!
//! Two storage strategies implement the same [`Graph`] trait:
//! * [`SimpleGraph`]: every (vertex, label) pair has at most one destination. Deterministic
//!   automata are stored like this.
//! * [`NonDeterministicGraph`]: every (vertex, label) pair has a set of destinations.
//!   Non-deterministic automata (including their epsilon edges) are stored like this.
//!
//! Traversals are configured through a [`Traversal`], which bundles an edge filter with
//! an order on vertices and an order on edges. The orders only decide in which order results
//! are produced, never which results are produced.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Debug;

use crate::UndefinedState;

/// A single edge `start -edge-> end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path<V, E> {
    pub start: V,
    pub edge: E,
    pub end: V,
}

impl<V, E> Path<V, E> {
    pub fn new(start: V, edge: E, end: V) -> Self {
        Self { start, edge, end }
    }
}

/// Graph operations shared by all graph representations.
///
/// Implementors only describe their vertices and outgoing edges. All traversals are provided
/// through [`Graph::traverse`].
pub trait Graph {
    /// The type of the vertices.
    type Vertex: Ord + Clone + Debug;
    /// The type of the edge labels.
    type Edge: Ord + Clone + Debug;

    /// Returns the graph's own copy of `vertex`, or `None` if it is not part of this graph.
    fn vertex(&self, vertex: &Self::Vertex) -> Option<&Self::Vertex>;

    /// All vertices of this graph.
    fn vertices(&self) -> Vec<&Self::Vertex>;

    /// The outgoing edges of `vertex` as (label, destination) pairs,
    /// or `None` if `vertex` is not part of this graph.
    fn successors(&self, vertex: &Self::Vertex) -> Option<Vec<(&Self::Edge, &Self::Vertex)>>;

    fn contains(&self, vertex: &Self::Vertex) -> bool {
        self.vertex(vertex).is_some()
    }

    /// Starts configuring a traversal over this graph.
    ///
    /// ```
    /// # use tagex_regular_expressions::graph::{Graph, SimpleGraph};
    /// let mut builder = SimpleGraph::builder();
    /// builder.path('A', 'b', 'B').path('B', 'c', 'C');
    /// let graph = builder.build().unwrap();
    ///
    /// let reachable = graph.traverse().closure([&'A']).unwrap();
    /// assert_eq!(reachable.into_iter().collect::<String>(), "ABC");
    /// ```
    fn traverse(&self) -> Traversal<'_, Self>
    where
        Self: Sized,
    {
        Traversal::new(self)
    }
}

type Filter<'g, V, E> = Box<dyn Fn(&Path<&V, &E>) -> bool + 'g>;
type Order<'g, T> = Box<dyn Fn(&T, &T) -> Ordering + 'g>;

/// A configured traversal over a graph.
///
/// By default every edge passes the filter and vertices and edges are visited in their natural
/// order.
pub struct Traversal<'g, G: Graph> {
    graph: &'g G,
    filter: Filter<'g, G::Vertex, G::Edge>,
    vertex_order: Order<'g, G::Vertex>,
    edge_order: Order<'g, G::Edge>,
}

impl<'g, G: Graph> Traversal<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self {
            graph,
            filter: Box::new(|_| true),
            vertex_order: Box::new(|a: &G::Vertex, b: &G::Vertex| a.cmp(b)),
            edge_order: Box::new(|a: &G::Edge, b: &G::Edge| a.cmp(b)),
        }
    }

    /// Only yield (and, for [`Traversal::closure`], only follow) edges for which `filter` holds.
    pub fn filter(mut self, filter: impl Fn(&Path<&G::Vertex, &G::Edge>) -> bool + 'g) -> Self {
        self.filter = Box::new(filter);
        self
    }

    pub fn order_vertices(
        mut self,
        order: impl Fn(&G::Vertex, &G::Vertex) -> Ordering + 'g,
    ) -> Self {
        self.vertex_order = Box::new(order);
        self
    }

    pub fn order_edges(mut self, order: impl Fn(&G::Edge, &G::Edge) -> Ordering + 'g) -> Self {
        self.edge_order = Box::new(order);
        self
    }

    /// All edges leaving one of `starts` that pass the filter.
    pub fn paths<'s>(
        self,
        starts: impl IntoIterator<Item = &'s G::Vertex>,
    ) -> Result<Paths<'g, G>, UndefinedState>
    where
        G::Vertex: 's,
    {
        let starts = self.resolve_starts(starts)?;
        Ok(Paths {
            traversal: self,
            starts: starts.into(),
            pending: VecDeque::new(),
        })
    }

    /// All edges of the graph that pass the filter.
    pub fn all_paths(self) -> Paths<'g, G> {
        let mut starts = self.graph.vertices();
        starts.sort_by(|a, b| (self.vertex_order)(a, b));
        Paths {
            traversal: self,
            starts: starts.into(),
            pending: VecDeque::new(),
        }
    }

    /// Visits every vertex reachable from `starts` in breadth-first order.
    /// Yields the edge through which a vertex was discovered, if it passes the filter.
    pub fn breadth_first<'s>(
        self,
        starts: impl IntoIterator<Item = &'s G::Vertex>,
    ) -> Result<Search<'g, G>, UndefinedState>
    where
        G::Vertex: 's,
    {
        self.search(starts, SearchOrder::BreadthFirst)
    }

    /// Visits every vertex reachable from `starts` in depth-first order.
    /// Yields the edge through which a vertex was discovered, if it passes the filter.
    pub fn depth_first<'s>(
        self,
        starts: impl IntoIterator<Item = &'s G::Vertex>,
    ) -> Result<Search<'g, G>, UndefinedState>
    where
        G::Vertex: 's,
    {
        self.search(starts, SearchOrder::DepthFirst)
    }

    /// All vertices reachable from `starts` through zero or more edges that pass the filter.
    pub fn closure<'s>(
        &self,
        starts: impl IntoIterator<Item = &'s G::Vertex>,
    ) -> Result<BTreeSet<G::Vertex>, UndefinedState>
    where
        G::Vertex: 's,
    {
        let graph: &'g G = self.graph;
        let mut stack = self.resolve_starts(starts)?;
        let mut seen: BTreeSet<&'g G::Vertex> = stack.iter().copied().collect();

        while let Some(start) = stack.pop() {
            for (edge, end) in graph.successors(start).unwrap_or_default() {
                if !seen.contains(end) && (self.filter)(&Path::new(start, edge, end)) {
                    seen.insert(end);
                    stack.push(end);
                }
            }
        }

        Ok(seen.into_iter().cloned().collect())
    }

    fn search<'s>(
        self,
        starts: impl IntoIterator<Item = &'s G::Vertex>,
        order: SearchOrder,
    ) -> Result<Search<'g, G>, UndefinedState>
    where
        G::Vertex: 's,
    {
        let starts = self.resolve_starts(starts)?;
        Ok(Search {
            seen: starts.iter().copied().collect(),
            frontier: starts.into(),
            pending: VecDeque::new(),
            traversal: self,
            order,
        })
    }

    /// Looks up the graph's own copies of `starts`, ordered and without duplicates.
    fn resolve_starts<'s>(
        &self,
        starts: impl IntoIterator<Item = &'s G::Vertex>,
    ) -> Result<Vec<&'g G::Vertex>, UndefinedState>
    where
        G::Vertex: 's,
    {
        let graph: &'g G = self.graph;
        let mut resolved = starts
            .into_iter()
            .map(|start| {
                graph
                    .vertex(start)
                    .ok_or_else(|| UndefinedState::new("traversal start", start))
            })
            .collect::<Result<Vec<_>, _>>()?;
        resolved.sort_by(|a, b| (self.vertex_order)(a, b));
        resolved.dedup();
        Ok(resolved)
    }

    /// The outgoing edges of `vertex`, in traversal order. Unfiltered.
    fn ordered_successors(
        &self,
        vertex: &'g G::Vertex,
    ) -> Vec<Path<&'g G::Vertex, &'g G::Edge>> {
        let graph: &'g G = self.graph;
        let mut successors = graph.successors(vertex).unwrap_or_default();
        successors.sort_by(|(e1, v1), (e2, v2)| {
            (self.edge_order)(e1, e2).then_with(|| (self.vertex_order)(v1, v2))
        });
        successors
            .into_iter()
            .map(|(edge, end)| Path::new(vertex, edge, end))
            .collect()
    }
}

/// Lazy iterator over single edges, created by [`Traversal::paths`] and [`Traversal::all_paths`].
pub struct Paths<'g, G: Graph> {
    traversal: Traversal<'g, G>,
    starts: VecDeque<&'g G::Vertex>,
    pending: VecDeque<Path<&'g G::Vertex, &'g G::Edge>>,
}

impl<'g, G: Graph> Iterator for Paths<'g, G> {
    type Item = Path<&'g G::Vertex, &'g G::Edge>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(path) = self.pending.pop_front() {
                return Some(path);
            }

            let start = self.starts.pop_front()?;
            let traversal = &self.traversal;
            let paths: Vec<_> = traversal
                .ordered_successors(start)
                .into_iter()
                .filter(|path| (traversal.filter)(path))
                .collect();
            self.pending.extend(paths);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchOrder {
    BreadthFirst,
    DepthFirst,
}

/// Lazy graph search, created by [`Traversal::breadth_first`] and [`Traversal::depth_first`].
///
/// Vertices are marked as seen when they are discovered. The filter decides which discovery
/// edges are yielded, but every discovered vertex is explored.
pub struct Search<'g, G: Graph> {
    traversal: Traversal<'g, G>,
    order: SearchOrder,
    seen: BTreeSet<&'g G::Vertex>,
    frontier: VecDeque<&'g G::Vertex>,
    pending: VecDeque<Path<&'g G::Vertex, &'g G::Edge>>,
}

impl<'g, G: Graph> Iterator for Search<'g, G> {
    type Item = Path<&'g G::Vertex, &'g G::Edge>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(path) = self.pending.pop_front() {
                return Some(path);
            }

            let start = match self.order {
                SearchOrder::BreadthFirst => self.frontier.pop_front(),
                SearchOrder::DepthFirst => self.frontier.pop_back(),
            }?;

            for path in self.traversal.ordered_successors(start) {
                if self.seen.insert(path.end) {
                    self.frontier.push_back(path.end);
                    if (self.traversal.filter)(&path) {
                        self.pending.push_back(path);
                    }
                }
            }
        }
    }
}

/// A graph in which every (vertex, label) pair has at most one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleGraph<V, E> {
    vertices: BTreeMap<V, BTreeMap<E, V>>,
}

impl<V: Ord + Clone + Debug, E: Ord + Clone + Debug> SimpleGraph<V, E> {
    pub fn builder() -> SimpleGraphBuilder<V, E> {
        SimpleGraphBuilder::default()
    }

    /// The destination of the `edge`-labelled edge leaving `vertex`, if any.
    pub fn successor(&self, vertex: &V, edge: &E) -> Option<&V> {
        self.vertices.get(vertex)?.get(edge)
    }

    pub fn edges(&self, vertex: &V) -> Option<&BTreeMap<E, V>> {
        self.vertices.get(vertex)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl<V: Ord + Clone + Debug, E: Ord + Clone + Debug> Graph for SimpleGraph<V, E> {
    type Vertex = V;
    type Edge = E;

    fn vertex(&self, vertex: &V) -> Option<&V> {
        self.vertices.get_key_value(vertex).map(|(v, _)| v)
    }

    fn vertices(&self) -> Vec<&V> {
        self.vertices.keys().collect()
    }

    fn successors(&self, vertex: &V) -> Option<Vec<(&E, &V)>> {
        self.vertices.get(vertex).map(|edges| edges.iter().collect())
    }
}

#[derive(Debug, Clone)]
pub struct SimpleGraphBuilder<V, E> {
    vertices: BTreeMap<V, BTreeMap<E, V>>,
}

impl<V, E> Default for SimpleGraphBuilder<V, E> {
    fn default() -> Self {
        Self {
            vertices: BTreeMap::new(),
        }
    }
}

impl<V: Ord + Clone + Debug, E: Ord + Clone + Debug> SimpleGraphBuilder<V, E> {
    /// Adds `vertex` without any outgoing edges, if it is not present yet.
    pub fn vertex(&mut self, vertex: V) -> &mut Self {
        self.vertices.entry(vertex).or_default();
        self
    }

    /// Adds the edge `start -edge-> end`, replacing any previous `edge`-labelled edge of `start`.
    /// Both vertices are added to the graph.
    pub fn path(&mut self, start: V, edge: E, end: V) -> &mut Self {
        self.vertex(end.clone());
        self.vertices.entry(start).or_default().insert(edge, end);
        self
    }

    /// Sets all outgoing edges of `origin` at once.
    ///
    /// Destinations are not added to the graph: [`SimpleGraphBuilder::build`] will reject the graph
    /// unless they are added separately.
    pub fn edges(&mut self, origin: V, edges: BTreeMap<E, V>) -> &mut Self {
        self.vertices.insert(origin, edges);
        self
    }

    pub fn contains(&self, vertex: &V) -> bool {
        self.vertices.contains_key(vertex)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn build(&self) -> Result<SimpleGraph<V, E>, UndefinedState> {
        for (start, edges) in &self.vertices {
            for (edge, end) in edges {
                if !self.vertices.contains_key(end) {
                    return Err(UndefinedState::new(
                        "edge end",
                        &Path::new(start, edge, end),
                    ));
                }
            }
        }

        Ok(SimpleGraph {
            vertices: self.vertices.clone(),
        })
    }
}

/// A graph in which every (vertex, label) pair can have any number of destinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonDeterministicGraph<V, E> {
    vertices: BTreeMap<V, BTreeMap<E, BTreeSet<V>>>,
}

impl<V: Ord + Clone + Debug, E: Ord + Clone + Debug> NonDeterministicGraph<V, E> {
    pub fn builder() -> NonDeterministicGraphBuilder<V, E> {
        NonDeterministicGraphBuilder::default()
    }

    /// The destinations of the `edge`-labelled edges leaving `vertex`.
    pub fn destinations(&self, vertex: &V, edge: &E) -> impl Iterator<Item = &V> {
        self.vertices
            .get(vertex)
            .and_then(|edges| edges.get(edge))
            .into_iter()
            .flatten()
    }

    pub fn edges(&self, vertex: &V) -> Option<&BTreeMap<E, BTreeSet<V>>> {
        self.vertices.get(vertex)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

impl<V: Ord + Clone + Debug, E: Ord + Clone + Debug> Graph for NonDeterministicGraph<V, E> {
    type Vertex = V;
    type Edge = E;

    fn vertex(&self, vertex: &V) -> Option<&V> {
        self.vertices.get_key_value(vertex).map(|(v, _)| v)
    }

    fn vertices(&self) -> Vec<&V> {
        self.vertices.keys().collect()
    }

    fn successors(&self, vertex: &V) -> Option<Vec<(&E, &V)>> {
        self.vertices.get(vertex).map(|edges| {
            edges
                .iter()
                .flat_map(|(edge, ends)| ends.iter().map(move |end| (edge, end)))
                .collect()
        })
    }
}

#[derive(Debug, Clone)]
pub struct NonDeterministicGraphBuilder<V, E> {
    vertices: BTreeMap<V, BTreeMap<E, BTreeSet<V>>>,
}

impl<V, E> Default for NonDeterministicGraphBuilder<V, E> {
    fn default() -> Self {
        Self {
            vertices: BTreeMap::new(),
        }
    }
}

impl<V: Ord + Clone + Debug, E: Ord + Clone + Debug> NonDeterministicGraphBuilder<V, E> {
    /// Adds `vertex` without any outgoing edges, if it is not present yet.
    pub fn vertex(&mut self, vertex: V) -> &mut Self {
        self.vertices.entry(vertex).or_default();
        self
    }

    /// Adds the edge `start -edge-> end`. Both vertices are added to the graph.
    pub fn path(&mut self, start: V, edge: E, end: V) -> &mut Self {
        self.vertex(end.clone());
        self.vertices
            .entry(start)
            .or_default()
            .entry(edge)
            .or_default()
            .insert(end);
        self
    }

    /// Adds edges `start -edge-> end` for every `end` in `ends`.
    ///
    /// Destinations are not added to the graph: [`NonDeterministicGraphBuilder::build`] will
    /// reject the graph unless they are added separately.
    pub fn edges(&mut self, start: V, edge: E, ends: impl IntoIterator<Item = V>) -> &mut Self {
        self.vertices
            .entry(start)
            .or_default()
            .entry(edge)
            .or_default()
            .extend(ends);
        self
    }

    pub fn contains(&self, vertex: &V) -> bool {
        self.vertices.contains_key(vertex)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn build(&self) -> Result<NonDeterministicGraph<V, E>, UndefinedState> {
        for (start, edges) in &self.vertices {
            for (edge, ends) in edges {
                if let Some(end) = ends.iter().find(|end| !self.vertices.contains_key(end)) {
                    return Err(UndefinedState::new(
                        "transition end",
                        &Path::new(start, edge, end),
                    ));
                }
            }
        }

        Ok(NonDeterministicGraph {
            vertices: self.vertices.clone(),
        })
    }
}
