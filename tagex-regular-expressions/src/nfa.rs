use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt::Debug;

use crate::dfa::{Dfa, DfaBuilder};
use crate::graph::{Graph, NonDeterministicGraph, NonDeterministicGraphBuilder};
use crate::UndefinedState;

/// Marks a capture group: the group starts when the automaton leaves `start`
/// and ends when it leaves `end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag<T, S> {
    pub name: T,
    pub start: S,
    pub end: S,
}

impl<T, S> Tag<T, S> {
    pub fn new(name: T, start: S, end: S) -> Self {
        Self { name, start, end }
    }
}

/// A non-deterministic finite automaton over symbols `A`, with states `S` and tags named `T`.
/// Transitions labelled `None` are epsilon transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nfa<S, A, T> {
    initial: S,
    graph: NonDeterministicGraph<S, Option<A>>,
    tags: Vec<Tag<T, S>>,
}

impl<S, A, T> Nfa<S, A, T>
where
    S: Ord + Clone + Debug,
    A: Ord + Clone + Debug,
    T: Ord + Clone + Debug,
{
    /// Checks that the initial state and all tag states exist in `graph`.
    pub fn new(
        initial: S,
        graph: NonDeterministicGraph<S, Option<A>>,
        tags: Vec<Tag<T, S>>,
    ) -> Result<Self, UndefinedState> {
        if !graph.contains(&initial) {
            return Err(UndefinedState::new("initial state", &initial));
        }
        for tag in &tags {
            if !graph.contains(&tag.start) {
                return Err(UndefinedState::new("tag start", &tag.start));
            }
            if !graph.contains(&tag.end) {
                return Err(UndefinedState::new("tag end", &tag.end));
            }
        }

        Ok(Self {
            initial,
            graph,
            tags,
        })
    }

    pub fn builder(initial: S) -> NfaBuilder<S, A, T> {
        NfaBuilder::new(initial)
    }

    pub fn initial(&self) -> &S {
        &self.initial
    }

    pub fn graph(&self) -> &NonDeterministicGraph<S, Option<A>> {
        &self.graph
    }

    pub fn tags(&self) -> &[Tag<T, S>] {
        &self.tags
    }

    pub fn states(&self) -> Vec<&S> {
        self.graph.vertices()
    }

    /// `states` together with every state reachable from them through epsilon transitions only.
    pub fn epsilon_closure<'s>(
        &self,
        states: impl IntoIterator<Item = &'s S>,
    ) -> Result<BTreeSet<S>, UndefinedState>
    where
        S: 's,
    {
        self.graph
            .traverse()
            .filter(|path| path.edge.is_none())
            .closure(states)
    }

    /// Subset construction.
    ///
    /// Each state of the resulting automaton is the epsilon-closed set of states this automaton
    /// can be in. A tag starts (ends) in such a set when the set contains the tag's start (end)
    /// state. Only sets reachable from the closure of the initial state are constructed.
    pub fn to_dfa(&self) -> Result<Dfa<BTreeSet<S>, A, T>, UndefinedState> {
        let initial = self.epsilon_closure([&self.initial])?;
        let mut dfa = DfaBuilder::new(initial.clone());

        let mut queue = VecDeque::from([initial]);
        let mut constructed = BTreeSet::new();

        while let Some(states) = queue.pop_front() {
            if constructed.contains(&states) {
                continue;
            }

            let mut reachable: BTreeMap<&A, BTreeSet<&S>> = BTreeMap::new();
            for path in self
                .graph
                .traverse()
                .filter(|path| path.edge.is_some())
                .paths(&states)?
            {
                if let Some(symbol) = path.edge {
                    reachable.entry(symbol).or_default().insert(path.end);
                }
            }

            for (symbol, ends) in reachable {
                let ends = self.epsilon_closure(ends)?;
                dfa.transition(states.clone(), symbol.clone(), ends.clone());
                queue.push_back(ends);
            }

            for tag in &self.tags {
                if states.contains(&tag.start) {
                    dfa.tag_start(states.clone(), tag.name.clone());
                }
                if states.contains(&tag.end) {
                    dfa.tag_end(states.clone(), tag.name.clone());
                }
            }

            constructed.insert(states);
        }

        log::debug!(
            "subset construction: {} NFA states became {} DFA states",
            self.graph.len(),
            constructed.len()
        );

        dfa.build()
    }
}

/// Collects states, transitions and tags, and checks them once in [`NfaBuilder::build`].
#[derive(Debug, Clone)]
pub struct NfaBuilder<S, A, T> {
    initial: S,
    graph: NonDeterministicGraphBuilder<S, Option<A>>,
    tags: Vec<Tag<T, S>>,
}

impl<S, A, T> NfaBuilder<S, A, T>
where
    S: Ord + Clone + Debug,
    A: Ord + Clone + Debug,
    T: Ord + Clone + Debug,
{
    pub fn new(initial: S) -> Self {
        let mut graph = NonDeterministicGraphBuilder::default();
        graph.vertex(initial.clone());
        Self {
            initial,
            graph,
            tags: Vec::new(),
        }
    }

    pub fn state(&mut self, state: S) -> &mut Self {
        self.graph.vertex(state);
        self
    }

    /// Adds a transition from `start` to `end` on `input`, or on nothing if `input` is `None`.
    pub fn transition(&mut self, start: S, input: Option<A>, end: S) -> &mut Self {
        self.graph.path(start, input, end);
        self
    }

    pub fn tag(&mut self, name: T, start: S, end: S) -> &mut Self {
        self.tags.push(Tag::new(name, start, end));
        self
    }

    pub fn state_count(&self) -> usize {
        self.graph.len()
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    pub fn build(&self) -> Result<Nfa<S, A, T>, UndefinedState> {
        Nfa::new(
            self.initial.clone(),
            self.graph.build()?,
            self.tags.clone(),
        )
    }
}
