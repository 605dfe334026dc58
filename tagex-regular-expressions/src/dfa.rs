use std::cmp::max;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::iter::FusedIterator;
use std::ops::Range;

use crate::graph::{Graph, SimpleGraph, SimpleGraphBuilder};
use crate::tape::Tape;
use crate::UndefinedState;

/// The half-open range `start..end` of symbol positions that a tag matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether `other` lies entirely within this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// A deterministic finite automaton over symbols `A`, with states `D` and tags named `T`.
///
/// Every state records which tags start and which tags end in it. There is no explicit dead
/// state: a missing transition is dead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa<D, A, T> {
    initial: D,
    graph: SimpleGraph<D, A>,
    starting: BTreeMap<D, BTreeSet<T>>,
    ending: BTreeMap<D, BTreeSet<T>>,
}

impl<D, A, T> Dfa<D, A, T>
where
    D: Ord + Clone + Debug,
    A: Ord + Clone + Debug,
    T: Ord + Clone + Debug,
{
    pub fn builder(initial: D) -> DfaBuilder<D, A, T> {
        DfaBuilder::new(initial)
    }

    pub fn initial(&self) -> &D {
        &self.initial
    }

    pub fn graph(&self) -> &SimpleGraph<D, A> {
        &self.graph
    }

    pub fn states(&self) -> impl Iterator<Item = &D> {
        self.graph.vertices().into_iter()
    }

    /// The state reached from `state` on `symbol`, or `None` if that transition is dead.
    pub fn transition(&self, state: &D, symbol: &A) -> Option<&D> {
        self.graph.successor(state, symbol)
    }

    pub fn tags_starting(&self, state: &D) -> impl Iterator<Item = &T> {
        self.starting.get(state).into_iter().flatten()
    }

    pub fn tags_ending(&self, state: &D) -> impl Iterator<Item = &T> {
        self.ending.get(state).into_iter().flatten()
    }

    fn ends(&self, state: &D, tag: &T) -> bool {
        self.ending
            .get(state)
            .is_some_and(|tags| tags.contains(tag))
    }

    /// Runs the automaton from the tape's current position until a transition is dead or the
    /// tape runs out, and returns the span of every tag that was closed.
    ///
    /// Tags are only opened and closed when the state changes. Leaving a state opens the tags
    /// that start in it at the position of the symbol just read; leaving a state closes the open
    /// tags that end in it, up to but excluding that symbol. Self-loops leave open tags untouched.
    ///
    /// Returns `None` if no tag was closed. The tape is left just past the symbol that ended the
    /// run.
    pub fn evaluate(&self, tape: &mut Tape<A>) -> Option<BTreeMap<T, Span>> {
        let mut result = BTreeMap::new();
        let mut open: BTreeMap<&T, usize> = BTreeMap::new();
        let mut current = &self.initial;

        while !tape.is_done() {
            let next = tape
                .next_symbol()
                .and_then(|symbol| self.transition(current, symbol));
            // position of the symbol just read
            let position = tape.index() - 1;

            if next == Some(current) {
                continue;
            }

            for (&tag, &start) in &open {
                if self.ends(current, tag) {
                    log::trace!("tag {tag:?} closed at {start}..{position}");
                    result.insert(tag.clone(), Span::new(start, position));
                }
            }

            let Some(next) = next else {
                break;
            };

            for tag in self.tags_starting(current) {
                log::trace!("tag {tag:?} opened at {position}");
                open.insert(tag, position);
            }

            current = next;
        }

        (!result.is_empty()).then_some(result)
    }

    /// Scans the whole tape, restarting the automaton after every run.
    ///
    /// A new run starts on the symbol that ended the previous one, but always at least one
    /// position after where the previous run started. Runs that close no tags are skipped.
    ///
    /// The last symbol of the tape can never be part of a match, so callers usually append a
    /// sentinel symbol that has no transitions.
    pub fn evaluate_all(&self, tape: Tape<A>) -> Evaluations<'_, D, A, T> {
        Evaluations { dfa: self, tape }
    }

    /// [`Dfa::evaluate`] on a tape holding `symbols`.
    pub fn evaluate_symbols(&self, symbols: impl IntoIterator<Item = A>) -> Option<BTreeMap<T, Span>> {
        self.evaluate(&mut Tape::new(symbols))
    }

    /// [`Dfa::evaluate_all`] on a tape holding `symbols`.
    pub fn evaluate_all_symbols(
        &self,
        symbols: impl IntoIterator<Item = A>,
    ) -> Evaluations<'_, D, A, T> {
        self.evaluate_all(Tape::new(symbols))
    }
}

/// Lazy iterator over the results of scanning a tape. Created by [`Dfa::evaluate_all`].
#[derive(Debug, Clone)]
pub struct Evaluations<'d, D, A, T> {
    dfa: &'d Dfa<D, A, T>,
    tape: Tape<A>,
}

impl<'d, D, A, T> Iterator for Evaluations<'d, D, A, T>
where
    D: Ord + Clone + Debug,
    A: Ord + Clone + Debug,
    T: Ord + Clone + Debug,
{
    type Item = BTreeMap<T, Span>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.tape.is_done() {
            let attempt = self.tape.index();
            let result = self.dfa.evaluate(&mut self.tape);
            let restart = max(self.tape.index() - 1, attempt + 1);
            log::trace!("run from {attempt} ended, restarting at {restart}");
            self.tape.reset(restart);

            if result.is_some() {
                return result;
            }
        }

        None
    }
}

impl<'d, D, A, T> FusedIterator for Evaluations<'d, D, A, T>
where
    D: Ord + Clone + Debug,
    A: Ord + Clone + Debug,
    T: Ord + Clone + Debug,
{
}

/// Collects states, transitions and tags, and checks them once in [`DfaBuilder::build`].
#[derive(Debug, Clone)]
pub struct DfaBuilder<D, A, T> {
    initial: D,
    graph: SimpleGraphBuilder<D, A>,
    starting: BTreeMap<D, BTreeSet<T>>,
    ending: BTreeMap<D, BTreeSet<T>>,
}

impl<D, A, T> DfaBuilder<D, A, T>
where
    D: Ord + Clone + Debug,
    A: Ord + Clone + Debug,
    T: Ord + Clone + Debug,
{
    pub fn new(initial: D) -> Self {
        let mut graph = SimpleGraphBuilder::default();
        graph.vertex(initial.clone());
        Self {
            initial,
            graph,
            starting: BTreeMap::new(),
            ending: BTreeMap::new(),
        }
    }

    pub fn state(&mut self, state: D) -> &mut Self {
        self.graph.vertex(state);
        self
    }

    /// Adds a transition from `start` to `end` on `symbol`, replacing any previous one.
    pub fn transition(&mut self, start: D, symbol: A, end: D) -> &mut Self {
        self.graph.path(start, symbol, end);
        self
    }

    pub fn tag_start(&mut self, state: D, tag: T) -> &mut Self {
        self.starting.entry(state).or_default().insert(tag);
        self
    }

    pub fn tag_end(&mut self, state: D, tag: T) -> &mut Self {
        self.ending.entry(state).or_default().insert(tag);
        self
    }

    /// Marks `name` as starting in `start` and ending in `end`.
    pub fn tag(&mut self, name: T, start: D, end: D) -> &mut Self {
        self.tag_start(start, name.clone());
        self.tag_end(end, name)
    }

    pub fn build(&self) -> Result<Dfa<D, A, T>, UndefinedState> {
        let graph = self.graph.build()?;
        if !graph.contains(&self.initial) {
            return Err(UndefinedState::new("initial state", &self.initial));
        }
        if let Some(state) = self.starting.keys().find(|s| !graph.contains(s)) {
            return Err(UndefinedState::new("tag start", state));
        }
        if let Some(state) = self.ending.keys().find(|s| !graph.contains(s)) {
            return Err(UndefinedState::new("tag end", state));
        }

        Ok(Dfa {
            initial: self.initial.clone(),
            graph,
            starting: self.starting.clone(),
            ending: self.ending.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// `ab*c`, with `M` around the whole match and `B` around the run of `b`s.
    fn abc() -> Dfa<usize, char, char> {
        let mut builder = Dfa::builder(0);
        builder
            .transition(0, 'a', 1)
            .transition(1, 'b', 2)
            .transition(2, 'b', 2)
            .transition(1, 'c', 3)
            .transition(2, 'c', 3)
            .tag('M', 0, 3)
            .tag('B', 1, 2);
        builder.build().unwrap()
    }

    fn spans<const N: usize>(spans: [(char, usize, usize); N]) -> BTreeMap<char, Span> {
        spans
            .into_iter()
            .map(|(tag, start, end)| (tag, Span::new(start, end)))
            .collect()
    }

    #[test]
    fn evaluate_single() {
        let dfa = abc();
        let mut tape = Tape::new("abbc-".chars());
        let result = dfa.evaluate(&mut tape);
        assert_eq!(result, Some(spans([('M', 0, 4), ('B', 1, 3)])));
        assert_eq!(tape.index(), 5);
    }

    #[test]
    fn evaluate_skips_unused_groups() {
        let dfa = abc();
        let result = dfa.evaluate_symbols("ac-".chars());
        assert_eq!(result, Some(spans([('M', 0, 2)])));

        // groups that closed before the run died are reported without the whole match
        let result = dfa.evaluate_symbols("abb-".chars());
        assert_eq!(result, Some(spans([('B', 1, 3)])));
    }

    #[test]
    fn evaluate_rejects() {
        let dfa = abc();
        assert_eq!(dfa.evaluate_symbols("-abc".chars()), None);
        assert_eq!(dfa.evaluate_symbols("".chars()), None);
        // without a trailing symbol the whole match is never closed
        assert_eq!(
            dfa.evaluate_symbols("abc".chars()),
            Some(spans([('B', 1, 2)]))
        );
    }

    #[test]
    fn evaluate_all() {
        let dfa = abc();
        let results: Vec<_> = dfa
            .evaluate_all_symbols("xabbc-ac--abx\0".chars())
            .collect();

        assert_eq!(
            results,
            [
                spans([('M', 1, 5), ('B', 2, 4)]),
                spans([('M', 6, 8)]),
                spans([('B', 11, 12)]),
            ]
        );
    }

    #[test]
    fn evaluate_all_restarts_on_the_ending_symbol() {
        let mut builder: DfaBuilder<usize, char, &str> = Dfa::builder(0);
        builder
            .transition(0, 'a', 1)
            .transition(1, 'a', 1)
            .transition(0, 'b', 2)
            .tag("a", 0, 1)
            .tag("b", 0, 2);
        let dfa = builder.build().unwrap();

        let results: Vec<_> = dfa.evaluate_all_symbols("aab\0".chars()).collect();
        assert_eq!(
            results,
            [
                BTreeMap::from([("a", Span::new(0, 2))]),
                BTreeMap::from([("b", Span::new(2, 3))]),
            ]
        );
    }

    #[test]
    fn undefined_states() {
        let mut builder: DfaBuilder<usize, char, &str> = Dfa::builder(0);
        builder.transition(0, 'a', 1).tag_end(7, "x");
        assert_eq!(builder.build().unwrap_err().role, "tag end");

        builder.state(7).tag_start(8, "y");
        assert_eq!(builder.build().unwrap_err().role, "tag start");
    }
}
