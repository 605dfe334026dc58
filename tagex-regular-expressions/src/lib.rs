//! Tagged finite automata, and a compiler from regular expressions with capture groups to them.
//!
//! A pattern is parsed into a non-deterministic automaton ([`Nfa`]) whose capture groups are
//! marked by tags: pairs of a start state and an end state. Subset construction turns it into a
//! deterministic automaton ([`Dfa`]) that remembers, for each of its states, which tags start and
//! which tags end there. Evaluating the [`Dfa`] over a [`Tape`] of symbols yields a [`Span`] per tag.
//!
//! ```
//! # use tagex_regular_expressions::{parse_regex, Tape, MAIN_GROUP};
//! let dfa = parse_regex("a+").unwrap().to_dfa().unwrap();
//! let spans: Vec<_> = dfa
//!     .evaluate_all(Tape::new("-aa-a\0".chars()))
//!     .map(|tags| tags[MAIN_GROUP])
//!     .collect();
//!
//! assert_eq!(spans.len(), 2);
//! assert_eq!((spans[0].start, spans[0].end), (1, 3));
//! assert_eq!((spans[1].start, spans[1].end), (4, 5));
//! ```

use std::fmt::Debug;
use thiserror::Error;

mod dfa;
#[cfg(feature = "dot")]
mod dot;
pub mod graph;
mod nfa;
mod parse;
mod tape;

pub use dfa::{Dfa, DfaBuilder, Evaluations, Span};
pub use nfa::{Nfa, NfaBuilder, Tag};
pub use parse::{parse_regex, PatternDfa, PatternNfa, SyntaxError, SyntaxErrorKind, MAIN_GROUP};
pub use tape::Tape;

/// An automaton or graph refers to a state that was never added to it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("undefined {role}: {state}")]
pub struct UndefinedState {
    /// What the state was used as, e.g. `initial state` or `tag end`.
    pub role: &'static str,
    /// The offending state, formatted with [`Debug`].
    pub state: String,
}

impl UndefinedState {
    pub(crate) fn new(role: &'static str, state: &impl Debug) -> Self {
        Self {
            role,
            state: format!("{state:?}"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Automaton(#[from] UndefinedState),
}
