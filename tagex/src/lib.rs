#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

mod lexer;
mod regex;

pub use lexer::{
    Lexer, LexerError, LexerSettings, Token, Tokens, DEFAULT_EOF, DEFAULT_IGNORE_PATTERN,
    IGNORE_GROUP, IGNORE_SYMBOL,
};
pub use regex::{escape, Group, Match, Matches, Regex, DEFAULT_SENTINEL};

/// Graphs, tagged automata and the pattern parser underlying [`Regex`] and [`Lexer`].
pub use tagex_regular_expressions as automata;
pub use tagex_regular_expressions::{ParseError, SyntaxError, SyntaxErrorKind, MAIN_GROUP};

/// Compile a pattern into a [`Regex`], checking it while compiling.
///
/// An invalid pattern is a compiler error, so the expansion never fails at runtime:
///
/// ```rust
/// use tagex::regex;
///
/// let numbers = regex!("\\d+");
/// let found: Vec<_> = numbers.matches("a1b22").map(|m| m.range()).collect();
/// assert_eq!(found, [1..2, 3..5]);
/// ```
///
/// ```compile_fail
/// let broken = tagex::regex!("[a-");
/// ```
///
/// With the `dot` feature (on by default), the deterministic automaton can be written to a
/// graphviz file while compiling, by adding `#[graph = "path/to/file.dot"]` before the pattern.
pub use tagex_macros::regex;

#[cfg(test)]
mod tests {
    #[ctor::ctor]
    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}
