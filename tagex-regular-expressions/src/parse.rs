use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::{Dfa, Nfa, NfaBuilder, ParseError};

/// Name of the tag that spans the whole match of a pattern.
pub const MAIN_GROUP: &str = "0";

/// The automaton a pattern compiles to: numbered states, `char` symbols, named tags.
pub type PatternNfa = Nfa<usize, char, String>;

/// [`PatternNfa`] after subset construction.
pub type PatternDfa = Dfa<BTreeSet<usize>, char, String>;

/// A malformed pattern.
///
/// Renders as a diagnostic pointing at the offending character:
///
/// ```text
/// syntax error:2: unmatched opening parenthesis
/// ab(c
///   ^
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub pattern: String,
    /// Index of the offending `char` in `pattern`.
    pub column: usize,
    pub kind: SyntaxErrorKind,
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "syntax error:{}: {}", self.column, self.kind)?;
        writeln!(f, "{}", self.pattern)?;
        write!(f, "{:>width$}", "^", width = self.column + 1)
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    #[error("empty pattern")]
    EmptyPattern,
    #[error("dangling backslash")]
    DanglingBackslash,
    #[error("unmatched opening parenthesis")]
    UnmatchedParenthesis,
    #[error("unmatched opening square bracket")]
    UnmatchedSquareBracket,
    #[error("unmatched opening capture group")]
    UnmatchedCaptureGroup,
    #[error("invalid capture group name, must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidCaptureGroupName,
    #[error("invalid capture group syntax, expected (?<name>...) or (?'name'...)")]
    InvalidCaptureGroupSyntax,
    #[error(
        "invalid character class range, start {start:?} (code {}) must be less than end {end:?} (code {})",
        code(.start),
        code(.end)
    )]
    InvalidCharacterClassRange { start: char, end: char },
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("expected {expected}, got {}", describe(.actual))]
    Unexpected {
        expected: &'static str,
        actual: Option<char>,
    },
}

fn code(c: &char) -> u32 {
    *c as u32
}

fn describe(actual: &Option<char>) -> String {
    match actual {
        Some(c) => format!("{c:?}"),
        None => "end of pattern".to_string(),
    }
}

/// Compiles `pattern` into a tagged NFA.
///
/// The whole pattern is tagged [`MAIN_GROUP`]. Anonymous groups are tagged `"1"`, `"2"`, ... in
/// order of their opening parenthesis; named groups are tagged with their name, but still take up
/// a number.
///
/// ```
/// # use tagex_regular_expressions::parse_regex;
/// let nfa = parse_regex("(a)(?<b>b)(c)").unwrap();
/// let names: Vec<_> = nfa.tags().iter().map(|tag| tag.name.as_str()).collect();
/// assert_eq!(names, ["1", "b", "3", "0"]);
/// ```
pub fn parse_regex(pattern: &str) -> Result<PatternNfa, ParseError> {
    Parser::new(pattern).parse()
}

struct Parser<'p> {
    pattern: &'p str,
    chars: Vec<char>,
    index: usize,
    group_index: usize,
    nfa: NfaBuilder<usize, char, String>,
}

impl<'p> Parser<'p> {
    fn new(pattern: &'p str) -> Self {
        Self {
            pattern,
            chars: pattern.chars().collect(),
            index: 0,
            group_index: 1,
            nfa: NfaBuilder::new(0),
        }
    }

    fn parse(mut self) -> Result<PatternNfa, ParseError> {
        if self.chars.is_empty() {
            return Err(self.error(0, SyntaxErrorKind::EmptyPattern).into());
        }

        // the main group gets its own entry state, so loops never re-enter its start
        let entry = self.new_state();
        self.transition(0, None, entry);
        let end = self.expression(entry)?;
        if let Some(c) = self.peek(0) {
            return Err(self
                .error(
                    self.index,
                    SyntaxErrorKind::Unexpected {
                        expected: "end of pattern",
                        actual: Some(c),
                    },
                )
                .into());
        }
        self.nfa.tag(MAIN_GROUP.to_string(), 0, end);

        let nfa = self.nfa.build()?;
        log::debug!(
            "parsed {:?} into {} states and {} tags",
            self.pattern,
            self.nfa.state_count(),
            self.nfa.tag_count()
        );
        Ok(nfa)
    }

    fn error(&self, column: usize, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError {
            pattern: self.pattern.to_string(),
            column,
            kind,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.index += 1;
        Some(c)
    }

    fn accept(&mut self, expected: char) -> bool {
        if self.peek(0) == Some(expected) {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// States are numbered in order of creation.
    fn new_state(&mut self) -> usize {
        let state = self.nfa.state_count();
        self.nfa.state(state);
        state
    }

    fn transition(&mut self, start: usize, symbol: Option<char>, end: usize) {
        self.nfa.transition(start, symbol, end);
    }

    /// `sequence ('|' sequence)*`
    fn expression(&mut self, start: usize) -> Result<usize, SyntaxError> {
        let mut ends = vec![self.sequence(start)?];
        while self.accept('|') {
            ends.push(self.sequence(start)?);
        }

        if let [end] = ends[..] {
            return Ok(end);
        }

        let end = self.new_state();
        for branch in ends {
            self.transition(branch, None, end);
        }
        Ok(end)
    }

    /// `quantifier*`
    fn sequence(&mut self, start: usize) -> Result<usize, SyntaxError> {
        let mut end = start;
        while let Some(c) = self.peek(0) {
            if matches!(c, '|' | ')' | ']') {
                break;
            }
            end = self.quantifier(end)?;
        }
        Ok(end)
    }

    /// `atom ('?' | '+' | '*')?`
    fn quantifier(&mut self, start: usize) -> Result<usize, SyntaxError> {
        let end = self.atom(start)?;

        match self.peek(0) {
            Some('?') => {
                self.bump();
                self.transition(start, None, end);
                Ok(end)
            }
            Some('+') => {
                self.bump();
                self.transition(end, None, start);
                Ok(end)
            }
            Some('*') => {
                self.bump();
                let skip = self.new_state();
                self.transition(end, None, start);
                self.transition(start, None, skip);
                self.transition(end, None, skip);
                Ok(skip)
            }
            Some('{') => Err(self.error(
                self.index,
                SyntaxErrorKind::NotImplemented("bounded repetition `{n}` and `{n,m}`"),
            )),
            _ => Ok(end),
        }
    }

    /// A literal, an escape, a character class or a capture group.
    fn atom(&mut self, start: usize) -> Result<usize, SyntaxError> {
        let Some(c) = self.peek(0) else {
            return Ok(start);
        };

        match c {
            '(' => {
                let open = self.index;
                self.bump();
                let end = self.capture_group(start, open)?;
                if !self.accept(')') {
                    return Err(self.error(open, SyntaxErrorKind::UnmatchedParenthesis));
                }
                Ok(end)
            }
            '[' => self.character_class(start),
            '^' | '$' => Err(self.error(
                self.index,
                SyntaxErrorKind::NotImplemented("anchors `^` and `$`"),
            )),
            '.' => Err(self.error(
                self.index,
                SyntaxErrorKind::NotImplemented("wildcard `.`"),
            )),
            '{' => Err(self.error(
                self.index,
                SyntaxErrorKind::NotImplemented("bounded repetition `{n}` and `{n,m}`"),
            )),
            '?' | '+' | '*' => Err(self.error(
                self.index,
                SyntaxErrorKind::Unexpected {
                    expected: "a character, class or group to repeat",
                    actual: Some(c),
                },
            )),
            _ => {
                let end = self.new_state();
                self.symbol(start, end)?;
                Ok(end)
            }
        }
    }

    /// Consumes one literal or escape and adds its edges from `start` to `end`.
    /// Returns the character if it stands for exactly one.
    fn symbol(&mut self, start: usize, end: usize) -> Result<Option<char>, SyntaxError> {
        let backslash = self.index;
        let c = match self.bump() {
            None => return Ok(None),
            Some('\\') => match self.bump() {
                None => return Err(self.error(backslash, SyntaxErrorKind::DanglingBackslash)),
                Some('0') => '\0',
                Some('a') => '\x07',
                Some('e') => '\x1b',
                Some('f') => '\x0c',
                Some('n') => '\n',
                Some('r') => '\r',
                Some('t') => '\t',
                Some('R') => {
                    self.transition(start, Some('\r'), end);
                    self.transition(start, Some('\n'), end);
                    let crlf = self.new_state();
                    self.transition(start, Some('\r'), crlf);
                    self.transition(crlf, Some('\n'), end);
                    return Ok(None);
                }
                Some('d') => {
                    self.fan(start, end, '0'..='9');
                    return Ok(None);
                }
                Some('w') => {
                    self.fan(start, end, ['_']);
                    self.fan(start, end, 'a'..='z');
                    self.fan(start, end, 'A'..='Z');
                    return Ok(None);
                }
                Some('s') => {
                    self.fan(start, end, [' ', '\t', '\r', '\n', '\x0b', '\x0c']);
                    return Ok(None);
                }
                Some(escaped) => escaped,
            },
            Some(c) => c,
        };

        self.transition(start, Some(c), end);
        Ok(Some(c))
    }

    fn fan(&mut self, start: usize, end: usize, symbols: impl IntoIterator<Item = char>) {
        for symbol in symbols {
            self.transition(start, Some(symbol), end);
        }
    }

    /// `'[' member* ']'`, all members sharing one start and one end state.
    fn character_class(&mut self, start: usize) -> Result<usize, SyntaxError> {
        let open = self.index;
        self.bump();
        let end = self.new_state();

        while let Some(c) = self.peek(0) {
            if c == ']' {
                break;
            }

            let first_at = self.index;
            let first = self.symbol(start, end)?;

            let is_range = self.peek(0) == Some('-') && !matches!(self.peek(1), None | Some(']'));
            if let (Some(first), true) = (first, is_range) {
                self.bump();
                let last_at = self.index;
                let Some(last) = self.symbol(start, end)? else {
                    return Err(self.error(
                        last_at,
                        SyntaxErrorKind::Unexpected {
                            expected: "a single character to end the range",
                            actual: self.chars.get(last_at).copied(),
                        },
                    ));
                };

                if first >= last {
                    return Err(self.error(
                        first_at,
                        SyntaxErrorKind::InvalidCharacterClassRange {
                            start: first,
                            end: last,
                        },
                    ));
                }
                self.fan(start, end, first..=last);
            }
        }

        if !self.accept(']') {
            return Err(self.error(open, SyntaxErrorKind::UnmatchedSquareBracket));
        }
        Ok(end)
    }

    /// The inside of `( ... )`, right after the opening parenthesis at `open`.
    fn capture_group(&mut self, start: usize, open: usize) -> Result<usize, SyntaxError> {
        let name = if self.accept('?') {
            self.group_name(open)?
        } else {
            self.group_index.to_string()
        };
        self.group_index += 1;

        let group_start = self.new_state();
        self.transition(start, None, group_start);
        let group_end = self.expression(group_start)?;
        let end = self.new_state();
        self.transition(group_end, None, end);

        self.nfa.tag(name, start, group_end);
        Ok(end)
    }

    /// `<name>` or `'name'`, right after `(?`.
    fn group_name(&mut self, open: usize) -> Result<String, SyntaxError> {
        let delimiter_at = self.index;
        let close = match self.bump() {
            Some('<') => '>',
            Some('\'') => '\'',
            _ => {
                return Err(self.error(delimiter_at, SyntaxErrorKind::InvalidCaptureGroupSyntax))
            }
        };

        let name_start = self.index;
        match self.bump() {
            None => return Err(self.error(open, SyntaxErrorKind::UnmatchedCaptureGroup)),
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
            Some(_) => {
                return Err(self.error(name_start, SyntaxErrorKind::InvalidCaptureGroupName))
            }
        }

        while self.peek(0) != Some(close) {
            let at = self.index;
            match self.bump() {
                None | Some(')') => {
                    return Err(self.error(open, SyntaxErrorKind::UnmatchedCaptureGroup))
                }
                Some(c) if c == '_' || c.is_ascii_alphanumeric() => {}
                Some(_) => return Err(self.error(at, SyntaxErrorKind::InvalidCaptureGroupName)),
            }
        }

        let name = self.chars[name_start..self.index].iter().collect();
        self.bump();
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::Tag;
    use pretty_assertions::assert_eq;

    fn transitions(nfa: &PatternNfa) -> Vec<(usize, Option<char>, usize)> {
        nfa.graph()
            .traverse()
            .all_paths()
            .map(|p| (*p.start, *p.edge, *p.end))
            .collect()
    }

    fn symbols(nfa: &PatternNfa) -> Vec<char> {
        transitions(nfa)
            .into_iter()
            .filter_map(|(_, symbol, _)| symbol)
            .collect()
    }

    fn tags(nfa: &PatternNfa) -> Vec<(&str, usize, usize)> {
        nfa.tags()
            .iter()
            .map(|Tag { name, start, end }| (name.as_str(), *start, *end))
            .collect()
    }

    fn syntax_error(pattern: &str) -> SyntaxError {
        match parse_regex(pattern) {
            Err(ParseError::Syntax(e)) => e,
            other => panic!("expected a syntax error for {pattern:?}, got {other:?}"),
        }
    }

    #[test]
    fn sequence() {
        let nfa = parse_regex("abc").unwrap();
        assert_eq!(
            transitions(&nfa),
            [
                (0, None, 1),
                (1, Some('a'), 2),
                (2, Some('b'), 3),
                (3, Some('c'), 4),
            ]
        );
        assert_eq!(tags(&nfa), [(MAIN_GROUP, 0, 4)]);
    }

    #[test]
    fn alternation() {
        let nfa = parse_regex("ab|cd|ef").unwrap();
        assert_eq!(
            transitions(&nfa),
            [
                (0, None, 1),
                (1, Some('a'), 2),
                (1, Some('c'), 4),
                (1, Some('e'), 6),
                (2, Some('b'), 3),
                (3, None, 8),
                (4, Some('d'), 5),
                (5, None, 8),
                (6, Some('f'), 7),
                (7, None, 8),
            ]
        );
        assert_eq!(tags(&nfa), [(MAIN_GROUP, 0, 8)]);
    }

    #[test]
    fn optional() {
        let nfa = parse_regex("ab?c").unwrap();
        assert_eq!(
            transitions(&nfa),
            [
                (0, None, 1),
                (1, Some('a'), 2),
                (2, None, 3),
                (2, Some('b'), 3),
                (3, Some('c'), 4),
            ]
        );
    }

    #[test]
    fn one_or_more() {
        let nfa = parse_regex("ab+c").unwrap();
        assert_eq!(
            transitions(&nfa),
            [
                (0, None, 1),
                (1, Some('a'), 2),
                (2, Some('b'), 3),
                (3, None, 2),
                (3, Some('c'), 4),
            ]
        );
    }

    #[test]
    fn zero_or_more() {
        let nfa = parse_regex("ab*c").unwrap();
        assert_eq!(
            transitions(&nfa),
            [
                (0, None, 1),
                (1, Some('a'), 2),
                (2, None, 4),
                (2, Some('b'), 3),
                (3, None, 2),
                (3, None, 4),
                (4, Some('c'), 5),
            ]
        );
        assert_eq!(tags(&nfa), [(MAIN_GROUP, 0, 5)]);
    }

    #[test]
    fn character_class() {
        let nfa = parse_regex("[ab-d]e").unwrap();
        assert_eq!(
            transitions(&nfa),
            [
                (0, None, 1),
                (1, Some('a'), 2),
                (1, Some('b'), 2),
                (1, Some('c'), 2),
                (1, Some('d'), 2),
                (2, Some('e'), 3),
            ]
        );
    }

    #[test]
    fn class_with_literal_dashes() {
        let leading = parse_regex("[-a]").unwrap();
        assert_eq!(
            transitions(&leading),
            [(0, None, 1), (1, Some('-'), 2), (1, Some('a'), 2)]
        );

        let trailing = parse_regex("[a-]").unwrap();
        assert_eq!(
            transitions(&trailing),
            [(0, None, 1), (1, Some('-'), 2), (1, Some('a'), 2)]
        );
    }

    #[test]
    fn class_with_escaped_range_ends() {
        let symbols = symbols(&parse_regex(r"[\0-\a]").unwrap());
        assert_eq!(symbols.len(), 8);
        assert_eq!(symbols.first(), Some(&'\0'));
        assert_eq!(symbols.last(), Some(&'\x07'));
    }

    #[test]
    fn escapes() {
        let nfa = parse_regex(r"\0\a\e\f\n\r\t\\\(\x").unwrap();
        assert_eq!(
            symbols(&nfa),
            ['\0', '\x07', '\x1b', '\x0c', '\n', '\r', '\t', '\\', '(', 'x']
        );
    }

    #[test]
    fn line_break() {
        let nfa = parse_regex(r"\R[\R]").unwrap();
        assert_eq!(
            transitions(&nfa),
            [
                (0, None, 1),
                (1, Some('\n'), 2),
                (1, Some('\r'), 2),
                (1, Some('\r'), 3),
                (2, Some('\n'), 4),
                (2, Some('\r'), 4),
                (2, Some('\r'), 5),
                (3, Some('\n'), 2),
                (5, Some('\n'), 4),
            ]
        );
    }

    #[test]
    fn shorthand_classes() {
        let count = |pattern: &str| symbols(&parse_regex(pattern).unwrap()).len();
        assert_eq!(count(r"\d"), 10);
        assert_eq!(count(r"\w"), 53);
        assert_eq!(count(r"\s"), 6);
        assert_eq!(count(r"[\d\s]"), 16);
    }

    #[test]
    fn groups() {
        let nfa = parse_regex("(a)(?<B>b)(?'c'c)(d)").unwrap();
        assert_eq!(
            transitions(&nfa),
            [
                (0, None, 1),
                (1, None, 2),
                (2, Some('a'), 3),
                (3, None, 4),
                (4, None, 5),
                (5, Some('b'), 6),
                (6, None, 7),
                (7, None, 8),
                (8, Some('c'), 9),
                (9, None, 10),
                (10, None, 11),
                (11, Some('d'), 12),
                (12, None, 13),
            ]
        );
        assert_eq!(
            tags(&nfa),
            [
                ("1", 1, 3),
                ("B", 4, 6),
                ("c", 7, 9),
                ("4", 10, 12),
                (MAIN_GROUP, 0, 13),
            ]
        );
    }

    #[test]
    fn nested_groups() {
        let nfa = parse_regex("((a)|b)").unwrap();
        assert_eq!(
            tags(&nfa),
            [("2", 2, 4), ("1", 1, 7), (MAIN_GROUP, 0, 8)]
        );
    }

    #[test]
    fn empty_pattern() {
        assert_eq!(syntax_error("").kind, SyntaxErrorKind::EmptyPattern);
    }

    #[test]
    fn dangling_backslash() {
        let error = syntax_error(r"ab\");
        assert_eq!(error.kind, SyntaxErrorKind::DanglingBackslash);
        assert_eq!(error.column, 2);
        assert_eq!(error.to_string(), "syntax error:2: dangling backslash\nab\\\n  ^");
    }

    #[test]
    fn unmatched_brackets() {
        let error = syntax_error("a(bc");
        assert_eq!(error.kind, SyntaxErrorKind::UnmatchedParenthesis);
        assert_eq!(error.column, 1);

        let error = syntax_error("a[bc");
        assert_eq!(error.kind, SyntaxErrorKind::UnmatchedSquareBracket);
        assert_eq!(error.column, 1);

        let error = syntax_error("a(b]");
        assert_eq!(error.kind, SyntaxErrorKind::UnmatchedParenthesis);
    }

    #[test]
    fn stray_closing_brackets() {
        let error = syntax_error("ab)");
        assert_eq!(
            error.kind,
            SyntaxErrorKind::Unexpected {
                expected: "end of pattern",
                actual: Some(')'),
            }
        );
        assert_eq!(error.column, 2);
        assert!(matches!(
            syntax_error("]").kind,
            SyntaxErrorKind::Unexpected { .. }
        ));
    }

    #[test]
    fn capture_group_names() {
        assert_eq!(
            syntax_error("(?<1a>x)").kind,
            SyntaxErrorKind::InvalidCaptureGroupName
        );
        assert_eq!(
            syntax_error("(?<a-b>x)").kind,
            SyntaxErrorKind::InvalidCaptureGroupName
        );
        assert_eq!(
            syntax_error("(?<>x)").kind,
            SyntaxErrorKind::InvalidCaptureGroupName
        );
        assert_eq!(
            syntax_error("(?<abc").kind,
            SyntaxErrorKind::UnmatchedCaptureGroup
        );
        assert_eq!(
            syntax_error("(?'abc)").kind,
            SyntaxErrorKind::UnmatchedCaptureGroup
        );
        assert_eq!(
            syntax_error("(?abc)").kind,
            SyntaxErrorKind::InvalidCaptureGroupSyntax
        );
        assert_eq!(
            syntax_error("(?").kind,
            SyntaxErrorKind::InvalidCaptureGroupSyntax
        );
    }

    #[test]
    fn invalid_ranges() {
        let error = syntax_error("[a-ez-a]");
        assert_eq!(
            error.kind,
            SyntaxErrorKind::InvalidCharacterClassRange {
                start: 'z',
                end: 'a'
            }
        );
        assert_eq!(error.column, 4);
        assert!(matches!(
            syntax_error("[a-a]").kind,
            SyntaxErrorKind::InvalidCharacterClassRange { .. }
        ));
    }

    #[test]
    fn unsupported() {
        for pattern in ["a{2}", "a{2,3}", "{2}", "a|{2}", "({2,3})", "^a", "a$", "a.c"] {
            assert!(
                matches!(syntax_error(pattern).kind, SyntaxErrorKind::NotImplemented(_)),
                "{pattern}"
            );
        }
    }

    #[test]
    fn nothing_to_repeat() {
        assert!(matches!(
            syntax_error("*a").kind,
            SyntaxErrorKind::Unexpected {
                actual: Some('*'),
                ..
            }
        ));
        assert!(matches!(
            syntax_error("a**").kind,
            SyntaxErrorKind::Unexpected { .. }
        ));
    }
}
