use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::ops::Range;
use std::str::FromStr;

use tagex_regular_expressions::{
    parse_regex, Evaluations, ParseError, PatternDfa, PatternNfa, Span, Tape, MAIN_GROUP,
};

/// Symbol appended to every text before matching, see [`Regex::with_sentinel`].
pub const DEFAULT_SENTINEL: char = '\0';

/// Escapes every character that has a meaning in a pattern, so that the result matches `literal`
/// and nothing else.
///
/// ```
/// # use tagex::{escape, Regex};
/// assert_eq!(escape("a+(b)"), r"a\+\(b\)");
///
/// let regex = Regex::new(&escape("1+1")).unwrap();
/// assert!(regex.is_match("1+1=2"));
/// assert!(!regex.is_match("11"));
/// ```
pub fn escape(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if "\\()[]{}|?+*^$.".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// The span of one capture group inside a [`Match`], as `char` positions `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Group {
    /// Position of the first character of the group.
    pub start: usize,
    /// Position just past the last character of the group.
    pub end: usize,
}

impl Group {
    /// Creates a group spanning `start..end`.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// The positions covered by this group.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<Span> for Group {
    fn from(span: Span) -> Self {
        Self::new(span.start, span.end)
    }
}

/// One match of a [`Regex`] in a text, as `char` positions `start..end`, with the capture groups
/// that took part in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Position of the first character of the match.
    pub start: usize,
    /// Position just past the last character of the match.
    pub end: usize,
    groups: BTreeMap<String, Group>,
}

impl Match {
    /// Creates a match spanning `start..end` without any groups.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            groups: BTreeMap::new(),
        }
    }

    /// Adds a group spanning `start..end`.
    pub fn with_group(mut self, name: impl Into<String>, start: usize, end: usize) -> Self {
        self.groups.insert(name.into(), Group::new(start, end));
        self
    }

    /// The group called `name`, if it took part in this match.
    /// Anonymous groups are called by their number, starting at `"1"`.
    pub fn group(&self, name: &str) -> Option<Group> {
        self.groups.get(name).copied()
    }

    /// All groups that took part in this match, by name.
    pub fn groups(&self) -> &BTreeMap<String, Group> {
        &self.groups
    }

    /// The positions covered by this match.
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// The matched part of `text`, which must be the text this match was found in.
    pub fn text(&self, text: &str) -> String {
        text.chars()
            .skip(self.start)
            .take(self.end.saturating_sub(self.start))
            .collect()
    }

    /// Splits a tag map produced by the automaton into the whole match and its groups.
    ///
    /// Returns `None` if the automaton closed only inner groups. Groups that do not lie within the
    /// whole match are dropped.
    fn from_tags(mut tags: BTreeMap<String, Span>) -> Option<Self> {
        let whole = tags.remove(MAIN_GROUP)?;
        let groups = tags
            .into_iter()
            .filter(|(name, span)| {
                let inside = whole.contains(span) && span.start <= span.end;
                if !inside {
                    log::trace!("dropping group {name} at {span:?}, outside of match {whole:?}");
                }
                inside
            })
            .map(|(name, span)| (name, span.into()))
            .collect();

        Some(Self {
            start: whole.start,
            end: whole.end,
            groups,
        })
    }
}

/// A compiled pattern.
///
/// Patterns support literals, alternation `|`, the quantifiers `?`, `+` and `*`, character
/// classes `[...]` with ranges, the escapes `\0 \a \e \f \n \r \t \R \d \w \s`, and capture groups
/// `(...)`, `(?<name>...)` and `(?'name'...)`.
///
/// ```
/// # use tagex::Regex;
/// let regex = Regex::new("(?<key>[a-z]+)=(?<value>\\d+)").unwrap();
/// let found = regex.find("  width=42;").unwrap();
///
/// assert_eq!(found.range(), 2..10);
/// assert_eq!(found.group("key").unwrap().range(), 2..7);
/// assert_eq!(found.group("value").unwrap().range(), 8..10);
/// ```
#[derive(Debug, Clone)]
pub struct Regex {
    pattern: String,
    sentinel: char,
    nfa: PatternNfa,
    dfa: PatternDfa,
}

impl Regex {
    /// Compiles `pattern`.
    pub fn new(pattern: &str) -> Result<Self, ParseError> {
        Self::with_sentinel(pattern, DEFAULT_SENTINEL)
    }

    /// Compiles `pattern`, using `sentinel` to mark the end of every text.
    ///
    /// A match is only completed by the character after it, so the sentinel is appended to every
    /// text before matching. It should be a character that never occurs in texts.
    pub fn with_sentinel(pattern: &str, sentinel: char) -> Result<Self, ParseError> {
        let nfa = parse_regex(pattern)?;
        let dfa = nfa.to_dfa()?;
        log::debug!(
            "compiled {pattern:?} into {} NFA states and {} DFA states",
            nfa.graph().len(),
            dfa.graph().len()
        );

        Ok(Self {
            pattern: pattern.to_string(),
            sentinel,
            nfa,
            dfa,
        })
    }

    /// The pattern this regex was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The character appended to every text before matching.
    pub fn sentinel(&self) -> char {
        self.sentinel
    }

    /// The non-deterministic automaton the pattern was parsed into.
    pub fn nfa(&self) -> &PatternNfa {
        &self.nfa
    }

    /// The deterministic automaton used for matching.
    pub fn dfa(&self) -> &PatternDfa {
        &self.dfa
    }

    /// The first match in `text`, if any.
    pub fn find(&self, text: &str) -> Option<Match> {
        self.matches(text).next()
    }

    /// Whether `text` contains a match.
    pub fn is_match(&self, text: &str) -> bool {
        self.find(text).is_some()
    }

    /// All non-overlapping matches in `text`, from left to right.
    ///
    /// ```
    /// # use tagex::Regex;
    /// let regex = Regex::new("[0-9]+").unwrap();
    /// let numbers: Vec<_> = regex.matches("1, 22, 333").map(|m| m.range()).collect();
    /// assert_eq!(numbers, [0..1, 3..5, 7..10]);
    /// ```
    pub fn matches(&self, text: &str) -> Matches<'_> {
        let tape = Tape::new(text.chars().chain([self.sentinel]));
        Matches {
            evaluations: self.dfa.evaluate_all(tape),
        }
    }
}

impl FromStr for Regex {
    type Err = ParseError;

    fn from_str(pattern: &str) -> Result<Self, Self::Err> {
        Self::new(pattern)
    }
}

impl Display for Regex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

/// Lazy iterator over the matches of a [`Regex`] in a text. Created by [`Regex::matches`].
#[derive(Debug, Clone)]
pub struct Matches<'r> {
    evaluations: Evaluations<'r, BTreeSet<usize>, char, String>,
}

impl Iterator for Matches<'_> {
    type Item = Match;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let tags = self.evaluations.next()?;
            match Match::from_tags(tags) {
                Some(found) => return Some(found),
                None => log::trace!("skipping a run that closed only inner groups"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_metacharacters() {
        assert_eq!(escape("if"), "if");
        assert_eq!(escape("a|b"), r"a\|b");
        assert_eq!(escape(r"[\]"), r"\[\\\]");
        assert_eq!(escape("{*}"), r"\{\*\}");
    }

    #[test]
    fn groups_outside_the_match_are_dropped() {
        let tags = BTreeMap::from([
            (MAIN_GROUP.to_string(), Span::new(3, 6)),
            ("1".to_string(), Span::new(3, 4)),
            ("2".to_string(), Span::new(5, 8)),
        ]);

        let found = Match::from_tags(tags).unwrap();
        assert_eq!(found, Match::new(3, 6).with_group("1", 3, 4));
    }

    #[test]
    fn inner_groups_alone_are_no_match() {
        let tags = BTreeMap::from([("1".to_string(), Span::new(0, 1))]);
        assert_eq!(Match::from_tags(tags), None);
    }

    #[test]
    fn match_text_counts_chars() {
        let found = Match::new(1, 3);
        assert_eq!(found.text("äöüß"), "öü");
    }
}
