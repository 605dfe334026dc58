use std::collections::{BTreeMap, BTreeSet};
use std::iter::Enumerate;
use std::str::Lines;

use tagex_regular_expressions::{parse_regex, ParseError, SyntaxError};
use thiserror::Error;

use crate::regex::{escape, Match, Matches, Regex};

/// Tag of the group around the ignore pattern in the composed pattern of a [`Lexer`].
pub const IGNORE_GROUP: &str = "1";
/// Symbol of the token that ends every token stream, unless configured otherwise.
pub const DEFAULT_EOF: &str = "<EOF>";
/// Name of the ignore pattern in errors.
pub const IGNORE_SYMBOL: &str = "<IGNORE>";
/// Pattern of the text skipped between tokens, unless configured otherwise.
pub const DEFAULT_IGNORE_PATTERN: &str = r"\s+";

/// Configuration of a [`Lexer`] beyond its vocabulary and keywords.
///
/// ```
/// # use tagex::LexerSettings;
/// let settings = LexerSettings::default()
///     .with_ignore_pattern("[ \\t]+")
///     .with_eof("$");
/// assert_eq!(settings.eof, "$");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerSettings {
    /// Text matching this pattern separates tokens, but produces none.
    pub ignore_pattern: String,
    /// Symbol of the token emitted after the last line.
    pub eof: String,
}

impl Default for LexerSettings {
    fn default() -> Self {
        Self {
            ignore_pattern: DEFAULT_IGNORE_PATTERN.to_string(),
            eof: DEFAULT_EOF.to_string(),
        }
    }
}

impl LexerSettings {
    /// Replaces the pattern of text that is skipped between tokens.
    pub fn with_ignore_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.ignore_pattern = pattern.into();
        self
    }

    /// Replaces the symbol of the final token.
    pub fn with_eof(mut self, eof: impl Into<String>) -> Self {
        self.eof = eof.into();
        self
    }
}

fn join(symbols: &BTreeSet<String>) -> String {
    symbols
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A [`Lexer`] could not be constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexerError {
    /// These symbols are defined both in the vocabulary and as keywords.
    #[error("symbols defined both as vocabulary and as keyword: {}", join(.0))]
    DuplicateSymbols(BTreeSet<String>),
    /// A vocabulary rule or keyword has an empty name.
    #[error("symbol names cannot be empty")]
    EmptySymbolName,
    /// The vocabulary rule with this name has an empty pattern.
    #[error("pattern of symbol {0} cannot be empty")]
    EmptyVocabularyPattern(String),
    /// These symbols can end on the same text, so tokens could not be attributed to one of them.
    #[error("ambiguous vocabulary, these symbols can match the same text: {}", join(.0))]
    AmbiguousVocabulary(BTreeSet<String>),
    /// The pattern of a vocabulary rule, or the ignore pattern, is malformed.
    #[error("invalid pattern for symbol {symbol}:\n{source}")]
    Syntax {
        /// The rule with the malformed pattern, or [`IGNORE_SYMBOL`].
        symbol: String,
        /// What is wrong with it.
        source: SyntaxError,
    },
    /// The composed pattern could not be compiled.
    #[error(transparent)]
    Regex(#[from] ParseError),
}

/// A piece of text attributed to a symbol by a [`Lexer`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    /// The vocabulary rule or keyword that matched, or the end-of-file symbol.
    pub symbol: String,
    /// The matched text.
    pub text: String,
    /// Line of the token, starting at 0.
    pub row: usize,
    /// Position of the first character of the token in its line, starting at 0.
    pub col: usize,
}

impl Token {
    /// Creates a token.
    pub fn new(
        symbol: impl Into<String>,
        text: impl Into<String>,
        row: usize,
        col: usize,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            text: text.into(),
            row,
            col,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Symbol {
    Ignore,
    Rule(String),
    Keyword(String),
}

/// Splits lines of text into tokens, using one automaton for all symbols.
///
/// A lexer has a vocabulary of named patterns, a set of keywords that are matched literally and
/// an ignore pattern for the text between tokens. When a keyword and a vocabulary rule match the
/// same text, the keyword wins. Construction fails when two vocabulary rules (or a rule and the
/// ignore pattern) can match the same text, so that every token has exactly one symbol.
///
/// ```
/// # use tagex::Lexer;
/// let lexer = Lexer::new([("name", "[a-z]+"), ("int", "\\d+")], ["let"]).unwrap();
/// let symbols: Vec<_> = lexer
///     .tokenize_str("let x1 = 5")
///     .map(|token| token.symbol)
///     .collect();
/// assert_eq!(symbols, ["let", "name", "int", "int", "<EOF>"]);
/// ```
#[derive(Debug, Clone)]
pub struct Lexer {
    regex: Regex,
    settings: LexerSettings,
    vocabulary: BTreeMap<String, String>,
    keywords: BTreeSet<String>,
    /// Symbol of each top-level group in the composed pattern, by tag.
    symbols: BTreeMap<String, Symbol>,
}

impl Lexer {
    /// Creates a lexer with [`LexerSettings::default`].
    pub fn new<V, N, P, K, W>(vocabulary: V, keywords: K) -> Result<Self, LexerError>
    where
        V: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
        K: IntoIterator<Item = W>,
        W: Into<String>,
    {
        Self::with_settings(vocabulary, keywords, LexerSettings::default())
    }

    /// Creates a lexer.
    pub fn with_settings<V, N, P, K, W>(
        vocabulary: V,
        keywords: K,
        settings: LexerSettings,
    ) -> Result<Self, LexerError>
    where
        V: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
        K: IntoIterator<Item = W>,
        W: Into<String>,
    {
        let vocabulary: BTreeMap<String, String> = vocabulary
            .into_iter()
            .map(|(name, pattern)| (name.into(), pattern.into()))
            .collect();
        let keywords: BTreeSet<String> = keywords.into_iter().map(Into::into).collect();

        let duplicates: BTreeSet<String> = vocabulary
            .keys()
            .filter(|name| keywords.contains(*name))
            .cloned()
            .collect();
        if !duplicates.is_empty() {
            return Err(LexerError::DuplicateSymbols(duplicates));
        }
        if vocabulary.keys().chain(&keywords).any(String::is_empty) {
            return Err(LexerError::EmptySymbolName);
        }
        if let Some(name) = vocabulary
            .iter()
            .find_map(|(name, pattern)| pattern.is_empty().then_some(name))
        {
            return Err(LexerError::EmptyVocabularyPattern(name.clone()));
        }

        let mut composer = Composer::default();
        composer.group(
            Symbol::Ignore,
            &settings.ignore_pattern,
            count_groups(IGNORE_SYMBOL, &settings.ignore_pattern)?,
        );
        for (name, pattern) in &vocabulary {
            composer.group(
                Symbol::Rule(name.clone()),
                pattern,
                count_groups(name, pattern)?,
            );
        }
        for keyword in &keywords {
            composer.group(Symbol::Keyword(keyword.clone()), &escape(keyword), 0);
        }

        let pattern = composer.parts.join("|");
        log::debug!("composed lexer pattern {pattern:?}");
        let regex = Regex::new(&pattern)?;

        let lexer = Self {
            regex,
            settings,
            vocabulary,
            keywords,
            symbols: composer.symbols,
        };
        lexer.check_ambiguity()?;
        log::debug!(
            "lexer with {} rules and {} keywords is unambiguous",
            lexer.vocabulary.len(),
            lexer.keywords.len()
        );

        Ok(lexer)
    }

    /// Fails if two non-keyword symbols end in the same state of the automaton.
    fn check_ambiguity(&self) -> Result<(), LexerError> {
        let dfa = self.regex.dfa();
        for state in dfa.states() {
            let ending: BTreeSet<String> = dfa
                .tags_ending(state)
                .filter_map(|tag| match self.symbols.get(tag)? {
                    Symbol::Ignore => Some(IGNORE_SYMBOL.to_string()),
                    Symbol::Rule(name) => Some(name.clone()),
                    Symbol::Keyword(_) => None,
                })
                .collect();

            if ending.len() > 1 {
                return Err(LexerError::AmbiguousVocabulary(ending));
            }
        }
        Ok(())
    }

    /// The regex that matches every symbol, each in its own group.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// The configuration of this lexer.
    pub fn settings(&self) -> &LexerSettings {
        &self.settings
    }

    /// The symbol of the token at the end of every token stream.
    pub fn eof(&self) -> &str {
        &self.settings.eof
    }

    /// The vocabulary rules, as symbol and pattern.
    pub fn vocabulary(&self) -> &BTreeMap<String, String> {
        &self.vocabulary
    }

    /// The keywords.
    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }

    /// All symbols this lexer can produce, apart from the end-of-file symbol.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.vocabulary
            .keys()
            .chain(&self.keywords)
            .map(String::as_str)
    }

    /// Splits `lines` into tokens. Rows count from 0.
    pub fn tokenize<I>(&self, lines: I) -> Tokens<'_, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Tokens {
            lexer: self,
            lines: lines.into_iter().enumerate(),
            line: None,
            last_row: 0,
            last_end: 0,
            done: false,
        }
    }

    /// Splits `text` into lines and those into tokens.
    ///
    /// ```
    /// # use tagex::{Lexer, Token};
    /// let lexer = Lexer::new([("word", "[a-z]+")], ["if"]).unwrap();
    /// let tokens: Vec<_> = lexer.tokenize_str("if\n  iffy").collect();
    /// assert_eq!(
    ///     tokens,
    ///     [
    ///         Token::new("if", "if", 0, 0),
    ///         Token::new("word", "iffy", 1, 2),
    ///         Token::new("<EOF>", "", 1, 6),
    ///     ]
    /// );
    /// ```
    pub fn tokenize_str<'t>(&self, text: &'t str) -> Tokens<'_, Lines<'t>> {
        self.tokenize(text.lines())
    }

    /// The symbol of the top-level group that spans exactly `found`, preferring keywords.
    fn symbol_of(&self, found: &Match) -> Option<&Symbol> {
        let mut symbol = None;
        for (tag, candidate) in &self.symbols {
            let spans_match = found
                .group(tag)
                .is_some_and(|group| group.range() == found.range());
            if !spans_match {
                continue;
            }
            if let Symbol::Keyword(_) = candidate {
                return Some(candidate);
            }
            symbol.get_or_insert(candidate);
        }
        symbol
    }
}

/// Builds the composed pattern `(ignore)|(rule)|...|(keyword)|...` and remembers which tag the
/// group of every symbol gets.
#[derive(Default)]
struct Composer {
    parts: Vec<String>,
    symbols: BTreeMap<String, Symbol>,
    next_tag: usize,
}

impl Composer {
    /// Adds `pattern` as a group, followed by the `inner_groups` groups it contains itself.
    fn group(&mut self, symbol: Symbol, pattern: &str, inner_groups: usize) {
        let tag = self.next_tag + 1;
        self.symbols.insert(tag.to_string(), symbol);
        self.parts.push(format!("({pattern})"));
        self.next_tag = tag + inner_groups;
    }
}

/// Number of capture groups in `pattern`, apart from the whole match.
fn count_groups(symbol: &str, pattern: &str) -> Result<usize, LexerError> {
    match parse_regex(pattern) {
        Ok(nfa) => Ok(nfa.tags().len().saturating_sub(1)),
        Err(ParseError::Syntax(source)) => Err(LexerError::Syntax {
            symbol: symbol.to_string(),
            source,
        }),
        Err(e) => Err(e.into()),
    }
}

struct Line<'l> {
    row: usize,
    chars: Vec<char>,
    matches: Matches<'l>,
}

/// Lazy iterator over the tokens of some lines. Created by [`Lexer::tokenize`].
///
/// Ends with one token of the end-of-file symbol, on the last line and just past the column where
/// the last match ended, which may be on an earlier line.
pub struct Tokens<'l, I> {
    lexer: &'l Lexer,
    lines: Enumerate<I>,
    line: Option<Line<'l>>,
    last_row: usize,
    last_end: usize,
    done: bool,
}

impl<'l, I> Iterator for Tokens<'l, I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(line) = &mut self.line {
                if let Some(found) = line.matches.next() {
                    self.last_end = found.end;
                    let name = match self.lexer.symbol_of(&found) {
                        Some(Symbol::Rule(name) | Symbol::Keyword(name)) => name,
                        Some(Symbol::Ignore) => continue,
                        None => {
                            log::warn!(
                                "no symbol matches {}:{}..{} exactly, skipping it",
                                line.row,
                                found.start,
                                found.end
                            );
                            continue;
                        }
                    };
                    let text = line
                        .chars
                        .get(found.range())
                        .unwrap_or_default()
                        .iter()
                        .collect::<String>();
                    return Some(Token::new(name.as_str(), text, line.row, found.start));
                }
                self.line = None;
            }

            match self.lines.next() {
                Some((row, text)) => {
                    let text = text.as_ref();
                    self.last_row = row;
                    self.line = Some(Line {
                        row,
                        chars: text.chars().collect(),
                        matches: self.lexer.regex.matches(text),
                    });
                }
                None if self.done => return None,
                None => {
                    self.done = true;
                    return Some(Token::new(
                        self.lexer.eof(),
                        "",
                        self.last_row,
                        self.last_end,
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_pattern_tags() {
        let lexer = Lexer::new(
            [("pair", "(a)(?<second>b)"), ("single", "c")],
            ["if"],
        )
        .unwrap();

        assert_eq!(
            lexer.regex().pattern(),
            r"(\s+)|((a)(?<second>b))|(c)|(if)"
        );
        assert_eq!(
            lexer.symbols,
            BTreeMap::from([
                (IGNORE_GROUP.to_string(), Symbol::Ignore),
                ("2".to_string(), Symbol::Rule("pair".to_string())),
                ("5".to_string(), Symbol::Rule("single".to_string())),
                ("6".to_string(), Symbol::Keyword("if".to_string())),
            ])
        );
    }

    #[test]
    fn keywords_are_escaped() {
        let lexer = Lexer::new([("op", "[+*]")], ["(", "**", "a|b"]).unwrap();
        let symbols: Vec<_> = lexer
            .tokenize_str("( ** a|b +")
            .map(|token| token.symbol)
            .collect();
        assert_eq!(symbols, ["(", "**", "a|b", "op", DEFAULT_EOF]);
    }
}
