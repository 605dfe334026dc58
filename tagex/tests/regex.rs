use pretty_assertions::assert_eq;
use tagex::{Match, ParseError, Regex, SyntaxErrorKind};

#[ctor::ctor]
fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn all_matches(pattern: &str, text: &str) -> Vec<Match> {
    Regex::new(pattern).unwrap().matches(text).collect()
}

fn syntax_error(pattern: &str) -> SyntaxErrorKind {
    match Regex::new(pattern) {
        Err(ParseError::Syntax(e)) => e.kind,
        other => panic!("expected a syntax error for {pattern:?}, got {other:?}"),
    }
}

#[test]
fn alternative_groups() {
    let found = all_matches("(abc)|([abc]+)", "--abcaba-abcaba-abcaba--");

    assert_eq!(
        found,
        [
            Match::new(2, 8).with_group("1", 2, 5).with_group("2", 2, 8),
            Match::new(9, 15).with_group("1", 9, 12).with_group("2", 9, 15),
            Match::new(16, 22)
                .with_group("1", 16, 19)
                .with_group("2", 16, 22),
        ]
    );
}

fn nested(start: usize, stride: usize) -> Match {
    let (s, k) = (start, stride);
    Match::new(s, s + 4 * k)
        .with_group("1", s, s + k)
        .with_group("2", s + k, s + 4 * k)
        .with_group("3", s + 2 * k, s + 4 * k)
        .with_group("4", s + 2 * k, s + 3 * k)
}

const NESTED_TEXT: &str = "--abcdaabbccdd-aaabbbcccddd--";

#[test]
fn nested_groups() {
    let found = all_matches("(a+)(b+((c+)d+))", NESTED_TEXT);
    assert_eq!(found, [nested(2, 1), nested(6, 2), nested(15, 3)]);
}

#[test]
fn nested_named_groups() {
    let found = all_matches(
        "(?<as>a+)(?<bs>b+(?'rest'(?<cs>c+)d+))",
        NESTED_TEXT,
    );

    let renamed: Vec<Match> = [(2, 1), (6, 2), (15, 3)]
        .into_iter()
        .map(|(s, k)| {
            Match::new(s, s + 4 * k)
                .with_group("as", s, s + k)
                .with_group("bs", s + k, s + 4 * k)
                .with_group("rest", s + 2 * k, s + 4 * k)
                .with_group("cs", s + 2 * k, s + 3 * k)
        })
        .collect();
    assert_eq!(found, renamed);
}

#[test]
fn repeated_group_keeps_last_iteration() {
    let found = all_matches("((abc)+)", "--abcabcabc--");
    assert_eq!(
        found,
        [Match::new(2, 11).with_group("1", 2, 11).with_group("2", 8, 11)]
    );
}

#[test]
fn optional_group_is_absent_when_skipped() {
    let regex = Regex::new("a(b)?c").unwrap();
    assert_eq!(regex.find("ac"), Some(Match::new(0, 2)));
    assert_eq!(regex.find("abc"), Some(Match::new(0, 3).with_group("1", 1, 2)));
}

#[test]
fn repetition_does_not_restart_the_match() {
    let regex = Regex::new(r"\d+\.\d+").unwrap();
    assert_eq!(regex.find("x12.5y").map(|m| m.range()), Some(1..5));

    let regex = Regex::new("a*b").unwrap();
    assert_eq!(regex.find("aab").map(|m| m.range()), Some(0..3));
}

#[test]
fn no_match() {
    assert!(all_matches("(abc)|([abc]+)", "--").is_empty());
    assert_eq!(Regex::new("abc").unwrap().find("ab"), None);
    assert!(!Regex::new("abc").unwrap().is_match(""));
}

#[test]
fn matching_is_repeatable() {
    let regex = Regex::new("(?<word>[a-z]+)|(\\d+)").unwrap();
    let text = "ab 12 cd3";
    let first: Vec<_> = regex.matches(text).collect();
    let second: Vec<_> = regex.matches(text).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
}

#[test]
fn matches_are_ordered_and_disjoint() {
    let cases = [
        ("a+", "aaa-a-aa"),
        ("(ab)*c", "cabcababc-c"),
        (r"\w+|\s+", "some words\there"),
        ("[0-9]+(-[0-9]+)?", "1-2 33- -4 5-66"),
    ];

    for (pattern, text) in cases {
        let len = text.chars().count();
        let found = all_matches(pattern, text);
        assert!(!found.is_empty(), "{pattern} should match {text}");

        let mut last_end = 0;
        for m in &found {
            assert!(m.start >= last_end, "{pattern}: {m:?} overlaps");
            assert!(m.start < m.end, "{pattern}: {m:?} is empty");
            assert!(m.end <= len, "{pattern}: {m:?} exceeds {len}");
            for group in m.groups().values() {
                assert!(m.start <= group.start && group.end <= m.end);
            }
            last_end = m.end;
        }
    }
}

#[test]
fn class_ranges_equal_enumerations() {
    let range = Regex::new("[a-c]").unwrap();
    let listed = Regex::new("[abc]").unwrap();

    for c in ['a', 'b', 'c', 'd', 'A', '`', '-', '0'] {
        let text = c.to_string();
        let expected = matches!(c, 'a'..='c');
        assert_eq!(range.is_match(&text), expected, "[a-c] on {c:?}");
        assert_eq!(listed.is_match(&text), expected, "[abc] on {c:?}");
    }
}

#[test]
fn custom_sentinel() {
    let regex = Regex::with_sentinel("a+", '$').unwrap();
    assert_eq!(regex.sentinel(), '$');
    assert_eq!(regex.find("baa").map(|m| m.range()), Some(1..3));
}

#[test]
fn parse_from_str() {
    let regex: Regex = "x|y".parse().unwrap();
    assert_eq!(regex.to_string(), "x|y");
    assert_eq!(regex.pattern(), "x|y");
    assert!(regex.is_match("--y"));
}

#[test]
fn matched_text() {
    let text = "größe=12";
    let found = Regex::new(r"\d+").unwrap().find(text).unwrap();
    assert_eq!(found.range(), 6..8);
    assert_eq!(found.text(text), "12");
}

#[test]
fn syntax_errors() {
    assert_eq!(syntax_error(""), SyntaxErrorKind::EmptyPattern);
    assert_eq!(syntax_error("a("), SyntaxErrorKind::UnmatchedParenthesis);
    assert_eq!(syntax_error("[ab"), SyntaxErrorKind::UnmatchedSquareBracket);
    assert_eq!(syntax_error("ab\\"), SyntaxErrorKind::DanglingBackslash);
    assert_eq!(syntax_error("(?<a"), SyntaxErrorKind::UnmatchedCaptureGroup);
    assert_eq!(syntax_error("(?<a-b>c)"), SyntaxErrorKind::InvalidCaptureGroupName);
    assert!(matches!(
        syntax_error("[c-a]"),
        SyntaxErrorKind::InvalidCharacterClassRange { start: 'c', end: 'a' }
    ));
    assert!(matches!(syntax_error("a{2}"), SyntaxErrorKind::NotImplemented(_)));
}
