//! Glob Pattern Matching
//!
//! Shell-style wildcard patterns used by [`Store::keys`](super::Store::keys).
//!
//! | Syntax    | Matches                                              |
//! |-----------|------------------------------------------------------|
//! | `*`       | any run of characters, including none                |
//! | `?`       | exactly one character                                |
//! | `[abc]`   | one character from the set                           |
//! | `[a-z]`   | one character in the (inclusive) range               |
//! | `[^...]`  | one character *not* in the set                       |
//! | `\x`      | the literal character `x`, inside or outside a class |
//!
//! A pattern always has to match the whole candidate. Inside a class, `]`
//! and `-` are only literal when escaped.
//!
//! Patterns are compiled once into a token list. Every syntax error is
//! reported by [`GlobPattern::compile`], before any candidate is looked at,
//! so a bad pattern fails the same way against an empty store as against a
//! full one.

use thiserror::Error;

/// Errors reported for malformed patterns.
///
/// Offsets count characters from the start of the pattern.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GlobError {
    /// `[` without a closing `]`
    #[error("unterminated character class starting at offset {0}")]
    UnterminatedClass(usize),

    /// `\` as the last character of the pattern
    #[error("dangling escape at end of pattern")]
    DanglingEscape,

    /// A range with a missing bound, a stray `-`, or `lo > hi`
    #[error("invalid range in character class at offset {0}")]
    InvalidRange(usize),

    /// `[]` or `[^]`
    #[error("empty character class at offset {0}")]
    EmptyClass(usize),
}

/// One member of a character class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassItem {
    Single(char),
    Range(char, char),
}

impl ClassItem {
    #[inline]
    fn contains(&self, c: char) -> bool {
        match *self {
            ClassItem::Single(s) => s == c,
            ClassItem::Range(lo, hi) => lo <= c && c <= hi,
        }
    }
}

/// A parsed `[...]` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CharClass {
    negated: bool,
    items: Vec<ClassItem>,
}

impl CharClass {
    fn matches(&self, c: char) -> bool {
        self.items.iter().any(|item| item.contains(c)) != self.negated
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    AnyRun,
    Class(CharClass),
}

impl Token {
    /// Single-character test. `AnyRun` never consumes on its own.
    #[inline]
    fn matches(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyChar => true,
            Token::AnyRun => false,
            Token::Class(class) => class.matches(c),
        }
    }
}

/// A compiled glob pattern.
///
/// # Example
///
/// ```
/// use lazykv::storage::GlobPattern;
///
/// let pattern = GlobPattern::compile("user:[0-9]*").unwrap();
/// assert!(pattern.matches("user:42"));
/// assert!(!pattern.matches("user:x"));
///
/// assert!(GlobPattern::compile("user:[0-9").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    tokens: Vec<Token>,
}

impl GlobPattern {
    /// Parses `pattern`, validating its syntax.
    pub fn compile(pattern: &str) -> Result<Self, GlobError> {
        let chars: Vec<char> = pattern.chars().collect();
        let mut tokens = Vec::with_capacity(chars.len());
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '*' => {
                    // Runs of stars behave like one
                    if tokens.last() != Some(&Token::AnyRun) {
                        tokens.push(Token::AnyRun);
                    }
                    i += 1;
                }
                '?' => {
                    tokens.push(Token::AnyChar);
                    i += 1;
                }
                '[' => {
                    let (class, next) = parse_class(&chars, i)?;
                    tokens.push(Token::Class(class));
                    i = next;
                }
                '\\' => {
                    let escaped = *chars.get(i + 1).ok_or(GlobError::DanglingEscape)?;
                    tokens.push(Token::Literal(escaped));
                    i += 2;
                }
                c => {
                    tokens.push(Token::Literal(c));
                    i += 1;
                }
            }
        }

        Ok(Self { tokens })
    }

    /// Returns true if the whole of `candidate` matches.
    ///
    /// Walks pattern and candidate left to right. On a mismatch the scan
    /// falls back to the most recent `*` and lets it swallow one more
    /// character; earlier stars never need revisiting because the later
    /// one can absorb anything they would have.
    pub fn matches(&self, candidate: &str) -> bool {
        let text: Vec<char> = candidate.chars().collect();
        let tokens = &self.tokens;

        let mut p = 0;
        let mut t = 0;
        // (token index of the star, candidate index it currently extends to)
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            match tokens.get(p) {
                Some(Token::AnyRun) => {
                    backtrack = Some((p, t));
                    p += 1;
                    continue;
                }
                Some(token) if token.matches(text[t]) => {
                    p += 1;
                    t += 1;
                    continue;
                }
                _ => {}
            }

            match backtrack {
                Some((star, swallowed)) => {
                    p = star + 1;
                    t = swallowed + 1;
                    backtrack = Some((star, swallowed + 1));
                }
                None => return false,
            }
        }

        tokens[p..].iter().all(|token| *token == Token::AnyRun)
    }
}

/// Parses the class opening at `chars[start] == '['`.
///
/// Returns the class and the index just past its closing `]`.
fn parse_class(chars: &[char], start: usize) -> Result<(CharClass, usize), GlobError> {
    let mut i = start + 1;
    let negated = chars.get(i) == Some(&'^');
    if negated {
        i += 1;
    }

    let mut items = Vec::new();
    loop {
        match chars.get(i) {
            None => return Err(GlobError::UnterminatedClass(start)),
            Some(']') if items.is_empty() => return Err(GlobError::EmptyClass(start)),
            Some(']') => return Ok((CharClass { negated, items }, i + 1)),
            Some(_) => {}
        }

        let (lo, next) = class_char(chars, i, start)?;
        i = next;

        if chars.get(i) == Some(&'-') {
            let range_at = i;
            let (hi, next) = class_char(chars, i + 1, start)?;
            if lo > hi {
                return Err(GlobError::InvalidRange(range_at));
            }
            items.push(ClassItem::Range(lo, hi));
            i = next;
        } else {
            items.push(ClassItem::Single(lo));
        }
    }
}

/// Reads one (possibly escaped) class member at `chars[i]`.
fn class_char(chars: &[char], i: usize, class_start: usize) -> Result<(char, usize), GlobError> {
    match chars.get(i) {
        None => Err(GlobError::UnterminatedClass(class_start)),
        Some('\\') => match chars.get(i + 1) {
            Some(&c) => Ok((c, i + 2)),
            None => Err(GlobError::DanglingEscape),
        },
        Some('-') | Some(']') => Err(GlobError::InvalidRange(i)),
        Some(&c) => Ok((c, i + 1)),
    }
}

/// Matches `candidate` against `pattern` in one call.
///
/// Compiles the pattern each time; use [`GlobPattern`] when testing many
/// candidates against the same pattern.
pub fn matches(pattern: &str, candidate: &str) -> Result<bool, GlobError> {
    Ok(GlobPattern::compile(pattern)?.matches(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ODD_KEY: &str = "\\c?*[]";

    fn check(pattern: &str, candidate: &str) -> bool {
        matches(pattern, candidate).unwrap()
    }

    #[test]
    fn test_literal() {
        assert!(check("hello", "hello"));
        assert!(!check("hello", "hell"));
        assert!(!check("hello", "helloo"));
        assert!(check("", ""));
        assert!(!check("", "a"));
    }

    #[test]
    fn test_star() {
        assert!(check("*", ""));
        assert!(check("*", "anything"));
        assert!(check("a*", "aaaa"));
        assert!(check("a*", "a"));
        assert!(!check("a*", "baaa"));
        assert!(check("*a", "aaa"));
        assert!(!check("*a", "aaab"));
        assert!(check("h*llo", "hello"));
        assert!(check("h*llo", "hllo"));
        assert!(check("a**b", "axxb"));
        assert!(!check("b*b", "aaab"));
    }

    #[test]
    fn test_star_backtracking() {
        assert!(check("*ab*ab", "abxabyab"));
        assert!(check("a*b*c", "aXbYbZc"));
        assert!(!check("a*b*c", "aXbYbZ"));
        assert!(check("*aab", "aaaab"));
    }

    #[test]
    fn test_question_mark() {
        assert!(check("???", "aaa"));
        assert!(!check("???", "aaaa"));
        assert!(!check("????", "aaa"));
        assert!(check("h?llo", "hallo"));
        assert!(!check("h?llo", "hllo"));
    }

    #[test]
    fn test_unicode_is_per_character() {
        assert!(check("?", "é"));
        assert!(check("caf?", "café"));
        assert!(check("[а-я]*", "привет"));
    }

    #[test]
    fn test_class() {
        assert!(check("h[ae]llo", "hello"));
        assert!(check("h[ae]llo", "hallo"));
        assert!(!check("h[ae]llo", "hillo"));
        assert!(check("*[a-c]", "aaab"));
        assert!(!check("*[a-c]", ODD_KEY));
        assert!(check("[a-cx-z]", "y"));
        assert!(check("[[]", "["));
    }

    #[test]
    fn test_class_checks_last_character() {
        // The class must apply to the final character, not any character
        assert!(!check("*[a-c]", "abz"));
        assert!(check("*[a-c]", "zzb"));
    }

    #[test]
    fn test_negated_class() {
        assert!(check("[^abc]", "d"));
        assert!(!check("[^abc]", "a"));
        assert!(check("*[^c-z\\]]", "aaab"));
        assert!(!check("*[^c-z\\]]", ODD_KEY));
        assert!(!check("[^a]", ""));
    }

    #[test]
    fn test_escapes() {
        assert!(check("\\\\c\\?\\*\\[\\]", ODD_KEY));
        assert!(!check("\\\\c\\?\\*\\[\\]", "\\cx*[]"));
        assert!(check("\\*", "*"));
        assert!(!check("\\*", "x"));
        assert!(check("a\\b", "ab"));
        assert!(check("[\\-]", "-"));
        assert!(check("[\\]a]", "]"));
    }

    #[test]
    fn test_close_bracket_outside_class_is_literal() {
        assert!(check("a]", "a]"));
    }

    #[test]
    fn test_unterminated_class() {
        assert_eq!(matches("[", "x"), Err(GlobError::UnterminatedClass(0)));
        assert_eq!(matches("ab[cd", "abc"), Err(GlobError::UnterminatedClass(2)));
        assert_eq!(matches("[a-", "a"), Err(GlobError::UnterminatedClass(0)));
        assert_eq!(matches("[^", ""), Err(GlobError::UnterminatedClass(0)));
    }

    #[test]
    fn test_dangling_escape() {
        assert_eq!(matches("abc\\", "abc"), Err(GlobError::DanglingEscape));
        assert_eq!(matches("[a\\", "a"), Err(GlobError::DanglingEscape));
    }

    #[test]
    fn test_invalid_range() {
        assert_eq!(matches("[a-]", "a"), Err(GlobError::InvalidRange(3)));
        assert_eq!(matches("[-a]", "a"), Err(GlobError::InvalidRange(1)));
        assert_eq!(matches("[z-a]", "a"), Err(GlobError::InvalidRange(2)));
    }

    #[test]
    fn test_empty_class() {
        assert_eq!(matches("[]", "a"), Err(GlobError::EmptyClass(0)));
        assert_eq!(matches("x[^]", "xa"), Err(GlobError::EmptyClass(1)));
    }

    #[test]
    fn test_errors_do_not_depend_on_candidate() {
        // The bad class sits after a literal that would already fail
        assert!(matches("zzz[", "aaa").is_err());
        assert!(matches("*[", "").is_err());
    }

    #[test]
    fn test_compiled_pattern_reuse() {
        let pattern = GlobPattern::compile("k_?").unwrap();
        let hits: Vec<&str> = ["k_1", "k_22", "k_x", "j_1"]
            .into_iter()
            .filter(|k| pattern.matches(k))
            .collect();
        assert_eq!(hits, vec!["k_1", "k_x"]);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            GlobError::UnterminatedClass(4).to_string(),
            "unterminated character class starting at offset 4"
        );
        assert_eq!(
            GlobError::DanglingEscape.to_string(),
            "dangling escape at end of pattern"
        );
    }
}
