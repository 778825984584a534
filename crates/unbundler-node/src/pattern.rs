//! Address matchers used by the dispatcher.
//!
//! Glob semantics: `*` matches any run of characters including `/`, so
//! `/ardosc*` matches `/ardosc/1`. `?` matches one character, `[a-z]` and
//! `[!abc]` match one character from (or outside) a set, and `{foo,bar}`
//! matches any listed alternative.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("unclosed '[' in pattern {0:?}")]
    UnclosedClass(String),
    #[error("empty character class in pattern {0:?}")]
    EmptyClass(String),
    #[error("unclosed '{{' in pattern {0:?}")]
    UnclosedAlternatives(String),
}

/// Decides whether a registration applies to a message address.
pub trait AddressMatcher: Send + Sync {
    fn matches(&self, address: &str) -> bool;
    /// Source pattern text, used as the registration key.
    fn pattern(&self) -> &str;
}

/// Matches one address exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactMatcher {
    address: String,
}

impl ExactMatcher {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

impl AddressMatcher for ExactMatcher {
    fn matches(&self, address: &str) -> bool {
        self.address == address
    }

    fn pattern(&self) -> &str {
        &self.address
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyRun,
    Class { negated: bool, ranges: Vec<(char, char)> },
    Alternatives(Vec<Vec<char>>),
}

/// Compiled glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobMatcher {
    source: String,
    tokens: Vec<Token>,
}

impl GlobMatcher {
    pub fn new(pattern: impl Into<String>) -> Result<Self, PatternError> {
        let source = pattern.into();
        let tokens = compile(&source)?;
        Ok(Self { source, tokens })
    }
}

impl AddressMatcher for GlobMatcher {
    fn matches(&self, address: &str) -> bool {
        let input: Vec<char> = address.chars().collect();
        match_tokens(&self.tokens, &input)
    }

    fn pattern(&self) -> &str {
        &self.source
    }
}

/// True when `pattern` uses any glob syntax.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Builds a glob matcher when the text uses glob syntax, otherwise an
/// exact matcher.
pub fn parse_pattern(pattern: &str) -> Result<Box<dyn AddressMatcher>, PatternError> {
    if is_glob(pattern) {
        Ok(Box::new(GlobMatcher::new(pattern)?))
    } else {
        Ok(Box::new(ExactMatcher::new(pattern)))
    }
}

fn compile(source: &str) -> Result<Vec<Token>, PatternError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                if tokens.last() != Some(&Token::AnyRun) {
                    tokens.push(Token::AnyRun);
                }
                i += 1;
            }
            '?' => {
                tokens.push(Token::AnyOne);
                i += 1;
            }
            '[' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|p| i + 1 + p)
                    .ok_or_else(|| PatternError::UnclosedClass(source.to_string()))?;
                let mut body = &chars[i + 1..close];
                let negated = body.first() == Some(&'!');
                if negated {
                    body = &body[1..];
                }
                if body.is_empty() {
                    return Err(PatternError::EmptyClass(source.to_string()));
                }
                tokens.push(Token::Class {
                    negated,
                    ranges: class_ranges(body),
                });
                i = close + 1;
            }
            '{' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|c| *c == '}')
                    .map(|p| i + 1 + p)
                    .ok_or_else(|| PatternError::UnclosedAlternatives(source.to_string()))?;
                let alternatives = chars[i + 1..close]
                    .split(|c| *c == ',')
                    .map(|alt| alt.to_vec())
                    .collect();
                tokens.push(Token::Alternatives(alternatives));
                i = close + 1;
            }
            c => {
                tokens.push(Token::Literal(c));
                i += 1;
            }
        }
    }
    Ok(tokens)
}

/// `a-z` spans become ranges; a leading or trailing `-` is literal.
fn class_ranges(body: &[char]) -> Vec<(char, char)> {
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < body.len() {
        if i + 2 < body.len() && body[i + 1] == '-' {
            let (lo, hi) = (body[i], body[i + 2]);
            ranges.push(if lo <= hi { (lo, hi) } else { (hi, lo) });
            i += 3;
        } else {
            ranges.push((body[i], body[i]));
            i += 1;
        }
    }
    ranges
}

/// Bottom-up match over (token, input position) states, so each state is
/// evaluated once no matter how many `*` the pattern has.
///
/// `next[i]` holds whether `tokens[t + 1..]` matches `input[i..]`; `cur` is
/// filled for `tokens[t..]` from the end of the input backwards.
fn match_tokens(tokens: &[Token], input: &[char]) -> bool {
    let n = input.len();
    let mut next = vec![false; n + 1];
    next[n] = true;
    let mut cur = vec![false; n + 1];

    for token in tokens.iter().rev() {
        for i in (0..=n).rev() {
            cur[i] = match token {
                Token::Literal(c) => i < n && input[i] == *c && next[i + 1],
                Token::AnyOne => i < n && next[i + 1],
                Token::AnyRun => next[i] || (i < n && cur[i + 1]),
                Token::Class { negated, ranges } => {
                    i < n && {
                        let c = input[i];
                        let hit = ranges.iter().any(|(lo, hi)| *lo <= c && c <= *hi);
                        hit != *negated && next[i + 1]
                    }
                }
                Token::Alternatives(alternatives) => alternatives
                    .iter()
                    .any(|alt| input[i..].starts_with(alt) && next[i + alt.len()]),
            };
        }
        std::mem::swap(&mut cur, &mut next);
    }
    next[0]
}
