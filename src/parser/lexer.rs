//! Lexer for the template corpus format using logos

use logos::Logos;

use crate::error::ParseError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Declaration keywords
    #[token("template")]
    Template,
    #[token("function")]
    Function,

    // Clause keywords
    #[token("if")]
    If,
    #[token("special_case")]
    SpecialCase,

    // Delimiters
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("=")]
    Equals,
    #[token("*")]
    Star,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    /// Raw contents of a quoted pattern, without the outer quotes
    #[token("\"", lex_quoted)]
    Str(String),

    #[regex(r"#[^\n]*", logos::skip)]
    Comment,
}

/// Scan a quoted pattern whose `{...}` expressions may contain quoted literals
fn lex_quoted(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let rest = lex.remainder();
    let mut depth = 0usize;
    let mut in_literal = false;
    let mut chars = rest.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' if depth > 0 => in_literal = !in_literal,
            '"' => {
                let raw = rest[..i].to_string();
                lex.bump(i + 1);
                return Some(raw);
            }
            '{' if !in_literal => depth += 1,
            '}' if !in_literal && depth > 0 => depth -= 1,
            _ => {}
        }
    }
    None
}

/// Lex input string into tokens with spans
///
/// Unrecognized characters and unterminated strings are reported as errors
/// instead of being dropped.
pub fn lex(input: &str) -> (Vec<(Token, Span)>, Vec<ParseError>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (tok, span) in Token::lexer(input).spanned() {
        match tok {
            Ok(t) => tokens.push((t, span)),
            Err(()) => {
                let message = if input[span.clone()].starts_with('"') {
                    "Unterminated string".to_string()
                } else {
                    format!("Unexpected character '{}'", &input[span.clone()])
                };
                errors.push(ParseError::Syntax {
                    span,
                    message,
                    expected: Vec::new(),
                });
            }
        }
    }

    (tokens, errors)
}

/// Resolve backslash escapes in a condition literal
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
