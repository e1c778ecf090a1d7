//! Error types for parsing the template corpus

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        match self {
            ParseError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };
                report(
                    source,
                    filename,
                    span.clone(),
                    message,
                    &format!("{}{}", message, expected_str),
                )
            }
        }
    }
}

/// Render a single-label ariadne report to a string
pub(crate) fn report(
    source: &str,
    filename: &str,
    span: Span,
    message: &str,
    label: &str,
) -> String {
    let mut buf = Vec::new();
    let written = Report::build(ReportKind::Error, filename, span.start)
        .with_message(message)
        .with_label(
            Label::new((filename, span))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish()
        .write((filename, Source::from(source)), &mut buf);

    match written {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{}: {}", filename, message),
    }
}

impl<'a> From<chumsky::error::Rich<'a, crate::parser::lexer::Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, crate::parser::lexer::Token>) -> Self {
        use crate::parser::lexer::Token;
        use chumsky::error::RichReason;

        let found_token = err.found().cloned();

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found {
                Some(tok) => match found_token {
                    Some(Token::If) | Some(Token::SpecialCase) => format!(
                        "Unexpected {} - clauses must follow a template or function header",
                        format_token(tok)
                    ),
                    _ => format!("Unexpected {}", format_token(tok)),
                },
                None => "Unexpected end of input".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        // Format expected tokens nicely
        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::parser::lexer::Token) -> String {
    use crate::parser::lexer::Token;
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Str(s) => format!("string \"{}\"", s),
        Token::Template => "keyword 'template'".to_string(),
        Token::Function => "keyword 'function'".to_string(),
        Token::If => "keyword 'if'".to_string(),
        Token::SpecialCase => "keyword 'special_case'".to_string(),
        Token::ParenOpen => "'('".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Equals => "'='".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Comment => "comment".to_string(),
    }
}
