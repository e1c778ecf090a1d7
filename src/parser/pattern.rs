//! Parser for the expression language inside quoted patterns
//!
//! A pattern is literal text interleaved with `{...}` expressions:
//!
//! ```text
//! {name} {for_entry(slots, "info", ", ", " and ", name)}.
//! ```
//!
//! Spans in the returned errors are byte offsets into the pattern text.

use chumsky::prelude::*;

use crate::error::ParseError;
use crate::parser::ast::{Expr, Identifier, Pattern, Segment};

/// Parse the raw contents of a quoted pattern (without the outer quotes)
pub fn parse_pattern(input: &str) -> Result<Pattern, Vec<ParseError>> {
    pattern_parser()
        .parse(input)
        .into_result()
        .map_err(|errs| errs.into_iter().map(convert_error).collect())
}

fn pattern_parser<'a>() -> impl Parser<'a, &'a str, Pattern, extra::Err<Rich<'a, char>>> {
    let escaped = just('\\').ignore_then(any());

    let identifier = any()
        .filter(|c: &char| c.is_ascii_alphabetic() || *c == '_')
        .then(
            any()
                .filter(|c: &char| c.is_ascii_alphanumeric() || *c == '_')
                .repeated()
                .collect::<String>(),
        )
        .map(|(first, rest): (char, String)| {
            let mut name = String::with_capacity(rest.len() + 1);
            name.push(first);
            name.push_str(&rest);
            Identifier::new(name)
        })
        .labelled("identifier");

    let literal = escaped
        .clone()
        .or(none_of("\"\\"))
        .repeated()
        .collect::<String>()
        .delimited_by(just('"'), just('"'))
        .map(Expr::Literal)
        .labelled("quoted literal");

    let expr = recursive(|expr| {
        let args = expr
            .separated_by(just(',').padded())
            .collect::<Vec<_>>()
            .delimited_by(just('(').padded(), just(')'));

        let reference = identifier.then(args.or_not()).map(|(name, args)| match args {
            Some(args) => Expr::Call {
                function: name,
                args,
            },
            None => Expr::Placeholder(name),
        });

        choice((literal, reference)).padded()
    });

    let text = escaped
        .or(none_of("{}\\"))
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(Segment::Text);

    let embedded = expr.delimited_by(just('{'), just('}')).map(Segment::Expr);

    choice((text, embedded))
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(|segments| Pattern { segments })
}

fn convert_error(err: Rich<'_, char>) -> ParseError {
    use chumsky::error::{RichPattern, RichReason};

    let message = match err.reason() {
        RichReason::ExpectedFound { found, .. } => match found.as_deref() {
            Some(&'{') => "Nested '{' inside an expression".to_string(),
            Some(&'}') => "Unmatched '}' in pattern".to_string(),
            Some(c) => format!("Unexpected '{}' in pattern", c),
            None => "Unexpected end of pattern".to_string(),
        },
        RichReason::Custom(msg) => msg.to_string(),
    };

    let expected: Vec<String> = err
        .expected()
        .filter_map(|e| match e {
            RichPattern::Token(c) => Some(format!("'{}'", **c)),
            RichPattern::Label(label) => Some(label.to_string()),
            RichPattern::EndOfInput => Some("end of pattern".to_string()),
            RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
            RichPattern::Any => Some("any character".to_string()),
            RichPattern::SomethingElse => None,
        })
        .collect();

    ParseError::Syntax {
        span: err.span().into_range(),
        message,
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn placeholder(name: &str) -> Expr {
        Expr::Placeholder(Identifier::new(name))
    }

    #[test]
    fn test_plain_text() {
        let pattern = parse_pattern("Thank you, goodbye.").unwrap();
        assert_eq!(
            pattern.segments,
            vec![Segment::Text("Thank you, goodbye.".to_string())]
        );
    }

    #[test]
    fn test_empty_pattern() {
        let pattern = parse_pattern("").unwrap();
        assert!(pattern.segments.is_empty());
    }

    #[test]
    fn test_placeholder() {
        let pattern = parse_pattern("has a rating of {value}").unwrap();
        assert_eq!(
            pattern.segments,
            vec![
                Segment::Text("has a rating of ".to_string()),
                Segment::Expr(placeholder("value")),
            ]
        );
    }

    #[test]
    fn test_nested_call_with_literals() {
        let pattern =
            parse_pattern(r#"{name} {for_entry(slots, "info", ", ", " and ", name)}."#).unwrap();
        assert_eq!(pattern.segments.len(), 4);
        assert_eq!(
            pattern.segments[2],
            Segment::Expr(Expr::Call {
                function: Identifier::new("for_entry"),
                args: vec![
                    placeholder("slots"),
                    Expr::Literal("info".to_string()),
                    Expr::Literal(", ".to_string()),
                    Expr::Literal(" and ".to_string()),
                    placeholder("name"),
                ],
            })
        );
    }

    #[test]
    fn test_call_inside_call() {
        let pattern = parse_pattern("{genitive( upper(name) )}").unwrap();
        assert_eq!(
            pattern.segments,
            vec![Segment::Expr(Expr::Call {
                function: Identifier::new("genitive"),
                args: vec![Expr::Call {
                    function: Identifier::new("upper"),
                    args: vec![placeholder("name")],
                }],
            })]
        );
    }

    #[test]
    fn test_call_without_arguments() {
        let pattern = parse_pattern("{now()}").unwrap();
        assert_eq!(
            pattern.segments,
            vec![Segment::Expr(Expr::Call {
                function: Identifier::new("now"),
                args: vec![],
            })]
        );
    }

    #[test]
    fn test_escaped_braces_are_text() {
        let pattern = parse_pattern(r"literal \{braces\}").unwrap();
        assert_eq!(
            pattern.segments,
            vec![Segment::Text("literal {braces}".to_string())]
        );
    }

    #[test]
    fn test_unclosed_expression_is_error() {
        let errors = parse_pattern("hello {name").unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_stray_closing_brace_is_error() {
        let errors = parse_pattern("hello name}").unwrap_err();
        assert!(errors[0].to_string().contains("Unmatched '}'"));
    }

    #[test]
    fn test_invalid_identifier_is_error() {
        assert!(parse_pattern("{1abc}").is_err());
    }
}
