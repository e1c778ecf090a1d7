//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::{unescape, Token};
use crate::parser::pattern::parse_pattern;

/// Parse corpus source text into an AST
pub fn parse(input: &str) -> Result<Corpus, Vec<crate::ParseError>> {
    let len = input.len();

    let (tokens, lex_errors) = crate::parser::lexer::lex(input);
    if !lex_errors.is_empty() {
        return Err(lex_errors);
    }

    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    corpus_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn corpus_parser<'a, I>() -> impl Parser<'a, I, Corpus, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let identifier = select! {
        Token::Ident(s) => Identifier::new(s),
    }
    .map_with(|id, e| Spanned::new(id, span_range(&e.span())))
    .labelled("identifier");

    let literal = select! {
        Token::Str(s) => unescape(&s),
    }
    .labelled("quoted literal");

    // Pattern errors are re-anchored from the pattern text into the source,
    // skipping the opening quote. Parsing continues after a broken pattern so
    // later declarations still report their own errors.
    let pattern = select! {
        Token::Str(s) => s,
    }
    .validate(|raw, e, emitter| {
        let range = span_range(&e.span());
        match parse_pattern(&raw) {
            Ok(p) => Spanned::new(p, range),
            Err(errs) => {
                let base = range.start + 1;
                for err in errs {
                    let crate::ParseError::Syntax { span, message, .. } = err;
                    let inner = (base + span.start).min(range.end)..(base + span.end).min(range.end);
                    emitter.emit(Rich::custom(SimpleSpan::from(inner), message));
                }
                Spanned::new(Pattern::default(), range)
            }
        }
    })
    .labelled("quoted pattern");

    let parameter = just(Token::Star)
        .or_not()
        .then(identifier.clone())
        .map(|(star, name)| Parameter {
            name,
            variadic: star.is_some(),
        });

    let parameters = parameter
        .separated_by(just(Token::Comma))
        .collect::<Vec<_>>()
        .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

    let condition = identifier
        .clone()
        .then_ignore(just(Token::Equals))
        .then(literal)
        .map(|(parameter, value)| Condition { parameter, value });

    let conditions = condition
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>();

    let clause_kind = choice((
        just(Token::If).to(ClauseKind::Branch),
        just(Token::SpecialCase).to(ClauseKind::SpecialCase),
    ));

    let clause = clause_kind
        .then(conditions)
        .then_ignore(just(Token::Colon).or_not())
        .then(pattern.clone())
        .map(|((kind, conditions), pattern)| Clause {
            kind,
            conditions,
            pattern,
        });

    let declaration_kind = choice((
        just(Token::Template).to(DeclarationKind::Template),
        just(Token::Function).to(DeclarationKind::Function),
    ));

    let declaration = declaration_kind
        .then(identifier)
        .then(parameters)
        .then(just(Token::Colon).or_not().ignore_then(pattern).or_not())
        .then(clause.repeated().collect::<Vec<_>>())
        .map_with(|((((kind, name), parameters), default), clauses), e| {
            Spanned::new(
                Declaration {
                    kind,
                    name,
                    parameters,
                    default,
                    clauses,
                },
                span_range(&e.span()),
            )
        });

    declaration
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(|declarations| Corpus { declarations })
}
