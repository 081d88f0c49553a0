//! Parser for the SQL subset using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::query::ast::{Select, SelectColumn};
use crate::query::lexer::Token;

/// Parse query text into a [`Select`], or human-readable error messages.
pub fn parse(input: &str) -> Result<Select, Vec<String>> {
    let len = input.len();

    let token_iter = crate::query::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    let token_stream = Stream::from_iter(token_iter).map((len..len).into(), |(t, s): (_, _)| (t, s));

    select_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| describe_error(&e)).collect())
}

fn select_parser<'a, I>() -> impl Parser<'a, I, Select, extra::Err<Rich<'a, Token>>>
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let identifier = select! {
        Token::Ident(s) => s,
        Token::QuotedIdent(s) => s,
    };

    let column = choice((
        just(Token::Star).to(SelectColumn::Star),
        identifier.map(SelectColumn::Named),
    ));

    let columns = column
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>();

    just(Token::Select)
        .ignore_then(columns)
        .then_ignore(just(Token::From))
        .then(identifier)
        .then_ignore(end())
        .map(|(columns, table)| Select { columns, table })
}

/// Render a rich parse error as a single message line
fn describe_error(err: &Rich<'_, Token>) -> String {
    use chumsky::error::RichReason;

    let message = match err.reason() {
        RichReason::ExpectedFound { found, .. } => match found {
            Some(tok) => format!("unexpected {}", format_token(tok)),
            None => "unexpected end of query".to_string(),
        },
        RichReason::Custom(msg) => msg.to_string(),
    };

    let expected: Vec<String> = err
        .expected()
        .filter_map(|e| match e {
            chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
            chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
            chumsky::error::RichPattern::EndOfInput => Some("end of query".to_string()),
            chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
            chumsky::error::RichPattern::Any => Some("any token".to_string()),
            chumsky::error::RichPattern::SomethingElse => None,
        })
        .collect();

    if expected.is_empty() {
        message
    } else {
        format!("{} (expected {})", message, expected.join(", "))
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Select => "keyword 'select'".to_string(),
        Token::From => "keyword 'from'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::QuotedIdent(s) => format!("identifier \"{}\"", s),
        Token::LineComment => "comment".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_select_star() {
        let stmt = parse("SELECT * FROM persons").unwrap();
        assert_eq!(
            stmt,
            Select {
                columns: vec![SelectColumn::Star],
                table: "persons".to_string(),
            }
        );
    }

    #[test]
    fn test_select_named_columns() {
        let stmt = parse("select name, age from persons").unwrap();
        assert_eq!(
            stmt,
            Select {
                columns: vec![
                    SelectColumn::Named("name".to_string()),
                    SelectColumn::Named("age".to_string()),
                ],
                table: "persons".to_string(),
            }
        );
    }

    #[test]
    fn test_star_mixed_with_columns() {
        let stmt = parse("SELECT id, * FROM t").unwrap();
        assert_eq!(
            stmt.columns,
            vec![
                SelectColumn::Named("id".to_string()),
                SelectColumn::Star
            ]
        );
    }

    #[test]
    fn test_rejects_non_select() {
        let errs = parse("DELETE FROM persons").unwrap_err();
        assert!(!errs.is_empty());
        assert!(errs[0].contains("select"), "got: {}", errs[0]);
    }

    #[test]
    fn test_rejects_trailing_tokens() {
        assert!(parse("SELECT * FROM a b").is_err());
    }

    #[test]
    fn test_rejects_missing_table() {
        assert!(parse("SELECT name FROM").is_err());
    }

    #[test]
    fn test_rejects_empty_projection() {
        assert!(parse("SELECT FROM persons").is_err());
    }
}
