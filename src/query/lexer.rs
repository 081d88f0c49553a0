//! Lexer for the in-memory store's SQL subset using logos

use logos::Logos;

/// Byte range in query text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Keywords, case-insensitive as in SQL
    #[regex(r"[sS][eE][lL][eE][cC][tT]")]
    Select,
    #[regex(r"[fF][rR][oO][mM]")]
    From,

    #[token("*")]
    Star,
    #[token(",")]
    Comma,

    // Identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    QuotedIdent(String),

    // SQL line comments (skip)
    #[regex(r"--[^\n]*", logos::skip)]
    LineComment,
}

/// Lex query text into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_any_case() {
        let tokens: Vec<_> = lex("SELECT select Select FROM from").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Select,
                Token::Select,
                Token::Select,
                Token::From,
                Token::From
            ]
        );
    }

    #[test]
    fn test_projection_tokens() {
        let tokens: Vec<_> = lex("SELECT name, age FROM persons").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Select,
                Token::Ident("name".to_string()),
                Token::Comma,
                Token::Ident("age".to_string()),
                Token::From,
                Token::Ident("persons".to_string()),
            ]
        );
    }

    #[test]
    fn test_star() {
        let tokens: Vec<_> = lex("SELECT * FROM t").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Select,
                Token::Star,
                Token::From,
                Token::Ident("t".to_string())
            ]
        );
    }

    #[test]
    fn test_quoted_identifier() {
        let tokens: Vec<_> = lex(r#"SELECT "first name" FROM people"#)
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Select,
                Token::QuotedIdent("first name".to_string()),
                Token::From,
                Token::Ident("people".to_string()),
            ]
        );
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let tokens: Vec<_> = lex("selection fromage").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("selection".to_string()),
                Token::Ident("fromage".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        let tokens: Vec<_> = lex("SELECT * -- everything\nFROM t").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Select,
                Token::Star,
                Token::From,
                Token::Ident("t".to_string())
            ]
        );
    }
}
