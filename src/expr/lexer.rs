//! Lexer for the template expression language using logos

use logos::{Lexer, Logos};

use super::EvalError;
use crate::error::Span;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f\x0b]+")]
pub enum Token {
    // Keywords
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("not")]
    Not,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("is")]
    Is,
    #[token("lambda")]
    Lambda,
    #[token("None")]
    NoneLit,
    #[token("True")]
    True,
    #[token("False")]
    False,

    // Operators (longer patterns first)
    #[token("**")]
    DoubleStar,
    #[token("//")]
    DoubleSlash,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LessEq,
    #[token(">=")]
    GreaterEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("~")]
    Tilde,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("=")]
    Assign,

    // Delimiters
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r"[0-9][0-9_]*", |lex| parse_int(lex, 10, 0))]
    #[regex(r"0[xX][0-9a-fA-F_]+", |lex| parse_int(lex, 16, 2))]
    #[regex(r"0[oO][0-7_]+", |lex| parse_int(lex, 8, 2))]
    #[regex(r"0[bB][01_]+", |lex| parse_int(lex, 2, 2))]
    Int(i64),

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?", parse_float)]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", parse_float)]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+", parse_float)]
    Float(f64),

    #[regex(r#""([^"\\]|\\.)*""#, unquote)]
    #[regex(r#"'([^'\\]|\\.)*'"#, unquote)]
    Str(String),
}

fn parse_int(lex: &mut Lexer<Token>, radix: u32, prefix: usize) -> Option<i64> {
    let digits = lex.slice()[prefix..].replace('_', "");
    i64::from_str_radix(&digits, radix).ok()
}

fn parse_float(lex: &mut Lexer<Token>) -> Option<f64> {
    lex.slice().replace('_', "").parse().ok()
}

/// Strip the quotes of a string literal and resolve its escapes
fn unquote(lex: &mut Lexer<Token>) -> Option<String> {
    let slice = lex.slice();
    let body = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' => out.push(hex_escape(&mut chars, 4)?),
            'U' => out.push(hex_escape(&mut chars, 8)?),
            // unknown escapes are kept verbatim
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Some(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, len: usize) -> Option<char> {
    let digits: String = chars.take(len).collect();
    if digits.len() != len {
        return None;
    }
    char::from_u32(u32::from_str_radix(&digits, 16).ok()?)
}

/// Lex input string into tokens with spans
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, EvalError> {
    let mut lexer = Token::lexer(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push((token, lexer.span())),
            Err(()) => {
                return Err(EvalError::Syntax {
                    message: format!("unexpected character sequence '{}'", lexer.slice()),
                    span: lexer.span(),
                })
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        lex(input).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("i for i in items if not index"),
            vec![
                Token::Ident("i".to_string()),
                Token::For,
                Token::Ident("i".to_string()),
                Token::In,
                Token::Ident("items".to_string()),
                Token::If,
                Token::Not,
                Token::Ident("index".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.14 1e3 0x1f 1_000 .5"),
            vec![
                Token::Int(42),
                Token::Float(3.14),
                Token::Float(1000.0),
                Token::Int(31),
                Token::Int(1000),
                Token::Float(0.5),
            ]
        );
    }

    #[test]
    fn test_strings_with_escapes() {
        assert_eq!(
            kinds(r#""a\"b" 'it\'s' 'tab\t'"#),
            vec![
                Token::Str("a\"b".to_string()),
                Token::Str("it's".to_string()),
                Token::Str("tab\t".to_string()),
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("** // == != <= >= = < >"),
            vec![
                Token::DoubleStar,
                Token::DoubleSlash,
                Token::EqEq,
                Token::NotEq,
                Token::LessEq,
                Token::GreaterEq,
                Token::Assign,
                Token::Less,
                Token::Greater,
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_an_error() {
        let err = lex("a $ b").unwrap_err();
        assert!(matches!(err, EvalError::Syntax { span, .. } if span == (2..3)));
    }
}
