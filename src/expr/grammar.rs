//! Parser implementation using chumsky

use std::sync::Arc;

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use super::ast::*;
use super::lexer::{self, Token};
use super::EvalError;

/// Postfix operation applied to an atom
#[derive(Debug, Clone)]
enum Postfix {
    Call(Vec<Argument>),
    Index(Expr),
    Slice(Option<Expr>, Option<Expr>, Option<Expr>),
    Attribute(String),
}

fn apply_postfix(value: Expr, op: Postfix) -> Expr {
    let value = Box::new(value);
    match op {
        Postfix::Call(args) => Expr::Call { func: value, args },
        Postfix::Index(index) => Expr::Index {
            value,
            index: Box::new(index),
        },
        Postfix::Slice(lower, upper, step) => Expr::Slice {
            value,
            lower: lower.map(Box::new),
            upper: upper.map(Box::new),
            step: step.map(Box::new),
        },
        Postfix::Attribute(attr) => Expr::Attribute { value, attr },
    }
}

/// Parse expression source text into an AST
pub fn parse(input: &str) -> Result<Expr, EvalError> {
    let len = input.len();
    let tokens = lexer::lex(input)?;

    // Turn the token list into a stream that chumsky can use
    let token_stream = Stream::from_iter(
        tokens
            .into_iter()
            .map(|(tok, span)| (tok, SimpleSpan::from(span))),
    )
    // Split (Token, SimpleSpan) into token and span parts
    .map((len..len).into(), |(t, s): (_, _)| (t, s));

    expr_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errors| {
            errors
                .into_iter()
                .next()
                .map(|err| {
                    let message = match err.found() {
                        Some(tok) => format!("unexpected {}", describe(tok)),
                        None => "unexpected end of expression".to_string(),
                    };
                    EvalError::Syntax {
                        message,
                        span: err.span().into_range(),
                    }
                })
                .unwrap_or_else(|| EvalError::Syntax {
                    message: "invalid expression".to_string(),
                    span: 0..len,
                })
        })
}

/// Format a token for human-readable error messages
fn describe(tok: &Token) -> String {
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::Str(s) => format!("string {:?}", s),
        Token::Int(n) => format!("number {}", n),
        Token::Float(x) => format!("number {}", x),
        Token::Assign => "'='".to_string(),
        Token::Colon => "':'".to_string(),
        Token::Comma => "','".to_string(),
        Token::ParenClose => "')'".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::BraceClose => "'}'".to_string(),
        Token::For => "keyword 'for'".to_string(),
        Token::In => "keyword 'in'".to_string(),
        Token::If => "keyword 'if'".to_string(),
        Token::Else => "keyword 'else'".to_string(),
        Token::Lambda => "keyword 'lambda'".to_string(),
        other => format!("{:?}", other),
    }
}

fn expr_parser<'a, I>() -> impl Parser<'a, I, Expr, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let ident = select! {
            Token::Ident(name) => name,
        };

        let literal = select! {
            Token::Int(n) => Expr::Literal(Literal::Int(n)),
            Token::Float(x) => Expr::Literal(Literal::Float(x)),
            Token::NoneLit => Expr::Literal(Literal::None),
            Token::True => Expr::Literal(Literal::Bool(true)),
            Token::False => Expr::Literal(Literal::Bool(false)),
        };

        // Adjacent string literals concatenate
        let string = select! {
            Token::Str(s) => s,
        }
        .repeated()
        .at_least(1)
        .collect::<Vec<_>>()
        .map(|parts| Expr::Literal(Literal::Str(parts.concat())));

        // Comprehension targets: `x`, `k, v`, `(k, v)`
        let name_target = ident.clone().map(Target::Name);
        let target = name_target
            .clone()
            .or(name_target
                .separated_by(just(Token::Comma))
                .at_least(1)
                .allow_trailing()
                .collect::<Vec<_>>()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
                .map(Target::Tuple))
            .separated_by(just(Token::Comma))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|mut targets| {
                if targets.len() == 1 {
                    targets.remove(0)
                } else {
                    Target::Tuple(targets)
                }
            });

        let clause = just(Token::For)
            .ignore_then(target)
            .then_ignore(just(Token::In))
            .then(expr.clone())
            .then(
                just(Token::If)
                    .ignore_then(expr.clone())
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|((target, iter), conditions)| Clause {
                target,
                iter,
                conditions,
            });
        let clauses = clause.repeated().at_least(1).collect::<Vec<_>>();

        let items = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>();

        let list = choice((
            expr.clone()
                .then(clauses.clone())
                .map(|(element, clauses)| Expr::comprehension(CompKind::List, element, clauses)),
            items.clone().map(Expr::List),
        ))
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose));

        let pair = expr
            .clone()
            .then_ignore(just(Token::Colon))
            .then(expr.clone());
        let brace = choice((
            pair.clone()
                .then(clauses.clone())
                .map(|((key, value), clauses)| Expr::Comprehension {
                    kind: CompKind::Dict,
                    element: Box::new(key),
                    value: Some(Box::new(value)),
                    clauses,
                }),
            pair.separated_by(just(Token::Comma))
                .at_least(1)
                .allow_trailing()
                .collect::<Vec<_>>()
                .map(Expr::Dict),
            expr.clone()
                .then(clauses.clone())
                .map(|(element, clauses)| Expr::comprehension(CompKind::Set, element, clauses)),
            expr.clone()
                .separated_by(just(Token::Comma))
                .at_least(1)
                .allow_trailing()
                .collect::<Vec<_>>()
                .map(Expr::Set),
            empty().to(Expr::Dict(Vec::new())),
        ))
        .delimited_by(just(Token::BraceOpen), just(Token::BraceClose));

        let paren = choice((
            expr.clone().then(clauses.clone()).map(|(element, clauses)| {
                Expr::comprehension(CompKind::Generator, element, clauses)
            }),
            expr.clone()
                .then(just(Token::Comma).ignore_then(items.clone()).or_not())
                .map(|(first, rest)| match rest {
                    Some(mut rest) => {
                        rest.insert(0, first);
                        Expr::Tuple(rest)
                    }
                    None => first,
                }),
            empty().to(Expr::Tuple(Vec::new())),
        ))
        .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        let atom = choice((
            literal,
            string,
            ident.clone().map(Expr::Name),
            paren,
            list,
            brace,
        ))
        .boxed();

        // Postfix operations: calls, subscripts, attribute access
        let argument = choice((
            ident
                .clone()
                .then_ignore(just(Token::Assign))
                .then(expr.clone())
                .map(|(name, value)| Argument::Keyword(name, value)),
            expr.clone().map(Argument::Positional),
        ));
        let call = choice((
            expr.clone().then(clauses).map(|(element, clauses)| {
                vec![Argument::Positional(Expr::comprehension(
                    CompKind::Generator,
                    element,
                    clauses,
                ))]
            }),
            argument
                .separated_by(just(Token::Comma))
                .allow_trailing()
                .collect::<Vec<_>>(),
        ))
        .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
        .map(Postfix::Call);

        let bound = expr.clone().or_not();
        let slice = bound
            .clone()
            .then_ignore(just(Token::Colon))
            .then(bound.clone())
            .then(just(Token::Colon).ignore_then(bound).or_not())
            .map(|((lower, upper), step)| Postfix::Slice(lower, upper, step.flatten()));
        let subscript = choice((slice, expr.clone().map(Postfix::Index)))
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose));

        let attribute = just(Token::Dot)
            .ignore_then(ident.clone())
            .map(Postfix::Attribute);

        let postfix = atom
            .foldl(choice((call, subscript, attribute)).repeated(), apply_postfix)
            .boxed();

        // `**` binds tighter than a unary operator on its left, looser on its right
        let unary = recursive(|unary| {
            let power = postfix
                .then(just(Token::DoubleStar).ignore_then(unary.clone()).or_not())
                .map(|(base, exponent)| match exponent {
                    Some(exponent) => Expr::binary(BinaryOp::Pow, base, exponent),
                    None => base,
                });

            select! {
                Token::Minus => UnaryOp::Neg,
                Token::Plus => UnaryOp::Pos,
                Token::Tilde => UnaryOp::Invert,
            }
            .then(unary)
            .map(|(op, operand)| Expr::unary(op, operand))
            .or(power)
        })
        .boxed();

        let product = unary
            .clone()
            .foldl(
                select! {
                    Token::Star => BinaryOp::Mul,
                    Token::Slash => BinaryOp::Div,
                    Token::DoubleSlash => BinaryOp::FloorDiv,
                    Token::Percent => BinaryOp::Mod,
                }
                .then(unary)
                .repeated(),
                |left, (op, right)| Expr::binary(op, left, right),
            )
            .boxed();

        let sum = product
            .clone()
            .foldl(
                select! {
                    Token::Plus => BinaryOp::Add,
                    Token::Minus => BinaryOp::Sub,
                }
                .then(product)
                .repeated(),
                |left, (op, right)| Expr::binary(op, left, right),
            )
            .boxed();

        let compare_op = choice((
            select! {
                Token::EqEq => CompareOp::Eq,
                Token::NotEq => CompareOp::NotEq,
                Token::Less => CompareOp::Lt,
                Token::LessEq => CompareOp::LtE,
                Token::Greater => CompareOp::Gt,
                Token::GreaterEq => CompareOp::GtE,
                Token::In => CompareOp::In,
            },
            just(Token::Not).then(just(Token::In)).to(CompareOp::NotIn),
            just(Token::Is).then(just(Token::Not)).to(CompareOp::IsNot),
            just(Token::Is).to(CompareOp::Is),
        ));
        let comparison = sum
            .clone()
            .then(compare_op.then(sum).repeated().collect::<Vec<_>>())
            .map(|(left, comparisons)| {
                if comparisons.is_empty() {
                    left
                } else {
                    Expr::Compare {
                        left: Box::new(left),
                        comparisons,
                    }
                }
            })
            .boxed();

        let negation = just(Token::Not)
            .repeated()
            .foldr(comparison, |_, operand| Expr::unary(UnaryOp::Not, operand))
            .boxed();

        let conjunction = negation
            .clone()
            .foldl(
                just(Token::And).ignore_then(negation).repeated(),
                |left, right| Expr::boolean(BoolOp::And, left, right),
            )
            .boxed();

        let disjunction = conjunction
            .clone()
            .foldl(
                just(Token::Or).ignore_then(conjunction).repeated(),
                |left, right| Expr::boolean(BoolOp::Or, left, right),
            )
            .boxed();

        let conditional = disjunction
            .clone()
            .then(
                just(Token::If)
                    .ignore_then(disjunction)
                    .then_ignore(just(Token::Else))
                    .then(expr.clone())
                    .or_not(),
            )
            .map(|(body, rest)| match rest {
                Some((test, orelse)) => Expr::Conditional {
                    test: Box::new(test),
                    body: Box::new(body),
                    orelse: Box::new(orelse),
                },
                None => body,
            });

        let lambda = just(Token::Lambda)
            .ignore_then(
                ident
                    .separated_by(just(Token::Comma))
                    .collect::<Vec<_>>(),
            )
            .then_ignore(just(Token::Colon))
            .then(expr)
            .map(|(params, body)| Expr::Lambda {
                params,
                body: Arc::new(body),
            });

        lambda.or(conditional)
    })
}
