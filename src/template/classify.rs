//! Placeholder classification
//!
//! Splits the inner text of a placeholder into expression, optional
//! conversion and optional format spec, validates the expression and picks
//! the node kind.

use crate::error::Error;
use crate::expr::Evaluator;
use crate::format::{Conversion, FormatTemplate};
use crate::template::node::{Node, SYNTHETIC_NAME};

/// Replace control whitespace with spaces and trim
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' | '\x0b' | '\x0c' => ' ',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Characters outside string literals and brackets, with their byte offsets
fn top_level(text: &str) -> Vec<(usize, char)> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push((i, ch)),
            _ => {}
        }
    }
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether the keyword `word` starts at byte `at` as a whole word
fn word_at(text: &str, at: usize, word: &str) -> bool {
    text[at..].starts_with(word)
        && !text[..at].chars().next_back().is_some_and(is_word_char)
        && !text[at + word.len()..].chars().next().is_some_and(is_word_char)
}

/// Offset of the colon that starts the format spec
///
/// A top-level `lambda` before any colon means the whole text is the
/// expression.
fn spec_colon(text: &str) -> Option<usize> {
    for (i, ch) in top_level(text) {
        match ch {
            'l' if word_at(text, i, "lambda") => return None,
            ':' => return Some(i),
            _ => {}
        }
    }
    None
}

/// Offset of the `!` that introduces a conversion
fn conversion_bang(text: &str) -> Option<usize> {
    top_level(text)
        .into_iter()
        .rev()
        .find(|&(i, ch)| ch == '!' && !text[i + 1..].starts_with('='))
        .map(|(i, _)| i)
}

/// Offset of a top-level `=` that is not part of a comparison operator
fn assignment(text: &str) -> Option<usize> {
    top_level(text)
        .into_iter()
        .find(|&(i, ch)| {
            ch == '='
                && !text[..i].ends_with(&['=', '!', '<', '>'][..])
                && !text[i + 1..].starts_with('=')
        })
        .map(|(i, _)| i)
}

/// Classify the inner text of a placeholder found at byte `offset`
pub fn classify(inner: &str, offset: usize, evaluator: &dyn Evaluator) -> Result<Node, Error> {
    let whole = offset..offset + inner.len();

    let (head, spec) = match spec_colon(inner) {
        Some(colon) if colon + 1 == inner.len() => {
            return Err(Error::malformed(
                "format specifier required after ':'",
                offset + colon..offset + colon + 1,
            ));
        }
        Some(colon) => (&inner[..colon], Some(inner[colon + 1..].to_string())),
        None => (inner, None),
    };

    let (expr, conversion) = match conversion_bang(head) {
        Some(bang) => {
            let marker = &head[bang + 1..];
            let conversion = Conversion::from_marker(marker.trim()).ok_or_else(|| {
                Error::malformed(
                    "optional conversion must be one of 's', 'r', 'a'",
                    offset + bang..offset + head.len(),
                )
            })?;
            (&head[..bang], Some(conversion))
        }
        None => (head, None),
    };

    let source = normalize(expr);
    if source.is_empty() {
        return Err(Error::malformed("empty expression not allowed", whole));
    }
    let leading = expr.len() - expr.trim_start_matches(char::is_whitespace).len();

    if let Some(eq) = assignment(&source) {
        let at = offset + leading + eq;
        return Err(Error::malformed("assignment not permitted", at..at + 1));
    }
    if let Err(err) = evaluator.check(&source) {
        return Err(Error::malformed(
            format!("invalid expression '{}': {}", source, err),
            whole,
        ));
    }

    if evaluator.is_bare_identifier(&source) {
        let template = FormatTemplate::new(source.as_str())
            .with_conversion(conversion)
            .with_spec(spec);
        Ok(Node::constant(source, template))
    } else {
        let template = FormatTemplate::new(SYNTHETIC_NAME)
            .with_conversion(conversion)
            .with_spec(spec);
        Ok(Node::expression(source, template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprEvaluator;
    use pretty_assertions::assert_eq;

    fn run(inner: &str) -> Result<Node, Error> {
        classify(inner, 0, &ExprEvaluator::new())
    }

    fn message(inner: &str) -> String {
        match run(inner) {
            Err(Error::MalformedTemplate { message, .. }) => message,
            other => panic!("expected malformed template, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_name_is_constant() {
        assert_eq!(
            run(" name ").unwrap(),
            Node::constant("name", FormatTemplate::new("name"))
        );
    }

    #[test]
    fn test_conversion_and_spec() {
        let node = run(" name !r:>4").unwrap();
        let Node::Constant { template, .. } = &node else {
            panic!("expected constant");
        };
        assert_eq!(template.to_string(), "{name!r:>4}");
    }

    #[test]
    fn test_expression_uses_synthetic_name() {
        let node = run("price * 2:.2f").unwrap();
        assert_eq!(
            node,
            Node::expression(
                "price * 2",
                FormatTemplate::new("v").with_spec(Some(".2f".to_string()))
            )
        );
    }

    #[test]
    fn test_spec_is_kept_verbatim() {
        let Node::Constant { template, .. } = run("x: >6").unwrap() else {
            panic!("expected constant");
        };
        assert_eq!(template.spec(), Some(" >6"));
    }

    #[test]
    fn test_nested_colons_do_not_split() {
        for inner in ["d['a:b']", "seq[1:3]", "{'k': 1}['k']", "(lambda x: x + 1)(2)"] {
            let node = run(inner).unwrap();
            assert!(
                matches!(&node, Node::Expression { template, .. } if template.spec().is_none()),
                "{inner}"
            );
        }
    }

    #[test]
    fn test_top_level_lambda_has_no_spec() {
        let Node::Expression { source, template } = run("lambda x: x").unwrap() else {
            panic!("expected expression");
        };
        assert_eq!(source, "lambda x: x");
        assert_eq!(template.spec(), None);
        assert!(message("lambda: 1:>10").starts_with("invalid expression"));
    }

    #[test]
    fn test_not_equal_is_not_a_conversion() {
        let node = run("a != b").unwrap();
        assert!(matches!(node, Node::Expression { template, .. } if template.conversion().is_none()));
    }

    #[test]
    fn test_whitespace_is_normalized() {
        let Node::Expression { source, .. } = run("\n a +\tb \r").unwrap() else {
            panic!("expected expression");
        };
        assert_eq!(source, "a + b");
    }

    #[test]
    fn test_errors() {
        assert_eq!(message("x:"), "format specifier required after ':'");
        assert_eq!(message("x!z"), "optional conversion must be one of 's', 'r', 'a'");
        assert_eq!(message("x!"), "optional conversion must be one of 's', 'r', 'a'");
        assert_eq!(message("  "), "empty expression not allowed");
        assert_eq!(message("!r"), "empty expression not allowed");
        assert_eq!(message("x = 1"), "assignment not permitted");
        assert!(message("a +").starts_with("invalid expression 'a +'"));
    }

    #[test]
    fn test_comparisons_are_not_assignments() {
        for inner in ["a == b", "a <= b", "a >= b", "a != b", "f(key=1)"] {
            assert!(run(inner).is_ok(), "{inner}");
        }
    }

    #[test]
    fn test_assignment_span() {
        let err = classify("  x = 1", 10, &ExprEvaluator::new()).unwrap_err();
        assert_eq!(err, Error::malformed("assignment not permitted", 14..15));
    }
}
