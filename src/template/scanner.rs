//! Template scanner
//!
//! Splits a template into literal text and placeholders. Each scan step
//! reads literal text up to the next brace, an optional left brace run, the
//! placeholder body and an optional right brace run, then decides what the
//! group stands for.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::EngineConfig;
use crate::error::Error;
use crate::expr::Evaluator;
use crate::format::FormatTemplate;
use crate::template::classify::{classify, normalize};
use crate::template::escape::{collapse, BraceRun, Side};
use crate::template::node::{Node, SYNTHETIC_NAME};

static LEFT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A\{(?:\s*\{)*").expect("valid left run regex"));

static RIGHT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A\}(?:\s*\})*").expect("valid right run regex"));

static COMPREHENSION_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*.+?\s+for\s+[A-Za-z_(][\w\s,()]*\s+in\s+.+$")
        .expect("valid comprehension regex")
});

/// Collects output nodes, merging adjacent literal text
#[derive(Default)]
struct NodeSink {
    nodes: Vec<Node>,
    text: String,
}

impl NodeSink {
    fn text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn node(&mut self, node: Node) {
        self.flush();
        self.nodes.push(node);
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            let content = std::mem::take(&mut self.text);
            self.nodes.push(Node::text(content));
        }
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush();
        self.nodes
    }
}

/// One scan step: brace runs around a placeholder body
struct Group<'t> {
    left: Option<BraceRun<'t>>,
    inner: &'t str,
    inner_offset: usize,
    right: Option<BraceRun<'t>>,
}

fn next_brace(template: &str, from: usize) -> usize {
    template[from..]
        .find(|c: char| c == '{' || c == '}')
        .map_or(template.len(), |i| from + i)
}

/// The brace run matched by `pattern` starting exactly at `at`
fn run_at<'t>(pattern: &Regex, template: &'t str, at: usize) -> Option<BraceRun<'t>> {
    pattern
        .find(&template[at..])
        .map(|m| BraceRun::new(&template[at..at + m.end()], at))
}

/// End of the placeholder body starting at `start`
///
/// The body ends at the first `}` outside string literals and brackets, so
/// `{'}'}` and `{len({1, 2})}` are single placeholders. A body that never
/// closes that way ends at the next brace of either kind.
fn body_end(template: &str, start: usize) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in template[start..].char_indices() {
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
            '}' if depth == 0 => return start + i,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    next_brace(template, start)
}

/// Parse `template` into its node sequence
pub fn parse(
    template: &str,
    evaluator: &dyn Evaluator,
    config: &EngineConfig,
) -> Result<Vec<Node>, Error> {
    let mut sink = NodeSink::default();
    let mut pos = 0;

    while pos < template.len() {
        let brace = next_brace(template, pos);
        sink.text(&template[pos..brace]);
        if brace == template.len() {
            break;
        }

        let left = run_at(&LEFT_RUN, template, brace);
        let inner_offset = left.map_or(brace, |run| run.offset + run.text.len());
        // an even left run opens no placeholder of its own; its body is plain text
        let inner_end = match left {
            Some(run) if run.braces() % 2 == 1 => body_end(template, inner_offset),
            Some(_) => next_brace(template, inner_offset),
            None => inner_offset,
        };
        let right = run_at(&RIGHT_RUN, template, inner_end);
        pos = right.map_or(inner_end, |run| run.offset + run.text.len());

        let group = Group {
            left,
            inner: &template[inner_offset..inner_end],
            inner_offset,
            right,
        };

        match (group.left, group.right) {
            (None, None) => sink.text(group.inner),
            (Some(left), None) => {
                let literal = collapse(left, Side::Left, 0)
                    .map_err(|_| Error::malformed("expected '}'", left.offset..template.len()))?;
                sink.text(&literal);
                sink.text(group.inner);
            }
            (None, Some(right)) => {
                sink.text(group.inner);
                sink.text(&collapse(right, Side::Right, 0)?);
            }
            (Some(left), Some(right)) if group.inner.trim().is_empty() => {
                sink.text(&collapse(left, Side::Left, 0)?);
                sink.text(group.inner);
                sink.text(&collapse(right, Side::Right, 0)?);
            }
            (Some(left), Some(right)) => {
                placeholder(&mut sink, &group, left, right, evaluator, config)?;
            }
        }
    }

    Ok(sink.finish())
}

/// Handle a group with braces on both sides and non-blank inner text
fn placeholder(
    sink: &mut NodeSink,
    group: &Group<'_>,
    left: BraceRun<'_>,
    right: BraceRun<'_>,
    evaluator: &dyn Evaluator,
    config: &EngineConfig,
) -> Result<(), Error> {
    let inner = group.inner;

    if left.braces() >= 2 && right.braces() >= 2 && COMPREHENSION_SHAPE.is_match(inner) {
        let source = format!("{{{}}}", normalize(inner));
        if evaluator.is_valid_comprehension(&source) {
            sink.text(&collapse(left, Side::Left, 2)?);
            sink.node(Node::expression(source, FormatTemplate::new(SYNTHETIC_NAME)));
            sink.text(&collapse(right, Side::Right, 2)?);
            return Ok(());
        }
        if config.strict_comprehensions {
            let span = left.offset..right.offset + right.text.len();
            return Err(Error::malformed(format!("invalid comprehension '{}'", source), span));
        }
        tracing::trace!(inner, "comprehension-shaped placeholder is not a comprehension");
    }

    if left.braces() % 2 == 0 && right.braces() % 2 == 0 {
        sink.text(&collapse(left, Side::Left, 0)?);
        sink.text(inner);
        sink.text(&collapse(right, Side::Right, 0)?);
        return Ok(());
    }

    sink.text(&collapse(left, Side::Left, 1)?);
    sink.node(classify(inner, group.inner_offset, evaluator)?);
    sink.text(&collapse(right, Side::Right, 1)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprEvaluator;
    use pretty_assertions::assert_eq;

    fn scan(template: &str) -> Result<Vec<Node>, Error> {
        parse(template, &ExprEvaluator::new(), &EngineConfig::default())
    }

    fn malformed(template: &str) -> String {
        match scan(template) {
            Err(Error::MalformedTemplate { message, .. }) => message,
            other => panic!("expected malformed template for {template:?}, got {other:?}"),
        }
    }

    fn constant(name: &str) -> Node {
        Node::constant(name, FormatTemplate::new(name))
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(scan("hello world").unwrap(), vec![Node::text("hello world")]);
        assert_eq!(scan("").unwrap(), vec![]);
    }

    #[test]
    fn test_placeholders_split_text() {
        assert_eq!(
            scan("Hello {name}, {greeting}!").unwrap(),
            vec![
                Node::text("Hello "),
                constant("name"),
                Node::text(", "),
                constant("greeting"),
                Node::text("!"),
            ]
        );
    }

    #[test]
    fn test_adjacent_placeholders() {
        assert_eq!(scan("{a}{b}").unwrap(), vec![constant("a"), constant("b")]);
    }

    #[test]
    fn test_escapes_merge_into_one_text_node() {
        assert_eq!(scan("a {{b}} c").unwrap(), vec![Node::text("a {b} c")]);
        assert_eq!(scan("{{{{x}}}}").unwrap(), vec![Node::text("{{x}}")]);
        assert_eq!(scan("{{ }}").unwrap(), vec![Node::text("{ }")]);
        assert_eq!(scan("x }} y {{").unwrap(), vec![Node::text("x } y {")]);
    }

    #[test]
    fn test_escapes_around_placeholder() {
        assert_eq!(
            scan("{{{x}}}").unwrap(),
            vec![Node::text("{"), constant("x"), Node::text("}")]
        );
        assert_eq!(
            scan("{{ {x} }}").unwrap(),
            vec![Node::text("{ "), constant("x"), Node::text(" }")]
        );
    }

    #[test]
    fn test_comprehension_placeholders() {
        let nodes = scan("{{i for i in seq}}").unwrap();
        assert_eq!(
            nodes,
            vec![Node::expression(
                "{i for i in seq}",
                FormatTemplate::new(SYNTHETIC_NAME)
            )]
        );

        let nodes = scan("<{{ k:v for k,v in pairs }}>").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(&nodes[1], Node::Expression { source, .. } if source == "{k:v for k,v in pairs}"));
    }

    #[test]
    fn test_comprehension_shape_without_valid_syntax_is_escaped() {
        assert_eq!(
            scan("{{x for x in y z}}").unwrap(),
            vec![Node::text("{x for x in y z}")]
        );
    }

    #[test]
    fn test_strict_comprehensions() {
        let config = EngineConfig::new().with_strict_comprehensions(true);
        let result = parse("{{x for x in y z}}", &ExprEvaluator::new(), &config);
        assert!(matches!(
            result,
            Err(Error::MalformedTemplate { message, .. }) if message.starts_with("invalid comprehension")
        ));
    }

    #[test]
    fn test_unbalanced_braces() {
        assert_eq!(malformed("{"), "expected '}'");
        assert_eq!(malformed("{name"), "expected '}'");
        assert_eq!(malformed("a {{{ b"), "expected '}'");
        assert_eq!(malformed("}"), "single '}' encountered");
        assert_eq!(malformed("text {{name}"), "single '{' encountered");
        assert_eq!(malformed("{name}}"), "single '}' encountered");
        assert_eq!(malformed("{}"), "single '{' encountered");
    }

    #[test]
    fn test_error_spans_point_into_template() {
        let err = scan("ok } no").unwrap_err();
        assert_eq!(err, Error::malformed("single '}' encountered", 3..4));
    }

    #[test]
    fn test_braces_inside_placeholder_strings() {
        assert_eq!(
            scan("{'{'}").unwrap(),
            vec![Node::expression("'{'", FormatTemplate::new(SYNTHETIC_NAME))]
        );
        assert_eq!(
            scan("<{'a}b'}>").unwrap(),
            vec![
                Node::text("<"),
                Node::expression("'a}b'", FormatTemplate::new(SYNTHETIC_NAME)),
                Node::text(">"),
            ]
        );
        assert_eq!(
            scan(r#"{"\"}"}"#).unwrap(),
            vec![Node::expression(r#""\"}""#, FormatTemplate::new(SYNTHETIC_NAME))]
        );
    }

    #[test]
    fn test_nested_braces_inside_placeholder() {
        assert_eq!(
            scan("{len({1, 2})} {d[{'k': 1}['k']]}").unwrap(),
            vec![
                Node::expression("len({1, 2})", FormatTemplate::new(SYNTHETIC_NAME)),
                Node::text(" "),
                Node::expression("d[{'k': 1}['k']]", FormatTemplate::new(SYNTHETIC_NAME)),
            ]
        );
    }

    #[test]
    fn test_escaped_text_is_not_scanned_as_code() {
        assert_eq!(scan("{{it's}}").unwrap(), vec![Node::text("{it's}")]);
        assert_eq!(
            scan("{{ a {b} }}").unwrap(),
            vec![Node::text("{ a "), constant("b"), Node::text(" }")]
        );
        assert_eq!(malformed("{'unterminated"), "expected '}'");
    }

    #[test]
    fn test_multiline_placeholder() {
        assert_eq!(
            scan("{\n  a +\n  b\n}").unwrap(),
            vec![Node::expression("a +   b", FormatTemplate::new(SYNTHETIC_NAME))]
        );
    }
}
