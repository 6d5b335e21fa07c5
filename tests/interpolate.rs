//! Integration tests for template interpolation

use interpol::{interpolate, scope, Error, Interpolator, Scope, ScopeBuilder, Value};
use pretty_assertions::assert_eq;

fn render(template: &str, scope: &Scope) -> Result<String, Error> {
    Interpolator::new().interpolate(template, scope)
}

fn is_malformed(result: Result<String, Error>) -> bool {
    matches!(result, Err(Error::MalformedTemplate { .. }))
}

#[test]
fn test_brace_free_text_is_unchanged() {
    for text in [
        "",
        "plain text",
        "multi\nline\ttext with 'quotes' and \"more\"",
        "unicode: żółć ✓",
        "symbols: !r :>10 % $ #",
    ] {
        assert_eq!(render(text, &Scope::new()).unwrap(), text);
    }
}

#[test]
fn test_doubled_braces_collapse() {
    for k in 0..5 {
        let template = format!("{}text{}", "{".repeat(2 * k), "}".repeat(2 * k));
        let expected = format!("{}text{}", "{".repeat(k), "}".repeat(k));
        assert_eq!(render(&template, &Scope::new()).unwrap(), expected);
    }
}

#[test]
fn test_unbalanced_braces_fail() {
    for template in ["{", "}", "{name", "text {{name}", "{name}}", "a } b", "{}"] {
        assert!(
            is_malformed(render(template, &Scope::new().with("name", 1))),
            "{template:?}"
        );
    }
}

#[test]
fn test_bare_name() {
    let scope = Scope::new().with("x", "13");
    assert_eq!(render("{x}", &scope).unwrap(), "13");
    assert_eq!(render("{ x }", &scope).unwrap(), "13");
    assert_eq!(
        render("{x}", &Scope::new()),
        Err(Error::UnresolvedName {
            name: "x".to_string()
        })
    );
}

#[test]
fn test_conversion_and_spec() {
    assert_eq!(render("{23:x}", &Scope::new()).unwrap(), "17");
    assert_eq!(render(r#"{"ab"!r}"#, &Scope::new()).unwrap(), "'ab'");
    assert_eq!(render("{'é'!a}", &Scope::new()).unwrap(), "'\\xe9'");
    assert_eq!(render("{'ab'!r:>6}", &Scope::new()).unwrap(), "  'ab'");
    assert_eq!(render("{3.14159:.2f}", &Scope::new()).unwrap(), "3.14");
}

#[test]
fn test_comprehension_placeholders() {
    let scope = Scope::new()
        .with("seq", vec![0, 1, 2])
        .with("pairs", vec![("a", 1), ("b", 2)]);
    assert_eq!(render("{{i for i in seq}}", &scope).unwrap(), "{0, 1, 2}");
    assert_eq!(
        render("{{k:v for k,v in pairs}}", &scope).unwrap(),
        "{'a': 1, 'b': 2}"
    );
    assert_eq!(
        render("x={{ i * i for i in seq if i }}", &scope).unwrap(),
        "x={1, 4}"
    );
}

#[test]
fn test_escapes_next_to_placeholders() {
    let scope = Scope::new().with("x", 1);
    assert_eq!(render("{{{x}}}", &scope).unwrap(), "{1}");
    assert_eq!(render("{{ {x} }}", &scope).unwrap(), "{ 1 }");
    assert_eq!(render("{{x}}", &scope).unwrap(), "{x}");
}

#[test]
fn test_braces_inside_placeholder_bodies() {
    let scope = Scope::new().with("d", Value::dict([("}", 1)]));
    assert_eq!(render("{'{'}", &scope).unwrap(), "{");
    assert_eq!(render("<{'a}b'}>", &scope).unwrap(), "<a}b>");
    assert_eq!(render("{len({1, 2})}", &scope).unwrap(), "2");
    assert_eq!(render("{d['}']:>3}", &scope).unwrap(), "  1");
    assert_eq!(render("{{it's}}", &scope).unwrap(), "{it's}");
}

#[test]
fn test_expressions() {
    let scope = Scope::new()
        .with("items", vec!["b", "a", "c"])
        .with("price", 2.5)
        .with("qty", 3)
        .with("user", Value::dict([("name", "ada")]));
    assert_eq!(render("{price * qty}", &scope).unwrap(), "7.5");
    assert_eq!(render("{', '.join(sorted(items))}", &scope).unwrap(), "a, b, c");
    assert_eq!(render("{user['name'].title()}", &scope).unwrap(), "Ada");
    assert_eq!(render("{len(items) if items else 'none'}", &scope).unwrap(), "3");
    assert_eq!(render("{items[-1]}{items[::-1][0]}", &scope).unwrap(), "cc");
    assert_eq!(render("{'yes' if qty != 3 else 'no'}", &scope).unwrap(), "no");
}

#[test]
fn test_malformed_placeholders() {
    let scope = Scope::new().with("x", 1);
    for template in ["{x = 1}", "{x!z}", "{x:}", "{ !r}", "{x +}", "{(lambda y=1: y)()}"] {
        assert!(is_malformed(render(template, &scope)), "{template:?}");
    }
}

#[test]
fn test_report_layout() {
    let scope = scope!(
        name = "Ada",
        langs = vec!["en", "fr"],
        score = 0.91234,
        count = 1234567
    );
    let template = "Name: {name:>6}|\nLangs: {', '.join(langs)}\nScore: {score:.1%}\n\
                    Count: {count:,}\nHex: {count:#x}\nRepr: {name!r}";
    let text = Interpolator::new().interpolate(template, &scope).unwrap();
    insta::assert_snapshot!(text, @r"
    Name:    Ada|
    Langs: en, fr
    Score: 91.2%
    Count: 1,234,567
    Hex: 0x12d687
    Repr: 'Ada'
    ");
}

#[test]
fn test_layered_scopes() {
    let engine = Interpolator::new();
    engine.register("env", "registered").unwrap();
    let scopes = ScopeBuilder::new()
        .globals(Scope::new().with("env", "global").with("region", "eu"))
        .enclosing(Scope::new().with("region", "us"))
        .locals(Scope::new().with("host", "web1"));
    assert_eq!(
        engine.interpolate_with("{host}.{region}.{env}", &scopes).unwrap(),
        "web1.us.global"
    );
}

#[test]
fn test_scope_isolation() {
    let engine = Interpolator::new();
    let scope = Scope::new().with("seq", vec![1, 2, 3]);
    assert_eq!(
        engine.interpolate("{[i * 2 for i in seq]}", &scope).unwrap(),
        "[2, 4, 6]"
    );
    assert_eq!(
        engine.interpolate("{i}", &scope),
        Err(Error::UnresolvedName {
            name: "i".to_string()
        })
    );
    assert!(engine.namespace().is_empty());
    assert_eq!(scope.len(), 1);
}

#[test]
fn test_macro_captures_locals() {
    let user = String::from("ada");
    let unread = 3;
    let text = interpolate!(
        "{user} has {unread} new message{'s' if unread != 1 else ''}",
        user,
        unread
    )
    .unwrap();
    assert_eq!(text, "ada has 3 new messages");
    assert_eq!(interpolate!("no placeholders").unwrap(), "no placeholders");
}

#[test]
fn test_native_functions() {
    let shout = Value::native("shout", |args: &[Value]| {
        Ok(Value::from(format!("{}!", args[0].to_str().to_uppercase())))
    });
    let scope = Scope::new().with("shout", shout).with("word", "hey");
    assert_eq!(render("{shout(word)}", &scope).unwrap(), "HEY!");
}

#[test]
fn test_error_report_mentions_problem() {
    let source = "total: {price";
    let err = render(source, &Scope::new()).unwrap_err();
    let report = err.report(source, "invoice.txt");
    assert!(report.contains("expected '}'"));
    assert!(report.contains("invoice.txt"));
}
