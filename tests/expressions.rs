//! Integration tests for the expression evaluator

use interpol::{EvalError, Evaluator, ExprEvaluator, Scope, Value};
use pretty_assertions::assert_eq;

fn eval(source: &str) -> Result<Value, EvalError> {
    let scope = Scope::new()
        .with("n", 7)
        .with("xs", vec![3, 1, 2])
        .with("name", "Ada Lovelace")
        .with("point", (2, -5))
        .with(
            "config",
            Value::dict([("debug", Value::Bool(true)), ("level", Value::Int(3))]),
        );
    ExprEvaluator::new().evaluate(source, &scope)
}

fn repr(source: &str) -> String {
    match eval(source) {
        Ok(value) => value.repr(),
        Err(err) => panic!("{source}: {err}"),
    }
}

#[test]
fn test_arithmetic() {
    assert_eq!(repr("n * 2 + 1"), "15");
    assert_eq!(repr("n / 2"), "3.5");
    assert_eq!(repr("n // 2"), "3");
    assert_eq!(repr("-n // 2"), "-4");
    assert_eq!(repr("-n % 3"), "2");
    assert_eq!(repr("2 ** 10"), "1024");
    assert_eq!(repr("2 ** -1"), "0.5");
    assert_eq!(repr("0x10 + 0b11 + 0o7 + 1_000"), "1026");
}

#[test]
fn test_comparisons_and_logic() {
    assert_eq!(repr("1 < n <= 7"), "True");
    assert_eq!(repr("n in xs or 3 in xs"), "True");
    assert_eq!(repr("n not in xs and not False"), "True");
    assert_eq!(repr("None is None"), "True");
    assert_eq!(repr("xs and xs[0]"), "3");
    assert_eq!(repr("[] or 'empty'"), "'empty'");
}

#[test]
fn test_strings() {
    assert_eq!(repr("name.split()[0].upper()"), "'ADA'");
    assert_eq!(repr("name[:3] * 2"), "'AdaAda'");
    assert_eq!(repr("'-'.join(['a', 'b'])"), "'a-b'");
    assert_eq!(repr("'ab' 'cd'"), "'abcd'");
    assert_eq!(repr("str(n).zfill(3)"), "'007'");
    assert_eq!(repr("name.replace('Ada', 'A.')"), "'A. Lovelace'");
}

#[test]
fn test_containers() {
    assert_eq!(repr("sorted(xs, reverse=True)"), "[3, 2, 1]");
    assert_eq!(repr("point[1]"), "-5");
    assert_eq!(repr("config['level']"), "3");
    assert_eq!(repr("config.get('missing', 0)"), "0");
    assert_eq!(repr("list(zip(xs, 'abc'))"), "[(3, 'a'), (1, 'b'), (2, 'c')]");
    assert_eq!(repr("dict(enumerate('ab'))"), "{0: 'a', 1: 'b'}");
    assert_eq!(repr("{1, 2, 2, 3}"), "{1, 2, 3}");
    assert_eq!(repr("(1,)"), "(1,)");
    assert_eq!(repr("xs[::-1]"), "[2, 1, 3]");
}

#[test]
fn test_sequence_repetition_and_extreme_slices() {
    assert_eq!(repr("[1, 2] * 2"), "[1, 2, 1, 2]");
    assert_eq!(repr("(1,) * 3"), "(1, 1, 1)");
    assert_eq!(repr("2 * xs"), "[3, 1, 2, 3, 1, 2]");
    assert_eq!(repr("xs * -1"), "[]");
    assert_eq!(repr("name[1::9223372036854775807]"), "'d'");
    assert_eq!(repr("xs[::-9223372036854775807 - 1]"), "[2]");
    assert_eq!(repr("xs[-9223372036854775807:9223372036854775807]"), "[3, 1, 2]");
    assert!(matches!(eval("[0] * 10 ** 12"), Err(EvalError::Runtime(_))));
}

#[test]
fn test_comprehensions() {
    assert_eq!(repr("[x * x for x in xs if x > 1]"), "[9, 4]");
    assert_eq!(repr("{x % 2 for x in range(5)}"), "{0, 1}");
    assert_eq!(
        repr("{k: v for k, v in config.items()}"),
        "{'debug': True, 'level': 3}"
    );
    assert_eq!(repr("[(i, j) for i in range(2) for j in range(i)]"), "[(1, 0)]");
    assert_eq!(repr("sum(x for x in xs)"), "6");
}

#[test]
fn test_lambdas_and_builtins() {
    assert_eq!(repr("list(map(lambda x: x + n, xs))"), "[10, 8, 9]");
    assert_eq!(repr("list(filter(lambda x: x % 2, xs))"), "[3, 1]");
    assert_eq!(repr("sorted(['bb', 'a', 'ccc'], key=len)"), "['a', 'bb', 'ccc']");
    assert_eq!(repr("(max(xs), min(xs), abs(-n))"), "(3, 1, 7)");
    assert_eq!(repr("(round(2.5), round(3.14159, 2))"), "(2, 3.14)");
    assert_eq!(
        repr("(hex(255), bin(5), oct(8), chr(65), ord('a'))"),
        "('0xff', '0b101', '0o10', 'A', 97)"
    );
    assert_eq!(repr("int('42') + int(3.9) + float('1.5')"), "46.5");
}

#[test]
fn test_errors() {
    assert_eq!(
        eval("missing + 1"),
        Err(EvalError::UnresolvedName {
            name: "missing".to_string()
        })
    );
    assert!(matches!(eval("1 / 0"), Err(EvalError::Runtime(_))));
    assert!(matches!(eval("xs[10]"), Err(EvalError::Runtime(_))));
    assert!(matches!(eval("config['nope']"), Err(EvalError::Runtime(_))));
    assert!(matches!(eval("'a' + 1"), Err(EvalError::Type(_))));
    assert!(matches!(eval("n(1)"), Err(EvalError::Type(_))));
    assert!(matches!(eval("9223372036854775807 + 1"), Err(EvalError::Runtime(_))));
    assert!(matches!(eval("1 +"), Err(EvalError::Syntax { .. })));
}

#[test]
fn test_evaluator_checks() {
    let evaluator = ExprEvaluator::new();
    assert!(evaluator.check("a.b(c)[d]").is_ok());
    assert!(evaluator.check("a = 1").is_err());
    assert!(evaluator.is_bare_identifier("value"));
    assert!(!evaluator.is_bare_identifier("value.attr"));
    assert!(evaluator.is_valid_comprehension("{k: v for k, v in pairs}"));
    assert!(!evaluator.is_valid_comprehension("{k: v}"));
}
