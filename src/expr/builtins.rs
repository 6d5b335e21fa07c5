//! Builtin functions and methods available to template expressions

use std::cmp::Ordering;
use std::sync::Arc;

use super::interp::{binary_op, Interpreter, MAX_SEQUENCE_LEN};
use super::EvalError;
use crate::expr::ast::BinaryOp;
use crate::value::{Number, Value};

/// A builtin function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Str,
    Repr,
    Ascii,
    Int,
    Float,
    Bool,
    Abs,
    Min,
    Max,
    Sum,
    Round,
    Sorted,
    Reversed,
    Range,
    List,
    Tuple,
    Set,
    Dict,
    Enumerate,
    Zip,
    Map,
    Filter,
    Any,
    All,
    Chr,
    Ord,
    Hex,
    Oct,
    Bin,
}

impl Builtin {
    const ALL: [Builtin; 30] = [
        Builtin::Len,
        Builtin::Str,
        Builtin::Repr,
        Builtin::Ascii,
        Builtin::Int,
        Builtin::Float,
        Builtin::Bool,
        Builtin::Abs,
        Builtin::Min,
        Builtin::Max,
        Builtin::Sum,
        Builtin::Round,
        Builtin::Sorted,
        Builtin::Reversed,
        Builtin::Range,
        Builtin::List,
        Builtin::Tuple,
        Builtin::Set,
        Builtin::Dict,
        Builtin::Enumerate,
        Builtin::Zip,
        Builtin::Map,
        Builtin::Filter,
        Builtin::Any,
        Builtin::All,
        Builtin::Chr,
        Builtin::Ord,
        Builtin::Hex,
        Builtin::Oct,
        Builtin::Bin,
    ];

    /// Find the builtin bound to `name`
    pub fn lookup(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Str => "str",
            Builtin::Repr => "repr",
            Builtin::Ascii => "ascii",
            Builtin::Int => "int",
            Builtin::Float => "float",
            Builtin::Bool => "bool",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Sum => "sum",
            Builtin::Round => "round",
            Builtin::Sorted => "sorted",
            Builtin::Reversed => "reversed",
            Builtin::Range => "range",
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Set => "set",
            Builtin::Dict => "dict",
            Builtin::Enumerate => "enumerate",
            Builtin::Zip => "zip",
            Builtin::Map => "map",
            Builtin::Filter => "filter",
            Builtin::Any => "any",
            Builtin::All => "all",
            Builtin::Chr => "chr",
            Builtin::Ord => "ord",
            Builtin::Hex => "hex",
            Builtin::Oct => "oct",
            Builtin::Bin => "bin",
        }
    }

    /// Keyword arguments this builtin accepts
    fn keywords(self) -> &'static [&'static str] {
        match self {
            Builtin::Sorted => &["key", "reverse"],
            Builtin::Min | Builtin::Max => &["key"],
            Builtin::Sum | Builtin::Enumerate => &["start"],
            _ => &[],
        }
    }

    pub(crate) fn call(
        self,
        interp: &Interpreter<'_>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, EvalError> {
        let name = self.name();
        if let Some((unknown, _)) = kwargs
            .iter()
            .find(|(k, _)| !self.keywords().contains(&k.as_str()))
        {
            return Err(EvalError::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                name, unknown
            )));
        }
        let keyword = |key: &str| {
            kwargs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        match self {
            Builtin::Len => {
                arity(name, &args, 1, 1)?;
                length(&args[0]).map(Value::from)
            }
            Builtin::Str => {
                arity(name, &args, 0, 1)?;
                Ok(Value::from(args.first().map(Value::to_str).unwrap_or_default()))
            }
            Builtin::Repr => {
                arity(name, &args, 1, 1)?;
                Ok(Value::from(args[0].repr()))
            }
            Builtin::Ascii => {
                arity(name, &args, 1, 1)?;
                Ok(Value::from(args[0].ascii()))
            }
            Builtin::Int => {
                arity(name, &args, 0, 2)?;
                to_int(args.first(), args.get(1))
            }
            Builtin::Float => {
                arity(name, &args, 0, 1)?;
                to_float(args.first())
            }
            Builtin::Bool => {
                arity(name, &args, 0, 1)?;
                Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
            }
            Builtin::Abs => {
                arity(name, &args, 1, 1)?;
                match args[0].as_number() {
                    Some(Number::Int(n)) => n
                        .checked_abs()
                        .map(Value::Int)
                        .ok_or_else(|| EvalError::runtime("integer overflow")),
                    Some(Number::Float(x)) => Ok(Value::Float(x.abs())),
                    None => Err(bad_argument(name, &args[0])),
                }
            }
            Builtin::Min | Builtin::Max => {
                if args.is_empty() {
                    return Err(EvalError::type_error(format!(
                        "{}() expected at least 1 argument, got 0",
                        name
                    )));
                }
                let items = if args.len() == 1 {
                    args[0].iter_items()?
                } else {
                    args
                };
                extremum(interp, name, items, keyword("key"), self == Builtin::Max)
            }
            Builtin::Sum => {
                arity(name, &args, 1, 2)?;
                let start = args
                    .get(1)
                    .cloned()
                    .or_else(|| keyword("start"))
                    .unwrap_or(Value::Int(0));
                args[0]
                    .iter_items()?
                    .iter()
                    .try_fold(start, |total, item| binary_op(BinaryOp::Add, &total, item))
            }
            Builtin::Round => {
                arity(name, &args, 1, 2)?;
                round(&args[0], args.get(1))
            }
            Builtin::Sorted => {
                arity(name, &args, 1, 1)?;
                let reverse = keyword("reverse").is_some_and(|v| v.is_truthy());
                let items = sort(interp, args[0].iter_items()?, keyword("key"), reverse)?;
                Ok(Value::List(Arc::new(items)))
            }
            Builtin::Reversed => {
                arity(name, &args, 1, 1)?;
                if matches!(args[0], Value::Set(_)) {
                    return Err(EvalError::type_error("'set' object is not reversible"));
                }
                let mut items = args[0].iter_items()?;
                items.reverse();
                Ok(Value::List(Arc::new(items)))
            }
            Builtin::Range => {
                arity(name, &args, 1, 3)?;
                range(&args)
            }
            Builtin::List => {
                arity(name, &args, 0, 1)?;
                Ok(Value::List(Arc::new(items_or_empty(args.first())?)))
            }
            Builtin::Tuple => {
                arity(name, &args, 0, 1)?;
                Ok(Value::Tuple(Arc::new(items_or_empty(args.first())?)))
            }
            Builtin::Set => {
                arity(name, &args, 0, 1)?;
                Ok(Value::set(items_or_empty(args.first())?))
            }
            Builtin::Dict => {
                arity(name, &args, 0, 1)?;
                match args.first() {
                    None => Ok(Value::dict(Vec::<(Value, Value)>::new())),
                    Some(Value::Dict(pairs)) => Ok(Value::Dict(Arc::clone(pairs))),
                    Some(other) => {
                        let mut entries = Vec::new();
                        for item in other.iter_items()? {
                            match item.iter_items()?.as_slice() {
                                [key, value] => entries.push((key.clone(), value.clone())),
                                other => {
                                    return Err(EvalError::runtime(format!(
                                        "dictionary update sequence element has length {}; 2 is required",
                                        other.len()
                                    )))
                                }
                            }
                        }
                        Ok(Value::dict(entries))
                    }
                }
            }
            Builtin::Enumerate => {
                arity(name, &args, 1, 2)?;
                let start = match args.get(1).cloned().or_else(|| keyword("start")) {
                    Some(value) => value.as_int().ok_or_else(|| bad_argument(name, &value))?,
                    None => 0,
                };
                let items = args[0].iter_items()?;
                let mut out = Vec::with_capacity(items.len());
                for (offset, item) in items.into_iter().enumerate() {
                    let index = i64::try_from(offset)
                        .ok()
                        .and_then(|o| start.checked_add(o))
                        .ok_or_else(|| EvalError::runtime("integer overflow"))?;
                    out.push(Value::tuple(vec![Value::Int(index), item]));
                }
                Ok(Value::List(Arc::new(out)))
            }
            Builtin::Zip => {
                let columns = args
                    .iter()
                    .map(Value::iter_items)
                    .collect::<Result<Vec<_>, _>>()?;
                let len = columns.iter().map(Vec::len).min().unwrap_or(0);
                Ok((0..len)
                    .map(|i| Value::tuple(columns.iter().map(|c| c[i].clone())))
                    .collect())
            }
            Builtin::Map => {
                if args.len() < 2 {
                    return Err(EvalError::type_error(
                        "map() must have at least two arguments.",
                    ));
                }
                let columns = args[1..]
                    .iter()
                    .map(Value::iter_items)
                    .collect::<Result<Vec<_>, _>>()?;
                let len = columns.iter().map(Vec::len).min().unwrap_or(0);
                (0..len)
                    .map(|i| {
                        let call_args = columns.iter().map(|c| c[i].clone()).collect();
                        interp.call_function(&args[0], call_args, Vec::new())
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(|items| Value::List(Arc::new(items)))
            }
            Builtin::Filter => {
                arity(name, &args, 2, 2)?;
                let mut out = Vec::new();
                for item in args[1].iter_items()? {
                    let keep = match &args[0] {
                        Value::None => item.is_truthy(),
                        func => interp
                            .call_function(func, vec![item.clone()], Vec::new())?
                            .is_truthy(),
                    };
                    if keep {
                        out.push(item);
                    }
                }
                Ok(Value::List(Arc::new(out)))
            }
            Builtin::Any => {
                arity(name, &args, 1, 1)?;
                Ok(Value::Bool(args[0].iter_items()?.iter().any(Value::is_truthy)))
            }
            Builtin::All => {
                arity(name, &args, 1, 1)?;
                Ok(Value::Bool(args[0].iter_items()?.iter().all(Value::is_truthy)))
            }
            Builtin::Chr => {
                arity(name, &args, 1, 1)?;
                let code = integer(name, &args[0])?;
                u32::try_from(code)
                    .ok()
                    .and_then(char::from_u32)
                    .map(Value::from)
                    .ok_or_else(|| EvalError::runtime("chr() arg not in range(0x110000)"))
            }
            Builtin::Ord => {
                arity(name, &args, 1, 1)?;
                let text = args[0].as_str().ok_or_else(|| {
                    EvalError::type_error(format!(
                        "ord() expected string of length 1, but {} found",
                        args[0].type_name()
                    ))
                })?;
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Int(i64::from(u32::from(c)))),
                    _ => Err(EvalError::type_error(format!(
                        "ord() expected a character, but string of length {} found",
                        text.chars().count()
                    ))),
                }
            }
            Builtin::Hex | Builtin::Oct | Builtin::Bin => {
                arity(name, &args, 1, 1)?;
                let n = integer(name, &args[0])?;
                let digits = match self {
                    Builtin::Hex => format!("0x{:x}", n.unsigned_abs()),
                    Builtin::Oct => format!("0o{:o}", n.unsigned_abs()),
                    _ => format!("0b{:b}", n.unsigned_abs()),
                };
                Ok(Value::from(if n < 0 {
                    format!("-{}", digits)
                } else {
                    digits
                }))
            }
        }
    }
}

fn arity(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    let given = args.len();
    if (min..=max).contains(&given) {
        return Ok(());
    }
    let message = if min == max {
        format!("{}() takes exactly {} argument(s) ({} given)", name, min, given)
    } else if given < min {
        format!("{}() expected at least {} argument(s), got {}", name, min, given)
    } else {
        format!("{}() expected at most {} argument(s), got {}", name, max, given)
    };
    Err(EvalError::type_error(message))
}

fn bad_argument(name: &str, value: &Value) -> EvalError {
    EvalError::type_error(format!(
        "bad operand type for {}(): '{}'",
        name,
        value.type_name()
    ))
}

fn integer(name: &str, value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(_) | Value::Bool(_) => Ok(value.as_int().unwrap_or(0)),
        other => Err(EvalError::type_error(format!(
            "'{}' object cannot be interpreted as an integer (in {}())",
            other.type_name(),
            name
        ))),
    }
}

fn length(value: &Value) -> Result<usize, EvalError> {
    match value {
        Value::Str(s) => Ok(s.chars().count()),
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(items.len()),
        Value::Dict(pairs) => Ok(pairs.len()),
        other => Err(EvalError::type_error(format!(
            "object of type '{}' has no len()",
            other.type_name()
        ))),
    }
}

fn items_or_empty(value: Option<&Value>) -> Result<Vec<Value>, EvalError> {
    value.map_or(Ok(Vec::new()), Value::iter_items)
}

fn to_int(value: Option<&Value>, base: Option<&Value>) -> Result<Value, EvalError> {
    let Some(value) = value else {
        return Ok(Value::Int(0));
    };
    if let Some(base) = base {
        let Value::Str(text) = value else {
            return Err(EvalError::type_error(
                "int() can't convert non-string with explicit base",
            ));
        };
        let radix = integer("int", base)?;
        return parse_int(text, radix);
    }
    match value {
        Value::Int(_) | Value::Bool(_) => Ok(Value::Int(value.as_int().unwrap_or(0))),
        Value::Float(x) => {
            if x.is_nan() {
                return Err(EvalError::runtime("cannot convert float NaN to integer"));
            }
            if x.is_infinite() {
                return Err(EvalError::runtime(
                    "cannot convert float infinity to integer",
                ));
            }
            let truncated = x.trunc();
            if truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
                return Err(EvalError::runtime("integer overflow"));
            }
            Ok(Value::Int(truncated as i64))
        }
        Value::Str(text) => parse_int(text, 10),
        other => Err(EvalError::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn parse_int(text: &str, radix: i64) -> Result<Value, EvalError> {
    let invalid = || {
        EvalError::runtime(format!(
            "invalid literal for int() with base {}: {}",
            radix,
            Value::from(text).repr()
        ))
    };
    let radix = u32::try_from(radix)
        .ok()
        .filter(|r| (2..=36).contains(r))
        .ok_or_else(|| EvalError::runtime("int() base must be >= 2 and <= 36"))?;
    let trimmed = text.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits = match radix {
        16 => strip_radix_prefix(digits, "0x"),
        8 => strip_radix_prefix(digits, "0o"),
        2 => strip_radix_prefix(digits, "0b"),
        _ => digits,
    };
    if digits.is_empty() || digits.starts_with('_') || digits.ends_with('_') {
        return Err(invalid());
    }
    let magnitude = i64::from_str_radix(&digits.replace('_', ""), radix).map_err(|_| invalid())?;
    Ok(Value::Int(if negative { -magnitude } else { magnitude }))
}

fn strip_radix_prefix<'t>(digits: &'t str, prefix: &str) -> &'t str {
    if digits.len() >= 2 && digits[..2].eq_ignore_ascii_case(prefix) {
        &digits[2..]
    } else {
        digits
    }
}

fn to_float(value: Option<&Value>) -> Result<Value, EvalError> {
    match value {
        None => Ok(Value::Float(0.0)),
        Some(Value::Str(text)) => text
            .trim()
            .replace('_', "")
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| {
                EvalError::runtime(format!(
                    "could not convert string to float: {}",
                    Value::from(text.as_ref()).repr()
                ))
            }),
        Some(other) => other
            .as_number()
            .map(|n| Value::Float(n.as_f64()))
            .ok_or_else(|| {
                EvalError::type_error(format!(
                    "float() argument must be a string or a number, not '{}'",
                    other.type_name()
                ))
            }),
    }
}

fn round(value: &Value, ndigits: Option<&Value>) -> Result<Value, EvalError> {
    let ndigits = match ndigits {
        None | Some(Value::None) => None,
        Some(n) => Some(integer("round", n)?),
    };
    match (value.as_number(), ndigits) {
        (Some(Number::Int(n)), None) => Ok(Value::Int(n)),
        (Some(Number::Int(n)), Some(digits)) if digits >= 0 => Ok(Value::Int(n)),
        (Some(Number::Int(n)), Some(digits)) => {
            let factor = u32::try_from(digits.unsigned_abs())
                .ok()
                .and_then(|d| 10_i64.checked_pow(d));
            match factor {
                Some(factor) => {
                    let scaled = (n as f64 / factor as f64).round_ties_even();
                    Ok(Value::Int(scaled as i64 * factor))
                }
                None => Ok(Value::Int(0)),
            }
        }
        (Some(Number::Float(x)), None) => {
            if !x.is_finite() {
                return Err(EvalError::runtime(format!(
                    "cannot convert float {} to integer",
                    crate::value::float_repr(x)
                )));
            }
            Ok(Value::Int(x.round_ties_even() as i64))
        }
        (Some(Number::Float(x)), Some(digits)) => {
            let digits = i32::try_from(digits.clamp(-308, 308)).unwrap_or(0);
            let factor = 10_f64.powi(digits);
            Ok(Value::Float((x * factor).round_ties_even() / factor))
        }
        (None, _) => Err(EvalError::type_error(format!(
            "type {} doesn't define __round__ method",
            value.type_name()
        ))),
    }
}

fn range(args: &[Value]) -> Result<Value, EvalError> {
    let bounds = args
        .iter()
        .map(|v| integer("range", v))
        .collect::<Result<Vec<_>, _>>()?;
    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => (0, 0, 1),
    };
    if step == 0 {
        return Err(EvalError::runtime("range() arg 3 must not be zero"));
    }
    let span = if step > 0 {
        (i128::from(stop) - i128::from(start) + i128::from(step) - 1) / i128::from(step)
    } else {
        (i128::from(start) - i128::from(stop) - i128::from(step) - 1) / -i128::from(step)
    };
    if span > MAX_SEQUENCE_LEN as i128 {
        return Err(EvalError::runtime("range() result is too large"));
    }
    let count = usize::try_from(span.max(0)).unwrap_or(0);
    let items = (0..count)
        .map(|i| Value::Int(start + step * i as i64))
        .collect::<Vec<_>>();
    Ok(Value::List(Arc::new(items)))
}

fn keyed(
    interp: &Interpreter<'_>,
    items: Vec<Value>,
    key: Option<&Value>,
) -> Result<Vec<(Value, Value)>, EvalError> {
    items
        .into_iter()
        .map(|item| {
            let sort_key = match key {
                Some(Value::None) | None => item.clone(),
                Some(func) => interp.call_function(func, vec![item.clone()], Vec::new())?,
            };
            Ok((sort_key, item))
        })
        .collect()
}

fn sort(
    interp: &Interpreter<'_>,
    items: Vec<Value>,
    key: Option<Value>,
    reverse: bool,
) -> Result<Vec<Value>, EvalError> {
    let mut entries = keyed(interp, items, key.as_ref())?;
    let mut failure = None;
    entries.sort_by(|(a, _), (b, _)| {
        let ordering = if reverse { b.compare(a) } else { a.compare(b) };
        ordering.unwrap_or_else(|err| {
            failure.get_or_insert(err);
            Ordering::Equal
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(entries.into_iter().map(|(_, item)| item).collect()),
    }
}

fn extremum(
    interp: &Interpreter<'_>,
    name: &str,
    items: Vec<Value>,
    key: Option<Value>,
    want_max: bool,
) -> Result<Value, EvalError> {
    let mut best: Option<(Value, Value)> = None;
    for (sort_key, item) in keyed(interp, items, key.as_ref())? {
        let replace = match &best {
            None => true,
            Some((best_key, _)) => {
                let ordering = sort_key.compare(best_key)?;
                if want_max {
                    ordering.is_gt()
                } else {
                    ordering.is_lt()
                }
            }
        };
        if replace {
            best = Some((sort_key, item));
        }
    }
    best.map(|(_, item)| item)
        .ok_or_else(|| EvalError::runtime(format!("{}() arg is an empty sequence", name)))
}

const STR_METHODS: &[&str] = &[
    "upper",
    "lower",
    "title",
    "capitalize",
    "strip",
    "lstrip",
    "rstrip",
    "split",
    "join",
    "replace",
    "startswith",
    "endswith",
    "find",
    "count",
    "zfill",
];
const SEQUENCE_METHODS: &[&str] = &["count", "index"];
const DICT_METHODS: &[&str] = &["keys", "values", "items", "get"];

/// Whether `value` has a method called `name`
pub(crate) fn has_method(value: &Value, name: &str) -> bool {
    let methods = match value {
        Value::Str(_) => STR_METHODS,
        Value::List(_) | Value::Tuple(_) => SEQUENCE_METHODS,
        Value::Dict(_) => DICT_METHODS,
        _ => &[],
    };
    methods.contains(&name)
}

/// Call `receiver.name(*args)`
pub(crate) fn call_method(receiver: &Value, name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let qualified = format!("{}.{}", receiver.type_name(), name);
    match receiver {
        Value::Str(text) if has_method(receiver, name) => str_method(text, name, &qualified, args),
        Value::List(items) | Value::Tuple(items) if has_method(receiver, name) => {
            arity(&qualified, args, 1, 1)?;
            match name {
                "count" => Ok(Value::from(
                    items.iter().filter(|item| **item == args[0]).count(),
                )),
                _ => items
                    .iter()
                    .position(|item| *item == args[0])
                    .map(Value::from)
                    .ok_or_else(|| {
                        EvalError::runtime(format!(
                            "{} is not in {}",
                            args[0].repr(),
                            receiver.type_name()
                        ))
                    }),
            }
        }
        Value::Dict(pairs) if has_method(receiver, name) => match name {
            "keys" => {
                arity(&qualified, args, 0, 0)?;
                Ok(pairs.iter().map(|(k, _)| k.clone()).collect())
            }
            "values" => {
                arity(&qualified, args, 0, 0)?;
                Ok(pairs.iter().map(|(_, v)| v.clone()).collect())
            }
            "items" => {
                arity(&qualified, args, 0, 0)?;
                Ok(pairs
                    .iter()
                    .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
                    .collect())
            }
            _ => {
                arity(&qualified, args, 1, 2)?;
                Ok(pairs
                    .iter()
                    .find(|(k, _)| *k == args[0])
                    .map(|(_, v)| v.clone())
                    .or_else(|| args.get(1).cloned())
                    .unwrap_or(Value::None))
            }
        },
        _ => Err(EvalError::type_error(format!(
            "'{}' object has no attribute '{}'",
            receiver.type_name(),
            name
        ))),
    }
}

fn string_arg<'v>(qualified: &str, value: &'v Value) -> Result<&'v str, EvalError> {
    value.as_str().ok_or_else(|| {
        EvalError::type_error(format!(
            "{}() argument must be str, not {}",
            qualified,
            value.type_name()
        ))
    })
}

fn str_method(text: &str, name: &str, qualified: &str, args: &[Value]) -> Result<Value, EvalError> {
    match name {
        "upper" | "lower" | "title" | "capitalize" => {
            arity(qualified, args, 0, 0)?;
            Ok(Value::from(match name {
                "upper" => text.to_uppercase(),
                "lower" => text.to_lowercase(),
                "title" => title_case(text),
                _ => capitalize(text),
            }))
        }
        "strip" | "lstrip" | "rstrip" => {
            arity(qualified, args, 0, 1)?;
            let chars: Option<Vec<char>> = match args.first() {
                None | Some(Value::None) => None,
                Some(value) => Some(string_arg(qualified, value)?.chars().collect()),
            };
            let matches = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            Ok(Value::from(match name {
                "strip" => text.trim_matches(matches),
                "lstrip" => text.trim_start_matches(matches),
                _ => text.trim_end_matches(matches),
            }))
        }
        "split" => {
            arity(qualified, args, 0, 2)?;
            let maxsplit = match args.get(1) {
                Some(value) => integer(qualified, value)?,
                None => -1,
            };
            let parts = match args.first() {
                None | Some(Value::None) => split_whitespace(text, maxsplit),
                Some(value) => {
                    let sep = string_arg(qualified, value)?;
                    if sep.is_empty() {
                        return Err(EvalError::runtime("empty separator"));
                    }
                    match usize::try_from(maxsplit) {
                        Ok(limit) => text.splitn(limit + 1, sep).map(str::to_string).collect(),
                        Err(_) => text.split(sep).map(str::to_string).collect(),
                    }
                }
            };
            Ok(Value::list(parts))
        }
        "join" => {
            arity(qualified, args, 1, 1)?;
            let mut parts = Vec::new();
            for (i, item) in args[0].iter_items()?.iter().enumerate() {
                match item.as_str() {
                    Some(s) => parts.push(s.to_string()),
                    None => {
                        return Err(EvalError::type_error(format!(
                            "sequence item {}: expected str instance, {} found",
                            i,
                            item.type_name()
                        )))
                    }
                }
            }
            Ok(Value::from(parts.join(text)))
        }
        "replace" => {
            arity(qualified, args, 2, 3)?;
            let old = string_arg(qualified, &args[0])?;
            let new = string_arg(qualified, &args[1])?;
            let replaced = match args.get(2).map(|v| integer(qualified, v)).transpose()? {
                Some(count) if count >= 0 => {
                    text.replacen(old, new, usize::try_from(count).unwrap_or(usize::MAX))
                }
                _ => text.replace(old, new),
            };
            Ok(Value::from(replaced))
        }
        "startswith" | "endswith" => {
            arity(qualified, args, 1, 1)?;
            let candidates = match &args[0] {
                Value::Tuple(items) => items.to_vec(),
                other => vec![other.clone()],
            };
            for candidate in &candidates {
                let affix = string_arg(qualified, candidate)?;
                let hit = if name == "startswith" {
                    text.starts_with(affix)
                } else {
                    text.ends_with(affix)
                };
                if hit {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        "find" => {
            arity(qualified, args, 1, 1)?;
            let needle = string_arg(qualified, &args[0])?;
            Ok(match text.find(needle) {
                Some(byte) => Value::from(text[..byte].chars().count()),
                None => Value::Int(-1),
            })
        }
        "count" => {
            arity(qualified, args, 1, 1)?;
            let needle = string_arg(qualified, &args[0])?;
            if needle.is_empty() {
                return Ok(Value::from(text.chars().count() + 1));
            }
            Ok(Value::from(text.matches(needle).count()))
        }
        "zfill" => {
            arity(qualified, args, 1, 1)?;
            let width = usize::try_from(integer(qualified, &args[0])?).unwrap_or(0);
            if width > MAX_SEQUENCE_LEN {
                return Err(EvalError::runtime("zfill() width is too large"));
            }
            let len = text.chars().count();
            if len >= width {
                return Ok(Value::from(text));
            }
            let padding = "0".repeat(width - len);
            Ok(Value::from(match text.chars().next() {
                Some(sign @ ('+' | '-')) => format!("{}{}{}", sign, padding, &text[1..]),
                _ => format!("{}{}", padding, text),
            }))
        }
        _ => Err(EvalError::type_error(format!(
            "'str' object has no attribute '{}'",
            name
        ))),
    }
}

fn split_whitespace(text: &str, maxsplit: i64) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text.trim_start();
    while !rest.is_empty() {
        if maxsplit >= 0 && parts.len() as i64 == maxsplit {
            parts.push(rest.to_string());
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                parts.push(rest[..end].to_string());
                rest = rest[end..].trim_start();
            }
            None => {
                parts.push(rest.to_string());
                break;
            }
        }
    }
    parts
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_cased = false;
    for ch in text.chars() {
        if previous_cased {
            out.extend(ch.to_lowercase());
        } else {
            out.extend(ch.to_uppercase());
        }
        previous_cased = ch.is_alphabetic();
    }
    out
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
