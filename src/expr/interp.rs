//! Tree-walking interpreter for parsed expressions

use std::sync::Arc;

use super::ast::*;
use super::builtins::{self, Builtin};
use super::EvalError;
use crate::scope::Scope;
use crate::value::{Function, Lambda, Number, Value};

/// Upper bound on the length of sequences built by repetition or `range`
pub(crate) const MAX_SEQUENCE_LEN: usize = 1 << 24;

/// Evaluates expressions against a scope plus the locals bound by
/// comprehension targets and lambda parameters
pub(crate) struct Interpreter<'s> {
    scope: &'s Scope,
    locals: Vec<(String, Value)>,
}

impl<'s> Interpreter<'s> {
    pub fn new(scope: &'s Scope) -> Self {
        Self {
            scope,
            locals: Vec::new(),
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        if let Some((_, value)) = self.locals.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        if let Some(value) = self.scope.get(name) {
            return Ok(value.clone());
        }
        match Builtin::lookup(name) {
            Some(builtin) => Ok(Value::Function(Arc::new(Function::Builtin(builtin)))),
            None => Err(EvalError::UnresolvedName {
                name: name.to_string(),
            }),
        }
    }

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::None => Value::None,
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(x) => Value::Float(*x),
                Literal::Str(s) => Value::from(s.as_str()),
            }),

            Expr::Name(name) => self.lookup(name),

            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                unary_op(*op, &operand)
            }

            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary_op(*op, &left, &right)
            }

            Expr::Bool { op, left, right } => {
                let left = self.eval(left)?;
                match (op, left.is_truthy()) {
                    (BoolOp::And, false) | (BoolOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }

            Expr::Compare { left, comparisons } => {
                let mut left = self.eval(left)?;
                for (op, right) in comparisons {
                    let right = self.eval(right)?;
                    if !compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }

            Expr::Conditional { test, body, orelse } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(body)
                } else {
                    self.eval(orelse)
                }
            }

            Expr::Call { func, args } => {
                if let Expr::Attribute { value, attr } = func.as_ref() {
                    let receiver = self.eval(value)?;
                    let (args, kwargs) = self.eval_args(args)?;
                    if !kwargs.is_empty() {
                        return Err(EvalError::type_error(format!(
                            "{}() takes no keyword arguments",
                            attr
                        )));
                    }
                    return builtins::call_method(&receiver, attr, &args);
                }
                let callee = self.eval(func)?;
                let (args, kwargs) = self.eval_args(args)?;
                self.call_function(&callee, args, kwargs)
            }

            Expr::Attribute { value, attr } => {
                let value = self.eval(value)?;
                if builtins::has_method(&value, attr) {
                    Err(EvalError::type_error(format!(
                        "method '{}' of '{}' object must be called",
                        attr,
                        value.type_name()
                    )))
                } else {
                    Err(EvalError::type_error(format!(
                        "'{}' object has no attribute '{}'",
                        value.type_name(),
                        attr
                    )))
                }
            }

            Expr::Index { value, index } => {
                let value = self.eval(value)?;
                let index = self.eval(index)?;
                subscript(&value, &index)
            }

            Expr::Slice {
                value,
                lower,
                upper,
                step,
            } => {
                let value = self.eval(value)?;
                let lower = self.eval_bound(lower.as_deref())?;
                let upper = self.eval_bound(upper.as_deref())?;
                let step = self.eval_bound(step.as_deref())?;
                slice(&value, lower, upper, step)
            }

            Expr::List(items) => Ok(Value::List(Arc::new(self.eval_all(items)?))),
            Expr::Tuple(items) => Ok(Value::Tuple(Arc::new(self.eval_all(items)?))),
            Expr::Set(items) => Ok(Value::set(self.eval_all(items)?)),
            Expr::Dict(pairs) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for (key, value) in pairs {
                    entries.push((self.eval(key)?, self.eval(value)?));
                }
                Ok(Value::dict(entries))
            }

            Expr::Comprehension {
                kind,
                element,
                value,
                clauses,
            } => {
                let mut items = Vec::new();
                let mut entries = Vec::new();
                let depth = self.locals.len();
                let result = self.run_clauses(clauses, &mut |interp: &mut Interpreter<'s>| {
                    match value {
                        Some(value) => entries.push((interp.eval(element)?, interp.eval(value)?)),
                        None => items.push(interp.eval(element)?),
                    }
                    Ok(())
                });
                self.locals.truncate(depth);
                result?;
                Ok(match kind {
                    CompKind::List | CompKind::Generator => Value::List(Arc::new(items)),
                    CompKind::Set => Value::set(items),
                    CompKind::Dict => Value::dict(entries),
                })
            }

            Expr::Lambda { params, body } => Ok(Value::Function(Arc::new(Function::Lambda(
                Lambda {
                    params: params.clone(),
                    body: Arc::clone(body),
                    captured: self.locals.clone(),
                },
            )))),
        }
    }

    fn eval_all(&mut self, items: &[Expr]) -> Result<Vec<Value>, EvalError> {
        items.iter().map(|item| self.eval(item)).collect()
    }

    fn eval_bound(&mut self, bound: Option<&Expr>) -> Result<Option<i64>, EvalError> {
        match bound {
            None => Ok(None),
            Some(expr) => match self.eval(expr)? {
                Value::None => Ok(None),
                value => value.as_int().map(Some).ok_or_else(|| {
                    EvalError::type_error(
                        "slice indices must be integers or None".to_string(),
                    )
                }),
            },
        }
    }

    fn eval_args(
        &mut self,
        args: &[Argument],
    ) -> Result<(Vec<Value>, Vec<(String, Value)>), EvalError> {
        let mut positional = Vec::new();
        let mut keywords: Vec<(String, Value)> = Vec::new();
        for arg in args {
            match arg {
                Argument::Positional(expr) => {
                    if !keywords.is_empty() {
                        return Err(EvalError::Syntax {
                            message: "positional argument follows keyword argument".to_string(),
                            span: 0..0,
                        });
                    }
                    positional.push(self.eval(expr)?);
                }
                Argument::Keyword(name, expr) => {
                    if keywords.iter().any(|(n, _)| n == name) {
                        return Err(EvalError::Syntax {
                            message: format!("keyword argument repeated: {}", name),
                            span: 0..0,
                        });
                    }
                    let value = self.eval(expr)?;
                    keywords.push((name.clone(), value));
                }
            }
        }
        Ok((positional, keywords))
    }

    /// Run nested `for`/`if` clauses, calling `emit` once per surviving binding
    fn run_clauses(
        &mut self,
        clauses: &[Clause],
        emit: &mut dyn FnMut(&mut Self) -> Result<(), EvalError>,
    ) -> Result<(), EvalError> {
        let Some((clause, rest)) = clauses.split_first() else {
            return emit(self);
        };
        let items = self.eval(&clause.iter)?.iter_items()?;
        for item in items {
            let depth = self.locals.len();
            self.bind_target(&clause.target, item)?;
            let mut keep = true;
            for condition in &clause.conditions {
                if !self.eval(condition)?.is_truthy() {
                    keep = false;
                    break;
                }
            }
            if keep {
                self.run_clauses(rest, emit)?;
            }
            self.locals.truncate(depth);
        }
        Ok(())
    }

    fn bind_target(&mut self, target: &Target, value: Value) -> Result<(), EvalError> {
        match target {
            Target::Name(name) => {
                self.locals.push((name.clone(), value));
                Ok(())
            }
            Target::Tuple(targets) => {
                let items = value.iter_items()?;
                if items.len() < targets.len() {
                    return Err(EvalError::runtime(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        items.len()
                    )));
                }
                if items.len() > targets.len() {
                    return Err(EvalError::runtime(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    )));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.bind_target(target, item)?;
                }
                Ok(())
            }
        }
    }

    /// Call any callable value
    pub fn call_function(
        &self,
        callee: &Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, EvalError> {
        let Value::Function(function) = callee else {
            return Err(EvalError::type_error(format!(
                "'{}' object is not callable",
                callee.type_name()
            )));
        };
        match function.as_ref() {
            Function::Builtin(builtin) => builtin.call(self, args, kwargs),
            Function::Native { name, func } => {
                if !kwargs.is_empty() {
                    return Err(EvalError::type_error(format!(
                        "{}() takes no keyword arguments",
                        name
                    )));
                }
                func(&args)
            }
            Function::Lambda(lambda) => self.call_lambda(lambda, args, kwargs),
        }
    }

    fn call_lambda(
        &self,
        lambda: &Lambda,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, EvalError> {
        if args.len() > lambda.params.len() {
            return Err(EvalError::type_error(format!(
                "<lambda>() takes {} positional arguments but {} were given",
                lambda.params.len(),
                args.len()
            )));
        }
        let mut bound: Vec<Option<Value>> = vec![None; lambda.params.len()];
        for (slot, arg) in bound.iter_mut().zip(args) {
            *slot = Some(arg);
        }
        for (name, value) in kwargs {
            let Some(position) = lambda.params.iter().position(|p| *p == name) else {
                return Err(EvalError::type_error(format!(
                    "<lambda>() got an unexpected keyword argument '{}'",
                    name
                )));
            };
            if bound[position].is_some() {
                return Err(EvalError::type_error(format!(
                    "<lambda>() got multiple values for argument '{}'",
                    name
                )));
            }
            bound[position] = Some(value);
        }

        let mut locals = lambda.captured.clone();
        for (param, value) in lambda.params.iter().zip(bound) {
            let value = value.ok_or_else(|| {
                EvalError::type_error(format!(
                    "<lambda>() missing required argument: '{}'",
                    param
                ))
            })?;
            locals.push((param.clone(), value));
        }

        let mut interp = Interpreter {
            scope: self.scope,
            locals,
        };
        interp.eval(&lambda.body)
    }
}

fn unary_op(op: UnaryOp, operand: &Value) -> Result<Value, EvalError> {
    let bad_operand = |symbol: &str| {
        EvalError::type_error(format!(
            "bad operand type for unary {}: '{}'",
            symbol,
            operand.type_name()
        ))
    };
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Neg => match operand.as_number() {
            Some(Number::Int(n)) => n.checked_neg().map(Value::Int).ok_or_else(overflow),
            Some(Number::Float(x)) => Ok(Value::Float(-x)),
            None => Err(bad_operand("-")),
        },
        UnaryOp::Pos => match operand.as_number() {
            Some(Number::Int(n)) => Ok(Value::Int(n)),
            Some(Number::Float(x)) => Ok(Value::Float(x)),
            None => Err(bad_operand("+")),
        },
        UnaryOp::Invert => match operand {
            Value::Int(_) | Value::Bool(_) => Ok(Value::Int(!operand.as_int().unwrap_or(0))),
            _ => Err(bad_operand("~")),
        },
    }
}

fn overflow() -> EvalError {
    EvalError::runtime("integer overflow")
}

/// Apply a binary arithmetic operator with Python semantics
pub(crate) fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return match (a, b) {
            (Number::Int(a), Number::Int(b)) => int_arithmetic(op, a, b),
            (a, b) => float_arithmetic(op, a.as_f64(), b.as_f64()),
        };
    }
    match (op, left, right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => {
            Ok(Value::from(format!("{}{}", a, b)))
        }
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(Arc::new([a.as_slice(), b.as_slice()].concat())))
        }
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::Tuple(Arc::new([a.as_slice(), b.as_slice()].concat())))
        }
        (BinaryOp::Mul, seq, count) | (BinaryOp::Mul, count, seq)
            if matches!(seq, Value::Str(_) | Value::List(_) | Value::Tuple(_))
                && matches!(count, Value::Int(_) | Value::Bool(_)) =>
        {
            repeat(seq, count.as_int().unwrap_or(0))
        }
        _ => Err(EvalError::type_error(format!(
            "unsupported operand type(s) for {}: '{}' and '{}'",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn repeat(seq: &Value, count: i64) -> Result<Value, EvalError> {
    let count = usize::try_from(count).unwrap_or(0);
    let len = match seq {
        Value::Str(s) => s.len(),
        Value::List(items) | Value::Tuple(items) => items.len(),
        _ => 0,
    };
    if len.saturating_mul(count) > MAX_SEQUENCE_LEN {
        return Err(EvalError::runtime("repeated sequence is too large"));
    }
    Ok(match seq {
        Value::Str(s) => Value::from(s.repeat(count)),
        Value::List(items) => Value::List(Arc::new(repeat_items(items, count))),
        Value::Tuple(items) => Value::Tuple(Arc::new(repeat_items(items, count))),
        other => other.clone(),
    })
}

fn repeat_items(items: &[Value], count: usize) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len() * count);
    for _ in 0..count {
        out.extend_from_slice(items);
    }
    out
}

fn int_arithmetic(op: BinaryOp, a: i64, b: i64) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(EvalError::runtime("division by zero"));
            }
            return Ok(Value::Float(a as f64 / b as f64));
        }
        BinaryOp::FloorDiv => {
            if b == 0 {
                return Err(EvalError::runtime("integer division or modulo by zero"));
            }
            a.checked_div(b).map(|q| {
                if a % b != 0 && (a < 0) != (b < 0) {
                    q - 1
                } else {
                    q
                }
            })
        }
        BinaryOp::Mod => {
            if b == 0 {
                return Err(EvalError::runtime("integer modulo by zero"));
            }
            a.checked_rem(b).map(|r| {
                if r != 0 && (r < 0) != (b < 0) {
                    r + b
                } else {
                    r
                }
            })
        }
        BinaryOp::Pow => {
            if b < 0 {
                return float_arithmetic(op, a as f64, b as f64);
            }
            u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp))
        }
    };
    result.map(Value::Int).ok_or_else(overflow)
}

fn float_arithmetic(op: BinaryOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(EvalError::runtime("float division by zero"));
            }
            a / b
        }
        BinaryOp::FloorDiv => {
            if b == 0.0 {
                return Err(EvalError::runtime("float floor division by zero"));
            }
            (a / b).floor()
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Err(EvalError::runtime("float modulo by zero"));
            }
            let r = a % b;
            if r != 0.0 && (r < 0.0) != (b < 0.0) {
                r + b
            } else {
                r
            }
        }
        BinaryOp::Pow => {
            if a == 0.0 && b < 0.0 {
                return Err(EvalError::runtime(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            if a < 0.0 && b.fract() != 0.0 {
                return Err(EvalError::runtime(
                    "negative number cannot be raised to a fractional power",
                ));
            }
            a.powf(b)
        }
    };
    Ok(Value::Float(result))
}

fn is_nan(value: &Value) -> bool {
    matches!(value, Value::Float(x) if x.is_nan())
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    Ok(match op {
        CompareOp::Eq => left == right,
        CompareOp::NotEq => left != right,
        CompareOp::Lt | CompareOp::LtE | CompareOp::Gt | CompareOp::GtE => {
            let ordering = left.compare(right)?;
            if is_nan(left) || is_nan(right) {
                return Ok(false);
            }
            match op {
                CompareOp::Lt => ordering.is_lt(),
                CompareOp::LtE => ordering.is_le(),
                CompareOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }
        }
        CompareOp::In => contains(right, left)?,
        CompareOp::NotIn => !contains(right, left)?,
        CompareOp::Is => identical(left, right),
        CompareOp::IsNot => !identical(left, right),
    })
}

/// Membership test backing `in` and `not in`
pub(crate) fn contains(container: &Value, item: &Value) -> Result<bool, EvalError> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(needle.as_ref())),
            other => Err(EvalError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        Value::List(items) | Value::Tuple(items) | Value::Set(items) => Ok(items.contains(item)),
        Value::Dict(pairs) => Ok(pairs.iter().any(|(key, _)| key == item)),
        other => Err(EvalError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b))
        | (Value::Tuple(a), Value::Tuple(b))
        | (Value::Set(a), Value::Set(b)) => Arc::ptr_eq(a, b),
        (Value::Dict(a), Value::Dict(b)) => Arc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { index + len } else { index };
    if (0..len).contains(&index) {
        usize::try_from(index).ok()
    } else {
        None
    }
}

fn subscript(value: &Value, index: &Value) -> Result<Value, EvalError> {
    if let Value::Dict(pairs) = value {
        return pairs
            .iter()
            .find(|(key, _)| key == index)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| EvalError::runtime(format!("KeyError: {}", index.repr())));
    }
    if !matches!(value, Value::List(_) | Value::Tuple(_) | Value::Str(_)) {
        return Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable",
            value.type_name()
        )));
    }
    let position = match index {
        Value::Int(_) | Value::Bool(_) => index.as_int().unwrap_or(0),
        _ => {
            return Err(EvalError::type_error(format!(
                "{} indices must be integers or slices, not {}",
                value.type_name(),
                index.type_name()
            )))
        }
    };
    let out_of_range = || EvalError::runtime(format!("{} index out of range", value.type_name()));
    match value {
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            normalize_index(position, chars.len())
                .map(|i| Value::from(chars[i]))
                .ok_or_else(out_of_range)
        }
        Value::List(items) | Value::Tuple(items) => normalize_index(position, items.len())
            .map(|i| items[i].clone())
            .ok_or_else(out_of_range),
        _ => Err(out_of_range()),
    }
}

/// Indices selected by a `[lower:upper:step]` slice over a sequence of `len`
pub(crate) fn slice_indices(
    len: usize,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> Result<Vec<usize>, EvalError> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(EvalError::runtime("slice step cannot be zero"));
    }
    let len = i64::try_from(len).map_err(|_| overflow())?;
    let clamp = |bound: i64, low: i64, high: i64| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(low, high)
    };

    let mut indices = Vec::new();
    if step > 0 {
        let start = lower.map_or(0, |b| clamp(b, 0, len));
        let stop = upper.map_or(len, |b| clamp(b, 0, len));
        let mut i = start;
        while i < stop {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    } else {
        let start = lower.map_or(len - 1, |b| clamp(b, -1, len - 1));
        let stop = upper.map_or(-1, |b| clamp(b, -1, len - 1));
        let mut i = start;
        while i > stop {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    }
    Ok(indices)
}

fn slice(
    value: &Value,
    lower: Option<i64>,
    upper: Option<i64>,
    step: Option<i64>,
) -> Result<Value, EvalError> {
    match value {
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let indices = slice_indices(chars.len(), lower, upper, step)?;
            Ok(Value::from(indices.into_iter().map(|i| chars[i]).collect::<String>()))
        }
        Value::List(items) => {
            let indices = slice_indices(items.len(), lower, upper, step)?;
            Ok(Value::List(Arc::new(
                indices.into_iter().map(|i| items[i].clone()).collect(),
            )))
        }
        Value::Tuple(items) => {
            let indices = slice_indices(items.len(), lower, upper, step)?;
            Ok(Value::Tuple(Arc::new(
                indices.into_iter().map(|i| items[i].clone()).collect(),
            )))
        }
        other => Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}
