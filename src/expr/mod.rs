//! Expression language evaluated inside template placeholders
//!
//! Placeholders hold a side-effect-free subset of Python expressions. The
//! [`Evaluator`] trait is the seam the template engine talks to;
//! [`ExprEvaluator`] is the default implementation built from a logos lexer,
//! a chumsky grammar and a tree-walking interpreter.

pub mod ast;
pub mod builtins;
pub mod grammar;
mod interp;
pub mod lexer;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::error::Span;
use crate::scope::Scope;
use crate::value::Value;

pub use grammar::parse;
pub(crate) use interp::MAX_SEQUENCE_LEN;

/// Words that can never be used as a bare name
const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "if", "else", "for", "lambda", "None", "True", "False",
];

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Errors raised while parsing or evaluating an expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("{name} not found")]
    UnresolvedName { name: String },

    #[error("{message}")]
    Syntax { message: String, span: Span },

    #[error("{0}")]
    Type(String),

    #[error("{0}")]
    Runtime(String),
}

impl EvalError {
    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        EvalError::Runtime(message.into())
    }
}

/// Expression evaluation service used by the template engine
pub trait Evaluator: Send + Sync {
    /// Evaluate `source` against `scope`
    fn evaluate(&self, source: &str, scope: &Scope) -> Result<Value, EvalError>;

    /// Check that `source` is a syntactically valid expression
    fn check(&self, source: &str) -> Result<(), EvalError>;

    /// True when `source` is a lone identifier with no operators
    fn is_bare_identifier(&self, source: &str) -> bool {
        is_identifier(source)
    }

    /// True when `source` (braces included) is a set or dict comprehension
    fn is_valid_comprehension(&self, source: &str) -> bool;
}

/// Whether `name` is a valid identifier that is not a reserved word
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name) && !KEYWORDS.contains(&name)
}

/// Default evaluator: parses with chumsky and interprets the AST
///
/// Parsed expressions are cached by source text, so evaluating the same
/// placeholder repeatedly only pays for the tree walk.
#[derive(Default)]
pub struct ExprEvaluator {
    compiled: RwLock<HashMap<String, Arc<ast::Expr>>>,
}

impl ExprEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `source`, reusing a cached AST when available
    pub fn compile(&self, source: &str) -> Result<Arc<ast::Expr>, EvalError> {
        if let Some(expr) = self
            .compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
        {
            return Ok(Arc::clone(expr));
        }

        let expr = Arc::new(parse(source)?);
        tracing::trace!(source, "compiled expression");

        let mut compiled = self
            .compiled
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            compiled.entry(source.to_string()).or_insert(expr),
        ))
    }

    /// Number of cached ASTs
    pub fn cached(&self) -> usize {
        self.compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for ExprEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExprEvaluator")
            .field("cached", &self.cached())
            .finish()
    }
}

impl Evaluator for ExprEvaluator {
    fn evaluate(&self, source: &str, scope: &Scope) -> Result<Value, EvalError> {
        let expr = self.compile(source)?;
        interp::Interpreter::new(scope).eval(&expr)
    }

    fn check(&self, source: &str) -> Result<(), EvalError> {
        self.compile(source).map(|_| ())
    }

    fn is_valid_comprehension(&self, source: &str) -> bool {
        self.compile(source)
            .map(|expr| expr.is_brace_comprehension())
            .unwrap_or(false)
    }
}
