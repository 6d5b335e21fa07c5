//! Node model for parsed templates

use std::borrow::Cow;
use std::fmt;

use crate::error::Error;
use crate::expr::Evaluator;
use crate::format::{FormatTemplate, Formatter};
use crate::scope::Scope;

/// Name an expression's result is bound to before formatting
pub const SYNTHETIC_NAME: &str = "v";

/// Services a node needs to render itself
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub evaluator: &'a dyn Evaluator,
    pub formatter: &'a dyn Formatter,
}

/// Discriminant of a [`Node`], used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Text,
    Constant,
    Expression,
}

/// One unit of a parsed template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// Literal output
    Text { content: String },
    /// Bare name looked up in the scope
    Constant {
        name: String,
        template: FormatTemplate,
    },
    /// Arbitrary expression; its value is formatted through [`SYNTHETIC_NAME`]
    Expression {
        source: String,
        template: FormatTemplate,
    },
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text {
            content: content.into(),
        }
    }

    pub fn constant(name: impl Into<String>, template: FormatTemplate) -> Self {
        Node::Constant {
            name: name.into(),
            template,
        }
    }

    pub fn expression(source: impl Into<String>, template: FormatTemplate) -> Self {
        Node::Expression {
            source: source.into(),
            template,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Text { .. } => NodeKind::Text,
            Node::Constant { .. } => NodeKind::Constant,
            Node::Expression { .. } => NodeKind::Expression,
        }
    }

    /// Render this node against `scope`
    pub fn generate<'n>(
        &'n self,
        scope: &Scope,
        ctx: RenderContext<'_>,
    ) -> Result<Cow<'n, str>, Error> {
        match self {
            Node::Text { content } => Ok(Cow::Borrowed(content)),
            Node::Constant { name, template } => {
                let value = scope
                    .get(name)
                    .ok_or_else(|| Error::UnresolvedName { name: name.clone() })?;
                Ok(Cow::Owned(ctx.formatter.format(value, template)?))
            }
            Node::Expression { source, template } => {
                let value = ctx.evaluator.evaluate(source, scope)?;
                Ok(Cow::Owned(ctx.formatter.format(&value, template)?))
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text { content } => write!(f, "{:?}", content),
            Node::Constant { template, .. } => write!(f, "{}", template),
            Node::Expression { source, template } => write!(f, "{} <- {}", template, source),
        }
    }
}
