//! Value formatting: conversions, format templates and the formatter seam

mod spec;

use std::fmt;

use thiserror::Error;

use crate::value::Value;

pub use spec::{Align, FormatSpec, Sign};

/// Errors raised while applying a format specifier
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("invalid format specifier '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },

    #[error("unknown format code '{code}' for object of type '{type_name}'")]
    UnknownCode { code: char, type_name: &'static str },

    #[error("unsupported format string '{spec}' passed to {type_name}.__format__")]
    Unsupported {
        spec: String,
        type_name: &'static str,
    },
}

/// `!s`, `!r` or `!a`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    Str,
    Repr,
    Ascii,
}

impl Conversion {
    /// Parse a conversion marker (the text after `!`)
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "s" => Some(Conversion::Str),
            "r" => Some(Conversion::Repr),
            "a" => Some(Conversion::Ascii),
            _ => None,
        }
    }

    pub fn marker(self) -> char {
        match self {
            Conversion::Str => 's',
            Conversion::Repr => 'r',
            Conversion::Ascii => 'a',
        }
    }

    /// Convert `value` to the string the marker asks for
    pub fn apply(self, value: &Value) -> Value {
        Value::from(match self {
            Conversion::Str => value.to_str(),
            Conversion::Repr => value.repr(),
            Conversion::Ascii => value.ascii(),
        })
    }
}

/// A single-placeholder format template such as `{v!r:>8}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FormatTemplate {
    name: String,
    conversion: Option<Conversion>,
    spec: Option<String>,
}

impl FormatTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conversion: None,
            spec: None,
        }
    }

    pub fn with_conversion(mut self, conversion: Option<Conversion>) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn with_spec(mut self, spec: Option<String>) -> Self {
        self.spec = spec;
        self
    }

    /// The name the template addresses
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn conversion(&self) -> Option<Conversion> {
        self.conversion
    }

    pub fn spec(&self) -> Option<&str> {
        self.spec.as_deref()
    }
}

impl fmt::Display for FormatTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}", self.name)?;
        if let Some(conversion) = self.conversion {
            write!(f, "!{}", conversion.marker())?;
        }
        if let Some(spec) = &self.spec {
            write!(f, ":{}", spec)?;
        }
        f.write_str("}")
    }
}

/// Value formatting service used by the renderer
pub trait Formatter: Send + Sync {
    /// Render `value` according to `template`'s conversion and spec
    fn format(&self, value: &Value, template: &FormatTemplate) -> Result<String, FormatError>;
}

/// Default formatter implementing the format-spec mini-language
#[derive(Debug, Default, Clone, Copy)]
pub struct SpecFormatter;

impl Formatter for SpecFormatter {
    fn format(&self, value: &Value, template: &FormatTemplate) -> Result<String, FormatError> {
        match template.conversion() {
            Some(conversion) => format_value(&conversion.apply(value), template.spec().unwrap_or("")),
            None => format_value(value, template.spec().unwrap_or("")),
        }
    }
}

/// `format(value, spec)`
pub fn format_value(value: &Value, spec: &str) -> Result<String, FormatError> {
    if spec.is_empty() {
        return Ok(value.to_str());
    }
    let parsed = FormatSpec::parse(spec)?;
    match value {
        Value::Str(s) => parsed.format_str(s),
        Value::Int(n) => parsed.format_int(*n, value.type_name()),
        Value::Bool(b) => parsed.format_int(i64::from(*b), value.type_name()),
        Value::Float(x) => parsed.format_float(*x),
        other => Err(FormatError::Unsupported {
            spec: spec.to_string(),
            type_name: other.type_name(),
        }),
    }
}
