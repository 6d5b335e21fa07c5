//! interpol - f-string style interpolation at runtime
//!
//! Templates mix literal text with `{…}` placeholders. Each placeholder holds
//! an expression, an optional `!s`/`!r`/`!a` conversion and an optional
//! format spec. Doubled braces are escapes.
//!
//! # Example
//!
//! ```rust
//! use interpol::interpolate;
//!
//! let items = vec![3, 1, 2];
//! let text = interpolate!("{len(items)} items, {{sorted}}: {sorted(items)}", items).unwrap();
//! assert_eq!(text, "3 items, {sorted}: [1, 2, 3]");
//! ```
//!
//! Names can be registered once and used by every template rendered by the
//! same engine:
//!
//! ```rust
//! use interpol::{Interpolator, Scope};
//!
//! let engine = Interpolator::new();
//! engine.register("project", "interpol").unwrap();
//! let text = engine.interpolate("{project!r:>12}", &Scope::new()).unwrap();
//! assert_eq!(text, "  'interpol'");
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod expr;
pub mod format;
pub mod namespace;
pub mod scope;
pub mod template;
pub mod value;

pub use config::{ConfigError, EngineConfig, ScopeFile};
pub use engine::{engine, interpolate, register, register_many, Interpolator};
pub use error::{Error, Span};
pub use expr::{EvalError, Evaluator, ExprEvaluator};
pub use format::{Conversion, FormatError, FormatTemplate, Formatter, SpecFormatter};
pub use namespace::{Namespace, RegistrationError};
pub use scope::{Scope, ScopeBuilder};
pub use template::CacheStats;
pub use value::Value;

/// Render a template with the default engine, capturing named locals
///
/// Bare identifiers are cloned into the scope; `name = expr` binds an
/// explicit value.
///
/// ```rust
/// let user = "ada";
/// let text = interpol::interpolate!("{user!r} has {n} messages", user, n = 3).unwrap();
/// assert_eq!(text, "'ada' has 3 messages");
/// ```
#[macro_export]
macro_rules! interpolate {
    ($template:expr) => {
        $crate::interpolate($template, &$crate::Scope::new())
    };
    ($template:expr, $($bindings:tt)+) => {
        $crate::interpolate($template, &$crate::scope!($($bindings)+))
    };
}
