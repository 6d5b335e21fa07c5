//! The interpolation engine
//!
//! An [`Interpolator`] owns the evaluator and formatter services, the
//! registration namespace and both caches. A process-wide default engine
//! backs the free functions [`interpolate`], [`register`] and
//! [`register_many`].

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::config::EngineConfig;
use crate::error::Error;
use crate::expr::{Evaluator, ExprEvaluator};
use crate::format::{Formatter, SpecFormatter};
use crate::namespace::Namespace;
use crate::scope::{Scope, ScopeBuilder};
use crate::template::{CacheStats, CompiledTemplate, NodeInterner, RenderContext, TemplateCache};
use crate::value::Value;

static ENGINE: Lazy<Interpolator> = Lazy::new(Interpolator::new);

/// The process-wide default engine
///
/// Starts with an empty namespace and the default configuration.
pub fn engine() -> &'static Interpolator {
    &ENGINE
}

/// Render `template` with the default engine
///
/// # Example
///
/// ```rust
/// use interpol::{interpolate, Scope};
///
/// let scope = Scope::new().with("name", "world").with("n", 3);
/// let text = interpolate("Hello {name}! {n * 2:03d}", &scope).unwrap();
/// assert_eq!(text, "Hello world! 006");
/// ```
pub fn interpolate(template: &str, scope: &Scope) -> Result<String, Error> {
    ENGINE.interpolate(template, scope)
}

/// Register `name` in the default engine's namespace
pub fn register(name: impl Into<String>, value: impl Into<Value>) -> Result<(), Error> {
    ENGINE.register(name, value)
}

/// Register several entries in the default engine's namespace
pub fn register_many<I, K, V>(entries: I, overwrite: bool) -> Result<usize, Error>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    ENGINE.register_many(entries, overwrite)
}

/// Template interpolation engine
pub struct Interpolator {
    evaluator: Arc<dyn Evaluator>,
    formatter: Arc<dyn Formatter>,
    namespace: Namespace,
    cache: TemplateCache,
    interner: NodeInterner,
    config: EngineConfig,
}

impl Default for Interpolator {
    fn default() -> Self {
        Self {
            evaluator: Arc::new(ExprEvaluator::new()),
            formatter: Arc::new(SpecFormatter),
            namespace: Namespace::new(),
            cache: TemplateCache::new(),
            interner: NodeInterner::new(),
            config: EngineConfig::default(),
        }
    }
}

impl fmt::Debug for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpolator")
            .field("namespace", &self.namespace)
            .field("stats", &self.cache_stats())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Interpolator {
    /// Create an engine with the default evaluator and formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the expression evaluator
    pub fn with_evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    /// Replace the value formatter
    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Parse `template`, reusing the cached node sequence when present
    pub fn compile(&self, template: &str) -> Result<Arc<CompiledTemplate>, Error> {
        let build = || -> Result<CompiledTemplate, Error> {
            let nodes = crate::template::parse(template, self.evaluator.as_ref(), &self.config)?;
            let shared = nodes
                .into_iter()
                .map(|node| self.interner.intern(node))
                .collect();
            Ok(CompiledTemplate::new(template, shared))
        };

        if self.config.cache_templates {
            self.cache.get_or_try_insert_with(template, build)
        } else {
            self.cache.bypass(template, build).map(Arc::new)
        }
    }

    /// Render `template` against `scope`
    ///
    /// Registered entries are visible underneath `scope`; bindings in
    /// `scope` shadow them.
    pub fn interpolate(&self, template: &str, scope: &Scope) -> Result<String, Error> {
        let compiled = self.compile(template)?;
        let mut merged = self.namespace.snapshot();
        merged.layer(scope);
        compiled.render(&merged, self.context())
    }

    /// Render `template` against layered scopes
    pub fn interpolate_with(
        &self,
        template: &str,
        scopes: &ScopeBuilder,
    ) -> Result<String, Error> {
        let compiled = self.compile(template)?;
        let merged = scopes.build(&self.namespace.snapshot());
        compiled.render(&merged, self.context())
    }

    /// Register `name` for every template rendered by this engine
    ///
    /// Fails if `name` is already registered with a different value.
    pub fn register(&self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), Error> {
        Ok(self.namespace.register(name, value)?)
    }

    pub fn register_with(
        &self,
        name: impl Into<String>,
        value: impl Into<Value>,
        overwrite: bool,
    ) -> Result<(), Error> {
        Ok(self.namespace.register_with(name, value, overwrite)?)
    }

    /// Register several entries; nothing is applied if any entry conflicts
    pub fn register_many<I, K, V>(&self, entries: I, overwrite: bool) -> Result<usize, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Ok(self.namespace.register_many(entries, overwrite)?)
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.cache.hits(),
            parses: self.cache.parses(),
            templates: self.cache.len(),
            nodes: self.interner.len(),
        }
    }

    fn context(&self) -> RenderContext<'_> {
        RenderContext {
            evaluator: self.evaluator.as_ref(),
            formatter: self.formatter.as_ref(),
        }
    }
}
