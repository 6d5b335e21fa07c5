//! Template cache
//!
//! Maps raw template text to its compiled node sequence. Entries live for the
//! lifetime of the cache; templates that fail to parse are never stored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::Error;
use crate::scope::Scope;
use crate::template::interner::NodeId;
use crate::template::node::{Node, RenderContext};
use crate::template::render::Renderer;

/// A parsed template ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    source: Arc<str>,
    ids: Vec<NodeId>,
    nodes: Vec<Arc<Node>>,
}

impl CompiledTemplate {
    pub fn new(source: impl Into<Arc<str>>, nodes: Vec<(NodeId, Arc<Node>)>) -> Self {
        let (ids, nodes) = nodes.into_iter().unzip();
        Self {
            source: source.into(),
            ids,
            nodes,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn render(&self, scope: &Scope, ctx: RenderContext<'_>) -> Result<String, Error> {
        Renderer::generate(&self.nodes, scope, ctx)
    }
}

/// Counters describing cache behaviour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: usize,
    /// Times a template was parsed
    pub parses: usize,
    /// Templates currently cached
    pub templates: usize,
    /// Distinct interned nodes
    pub nodes: usize,
}

/// Thread-safe template cache
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<Arc<str>, Arc<CompiledTemplate>>>,
    hits: AtomicUsize,
    parses: AtomicUsize,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, template: &str) -> Option<Arc<CompiledTemplate>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(template)
            .cloned()
    }

    /// Look `template` up, compiling and storing it on a miss
    ///
    /// No lock is held while `compile` runs, so racing callers may both
    /// parse; the first entry stored wins and every caller receives it.
    pub fn get_or_try_insert_with<F>(
        &self,
        template: &str,
        compile: F,
    ) -> Result<Arc<CompiledTemplate>, Error>
    where
        F: FnOnce() -> Result<CompiledTemplate, Error>,
    {
        if let Some(hit) = self.get(template) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(template, "template cache hit");
            return Ok(hit);
        }

        let compiled = Arc::new(self.bypass(template, compile)?);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .entry(Arc::clone(&compiled.source))
            .or_insert(compiled);
        Ok(Arc::clone(entry))
    }

    /// Compile without storing the result; still counted as a parse
    pub fn bypass<F>(&self, template: &str, compile: F) -> Result<CompiledTemplate, Error>
    where
        F: FnOnce() -> Result<CompiledTemplate, Error>,
    {
        let compiled = compile()?;
        self.parses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(template, nodes = compiled.nodes.len(), "parsed template");
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn parses(&self) -> usize {
        self.parses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::interner::NodeInterner;

    fn compile(interner: &NodeInterner, template: &str) -> Result<CompiledTemplate, Error> {
        let node = interner.intern(Node::text(template));
        Ok(CompiledTemplate::new(template, vec![node]))
    }

    #[test]
    fn test_second_lookup_is_a_hit() {
        let cache = TemplateCache::new();
        let interner = NodeInterner::new();
        let first = cache
            .get_or_try_insert_with("abc", || compile(&interner, "abc"))
            .unwrap();
        let second = cache
            .get_or_try_insert_with("abc", || compile(&interner, "abc"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.parses(), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(first.source(), "abc");
        assert_eq!(first.ids().len(), 1);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let cache = TemplateCache::new();
        let result =
            cache.get_or_try_insert_with("{", || Err(Error::malformed("expected '}'", 0..1)));
        assert!(result.is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.parses(), 0);
    }

    #[test]
    fn test_bypass_does_not_store() {
        let cache = TemplateCache::new();
        let interner = NodeInterner::new();
        cache.bypass("abc", || compile(&interner, "abc")).unwrap();
        cache.bypass("abc", || compile(&interner, "abc")).unwrap();
        assert!(cache.is_empty());
        assert_eq!(cache.parses(), 2);
        assert_eq!(interner.len(), 1);
    }
}
