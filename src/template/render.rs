//! Rendering of node sequences

use std::sync::Arc;

use crate::error::Error;
use crate::scope::Scope;
use crate::template::node::{Node, RenderContext};

/// Concatenates node outputs in template order
#[derive(Debug, Default, Clone, Copy)]
pub struct Renderer;

impl Renderer {
    /// Render every node against `scope`; the first failure aborts the call
    pub fn generate(
        nodes: &[Arc<Node>],
        scope: &Scope,
        ctx: RenderContext<'_>,
    ) -> Result<String, Error> {
        let mut output = String::new();
        for node in nodes {
            let piece = node.generate(scope, ctx)?;
            tracing::trace!(node = %node, len = piece.len(), "rendered node");
            output.push_str(&piece);
        }
        Ok(output)
    }
}
