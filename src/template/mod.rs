//! Template parsing and rendering
//!
//! A template is literal text with `{…}` placeholders, following f-string
//! rules:
//!
//! ```text
//! Hello {name}!               bare name looked up in the scope
//! {price * qty:.2f}           expression with a format spec
//! {label!r:>12}               conversion, then format spec
//! {{literal braces}}          doubled braces are escapes
//! {{k: v for k, v in pairs}}  dict or set comprehension
//! ```
//!
//! Parsing produces a sequence of [`Node`]s. The [`TemplateCache`] keeps each
//! template's sequence and the [`NodeInterner`] shares identical nodes between
//! templates.

pub mod cache;
pub mod classify;
pub mod escape;
pub mod interner;
pub mod node;
pub mod render;
pub mod scanner;

pub use cache::{CacheStats, CompiledTemplate, TemplateCache};
pub use interner::{NodeId, NodeInterner};
pub use node::{Node, NodeKind, RenderContext, SYNTHETIC_NAME};
pub use render::Renderer;
pub use scanner::parse;
