//! Content transforms for EPUB conversion
//!
//! - Links: rewriting source hyperlinks for the flattened EPUB layout
//! - Cover: locating a cover image and synthesizing a cover page
//! - Content: the per-chapter HTML → XHTML pipeline
//! - TOC: rendering the navigation map and navigation list

pub mod content;
pub mod cover;
pub mod links;
pub mod toc;

pub use content::{ContentTransformer, Entropy, TimeSeededEntropy, TransformedChapter};
pub use links::LinkRewriter;
