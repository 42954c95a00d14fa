//! # bindery
//!
//! Turns downloaded online-book content into clean EPUB 3 publications.
//!
//! The crate covers the two halves of that job:
//!
//! - **Content transformation**: each chapter's raw HTML is parsed, its
//!   designated content container extracted, stylesheets aggregated into a
//!   stable registry, links rewritten for the flattened EPUB layout, SVG
//!   image references normalized, publisher-hardcoded image dimensions
//!   stripped, and empty index-term anchors repaired into navigable
//!   targets. The result is an XHTML fragment plus the CSS it needs.
//! - **Packaging**: book metadata, the processed chapter list, and the
//!   table of contents become `content.opf`, `toc.ncx`, and `nav.xhtml`,
//!   and the book directory is serialized into a `.epub` archive with the
//!   mandated uncompressed-first `mimetype` entry.
//!
//! Network access is deliberately absent: chapter HTML arrives as
//! strings/bytes, API metadata as JSON, and asset downloads go through the
//! [`Fetcher`] seam so the surrounding application owns sessions, retries,
//! and pacing.
//!
//! ## Quick start
//!
//! ```no_run
//! use bindery::{AssetRegistry, BookInfo, Chapter, ContentTransformer, EpubPackager};
//!
//! let book: BookInfo = BookInfo::from_json(r#"{"identifier":"123","title":"T"}"#)?;
//! let chapters = vec![Chapter::new("ch1.html", "Chapter One")];
//!
//! let mut registry = AssetRegistry::new();
//! let mut transformer = ContentTransformer::new("123", "https://example.com/book/123/");
//! let page = transformer.transform(
//!     "<div id=\"sbo-rt-content\"><p>hello</p></div>",
//!     &mut registry,
//!     &[],
//!     true,
//! )?;
//!
//! let out = std::path::Path::new("books/T (123)");
//! bindery::epub::write_chapter(out, "ch1.html", &page.css, &page.xhtml, false)?;
//! let epub = EpubPackager::new(&book, &chapters).build(&[], out)?;
//! println!("{}", epub.display());
//! # Ok::<(), bindery::Error>(())
//! ```

pub mod book;
pub mod dom;
pub mod epub;
pub mod error;
pub mod transform;
pub(crate) mod util;

pub use book::{Author, BookInfo, Chapter, Publisher, StylesheetRef, Subject, TocNode};
pub use epub::{AssetRegistry, EpubPackager, Fetcher};
pub use error::{Error, Result};
pub use transform::{ContentTransformer, Entropy, LinkRewriter, TransformedChapter};
