//! Source-hyperlink rewriting for the flattened EPUB layout.
//!
//! Chapters reference both book-relative content, which gets flattened
//! into the EPUB's single-directory `OEBPS` layout, and external links,
//! which are left intact for readers.

use crate::util::url_is_absolute;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];
const IMAGE_PATH_MARKERS: [&str; 3] = ["cover", "images", "graphics"];

/// Rewrites source hyperlinks into EPUB-relative paths. Stateless per book.
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    book_id: String,
}

impl LinkRewriter {
    pub fn new(book_id: &str) -> Self {
        Self {
            book_id: book_id.to_string(),
        }
    }

    /// Rewrite a single link.
    ///
    /// - empty and `mailto` links pass through unchanged;
    /// - relative image links (by extension or by a `cover`/`images`/
    ///   `graphics` path marker) flatten to `Images/<basename>`;
    /// - other relative links get `.html` replaced with `.xhtml` — a plain
    ///   text substitution, not extension-anchored, kept for compatibility
    ///   with the content this feeds on;
    /// - absolute links containing the book id are split on its first
    ///   occurrence and the remainder rewritten by the same rules;
    /// - unrelated absolute links pass through unchanged.
    pub fn rewrite(&self, link: &str) -> String {
        if link.is_empty() || link.starts_with("mailto") {
            return link.to_string();
        }

        if !url_is_absolute(link) {
            if IMAGE_PATH_MARKERS.iter().any(|m| link.contains(m)) || is_image_link(link) {
                let basename = link.rsplit('/').next().unwrap_or(link);
                return format!("Images/{basename}");
            }
            return link.replace(".html", ".xhtml");
        }

        if !self.book_id.is_empty() {
            if let Some((_, remainder)) = link.split_once(&self.book_id) {
                return self.rewrite(remainder);
            }
        }

        link.to_string()
    }
}

/// Whether the link's last path segment has an image extension.
fn is_image_link(link: &str) -> bool {
    let basename = link.rsplit('/').next().unwrap_or(link);
    match basename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        _ => false,
    }
}
