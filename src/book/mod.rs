//! Book, chapter, and table-of-contents models decoded from the content API.
//!
//! These are thin serde views over the JSON the (external) fetch layer
//! returns. [`BookInfo`] is immutable once decoded and read-only throughout
//! packaging; [`Chapter`] carries the per-chapter asset references; the
//! [`TocNode`] tree is consumed twice (NCX and nav renderings) without
//! mutation.

use serde::Deserialize;

use crate::error::Result;

/// Book author information.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Author {
    pub name: String,
}

/// Publisher information.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Publisher {
    pub name: String,
}

/// Book subject/tag information.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Subject {
    pub name: String,
}

/// Complete book metadata from the content API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookInfo {
    /// API-assigned book identifier.
    pub identifier: String,
    pub title: String,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub rights: Option<String>,
    /// Issue date in whatever form the API supplies (used as `dc:date`).
    pub issued: Option<String>,
    pub authors: Vec<Author>,
    pub publishers: Vec<Publisher>,
    pub subjects: Vec<Subject>,
    /// URL of the publisher-supplied cover image, if any.
    pub cover: Option<String>,
    /// The book's web URL; base for resolving relative stylesheet links.
    pub web_url: Option<String>,
}

impl BookInfo {
    /// Decode book metadata from an API JSON response.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The identifier used in the package document and NCX: the ISBN when
    /// present, otherwise the API identifier.
    pub fn package_id(&self) -> &str {
        match self.isbn.as_deref() {
            Some(isbn) if !isbn.is_empty() => isbn,
            _ => &self.identifier,
        }
    }

    /// Comma-joined author names.
    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Comma-joined publisher names.
    pub fn publisher_names(&self) -> String {
        self.publishers
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A chapter stylesheet reference (`{"url": ...}` objects in the API).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StylesheetRef {
    pub url: String,
}

/// A single downloadable unit of book content.
///
/// The flat chapter list used for content download is unnested; `children`
/// is only populated when the API returns chapters as a TOC tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Chapter {
    pub id: String,
    /// Source filename, in its `.html` form.
    pub filename: String,
    /// Display label. The API calls this `title`.
    #[serde(alias = "title")]
    pub label: String,
    /// URL of the chapter's HTML content.
    pub content: String,
    pub asset_base_url: String,
    /// Image URLs referenced by the chapter.
    pub images: Vec<String>,
    /// Per-chapter stylesheets.
    pub stylesheets: Vec<StylesheetRef>,
    /// Site-wide stylesheets the chapter relies on.
    pub site_styles: Vec<String>,
    /// Nesting depth, 1-based.
    pub depth: u32,
    pub children: Vec<Chapter>,
}

impl Chapter {
    /// Convenience constructor for synthesized chapters (default cover
    /// pages and tests).
    pub fn new(filename: &str, label: &str) -> Self {
        Self {
            filename: filename.to_string(),
            label: label.to_string(),
            depth: 1,
            ..Self::default()
        }
    }

    /// The chapter's filename with the `.html` extension rewritten to
    /// `.xhtml`. Idempotent: a filename already in `.xhtml` form passes
    /// through unchanged, so multiple code paths may apply it.
    pub fn xhtml_filename(&self) -> String {
        xhtml_filename(&self.filename)
    }

    /// All stylesheet URLs the chapter needs, per-chapter ones first, then
    /// the site-wide ones, in API order.
    pub fn stylesheet_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.stylesheets.iter().map(|s| s.url.clone()).collect();
        urls.extend(self.site_styles.iter().cloned());
        urls
    }
}

/// Rewrite a chapter filename from `.html` to `.xhtml`, idempotently.
pub fn xhtml_filename(filename: &str) -> String {
    if filename.ends_with(".xhtml") {
        filename.to_string()
    } else {
        filename.replace(".html", ".xhtml")
    }
}

/// Reorder a flat chapter list so chapters whose filename or label mentions
/// "cover" come first, preserving relative order otherwise. The cover page
/// must be the first spine entry for cover detection to see it.
pub fn promote_cover_chapters(chapters: Vec<Chapter>) -> Vec<Chapter> {
    let (mut covers, rest): (Vec<_>, Vec<_>) = chapters
        .into_iter()
        .partition(|c| c.filename.contains("cover") || c.label.contains("cover"));
    covers.extend(rest);
    covers
}

/// A table-of-contents entry as returned by the API's TOC listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TocNode {
    pub id: String,
    /// Anchor within the target document; may be empty, in which case `id`
    /// is used as the navigation key.
    pub fragment: String,
    pub label: String,
    /// Source `.html` path, possibly carrying a directory prefix that is
    /// stripped at render time.
    pub href: String,
    /// 1-based nesting level.
    pub depth: u32,
    pub children: Vec<TocNode>,
}

impl TocNode {
    /// The navigation key: the fragment when non-empty, else the id.
    pub fn anchor(&self) -> &str {
        if self.fragment.is_empty() {
            &self.id
        } else {
            &self.fragment
        }
    }
}

/// Decode the TOC tree from an API JSON response.
pub fn parse_toc(json: &str) -> Result<Vec<TocNode>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_xhtml_filename() {
        assert_eq!(xhtml_filename("ch01.html"), "ch01.xhtml");
        assert_eq!(xhtml_filename("ch01.xhtml"), "ch01.xhtml");
        assert_eq!(xhtml_filename("cover"), "cover");
    }

    proptest! {
        #[test]
        fn xhtml_filename_is_idempotent(stem in "[a-z0-9_]{1,12}") {
            let name = format!("{stem}.html");
            let once = xhtml_filename(&name);
            prop_assert_eq!(xhtml_filename(&once), once);
        }
    }

    #[test]
    fn test_package_id_prefers_isbn() {
        let mut book = BookInfo {
            identifier: "123".into(),
            ..BookInfo::default()
        };
        assert_eq!(book.package_id(), "123");
        book.isbn = Some(String::new());
        assert_eq!(book.package_id(), "123");
        book.isbn = Some("978-1".into());
        assert_eq!(book.package_id(), "978-1");
    }

    #[test]
    fn test_from_json() {
        let book = BookInfo::from_json(
            r#"{
                "identifier": "123",
                "title": "T",
                "isbn": "978-1",
                "authors": [{"name": "A"}, {"name": "B"}],
                "publishers": [{"name": "P"}],
                "subjects": [{"name": "S"}],
                "web_url": "https://example.com/library/view/t/123/"
            }"#,
        )
        .unwrap();
        assert_eq!(book.title, "T");
        assert_eq!(book.author_names(), "A, B");
        assert_eq!(book.publisher_names(), "P");
    }

    #[test]
    fn test_chapter_decodes_title_alias() {
        let chapter: Chapter = serde_json::from_str(
            r#"{
                "id": "c1",
                "filename": "ch01.html",
                "title": "Chapter One",
                "stylesheets": [{"url": "https://example.com/a.css"}],
                "site_styles": ["https://example.com/site.css"]
            }"#,
        )
        .unwrap();
        assert_eq!(chapter.label, "Chapter One");
        assert_eq!(
            chapter.stylesheet_urls(),
            vec![
                "https://example.com/a.css".to_string(),
                "https://example.com/site.css".to_string()
            ]
        );
    }

    #[test]
    fn test_promote_cover_chapters() {
        let chapters = vec![
            Chapter::new("ch01.html", "One"),
            Chapter::new("cover.html", "Cover"),
            Chapter::new("ch02.html", "Two"),
        ];
        let ordered = promote_cover_chapters(chapters);
        let names: Vec<_> = ordered.iter().map(|c| c.filename.as_str()).collect();
        assert_eq!(names, ["cover.html", "ch01.html", "ch02.html"]);
    }

    #[test]
    fn test_parse_toc() {
        let toc = parse_toc(
            r#"[
                {"id": "n1", "fragment": "", "label": "One", "href": "ch01.html", "depth": 1,
                 "children": [{"id": "n2", "fragment": "s1", "label": "1.1", "href": "x/ch01.html", "depth": 2, "children": []}]}
            ]"#,
        )
        .unwrap();
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].anchor(), "n1");
        assert_eq!(toc[0].children[0].anchor(), "s1");
    }
}
