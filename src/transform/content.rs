//! Per-chapter content transformation.
//!
//! Takes a chapter's raw HTML and produces the XHTML fragment and CSS
//! fragment that get persisted into the EPUB's `OEBPS` directory. The
//! passes run in a fixed order on a single owned tree; processing is
//! single-threaded because stylesheet registration assigns indices by
//! first-seen order.

use std::borrow::Cow;

use log::info;

use crate::dom::{self, Element, Node};
use crate::epub::AssetRegistry;
use crate::error::{Error, Result};
use crate::transform::cover;
use crate::transform::links::LinkRewriter;
use crate::util::{decode_text, resolve_url};

/// The id of the container holding the chapter's actual content. Anything
/// outside it is site chrome.
pub const CONTENT_ROOT_ID: &str = "sbo-rt-content";

/// Portion of chapters that skip the blocked-page inspection. Checking
/// every page is wasteful; a blocked session taints all subsequent pages,
/// so a sampled check still catches it.
const SESSION_CHECK_THRESHOLD: f64 = 0.8;

/// Elements an index-term id may be hoisted onto.
const BLOCK_TAGS: [&str; 8] = ["p", "li", "td", "dd", "dt", "div", "section", "blockquote"];

/// Source of sampling decisions for the blocked-page check. Injectable so
/// tests can force either branch.
pub trait Entropy {
    /// Next value in `[0, 1)`.
    fn next_f64(&mut self) -> f64;
}

/// Default [`Entropy`] source: a time-seeded linear congruential generator.
/// Not cryptographic; sampling quality is all that is needed here.
#[derive(Debug, Clone)]
pub struct TimeSeededEntropy {
    state: u64,
}

impl TimeSeededEntropy {
    pub fn new() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(12345);
        Self::with_seed(seed)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { state: seed }
    }
}

impl Default for TimeSeededEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl Entropy for TimeSeededEntropy {
    fn next_f64(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// The result of transforming one chapter.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedChapter {
    /// Stylesheet links and inline styles for the chapter's `<head>`.
    pub css: String,
    /// The serialized content root.
    pub xhtml: String,
    /// The cover image source, when this was the first page and a cover
    /// was found in the content.
    pub cover: Option<String>,
}

/// The per-chapter HTML → XHTML pipeline.
pub struct ContentTransformer<E: Entropy = TimeSeededEntropy> {
    rewriter: LinkRewriter,
    base_url: String,
    entropy: E,
}

impl ContentTransformer {
    pub fn new(book_id: &str, base_url: &str) -> Self {
        Self::with_entropy(book_id, base_url, TimeSeededEntropy::new())
    }
}

impl<E: Entropy> ContentTransformer<E> {
    /// Construct with an explicit sampling source (tests force both
    /// branches of the blocked-page check this way).
    pub fn with_entropy(book_id: &str, base_url: &str, entropy: E) -> Self {
        Self {
            rewriter: LinkRewriter::new(book_id),
            base_url: base_url.to_string(),
            entropy,
        }
    }

    /// Transform raw fetched bytes; decodes UTF-8 with a Windows-1252
    /// fallback before running [`transform`](Self::transform).
    pub fn transform_bytes(
        &mut self,
        bytes: &[u8],
        registry: &mut AssetRegistry,
        chapter_stylesheets: &[String],
        first_page: bool,
    ) -> Result<TransformedChapter> {
        let text: Cow<'_, str> = decode_text(bytes);
        self.transform(&text, registry, chapter_stylesheets, first_page)
    }

    /// Transform one chapter document.
    ///
    /// Returns the aggregated CSS fragment and the serialized content
    /// root. When `first_page` is set and the content holds a cover image,
    /// the whole content root is replaced by a synthesized cover page and
    /// the CSS fragment by the cover stylesheet.
    pub fn transform(
        &mut self,
        html: &str,
        registry: &mut AssetRegistry,
        chapter_stylesheets: &[String],
        first_page: bool,
    ) -> Result<TransformedChapter> {
        let mut doc = dom::parse(html);

        self.check_session(&doc)?;

        let css = self.aggregate_css(&mut doc, registry, chapter_stylesheets);

        let mut content = match doc.find_by_id(CONTENT_ROOT_ID) {
            Some(root) => root.clone(),
            None => {
                return Err(Error::ContentCorrupted(format!(
                    "missing #{CONTENT_ROOT_ID} container"
                )))
            }
        };

        normalize_svg_images(&mut content);
        strip_image_dimensions(&mut content);
        rewrite_links(&mut content, &self.rewriter);
        repair_index_anchors(&mut content);

        if first_page {
            if let Some(src) = extract_cover_src(&content) {
                let (cover_css, cover_root) = cover::cover_page(&src);
                return Ok(TransformedChapter {
                    css: cover_css,
                    xhtml: cover_root.to_xhtml(),
                    cover: Some(src),
                });
            }
        }

        Ok(TransformedChapter {
            css,
            xhtml: content.to_xhtml(),
            cover: None,
        })
    }

    /// Sampled check for the blocked-page marker the upstream substitutes
    /// for logged-out sessions: a `div.controls` containing a link.
    fn check_session(&mut self, doc: &Element) -> Result<()> {
        if self.entropy.next_f64() <= SESSION_CHECK_THRESHOLD {
            return Ok(());
        }
        if has_blocked_marker(doc) {
            return Err(Error::AntiBotDetected);
        }
        Ok(())
    }

    /// Register every stylesheet the chapter needs and return the CSS
    /// fragment for its `<head>`: one link per registered stylesheet in
    /// encounter order, then each serialized inline `<style>` block.
    fn aggregate_css(
        &self,
        doc: &mut Element,
        registry: &mut AssetRegistry,
        chapter_stylesheets: &[String],
    ) -> String {
        let mut page_css = String::new();

        for url in chapter_stylesheets {
            page_css.push_str(&self.style_link(registry, url));
        }

        let mut hrefs: Vec<String> = Vec::new();
        doc.for_each_element(&mut |el| {
            if el.name == "link" && el.attr("rel") == Some("stylesheet") {
                if let Some(href) = el.attr("href") {
                    hrefs.push(href.to_string());
                }
            }
        });
        for href in hrefs {
            let url = if href.starts_with("//") {
                format!("https:{href}")
            } else {
                resolve_url(&self.base_url, &href)
            };
            page_css.push_str(&self.style_link(registry, &url));
        }

        let style_paths = doc.collect_element_paths(&|el| el.name == "style");
        for path in style_paths {
            if let Some(style) = doc.element_at_mut(&path) {
                // publisher pages sometimes stash the real CSS in a
                // data-template attribute; promote it into the element body
                if style.attr("data-template").is_some_and(|v| !v.is_empty()) {
                    let text = style.remove_attr("data-template").unwrap_or_default();
                    style.children = vec![Node::Text(text)];
                }
                page_css.push_str(&style.to_xhtml());
                page_css.push('\n');
            }
        }

        page_css
    }

    fn style_link(&self, registry: &mut AssetRegistry, url: &str) -> String {
        if !registry.contains_stylesheet(url) {
            info!("found a new stylesheet at {url}");
        }
        let index = registry.register_stylesheet(url);
        format!(
            "<link href=\"Styles/Style{index:0>2}.css\" rel=\"stylesheet\" type=\"text/css\" />\n"
        )
    }
}

fn has_blocked_marker(doc: &Element) -> bool {
    let mut found = false;
    doc.for_each_element(&mut |el| {
        if found || el.name != "div" {
            return;
        }
        let is_controls = el
            .attr("class")
            .is_some_and(|c| c.split_whitespace().any(|token| token == "controls"));
        if is_controls && has_link_with_text(el) {
            found = true;
        }
    });
    found
}

fn has_link_with_text(el: &Element) -> bool {
    let mut found = false;
    el.for_each_element(&mut |e| {
        if e.name == "a" && !e.text_content().trim().is_empty() {
            found = true;
        }
    });
    found
}

/// Replace `<image href>` elements nested inside SVG groups with plain
/// `<img src>` elements at the group's parent level. Readers handle `img`
/// far more reliably than inline SVG image references in this content.
fn normalize_svg_images(root: &mut Element) {
    let paths = root.collect_element_paths(&|el| el.name == "image" && href_attr(el).is_some());
    // reverse document order so removals cannot shift yet-unprocessed paths
    for path in paths.iter().rev() {
        if path.len() < 2 {
            continue;
        }
        // re-check: an earlier rewrite may have removed this subtree
        let src = match root.element_at(path) {
            Some(el) if el.name == "image" => match href_attr(el) {
                Some(value) => value.to_string(),
                None => continue,
            },
            _ => continue,
        };

        let group_index = path[path.len() - 2];
        if let Some(grandparent) = root.element_at_mut(&path[..path.len() - 2]) {
            if group_index < grandparent.children.len() {
                grandparent.children.remove(group_index);
            }
            let mut img = Element::new("img");
            img.set_attr("src", &src);
            grandparent.children.push(Node::Element(img));
        }
    }
}

fn href_attr(el: &Element) -> Option<&str> {
    el.attrs
        .iter()
        .find(|a| a.name.contains("href"))
        .map(|a| a.value.as_str())
}

/// Remove hardcoded pixel dimensions from images: `width`/`height`
/// attributes, and `width:`/`height:` declarations inside inline styles.
/// They fight the stylesheet's responsive image rules.
fn strip_image_dimensions(root: &mut Element) {
    root.for_each_element_mut(&mut |el| {
        if el.name != "img" {
            return;
        }
        el.remove_attr("width");
        el.remove_attr("height");

        let style = match el.attr("style") {
            Some(s) => s.to_string(),
            None => return,
        };
        let kept: Vec<&str> = style
            .split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .filter(|part| {
                let lower = part.to_ascii_lowercase();
                !(lower.starts_with("width:")
                    || lower.starts_with("height:")
                    || lower.starts_with("width ")
                    || lower.starts_with("height "))
            })
            .collect();
        if kept.is_empty() {
            el.remove_attr("style");
        } else {
            el.set_attr("style", &kept.join("; "));
        }
    });
}

fn rewrite_links(root: &mut Element, rewriter: &LinkRewriter) {
    root.for_each_element_mut(&mut |el| {
        let attr_name = match el.name.as_str() {
            "a" | "link" => "href",
            "img" => "src",
            _ => return,
        };
        if let Some(value) = el.attr(attr_name).map(str::to_string) {
            el.set_attr(attr_name, &rewriter.rewrite(&value));
        }
    });
}

/// Make index-term anchors navigable.
///
/// Index terms are empty `<a data-type="indexterm" id="...">` markers;
/// many readers cannot jump to an empty inline anchor. For each such
/// anchor, if its nearest block-level ancestor has no id of its own and
/// holds no other index term, the id moves onto the ancestor; otherwise
/// the anchor is wrapped in a `<span>` carrying the id. Every id survives
/// exactly once and no element ends up with two.
fn repair_index_anchors(root: &mut Element) {
    let term_paths = root.collect_element_paths(&|el| {
        is_index_term(el) && el.attr("id").is_some_and(|id| !id.is_empty())
    });

    for path in term_paths {
        // nearest block-level ancestor; the content root itself is a div
        // and therefore always qualifies as a last resort
        let mut block_path: Option<&[usize]> = None;
        for len in (0..path.len()).rev() {
            let prefix = &path[..len];
            if root
                .element_at(prefix)
                .is_some_and(|el| BLOCK_TAGS.contains(&el.name.as_str()))
            {
                block_path = Some(prefix);
                break;
            }
        }
        let Some(block_path) = block_path else { continue };

        let (block_has_id, term_count) = match root.element_at(block_path) {
            Some(block) => (
                block.attr("id").is_some_and(|id| !id.is_empty()),
                count_index_terms(block),
            ),
            None => continue,
        };

        if !block_has_id && term_count == 1 {
            let id = root
                .element_at_mut(&path)
                .and_then(|anchor| anchor.remove_attr("id"));
            if let (Some(id), Some(block)) = (id, root.element_at_mut(block_path)) {
                block.set_attr("id", &id);
            }
        } else {
            let Some(parent) = root.element_at_mut(&path[..path.len() - 1]) else {
                continue;
            };
            let index = path[path.len() - 1];
            if let Some(Node::Element(anchor)) = parent.children.get_mut(index) {
                let id = anchor.remove_attr("id").unwrap_or_default();
                let inner = std::mem::take(anchor);
                let mut span = Element::new("span");
                span.set_attr("id", &id);
                span.children.push(Node::Element(inner));
                parent.children[index] = Node::Element(span);
            }
        }
    }
}

fn is_index_term(el: &Element) -> bool {
    el.name == "a" && el.attr("data-type") == Some("indexterm")
}

fn count_index_terms(el: &Element) -> usize {
    let mut count = 0;
    for child in &el.children {
        if let Node::Element(c) = child {
            if is_index_term(c) {
                count += 1;
            }
            count += count_index_terms(c);
        }
    }
    count
}

fn extract_cover_src(content: &Element) -> Option<String> {
    cover::extract_cover(content)
        .and_then(|img| img.attr("src"))
        .map(str::to_string)
}
