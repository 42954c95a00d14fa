//! Table-of-contents renderers.
//!
//! Two independent renderings of the same [`TocNode`] tree, sharing
//! depth-first pre-order traversal: the legacy NCX navigation map (with
//! play order and depth tracking) and the nested navigation list for
//! `nav.xhtml`. Both are pure functions of the input tree.

use crate::book::TocNode;
use crate::util::escape_xml;

/// The rendered NCX navigation map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavMap {
    /// Concatenated `navPoint` elements.
    pub xml: String,
    /// Total number of entries (the final play-order value).
    pub entries: usize,
    /// Maximum depth value seen across the whole tree.
    pub max_depth: u32,
}

/// Render the legacy navigation map for `toc.ncx`.
///
/// Play order is a single monotonic counter starting at 1, threaded
/// through the whole tree rather than reset per branch.
pub fn render_nav_map(nodes: &[TocNode]) -> NavMap {
    let mut xml = String::new();
    let mut counter = 0;
    let mut max_depth = 0;
    write_nav_points(&mut xml, nodes, &mut counter, &mut max_depth);
    NavMap {
        xml,
        entries: counter,
        max_depth,
    }
}

fn write_nav_points(out: &mut String, nodes: &[TocNode], counter: &mut usize, max_depth: &mut u32) {
    for node in nodes {
        *counter += 1;
        *max_depth = (*max_depth).max(node.depth);

        out.push_str(&format!(
            "<navPoint id=\"{}\" playOrder=\"{}\">\
             <navLabel><text>{}</text></navLabel>\
             <content src=\"{}\"/>",
            node.anchor(),
            counter,
            escape_xml(&node.label),
            target_href(&node.href),
        ));

        if !node.children.is_empty() {
            write_nav_points(out, &node.children, counter, max_depth);
        }

        out.push_str("</navPoint>\n");
    }
}

/// Render the nested list items for the `nav.xhtml` navigation document.
pub fn render_nav_list(nodes: &[TocNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        let href = target_href(&node.href);
        let label = escape_xml(&node.label);
        if node.children.is_empty() {
            out.push_str(&format!("<li><a href=\"{href}\">{label}</a></li>\n"));
        } else {
            out.push_str(&format!(
                "<li>\n<a href=\"{href}\">{label}</a>\n<ol>\n{}</ol>\n</li>\n",
                render_nav_list(&node.children)
            ));
        }
    }
    out
}

/// A TOC href as it appears in the packaged book: `.xhtml` extension,
/// directory prefix stripped.
fn target_href(href: &str) -> String {
    let rewritten = href.replace(".html", ".xhtml");
    rewritten
        .rsplit('/')
        .next()
        .unwrap_or(&rewritten)
        .to_string()
}
