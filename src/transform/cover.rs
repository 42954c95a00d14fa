//! Cover-image discovery inside chapter content.

use crate::dom::{Element, Node};

/// Attributes searched for the "cover" marker.
const COVER_ATTRS: [&str; 5] = ["id", "class", "name", "src", "alt"];

/// Stylesheet for the synthesized cover page: centers the image and caps it
/// at 90% of the viewport in both dimensions.
const COVER_CSS: &str = "<style>\
body{display:table;position:absolute;margin:0!important;height:100%;width:100%;}\
#Cover{display:table-cell;vertical-align:middle;text-align:center;}\
#Cover img{max-height:90vh;max-width:90vw;height:auto;width:auto;margin-left:auto;margin-right:auto;}\
</style>";

/// Locate the cover image element in a chapter's content.
///
/// Search order, first match wins:
/// 1. an `img` whose id/class/name/src/alt mentions "cover";
/// 2. the first `img` inside a `div` matching the same test;
/// 3. the first `img` inside an `a` matching the same test.
pub fn extract_cover(root: &Element) -> Option<&Element> {
    if let Some(img) = find_matching_img(root) {
        return Some(img);
    }
    for container in ["div", "a"] {
        if let Some(img) = find_img_in_container(root, container) {
            return Some(img);
        }
    }
    None
}

fn mentions_cover(el: &Element) -> bool {
    COVER_ATTRS
        .iter()
        .filter_map(|name| el.attr(name))
        .any(|value| value.to_lowercase().contains("cover"))
}

fn find_matching_img(el: &Element) -> Option<&Element> {
    for child in &el.children {
        if let Node::Element(c) = child {
            if c.name == "img" && mentions_cover(c) {
                return Some(c);
            }
            if let Some(found) = find_matching_img(c) {
                return Some(found);
            }
        }
    }
    None
}

fn find_img_in_container<'a>(el: &'a Element, container: &str) -> Option<&'a Element> {
    for child in &el.children {
        if let Node::Element(c) = child {
            if c.name == container && mentions_cover(c) {
                if let Some(img) = first_img(c) {
                    return Some(img);
                }
            }
            if let Some(found) = find_img_in_container(c, container) {
                return Some(found);
            }
        }
    }
    None
}

fn first_img(el: &Element) -> Option<&Element> {
    for child in &el.children {
        if let Node::Element(c) = child {
            if c.name == "img" {
                return Some(c);
            }
            if let Some(found) = first_img(c) {
                return Some(found);
            }
        }
    }
    None
}

/// Synthesize a dedicated cover page for the given image source.
///
/// Returns the fixed cover stylesheet and a
/// `<div id="Cover"><img src="..."/></div>` root replacing the chapter's
/// content.
pub fn cover_page(src: &str) -> (String, Element) {
    let mut img = Element::new("img");
    img.set_attr("src", src);

    let mut wrapper = Element::new("div");
    wrapper.set_attr("id", "Cover");
    wrapper.children.push(Node::Element(img));

    (COVER_CSS.to_string(), wrapper)
}

/// Build the chapter content for a metadata-supplied default cover, used
/// when no cover image was found in the book's own first chapter.
pub fn default_cover_page(image_file: &str) -> (String, String) {
    let (css, wrapper) = cover_page(&format!("Images/{image_file}"));
    (css, wrapper.to_xhtml())
}
