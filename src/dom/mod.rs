//! Owned HTML document tree.
//!
//! Chapter HTML is parsed with html5ever and converted into an owned tree
//! of `{element, text}` nodes that transformation passes can mutate freely
//! without reference-counted aliasing, then serialized back out as XHTML
//! (empty elements self-close, text and attribute values are escaped).
//!
//! Mutating passes address nodes by *paths*: the sequence of child indices
//! from a root element down to a node. Paths collected up front stay valid
//! as long as a pass only mutates in place or replaces nodes at their own
//! index.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::util::{escape_text, escape_xml};

/// A node in the owned tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element attribute. Namespaced attribute names keep their prefix
/// (`xlink:href`).
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

/// An element with its attributes and children, in document order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
}

/// Parse an HTML document and return its root element.
///
/// html5ever is error-tolerant: any input yields a tree (with synthesized
/// `html`/`head`/`body` as needed), so "unparsable" content surfaces later
/// as a missing content container rather than a parse failure.
pub fn parse(html: &str) -> Element {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: false,
            ..Default::default()
        },
        ..Default::default()
    };

    let dom = parse_document(RcDom::default(), opts)
        .from_utf8()
        .one(html.as_bytes());

    for child in dom.document.children.borrow().iter() {
        if let Some(Node::Element(root)) = convert(child) {
            return root;
        }
    }
    Element::new("html")
}

/// Convert an rcdom node into an owned node, dropping comments, doctypes,
/// and processing instructions.
fn convert(handle: &Handle) -> Option<Node> {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let mut element = Element::new(&name.local);
            for attr in attrs.borrow().iter() {
                let attr_name = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                    None => attr.name.local.to_string(),
                };
                element.attrs.push(Attr {
                    name: attr_name,
                    value: attr.value.to_string(),
                });
            }
            for child in handle.children.borrow().iter() {
                if let Some(node) = convert(child) {
                    element.children.push(node);
                }
            }
            Some(Node::Element(element))
        }
        NodeData::Text { contents } => Some(Node::Text(contents.borrow().to_string())),
        _ => None,
    }
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Get an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        if let Some(attr) = self.attrs.iter_mut().find(|a| a.name == name) {
            attr.value = value.to_string();
        } else {
            self.attrs.push(Attr {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(index).value)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, text: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => text.push_str(t),
                Node::Element(el) => el.collect_text(text),
            }
        }
    }

    /// First element in the subtree (including self) with the given id.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.attr("id") == Some(id) {
            return Some(self);
        }
        for child in &self.children {
            if let Node::Element(el) = child {
                if let Some(found) = el.find_by_id(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Visit self and every descendant element, pre-order.
    pub fn for_each_element<F: FnMut(&Element)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            if let Node::Element(el) = child {
                el.for_each_element(f);
            }
        }
    }

    /// Mutably visit self and every descendant element, pre-order.
    pub fn for_each_element_mut<F: FnMut(&mut Element)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.children {
            if let Node::Element(el) = child {
                el.for_each_element_mut(f);
            }
        }
    }

    /// Paths (child-index sequences, relative to self) of every descendant
    /// element matching the predicate, in document order. Self is not
    /// included.
    pub fn collect_element_paths(&self, pred: &dyn Fn(&Element) -> bool) -> Vec<Vec<usize>> {
        let mut paths = Vec::new();
        self.walk_paths(pred, &mut Vec::new(), &mut paths);
        paths
    }

    fn walk_paths(
        &self,
        pred: &dyn Fn(&Element) -> bool,
        path: &mut Vec<usize>,
        paths: &mut Vec<Vec<usize>>,
    ) {
        for (index, child) in self.children.iter().enumerate() {
            if let Node::Element(el) = child {
                path.push(index);
                if pred(el) {
                    paths.push(path.clone());
                }
                el.walk_paths(pred, path, paths);
                path.pop();
            }
        }
    }

    /// The element at the given path; the empty path addresses self.
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self;
        for &index in path {
            match current.children.get(index) {
                Some(Node::Element(el)) => current = el,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Mutable access to the element at the given path.
    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &index in path {
            match current.children.get_mut(index) {
                Some(Node::Element(el)) => current = el,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Serialize the element and its subtree to XHTML.
    pub fn to_xhtml(&self) -> String {
        let mut out = String::new();
        self.write_xhtml(&mut out);
        out
    }

    fn write_xhtml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for attr in &self.attrs {
            out.push(' ');
            out.push_str(&attr.name);
            out.push_str("=\"");
            out.push_str(&escape_xml(&attr.value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(&escape_text(text)),
                Node::Element(el) => el.write_xhtml(out),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}
