//! A small HTML tree for [`MemoryDom`](super::MemoryDom).
//!
//! The parser understands what server-rendered snippets contain in practice:
//! nested elements, quoted and bare attributes, void elements, comments and
//! raw-text elements (`script`, `style`, `textarea`, `title`). Entities are
//! kept verbatim, so content serializes back exactly as it was written.

use regex::Regex;
use std::{collections::HashMap, sync::LazyLock};

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];
const RAW_TEXT: &[&str] = &["script", "style", "textarea", "title"];

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--.*?-->|<![^>]*>|<(/?)([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s"'/>=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*/?>"#,
    )
    .expect("tag pattern is valid")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s"'/>=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("attribute pattern is valid")
});

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Element(u64),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
    pub parent: Option<u64>,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Arena of elements addressed by id.
#[derive(Debug, Default)]
pub(crate) struct Tree {
    elements: HashMap<u64, Element>,
    next: u64,
}

impl Tree {
    pub fn create(&mut self, tag: &str, attributes: Vec<(String, String)>) -> u64 {
        self.next += 1;
        self.elements.insert(
            self.next,
            Element {
                tag: tag.to_ascii_lowercase(),
                attributes,
                children: Vec::new(),
                parent: None,
            },
        );
        self.next
    }

    pub fn get(&self, id: u64) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    pub fn append_child(&mut self, parent: u64, child: u64) {
        if let Some(element) = self.elements.get_mut(&child) {
            element.parent = Some(parent);
        }
        if let Some(element) = self.elements.get_mut(&parent) {
            element.children.push(Node::Element(child));
        }
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: u64) -> Vec<u64> {
        let mut ancestors = Vec::new();
        let mut current = self.get(id).and_then(|e| e.parent);
        while let Some(parent) = current {
            ancestors.push(parent);
            current = self.get(parent).and_then(|e| e.parent);
        }
        ancestors
    }

    /// Descendant elements of `id` in document order, `id` excluded.
    pub fn descendants(&self, id: u64) -> Vec<u64> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: u64, out: &mut Vec<u64>) {
        let Some(element) = self.get(id) else {
            return;
        };
        for child in &element.children {
            if let Node::Element(child) = child {
                out.push(*child);
                self.collect_descendants(*child, out);
            }
        }
    }

    pub fn text_content(&self, id: u64) -> String {
        let mut text = String::new();
        self.collect_text(id, &mut text);
        text
    }

    fn collect_text(&self, id: u64, out: &mut String) {
        let Some(element) = self.get(id) else {
            return;
        };
        for child in &element.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(child) => self.collect_text(*child, out),
            }
        }
    }

    pub fn set_text(&mut self, id: u64, text: &str) {
        self.clear_children(id);
        if let Some(element) = self.get_mut(id) {
            element.children.push(Node::Text(text.to_owned()));
        }
    }

    pub fn inner_html(&self, id: u64) -> String {
        let mut html = String::new();
        if let Some(element) = self.get(id) {
            for child in &element.children {
                self.serialize(child, &mut html);
            }
        }
        html
    }

    fn serialize(&self, node: &Node, out: &mut String) {
        let id = match node {
            Node::Text(text) => {
                out.push_str(text);
                return;
            }
            Node::Element(id) => *id,
        };
        let Some(element) = self.get(id) else {
            return;
        };
        out.push('<');
        out.push_str(&element.tag);
        for (name, value) in &element.attributes {
            out.push_str(&format!(" {name}=\"{value}\""));
        }
        out.push('>');
        if VOID.contains(&element.tag.as_str()) {
            return;
        }
        for child in &element.children {
            self.serialize(child, out);
        }
        out.push_str(&format!("</{}>", element.tag));
    }

    pub fn set_inner_html(&mut self, id: u64, html: &str) {
        if self.get(id).is_none() {
            return;
        }
        self.clear_children(id);
        let nodes = self.parse_fragment(id, html);
        if let Some(element) = self.get_mut(id) {
            element.children = nodes;
        }
    }

    pub fn insert_html(&mut self, id: u64, at_start: bool, html: &str) {
        if self.get(id).is_none() {
            return;
        }
        let nodes = self.parse_fragment(id, html);
        if let Some(element) = self.get_mut(id) {
            if at_start {
                element.children.splice(0..0, nodes);
            } else {
                element.children.extend(nodes);
            }
        }
    }

    fn clear_children(&mut self, id: u64) {
        let Some(element) = self.get_mut(id) else {
            return;
        };
        let children = std::mem::take(&mut element.children);
        for child in children {
            if let Node::Element(child) = child {
                self.remove_subtree(child);
            }
        }
    }

    fn remove_subtree(&mut self, id: u64) {
        if let Some(element) = self.elements.remove(&id) {
            for child in element.children {
                if let Node::Element(child) = child {
                    self.remove_subtree(child);
                }
            }
        }
    }

    /// Parse `html` into fresh nodes owned by `parent`. The returned
    /// top-level nodes are not yet linked into `parent`'s children.
    pub fn parse_fragment(&mut self, parent: u64, html: &str) -> Vec<Node> {
        let mut top = Vec::new();
        let mut open: Vec<u64> = Vec::new();
        let mut pos = 0;

        while pos < html.len() {
            let Some(captures) = TAG.captures_at(html, pos) else {
                break;
            };
            let Some(whole) = captures.get(0) else {
                break;
            };
            if whole.start() > pos {
                self.push_node(&mut top, &open, parent, Node::Text(html[pos..whole.start()].into()));
            }
            pos = whole.end();

            let Some(name) = captures.get(2) else {
                continue;
            };
            let tag = name.as_str().to_ascii_lowercase();

            if captures.get(1).is_some_and(|slash| !slash.as_str().is_empty()) {
                let matching = open
                    .iter()
                    .rposition(|id| self.get(*id).is_some_and(|e| e.tag == tag));
                if let Some(depth) = matching {
                    open.truncate(depth);
                }
                continue;
            }

            let attributes = parse_attributes(captures.get(3).map_or("", |a| a.as_str()));
            let id = self.create(&tag, attributes);
            self.push_node(&mut top, &open, parent, Node::Element(id));

            if VOID.contains(&tag.as_str()) || whole.as_str().ends_with("/>") {
                continue;
            }
            if RAW_TEXT.contains(&tag.as_str()) {
                let close = format!("</{tag}");
                let end = html[pos..]
                    .to_ascii_lowercase()
                    .find(&close)
                    .map_or(html.len(), |offset| pos + offset);
                if end > pos {
                    if let Some(element) = self.get_mut(id) {
                        element.children.push(Node::Text(html[pos..end].into()));
                    }
                }
                pos = html[end..].find('>').map_or(html.len(), |offset| end + offset + 1);
                continue;
            }
            open.push(id);
        }

        if pos < html.len() {
            self.push_node(&mut top, &open, parent, Node::Text(html[pos..].into()));
        }
        top
    }

    fn push_node(&mut self, top: &mut Vec<Node>, open: &[u64], parent: u64, node: Node) {
        let owner = open.last().copied();
        if let Node::Element(child) = &node {
            if let Some(element) = self.get_mut(*child) {
                element.parent = Some(owner.unwrap_or(parent));
            }
        }
        match owner.and_then(|owner| self.get_mut(owner)) {
            Some(element) => element.children.push(node),
            None => top.push(node),
        }
    }
}

fn parse_attributes(source: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(source)
        .filter_map(|captures| {
            let name = captures.get(1)?.as_str().to_ascii_lowercase();
            let value = captures
                .get(2)
                .or_else(|| captures.get(3))
                .or_else(|| captures.get(4))
                .map_or("", |v| v.as_str());
            Some((name, value.to_owned()))
        })
        .collect()
}
