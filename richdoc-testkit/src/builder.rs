//! Tag-aware document builders over the basic schema.
//!
//! Text arguments may contain `<name>` markers. A marker is removed from the
//! text and its position recorded, so tests can refer to positions by name
//! instead of counting tokens by hand.

use crate::schema;
use richdoc::{Attrs, Fragment, Node, Slice};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Source of the image built by [`img2`].
pub const DATA_IMAGE: &str = "data:image/gif;base64,R0lGODlhAQABAIAAAAUEBAAAACwAAAAAAQABAAACAkQBADs=";

/// A run of sibling nodes plus the tags recorded in them, relative to the
/// start of the run.
#[derive(Debug, Clone, Default)]
pub struct Built {
    pub nodes: Vec<Node>,
    pub tags: BTreeMap<String, usize>,
}

impl Built {
    fn size(&self) -> usize {
        self.nodes.iter().map(Node::node_size).sum()
    }
}

impl From<&str> for Built {
    fn from(source: &str) -> Self {
        let mut text = String::new();
        let mut tags = BTreeMap::new();
        let mut len = 0;
        let mut rest = source;
        while let Some(open) = rest.find('<') {
            let after = &rest[open + 1..];
            let name_len = after
                .find(|c: char| !c.is_ascii_alphanumeric())
                .unwrap_or(after.len());
            if name_len == 0 || !after[name_len..].starts_with('>') {
                // Not a tag; keep the bracket as text.
                text.push_str(&rest[..=open]);
                len += rest[..=open].chars().count();
                rest = after;
                continue;
            }
            text.push_str(&rest[..open]);
            len += rest[..open].chars().count();
            tags.insert(after[..name_len].to_string(), len);
            rest = &after[name_len + 1..];
        }
        text.push_str(rest);
        let nodes = if text.is_empty() {
            Vec::new()
        } else {
            vec![schema().text(&text, vec![]).expect("text node")]
        };
        Built { nodes, tags }
    }
}

impl From<Node> for Built {
    fn from(node: Node) -> Self {
        Built {
            nodes: vec![node],
            tags: BTreeMap::new(),
        }
    }
}

fn flatten(children: Vec<Built>) -> Built {
    let mut out = Built::default();
    for child in children {
        let offset = out.size();
        for (name, pos) in child.tags {
            out.tags.insert(name, pos + offset);
        }
        out.nodes.extend(child.nodes);
    }
    out
}

/// A document together with its named positions.
#[derive(Debug, Clone)]
pub struct Tagged {
    pub node: Node,
    pub tags: BTreeMap<String, usize>,
}

impl Tagged {
    /// The position recorded for `name`. Panics when the tag is missing.
    pub fn tag(&self, name: &str) -> usize {
        match self.tags.get(name) {
            Some(pos) => *pos,
            None => panic!("document {} has no tag <{name}>", self.node),
        }
    }

    pub fn try_tag(&self, name: &str) -> Option<usize> {
        self.tags.get(name).copied()
    }

    /// The slice between the `<a>` and `<b>` tags.
    pub fn slice_ab(&self) -> Slice {
        self.node
            .slice(self.tag("a"), self.tag("b"), false)
            .expect("tags inside the document")
    }
}

pub fn attrs(value: Value) -> Attrs {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        other => panic!("attributes must be an object, got {other}"),
    }
}

/// Build a non-text node of the named type around `children`.
pub fn block(name: &str, attrs: Option<&Attrs>, children: Vec<Built>) -> Built {
    let inner = flatten(children);
    let node = schema()
        .node(name, attrs, inner.nodes, vec![])
        .unwrap_or_else(|err| panic!("building {name}: {err}"));
    Built {
        nodes: vec![node],
        tags: inner.tags.into_iter().map(|(k, v)| (k, v + 1)).collect(),
    }
}

/// Add the named mark to every node in `children`.
pub fn mark(name: &str, attrs: Option<&Attrs>, children: Vec<Built>) -> Built {
    let mark = schema()
        .mark(name, attrs)
        .unwrap_or_else(|err| panic!("building mark {name}: {err}"));
    let inner = flatten(children);
    Built {
        nodes: inner
            .nodes
            .iter()
            .map(|node| node.mark(mark.add_to_set(node.marks())))
            .collect(),
        tags: inner.tags,
    }
}

/// Build a top-level document. Its tags are document positions.
pub fn build_doc(children: Vec<Built>) -> Tagged {
    let inner = flatten(children);
    let node = schema()
        .node("doc", None, inner.nodes, vec![])
        .expect("doc node");
    Tagged {
        node,
        tags: inner.tags,
    }
}

pub fn br() -> Node {
    schema()
        .node("hard_break", None, Fragment::empty(), vec![])
        .expect("hard_break")
}

pub fn hr() -> Node {
    schema()
        .node("horizontal_rule", None, Fragment::empty(), vec![])
        .expect("horizontal_rule")
}

pub fn img() -> Node {
    let attrs = attrs(json!({"src": "img.png"}));
    schema()
        .node("image", Some(&attrs), Fragment::empty(), vec![])
        .expect("image")
}

pub fn img2() -> Node {
    let attrs = attrs(json!({"src": DATA_IMAGE, "alt": "y"}));
    schema()
        .node("image", Some(&attrs), Fragment::empty(), vec![])
        .expect("image")
}

#[macro_export]
macro_rules! doc {
    ($($child:expr),* $(,)?) => {
        $crate::build_doc(vec![$($crate::Built::from($child)),*])
    };
}

#[macro_export]
macro_rules! p {
    ($($child:expr),* $(,)?) => {
        $crate::block("paragraph", None, vec![$($crate::Built::from($child)),*])
    };
}

#[macro_export]
macro_rules! blockquote {
    ($($child:expr),* $(,)?) => {
        $crate::block("blockquote", None, vec![$($crate::Built::from($child)),*])
    };
}

#[macro_export]
macro_rules! pre {
    ($($child:expr),* $(,)?) => {
        $crate::block("code_block", None, vec![$($crate::Built::from($child)),*])
    };
}

#[macro_export]
macro_rules! h1 {
    ($($child:expr),* $(,)?) => {
        $crate::block(
            "heading",
            Some(&$crate::attrs($crate::json!({"level": 1}))),
            vec![$($crate::Built::from($child)),*],
        )
    };
}

#[macro_export]
macro_rules! h2 {
    ($($child:expr),* $(,)?) => {
        $crate::block(
            "heading",
            Some(&$crate::attrs($crate::json!({"level": 2}))),
            vec![$($crate::Built::from($child)),*],
        )
    };
}

#[macro_export]
macro_rules! li {
    ($($child:expr),* $(,)?) => {
        $crate::block("list_item", None, vec![$($crate::Built::from($child)),*])
    };
}

#[macro_export]
macro_rules! ol {
    ($($child:expr),* $(,)?) => {
        $crate::block("ordered_list", None, vec![$($crate::Built::from($child)),*])
    };
}

#[macro_export]
macro_rules! ul {
    ($($child:expr),* $(,)?) => {
        $crate::block("bullet_list", None, vec![$($crate::Built::from($child)),*])
    };
}

#[macro_export]
macro_rules! em {
    ($($child:expr),* $(,)?) => {
        $crate::mark("em", None, vec![$($crate::Built::from($child)),*])
    };
}

#[macro_export]
macro_rules! strong {
    ($($child:expr),* $(,)?) => {
        $crate::mark("strong", None, vec![$($crate::Built::from($child)),*])
    };
}

#[macro_export]
macro_rules! code {
    ($($child:expr),* $(,)?) => {
        $crate::mark("code", None, vec![$($crate::Built::from($child)),*])
    };
}

/// A link to `http://foo`.
#[macro_export]
macro_rules! a {
    ($($child:expr),* $(,)?) => {
        $crate::mark(
            "link",
            Some(&$crate::attrs($crate::json!({"href": "http://foo"}))),
            vec![$($crate::Built::from($child)),*],
        )
    };
}

/// A link to `http://bar`.
#[macro_export]
macro_rules! a2 {
    ($($child:expr),* $(,)?) => {
        $crate::mark(
            "link",
            Some(&$crate::attrs($crate::json!({"href": "http://bar"}))),
            vec![$($crate::Built::from($child)),*],
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_document_positions() {
        let d = build_doc(vec![
            block("paragraph", None, vec!["ab<a>c".into()]),
            "<between>".into(),
            block("blockquote", None, vec![block("paragraph", None, vec!["<b>x".into()])]),
        ]);
        assert_eq!(d.tag("a"), 3);
        assert_eq!(d.tag("between"), 5);
        assert_eq!(d.tag("b"), 7);
        assert_eq!(d.node.to_string(), r#"doc(paragraph("abc"), blockquote(paragraph("x")))"#);
    }

    #[test]
    fn marks_wrap_every_child() {
        let d = build_doc(vec![block(
            "paragraph",
            None,
            vec![mark("em", None, vec!["a<x>b".into(), br().into()])],
        )]);
        assert_eq!(d.tag("x"), 2);
        assert_eq!(d.node.to_string(), r#"doc(paragraph(em("ab"), em(hard_break)))"#);
    }

    #[test]
    fn lone_bracket_stays_text() {
        let built = Built::from("a < b");
        assert!(built.tags.is_empty());
        assert_eq!(built.nodes[0].text(), Some("a < b"));
    }
}
