//! Rendered-document snapshots.
//!
//! A [`DomSnapshot`] is an arena of element nodes in document order. Each node
//! carries the computed style values and layout rectangle captured after the
//! engine finished layout, plus the index of its parent element. Parent links
//! always point backwards, so ancestor walks terminate without a visited set.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Layout rectangle in viewport pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Both dimensions are strictly positive
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Computed style values as the engine reported them (strings, unparsed)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputedStyle {
    pub color: String,
    pub background_color: String,
    pub font_size: String,
    pub font_weight: String,
}

/// One element of the rendered document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomNode {
    /// Lower-cased tag name
    pub tag: String,
    /// Full text content (descendant text included)
    pub text: String,
    /// Class attribute, for diagnostics
    pub classes: String,
    /// Index of the parent element, `None` for the root
    pub parent: Option<usize>,
    /// Number of child *elements* (text nodes excluded)
    pub child_element_count: usize,
    pub style: ComputedStyle,
    pub rect: Rect,
}

impl DomNode {
    /// Leniently decode a node produced by an in-page collector.
    ///
    /// Missing or mistyped fields fall back to empty values so that one odd
    /// node degrades instead of failing the whole snapshot.
    pub fn from_value(value: &Value) -> Self {
        let text_of = |v: Option<&Value>| -> String {
            match v {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => String::new(),
            }
        };
        let num_of = |v: Option<&Value>| v.and_then(Value::as_f64).unwrap_or(0.0);

        let style = value.get("style");
        let rect = value.get("rect");
        Self {
            tag: text_of(value.get("tag")).to_ascii_lowercase(),
            text: text_of(value.get("text")),
            classes: text_of(value.get("classes")),
            parent: value
                .get("parent")
                .and_then(Value::as_u64)
                .map(|p| p as usize),
            child_element_count: value
                .get("childElementCount")
                .and_then(Value::as_u64)
                .unwrap_or(0) as usize,
            style: ComputedStyle {
                color: text_of(style.and_then(|s| s.get("color"))),
                background_color: text_of(style.and_then(|s| s.get("backgroundColor"))),
                font_size: text_of(style.and_then(|s| s.get("fontSize"))),
                font_weight: text_of(style.and_then(|s| s.get("fontWeight"))),
            },
            rect: Rect {
                x: num_of(rect.and_then(|r| r.get("x"))),
                y: num_of(rect.and_then(|r| r.get("y"))),
                width: num_of(rect.and_then(|r| r.get("width"))),
                height: num_of(rect.and_then(|r| r.get("height"))),
            },
        }
    }
}

/// An immutable, validated snapshot of a rendered document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomSnapshot {
    pub url: String,
    pub title: String,
    nodes: Vec<DomNode>,
}

impl DomSnapshot {
    /// Build a snapshot, checking that every parent index refers to an
    /// earlier node.
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        nodes: Vec<DomNode>,
    ) -> Result<Self> {
        for (idx, node) in nodes.iter().enumerate() {
            if let Some(p) = node.parent {
                if p >= idx {
                    return Err(Error::InvalidInput(format!(
                        "node {} ({}) has parent {} which does not precede it in document order",
                        idx, node.tag, p
                    )));
                }
            }
        }
        Ok(Self { url: url.into(), title: title.into(), nodes })
    }

    /// Decode a collector payload: either a bare node array or an object
    /// with a `nodes` array (and optional `url`/`title`).
    pub fn from_value(value: &Value) -> Result<Self> {
        let (nodes, url, title) = match value {
            Value::Null => {
                return Err(Error::InvalidInput("element collection is missing".into()));
            }
            Value::Array(items) => (items, "", ""),
            Value::Object(map) => match map.get("nodes") {
                Some(Value::Array(items)) => (
                    items,
                    map.get("url").and_then(Value::as_str).unwrap_or(""),
                    map.get("title").and_then(Value::as_str).unwrap_or(""),
                ),
                Some(other) => {
                    return Err(Error::InvalidInput(format!(
                        "`nodes` must be an array, got {}",
                        json_kind(other)
                    )));
                }
                None => {
                    return Err(Error::InvalidInput("object has no `nodes` array".into()));
                }
            },
            other => {
                return Err(Error::InvalidInput(format!(
                    "expected an array of elements, got {}",
                    json_kind(other)
                )));
            }
        };
        let nodes = nodes.iter().map(DomNode::from_value).collect();
        Self::new(url, title, nodes)
    }

    /// Parse collector JSON text
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)
            .map_err(|e| Error::InvalidInput(format!("snapshot is not valid JSON: {}", e)))?;
        Self::from_value(&value)
    }

    pub fn nodes(&self) -> &[DomNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&DomNode> {
        self.nodes.get(idx)
    }

    /// Iterate ancestors of `idx`, nearest first
    pub fn ancestors(&self, idx: usize) -> Ancestors<'_> {
        let next = self.nodes.get(idx).and_then(|n| n.parent);
        Ancestors { snapshot: self, next }
    }
}

/// Iterator over a node's ancestor chain
pub struct Ancestors<'a> {
    snapshot: &'a DomSnapshot,
    next: Option<usize>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = (usize, &'a DomNode);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = self.snapshot.nodes.get(idx)?;
        self.next = node.parent;
        Some((idx, node))
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_missing_and_non_array_input() {
        assert!(matches!(DomSnapshot::from_value(&Value::Null), Err(Error::InvalidInput(_))));
        assert!(matches!(DomSnapshot::from_value(&json!(42)), Err(Error::InvalidInput(_))));
        let wrong_type = json!({"nodes": "x"});
        assert!(matches!(DomSnapshot::from_value(&wrong_type), Err(Error::InvalidInput(_))));
        assert!(matches!(DomSnapshot::from_json_str("not json"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn empty_array_is_a_valid_empty_snapshot() {
        let snap = DomSnapshot::from_value(&json!([])).unwrap();
        assert!(snap.is_empty());
    }

    #[test]
    fn rejects_forward_parent_links() {
        let nodes = vec![
            DomNode { tag: "a".into(), parent: Some(1), ..Default::default() },
            DomNode { tag: "b".into(), ..Default::default() },
        ];
        assert!(matches!(DomSnapshot::new("", "", nodes), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn lenient_node_decoding() {
        let snap = DomSnapshot::from_value(&json!({
            "url": "http://x/",
            "nodes": [
                {"tag": "BODY", "childElementCount": 1},
                {"tag": "P", "parent": 0, "text": "hi",
                 "style": {"color": "rgb(0, 0, 0)", "fontWeight": 700, "fontSize": "16px"},
                 "rect": {"x": 1, "y": 2, "width": 3.5, "height": "bad"}},
                "garbage"
            ]
        }))
        .unwrap();
        assert_eq!(snap.url, "http://x/");
        let p = snap.get(1).unwrap();
        assert_eq!(p.tag, "p");
        assert_eq!(p.style.font_weight, "700");
        assert_eq!(p.rect.width, 3.5);
        assert_eq!(p.rect.height, 0.0);
        assert_eq!(snap.get(2).unwrap().tag, "");
    }

    #[test]
    fn ancestors_walk_to_root() {
        let nodes = vec![
            DomNode { tag: "html".into(), ..Default::default() },
            DomNode { tag: "body".into(), parent: Some(0), ..Default::default() },
            DomNode { tag: "p".into(), parent: Some(1), ..Default::default() },
        ];
        let snap = DomSnapshot::new("", "", nodes).unwrap();
        let tags: Vec<_> = snap.ancestors(2).map(|(_, n)| n.tag.as_str()).collect();
        assert_eq!(tags, vec!["body", "html"]);
        assert_eq!(snap.ancestors(0).count(), 0);
    }
}
