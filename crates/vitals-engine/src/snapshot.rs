//! Serialized page, as captured from a live page.
//!
//! The capture is a flat list in document order. Each node names its parent
//! by handle, so nesting depth never reaches the JSON parser.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::dom::{Document, Rect};

/// One captured node.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "t", rename_all = "lowercase")]
pub enum SnapshotNode {
    Element {
        tag: String,
        /// Document-order index of the element on the page.
        handle: usize,
        /// Handle of the parent element; `None` for the document element.
        #[serde(default)]
        parent: Option<usize>,
        #[serde(default)]
        attrs: BTreeMap<String, String>,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        selected_index: Option<i64>,
        #[serde(default)]
        width: f64,
        #[serde(default)]
        height: f64,
    },
    Text {
        parent: usize,
        text: String,
    },
}

/// A captured page: its nodes, parents first, plus the focused element.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageSnapshot {
    pub nodes: Vec<SnapshotNode>,
    #[serde(default)]
    pub active: Option<usize>,
}

impl PageSnapshot {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl Document {
    /// Rebuild a document from a captured page.
    ///
    /// Nodes whose parent has not been seen yet are dropped with their subtree.
    pub fn from_snapshot(snapshot: &PageSnapshot) -> Self {
        let mut doc = Document::new();
        for node in &snapshot.nodes {
            match node {
                SnapshotNode::Text { parent, text } => {
                    if let Some(parent) = doc.by_handle(*parent) {
                        doc.append_text(parent, text);
                    }
                }
                SnapshotNode::Element {
                    tag,
                    handle,
                    parent,
                    attrs,
                    value,
                    selected_index,
                    width,
                    height,
                } => {
                    let parent = match parent {
                        None => doc.root(),
                        Some(h) => match doc.by_handle(*h) {
                            Some(p) => p,
                            None => continue,
                        },
                    };
                    let pairs: Vec<(&str, &str)> = attrs
                        .iter()
                        .map(|(k, v)| (k.as_str(), v.as_str()))
                        .collect();
                    let id = doc.append(parent, tag, &pairs);
                    doc.set_handle(id, *handle);
                    doc.set_rect(id, Rect::new(*width, *height));
                    if let Some(v) = value {
                        doc.seed_value(id, v);
                    }
                    // selectedIndex is -1 when nothing is selected
                    if let Some(i) = selected_index {
                        doc.seed_selected_index(id, usize::try_from(*i).ok());
                    }
                }
            }
        }
        let active = snapshot.active.and_then(|h| doc.by_handle(h));
        doc.seed_active(active);
        doc
    }
}
