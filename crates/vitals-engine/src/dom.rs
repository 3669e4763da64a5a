//! In-memory element tree that the locators and injectors operate on.
//!
//! Mirrors the parts of a live page the engine reads (tag, attributes, text,
//! offset box, value, selection) and records every write in an ordered
//! journal so the same writes can be replayed against the real page.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Arena index of a node. Stable for the lifetime of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Offset box of an element (`offsetWidth` x `offsetHeight`).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        width: 0.0,
        height: 0.0,
    };

    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when the box has no area, i.e. the element is not rendered.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Box given to elements built by hand (fixtures, tests).
const DEFAULT_RECT: Rect = Rect::new(120.0, 24.0);

/// Event kinds the injectors replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Focus,
    Input,
    Change,
    Blur,
    KeyDown,
    KeyPress,
    KeyUp,
}

impl EventKind {
    /// DOM event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Focus => "focus",
            Self::Input => "input",
            Self::Change => "change",
            Self::Blur => "blur",
            Self::KeyDown => "keydown",
            Self::KeyPress => "keypress",
            Self::KeyUp => "keyup",
        }
    }

    pub fn is_keyboard(&self) -> bool {
        matches!(self, Self::KeyDown | Self::KeyPress | Self::KeyUp)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bubbling synthetic event. Keyboard events carry the written value as key data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticEvent {
    pub kind: EventKind,
    pub key: Option<String>,
}

impl SyntheticEvent {
    pub fn new(kind: EventKind) -> Self {
        Self { kind, key: None }
    }

    pub fn with_key(kind: EventKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: Some(key.into()),
        }
    }
}

/// One recorded write against the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    SetValue { node: NodeId, value: String },
    Focus { node: NodeId },
    Dispatch { node: NodeId, event: SyntheticEvent },
    /// Reassign `value` only if the element no longer holds it.
    RestoreValue { node: NodeId, value: String },
    SelectIndex { node: NodeId, index: usize },
    SetText { node: NodeId, text: String },
}

impl Mutation {
    pub fn node(&self) -> NodeId {
        match self {
            Self::SetValue { node, .. }
            | Self::Focus { node }
            | Self::Dispatch { node, .. }
            | Self::RestoreValue { node, .. }
            | Self::SelectIndex { node, .. }
            | Self::SetText { node, .. } => *node,
        }
    }
}

/// A host-page listener: receives the element's current value and may return
/// a replacement (coercion, reset).
pub type Listener = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

struct Binding {
    node: NodeId,
    kind: EventKind,
    listener: Listener,
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    attrs: BTreeMap<String, String>,
    value: String,
    selected_index: Option<usize>,
    rect: Rect,
    handle: Option<usize>,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Arena-backed element tree.
pub struct Document {
    nodes: Vec<Node>,
    active: Option<NodeId>,
    handles: HashMap<usize, NodeId>,
    bindings: Vec<Binding>,
    journal: Vec<Mutation>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.len())
            .field("active", &self.active)
            .field("listeners", &self.bindings.len())
            .field("journal", &self.journal.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            active: None,
            handles: HashMap::new(),
            bindings: Vec::new(),
            journal: Vec::new(),
        }
    }

    /// The document node. Not an element.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    // =========================================================================
    // Building
    // =========================================================================

    fn push(&mut self, parent: Option<NodeId>, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            kind,
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        id
    }

    fn new_element(tag: &str, attrs: &[(&str, &str)]) -> Element {
        let attrs: BTreeMap<String, String> = attrs
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), (*v).to_string()))
            .collect();
        Element {
            tag: tag.to_ascii_lowercase(),
            value: attrs.get("value").cloned().unwrap_or_default(),
            attrs,
            selected_index: None,
            rect: DEFAULT_RECT,
            handle: None,
        }
    }

    /// Append an element with the given attributes under `parent`.
    pub fn append(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let element = Self::new_element(tag, attrs);
        self.push(Some(parent), NodeKind::Element(element))
    }

    /// Append a text node under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(Some(parent), NodeKind::Text(text.to_string()))
    }

    /// Create an element that is not attached anywhere.
    pub fn create_detached(&mut self, tag: &str) -> NodeId {
        let element = Self::new_element(tag, &[]);
        self.push(None, NodeKind::Element(element))
    }

    /// Set (or overwrite) an attribute. Builder-side, not journaled.
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(node) {
            el.attrs.insert(name.to_ascii_lowercase(), value.to_string());
        }
    }

    /// Set the offset box. `Rect::ZERO` makes the element unrendered.
    pub fn set_rect(&mut self, node: NodeId, rect: Rect) {
        if let Some(el) = self.element_mut(node) {
            el.rect = rect;
        }
    }

    /// Attach the page handle used to address this element on the live page.
    pub fn set_handle(&mut self, node: NodeId, handle: usize) {
        if let Some(el) = self.element_mut(node) {
            el.handle = Some(handle);
            self.handles.insert(handle, node);
        }
    }

    /// Seed a value without recording it (the page already holds it).
    pub fn seed_value(&mut self, node: NodeId, value: &str) {
        if let Some(el) = self.element_mut(node) {
            el.value = value.to_string();
        }
    }

    /// Seed a selection without recording it.
    pub fn seed_selected_index(&mut self, node: NodeId, index: Option<usize>) {
        if let Some(el) = self.element_mut(node) {
            el.selected_index = index;
        }
    }

    /// Seed focus without recording it.
    pub fn seed_active(&mut self, node: Option<NodeId>) {
        self.active = node;
    }

    /// Register a host listener for `kind` on `node`.
    pub fn on(
        &mut self,
        node: NodeId,
        kind: EventKind,
        listener: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) {
        self.bindings.push(Binding {
            node,
            kind,
            listener: Box::new(listener),
        });
    }

    // =========================================================================
    // Reading
    // =========================================================================

    fn element(&self, node: NodeId) -> Option<&Element> {
        match &self.nodes.get(node.0)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node.0)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    /// Lower-case tag name, `None` for text and document nodes.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|el| el.tag.as_str())
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)
            .and_then(|el| el.attrs.get(&name.to_ascii_lowercase()))
            .map(String::as_str)
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    pub fn rect(&self, node: NodeId) -> Rect {
        self.element(node).map(|el| el.rect).unwrap_or(Rect::ZERO)
    }

    pub fn handle(&self, node: NodeId) -> Option<usize> {
        self.element(node).and_then(|el| el.handle)
    }

    pub fn by_handle(&self, handle: usize) -> Option<NodeId> {
        self.handles.get(&handle).copied()
    }

    /// Current value of a form element (empty for anything else).
    pub fn value(&self, node: NodeId) -> &str {
        self.element(node).map(|el| el.value.as_str()).unwrap_or("")
    }

    /// Parent element. `None` for top-level elements and detached nodes.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(node.0)?.parent?;
        self.is_element(parent).then_some(parent)
    }

    /// Element children in order.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(node.0)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|c| self.is_element(*c))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Element descendants of `node` in document order, excluding `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(node.0) {
            Some(n) => n.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(id) = stack.pop() {
            if self.is_element(id) {
                out.push(id);
            }
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    /// Every element in the document, in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root())
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(node.0) else {
            return;
        };
        match &n.kind {
            NodeKind::Text(t) => out.push_str(t),
            _ => {
                for child in &n.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Nearest inclusive ancestor satisfying `pred`.
    pub fn closest(&self, node: NodeId, pred: impl Fn(&Self, NodeId) -> bool) -> Option<NodeId> {
        let mut cursor = self.is_element(node).then_some(node);
        while let Some(current) = cursor {
            if pred(self, current) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    /// Whether `node` sits strictly inside `ancestor`.
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.nodes.get(node.0).and_then(|n| n.parent);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes[current.0].parent;
        }
        false
    }

    /// `isContentEditable`, inherited from the nearest ancestor that sets it.
    pub fn is_content_editable(&self, node: NodeId) -> bool {
        let mut cursor = self.is_element(node).then_some(node);
        while let Some(current) = cursor {
            match self.attr(current, "contenteditable") {
                Some(v) if v.is_empty() || v.eq_ignore_ascii_case("true") => return true,
                Some(v) if v.eq_ignore_ascii_case("false") => return false,
                _ => {}
            }
            cursor = self.parent(current);
        }
        false
    }

    /// `<option>` elements of a select, in order.
    pub fn options(&self, node: NodeId) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|d| self.tag(*d) == Some("option"))
            .collect()
    }

    pub fn option_count(&self, node: NodeId) -> usize {
        self.options(node).len()
    }

    /// `selectedIndex`: explicit selection, else the first `selected` option,
    /// else 0 when any options exist.
    pub fn selected_index(&self, node: NodeId) -> Option<usize> {
        let el = self.element(node)?;
        if el.selected_index.is_some() {
            return el.selected_index;
        }
        let options = self.options(node);
        if options.is_empty() {
            return None;
        }
        Some(
            options
                .iter()
                .position(|o| self.has_attr(*o, "selected"))
                .unwrap_or(0),
        )
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active
    }

    // =========================================================================
    // Writing (journaled)
    // =========================================================================

    pub fn set_value(&mut self, node: NodeId, value: &str) {
        if let Some(el) = self.element_mut(node) {
            el.value = value.to_string();
            self.journal.push(Mutation::SetValue {
                node,
                value: value.to_string(),
            });
        }
    }

    pub fn focus(&mut self, node: NodeId) {
        if self.is_element(node) {
            self.active = Some(node);
            self.journal.push(Mutation::Focus { node });
        }
    }

    /// Dispatch an event and run the host listeners bound to it.
    pub fn dispatch(&mut self, node: NodeId, event: SyntheticEvent) {
        if !self.is_element(node) {
            return;
        }
        let kind = event.kind;
        self.journal.push(Mutation::Dispatch { node, event });

        let mut current = self.value(node).to_string();
        for binding in self
            .bindings
            .iter()
            .filter(|b| b.node == node && b.kind == kind)
        {
            if let Some(next) = (binding.listener)(&current) {
                current = next;
            }
        }
        if let Some(el) = self.element_mut(node) {
            el.value = current;
        }
    }

    /// Reassign `value` if a listener changed it. Returns whether it had to.
    pub fn restore_value(&mut self, node: NodeId, value: &str) -> bool {
        if !self.is_element(node) {
            return false;
        }
        self.journal.push(Mutation::RestoreValue {
            node,
            value: value.to_string(),
        });
        let Some(el) = self.element_mut(node) else {
            return false;
        };
        if el.value == value {
            return false;
        }
        el.value = value.to_string();
        true
    }

    pub fn select_index(&mut self, node: NodeId, index: usize) {
        if let Some(el) = self.element_mut(node) {
            el.selected_index = Some(index);
            self.journal.push(Mutation::SelectIndex { node, index });
        }
    }

    /// Replace all children of `node` with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if !self.is_element(node) {
            return;
        }
        self.nodes[node.0].children.clear();
        if !text.is_empty() {
            self.append_text(node, text);
        }
        self.journal.push(Mutation::SetText {
            node,
            text: text.to_string(),
        });
    }

    // =========================================================================
    // Journal
    // =========================================================================

    pub fn journal(&self) -> &[Mutation] {
        &self.journal
    }

    /// Drain the recorded writes.
    pub fn take_journal(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.journal)
    }

    /// Events dispatched at `node`, in order.
    pub fn dispatched(&self, node: NodeId) -> Vec<&SyntheticEvent> {
        self.journal
            .iter()
            .filter_map(|m| match m {
                Mutation::Dispatch { node: n, event } if *n == node => Some(event),
                _ => None,
            })
            .collect()
    }
}
