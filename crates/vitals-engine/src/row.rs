//! Row resolution: from a matched label up to its row, then the row's candidates.

use crate::dom::{Document, NodeId};
use crate::visibility::{is_candidate_choice, is_candidate_input};

/// Class-name substring that marks a `<div>` as a row.
pub const ROW_CLASS_MARKER: &str = "row";

/// `<tr>`, or a `<div>` whose class contains the row marker.
pub fn is_row_element(doc: &Document, node: NodeId) -> bool {
    match doc.tag(node) {
        Some("tr") => true,
        Some("div") => doc
            .attr(node, "class")
            .is_some_and(|c| c.contains(ROW_CLASS_MARKER)),
        _ => false,
    }
}

/// Nearest inclusive ancestor that is a row, else the immediate parent.
/// `None` only when neither exists (detached or top-level element).
pub fn resolve_row(doc: &Document, label: NodeId) -> Option<NodeId> {
    doc.closest(label, is_row_element)
        .or_else(|| doc.parent(label))
}

/// Candidate text inputs under `row`, in document order.
pub fn row_inputs(doc: &Document, row: NodeId) -> Vec<NodeId> {
    doc.descendants(row)
        .into_iter()
        .filter(|n| is_candidate_input(doc, *n))
        .collect()
}

/// Candidate choice controls under `row`, in document order.
pub fn row_selections(doc: &Document, row: NodeId) -> Vec<NodeId> {
    doc.descendants(row)
        .into_iter()
        .filter(|n| is_candidate_choice(doc, *n))
        .collect()
}

/// A row and its candidates, enumerated fresh from the current document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRow {
    pub row: NodeId,
    pub inputs: Vec<NodeId>,
    pub selections: Vec<NodeId>,
}

impl ResolvedRow {
    pub fn enumerate(doc: &Document, row: NodeId) -> Self {
        Self {
            row,
            inputs: row_inputs(doc, row),
            selections: row_selections(doc, row),
        }
    }

    /// Resolve the row enclosing `label` and enumerate it.
    pub fn from_label(doc: &Document, label: NodeId) -> Option<Self> {
        resolve_row(doc, label).map(|row| Self::enumerate(doc, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Rect;

    #[test]
    fn test_resolves_table_row() {
        let mut doc = Document::new();
        let root = doc.root();
        let table = doc.append(root, "table", &[]);
        let tr = doc.append(table, "tr", &[]);
        let td = doc.append(tr, "td", &[]);
        let span = doc.append(td, "span", &[]);
        assert_eq!(resolve_row(&doc, span), Some(tr));
        assert_eq!(resolve_row(&doc, tr), Some(tr));
    }

    #[test]
    fn test_resolves_div_row_by_class() {
        let mut doc = Document::new();
        let root = doc.root();
        let row = doc.append(root, "div", &[("class", "vitals-row wide")]);
        let label = doc.append(row, "label", &[]);
        assert_eq!(resolve_row(&doc, label), Some(row));
    }

    #[test]
    fn test_falls_back_to_parent() {
        let mut doc = Document::new();
        let root = doc.root();
        let section = doc.append(root, "section", &[]);
        let label = doc.append(section, "b", &[]);
        assert_eq!(resolve_row(&doc, label), Some(section));

        let loose = doc.create_detached("b");
        assert_eq!(resolve_row(&doc, loose), None);
    }

    #[test]
    fn test_enumerates_visible_candidates_in_order() {
        let mut doc = Document::new();
        let root = doc.root();
        let tr = doc.append(root, "tr", &[]);
        let a = doc.append(tr, "input", &[("type", "text")]);
        doc.append(tr, "input", &[("type", "checkbox")]);
        let hidden = doc.append(tr, "input", &[]);
        doc.set_rect(hidden, Rect::ZERO);
        doc.append(tr, "input", &[("readonly", "readonly")]);
        let td = doc.append(tr, "td", &[]);
        let b = doc.append(td, "input", &[]);
        let s = doc.append(td, "select", &[]);

        let resolved = ResolvedRow::enumerate(&doc, tr);
        assert_eq!(resolved.inputs, vec![a, b]);
        assert_eq!(resolved.selections, vec![s]);
    }
}
