//! Candidate filters: which elements count as fillable inputs and choice controls.

use crate::dom::{Document, NodeId};

/// Rendered with a non-zero offset box.
pub fn is_rendered(doc: &Document, node: NodeId) -> bool {
    doc.is_element(node) && !doc.rect(node).is_empty()
}

/// `<input>` whose type is text (or missing).
pub fn is_text_like(doc: &Document, node: NodeId) -> bool {
    if doc.tag(node) != Some("input") {
        return false;
    }
    match doc.attr(node, "type") {
        None => true,
        Some(t) => t.is_empty() || t.eq_ignore_ascii_case("text"),
    }
}

/// A text input the engine may write into: text-like, editable, not hidden, rendered.
pub fn is_candidate_input(doc: &Document, node: NodeId) -> bool {
    is_text_like(doc, node)
        && !doc.has_attr(node, "readonly")
        && !doc.has_attr(node, "hidden")
        && is_rendered(doc, node)
}

/// A rendered `<select>`.
pub fn is_candidate_choice(doc: &Document, node: NodeId) -> bool {
    doc.tag(node) == Some("select") && is_rendered(doc, node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Rect;

    #[test]
    fn test_text_like_types() {
        let mut doc = Document::new();
        let root = doc.root();
        let bare = doc.append(root, "input", &[]);
        let text = doc.append(root, "input", &[("type", "TEXT")]);
        let number = doc.append(root, "input", &[("type", "number")]);
        let area = doc.append(root, "textarea", &[]);
        assert!(is_text_like(&doc, bare));
        assert!(is_text_like(&doc, text));
        assert!(!is_text_like(&doc, number));
        assert!(!is_text_like(&doc, area));
    }

    #[test]
    fn test_candidate_input_rejects_readonly_hidden_and_unrendered() {
        let mut doc = Document::new();
        let root = doc.root();
        let ok = doc.append(root, "input", &[("type", "text")]);
        let ro = doc.append(root, "input", &[("readonly", "")]);
        let hidden = doc.append(root, "input", &[("hidden", "")]);
        let collapsed = doc.append(root, "input", &[]);
        doc.set_rect(collapsed, Rect::new(0.0, 20.0));
        assert!(is_candidate_input(&doc, ok));
        assert!(!is_candidate_input(&doc, ro));
        assert!(!is_candidate_input(&doc, hidden));
        assert!(!is_candidate_input(&doc, collapsed));
    }

    #[test]
    fn test_candidate_choice() {
        let mut doc = Document::new();
        let root = doc.root();
        let select = doc.append(root, "select", &[]);
        let gone = doc.append(root, "select", &[]);
        doc.set_rect(gone, Rect::ZERO);
        assert!(is_candidate_choice(&doc, select));
        assert!(!is_candidate_choice(&doc, gone));
    }
}
