//! Exact-text label matching.
//!
//! An element qualifies when its trimmed text equals the label and is shorter
//! than a length bound; the bound rejects containers whose concatenated text
//! happens to equal or include the label. `<select>` elements never qualify
//! since their text aggregates every option.
//!
//! Duplicates resolve first-match-wins in document order. There is no ranking.

use crate::dom::{Document, NodeId};

/// Default upper bound (exclusive) on the matched text length, in characters.
pub const DEFAULT_MAX_LABEL_LEN: usize = 20;

/// Whether `node` carries exactly `label` as its trimmed text.
pub fn is_exact_label(doc: &Document, node: NodeId, label: &str, max_len: usize) -> bool {
    if doc.tag(node) == Some("select") {
        return false;
    }
    let text = doc.text_content(node);
    let text = text.trim();
    text == label && text.chars().count() < max_len
}

/// All elements under `root` whose trimmed text is exactly `label`, in document order.
pub fn exact_label_matches(
    doc: &Document,
    root: NodeId,
    label: &str,
    max_len: usize,
) -> Vec<NodeId> {
    doc.descendants(root)
        .into_iter()
        .filter(|n| is_exact_label(doc, *n, label, max_len))
        .collect()
}

/// First element under `root` whose trimmed text is exactly `label`.
pub fn find_by_exact_label(
    doc: &Document,
    root: NodeId,
    label: &str,
    max_len: usize,
) -> Option<NodeId> {
    doc.descendants(root)
        .into_iter()
        .find(|n| is_exact_label(doc, *n, label, max_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(doc: &mut Document, parent: NodeId, text: &str) -> NodeId {
        let td = doc.append(parent, "td", &[]);
        doc.append_text(td, text);
        td
    }

    #[test]
    fn test_rejects_superset_text() {
        let mut doc = Document::new();
        let root = doc.root();
        let tr = doc.append(root, "tr", &[]);
        cell(&mut doc, tr, "Prior BP History");
        assert_eq!(find_by_exact_label(&doc, root, "Prior", DEFAULT_MAX_LABEL_LEN), None);
    }

    #[test]
    fn test_matches_trimmed_text() {
        let mut doc = Document::new();
        let root = doc.root();
        let tr = doc.append(root, "tr", &[]);
        let td = cell(&mut doc, tr, "  Prior\n");
        doc.append(tr, "td", &[]);
        // the row's own text is also exactly "Prior" and comes first
        assert_eq!(
            find_by_exact_label(&doc, root, "Prior", DEFAULT_MAX_LABEL_LEN),
            Some(tr)
        );
        assert_eq!(
            exact_label_matches(&doc, root, "Prior", DEFAULT_MAX_LABEL_LEN),
            vec![tr, td]
        );
    }

    #[test]
    fn test_length_bound_is_exclusive() {
        let mut doc = Document::new();
        let root = doc.root();
        let label = "Blood Pressure Prior"; // 20 chars
        cell(&mut doc, root, label);
        assert_eq!(find_by_exact_label(&doc, root, label, 20), None);
        assert!(find_by_exact_label(&doc, root, label, 21).is_some());
    }

    #[test]
    fn test_select_text_never_matches() {
        let mut doc = Document::new();
        let root = doc.root();
        let select = doc.append(root, "select", &[]);
        let option = doc.append(select, "option", &[]);
        doc.append_text(option, "Prior");
        // the option itself may match, the select may not
        assert_eq!(
            exact_label_matches(&doc, root, "Prior", DEFAULT_MAX_LABEL_LEN),
            vec![option]
        );
    }

    #[test]
    fn test_first_match_wins() {
        let mut doc = Document::new();
        let root = doc.root();
        let first = cell(&mut doc, root, "Post");
        cell(&mut doc, root, "Post");
        assert_eq!(
            find_by_exact_label(&doc, root, "Post", DEFAULT_MAX_LABEL_LEN),
            Some(first)
        );
    }
}
