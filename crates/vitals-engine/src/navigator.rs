//! Structural navigation between sibling rows.

use crate::dom::{Document, NodeId};
use crate::row::is_row_element;

/// Row siblings of `row` (including itself), in order.
pub fn sibling_rows(doc: &Document, row: NodeId) -> Vec<NodeId> {
    let Some(parent) = doc.parent(row) else {
        return Vec::new();
    };
    doc.children(parent)
        .into_iter()
        .filter(|c| is_row_element(doc, *c))
        .collect()
}

/// The row sibling `offset` positions away from `row`, or `None` when out of
/// bounds or when `row` is not itself a row element.
pub fn sibling_row_at_offset(doc: &Document, row: NodeId, offset: isize) -> Option<NodeId> {
    let rows = sibling_rows(doc, row);
    let index = rows.iter().position(|r| *r == row)?;
    let target = index.checked_add_signed(offset)?;
    rows.get(target).copied()
}
