//! Quick-insert of saved text snippets into the field the user double-clicked.

use crate::dom::{Document, EventKind, NodeId, SyntheticEvent};

/// Element id of the quick-insert menu. Fields inside it are never targets.
pub const QUICK_INSERT_MENU_ID: &str = "vitals-fill-menu";

/// Textarea, text input, or contenteditable element outside the quick-insert menu.
pub fn is_snippet_target(doc: &Document, node: NodeId) -> bool {
    let editable = match doc.tag(node) {
        Some("textarea") => true,
        Some("input") => doc
            .attr(node, "type")
            .map_or(true, |t| t.is_empty() || t.eq_ignore_ascii_case("text")),
        Some(_) => doc.is_content_editable(node),
        None => false,
    };
    editable
        && doc
            .closest(node, |d, n| d.attr(n, "id") == Some(QUICK_INSERT_MENU_ID))
            .is_none()
}

/// Replace the content of `node` with `text` and hand focus back to it.
///
/// Form controls get a value write followed by input and change events;
/// contenteditable elements get their text replaced followed by an input event.
/// Returns false for anything else.
pub fn insert_snippet(doc: &mut Document, node: NodeId, text: &str) -> bool {
    match doc.tag(node) {
        Some("input") | Some("textarea") => {
            doc.set_value(node, text);
            doc.dispatch(node, SyntheticEvent::new(EventKind::Input));
            doc.dispatch(node, SyntheticEvent::new(EventKind::Change));
        }
        Some(_) if doc.is_content_editable(node) => {
            doc.set_text(node, text);
            doc.dispatch(node, SyntheticEvent::new(EventKind::Input));
        }
        _ => return false,
    }
    doc.focus(node);
    true
}
