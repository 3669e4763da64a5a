//! Value and selection injection.
//!
//! Host pages bind their own framework listeners to different event kinds, so
//! a bare value assignment is not enough for the page's state to follow. Each
//! injector replays a fixed, ordered event sequence after the write. The order
//! is part of the contract; listeners may depend on it.

use tracing::debug;

use crate::dom::{Document, EventKind, NodeId, SyntheticEvent};

/// Events replayed after a text write. Keyboard events carry the value as key.
pub const TEXT_EVENT_SEQUENCE: [EventKind; 7] = [
    EventKind::Focus,
    EventKind::Input,
    EventKind::Change,
    EventKind::Blur,
    EventKind::KeyDown,
    EventKind::KeyPress,
    EventKind::KeyUp,
];

/// Events replayed after a selection change.
pub const CHOICE_EVENT_SEQUENCE: [EventKind; 4] = [
    EventKind::Focus,
    EventKind::Change,
    EventKind::Input,
    EventKind::Blur,
];

/// How a text write ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextWrite {
    /// Nothing written: empty value or not an element.
    Skipped,
    /// Written, and the value held through the event replay.
    Applied,
    /// A host listener rewrote the value; it was reassigned once.
    Restored,
}

impl TextWrite {
    pub fn is_written(self) -> bool {
        !matches!(self, Self::Skipped)
    }
}

/// Write `value` into a text-like element and replay [`TEXT_EVENT_SEQUENCE`].
///
/// If a listener changed the value during the replay, the value is assigned
/// once more without replaying events. The write counts as done either way.
pub fn write_text(doc: &mut Document, node: NodeId, value: &str) -> TextWrite {
    if value.is_empty() || !doc.is_element(node) {
        return TextWrite::Skipped;
    }

    doc.set_value(node, value);
    doc.focus(node);
    for kind in TEXT_EVENT_SEQUENCE {
        let event = if kind.is_keyboard() {
            SyntheticEvent::with_key(kind, value)
        } else {
            SyntheticEvent::new(kind)
        };
        doc.dispatch(node, event);
    }

    if doc.restore_value(node, value) {
        debug!("value of {} was rewritten by the page, reassigned", node);
        TextWrite::Restored
    } else {
        TextWrite::Applied
    }
}

/// Boolean form of [`write_text`]: true once the write was attempted.
pub fn inject_text(doc: &mut Document, node: NodeId, value: &str) -> bool {
    write_text(doc, node, value).is_written()
}

/// Select option `ordinal` of a choice control and replay [`CHOICE_EVENT_SEQUENCE`].
///
/// Returns false, without touching the element, when it has `ordinal` or fewer options.
pub fn inject_choice(doc: &mut Document, node: NodeId, ordinal: usize) -> bool {
    if doc.option_count(node) <= ordinal {
        return false;
    }
    doc.select_index(node, ordinal);
    for kind in CHOICE_EVENT_SEQUENCE {
        doc.dispatch(node, SyntheticEvent::new(kind));
    }
    true
}
