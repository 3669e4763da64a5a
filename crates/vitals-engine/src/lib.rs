//! # vitals-engine
//!
//! Heuristic field locator and value injector for one known vitals-entry form.
//! Fields are found by exact label text and row structure instead of stable ids,
//! and every write replays the events a host page listens for.
//!
//! The engine works on an in-memory [`Document`]. Writes land in its journal,
//! which a caller replays against the live page.
//!
//! ## Quick Start
//!
//! ```rust
//! use vitals_engine::{run_autofill, Document, FillMode, Template, VitalField};
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! let row = doc.append(root, "tr", &[]);
//! let label = doc.append(row, "td", &[]);
//! doc.append_text(label, "Temperature:");
//! doc.append(row, "input", &[("name", "temperature")]);
//!
//! let template = Template::new(1, "Baseline").with(VitalField::Temperature, "98.6");
//! let report = run_autofill(&mut doc, &template, FillMode::Partial);
//! assert_eq!(report.filled(), 1);
//! assert!(!doc.take_journal().is_empty());
//! ```

pub mod autofill;
pub mod detect;
pub mod dom;
pub mod inject;
pub mod label;
pub mod navigator;
pub mod report;
pub mod row;
pub mod schema;
pub mod snapshot;
pub mod snippet;
pub mod template;
pub mod visibility;

pub use autofill::{detect_schema, run_autofill, Autofill, AutofillOptions, FillMode};
pub use detect::{detect, Signature};
pub use dom::{Document, EventKind, Mutation, NodeId, Rect, SyntheticEvent};
pub use inject::{inject_choice, inject_text};
pub use label::find_by_exact_label;
pub use navigator::sibling_row_at_offset;
pub use report::{FieldOutcome, FieldStatus, FillReport, SkipReason};
pub use row::{resolve_row, ResolvedRow};
pub use schema::{field_specs, ChoiceField, FieldSpec, RowRole, Slot, VitalField, VITALS_SCHEMA};
pub use snapshot::{PageSnapshot, SnapshotNode};
pub use snippet::{insert_snippet, is_snippet_target};
pub use template::Template;

/// A row or label the orchestrator could not use. Folded into the report as a skip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    #[error("no element labelled '{label}'")]
    NotFound { label: &'static str },

    #[error("row has {found} {what}, need {required}")]
    InsufficientCandidates {
        what: &'static str,
        found: usize,
        required: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_error_display() {
        let err = LocateError::InsufficientCandidates {
            what: "inputs",
            found: 3,
            required: 4,
        };
        assert_eq!(err.to_string(), "row has 3 inputs, need 4");
        assert_eq!(
            SkipReason::from(LocateError::NotFound { label: "Prior" }),
            SkipReason::NotFound
        );
    }
}
