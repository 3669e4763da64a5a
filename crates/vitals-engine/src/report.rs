//! Per-run outcome record.

use std::fmt;

use serde::Serialize;

use crate::autofill::FillMode;
use crate::dom::NodeId;
use crate::schema::{RowRole, Slot};
use crate::LocateError;

/// Why a slot was not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The template has no value for the field.
    EmptyValue,
    /// The row's label could not be matched.
    NotFound,
    /// The row exists but holds too few candidates.
    InsufficientCandidates { found: usize, required: usize },
    /// The control has no option at the target ordinal.
    OptionOutOfRange,
}

impl From<LocateError> for SkipReason {
    fn from(err: LocateError) -> Self {
        match err {
            LocateError::NotFound { .. } => Self::NotFound,
            LocateError::InsufficientCandidates {
                found, required, ..
            } => Self::InsufficientCandidates { found, required },
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue => f.write_str("no value"),
            Self::NotFound => f.write_str("row not found"),
            Self::InsufficientCandidates { found, required } => {
                write!(f, "{} candidates, need {}", found, required)
            }
            Self::OptionOutOfRange => f.write_str("option out of range"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FieldStatus {
    Filled,
    /// Written; a host listener rewrote it and the value was reassigned.
    Restored,
    Skipped(SkipReason),
}

impl FieldStatus {
    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled | Self::Restored)
    }
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filled => f.write_str("filled"),
            Self::Restored => f.write_str("filled (restored)"),
            Self::Skipped(reason) => write!(f, "skipped, {}", reason),
        }
    }
}

/// What happened to one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldOutcome {
    pub slot: Slot,
    pub row: RowRole,
    pub status: FieldStatus,
    /// Element written, if any.
    #[serde(skip)]
    pub node: Option<NodeId>,
}

/// Result of one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub mode: FillMode,
    /// Whether the form signature was present. Informational unless the run
    /// was configured to require it.
    pub schema_detected: bool,
    pub outcomes: Vec<FieldOutcome>,
}

impl FillReport {
    pub fn new(mode: FillMode, schema_detected: bool) -> Self {
        Self {
            mode,
            schema_detected,
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn record(
        &mut self,
        slot: Slot,
        row: RowRole,
        status: FieldStatus,
        node: Option<NodeId>,
    ) {
        self.outcomes.push(FieldOutcome {
            slot,
            row,
            status,
            node,
        });
    }

    /// Number of successful writes.
    pub fn filled(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_filled()).count()
    }

    /// Slots the run considered, in order.
    pub fn attempted(&self) -> Vec<Slot> {
        self.outcomes.iter().map(|o| o.slot).collect()
    }

    /// Outcomes for one row.
    pub fn row(&self, role: RowRole) -> impl Iterator<Item = &FieldOutcome> {
        self.outcomes.iter().filter(move |o| o.row == role)
    }

    pub fn status(&self, slot: Slot) -> Option<FieldStatus> {
        self.outcomes
            .iter()
            .find(|o| o.slot == slot)
            .map(|o| o.status)
    }

    pub fn is_empty(&self) -> bool {
        self.filled() == 0
    }

    /// Summary line for the notification collaborator.
    pub fn message(&self) -> String {
        if self.is_empty() {
            return "⚠ No fields found. Open the developer console (Cmd+Option+I) for details."
                .to_string();
        }
        let scope = match self.mode {
            FillMode::Partial => "prior only",
            FillMode::Full => "prior and post",
        };
        format!("✓ {} fields filled ({})", self.filled(), scope)
    }
}

impl fmt::Display for FillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
