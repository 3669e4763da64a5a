//! Journal replay: applies the engine's recorded writes to the live page.

use eoka::Page;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vitals_engine::{Document, FieldStatus, FillReport, Mutation, NodeId, SkipReason};

use crate::{Error, Result};

/// Applies a list of ops, addressed by element handle.
///
/// An op whose element is gone or has a different tag is counted as missing
/// and not applied. `restore_value` only writes when the value changed.
/// Handles of missing and restored elements are listed once each.
const COMMIT_JS: &str = r#"
(() => {
    const all = document.querySelectorAll('*');
    const out = { applied: 0, restored: 0, missing: 0, missing_handles: [], restored_handles: [] };
    const note = (list, handle) => { if (!list.includes(handle)) list.push(handle); };
    for (const op of __vitals_ops) {
        const el = all[op.handle];
        if (!el || el.tagName.toLowerCase() !== op.tag) {
            out.missing++;
            note(out.missing_handles, op.handle);
            continue;
        }
        switch (op.op) {
            case 'set_value':
                el.value = op.value;
                break;
            case 'focus':
                el.focus();
                break;
            case 'dispatch':
                el.dispatchEvent(op.key == null
                    ? new Event(op.event, { bubbles: true })
                    : new KeyboardEvent(op.event, { bubbles: true, key: op.key }));
                break;
            case 'restore_value':
                if (el.value !== op.value) {
                    el.value = op.value;
                    out.restored++;
                    note(out.restored_handles, op.handle);
                }
                break;
            case 'select_index':
                el.selectedIndex = op.index;
                break;
            case 'set_text':
                el.textContent = op.text;
                break;
        }
        out.applied++;
    }
    return JSON.stringify(out);
})()
"#;

/// One journal entry in page terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum CommitOp {
    SetValue {
        handle: usize,
        tag: String,
        value: String,
    },
    Focus {
        handle: usize,
        tag: String,
    },
    Dispatch {
        handle: usize,
        tag: String,
        event: &'static str,
        key: Option<String>,
    },
    RestoreValue {
        handle: usize,
        tag: String,
        value: String,
    },
    SelectIndex {
        handle: usize,
        tag: String,
        index: usize,
    },
    SetText {
        handle: usize,
        tag: String,
        text: String,
    },
}

/// Counts reported by the page after a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    /// Ops applied to a live element.
    pub applied: usize,
    /// Values that a page listener had changed and were written again.
    pub restored: usize,
    /// Ops whose element could not be found on the page.
    pub missing: usize,
    /// Elements that had at least one missing op.
    #[serde(default)]
    pub missing_handles: Vec<usize>,
    /// Elements whose value was written again.
    #[serde(default)]
    pub restored_handles: Vec<usize>,
}

impl CommitSummary {
    /// Fold the page's replay result into `report`, which was produced
    /// against `doc`. Writes the page skipped become `NotFound`; writes a
    /// page listener undid become `Restored`.
    pub fn reconcile(&self, doc: &Document, report: &mut FillReport) {
        let nodes = |handles: &[usize]| -> Vec<NodeId> {
            handles.iter().filter_map(|h| doc.by_handle(*h)).collect()
        };
        let missing = nodes(&self.missing_handles);
        let restored = nodes(&self.restored_handles);

        for outcome in &mut report.outcomes {
            let Some(node) = outcome.node else {
                continue;
            };
            if !outcome.status.is_filled() {
                continue;
            }
            if missing.contains(&node) {
                debug!("{} was not written on the page", outcome.slot);
                outcome.status = FieldStatus::Skipped(SkipReason::NotFound);
            } else if restored.contains(&node) {
                outcome.status = FieldStatus::Restored;
            }
        }
    }
}

/// Translate journal entries into page ops. Entries for elements that never
/// came from the page are dropped.
pub(crate) fn to_ops(doc: &Document, journal: &[Mutation]) -> Vec<CommitOp> {
    journal
        .iter()
        .filter_map(|mutation| {
            let node = mutation.node();
            let handle = doc.handle(node)?;
            let tag = doc.tag(node)?.to_string();
            Some(match mutation {
                Mutation::SetValue { value, .. } => CommitOp::SetValue {
                    handle,
                    tag,
                    value: value.clone(),
                },
                Mutation::Focus { .. } => CommitOp::Focus { handle, tag },
                Mutation::Dispatch { event, .. } => CommitOp::Dispatch {
                    handle,
                    tag,
                    event: event.kind.as_str(),
                    key: event.key.clone(),
                },
                Mutation::RestoreValue { value, .. } => CommitOp::RestoreValue {
                    handle,
                    tag,
                    value: value.clone(),
                },
                Mutation::SelectIndex { index, .. } => CommitOp::SelectIndex {
                    handle,
                    tag,
                    index: *index,
                },
                Mutation::SetText { text, .. } => CommitOp::SetText {
                    handle,
                    tag,
                    text: text.clone(),
                },
            })
        })
        .collect()
}

/// Replay `journal` on the page.
pub async fn commit(page: &Page, doc: &Document, journal: &[Mutation]) -> Result<CommitSummary> {
    let ops = to_ops(doc, journal);
    if ops.is_empty() {
        return Ok(CommitSummary::default());
    }
    if ops.len() < journal.len() {
        warn!("{} journal entries have no page element", journal.len() - ops.len());
    }

    let payload = serde_json::to_string(&ops).map_err(|e| Error::Snapshot(e.to_string()))?;
    let js = format!("var __vitals_ops = {}; {}", payload, COMMIT_JS);
    let json: String = page.evaluate(&js).await?;
    let summary: CommitSummary =
        serde_json::from_str(&json).map_err(|e| Error::Snapshot(format!("commit parse: {}", e)))?;

    debug!(
        "Committed {} ops ({} restored, {} missing)",
        summary.applied, summary.restored, summary.missing
    );
    if summary.missing > 0 {
        warn!("{} ops hit elements that changed since capture", summary.missing);
    }
    Ok(summary)
}
