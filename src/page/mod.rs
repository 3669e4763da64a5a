//! Live-page bridge over eoka.
//!
//! Besides capture and replay, this installs a small page-side agent used by
//! the watcher: a change counter fed by a `MutationObserver`, the floating
//! entry point, and a timed notice.

mod commit;
mod snapshot;

pub use commit::{commit, CommitSummary};
pub use snapshot::capture;

use eoka::Page;
use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

/// Id of the floating entry point element.
pub const ENTRY_POINT_ID: &str = "vitals-fill-entry";
/// Id of the completion notice element.
pub const NOTICE_ID: &str = "vitals-fill-notice";

/// Installs the page agent once per document. Mutations inside our own
/// elements are not counted.
const AGENT_JS: &str = r#"
(() => {
    if (window.__vitalsFill) return 'present';
    const state = { changes: 0, requests: 0 };
    const own = (node) => {
        const el = node.nodeType === Node.ELEMENT_NODE ? node : node.parentElement;
        return !!(el && el.closest('#vitals-fill-entry, #vitals-fill-notice'));
    };
    const ownRecord = (r) => {
        if (own(r.target)) return true;
        const nodes = [...r.addedNodes, ...r.removedNodes];
        return nodes.length > 0 && nodes.every(own);
    };
    const observer = new MutationObserver((records) => {
        if (records.some((r) => !ownRecord(r))) state.changes++;
    });
    observer.observe(document.documentElement, { childList: true, subtree: true });
    window.__vitalsFill = state;
    return 'installed';
})()
"#;

const SIGNALS_JS: &str = r#"
(() => {
    const state = window.__vitalsFill;
    return JSON.stringify({
        installed: !!state,
        changes: state ? state.changes : 0,
        requests: state ? state.requests : 0,
        entry_point: !!document.getElementById('vitals-fill-entry'),
    });
})()
"#;

/// Page-side state read by the watcher on each poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageSignals {
    /// False after a navigation dropped the agent.
    pub installed: bool,
    /// Mutation batches seen since the agent was installed.
    pub changes: u64,
    /// Clicks on the entry point.
    pub requests: u64,
    /// Whether the entry point is on the page.
    pub entry_point: bool,
}

/// Install the page agent. Returns false if it was already there.
pub async fn install_agent(page: &Page) -> Result<bool> {
    let status: String = page.evaluate(AGENT_JS).await?;
    debug!("Page agent: {}", status);
    Ok(status == "installed")
}

/// Read the page agent's counters.
pub async fn signals(page: &Page) -> Result<PageSignals> {
    let json: String = page.evaluate(SIGNALS_JS).await?;
    serde_json::from_str(&json).map_err(|e| Error::Snapshot(format!("signals parse: {}", e)))
}

/// Add the floating entry point unless it is already present.
///
/// Returns true if it was added. Clicking it bumps the agent's request counter.
pub async fn show_entry_point(page: &Page, label: &str) -> Result<bool> {
    let label = serde_json::to_string(label).map_err(|e| Error::Snapshot(e.to_string()))?;
    let js = format!(
        r#"(() => {{
    if (document.getElementById('{id}')) return false;
    const button = document.createElement('button');
    button.id = '{id}';
    button.type = 'button';
    button.textContent = {label};
    button.style.cssText = 'position:fixed;right:20px;bottom:20px;z-index:2147483647;' +
        'padding:10px 16px;border:none;border-radius:20px;background:#2563eb;color:#fff;' +
        'font:600 14px sans-serif;cursor:pointer;box-shadow:0 2px 8px rgba(0,0,0,.3)';
    button.addEventListener('click', () => {{
        if (window.__vitalsFill) window.__vitalsFill.requests++;
    }});
    document.body.appendChild(button);
    return true;
}})()"#,
        id = ENTRY_POINT_ID,
        label = label,
    );
    Ok(page.evaluate(&js).await?)
}

/// Show `message` on the page for `display_ms`, replacing any earlier notice.
pub async fn show_notice(page: &Page, message: &str, display_ms: u64) -> Result<()> {
    let message = serde_json::to_string(message).map_err(|e| Error::Snapshot(e.to_string()))?;
    let js = format!(
        r#"(() => {{
    const old = document.getElementById('{id}');
    if (old) old.remove();
    const notice = document.createElement('div');
    notice.id = '{id}';
    notice.textContent = {message};
    notice.style.cssText = 'position:fixed;top:20px;right:20px;z-index:2147483647;' +
        'padding:12px 18px;border-radius:8px;background:#111827;color:#fff;' +
        'font:14px sans-serif;box-shadow:0 2px 8px rgba(0,0,0,.3)';
    document.body.appendChild(notice);
    setTimeout(() => notice.remove(), {display_ms});
}})()"#,
        id = NOTICE_ID,
        message = message,
        display_ms = display_ms,
    );
    page.execute(&js).await?;
    Ok(())
}
