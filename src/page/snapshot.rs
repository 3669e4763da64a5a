//! Page capture: serializes the live element tree for the engine.

use eoka::Page;
use tracing::debug;
use vitals_engine::{Document, PageSnapshot};

use crate::{Error, Result};

/// JavaScript that serializes the document into a `PageSnapshot`.
///
/// Each element's handle is its index in `querySelectorAll('*')`, which is
/// document order starting at `<html>`. Replay looks elements up the same way.
/// Nodes are emitted flat, parents first, each naming its parent's handle.
const SNAPSHOT_JS: &str = r#"
(() => {
    const all = document.querySelectorAll('*');
    const handles = new Map();
    for (let i = 0; i < all.length; i++) handles.set(all[i], i);

    const nodes = [];
    const walker = document.createTreeWalker(
        document.documentElement,
        NodeFilter.SHOW_ELEMENT | NodeFilter.SHOW_TEXT,
    );
    for (let n = walker.currentNode; n; n = walker.nextNode()) {
        const parent = n === document.documentElement ? null : handles.get(n.parentNode);
        if (n.nodeType === Node.TEXT_NODE) {
            if (n.nodeValue && parent !== undefined && parent !== null) {
                nodes.push({ t: 'text', parent, text: n.nodeValue });
            }
            continue;
        }
        if (!handles.has(n)) continue;
        const tag = n.tagName.toLowerCase();
        const node = {
            t: 'element',
            tag,
            handle: handles.get(n),
            parent,
            attrs: {},
            width: n.offsetWidth || 0,
            height: n.offsetHeight || 0,
        };
        for (const attr of n.attributes) node.attrs[attr.name.toLowerCase()] = attr.value;
        if (tag === 'input' || tag === 'textarea' || tag === 'select') node.value = n.value;
        if (tag === 'select') node.selected_index = n.selectedIndex;
        nodes.push(node);
    }

    const active = document.activeElement && handles.has(document.activeElement)
        ? handles.get(document.activeElement)
        : null;
    return JSON.stringify({ nodes, active });
})()
"#;

/// Capture the current page into an engine document.
pub async fn capture(page: &Page) -> Result<Document> {
    let json: String = page.evaluate(SNAPSHOT_JS).await?;
    let snapshot =
        PageSnapshot::from_json(&json).map_err(|e| Error::Snapshot(format!("parse: {}", e)))?;
    let doc = Document::from_snapshot(&snapshot);
    debug!("Captured {} elements", doc.elements().len());
    Ok(doc)
}
