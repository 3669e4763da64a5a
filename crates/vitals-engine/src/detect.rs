//! Form signature detection.

use serde::Serialize;

use crate::dom::{Document, NodeId};

/// Attribute inspected by a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAttr {
    Name,
    Id,
}

impl SignatureAttr {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Id => "id",
        }
    }
}

/// A case-insensitive substring expected in an `<input>`'s name or id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub attr: SignatureAttr,
    pub needle: &'static str,
}

impl Signature {
    pub const fn name(needle: &'static str) -> Self {
        Self {
            attr: SignatureAttr::Name,
            needle,
        }
    }

    pub const fn id(needle: &'static str) -> Self {
        Self {
            attr: SignatureAttr::Id,
            needle,
        }
    }

    /// Whether `node` is an `<input>` carrying this signature.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if doc.tag(node) != Some("input") {
            return false;
        }
        doc.attr(node, self.attr.as_str())
            .is_some_and(|v| v.to_ascii_lowercase().contains(self.needle))
    }
}

/// Signatures present on the page, in the order given.
pub fn matched_signatures(doc: &Document, signatures: &[Signature]) -> Vec<Signature> {
    let inputs: Vec<NodeId> = doc
        .elements()
        .into_iter()
        .filter(|n| doc.tag(*n) == Some("input"))
        .collect();
    signatures
        .iter()
        .filter(|sig| inputs.iter().any(|n| sig.matches(doc, *n)))
        .copied()
        .collect()
}

/// True if any input on the page carries one of `signatures`.
pub fn detect_with(doc: &Document, signatures: &[Signature]) -> bool {
    doc.elements()
        .into_iter()
        .any(|n| signatures.iter().any(|sig| sig.matches(doc, n)))
}

/// True if the page looks like the vitals-entry form.
pub fn detect(doc: &Document) -> bool {
    detect_with(doc, crate::schema::VITALS_SCHEMA.signatures)
}
