//! Stored vitals templates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::autofill::FillMode;
use crate::schema::VitalField;

/// A named set of vitals values. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: u64,
    pub name: String,
    /// Values keyed by field name (`temperature`, `bp_prior_1`, ...). Unknown keys
    /// are kept but never written.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Template {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, field: VitalField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: VitalField, value: impl Into<String>) {
        self.fields.insert(field.as_str().to_string(), value.into());
    }

    /// Value for `field`; empty when absent.
    pub fn value(&self, field: VitalField) -> &str {
        self.fields
            .get(field.as_str())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Fields holding a non-empty value.
    pub fn populated(&self) -> Vec<VitalField> {
        VitalField::ALL
            .into_iter()
            .filter(|f| !self.value(*f).is_empty())
            .collect()
    }

    /// One-line summary shown next to the template name.
    pub fn preview(&self, mode: FillMode) -> String {
        let v = |field| match self.value(field) {
            "" => "-",
            s => s,
        };
        let head = format!(
            "Temp: {} | BP: {}/{}",
            v(VitalField::Temperature),
            v(VitalField::BpPrior1),
            v(VitalField::BpPrior2)
        );
        match mode {
            FillMode::Partial => head,
            FillMode::Full => format!(
                "{} → {}/{}",
                head,
                v(VitalField::BpPost1),
                v(VitalField::BpPost2)
            ),
        }
    }
}
