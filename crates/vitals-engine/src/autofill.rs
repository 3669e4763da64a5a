//! Autofill orchestration.
//!
//! One run walks the schema's rows in a fixed order:
//!
//! 1. detect the form signature (reported; gating only when required)
//! 2. primary row, matched by label
//! 3. anchor row, matched by label
//! 4. stop here in [`FillMode::Partial`]
//! 5. derived row, reached structurally from the anchor, with a label fallback
//!
//! Nothing is cached between runs. Every failure degrades to a skipped slot in
//! the [`FillReport`]; a run never returns an error.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::detect::detect_with;
use crate::dom::{Document, NodeId};
use crate::inject::{inject_choice, write_text, TextWrite};
use crate::label::exact_label_matches;
use crate::navigator::sibling_row_at_offset;
use crate::report::{FieldStatus, FillReport, SkipReason};
use crate::row::ResolvedRow;
use crate::schema::{FormSchema, RowLayout, Slot, VITALS_SCHEMA};
use crate::template::Template;
use crate::LocateError;

/// Which rows a run fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    /// Primary, anchor and derived rows.
    #[default]
    Full,
    /// Primary and anchor rows only.
    Partial,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutofillOptions {
    /// Return an empty report when the form signature is absent.
    pub require_signature: bool,
}

/// Runs templates against documents for one schema.
#[derive(Debug, Clone, Copy)]
pub struct Autofill {
    schema: &'static FormSchema,
    options: AutofillOptions,
}

impl Default for Autofill {
    fn default() -> Self {
        Self::new(AutofillOptions::default())
    }
}

impl Autofill {
    pub fn new(options: AutofillOptions) -> Self {
        Self::with_schema(&VITALS_SCHEMA, options)
    }

    pub fn with_schema(schema: &'static FormSchema, options: AutofillOptions) -> Self {
        Self { schema, options }
    }

    pub fn schema(&self) -> &'static FormSchema {
        self.schema
    }

    pub fn detect(&self, doc: &Document) -> bool {
        detect_with(doc, self.schema.signatures)
    }

    /// Fill `template` into `doc`. Writes are recorded in the document journal.
    pub fn run(&self, doc: &mut Document, template: &Template, mode: FillMode) -> FillReport {
        let detected = self.detect(doc);
        info!(
            "autofill '{}' ({:?}), signature {}",
            template.name,
            mode,
            if detected { "present" } else { "absent" }
        );

        let mut session = FillSession {
            doc,
            schema: self.schema,
            template,
            report: FillReport::new(mode, detected),
        };
        if !detected && self.options.require_signature {
            info!("form signature absent, nothing filled");
            return session.report;
        }

        session.fill_primary();
        let anchor = session.fill_anchor();
        if mode == FillMode::Partial {
            debug!("partial mode, derived row left untouched");
        } else {
            session.fill_derived(anchor);
        }

        let report = session.report;
        info!("{} of {} slots filled", report.filled(), report.outcomes.len());
        report
    }
}

/// Fill `template` with default options.
pub fn run_autofill(doc: &mut Document, template: &Template, mode: FillMode) -> FillReport {
    Autofill::default().run(doc, template, mode)
}

/// Whether `doc` carries the vitals form signature.
pub fn detect_schema(doc: &Document) -> bool {
    Autofill::default().detect(doc)
}

/// State of one run. Dropped when the run ends.
struct FillSession<'a> {
    doc: &'a mut Document,
    schema: &'static FormSchema,
    template: &'a Template,
    report: FillReport,
}

impl FillSession<'_> {
    fn fill_primary(&mut self) {
        let schema = self.schema;
        let layout = &schema.primary;
        let value = layout
            .text
            .first()
            .map(|f| self.template.value(*f))
            .unwrap_or("");
        // the companion control follows the measurement: no value, no site
        if value.is_empty() {
            debug!("no {} value, primary row skipped", schema.primary_label);
            self.skip_layout(layout, SkipReason::EmptyValue);
            return;
        }

        match self.first_labelled_row(schema.primary_label, 0) {
            Ok(row) => {
                self.fill_text(layout, &row);
                self.fill_choices(layout, &row);
            }
            Err(e) => {
                debug!("primary row: {}", e);
                self.skip_layout(layout, e.into());
            }
        }
    }

    /// Fill the anchor row and return it for navigation.
    fn fill_anchor(&mut self) -> Option<NodeId> {
        let schema = self.schema;
        let layout = &schema.anchor;
        match self.first_labelled_row(schema.anchor_label, schema.anchor_min_inputs) {
            Ok(row) => {
                debug!(
                    "anchor row {}: {} inputs, {} controls",
                    row.row,
                    row.inputs.len(),
                    row.selections.len()
                );
                self.fill_text(layout, &row);
                self.fill_choices(layout, &row);
                Some(row.row)
            }
            Err(e) => {
                debug!("anchor row: {}", e);
                self.skip_layout(layout, e.into());
                None
            }
        }
    }

    fn fill_derived(&mut self, anchor: Option<NodeId>) {
        let schema = self.schema;
        let layout = &schema.derived;
        match self.locate_derived(anchor) {
            Ok(row) => {
                debug!(
                    "derived row {}: {} inputs, {} controls",
                    row.row,
                    row.inputs.len(),
                    row.selections.len()
                );
                self.fill_text(layout, &row);
                self.fill_choices(layout, &row);
            }
            Err(e) => {
                debug!("derived row: {}", e);
                self.skip_layout(layout, e.into());
            }
        }
    }

    /// Structural navigation first; the derived label when that row falls short.
    fn locate_derived(&self, anchor: Option<NodeId>) -> Result<ResolvedRow, LocateError> {
        let doc: &Document = &*self.doc;
        let min = self.schema.derived.min_inputs;
        let structural = anchor
            .and_then(|a| sibling_row_at_offset(doc, a, self.schema.derived_offset))
            .map(|r| ResolvedRow::enumerate(doc, r));

        if let Some(row) = &structural {
            if row.inputs.len() >= min {
                debug!(
                    "derived row reached {} rows below the anchor",
                    self.schema.derived_offset
                );
                return Ok(row.clone());
            }
        }

        debug!(
            "structural navigation gave {} inputs, matching '{}'",
            structural.as_ref().map_or(0, |r| r.inputs.len()),
            self.schema.derived_label
        );
        match self.first_labelled_row(self.schema.derived_label, 0) {
            Ok(row) if row.inputs.len() >= min => Ok(row),
            Ok(row) => Ok(structural.unwrap_or(row)),
            Err(e) => structural.ok_or(e),
        }
    }

    /// Row of the first exact `label` match holding at least `min_inputs` inputs.
    fn first_labelled_row(
        &self,
        label: &'static str,
        min_inputs: usize,
    ) -> Result<ResolvedRow, LocateError> {
        let doc: &Document = &*self.doc;
        let matches = exact_label_matches(doc, doc.root(), label, self.schema.max_label_len);
        if matches.is_empty() {
            return Err(LocateError::NotFound { label });
        }

        let mut most = 0;
        for node in matches {
            let Some(row) = ResolvedRow::from_label(doc, node) else {
                continue;
            };
            if row.inputs.len() >= min_inputs {
                debug!("'{}' matched {}, row {}", label, node, row.row);
                return Ok(row);
            }
            most = most.max(row.inputs.len());
        }
        Err(LocateError::InsufficientCandidates {
            what: "inputs",
            found: most,
            required: min_inputs,
        })
    }

    fn fill_text(&mut self, layout: &RowLayout, row: &ResolvedRow) {
        let short = (row.inputs.len() < layout.min_inputs).then_some(
            SkipReason::InsufficientCandidates {
                found: row.inputs.len(),
                required: layout.min_inputs,
            },
        );

        for (position, field) in layout.text.iter().enumerate() {
            let slot = Slot::Text(*field);
            let value = self.template.value(*field);
            if value.is_empty() {
                let status = FieldStatus::Skipped(SkipReason::EmptyValue);
                self.report.record(slot, layout.role, status, None);
                continue;
            }
            if let Some(reason) = short {
                self.report
                    .record(slot, layout.role, FieldStatus::Skipped(reason), None);
                continue;
            }

            let Some(&node) = row.inputs.get(position) else {
                let reason = SkipReason::InsufficientCandidates {
                    found: row.inputs.len(),
                    required: position + 1,
                };
                self.report
                    .record(slot, layout.role, FieldStatus::Skipped(reason), None);
                continue;
            };
            let status = match write_text(self.doc, node, value) {
                TextWrite::Applied => FieldStatus::Filled,
                TextWrite::Restored => FieldStatus::Restored,
                TextWrite::Skipped => FieldStatus::Skipped(SkipReason::EmptyValue),
            };
            debug!("{} = '{}' at {}", field, value, node);
            self.report.record(slot, layout.role, status, Some(node));
        }
    }

    fn fill_choices(&mut self, layout: &RowLayout, row: &ResolvedRow) {
        let controls = &row.selections;
        let offset = match controls.first() {
            Some(first)
                if layout.skips_label_choice
                    && self
                        .schema
                        .is_label_like_choice(&self.doc.text_content(*first)) =>
            {
                debug!("leading control {} is a row label, skipped", first);
                1
            }
            _ => 0,
        };
        let required = layout.min_choices.max(offset + layout.choices.len());
        if controls.len() < required {
            debug!(
                "{:?} row has {} controls, need {}",
                layout.role,
                controls.len(),
                required
            );
            for (field, _) in layout.choices {
                self.report.record(
                    Slot::Choice(*field),
                    layout.role,
                    FieldStatus::Skipped(SkipReason::InsufficientCandidates {
                        found: controls.len(),
                        required,
                    }),
                    None,
                );
            }
            return;
        }

        for (position, (field, ordinal)) in layout.choices.iter().enumerate() {
            let node = controls[offset + position];
            let status = if inject_choice(self.doc, node, *ordinal) {
                debug!("{} = option {} at {}", field, ordinal, node);
                FieldStatus::Filled
            } else {
                debug!("{} has no option {}", field, ordinal);
                FieldStatus::Skipped(SkipReason::OptionOutOfRange)
            };
            self.report
                .record(Slot::Choice(*field), layout.role, status, Some(node));
        }
    }

    fn skip_layout(&mut self, layout: &RowLayout, reason: SkipReason) {
        for field in layout.text {
            let status = if self.template.value(*field).is_empty() {
                SkipReason::EmptyValue
            } else {
                reason
            };
            self.report.record(
                Slot::Text(*field),
                layout.role,
                FieldStatus::Skipped(status),
                None,
            );
        }
        for (field, _) in layout.choices {
            self.report.record(
                Slot::Choice(*field),
                layout.role,
                FieldStatus::Skipped(reason),
                None,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ChoiceField, RowRole, VitalField};

    fn options(doc: &mut Document, select: NodeId, labels: &[&str]) {
        for label in labels {
            let opt = doc.append(select, "option", &[]);
            doc.append_text(opt, label);
        }
    }

    fn paired_row(doc: &mut Document, tbody: NodeId, label: &str, label_select: bool) -> NodeId {
        let tr = doc.append(tbody, "tr", &[]);
        let td = doc.append(tr, "td", &[]);
        if label_select {
            let s = doc.append(td, "select", &[]);
            options(doc, s, &["Prior", "During", "Post"]);
        } else {
            doc.append_text(td, label);
        }
        for _ in 0..4 {
            let td = doc.append(tr, "td", &[]);
            doc.append(td, "input", &[("type", "text")]);
        }
        let td = doc.append(tr, "td", &[]);
        let position = doc.append(td, "select", &[]);
        options(doc, position, &["", "Lying", "Sitting", "Standing"]);
        let side = doc.append(td, "select", &[]);
        options(doc, side, &["", "Left", "Right"]);
        tr
    }

    #[test]
    fn test_label_like_leading_control_is_skipped() {
        let mut doc = Document::new();
        let root = doc.root();
        let tbody = doc.append(root, "tbody", &[]);
        let tr = paired_row(&mut doc, tbody, "", true);
        // give the row a plain label too so it can be matched
        let td = doc.append(tr, "td", &[]);
        doc.append_text(td, "Prior");

        let template = Template::new(1, "t").with(VitalField::BpPrior1, "120");
        let report = run_autofill(&mut doc, &template, FillMode::Partial);

        let selects = ResolvedRow::enumerate(&doc, tr).selections;
        assert_eq!(doc.selected_index(selects[0]), Some(0));
        assert_eq!(doc.selected_index(selects[1]), Some(2));
        assert_eq!(doc.selected_index(selects[2]), Some(1));
        assert_eq!(
            report.status(Slot::Choice(ChoiceField::SidePrior)),
            Some(FieldStatus::Filled)
        );
    }

    #[test]
    fn test_short_row_skips_text_writes() {
        let mut doc = Document::new();
        let root = doc.root();
        let tr = doc.append(root, "tr", &[]);
        let td = doc.append(tr, "td", &[]);
        doc.append_text(td, "Prior");
        for _ in 0..3 {
            doc.append(tr, "input", &[]);
        }
        let template = Template::new(1, "t")
            .with(VitalField::BpPrior1, "120")
            .with(VitalField::BpPrior2, "");
        let report = run_autofill(&mut doc, &template, FillMode::Partial);
        assert_eq!(report.filled(), 0);
        assert_eq!(
            report.status(Slot::Text(VitalField::BpPrior1)),
            Some(FieldStatus::Skipped(SkipReason::InsufficientCandidates {
                found: 3,
                required: 4
            }))
        );
        assert_eq!(
            report.status(Slot::Text(VitalField::BpPrior2)),
            Some(FieldStatus::Skipped(SkipReason::EmptyValue))
        );
        assert!(doc.journal().is_empty());
    }

    #[test]
    fn test_missing_rows_report_not_found() {
        let mut doc = Document::new();
        let template = Template::new(1, "t").with(VitalField::Temperature, "98.6");
        let report = run_autofill(&mut doc, &template, FillMode::Full);
        assert_eq!(report.filled(), 0);
        assert!(!report.schema_detected);
        assert_eq!(
            report.status(Slot::Text(VitalField::Temperature)),
            Some(FieldStatus::Skipped(SkipReason::NotFound))
        );
        assert_eq!(report.row(RowRole::Derived).count(), 6);
    }

    #[test]
    fn test_require_signature_gates_the_run() {
        let mut doc = Document::new();
        let root = doc.root();
        let tbody = doc.append(root, "tbody", &[]);
        paired_row(&mut doc, tbody, "Prior", false);
        let template = Template::new(1, "t").with(VitalField::BpPrior1, "120");

        let strict = Autofill::new(AutofillOptions {
            require_signature: true,
        });
        let report = strict.run(&mut doc, &template, FillMode::Full);
        assert!(report.outcomes.is_empty());
        assert!(doc.journal().is_empty());

        let report = Autofill::default().run(&mut doc, &template, FillMode::Full);
        assert_eq!(
            report.status(Slot::Text(VitalField::BpPrior1)),
            Some(FieldStatus::Filled)
        );
    }

    #[test]
    fn test_label_control_plus_one_skips_both_choices() {
        let mut doc = Document::new();
        let root = doc.root();
        let tr = doc.append(root, "tr", &[]);
        let td = doc.append(tr, "td", &[]);
        doc.append_text(td, "Prior");
        for _ in 0..4 {
            doc.append(tr, "input", &[("type", "text")]);
        }
        let label = doc.append(tr, "select", &[]);
        options(&mut doc, label, &["Prior", "During", "Post"]);
        let position = doc.append(tr, "select", &[]);
        options(&mut doc, position, &["", "Lying", "Sitting", "Standing"]);

        let template = Template::new(1, "t").with(VitalField::BpPrior1, "120");
        let report = run_autofill(&mut doc, &template, FillMode::Partial);

        let short = FieldStatus::Skipped(SkipReason::InsufficientCandidates {
            found: 2,
            required: 3,
        });
        assert_eq!(
            report.status(Slot::Choice(ChoiceField::PositionPrior)),
            Some(short)
        );
        assert_eq!(report.status(Slot::Choice(ChoiceField::SidePrior)), Some(short));
        assert_eq!(doc.selected_index(label), Some(0));
        assert_eq!(doc.selected_index(position), Some(0));
        assert_eq!(
            report.status(Slot::Text(VitalField::BpPrior1)),
            Some(FieldStatus::Filled)
        );
    }

    #[test]
    fn test_hidden_temperature_input_still_sets_site() {
        let mut doc = Document::new();
        let root = doc.root();
        let tr = doc.append(root, "tr", &[]);
        let td = doc.append(tr, "td", &[]);
        doc.append_text(td, "Temperature:");
        let input = doc.append(tr, "input", &[("type", "text"), ("hidden", "")]);
        let site = doc.append(tr, "select", &[]);
        options(&mut doc, site, &["", "Oral", "Axillary", "Rectal", "Temporal"]);

        let template = Template::new(1, "t").with(VitalField::Temperature, "98.6");
        let report = run_autofill(&mut doc, &template, FillMode::Partial);

        assert_eq!(
            report.status(Slot::Text(VitalField::Temperature)),
            Some(FieldStatus::Skipped(SkipReason::InsufficientCandidates {
                found: 0,
                required: 1
            }))
        );
        assert_eq!(doc.value(input), "");
        assert_eq!(
            report.status(Slot::Choice(ChoiceField::TemperatureSite)),
            Some(FieldStatus::Filled)
        );
        assert_eq!(doc.selected_index(site), Some(4));
    }

    #[test]
    fn test_loose_min_inputs_does_not_panic() {
        static LOOSE: FormSchema = FormSchema {
            primary: RowLayout {
                min_inputs: 0,
                ..VITALS_SCHEMA.primary
            },
            ..VITALS_SCHEMA
        };
        let mut doc = Document::new();
        let root = doc.root();
        let tr = doc.append(root, "tr", &[]);
        let td = doc.append(tr, "td", &[]);
        doc.append_text(td, "Temperature:");

        let template = Template::new(1, "t").with(VitalField::Temperature, "98.6");
        let report = Autofill::with_schema(&LOOSE, AutofillOptions::default()).run(
            &mut doc,
            &template,
            FillMode::Partial,
        );
        assert_eq!(
            report.status(Slot::Text(VitalField::Temperature)),
            Some(FieldStatus::Skipped(SkipReason::InsufficientCandidates {
                found: 0,
                required: 1
            }))
        );
        assert_eq!(report.filled(), 0);
    }
}
