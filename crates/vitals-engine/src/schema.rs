//! The vitals-entry form layout.
//!
//! Labels, row positions and option ordinals are fixed per schema version and
//! describe one known host layout. When a row does not hold as many candidates
//! as its layout expects, the write is skipped rather than guessed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::detect::Signature;

/// A logical text field of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VitalField {
    Temperature,
    BpPrior1,
    BpPrior2,
    HeartRatePrior,
    RespirationsPrior,
    BpPost1,
    BpPost2,
    HeartRatePost,
    RespirationsPost,
}

impl VitalField {
    pub const ALL: [VitalField; 9] = [
        Self::Temperature,
        Self::BpPrior1,
        Self::BpPrior2,
        Self::HeartRatePrior,
        Self::RespirationsPrior,
        Self::BpPost1,
        Self::BpPost2,
        Self::HeartRatePost,
        Self::RespirationsPost,
    ];

    /// Template key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::BpPrior1 => "bp_prior_1",
            Self::BpPrior2 => "bp_prior_2",
            Self::HeartRatePrior => "heart_rate_prior",
            Self::RespirationsPrior => "respirations_prior",
            Self::BpPost1 => "bp_post_1",
            Self::BpPost2 => "bp_post_2",
            Self::HeartRatePost => "heart_rate_post",
            Self::RespirationsPost => "respirations_post",
        }
    }

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == key)
    }
}

impl fmt::Display for VitalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An enumerated-choice slot. Its value is fixed by the schema, not the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceField {
    TemperatureSite,
    PositionPrior,
    SidePrior,
    PositionPost,
    SidePost,
}

impl ChoiceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TemperatureSite => "temperature_site",
            Self::PositionPrior => "position_prior",
            Self::SidePrior => "side_prior",
            Self::PositionPost => "position_post",
            Self::SidePost => "side_post",
        }
    }
}

impl fmt::Display for ChoiceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either kind of slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "field", rename_all = "snake_case")]
pub enum Slot {
    Text(VitalField),
    Choice(ChoiceField),
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(field) => field.fmt(f),
            Self::Choice(field) => field.fmt(f),
        }
    }
}

/// Which row a slot lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowRole {
    /// Matched by the primary label.
    Primary,
    /// Matched by the anchor label.
    Anchor,
    /// Reached from the anchor by structural offset.
    Derived,
}

/// Slots of one row and the minimum candidate counts that gate them.
#[derive(Debug, Clone, Copy)]
pub struct RowLayout {
    pub role: RowRole,
    /// Text slots, by input position.
    pub text: &'static [VitalField],
    /// Choice slots with their target ordinals, by control position
    /// (after any label-like control is skipped).
    pub choices: &'static [(ChoiceField, usize)],
    /// Text writes need at least this many inputs.
    pub min_inputs: usize,
    /// Choice writes need at least this many controls.
    pub min_choices: usize,
    /// Skip a leading choice control whose text marks it as a row label.
    pub skips_label_choice: bool,
}

/// Static locator description of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub slot: Slot,
    pub row: RowRole,
    /// Label text used to find the row (the fallback label for derived rows).
    pub label: &'static str,
    /// Position among the row's candidate inputs or controls.
    pub position: usize,
    /// Target option ordinal, for choice slots.
    pub ordinal: Option<usize>,
}

/// One version of the target layout.
#[derive(Debug, Clone, Copy)]
pub struct FormSchema {
    pub version: u32,
    pub primary_label: &'static str,
    pub anchor_label: &'static str,
    /// Label of the derived row, used when structural navigation falls short.
    pub derived_label: &'static str,
    /// Sibling-row distance from the anchor row to the derived row.
    pub derived_offset: isize,
    /// Words that make a leading choice control a row label rather than a field.
    pub choice_label_markers: &'static [&'static str],
    pub max_label_len: usize,
    /// A label match is accepted as the anchor only if its row has this many inputs.
    pub anchor_min_inputs: usize,
    pub primary: RowLayout,
    pub anchor: RowLayout,
    pub derived: RowLayout,
    pub signatures: &'static [Signature],
}

pub const VITALS_SIGNATURES: [Signature; 7] = [
    Signature::name("temperature"),
    Signature::id("temperature"),
    Signature::name("bp"),
    Signature::id("bp"),
    Signature::name("pressure"),
    Signature::name("heart"),
    Signature::id("pulse"),
];

/// Temperature taken: fifth option (Temporal).
pub const TEMPERATURE_SITE_ORDINAL: usize = 4;
/// Position: third option (Sitting).
pub const POSITION_ORDINAL: usize = 2;
/// Side: second option (Left).
pub const SIDE_ORDINAL: usize = 1;

pub const VITALS_SCHEMA: FormSchema = FormSchema {
    version: 1,
    primary_label: "Temperature:",
    anchor_label: "Prior",
    derived_label: "Post",
    derived_offset: 2,
    choice_label_markers: &["Prior", "Post"],
    max_label_len: crate::label::DEFAULT_MAX_LABEL_LEN,
    anchor_min_inputs: 2,
    primary: RowLayout {
        role: RowRole::Primary,
        text: &[VitalField::Temperature],
        choices: &[(ChoiceField::TemperatureSite, TEMPERATURE_SITE_ORDINAL)],
        min_inputs: 1,
        min_choices: 1,
        skips_label_choice: false,
    },
    anchor: RowLayout {
        role: RowRole::Anchor,
        text: &[
            VitalField::BpPrior1,
            VitalField::BpPrior2,
            VitalField::HeartRatePrior,
            VitalField::RespirationsPrior,
        ],
        choices: &[
            (ChoiceField::PositionPrior, POSITION_ORDINAL),
            (ChoiceField::SidePrior, SIDE_ORDINAL),
        ],
        min_inputs: 4,
        min_choices: 2,
        skips_label_choice: true,
    },
    derived: RowLayout {
        role: RowRole::Derived,
        text: &[
            VitalField::BpPost1,
            VitalField::BpPost2,
            VitalField::HeartRatePost,
            VitalField::RespirationsPost,
        ],
        choices: &[
            (ChoiceField::PositionPost, POSITION_ORDINAL),
            (ChoiceField::SidePost, SIDE_ORDINAL),
        ],
        min_inputs: 4,
        min_choices: 2,
        skips_label_choice: true,
    },
    signatures: &VITALS_SIGNATURES,
};

impl FormSchema {
    pub fn layouts(&self) -> [&RowLayout; 3] {
        [&self.primary, &self.anchor, &self.derived]
    }

    fn label_for(&self, role: RowRole) -> &'static str {
        match role {
            RowRole::Primary => self.primary_label,
            RowRole::Anchor => self.anchor_label,
            RowRole::Derived => self.derived_label,
        }
    }

    /// Every slot of the schema, row by row, text slots before choice slots.
    pub fn field_specs(&self) -> Vec<FieldSpec> {
        let mut specs = Vec::new();
        for layout in self.layouts() {
            let label = self.label_for(layout.role);
            for (position, field) in layout.text.iter().enumerate() {
                specs.push(FieldSpec {
                    slot: Slot::Text(*field),
                    row: layout.role,
                    label,
                    position,
                    ordinal: None,
                });
            }
            for (position, (field, ordinal)) in layout.choices.iter().enumerate() {
                specs.push(FieldSpec {
                    slot: Slot::Choice(*field),
                    row: layout.role,
                    label,
                    position,
                    ordinal: Some(*ordinal),
                });
            }
        }
        specs
    }

    /// Whether a choice control's text marks it as a row label.
    pub fn is_label_like_choice(&self, text: &str) -> bool {
        self.choice_label_markers.iter().any(|m| text.contains(m))
    }
}

/// Slots of the current schema.
pub fn field_specs() -> Vec<FieldSpec> {
    VITALS_SCHEMA.field_specs()
}
