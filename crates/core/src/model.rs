//! The mapping model: layout rules, field rules, header rules and add-on
//! declarations.
//!
//! Values here are built once at mapping-load time and never mutated
//! afterwards. Merging produces new values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Root of an effective mapping: ordered layout rules plus add-on declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingModel {
    #[serde(default)]
    pub layouts: Vec<LayoutRule>,
    /// `None` means the document did not declare add-ons at all, which
    /// matters when merging: an absent list keeps the base declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_ons: Option<Vec<AddOnDeclaration>>,
}

impl MappingModel {
    /// Declared add-ons, empty when none were declared.
    pub fn add_ons(&self) -> &[AddOnDeclaration] {
        self.add_ons.as_deref().unwrap_or(&[])
    }

    /// Look up a layout rule by primary name (ASCII case-insensitive).
    pub fn layout(&self, name: &str) -> Option<&LayoutRule> {
        self.layouts.iter().find(|l| l.name.eq_ignore_ascii_case(name))
    }
}

/// An externally supplied function set referenced from expressions as
/// `Namespace.Function(...)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOnDeclaration {
    /// Namespace used in expressions.
    pub name: String,
    /// Implementation identifier understood by the add-on loader.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Location of the implementation, if the loader needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Mapping for one legacy layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRule {
    pub name: String,
    /// Alternate legacy layout names that resolve to this rule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_applies_to: Vec<String>,
    /// Target content-type identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub associated_schema: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderRule>,
    #[serde(default, skip_serializing_if = "SectionEmphasis::is_empty")]
    pub section_emphasis: SectionEmphasis,
}

impl LayoutRule {
    /// A rule with only a name, used by generators and tests.
    pub fn named(name: impl Into<String>) -> Self {
        LayoutRule {
            name: name.into(),
            also_applies_to: Vec::new(),
            associated_schema: None,
            fields: Vec::new(),
            header: None,
            section_emphasis: SectionEmphasis::default(),
        }
    }
}

/// Copies or derives one target field from the source item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Source field name, or a `;`-separated fallback list where the first
    /// non-empty field wins.
    pub source: String,
    /// Target field name. Rules with an empty target are ignored.
    #[serde(default)]
    pub target: String,
    /// Optional function expression deriving the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<String>,
    /// Declared type of the source value, used when binding arguments.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<FieldValueType>,
}

impl FieldRule {
    /// Candidate source field names in fallback order.
    pub fn source_candidates(&self) -> impl Iterator<Item = &str> {
        self.source
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// `true` when the rule lists more than one source field.
    pub fn has_fallbacks(&self) -> bool {
        self.source_candidates().nth(1).is_some()
    }

    pub fn functions(&self) -> Option<&str> {
        self.functions
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }

    pub fn value_type(&self) -> FieldValueType {
        self.value_type.unwrap_or_default()
    }
}

/// Declared source value type of a field rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValueType {
    #[default]
    String,
    Bool,
    Guid,
    Integer,
    Datetime,
    Identity,
}

impl fmt::Display for FieldValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldValueType::String => "string",
            FieldValueType::Bool => "bool",
            FieldValueType::Guid => "guid",
            FieldValueType::Integer => "integer",
            FieldValueType::Datetime => "datetime",
            FieldValueType::Identity => "identity",
        };
        f.write_str(s)
    }
}

// ──────────────────────────────────────────────
// Header
// ──────────────────────────────────────────────

/// How the modern page header is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
    #[serde(default)]
    pub kind: HeaderKind,
    #[serde(default)]
    pub alignment: HeaderAlignment,
    #[serde(default)]
    pub show_published_date: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<HeaderFieldRule>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderKind {
    None,
    #[default]
    Default,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderAlignment {
    #[default]
    Left,
    Center,
}

/// Feeds one header property from a source field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderFieldRule {
    /// Source field name.
    pub name: String,
    /// Header property receiving the value.
    pub header_property: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<String>,
}

// ──────────────────────────────────────────────
// Section emphasis
// ──────────────────────────────────────────────

/// Visual weight of a section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Emphasis {
    #[default]
    None,
    Neutral,
    Soft,
    Strong,
}

impl TryFrom<u8> for Emphasis {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Emphasis::None),
            1 => Ok(Emphasis::Neutral),
            2 => Ok(Emphasis::Soft),
            3 => Ok(Emphasis::Strong),
            other => Err(format!("emphasis must be between 0 and 3, got {}", other)),
        }
    }
}

impl From<Emphasis> for u8 {
    fn from(value: Emphasis) -> Self {
        value as u8
    }
}

/// Per-row emphasis for sections produced from one legacy layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionEmphasis {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<RowEmphasis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertical_section_emphasis: Option<Emphasis>,
}

impl SectionEmphasis {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.vertical_section_emphasis.is_none()
    }

    /// Emphasis for a legacy row, `None` when the rule does not mention it.
    pub fn for_row(&self, row: u32) -> Emphasis {
        self.sections
            .iter()
            .find(|s| s.row == row)
            .map(|s| s.emphasis)
            .unwrap_or_default()
    }

    pub fn vertical(&self) -> Emphasis {
        self.vertical_section_emphasis.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowEmphasis {
    pub row: u32,
    pub emphasis: Emphasis,
}
