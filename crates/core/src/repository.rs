//! Mapping repository: load, validate and merge mapping documents.
//!
//! Documents are validated against the embedded JSON Schema *before*
//! deserialization, so model types never see a structurally invalid
//! document. The built-in baseline mapping is embedded as well.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

use crate::error::MappingError;
use crate::model::{LayoutRule, MappingModel};

static MAPPING_SCHEMA_STR: &str = include_str!("../schema/mapping-schema.json");
static DEFAULT_MAPPING_STR: &str = include_str!("../defaults/default-mapping.json");

/// Origin label used in errors for the embedded baseline.
pub const DEFAULT_ORIGIN: &str = "<default mapping>";

/// The embedded mapping schema as JSON.
pub fn mapping_schema() -> Result<serde_json::Value, MappingError> {
    serde_json::from_str(MAPPING_SCHEMA_STR).map_err(|e| MappingError::InvalidSchema(e.to_string()))
}

fn validator() -> Result<&'static jsonschema::Validator, MappingError> {
    static VALIDATOR: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            let schema = mapping_schema().map_err(|e| e.to_string())?;
            jsonschema::validator_for(&schema).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| MappingError::InvalidSchema(e.clone()))
}

/// Validate a parsed document against the mapping schema.
///
/// Collects every violation rather than stopping at the first one.
pub fn validate_document(doc: &serde_json::Value, origin: &str) -> Result<(), MappingError> {
    let errors: Vec<String> = validator()?
        .iter_errors(doc)
        .map(|e| e.to_string())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(MappingError::SchemaValidation {
            origin: origin.to_string(),
            errors,
        })
    }
}

/// Load a mapping file from disk.
pub fn load(path: &Path) -> Result<MappingModel, MappingError> {
    if !path.exists() {
        return Err(MappingError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let src = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_str(&src, &path.display().to_string())
}

/// Parse, validate and deserialize a mapping document held in memory.
pub fn load_str(src: &str, origin: &str) -> Result<MappingModel, MappingError> {
    let doc: serde_json::Value = serde_json::from_str(src).map_err(|source| MappingError::Json {
        origin: origin.to_string(),
        source,
    })?;
    validate_document(&doc, origin)?;
    let model: MappingModel =
        serde_json::from_value(doc).map_err(|source| MappingError::Json {
            origin: origin.to_string(),
            source,
        })?;
    check_unique_names(&model, origin)?;
    tracing::debug!(
        origin,
        layouts = model.layouts.len(),
        add_ons = model.add_ons().len(),
        "loaded mapping"
    );
    Ok(model)
}

/// The built-in baseline mapping.
///
/// Only fails if the embedded resource is broken, which the test suite
/// guards against.
pub fn load_default() -> Result<MappingModel, MappingError> {
    load_str(DEFAULT_MAPPING_STR, DEFAULT_ORIGIN)
}

/// The baseline merged with an optional custom mapping file.
pub fn load_effective(custom: Option<&Path>) -> Result<MappingModel, MappingError> {
    let base = load_default()?;
    match custom {
        Some(path) => Ok(merge(&base, &load(path)?)),
        None => Ok(base),
    }
}

fn check_unique_names(model: &MappingModel, origin: &str) -> Result<(), MappingError> {
    let mut seen = HashSet::new();
    for rule in &model.layouts {
        if !seen.insert(rule_key(&rule.name)) {
            return Err(MappingError::DuplicateRule {
                origin: origin.to_string(),
                name: rule.name.clone(),
            });
        }
    }
    Ok(())
}

/// Normalized lookup key for layout names.
pub fn rule_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

// ──────────────────────────────────────────────
// Alias index
// ──────────────────────────────────────────────

/// Maps legacy layout names to the rule that claims them.
///
/// Built rule by rule in declaration order: each rule's aliases are added
/// first, then its primary name if nobody claimed it yet. The first writer
/// of a name wins.
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    entries: HashMap<String, usize>,
}

impl AliasIndex {
    pub fn build(rules: &[LayoutRule]) -> Self {
        let mut entries = HashMap::new();
        for (idx, rule) in rules.iter().enumerate() {
            for alias in &rule.also_applies_to {
                match entries.entry(rule_key(alias)) {
                    Entry::Vacant(v) => {
                        v.insert(idx);
                    }
                    Entry::Occupied(o) if *o.get() != idx => {
                        tracing::debug!(
                            alias = alias.as_str(),
                            rule = rule.name.as_str(),
                            winner = rules[*o.get()].name.as_str(),
                            "alias already claimed by an earlier rule"
                        );
                    }
                    Entry::Occupied(_) => {}
                }
            }
            entries.entry(rule_key(&rule.name)).or_insert(idx);
        }
        AliasIndex { entries }
    }

    /// Index of the rule claiming `name`.
    pub fn get(&self, name: &str) -> Option<usize> {
        self.entries.get(&rule_key(name)).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&rule_key(name))
    }
}

// ──────────────────────────────────────────────
// Merge
// ──────────────────────────────────────────────

/// Overlay `custom` on `base`.
///
/// Base rules whose primary name is claimed by any custom rule (by name or
/// alias) are dropped; all custom rules are appended after the surviving
/// base rules. Custom add-on declarations replace the base ones wholesale
/// when the custom document declares any list at all.
pub fn merge(base: &MappingModel, custom: &MappingModel) -> MappingModel {
    let claimed = AliasIndex::build(&custom.layouts);

    let mut layouts: Vec<LayoutRule> = base
        .layouts
        .iter()
        .filter(|rule| !claimed.contains(&rule.name))
        .cloned()
        .collect();
    let overridden = base.layouts.len() - layouts.len();
    layouts.extend(custom.layouts.iter().cloned());

    let add_ons = match &custom.add_ons {
        Some(add_ons) => Some(add_ons.clone()),
        None => base.add_ons.clone(),
    };

    tracing::debug!(
        overridden,
        custom = custom.layouts.len(),
        total = layouts.len(),
        "merged mapping"
    );

    MappingModel { layouts, add_ons }
}
