//! Run configuration for `pagemorph transform`.
//!
//! The TOML file describes the target site, the schemas on both sides and
//! the term and identity mappings used by the in-memory connectors.
//!
//! # Example
//!
//! ```toml
//! [run]
//! mapping = "custom-mapping.json"
//! target_schema = "0x0101009D1CB255DA76424F860D91F20E6C4118"
//! target_context = "https://contoso.sharepoint.com/sites/news"
//! vertical_column = false
//!
//! [terms.mapping_overrides]
//! "old-term-id" = { label = "Finance", id = "new-term-id" }
//!
//! [[terms.target]]
//! label = "Legal"
//! id = "legal-id"
//!
//! [identities]
//! map = { "contoso\\ann" = "ann@contoso.com" }
//! known_users = [{ key = "ann@contoso.com", display_name = "Ann" }]
//!
//! [[fields]]
//! name = "Categories"
//! kind = "taxonomy_multi"
//! term_set = "new-set"
//!
//! [[fields]]
//! side = "source"
//! name = "Categories"
//! kind = "taxonomy_multi"
//! term_set = "old-set"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use pagemorph_connectors::memory::{
    InMemoryContentStore, InMemoryDirectory, InMemorySchema, MappedIdentityRemap,
    MappedTermTransform,
};
use pagemorph_connectors::{FieldDescriptor, FieldKind, Principal, TermReference};
use pagemorph_transform::{Connectors, TransformOptions};

/// Top-level run configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub terms: TermSettings,
    #[serde(default)]
    pub identities: IdentitySettings,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

/// `[run]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSettings {
    /// Custom mapping merged over the built-in one, relative to the config file.
    pub mapping: Option<PathBuf>,
    pub target_schema: Option<String>,
    #[serde(default)]
    pub source_context: String,
    #[serde(default)]
    pub target_context: String,
    #[serde(default)]
    pub vertical_column: bool,
    #[serde(default)]
    pub legacy_term_mode: bool,
}

/// `[terms]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TermSettings {
    /// Source term id to target term.
    #[serde(default)]
    pub mapping_overrides: BTreeMap<String, TermReference>,
    /// Terms known to exist in the target vocabulary.
    #[serde(default)]
    pub target: Vec<TermReference>,
}

/// `[identities]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentitySettings {
    /// Source principal key to target principal key.
    #[serde(default)]
    pub map: BTreeMap<String, String>,
    /// Drop principals missing from `map` instead of passing them through.
    #[serde(default)]
    pub strict: bool,
    /// Users that exist in the target directory.
    #[serde(default)]
    pub known_users: Vec<Principal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSide {
    Source,
    #[default]
    Target,
}

/// One `[[fields]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    #[serde(default)]
    pub side: FieldSide,
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    pub term_set: Option<String>,
    pub term_store: Option<String>,
    /// Restrict a target field to one schema.
    pub schema: Option<String>,
}

impl FieldConfig {
    fn descriptor(&self) -> FieldDescriptor {
        let mut descriptor = FieldDescriptor::new(&self.name, self.kind);
        descriptor.term_set_id = self.term_set.clone();
        descriptor.term_store_id = self.term_store.clone();
        descriptor
    }
}

/// Read and parse a run configuration file from `path`.
///
/// Returns a human-readable error string on failure.
pub fn read_run_config(path: &Path) -> Result<RunConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}

impl RunConfig {
    /// The custom mapping path, resolved against the config file's directory.
    pub fn mapping_path(&self, config_path: &Path) -> Option<PathBuf> {
        let mapping = self.run.mapping.as_ref()?;
        if mapping.is_absolute() {
            return Some(mapping.clone());
        }
        let base = config_path.parent().unwrap_or_else(|| Path::new("."));
        Some(base.join(mapping))
    }

    pub fn options(&self) -> TransformOptions {
        TransformOptions {
            target_schema: self.run.target_schema.clone(),
            source_context: self.run.source_context.clone(),
            target_context: self.run.target_context.clone(),
            vertical_column: self.run.vertical_column,
            legacy_term_mode: self.run.legacy_term_mode,
        }
    }

    /// Build the in-memory connectors; the store is returned separately so
    /// saved values can be inspected.
    pub fn connectors(&self) -> (Connectors, Arc<InMemoryContentStore>) {
        let mut schema = InMemorySchema::new();
        for field in &self.fields {
            schema = match (field.side, &field.schema) {
                (FieldSide::Source, _) => schema.with_source(field.descriptor()),
                (FieldSide::Target, Some(id)) => schema.with_schema_target(id, field.descriptor()),
                (FieldSide::Target, None) => schema.with_target(field.descriptor()),
            };
        }

        let mut terms = MappedTermTransform::new();
        for (source_id, target) in &self.terms.mapping_overrides {
            terms = terms.with_override(source_id, target.clone());
        }
        for term in &self.terms.target {
            terms = terms.with_target_term(term.clone());
        }

        let mut identities = MappedIdentityRemap::new();
        for (source, target) in &self.identities.map {
            identities = identities.with_mapping(source, target);
        }
        if self.identities.strict {
            identities = identities.strict();
        }

        let directory = self
            .identities
            .known_users
            .iter()
            .cloned()
            .fold(InMemoryDirectory::new(), InMemoryDirectory::with_user);

        let store = Arc::new(InMemoryContentStore::new());
        let connectors = Connectors {
            schema: Arc::new(schema),
            terms: Arc::new(terms),
            identities: Arc::new(identities),
            directory: Arc::new(directory),
            store: store.clone(),
        };
        (connectors, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagemorph_connectors::{IdentityRemap, SchemaFieldLookup, TermTransform, UserDirectory};

    const SAMPLE: &str = r#"
[run]
mapping = "custom.json"
target_schema = "news"
target_context = "https://contoso/sites/news"
vertical_column = true

[terms.mapping_overrides]
"old-1" = { label = "Finance", id = "new-1" }

[[terms.target]]
label = "Legal"
id = "legal"

[identities]
map = { "contoso\\ann" = "ann@contoso.com" }
known_users = [{ key = "ann@contoso.com", display_name = "Ann", id = 4 }]

[[fields]]
name = "Categories"
kind = "taxonomy_multi"
term_set = "new-set"
schema = "news"

[[fields]]
side = "source"
name = "Categories"
kind = "taxonomy_multi"
term_set = "old-set"
"#;

    #[test]
    fn parses_all_sections() {
        let config: RunConfig = toml::from_str(SAMPLE).unwrap();
        assert_eq!(
            config.mapping_path(Path::new("/etc/pagemorph/run.toml")),
            Some(PathBuf::from("/etc/pagemorph/custom.json"))
        );
        let options = config.options();
        assert!(options.vertical_column);
        assert_eq!(options.target_schema.as_deref(), Some("news"));

        let (connectors, _store) = config.connectors();
        let target = connectors
            .schema
            .target_field(Some("news"), "Categories")
            .unwrap();
        assert_eq!(target.kind, FieldKind::TaxonomyMulti);
        assert_eq!(target.term_set_id.as_deref(), Some("new-set"));
        assert!(connectors.schema.target_field(None, "Categories").is_none());
        assert_eq!(
            connectors
                .schema
                .source_field("Categories")
                .unwrap()
                .term_set_id
                .as_deref(),
            Some("old-set")
        );

        assert!(connectors.terms.has_mapping_overrides());
        let legal = connectors.terms.transform(&TermReference::new("legal", "x"));
        assert!(legal.resolved);

        let key = connectors
            .identities
            .remap_principal(&Principal::new("CONTOSO\\ann"))
            .unwrap();
        let user = connectors.directory.ensure_user("", &key).unwrap();
        assert_eq!(user.id, Some(4));
    }

    #[test]
    fn empty_config_is_valid() {
        let config: RunConfig = toml::from_str("").unwrap();
        assert!(config.mapping_path(Path::new("run.toml")).is_none());
        assert_eq!(config.options(), TransformOptions::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<RunConfig>("[run]\nbogus = 1\n").is_err());
    }
}
