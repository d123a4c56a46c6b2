//! Contracts for the collaborators the transformation engine calls out to.
//!
//! Implementations must be safe for concurrent reads: several page
//! transformations may share one schema lookup or term transform. Any
//! caching an implementation does must be idempotent, so racing cache
//! fills are harmless.

use std::collections::BTreeMap;

use pagemorph_core::LayoutRule;

use crate::error::ConnectorError;
use crate::record::{FieldDescriptor, FieldValue, Principal, TermReference};

/// Looks up field descriptors in the source and target schemas.
pub trait SchemaFieldLookup: Send + Sync {
    /// Descriptor of `field` in target schema `schema_id`
    /// (`None` = the target's default schema).
    fn target_field(&self, schema_id: Option<&str>, field: &str) -> Option<FieldDescriptor>;

    /// Descriptor of `field` in the source schema.
    fn source_field(&self, field: &str) -> Option<FieldDescriptor>;
}

/// Outcome of mapping one source term into the target vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedTerm {
    pub term: TermReference,
    pub resolved: bool,
}

/// Maps terms between source and target vocabularies.
pub trait TermTransform: Send + Sync {
    /// Warm whatever lookup tables `transform` needs for this set pair.
    fn cache_terms(
        &self,
        source_set_id: &str,
        target_set_id: &str,
        source_vocabulary_id: Option<&str>,
        legacy_mode: bool,
    );

    fn transform(&self, term: &TermReference) -> TransformedTerm;

    /// `true` when an operator-supplied term mapping is configured, which
    /// forces remapping even between identical vocabulary sets.
    fn has_mapping_overrides(&self) -> bool;
}

/// Maps a source principal to its key in the target directory.
pub trait IdentityRemap: Send + Sync {
    fn remap_principal(&self, source: &Principal) -> Option<String>;
}

/// Makes sure a principal exists in the target directory.
pub trait UserDirectory: Send + Sync {
    /// Returns the target handle, or `None` if the principal cannot be
    /// created or found.
    fn ensure_user(&self, target_context: &str, key: &str) -> Option<Principal>;
}

/// Persists field updates on target items.
pub trait ContentStore: Send + Sync {
    /// Apply all `updates` to `item_id` in one round trip.
    fn update_item(
        &self,
        item_id: &str,
        schema_id: Option<&str>,
        updates: &BTreeMap<String, FieldValue>,
    ) -> Result<(), ConnectorError>;
}

/// Builds a layout rule heuristically when no mapping entry exists.
///
/// Re-exported from core so connectors can be wired in one place.
pub use pagemorph_core::MappingGenerator;

/// Generator that never produces a rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGenerator;

impl MappingGenerator for NoGenerator {
    fn layout_rule(&self, _legacy_layout: &str) -> Option<LayoutRule> {
        None
    }
}
