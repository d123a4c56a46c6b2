//! Runtime knobs and the collaborator bundle handed to a transformer.

use std::sync::Arc;

use pagemorph_connectors::{
    ContentStore, IdentityRemap, SchemaFieldLookup, SourceContext, TermTransform, UserDirectory,
};

/// Per-run settings that do not come from the mapping file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    /// Schema (content type) used when a rule names none.
    pub target_schema: Option<String>,
    /// Location of the source site.
    pub source_context: String,
    /// Location of the target site; users are ensured here.
    pub target_context: String,
    /// Reserve a vertical column on the first section.
    pub vertical_column: bool,
    /// Ask the term transform to run in legacy (label based) mode.
    pub legacy_term_mode: bool,
}

impl TransformOptions {
    pub fn source_context(&self) -> SourceContext {
        SourceContext {
            source: self.source_context.clone(),
            target: self.target_context.clone(),
        }
    }
}

/// External collaborators used while reconciling metadata.
///
/// All of them must tolerate concurrent reads, so one bundle can be cloned
/// into several workers.
#[derive(Clone)]
pub struct Connectors {
    pub schema: Arc<dyn SchemaFieldLookup>,
    pub terms: Arc<dyn TermTransform>,
    pub identities: Arc<dyn IdentityRemap>,
    pub directory: Arc<dyn UserDirectory>,
    pub store: Arc<dyn ContentStore>,
}
