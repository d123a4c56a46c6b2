//! In-memory connectors.
//!
//! Useful wherever the real stores are out of reach: tests, dry runs and
//! the command-line tool, which builds them from its run configuration.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::error::ConnectorError;
use crate::record::{FieldDescriptor, FieldValue, Principal, TermReference};
use crate::traits::{
    ContentStore, IdentityRemap, SchemaFieldLookup, TermTransform, TransformedTerm, UserDirectory,
};

// ──────────────────────────────────────────────
// Schema
// ──────────────────────────────────────────────

/// Field descriptors keyed by internal name.
///
/// Target fields registered for a specific schema take precedence over
/// schema-agnostic ones.
#[derive(Debug, Clone, Default)]
pub struct InMemorySchema {
    source: HashMap<String, FieldDescriptor>,
    target: HashMap<String, FieldDescriptor>,
    per_schema: HashMap<String, HashMap<String, FieldDescriptor>>,
}

impl InMemorySchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, field: FieldDescriptor) -> Self {
        self.source.insert(field.internal_name.clone(), field);
        self
    }

    pub fn with_target(mut self, field: FieldDescriptor) -> Self {
        self.target.insert(field.internal_name.clone(), field);
        self
    }

    pub fn with_schema_target(mut self, schema_id: &str, field: FieldDescriptor) -> Self {
        self.per_schema
            .entry(schema_id.to_string())
            .or_default()
            .insert(field.internal_name.clone(), field);
        self
    }
}

impl SchemaFieldLookup for InMemorySchema {
    fn target_field(&self, schema_id: Option<&str>, field: &str) -> Option<FieldDescriptor> {
        schema_id
            .and_then(|id| self.per_schema.get(id))
            .and_then(|fields| fields.get(field))
            .or_else(|| self.target.get(field))
            .cloned()
    }

    fn source_field(&self, field: &str) -> Option<FieldDescriptor> {
        self.source.get(field).cloned()
    }
}

// ──────────────────────────────────────────────
// Terms
// ──────────────────────────────────────────────

/// A `cache_terms` call, recorded for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermCacheRequest {
    pub source_set_id: String,
    pub target_set_id: String,
    pub source_vocabulary_id: Option<String>,
    pub legacy_mode: bool,
}

/// Resolves terms through explicit overrides, then by id, then by label
/// against a known target vocabulary.
#[derive(Debug, Default)]
pub struct MappedTermTransform {
    overrides: HashMap<String, TermReference>,
    target_terms: Vec<TermReference>,
    requests: Mutex<Vec<TermCacheRequest>>,
}

impl MappedTermTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map source term id `source_id` to `target`.
    pub fn with_override(mut self, source_id: &str, target: TermReference) -> Self {
        self.overrides.insert(source_id.to_ascii_lowercase(), target);
        self
    }

    /// Declare a term that exists in the target vocabulary.
    pub fn with_target_term(mut self, term: TermReference) -> Self {
        self.target_terms.push(term);
        self
    }

    pub fn cache_requests(&self) -> Vec<TermCacheRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl TermTransform for MappedTermTransform {
    fn cache_terms(
        &self,
        source_set_id: &str,
        target_set_id: &str,
        source_vocabulary_id: Option<&str>,
        legacy_mode: bool,
    ) {
        let request = TermCacheRequest {
            source_set_id: source_set_id.to_string(),
            target_set_id: target_set_id.to_string(),
            source_vocabulary_id: source_vocabulary_id.map(str::to_string),
            legacy_mode,
        };
        if let Ok(mut requests) = self.requests.lock() {
            if !requests.contains(&request) {
                requests.push(request);
            }
        }
    }

    fn transform(&self, term: &TermReference) -> TransformedTerm {
        if let Some(target) = self.overrides.get(&term.id.to_ascii_lowercase()) {
            return TransformedTerm {
                term: target.clone(),
                resolved: true,
            };
        }
        let known = self
            .target_terms
            .iter()
            .find(|t| *t == term)
            .or_else(|| {
                self.target_terms
                    .iter()
                    .find(|t| t.label.eq_ignore_ascii_case(&term.label))
            });
        match known {
            Some(target) => TransformedTerm {
                term: target.clone(),
                resolved: true,
            },
            None => TransformedTerm {
                term: term.clone(),
                resolved: false,
            },
        }
    }

    fn has_mapping_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }
}

// ──────────────────────────────────────────────
// Identities
// ──────────────────────────────────────────────

/// Remaps principal keys through a lookup table.
///
/// Unmapped keys pass through unchanged unless the remap is strict.
#[derive(Debug, Clone, Default)]
pub struct MappedIdentityRemap {
    map: HashMap<String, String>,
    strict: bool,
}

impl MappedIdentityRemap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn with_mapping(mut self, source: &str, target: &str) -> Self {
        self.map
            .insert(source.to_ascii_lowercase(), target.to_string());
        self
    }
}

impl IdentityRemap for MappedIdentityRemap {
    fn remap_principal(&self, source: &Principal) -> Option<String> {
        match self.map.get(&source.key.to_ascii_lowercase()) {
            Some(target) => Some(target.clone()),
            None if self.strict => None,
            None => Some(source.key.clone()),
        }
    }
}

/// A fixed set of users that exist in the target directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    users: HashMap<String, Principal>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: Principal) -> Self {
        self.users.insert(user.key.to_ascii_lowercase(), user);
        self
    }
}

impl UserDirectory for InMemoryDirectory {
    fn ensure_user(&self, _target_context: &str, key: &str) -> Option<Principal> {
        self.users.get(&key.to_ascii_lowercase()).cloned()
    }
}

// ──────────────────────────────────────────────
// Content store
// ──────────────────────────────────────────────

/// Records item updates in memory; can be told to reject them.
#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    items: Mutex<BTreeMap<String, BTreeMap<String, FieldValue>>>,
    calls: Mutex<usize>,
    fail_with: Option<String>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every update fails with `message`.
    pub fn failing(message: &str) -> Self {
        InMemoryContentStore {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Fields saved so far for `item_id`.
    pub fn saved(&self, item_id: &str) -> Option<BTreeMap<String, FieldValue>> {
        self.items
            .lock()
            .ok()
            .and_then(|items| items.get(item_id).cloned())
    }

    /// Number of `update_item` calls, successful or not.
    pub fn update_calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or(0)
    }
}

impl ContentStore for InMemoryContentStore {
    fn update_item(
        &self,
        item_id: &str,
        _schema_id: Option<&str>,
        updates: &BTreeMap<String, FieldValue>,
    ) -> Result<(), ConnectorError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        if let Some(message) = &self.fail_with {
            return Err(ConnectorError::Persist {
                item_id: item_id.to_string(),
                message: message.clone(),
            });
        }
        let mut items = self
            .items
            .lock()
            .map_err(|_| ConnectorError::Backend("content store lock poisoned".to_string()))?;
        let fields = items.entry(item_id.to_string()).or_default();
        for (name, value) in updates {
            fields.insert(name.clone(), value.clone());
        }
        Ok(())
    }
}
