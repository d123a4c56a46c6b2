//! Record types exchanged with collaborators: items, field values, terms,
//! principals and field descriptors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;

// ──────────────────────────────────────────────
// Terms and principals
// ──────────────────────────────────────────────

/// A reference to a controlled-vocabulary term.
///
/// Two references are equal when their term ids match; labels may drift
/// between vocabularies.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct TermReference {
    pub label: String,
    pub id: String,
    /// List-local integer handle, if the source carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<i64>,
}

impl TermReference {
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        TermReference {
            label: label.into(),
            id: id.into(),
            handle: None,
        }
    }

    /// `label|id`, the entry format of encoded term lists.
    pub fn encode(&self) -> String {
        format!("{}|{}", self.label, self.id)
    }
}

impl PartialEq for TermReference {
    fn eq(&self, other: &Self) -> bool {
        self.id.eq_ignore_ascii_case(&other.id)
    }
}

/// A user or group identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Login or claim string identifying the principal.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Directory-local id, once ensured in a target directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl Principal {
    pub fn new(key: impl Into<String>) -> Self {
        Principal {
            key: key.into(),
            display_name: None,
            id: None,
        }
    }
}

// ──────────────────────────────────────────────
// Field values
// ──────────────────────────────────────────────

/// A field value as read from a source item or written to a target item.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Bool(bool),
    Integer(i64),
    Number(f64),
    DateTime(String),
    Guid(String),
    Principal(Principal),
    Principals(Vec<Principal>),
    Term(TermReference),
    Terms(Vec<TermReference>),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "Null",
            FieldValue::Text(_) => "Text",
            FieldValue::Bool(_) => "Bool",
            FieldValue::Integer(_) => "Integer",
            FieldValue::Number(_) => "Number",
            FieldValue::DateTime(_) => "DateTime",
            FieldValue::Guid(_) => "Guid",
            FieldValue::Principal(_) => "Principal",
            FieldValue::Principals(_) => "Principals",
            FieldValue::Term(_) => "Term",
            FieldValue::Terms(_) => "Terms",
        }
    }

    /// `true` for null, empty text and empty collections.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) | FieldValue::DateTime(s) | FieldValue::Guid(s) => {
                s.trim().is_empty()
            }
            FieldValue::Principals(p) => p.is_empty(),
            FieldValue::Terms(t) => t.is_empty(),
            _ => false,
        }
    }

    /// Plain-text rendering used when a value is passed to a function.
    ///
    /// Term collections render in the encoded `label|id;label|id` form so
    /// that they survive a round trip through string functions.
    pub fn render(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Text(s) | FieldValue::DateTime(s) | FieldValue::Guid(s) => s.clone(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Principal(p) => p.display_name.clone().unwrap_or_else(|| p.key.clone()),
            FieldValue::Principals(ps) => ps
                .iter()
                .map(|p| p.display_name.as_deref().unwrap_or(&p.key))
                .collect::<Vec<_>>()
                .join(";"),
            FieldValue::Term(t) => t.encode(),
            FieldValue::Terms(ts) => ts
                .iter()
                .map(TermReference::encode)
                .collect::<Vec<_>>()
                .join(";"),
        }
    }

    /// Identity rendering: the principal key(s), `;`-joined.
    ///
    /// Non-identity values fall back to [`render`](Self::render).
    pub fn identity_key(&self) -> String {
        match self {
            FieldValue::Principal(p) => p.key.clone(),
            FieldValue::Principals(ps) => ps
                .iter()
                .map(|p| p.key.as_str())
                .collect::<Vec<_>>()
                .join(";"),
            other => other.render(),
        }
    }

    /// Parse the plain JSON representation used by fixtures and the CLI.
    ///
    /// Strings, booleans and numbers map to scalars; objects with a `key`
    /// are principals, objects with an `id` are terms; arrays must hold
    /// only principals or only terms.
    pub fn from_json(v: &serde_json::Value) -> Result<FieldValue, ConnectorError> {
        use serde_json::Value as J;
        match v {
            J::Null => Ok(FieldValue::Null),
            J::Bool(b) => Ok(FieldValue::Bool(*b)),
            J::String(s) => Ok(FieldValue::Text(s.clone())),
            J::Number(n) => match n.as_i64() {
                Some(i) => Ok(FieldValue::Integer(i)),
                None => n.as_f64().map(FieldValue::Number).ok_or_else(|| {
                    ConnectorError::InvalidValue {
                        message: format!("unsupported number {}", n),
                    }
                }),
            },
            J::Object(obj) if obj.contains_key("key") => {
                Ok(FieldValue::Principal(parse_json(v)?))
            }
            J::Object(obj) if obj.contains_key("id") => Ok(FieldValue::Term(parse_json(v)?)),
            J::Object(_) => Err(ConnectorError::InvalidValue {
                message: "object values must be a principal (key) or a term (id)".to_string(),
            }),
            J::Array(items) => {
                if items.is_empty() {
                    return Ok(FieldValue::Terms(Vec::new()));
                }
                if items.iter().all(|i| i.get("key").is_some()) {
                    let ps = items.iter().map(parse_json).collect::<Result<_, _>>()?;
                    Ok(FieldValue::Principals(ps))
                } else if items.iter().all(|i| i.get("id").is_some()) {
                    let ts = items.iter().map(parse_json).collect::<Result<_, _>>()?;
                    Ok(FieldValue::Terms(ts))
                } else {
                    Err(ConnectorError::InvalidValue {
                        message: "arrays must contain only principals or only terms".to_string(),
                    })
                }
            }
        }
    }

    /// Inverse of [`from_json`](Self::from_json) for reporting.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Text(s) | FieldValue::DateTime(s) | FieldValue::Guid(s) => {
                serde_json::Value::String(s.clone())
            }
            FieldValue::Bool(b) => serde_json::Value::Bool(*b),
            FieldValue::Integer(i) => serde_json::json!(i),
            FieldValue::Number(n) => serde_json::json!(n),
            FieldValue::Principal(p) => serde_json::json!(p),
            FieldValue::Principals(ps) => serde_json::json!(ps),
            FieldValue::Term(t) => serde_json::json!(t),
            FieldValue::Terms(ts) => serde_json::json!(ts),
        }
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(v: &serde_json::Value) -> Result<T, ConnectorError> {
    serde_json::from_value(v.clone()).map_err(|e| ConnectorError::InvalidValue {
        message: e.to_string(),
    })
}

// ──────────────────────────────────────────────
// Items
// ──────────────────────────────────────────────

/// A content item (list item backing a page) with its field values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentItem {
    pub id: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl ContentItem {
    pub fn new(id: impl Into<String>) -> Self {
        ContentItem {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// `true` when the field exists and holds a non-empty value.
    pub fn has_value(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_empty())
    }

    /// Parse `{ "id": "...", "fields": { name: value, ... } }`.
    pub fn from_json(v: &serde_json::Value) -> Result<ContentItem, ConnectorError> {
        let id = match v.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                return Err(ConnectorError::InvalidValue {
                    message: "item is missing an 'id'".to_string(),
                })
            }
        };
        let mut fields = BTreeMap::new();
        if let Some(obj) = v.get("fields").and_then(|f| f.as_object()) {
            for (name, value) in obj {
                let parsed = FieldValue::from_json(value).map_err(|e| {
                    ConnectorError::InvalidValue {
                        message: format!("field '{}': {}", name, e),
                    }
                })?;
                fields.insert(name.clone(), parsed);
            }
        }
        Ok(ContentItem { id, fields })
    }
}

// ──────────────────────────────────────────────
// Schema descriptors
// ──────────────────────────────────────────────

/// Field type tags known to the schema lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Text,
    Note,
    Boolean,
    Integer,
    Number,
    DateTime,
    Guid,
    Url,
    Choice,
    MultiChoice,
    Lookup,
    User,
    UserMulti,
    Taxonomy,
    TaxonomyMulti,
    Other,
}

impl FieldKind {
    pub fn is_taxonomy(self) -> bool {
        matches!(self, FieldKind::Taxonomy | FieldKind::TaxonomyMulti)
    }

    pub fn is_identity(self) -> bool {
        matches!(self, FieldKind::User | FieldKind::UserMulti)
    }

    pub fn is_multi(self) -> bool {
        matches!(
            self,
            FieldKind::TaxonomyMulti | FieldKind::UserMulti | FieldKind::MultiChoice
        )
    }
}

/// Type and identity of a field in a source or target schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub internal_name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub kind: FieldKind,
    /// Vocabulary set bound to a taxonomy field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_set_id: Option<String>,
    /// Vocabulary store the set lives in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_store_id: Option<String>,
}

impl FieldDescriptor {
    pub fn new(internal_name: impl Into<String>, kind: FieldKind) -> Self {
        let internal_name = internal_name.into();
        FieldDescriptor {
            id: internal_name.clone(),
            internal_name,
            kind,
            term_set_id: None,
            term_store_id: None,
        }
    }

    pub fn with_term_set(mut self, term_set_id: impl Into<String>) -> Self {
        self.term_set_id = Some(term_set_id.into());
        self
    }
}
