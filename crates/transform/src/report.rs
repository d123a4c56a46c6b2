//! Per-item reconciliation report.

use std::collections::BTreeMap;

use serde::Serialize;

use pagemorph_connectors::FieldValue;

/// Lifecycle of one target item during reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    #[default]
    Unmodified,
    /// At least one field was assigned in memory.
    Dirty,
    Persisted,
    /// The batched save failed. Terminal for this item.
    PersistFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    ExpressionParse,
    FunctionNotFound,
    MissingTargetField,
    UnresolvedTerm,
    UnresolvedIdentity,
    PersistFailed,
}

/// A recoverable problem with one field rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub kind: IssueKind,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        FieldIssue {
            field: field.into(),
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemReport {
    pub item_id: String,
    pub state: ItemState,
    /// Target fields assigned, in rule order.
    pub assigned: Vec<String>,
    /// Values assigned, keyed by target field.
    #[serde(serialize_with = "serialize_values")]
    pub values: BTreeMap<String, FieldValue>,
    pub issues: Vec<FieldIssue>,
}

impl ItemReport {
    pub fn new(item_id: impl Into<String>) -> Self {
        ItemReport {
            item_id: item_id.into(),
            ..Self::default()
        }
    }

    /// Record an in-memory assignment and move to `Dirty`.
    pub fn assign(&mut self, field: &str, value: FieldValue) {
        if !self.values.contains_key(field) {
            self.assigned.push(field.to_string());
        }
        self.values.insert(field.to_string(), value);
        if self.state == ItemState::Unmodified {
            self.state = ItemState::Dirty;
        }
    }

    pub fn issue(&mut self, issue: FieldIssue) {
        self.issues.push(issue);
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &FieldIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }
}

fn serialize_values<S>(values: &BTreeMap<String, FieldValue>, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;
    let mut map = s.serialize_map(Some(values.len()))?;
    for (field, value) in values {
        map.serialize_entry(field, &value.to_json())?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_assignment_marks_dirty() {
        let mut report = ItemReport::new("7");
        assert_eq!(report.state, ItemState::Unmodified);
        report.assign("Title", FieldValue::Text("a".into()));
        report.assign("Title", FieldValue::Text("b".into()));
        assert_eq!(report.state, ItemState::Dirty);
        assert_eq!(report.assigned, vec!["Title"]);
        assert_eq!(report.values["Title"], FieldValue::Text("b".into()));
    }

    #[test]
    fn values_serialize_as_plain_json() {
        let mut report = ItemReport::new("7");
        report.assign("Flag", FieldValue::Bool(true));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["values"]["Flag"], serde_json::json!(true));
        assert_eq!(json["state"], "dirty");
    }
}
