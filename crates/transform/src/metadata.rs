//! Metadata reconciliation: copy or derive field values from a source item
//! onto the target schema, remapping taxonomy terms and identities, then
//! persist them as one batched update.
//!
//! Every problem below the page level is recoverable: it is logged, added
//! to the [`ItemReport`] and the remaining rules carry on.

use pagemorph_connectors::{ContentItem, FieldDescriptor, FieldValue, Principal, TermReference};
use pagemorph_core::{FieldRule, LayoutRule};

use crate::evaluate::{Evaluator, OutputValue};
use crate::options::{Connectors, TransformOptions};
use crate::report::{FieldIssue, IssueKind, ItemReport, ItemState};

// ──────────────────────────────────────────────
// Term source values
// ──────────────────────────────────────────────

/// The shapes a taxonomy value can arrive in.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    Collection(Vec<TermReference>),
    Single(TermReference),
    /// `label|id` entries separated by `;` or `;#`, optionally preceded by
    /// an integer handle: `1;#Sales|ab-1;#2;#Legal|cd-2`.
    Encoded(String),
}

impl SourceValue {
    /// Classify a raw field value. `None` for values that carry no terms.
    pub fn from_field(value: &FieldValue) -> Option<SourceValue> {
        match value {
            FieldValue::Terms(terms) => Some(SourceValue::Collection(terms.clone())),
            FieldValue::Term(term) => Some(SourceValue::Single(term.clone())),
            FieldValue::Text(text) => Some(SourceValue::Encoded(text.clone())),
            _ => None,
        }
    }

    /// Canonical list form.
    pub fn normalize(self) -> Vec<TermReference> {
        match self {
            SourceValue::Collection(terms) => terms,
            SourceValue::Single(term) => vec![term],
            SourceValue::Encoded(text) => decode_terms(&text),
        }
    }
}

/// A handle token that is not followed by an entry is a numeric label,
/// as in flat label lists like `Sales;2024`.
fn decode_terms(encoded: &str) -> Vec<TermReference> {
    let mut terms = Vec::new();
    let mut handle: Option<(i64, &str)> = None;
    for piece in encoded.split(';') {
        let piece = piece.trim_start_matches('#').trim();
        if piece.is_empty() {
            continue;
        }
        if !piece.contains('|') {
            if let Ok(h) = piece.parse::<i64>() {
                if let Some((_, pending)) = handle.replace((h, piece)) {
                    terms.push(TermReference::new(pending, ""));
                }
                continue;
            }
        }
        let (label, id) = match piece.rsplit_once('|') {
            Some((label, id)) => (label.trim(), id.trim()),
            None => (piece, ""),
        };
        terms.push(TermReference {
            label: label.to_string(),
            id: id.to_string(),
            handle: handle.take().map(|(h, _)| h),
        });
    }
    if let Some((_, pending)) = handle {
        terms.push(TermReference::new(pending, ""));
    }
    terms
}

// ──────────────────────────────────────────────
// Reconciler
// ──────────────────────────────────────────────

/// Outcome of one rule before it is assigned.
enum Candidate {
    /// Nothing to assign; the rule is skipped.
    Skip,
    /// Assign this value.
    Value(FieldValue),
}

/// Applies the field rules of one layout rule to items.
pub struct MetadataReconciler<'c> {
    connectors: &'c Connectors,
    options: &'c TransformOptions,
}

impl<'c> MetadataReconciler<'c> {
    pub fn new(connectors: &'c Connectors, options: &'c TransformOptions) -> Self {
        MetadataReconciler {
            connectors,
            options,
        }
    }

    /// Apply every field rule of `rule` to `item` and persist the result.
    pub fn reconcile(
        &self,
        rule: &LayoutRule,
        item: &ContentItem,
        evaluator: &mut Evaluator<'_>,
    ) -> ItemReport {
        let mut report = self.apply(rule, item, evaluator);
        self.persist(rule, &mut report);
        report
    }

    /// Apply the field rules in memory without saving anything.
    pub fn apply(
        &self,
        rule: &LayoutRule,
        item: &ContentItem,
        evaluator: &mut Evaluator<'_>,
    ) -> ItemReport {
        let mut report = ItemReport::new(&item.id);
        let schema = self.schema_id(rule);

        for field_rule in &rule.fields {
            let target = field_rule.target.trim();
            if target.is_empty() {
                continue;
            }
            let source = source_field_name(field_rule, item);

            let Some(descriptor) = self.connectors.schema.target_field(schema, target) else {
                tracing::warn!(
                    layout = %rule.name,
                    field = target,
                    schema = schema.unwrap_or(""),
                    "target field not found, skipping rule"
                );
                report.issue(FieldIssue::new(
                    target,
                    IssueKind::MissingTargetField,
                    format!("target schema has no field '{}'", target),
                ));
                continue;
            };

            let evaluated = match field_rule.functions() {
                Some(expression) => {
                    match evaluator.evaluate(expression, source, field_rule.value_type(), item) {
                        Ok(evaluation) => {
                            if evaluation.is_missing_add_on() {
                                report.issue(FieldIssue::new(
                                    target,
                                    IssueKind::FunctionNotFound,
                                    format!("'{}' has no callable function", expression),
                                ));
                            }
                            match evaluation.value {
                                Some(value) => Some(value),
                                // Taxonomy rules fall back to the raw source terms.
                                None if descriptor.kind.is_taxonomy() => None,
                                None => continue,
                            }
                        }
                        Err(e) => {
                            tracing::warn!(
                                layout = %rule.name,
                                field = target,
                                error = %e,
                                "skipping rule with malformed expression"
                            );
                            report.issue(FieldIssue::new(
                                target,
                                IssueKind::ExpressionParse,
                                e.to_string(),
                            ));
                            continue;
                        }
                    }
                }
                None => None,
            };

            let candidate = if descriptor.kind.is_taxonomy() {
                self.taxonomy_value(source, &descriptor, item, evaluated, &mut report)
            } else if descriptor.kind.is_identity() {
                self.identity_value(source, &descriptor, item, evaluated, &mut report)
            } else {
                match (evaluated, item.get(source)) {
                    (Some(value), _) => Candidate::Value(value.into_field_value()),
                    (None, Some(raw)) => Candidate::Value(raw.clone()),
                    (None, None) => Candidate::Skip,
                }
            };

            if let Candidate::Value(value) = candidate {
                report.assign(&descriptor.internal_name, value);
            }
        }

        report
    }

    /// Save all assignments of `report` in one update.
    pub fn persist(&self, rule: &LayoutRule, report: &mut ItemReport) {
        if report.state != ItemState::Dirty || report.values.is_empty() {
            return;
        }
        match self.connectors.store.update_item(
            &report.item_id,
            self.schema_id(rule),
            &report.values,
        ) {
            Ok(()) => {
                tracing::debug!(
                    item = %report.item_id,
                    fields = report.values.len(),
                    "persisted item"
                );
                report.state = ItemState::Persisted;
            }
            Err(e) => {
                tracing::error!(item = %report.item_id, error = %e, "failed to persist item");
                report.issue(FieldIssue::new(
                    "",
                    IssueKind::PersistFailed,
                    e.to_string(),
                ));
                report.state = ItemState::PersistFailed;
            }
        }
    }

    fn schema_id<'a>(&'a self, rule: &'a LayoutRule) -> Option<&'a str> {
        rule.associated_schema
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or(self.options.target_schema.as_deref())
    }

    fn taxonomy_value(
        &self,
        source: &str,
        target: &FieldDescriptor,
        item: &ContentItem,
        evaluated: Option<OutputValue>,
        report: &mut ItemReport,
    ) -> Candidate {
        let source_value = match evaluated {
            Some(value) => Some(SourceValue::Encoded(value.to_string())),
            None => match item.get(source) {
                None => return Candidate::Skip,
                Some(FieldValue::Null) => return Candidate::Value(FieldValue::Null),
                Some(raw) => SourceValue::from_field(raw),
            },
        };
        let Some(source_value) = source_value else {
            tracing::warn!(
                field = %target.internal_name,
                source,
                "source value is not a term reference, skipping rule"
            );
            report.issue(FieldIssue::new(
                &target.internal_name,
                IssueKind::UnresolvedTerm,
                format!("source field '{}' holds no terms", source),
            ));
            return Candidate::Skip;
        };
        let terms = source_value.normalize();

        let source_descriptor = self.connectors.schema.source_field(source);
        let source_set = source_descriptor
            .as_ref()
            .and_then(|d| d.term_set_id.as_deref());
        let target_set = target.term_set_id.as_deref();
        let same_set = matches!(
            (source_set, target_set),
            (Some(s), Some(t)) if s.eq_ignore_ascii_case(t)
        );

        let terms = if same_set && !self.connectors.terms.has_mapping_overrides() {
            terms
        } else {
            if let (Some(s), Some(t)) = (source_set, target_set) {
                let vocabulary = source_descriptor
                    .as_ref()
                    .and_then(|d| d.term_store_id.as_deref());
                self.connectors
                    .terms
                    .cache_terms(s, t, vocabulary, self.options.legacy_term_mode);
            }
            self.remap_terms(&target.internal_name, terms, report)
        };

        let value = if target.kind.is_multi() {
            FieldValue::Terms(terms)
        } else {
            match terms.into_iter().next() {
                Some(term) => FieldValue::Term(term),
                None => FieldValue::Null,
            }
        };
        Candidate::Value(value)
    }

    fn remap_terms(
        &self,
        field: &str,
        terms: Vec<TermReference>,
        report: &mut ItemReport,
    ) -> Vec<TermReference> {
        let mut kept = Vec::with_capacity(terms.len());
        for term in terms {
            let transformed = self.connectors.terms.transform(&term);
            if !transformed.resolved {
                tracing::warn!(
                    field,
                    term_id = %term.id,
                    label = %term.label,
                    "term could not be resolved, dropping it"
                );
                report.issue(FieldIssue::new(
                    field,
                    IssueKind::UnresolvedTerm,
                    format!("term '{}' ({}) could not be resolved", term.label, term.id),
                ));
                continue;
            }
            if transformed.term == term && transformed.term.label != term.label {
                tracing::warn!(
                    field,
                    term_id = %term.id,
                    source_label = %term.label,
                    target_label = %transformed.term.label,
                    "term label differs in target vocabulary"
                );
            }
            let mut resolved = transformed.term;
            resolved.handle = resolved.handle.or(term.handle);
            kept.push(resolved);
        }
        kept
    }

    fn identity_value(
        &self,
        source: &str,
        target: &FieldDescriptor,
        item: &ContentItem,
        evaluated: Option<OutputValue>,
        report: &mut ItemReport,
    ) -> Candidate {
        let principals = match evaluated {
            Some(value) => split_principals(&value.to_string()),
            None => match item.get(source) {
                None => return Candidate::Skip,
                Some(FieldValue::Null) => return Candidate::Value(FieldValue::Null),
                Some(FieldValue::Principal(p)) => vec![p.clone()],
                Some(FieldValue::Principals(ps)) => ps.clone(),
                Some(other) => split_principals(&other.render()),
            },
        };

        let mut ensured = Vec::with_capacity(principals.len());
        for principal in &principals {
            match self.ensure(principal) {
                Some(user) => ensured.push(user),
                None => {
                    tracing::warn!(
                        field = %target.internal_name,
                        principal = %principal.key,
                        "identity could not be resolved in the target directory"
                    );
                    report.issue(FieldIssue::new(
                        &target.internal_name,
                        IssueKind::UnresolvedIdentity,
                        format!("identity '{}' could not be resolved", principal.key),
                    ));
                }
            }
        }

        let value = if target.kind.is_multi() {
            FieldValue::Principals(ensured)
        } else {
            match ensured.into_iter().next() {
                Some(user) => FieldValue::Principal(user),
                None => FieldValue::Null,
            }
        };
        Candidate::Value(value)
    }

    fn ensure(&self, principal: &Principal) -> Option<Principal> {
        let key = self.connectors.identities.remap_principal(principal)?;
        self.connectors
            .directory
            .ensure_user(&self.options.target_context, &key)
    }
}

/// First source candidate holding a value, else the first candidate.
fn source_field_name<'r>(rule: &'r FieldRule, item: &ContentItem) -> &'r str {
    let mut candidates = rule.source_candidates();
    let first = candidates.next().unwrap_or(rule.source.trim());
    if item.has_value(first) {
        return first;
    }
    candidates.find(|c| item.has_value(c)).unwrap_or(first)
}

fn split_principals(keys: &str) -> Vec<Principal> {
    keys.split(';')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(Principal::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pagemorph_connectors::memory::{
        InMemoryContentStore, InMemoryDirectory, InMemorySchema, MappedIdentityRemap,
        MappedTermTransform,
    };
    use pagemorph_connectors::FieldKind;

    use crate::registry::AddOnRegistry;

    fn field_rule(source: &str, target: &str, functions: Option<&str>) -> FieldRule {
        FieldRule {
            source: source.to_string(),
            target: target.to_string(),
            functions: functions.map(str::to_string),
            value_type: None,
        }
    }

    fn layout(fields: Vec<FieldRule>) -> LayoutRule {
        let mut rule = LayoutRule::named("ArticleLeft");
        rule.fields = fields;
        rule
    }

    struct Fixture {
        connectors: Connectors,
        store: Arc<InMemoryContentStore>,
        terms: Arc<MappedTermTransform>,
        options: TransformOptions,
    }

    fn fixture(
        schema: InMemorySchema,
        terms: MappedTermTransform,
        store: InMemoryContentStore,
    ) -> Fixture {
        let store = Arc::new(store);
        let terms = Arc::new(terms);
        let connectors = Connectors {
            schema: Arc::new(schema),
            terms: terms.clone(),
            identities: Arc::new(MappedIdentityRemap::new().with_mapping("old\\ann", "ann@new")),
            directory: Arc::new(
                InMemoryDirectory::new().with_user(Principal {
                    key: "ann@new".into(),
                    display_name: Some("Ann".into()),
                    id: Some(12),
                }),
            ),
            store: store.clone(),
        };
        Fixture {
            connectors,
            store,
            terms,
            options: TransformOptions {
                target_context: "https://contoso/sites/new".into(),
                ..TransformOptions::default()
            },
        }
    }

    fn run(f: &Fixture, rule: &LayoutRule, item: &ContentItem) -> ItemReport {
        let mut registry = AddOnRegistry::empty();
        let mut evaluator = Evaluator::new(&mut registry);
        MetadataReconciler::new(&f.connectors, &f.options).reconcile(rule, item, &mut evaluator)
    }

    fn text_schema(fields: &[&str]) -> InMemorySchema {
        fields.iter().fold(InMemorySchema::new(), |s, f| {
            s.with_target(FieldDescriptor::new(*f, FieldKind::Text))
        })
    }

    #[test]
    fn decodes_all_term_shapes_to_one_list() {
        let encoded = SourceValue::Encoded("1;#Sales|ab-1;#2;#Legal|cd-2".into()).normalize();
        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded[0].label, "Sales");
        assert_eq!(encoded[0].handle, Some(1));
        assert_eq!(encoded[1].id, "cd-2");
        assert_eq!(encoded[1].handle, Some(2));

        let plain = SourceValue::Encoded("Sales|ab-1;Legal|cd-2".into()).normalize();
        assert_eq!(plain, encoded);

        let single = SourceValue::Single(TermReference::new("Sales", "ab-1")).normalize();
        let collection = SourceValue::Collection(vec![TermReference::new("Sales", "ab-1")]);
        assert_eq!(single, collection.normalize());
    }

    #[test]
    fn copies_text_fields_and_persists_once() {
        let f = fixture(
            text_schema(&["Title", "Summary"]),
            MappedTermTransform::new(),
            InMemoryContentStore::new(),
        );
        let rule = layout(vec![
            field_rule("Title", "Title", None),
            field_rule("Description;Comments", "Summary", Some("TextCleanup({@Name})")),
        ]);
        let item = ContentItem::new("42")
            .with_field("Title", FieldValue::Text("Hello".into()))
            .with_field("Description", FieldValue::Text("".into()))
            .with_field("Comments", FieldValue::Text("  two   words ".into()));

        let report = run(&f, &rule, &item);
        assert_eq!(report.state, ItemState::Persisted);
        assert_eq!(report.assigned, vec!["Title", "Summary"]);
        assert_eq!(report.values["Summary"], FieldValue::Text("two words".into()));
        assert_eq!(f.store.update_calls(), 1);
        assert_eq!(
            f.store.saved("42").unwrap()["Title"],
            FieldValue::Text("Hello".into())
        );
    }

    #[test]
    fn missing_target_field_and_bad_expression_are_recoverable() {
        let f = fixture(
            text_schema(&["Title", "Body"]),
            MappedTermTransform::new(),
            InMemoryContentStore::new(),
        );
        let rule = layout(vec![
            field_rule("Nope", "DoesNotExist", None),
            field_rule("Body", "Body", Some("Prefix('a', {Body}")),
            field_rule("Title", "Title", None),
        ]);
        let item = ContentItem::new("1")
            .with_field("Title", FieldValue::Text("t".into()))
            .with_field("Body", FieldValue::Text("b".into()));

        let report = run(&f, &rule, &item);
        assert_eq!(report.assigned, vec!["Title"]);
        assert_eq!(report.issues_of(IssueKind::MissingTargetField).count(), 1);
        assert_eq!(report.issues_of(IssueKind::ExpressionParse).count(), 1);
        assert_eq!(report.state, ItemState::Persisted);
    }

    #[test]
    fn absent_source_is_skipped_but_null_is_copied() {
        let f = fixture(
            text_schema(&["A", "B"]),
            MappedTermTransform::new(),
            InMemoryContentStore::new(),
        );
        let rule = layout(vec![field_rule("A", "A", None), field_rule("B", "B", None)]);
        let item = ContentItem::new("1").with_field("B", FieldValue::Null);

        let report = run(&f, &rule, &item);
        assert_eq!(report.assigned, vec!["B"]);
        assert_eq!(report.values["B"], FieldValue::Null);
    }

    #[test]
    fn nothing_assigned_means_nothing_persisted() {
        let f = fixture(
            text_schema(&["A"]),
            MappedTermTransform::new(),
            InMemoryContentStore::new(),
        );
        let report = run(&f, &layout(vec![field_rule("A", "A", None)]), &ContentItem::new("1"));
        assert_eq!(report.state, ItemState::Unmodified);
        assert_eq!(f.store.update_calls(), 0);
    }

    #[test]
    fn unresolved_term_is_dropped_from_multi_value() {
        let schema = InMemorySchema::new()
            .with_source(
                FieldDescriptor::new("Tags", FieldKind::TaxonomyMulti).with_term_set("old-set"),
            )
            .with_target(
                FieldDescriptor::new("Tags", FieldKind::TaxonomyMulti).with_term_set("new-set"),
            );
        let terms = MappedTermTransform::new()
            .with_target_term(TermReference::new("Sales", "n-1"))
            .with_target_term(TermReference::new("Legal", "n-2"));
        let f = fixture(schema, terms, InMemoryContentStore::new());
        let item = ContentItem::new("1").with_field(
            "Tags",
            FieldValue::Terms(vec![
                TermReference::new("Sales", "o-1"),
                TermReference::new("Unknown", "o-9"),
                TermReference::new("Legal", "o-2"),
            ]),
        );

        let report = run(&f, &layout(vec![field_rule("Tags", "Tags", None)]), &item);
        let FieldValue::Terms(kept) = &report.values["Tags"] else {
            panic!("expected terms, got {:?}", report.values["Tags"]);
        };
        let ids: Vec<_> = kept.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["n-1", "n-2"]);
        assert_eq!(report.issues_of(IssueKind::UnresolvedTerm).count(), 1);
        assert_eq!(f.terms.cache_requests().len(), 1);
    }

    #[test]
    fn taxonomy_rule_without_function_output_uses_raw_terms() {
        let schema = InMemorySchema::new()
            .with_source(
                FieldDescriptor::new("Tags", FieldKind::TaxonomyMulti).with_term_set("old-set"),
            )
            .with_target(
                FieldDescriptor::new("Tags", FieldKind::TaxonomyMulti).with_term_set("new-set"),
            );
        let terms =
            MappedTermTransform::new().with_target_term(TermReference::new("Sales", "n-1"));
        let f = fixture(schema, terms, InMemoryContentStore::new());
        let item = ContentItem::new("1").with_field(
            "Tags",
            FieldValue::Terms(vec![TermReference::new("Sales", "o-1")]),
        );
        let rule = layout(vec![field_rule("Tags", "Tags", Some("Contoso.Pick({Tags})"))]);

        let report = run(&f, &rule, &item);
        assert_eq!(report.assigned, vec!["Tags"]);
        assert_eq!(
            report.values["Tags"],
            FieldValue::Terms(vec![TermReference::new("Sales", "n-1")])
        );
        assert_eq!(report.issues_of(IssueKind::FunctionNotFound).count(), 1);
        assert_eq!(report.state, ItemState::Persisted);
    }

    #[test]
    fn trailing_numeric_token_is_kept_as_a_label() {
        let terms = SourceValue::Encoded("Sales;2024".into()).normalize();
        assert_eq!(
            terms,
            vec![TermReference::new("Sales", ""), TermReference::new("2024", "")]
        );

        let consecutive = SourceValue::Encoded("2023;2024;#Legal|l-1".into()).normalize();
        assert_eq!(consecutive.len(), 2);
        assert_eq!(consecutive[0], TermReference::new("2023", ""));
        assert_eq!(consecutive[1].id, "l-1");
        assert_eq!(consecutive[1].handle, Some(2024));
    }

    #[test]
    fn unresolvable_numeric_label_is_reported() {
        let schema = InMemorySchema::new().with_target(
            FieldDescriptor::new("Tags", FieldKind::TaxonomyMulti).with_term_set("set"),
        );
        let terms =
            MappedTermTransform::new().with_target_term(TermReference::new("Sales", "n-1"));
        let f = fixture(schema, terms, InMemoryContentStore::new());
        let item = ContentItem::new("1")
            .with_field("Tags", FieldValue::Text("Sales;2024".into()));

        let report = run(&f, &layout(vec![field_rule("Tags", "Tags", None)]), &item);
        assert_eq!(
            report.values["Tags"],
            FieldValue::Terms(vec![TermReference::new("Sales", "n-1")])
        );
        assert_eq!(report.issues_of(IssueKind::UnresolvedTerm).count(), 1);
    }

    #[test]
    fn same_term_set_copies_without_remapping() {
        let schema = InMemorySchema::new()
            .with_source(FieldDescriptor::new("Topic", FieldKind::Taxonomy).with_term_set("set"))
            .with_target(FieldDescriptor::new("Topic", FieldKind::Taxonomy).with_term_set("SET"));
        let f = fixture(schema, MappedTermTransform::new(), InMemoryContentStore::new());
        let item = ContentItem::new("1")
            .with_field("Topic", FieldValue::Text("5;#Finance|f-1".into()));

        let report = run(&f, &layout(vec![field_rule("Topic", "Topic", None)]), &item);
        assert_eq!(
            report.values["Topic"],
            FieldValue::Term(TermReference::new("Finance", "f-1"))
        );
        assert!(report.issues.is_empty());
        assert!(f.terms.cache_requests().is_empty());
    }

    #[test]
    fn overrides_force_remapping_within_one_set() {
        let schema = InMemorySchema::new()
            .with_source(FieldDescriptor::new("Topic", FieldKind::Taxonomy).with_term_set("set"))
            .with_target(FieldDescriptor::new("Topic", FieldKind::Taxonomy).with_term_set("set"));
        let terms =
            MappedTermTransform::new().with_override("f-1", TermReference::new("Money", "m-1"));
        let f = fixture(schema, terms, InMemoryContentStore::new());
        let item = ContentItem::new("1")
            .with_field("Topic", FieldValue::Term(TermReference::new("Finance", "f-1")));

        let report = run(&f, &layout(vec![field_rule("Topic", "Topic", None)]), &item);
        assert_eq!(
            report.values["Topic"],
            FieldValue::Term(TermReference::new("Money", "m-1"))
        );
    }

    #[test]
    fn unresolved_single_term_clears_the_field() {
        let schema = InMemorySchema::new()
            .with_target(FieldDescriptor::new("Topic", FieldKind::Taxonomy).with_term_set("set"));
        let f = fixture(schema, MappedTermTransform::new(), InMemoryContentStore::new());
        let item = ContentItem::new("1")
            .with_field("Topic", FieldValue::Term(TermReference::new("Finance", "f-1")));

        let report = run(&f, &layout(vec![field_rule("Topic", "Topic", None)]), &item);
        assert_eq!(report.values["Topic"], FieldValue::Null);
        assert_eq!(report.issues_of(IssueKind::UnresolvedTerm).count(), 1);
    }

    #[test]
    fn identities_are_remapped_and_ensured() {
        let schema = InMemorySchema::new()
            .with_target(FieldDescriptor::new("Owner", FieldKind::User))
            .with_target(FieldDescriptor::new("Contributors", FieldKind::UserMulti));
        let f = fixture(schema, MappedTermTransform::new(), InMemoryContentStore::new());
        let item = ContentItem::new("1")
            .with_field("Owner", FieldValue::Principal(Principal::new("ghost")))
            .with_field(
                "Contributors",
                FieldValue::Principals(vec![Principal::new("OLD\\ann"), Principal::new("ghost")]),
            );

        let report = run(
            &f,
            &layout(vec![
                field_rule("Owner", "Owner", None),
                field_rule("Contributors", "Contributors", None),
            ]),
            &item,
        );
        assert_eq!(report.values["Owner"], FieldValue::Null);
        let FieldValue::Principals(users) = &report.values["Contributors"] else {
            panic!("expected principals");
        };
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, Some(12));
        assert_eq!(report.issues_of(IssueKind::UnresolvedIdentity).count(), 2);
    }

    #[test]
    fn persist_failure_keeps_assignments() {
        let f = fixture(
            text_schema(&["Title"]),
            MappedTermTransform::new(),
            InMemoryContentStore::failing("throttled"),
        );
        let item = ContentItem::new("9").with_field("Title", FieldValue::Text("x".into()));
        let report = run(&f, &layout(vec![field_rule("Title", "Title", None)]), &item);
        assert_eq!(report.state, ItemState::PersistFailed);
        assert_eq!(report.values["Title"], FieldValue::Text("x".into()));
        assert_eq!(report.issues_of(IssueKind::PersistFailed).count(), 1);
    }

    #[test]
    fn unknown_add_on_is_reported_but_unknown_builtin_is_not() {
        let f = fixture(
            text_schema(&["A", "B"]),
            MappedTermTransform::new(),
            InMemoryContentStore::new(),
        );
        let rule = layout(vec![
            field_rule("A", "A", Some("Contoso.Lookup({A})")),
            field_rule("B", "B", Some("{B} = NotAFunction({B})")),
        ]);
        let item = ContentItem::new("1")
            .with_field("A", FieldValue::Text("a".into()))
            .with_field("B", FieldValue::Text("b".into()));

        let report = run(&f, &rule, &item);
        assert!(report.assigned.is_empty());
        let issues: Vec<_> = report.issues_of(IssueKind::FunctionNotFound).collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "A");
    }
}
