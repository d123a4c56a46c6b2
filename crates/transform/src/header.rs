//! Page header evaluation.

use std::collections::BTreeMap;

use serde::Serialize;

use pagemorph_connectors::ContentItem;
use pagemorph_core::{FieldValueType, HeaderAlignment, HeaderKind, HeaderRule};

use crate::evaluate::Evaluator;
use crate::report::{FieldIssue, IssueKind};

/// Header settings for the modern page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageHeader {
    pub kind: HeaderKind,
    pub alignment: HeaderAlignment,
    pub show_published_date: bool,
    /// Header property values, e.g. the banner image URL.
    pub properties: BTreeMap<String, String>,
}

/// Build the page header described by `rule` from `item`.
///
/// Each header field is evaluated like a metadata rule: expression errors
/// and missing functions are reported and the property is left unset.
pub fn evaluate_header(
    rule: Option<&HeaderRule>,
    item: &ContentItem,
    evaluator: &mut Evaluator<'_>,
) -> (PageHeader, Vec<FieldIssue>) {
    let Some(rule) = rule else {
        return (PageHeader::default(), Vec::new());
    };

    let mut header = PageHeader {
        kind: rule.kind,
        alignment: rule.alignment,
        show_published_date: rule.show_published_date,
        properties: BTreeMap::new(),
    };
    let mut issues = Vec::new();

    if rule.kind == HeaderKind::None {
        return (header, issues);
    }

    for field in &rule.fields {
        let expression = field.functions.as_deref().map(str::trim).filter(|f| !f.is_empty());
        let value = match expression {
            Some(expression) => {
                match evaluator.evaluate(expression, &field.name, FieldValueType::String, item) {
                    Ok(evaluation) => {
                        if evaluation.is_missing_add_on() {
                            issues.push(FieldIssue::new(
                                &field.header_property,
                                IssueKind::FunctionNotFound,
                                format!("'{}' has no callable function", expression),
                            ));
                        }
                        evaluation.value.map(|v| v.to_string())
                    }
                    Err(e) => {
                        tracing::warn!(
                            field = %field.name,
                            property = %field.header_property,
                            error = %e,
                            "skipping header field with malformed expression"
                        );
                        issues.push(FieldIssue::new(
                            &field.header_property,
                            IssueKind::ExpressionParse,
                            e.to_string(),
                        ));
                        None
                    }
                }
            }
            None => item.get(&field.name).map(|v| v.render()),
        };
        if let Some(value) = value {
            header.properties.insert(field.header_property.clone(), value);
        }
    }

    (header, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AddOnRegistry;
    use pagemorph_connectors::FieldValue;
    use pagemorph_core::HeaderFieldRule;

    fn rule(fields: Vec<HeaderFieldRule>) -> HeaderRule {
        HeaderRule {
            kind: HeaderKind::Custom,
            alignment: HeaderAlignment::Center,
            show_published_date: true,
            fields,
        }
    }

    fn field(name: &str, property: &str, functions: Option<&str>) -> HeaderFieldRule {
        HeaderFieldRule {
            name: name.to_string(),
            header_property: property.to_string(),
            functions: functions.map(str::to_string),
        }
    }

    #[test]
    fn copies_and_evaluates_header_fields() {
        let item = ContentItem::new("1")
            .with_field("PublishingRollupImage", FieldValue::Text("/img/a.png".into()))
            .with_field("Topic", FieldValue::Text("news".into()));
        let rule = rule(vec![
            field("PublishingRollupImage", "ImageServerRelativeUrl", None),
            field("Topic", "TopicHeader", Some("ToUpper({@Name})")),
            field("Missing", "Absent", None),
        ]);
        let mut registry = AddOnRegistry::empty();
        let (header, issues) =
            evaluate_header(Some(&rule), &item, &mut Evaluator::new(&mut registry));

        assert!(issues.is_empty());
        assert_eq!(header.kind, HeaderKind::Custom);
        assert_eq!(header.alignment, HeaderAlignment::Center);
        assert!(header.show_published_date);
        assert_eq!(header.properties["ImageServerRelativeUrl"], "/img/a.png");
        assert_eq!(header.properties["TopicHeader"], "NEWS");
        assert!(!header.properties.contains_key("Absent"));
    }

    #[test]
    fn malformed_expression_is_reported() {
        let item = ContentItem::new("1").with_field("Topic", FieldValue::Text("x".into()));
        let rule = rule(vec![field("Topic", "TopicHeader", Some("ToUpper({Topic}"))]);
        let mut registry = AddOnRegistry::empty();
        let (header, issues) =
            evaluate_header(Some(&rule), &item, &mut Evaluator::new(&mut registry));
        assert!(header.properties.is_empty());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::ExpressionParse);
    }

    #[test]
    fn no_rule_gives_default_header() {
        let mut registry = AddOnRegistry::empty();
        let (header, issues) = evaluate_header(
            None,
            &ContentItem::new("1"),
            &mut Evaluator::new(&mut registry),
        );
        assert_eq!(header, PageHeader::default());
        assert!(issues.is_empty());
    }
}
