//! Page-level transformation: resolve the layout rule, infer sections,
//! build the header and reconcile metadata for one legacy page.

use std::sync::Arc;

use serde::Serialize;

use pagemorph_connectors::{AddOnLoader, ConnectorError, ContentItem};
use pagemorph_core::{MappingGenerator, MappingModel, RuleResolver};

use crate::error::TransformError;
use crate::evaluate::Evaluator;
use crate::header::{evaluate_header, PageHeader};
use crate::layout::{infer_sections, ContentFragment, Section};
use crate::metadata::MetadataReconciler;
use crate::options::{Connectors, TransformOptions};
use crate::registry::AddOnRegistry;
use crate::report::ItemReport;

/// A legacy page: its layout name, positioned fragments and list item.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyPage {
    pub layout: String,
    pub fragments: Vec<ContentFragment>,
    pub item: ContentItem,
}

impl LegacyPage {
    /// Parse `{ "layout": "...", "fragments": [...], "item": { "id", "fields" } }`.
    pub fn from_json(v: &serde_json::Value) -> Result<LegacyPage, ConnectorError> {
        let layout = v
            .get("layout")
            .and_then(|l| l.as_str())
            .ok_or_else(|| ConnectorError::InvalidValue {
                message: "page is missing a 'layout'".to_string(),
            })?
            .to_string();
        let fragments = match v.get("fragments") {
            Some(f) => serde_json::from_value(f.clone()).map_err(|e| {
                ConnectorError::InvalidValue {
                    message: format!("fragments: {}", e),
                }
            })?,
            None => Vec::new(),
        };
        let item = match v.get("item") {
            Some(item) => ContentItem::from_json(item)?,
            None => {
                return Err(ConnectorError::InvalidValue {
                    message: "page is missing an 'item'".to_string(),
                })
            }
        };
        Ok(LegacyPage {
            layout,
            fragments,
            item,
        })
    }
}

/// Everything produced for one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageOutcome {
    /// Name of the layout rule that was applied.
    pub rule: String,
    pub sections: Vec<Section>,
    pub header: PageHeader,
    pub report: ItemReport,
}

/// Transforms legacy pages against one effective mapping model.
///
/// Owns its add-on instances; create one transformer per worker.
pub struct PageTransformer {
    resolver: RuleResolver,
    connectors: Connectors,
    options: TransformOptions,
    registry: AddOnRegistry,
}

impl PageTransformer {
    /// Load the model's add-ons and set up rule resolution.
    ///
    /// Fails when any declared add-on cannot be loaded.
    pub fn new(
        model: Arc<MappingModel>,
        connectors: Connectors,
        options: TransformOptions,
        loader: &dyn AddOnLoader,
    ) -> Result<Self, TransformError> {
        let registry = AddOnRegistry::load(model.add_ons(), loader, &options.source_context())?;
        Ok(PageTransformer {
            resolver: RuleResolver::new(model),
            connectors,
            options,
            registry,
        })
    }

    /// Fall back to `generator` for layouts the mapping does not cover.
    pub fn with_generator(mut self, generator: Box<dyn MappingGenerator>) -> Self {
        self.resolver = self.resolver.with_generator(generator);
        self
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Transform one page.
    ///
    /// Fails only for page-level problems: no rule for the layout or a
    /// row wider than three columns. Field problems are in the report.
    pub fn transform(&mut self, page: &LegacyPage) -> Result<PageOutcome, TransformError> {
        let rule = self.resolver.resolve(&page.layout)?;
        tracing::debug!(layout = %page.layout, rule = %rule.name, "resolved layout rule");

        let sections = infer_sections(
            &page.fragments,
            self.options.vertical_column,
            &rule.section_emphasis,
        )?;

        let mut evaluator = Evaluator::new(&mut self.registry);
        let (header, header_issues) =
            evaluate_header(rule.header.as_ref(), &page.item, &mut evaluator);

        let reconciler = MetadataReconciler::new(&self.connectors, &self.options);
        let mut report = reconciler.reconcile(&rule, &page.item, &mut evaluator);
        report.issues.extend(header_issues);

        Ok(PageOutcome {
            rule: rule.name,
            sections,
            header,
            report,
        })
    }
}
