use std::path::Path;
use std::process;
use std::sync::Arc;

use pagemorph_connectors::AddOnCatalog;
use pagemorph_transform::{LegacyPage, PageTransformer};

use super::effective_model;
use crate::config::read_run_config;
use crate::{print_json, read_json, report_error, OutputFormat};

pub(crate) fn cmd_transform(
    page_path: &Path,
    config_path: &Path,
    output: OutputFormat,
    quiet: bool,
) {
    let config = match read_run_config(config_path) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e, output, quiet);
            process::exit(1);
        }
    };

    let doc = read_json(page_path, output, quiet);
    let page = match LegacyPage::from_json(&doc) {
        Ok(p) => p,
        Err(e) => {
            report_error(
                &format!("invalid page in '{}': {}", page_path.display(), e),
                output,
                quiet,
            );
            process::exit(1);
        }
    };

    tracing::debug!(
        config = %config_path.display(),
        fields = config.fields.len(),
        "loaded run configuration"
    );

    let mapping = config.mapping_path(config_path);
    let model = Arc::new(effective_model(mapping.as_deref(), output, quiet));
    tracing::debug!(
        custom = ?mapping,
        layouts = model.layouts.len(),
        "loaded effective mapping"
    );
    let (connectors, store) = config.connectors();

    // No add-on implementations ship with the binary; declaring one fails here.
    let mut transformer =
        match PageTransformer::new(model, connectors, config.options(), &AddOnCatalog::new()) {
            Ok(t) => t,
            Err(e) => {
                report_error(&e.to_string(), output, quiet);
                process::exit(1);
            }
        };

    let outcome = match transformer.transform(&page) {
        Ok(o) => o,
        Err(e) => {
            report_error(&format!("page '{}': {}", page.item.id, e), output, quiet);
            process::exit(1);
        }
    };

    tracing::info!(
        page = %page.item.id,
        rule = %outcome.rule,
        state = ?outcome.report.state,
        saved = store.update_calls(),
        "page transformed"
    );

    match output {
        OutputFormat::Json => print_json(&outcome),
        OutputFormat::Text => {
            println!("Page {} ({} -> {})", page.item.id, page.layout, outcome.rule);
            println!("  sections: {}", outcome.sections.len());
            println!(
                "  fields: {} assigned, state {:?}",
                outcome.report.assigned.len(),
                outcome.report.state
            );
            if !quiet {
                for issue in &outcome.report.issues {
                    println!("  warning [{}] {:?}: {}", issue.field, issue.kind, issue.message);
                }
            }
        }
    }
}
