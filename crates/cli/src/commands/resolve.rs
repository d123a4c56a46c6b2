use std::path::Path;
use std::process;
use std::sync::Arc;

use pagemorph_core::RuleResolver;

use super::effective_model;
use crate::{print_json, report_error, OutputFormat};

pub(crate) fn cmd_resolve(layout: &str, mapping: Option<&Path>, output: OutputFormat, quiet: bool) {
    let resolver = RuleResolver::new(Arc::new(effective_model(mapping, output, quiet)));
    match resolver.resolve(layout) {
        Ok(rule) => match output {
            OutputFormat::Json => print_json(&rule),
            OutputFormat::Text => {
                println!("{} -> {}", layout, rule.name);
                if !quiet {
                    println!("  fields: {}", rule.fields.len());
                    if let Some(schema) = &rule.associated_schema {
                        println!("  schema: {}", schema);
                    }
                }
            }
        },
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}
