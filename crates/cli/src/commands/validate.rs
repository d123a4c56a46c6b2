use std::path::Path;
use std::process;

use pagemorph_core::MappingError;

use crate::{report_error, OutputFormat};

pub(crate) fn cmd_validate(mapping_path: &Path, output: OutputFormat, quiet: bool) {
    match pagemorph_core::load(mapping_path) {
        Ok(model) => match output {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "valid": true,
                        "layouts": model.layouts.len(),
                        "add_ons": model.add_ons().len(),
                    })
                );
            }
            OutputFormat::Text => {
                if !quiet {
                    println!(
                        "Valid mapping: {} layout rule(s), {} add-on(s)",
                        model.layouts.len(),
                        model.add_ons().len()
                    );
                }
            }
        },
        Err(MappingError::SchemaValidation { origin, errors }) => {
            match output {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::json!({ "valid": false, "origin": origin, "errors": errors })
                    );
                }
                OutputFormat::Text => {
                    if !quiet {
                        eprintln!("Schema validation failed for '{}':", origin);
                        for error in &errors {
                            eprintln!("  - {}", error);
                        }
                    }
                }
            }
            process::exit(1);
        }
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}
