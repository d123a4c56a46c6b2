use std::path::Path;
use std::process;

use crate::{print_json, report_error, OutputFormat};

pub(crate) fn cmd_merge(
    custom: Option<&Path>,
    base: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) {
    let base_model = match base {
        Some(path) => pagemorph_core::load(path),
        None => pagemorph_core::load_default(),
    };
    let base_model = match base_model {
        Ok(model) => model,
        Err(e) => {
            report_error(&format!("error loading base mapping: {}", e), output, quiet);
            process::exit(1);
        }
    };

    let model = match custom {
        Some(path) => match pagemorph_core::load(path) {
            Ok(custom_model) => pagemorph_core::merge(&base_model, &custom_model),
            Err(e) => {
                report_error(&format!("error loading custom mapping: {}", e), output, quiet);
                process::exit(1);
            }
        },
        None => base_model,
    };

    print_json(&model);
}
