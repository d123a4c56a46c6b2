pub(crate) mod eval;
pub(crate) mod layout;
pub(crate) mod merge;
pub(crate) mod resolve;
pub(crate) mod transform;
pub(crate) mod validate;

use std::path::Path;
use std::process;

use pagemorph_core::MappingModel;

use crate::{report_error, OutputFormat};

/// The built-in mapping merged with `custom`, reporting and exiting on failure.
pub(crate) fn effective_model(
    custom: Option<&Path>,
    output: OutputFormat,
    quiet: bool,
) -> MappingModel {
    match pagemorph_core::load_effective(custom) {
        Ok(model) => model,
        Err(e) => {
            report_error(&format!("error loading mapping: {}", e), output, quiet);
            process::exit(1);
        }
    }
}
