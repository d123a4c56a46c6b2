use std::path::Path;
use std::process;

use pagemorph_core::SectionEmphasis;
use pagemorph_transform::{infer_sections, ContentFragment};

use super::effective_model;
use crate::{print_json, read_json, report_error, OutputFormat};

pub(crate) struct LayoutOptions<'a> {
    pub fragments: &'a Path,
    pub layout: Option<&'a str>,
    pub mapping: Option<&'a Path>,
    pub vertical: bool,
    pub output: OutputFormat,
    pub quiet: bool,
}

pub(crate) fn cmd_layout(opts: LayoutOptions<'_>) {
    let output = opts.output;
    let quiet = opts.quiet;

    let doc = read_json(opts.fragments, output, quiet);
    let fragments: Vec<ContentFragment> = match serde_json::from_value(doc) {
        Ok(f) => f,
        Err(e) => {
            let msg = format!("invalid fragments in '{}': {}", opts.fragments.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let emphasis = match opts.layout {
        Some(layout) => {
            let model = effective_model(opts.mapping, output, quiet);
            match pagemorph_core::resolve(&model, layout) {
                Some(rule) => rule.section_emphasis.clone(),
                None => {
                    report_error(
                        &format!("no mapping found for legacy layout '{}'", layout),
                        output,
                        quiet,
                    );
                    process::exit(1);
                }
            }
        }
        None => SectionEmphasis::default(),
    };

    let sections = match infer_sections(&fragments, opts.vertical, &emphasis) {
        Ok(s) => s,
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => print_json(&sections),
        OutputFormat::Text => {
            for section in &sections {
                let columns = serde_json::to_value(section.template.columns)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                let vertical = if section.template.vertical {
                    " +vertical"
                } else {
                    ""
                };
                println!(
                    "section {} (row {}): {}{} emphasis={}",
                    section.order,
                    section.row,
                    columns,
                    vertical,
                    u8::from(section.emphasis)
                );
            }
        }
    }
}
