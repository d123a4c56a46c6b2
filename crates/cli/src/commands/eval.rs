use std::path::Path;
use std::process;

use pagemorph_connectors::ContentItem;
use pagemorph_core::FieldValueType;
use pagemorph_transform::{AddOnRegistry, CallStatus, Evaluator};

use crate::{read_json, report_error, OutputFormat};

pub(crate) fn cmd_eval(
    expression: &str,
    item_path: &Path,
    field: &str,
    output: OutputFormat,
    quiet: bool,
) {
    let doc = read_json(item_path, output, quiet);
    let item = match ContentItem::from_json(&doc) {
        Ok(item) => item,
        Err(e) => {
            report_error(
                &format!("invalid item in '{}': {}", item_path.display(), e),
                output,
                quiet,
            );
            process::exit(1);
        }
    };

    let mut registry = AddOnRegistry::empty();
    let mut evaluator = Evaluator::new(&mut registry);
    let evaluation = match evaluator.evaluate(expression, field, FieldValueType::String, &item) {
        Ok(evaluation) => evaluation,
        Err(e) => {
            report_error(&format!("expression error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let value = match &evaluation.value {
                Some(v) => serde_json::Value::String(v.to_string()),
                None => serde_json::Value::Null,
            };
            println!(
                "{}",
                serde_json::json!({
                    "output": evaluation.output,
                    "value": value,
                    "status": format!("{:?}", evaluation.status),
                })
            );
        }
        OutputFormat::Text => match &evaluation.value {
            Some(v) => println!("{} = {}", evaluation.output, v),
            None => {
                println!("{} = (no value)", evaluation.output);
                if !quiet && evaluation.status != CallStatus::Completed {
                    eprintln!("note: {:?}", evaluation.status);
                }
            }
        },
    }
}
