mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Environment variable consulted when `--log-level` is not given.
const LOG_ENV: &str = "PAGEMORPH_LOG";

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Legacy page to modern page transformation.
#[derive(Parser)]
#[command(
    name = "pagemorph",
    version,
    about = "Legacy page to modern page transformation"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log filter, e.g. `debug` or `pagemorph_transform=debug` (default: warn)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a mapping file against the mapping schema
    Validate {
        /// Path to the mapping JSON file
        mapping: PathBuf,
    },

    /// Print the effective mapping after merging a custom file over a base
    Merge {
        /// Custom mapping merged over the base
        #[arg(long)]
        custom: Option<PathBuf>,
        /// Base mapping (default: the built-in mapping)
        #[arg(long)]
        base: Option<PathBuf>,
    },

    /// Show which layout rule applies to a legacy layout
    Resolve {
        /// Legacy layout name
        layout: String,
        /// Custom mapping merged over the built-in one
        #[arg(long)]
        mapping: Option<PathBuf>,
    },

    /// Infer modern sections from positioned fragments
    Layout {
        /// Path to a JSON array of fragments
        fragments: PathBuf,
        /// Legacy layout whose section emphasis applies
        #[arg(long)]
        layout: Option<String>,
        /// Custom mapping merged over the built-in one
        #[arg(long)]
        mapping: Option<PathBuf>,
        /// Reserve a vertical column on the first section
        #[arg(long)]
        vertical: bool,
    },

    /// Evaluate a function expression against an item
    Eval {
        /// Expression, e.g. "{Out} = Prefix('<b>', {Title}, 'false')"
        expression: String,
        /// Path to the item JSON file
        #[arg(long)]
        item: PathBuf,
        /// Field the expression belongs to (fills {@Name} and the default output)
        #[arg(long, default_value = "Value")]
        field: String,
    },

    /// Transform one legacy page using a run configuration
    Transform {
        /// Path to the page JSON file
        page: PathBuf,
        /// Path to the run configuration TOML file
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match cli.command {
        Commands::Validate { mapping } => {
            commands::validate::cmd_validate(&mapping, cli.output, cli.quiet);
        }
        Commands::Merge { custom, base } => {
            commands::merge::cmd_merge(custom.as_deref(), base.as_deref(), cli.output, cli.quiet);
        }
        Commands::Resolve { layout, mapping } => {
            commands::resolve::cmd_resolve(&layout, mapping.as_deref(), cli.output, cli.quiet);
        }
        Commands::Layout {
            fragments,
            layout,
            mapping,
            vertical,
        } => {
            commands::layout::cmd_layout(commands::layout::LayoutOptions {
                fragments: &fragments,
                layout: layout.as_deref(),
                mapping: mapping.as_deref(),
                vertical,
                output: cli.output,
                quiet: cli.quiet,
            });
        }
        Commands::Eval {
            expression,
            item,
            field,
        } => {
            commands::eval::cmd_eval(&expression, &item, &field, cli.output, cli.quiet);
        }
        Commands::Transform { page, config } => {
            commands::transform::cmd_transform(&page, &config, cli.output, cli.quiet);
        }
    }
}

/// Install the stderr log subscriber.
///
/// `--log-level` wins over `PAGEMORPH_LOG`; without either only warnings
/// and errors are shown.
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

/// Print a serializable value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) {
    let pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization error: {}\"}}", e));
    println!("{}", pretty);
}

/// Read and parse a JSON file, reporting and exiting on failure.
pub(crate) fn read_json(
    path: &std::path::Path,
    output: OutputFormat,
    quiet: bool,
) -> serde_json::Value {
    let content = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            std::process::exit(1);
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            std::process::exit(1);
        }
    }
}
