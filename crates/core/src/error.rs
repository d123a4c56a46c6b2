use std::path::PathBuf;

/// Errors raised while loading or merging mapping documents.
///
/// Every variant is fatal for the page being transformed: a mapping that
/// cannot be loaded leaves nothing to transform against.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// The mapping file does not exist.
    #[error("mapping file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The mapping file exists but could not be read.
    #[error("could not read mapping file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed JSON, or a schema-valid document
    /// still failed to deserialize into the model.
    #[error("could not parse mapping '{origin}': {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// The document does not conform to the mapping schema.
    #[error("mapping '{origin}' failed schema validation: {}", errors.join("; "))]
    SchemaValidation { origin: String, errors: Vec<String> },

    /// The embedded schema itself could not be compiled.
    #[error("internal error: mapping schema is invalid: {0}")]
    InvalidSchema(String),

    /// Two layout rules in one document share a name.
    #[error("mapping '{origin}' declares layout rule '{name}' more than once")]
    DuplicateRule { origin: String, name: String },
}

/// Failure to find a layout rule for a legacy layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Neither the static mapping nor the generator produced a rule.
    #[error("no mapping found for legacy layout '{layout}'")]
    NoMappingFound { layout: String },
}

/// Syntax errors in a field rule's `functions` expression.
///
/// Fatal for the one rule only; callers log and move on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FunctionParseError {
    #[error("expression is empty")]
    Empty,

    #[error("expression has no argument list")]
    MissingArgumentList,

    #[error("expression has no function name")]
    MissingFunctionName,

    #[error("invalid function name '{name}'")]
    InvalidFunctionName { name: String },

    #[error("unbalanced parentheses in expression")]
    UnbalancedParentheses,

    #[error("unterminated quoted literal")]
    UnterminatedLiteral,

    #[error("malformed argument '{argument}'")]
    MalformedArgument { argument: String },

    #[error("unexpected input after argument list: '{rest}'")]
    TrailingInput { rest: String },

    #[error("invalid output binding '{binding}'")]
    InvalidOutputBinding { binding: String },
}
