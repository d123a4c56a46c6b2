use pagemorph_connectors::AddOnLoadError;
use pagemorph_core::{MappingError, ResolveError};

/// A row that cannot be expressed as a modern section.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("row {row} uses {columns} columns; at most 3 columns supported")]
    LayoutComplexity { row: u32, columns: u32 },
}

/// Failures that abort the transformation of a page.
///
/// Field-level problems never surface here; they are logged and recorded
/// on the item report instead.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    AddOnLoad(#[from] AddOnLoadError),
}
