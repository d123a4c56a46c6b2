/// Errors returned by collaborator implementations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectorError {
    /// The batched update of an item could not be saved.
    #[error("failed to persist item {item_id}: {message}")]
    Persist { item_id: String, message: String },

    /// A JSON document did not describe a valid field value or item.
    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    /// A backend-specific failure (transport, authentication, ...).
    #[error("connector backend error: {0}")]
    Backend(String),
}

/// Failure to instantiate a declared add-on.
///
/// Fatal when the transformer is constructed: a missing add-on would
/// silently blank every rule that depends on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddOnLoadError {
    /// The loader has no implementation registered under this identifier.
    #[error("add-on '{name}' could not be found (identifier '{identifier}')")]
    Unknown { name: String, identifier: String },

    /// The implementation exists but refused to start.
    #[error("add-on '{name}' failed to load: {message}")]
    Failed { name: String, message: String },
}
