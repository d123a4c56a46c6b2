//! pagemorph-connectors: contracts for the systems a page transformation
//! talks to, the records exchanged with them, and in-memory implementations.

mod addon;
mod error;
pub mod memory;
mod record;
mod traits;

pub use addon::{AddOn, AddOnCatalog, AddOnLoader, FnAddOn, FunctionValue, SourceContext};
pub use error::{AddOnLoadError, ConnectorError};
pub use record::{
    ContentItem, FieldDescriptor, FieldKind, FieldValue, Principal, TermReference,
};
pub use traits::{
    ContentStore, IdentityRemap, MappingGenerator, NoGenerator, SchemaFieldLookup, TermTransform,
    TransformedTerm, UserDirectory,
};
