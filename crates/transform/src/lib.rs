//! pagemorph-transform: turns a legacy page into a modern one.
//!
//! # Public API
//!
//! - [`PageTransformer`] -- resolve, lay out, build the header and reconcile one page
//! - [`infer_sections()`] -- pure row/column to section inference
//! - [`Evaluator`] -- run `functions` expressions against an item
//! - [`MetadataReconciler`] -- map source fields onto the target schema

pub mod error;
pub mod evaluate;
pub mod functions;
pub mod header;
pub mod layout;
pub mod metadata;
pub mod options;
pub mod page;
pub mod registry;
pub mod report;

pub use error::{LayoutError, TransformError};
pub use evaluate::{bind_arguments, CallStatus, Evaluation, Evaluator, OutputValue};
pub use header::{evaluate_header, PageHeader};
pub use layout::{infer_sections, ColumnLayout, ContentFragment, Section, SectionTemplate};
pub use metadata::{MetadataReconciler, SourceValue};
pub use options::{Connectors, TransformOptions};
pub use page::{LegacyPage, PageOutcome, PageTransformer};
pub use registry::AddOnRegistry;
pub use report::{FieldIssue, IssueKind, ItemReport, ItemState};
