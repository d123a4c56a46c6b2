//! pagemorph-core: mapping model, mapping repository and expression parser.
//!
//! # Public API
//!
//! - [`load()`], [`load_default()`], [`merge()`] -- build an effective [`MappingModel`]
//! - [`RuleResolver`] -- pick the [`LayoutRule`] for a legacy layout
//! - [`parse_function_call()`] -- turn a rule's `functions` string into a [`FunctionCall`]

pub mod error;
pub mod expression;
pub mod model;
pub mod repository;
pub mod resolve;

pub use error::{FunctionParseError, MappingError, ResolveError};
pub use expression::{parse_function_call, Argument, ArgumentKind, FunctionCall};
pub use model::{
    AddOnDeclaration, Emphasis, FieldRule, FieldValueType, HeaderAlignment, HeaderFieldRule,
    HeaderKind, HeaderRule, LayoutRule, MappingModel, RowEmphasis, SectionEmphasis,
};
pub use repository::{load, load_default, load_effective, load_str, merge, AliasIndex};
pub use resolve::{resolve, MappingGenerator, RuleResolver};
