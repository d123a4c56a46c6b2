//! Add-on contracts: externally supplied function sets callable from
//! expressions as `Namespace.Function(...)`.
//!
//! Add-ons are resolved to explicit instances up front; nothing is looked
//! up reflectively at call time.

use std::collections::HashMap;

use pagemorph_core::{AddOnDeclaration, Argument};

use crate::error::AddOnLoadError;

/// Value returned by a built-in or add-on function.
///
/// Only `Text` and `Bool` are accepted as rule output; the engine discards
/// the others.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionValue {
    Text(String),
    Bool(bool),
    Integer(i64),
    List(Vec<String>),
    Null,
}

/// Context handed to add-ons when they are instantiated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceContext {
    /// Location of the source site the pages come from.
    pub source: String,
    /// Location of the target site pages are written to.
    pub target: String,
}

/// One loaded add-on instance.
///
/// Instances may keep per-run state, so they are owned by a single
/// transformer and called through `&mut self`.
pub trait AddOn: Send {
    /// Names of the callable members.
    fn functions(&self) -> Vec<String>;

    /// Call member `function`. Only invoked with names from [`functions`](Self::functions).
    fn invoke(&mut self, function: &str, arguments: &[Argument]) -> FunctionValue;
}

/// Turns add-on declarations into live instances.
pub trait AddOnLoader {
    fn load(
        &self,
        declaration: &AddOnDeclaration,
        context: &SourceContext,
    ) -> Result<Box<dyn AddOn>, AddOnLoadError>;
}

type AddOnFactory =
    Box<dyn Fn(&SourceContext) -> Result<Box<dyn AddOn>, String> + Send + Sync>;

/// In-process loader: factories registered under an identifier.
///
/// A declaration is matched by its `type_name`, falling back to its
/// `name` (ASCII case-insensitive).
#[derive(Default)]
pub struct AddOnCatalog {
    factories: HashMap<String, AddOnFactory>,
}

impl AddOnCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, identifier: &str, factory: F)
    where
        F: Fn(&SourceContext) -> Result<Box<dyn AddOn>, String> + Send + Sync + 'static,
    {
        self.factories
            .insert(identifier.to_ascii_lowercase(), Box::new(factory));
    }

    pub fn with<F>(mut self, identifier: &str, factory: F) -> Self
    where
        F: Fn(&SourceContext) -> Result<Box<dyn AddOn>, String> + Send + Sync + 'static,
    {
        self.register(identifier, factory);
        self
    }
}

impl AddOnLoader for AddOnCatalog {
    fn load(
        &self,
        declaration: &AddOnDeclaration,
        context: &SourceContext,
    ) -> Result<Box<dyn AddOn>, AddOnLoadError> {
        let identifier = declaration
            .type_name
            .as_deref()
            .unwrap_or(&declaration.name);
        let factory = self
            .factories
            .get(&identifier.to_ascii_lowercase())
            .ok_or_else(|| AddOnLoadError::Unknown {
                name: declaration.name.clone(),
                identifier: identifier.to_string(),
            })?;
        factory(context).map_err(|message| AddOnLoadError::Failed {
            name: declaration.name.clone(),
            message,
        })
    }
}

type AddOnFn = Box<dyn FnMut(&[Argument]) -> FunctionValue + Send>;

/// An add-on assembled from closures.
#[derive(Default)]
pub struct FnAddOn {
    functions: Vec<(String, AddOnFn)>,
}

impl FnAddOn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnMut(&[Argument]) -> FunctionValue + Send + 'static,
    {
        self.functions.push((name.to_string(), Box::new(f)));
        self
    }
}

impl AddOn for FnAddOn {
    fn functions(&self) -> Vec<String> {
        self.functions.iter().map(|(n, _)| n.clone()).collect()
    }

    fn invoke(&mut self, function: &str, arguments: &[Argument]) -> FunctionValue {
        self.functions
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(function))
            .map(|(_, f)| f(arguments))
            .unwrap_or(FunctionValue::Null)
    }
}
