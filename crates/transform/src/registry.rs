//! Add-on registry: live add-on instances indexed by `(namespace, function)`.
//!
//! Built once per transformer from the model's add-on declarations. The
//! instances may hold per-run state, so a registry is owned by exactly one
//! transformer and never shared between workers.

use std::collections::HashMap;

use pagemorph_connectors::{AddOn, AddOnLoadError, AddOnLoader, FunctionValue, SourceContext};
use pagemorph_core::{AddOnDeclaration, Argument};

/// Result of looking a qualified function up in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Found,
    UnknownNamespace,
    UnknownFunction,
}

#[derive(Default)]
pub struct AddOnRegistry {
    instances: Vec<Box<dyn AddOn>>,
    namespaces: HashMap<String, usize>,
    members: HashMap<(String, String), String>,
}

impl AddOnRegistry {
    /// A registry with no add-ons; every namespaced call misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Instantiate every declaration through `loader`.
    ///
    /// The first load failure aborts construction.
    pub fn load(
        declarations: &[AddOnDeclaration],
        loader: &dyn AddOnLoader,
        context: &SourceContext,
    ) -> Result<Self, AddOnLoadError> {
        let mut registry = AddOnRegistry::empty();
        for declaration in declarations {
            let instance = loader.load(declaration, context)?;
            tracing::debug!(
                add_on = %declaration.name,
                functions = instance.functions().len(),
                "loaded add-on"
            );
            registry.insert(&declaration.name, instance);
        }
        Ok(registry)
    }

    /// Register `instance` under `namespace`, replacing any earlier one.
    pub fn insert(&mut self, namespace: &str, instance: Box<dyn AddOn>) {
        let ns = namespace.to_ascii_lowercase();
        self.members.retain(|(n, _), _| *n != ns);
        for function in instance.functions() {
            self.members
                .insert((ns.clone(), function.to_ascii_lowercase()), function);
        }
        match self.namespaces.get(&ns) {
            Some(&index) => self.instances[index] = instance,
            None => {
                self.instances.push(instance);
                self.namespaces.insert(ns, self.instances.len() - 1);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    pub fn lookup(&self, namespace: &str, function: &str) -> Lookup {
        let ns = namespace.to_ascii_lowercase();
        if !self.namespaces.contains_key(&ns) {
            return Lookup::UnknownNamespace;
        }
        if self
            .members
            .contains_key(&(ns, function.to_ascii_lowercase()))
        {
            Lookup::Found
        } else {
            Lookup::UnknownFunction
        }
    }

    /// Call `namespace.function`; `None` when it is not registered.
    pub fn invoke(
        &mut self,
        namespace: &str,
        function: &str,
        arguments: &[Argument],
    ) -> Option<FunctionValue> {
        let ns = namespace.to_ascii_lowercase();
        let member = self
            .members
            .get(&(ns.clone(), function.to_ascii_lowercase()))?
            .clone();
        let index = *self.namespaces.get(&ns)?;
        let instance = self.instances.get_mut(index)?;
        Some(instance.invoke(&member, arguments))
    }
}

impl std::fmt::Debug for AddOnRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut namespaces: Vec<_> = self.namespaces.keys().collect();
        namespaces.sort();
        f.debug_struct("AddOnRegistry")
            .field("namespaces", &namespaces)
            .finish()
    }
}
