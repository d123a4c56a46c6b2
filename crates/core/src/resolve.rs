//! Rule selection: which layout rule applies to a legacy layout.
//!
//! Lookup order is exact primary name, then alias, then an optional
//! generator that builds a rule heuristically. Generated rules are cached
//! per legacy layout name for the lifetime of the resolver.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::ResolveError;
use crate::model::{LayoutRule, MappingModel};
use crate::repository::{rule_key, AliasIndex};

/// Fallback that builds a layout rule when no static mapping exists.
pub trait MappingGenerator: Send + Sync {
    /// Produce a rule for `legacy_layout`, or `None` if it cannot.
    fn layout_rule(&self, legacy_layout: &str) -> Option<LayoutRule>;
}

/// Static resolution against a model: primary name first, then aliases.
pub fn resolve<'m>(model: &'m MappingModel, legacy_layout: &str) -> Option<&'m LayoutRule> {
    model
        .layout(legacy_layout)
        .or_else(|| {
            AliasIndex::build(&model.layouts)
                .get(legacy_layout)
                .map(|idx| &model.layouts[idx])
        })
}

/// Resolves legacy layouts against one effective model.
///
/// The model is shared read-only; the generator cache is internally
/// synchronized so a resolver may be shared across workers.
pub struct RuleResolver {
    model: Arc<MappingModel>,
    aliases: AliasIndex,
    generator: Option<Box<dyn MappingGenerator>>,
    generated: Mutex<HashMap<String, LayoutRule>>,
}

impl RuleResolver {
    pub fn new(model: Arc<MappingModel>) -> Self {
        let aliases = AliasIndex::build(&model.layouts);
        RuleResolver {
            model,
            aliases,
            generator: None,
            generated: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a generator consulted when the model has no entry.
    pub fn with_generator(mut self, generator: Box<dyn MappingGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn model(&self) -> &Arc<MappingModel> {
        &self.model
    }

    /// Find the rule for `legacy_layout`.
    pub fn resolve(&self, legacy_layout: &str) -> Result<LayoutRule, ResolveError> {
        if let Some(rule) = self.model.layout(legacy_layout) {
            return Ok(rule.clone());
        }
        if let Some(idx) = self.aliases.get(legacy_layout) {
            let rule = &self.model.layouts[idx];
            tracing::debug!(
                layout = legacy_layout,
                rule = rule.name.as_str(),
                "resolved layout through alias"
            );
            return Ok(rule.clone());
        }
        self.generate(legacy_layout)
    }

    fn generate(&self, legacy_layout: &str) -> Result<LayoutRule, ResolveError> {
        let not_found = || ResolveError::NoMappingFound {
            layout: legacy_layout.to_string(),
        };
        let generator = self.generator.as_ref().ok_or_else(not_found)?;
        let key = rule_key(legacy_layout);

        let mut cache = self
            .generated
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(rule) = cache.get(&key) {
            return Ok(rule.clone());
        }
        let rule = generator.layout_rule(legacy_layout).ok_or_else(not_found)?;
        tracing::debug!(layout = legacy_layout, "generated layout rule");
        cache.insert(key, rule.clone());
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn rule(name: &str, aliases: &[&str]) -> LayoutRule {
        let mut r = LayoutRule::named(name);
        r.also_applies_to = aliases.iter().map(|a| a.to_string()).collect();
        r
    }

    fn model(rules: Vec<LayoutRule>) -> Arc<MappingModel> {
        Arc::new(MappingModel {
            layouts: rules,
            add_ons: None,
        })
    }

    struct CountingGenerator {
        calls: Arc<AtomicUsize>,
    }

    impl MappingGenerator for CountingGenerator {
        fn layout_rule(&self, legacy_layout: &str) -> Option<LayoutRule> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if legacy_layout.starts_with("Gen") {
                Some(LayoutRule::named(legacy_layout))
            } else {
                None
            }
        }
    }

    #[test]
    fn exact_name_beats_alias() {
        let resolver = RuleResolver::new(model(vec![rule("A", &["B"]), rule("B", &[])]));
        assert_eq!(resolver.resolve("B").unwrap().name, "B");
    }

    #[test]
    fn alias_resolves_to_first_claimant() {
        let resolver = RuleResolver::new(model(vec![rule("A", &["X"]), rule("B", &["X"])]));
        assert_eq!(resolver.resolve("X").unwrap().name, "A");
        assert_eq!(resolve(resolver.model(), "x").unwrap().name, "A");
    }

    #[test]
    fn missing_layout_without_generator_fails() {
        let resolver = RuleResolver::new(model(vec![rule("A", &[])]));
        assert_eq!(
            resolver.resolve("Nope"),
            Err(ResolveError::NoMappingFound {
                layout: "Nope".to_string()
            })
        );
    }

    #[test]
    fn generated_rules_are_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = RuleResolver::new(model(vec![])).with_generator(Box::new(
            CountingGenerator {
                calls: calls.clone(),
            },
        ));
        assert_eq!(resolver.resolve("GenPage").unwrap().name, "GenPage");
        assert_eq!(resolver.resolve("genpage").unwrap().name, "GenPage");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn generator_failure_is_no_mapping_found() {
        let calls = Arc::new(AtomicUsize::new(0));
        let resolver = RuleResolver::new(model(vec![]))
            .with_generator(Box::new(CountingGenerator { calls }));
        assert!(matches!(
            resolver.resolve("Other"),
            Err(ResolveError::NoMappingFound { .. })
        ));
    }
}
