//! Type-keyed rule registry and resolution.
//!
//! The registry maps a value's type tag to a rendering rule. Ancestry is
//! explicit: hosts declare `subtype -> parent` edges and rules opt into
//! inheritance with `ancestor: true`. An exact-tag rule applies without
//! any flag.
//!
//! # Resolution Order
//!
//! [`FormatterRegistry::resolve`] tries, in order:
//!
//! 1. an explicit strategy in the per-call overrides (`method` beating
//!    nothing, since naming both `method` and `class` is an error),
//! 2. the exact-tag rule,
//! 3. the nearest ancestor carrying an inheriting rule, walking the
//!    declared graph breadth-first; equally-near ancestors resolve in
//!    declaration order.
//!
//! No match is `None`, never an error: the host falls back to its own
//! printing.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

use crate::config::{merge_options, RuleSpec};
use crate::error::ViewError;
use crate::formatter::{Formatter, HelperFn, Options, Strategy, TransformFn};
use crate::value::ReplValue;

/// Explicit `subtype -> parents` edges.
///
/// Parents are remembered in declaration order; resolution relies on that
/// order to break ties between equally-near ancestors.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    parents: HashMap<String, Vec<String>>,
}

impl TypeGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `child` a subtype of `parent`.
    ///
    /// Repeat declarations are kept once, in first-declaration position.
    pub fn declare(&mut self, child: impl Into<String>, parent: impl Into<String>) {
        let parents = self.parents.entry(child.into()).or_default();
        let parent = parent.into();
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    /// Direct parents of `tag`, in declaration order.
    pub fn parents(&self, tag: &str) -> &[String] {
        self.parents.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All ancestors of `tag`, nearest first.
    ///
    /// Breadth-first over the declared edges, so direct parents come
    /// before grandparents and same-depth ancestors keep declaration
    /// order. Cycles are visited once.
    pub fn ancestors(&self, tag: &str) -> Vec<String> {
        let mut order = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(tag.to_string());

        let mut queue: VecDeque<String> = VecDeque::new();
        for parent in self.parents(tag) {
            if seen.insert(parent.clone()) {
                queue.push_back(parent.clone());
            }
        }

        while let Some(current) = queue.pop_front() {
            for parent in self.parents(&current) {
                if seen.insert(parent.clone()) {
                    queue.push_back(parent.clone());
                }
            }
            order.push(current);
        }

        order
    }
}

/// A stored rule: the strategy (when the spec named one), per-rule
/// options, and whether subtypes inherit it.
#[derive(Debug, Clone)]
pub struct RuleEntry {
    pub(crate) strategy: Option<Strategy>,
    pub(crate) options: Options,
    pub(crate) inherit: bool,
}

impl RuleEntry {
    /// Spec form for config round-trips.
    ///
    /// Total by construction: stored rules only ever hold helper or
    /// formatter strategies, both of which are name-addressable.
    pub fn to_spec(&self) -> RuleSpec {
        let mut spec = RuleSpec {
            options: self.options.clone(),
            ..Default::default()
        };
        spec.ancestor = self.inherit;
        match &self.strategy {
            Some(Strategy::Helper { name, .. }) => spec.method = Some(name.clone()),
            Some(Strategy::Formatter { name, .. }) => spec.class = Some(name.clone()),
            Some(Strategy::Inline(_)) | None => {}
        }
        spec
    }
}

/// The outcome of resolution: a concrete strategy plus effective options.
#[derive(Debug, Clone)]
pub struct RenderRule {
    pub strategy: Strategy,
    pub options: Options,
}

impl RenderRule {
    /// Run the rule against a value.
    pub fn apply(&self, value: &ReplValue) -> Result<String, ViewError> {
        self.strategy.apply(value, &self.options)
    }
}

/// Per-call overrides: strategy selection, value transform, extra options.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Force a helper function strategy.
    pub method: Option<String>,
    /// Force a formatter strategy.
    pub class: Option<String>,
    /// Transform the value through a named transform before formatting.
    pub output_method: Option<String>,
    /// Extra options, merged over the resolved rule's options.
    pub options: Options,
}

impl Overrides {
    /// Creates empty overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a helper function strategy.
    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.method = Some(name.into());
        self
    }

    /// Force a formatter strategy.
    pub fn class(mut self, name: impl Into<String>) -> Self {
        self.class = Some(name.into());
        self
    }

    /// Transform the value through a named transform before formatting.
    pub fn output_method(mut self, name: impl Into<String>) -> Self {
        self.output_method = Some(name.into());
        self
    }

    /// Add an option entry.
    pub fn option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// True when nothing is overridden.
    pub fn is_empty(&self) -> bool {
        self.method.is_none()
            && self.class.is_none()
            && self.output_method.is_none()
            && self.options.is_empty()
    }
}

/// Rule storage plus the function and formatter tables rules refer to.
///
/// Cheap to clone: every entry is held through `Rc`.
#[derive(Clone, Default)]
pub struct FormatterRegistry {
    formatters: HashMap<String, Rc<dyn Formatter>>,
    helpers: HashMap<String, HelperFn>,
    transforms: HashMap<String, TransformFn>,
    rules: HashMap<String, RuleEntry>,
    types: TypeGraph,
}

impl FormatterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a formatter under a capability identifier.
    pub fn add_formatter<F: Formatter + 'static>(&mut self, name: impl Into<String>, formatter: F) {
        self.formatters.insert(name.into(), Rc::new(formatter));
    }

    /// Register a named helper function.
    pub fn add_helper<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&ReplValue, &Options) -> Result<String, anyhow::Error> + 'static,
    {
        self.helpers.insert(name.into(), Rc::new(func));
    }

    /// Register a named value transform.
    pub fn add_transform<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&ReplValue) -> Result<ReplValue, anyhow::Error> + 'static,
    {
        self.transforms.insert(name.into(), Rc::new(func));
    }

    /// Declare `child` a subtype of `parent`.
    pub fn declare_subtype(&mut self, child: impl Into<String>, parent: impl Into<String>) {
        self.types.declare(child, parent);
    }

    /// Register (or replace) the rule for a type tag.
    ///
    /// The spec's strategy name must already be registered; unknown names
    /// fail fast here rather than at render time.
    pub fn add_rule(&mut self, tag: impl Into<String>, spec: RuleSpec) -> Result<(), ViewError> {
        let tag = tag.into();
        let entry = self.entry_from_spec(&tag, &spec)?;
        self.rules.insert(tag, entry);
        Ok(())
    }

    /// True if a helper is registered under `name`.
    pub fn has_helper(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// True if a formatter is registered under `name`.
    pub fn has_formatter(&self, name: &str) -> bool {
        self.formatters.contains_key(name)
    }

    /// True if a rule is registered for `tag`.
    pub fn has_rule(&self, tag: &str) -> bool {
        self.rules.contains_key(tag)
    }

    /// The declared type graph.
    pub fn types(&self) -> &TypeGraph {
        &self.types
    }

    /// Look up a named transform.
    pub(crate) fn transform(&self, name: &str) -> Result<TransformFn, ViewError> {
        self.transforms
            .get(name)
            .cloned()
            .ok_or_else(|| ViewError::UnknownTransform(name.to_string()))
    }

    /// Replace the rule table from spec form.
    pub(crate) fn load_specs(
        &mut self,
        specs: &BTreeMap<String, RuleSpec>,
    ) -> Result<(), ViewError> {
        let mut rules = HashMap::new();
        for (tag, spec) in specs {
            rules.insert(tag.clone(), self.entry_from_spec(tag, spec)?);
        }
        self.rules = rules;
        Ok(())
    }

    /// The live rule table in spec form.
    pub fn to_specs(&self) -> BTreeMap<String, RuleSpec> {
        self.rules
            .iter()
            .map(|(tag, entry)| (tag.clone(), entry.to_spec()))
            .collect()
    }

    /// Resolve the rule for `value`, honoring per-call overrides.
    ///
    /// See the module docs for the resolution order. The returned rule's
    /// options are the configured options with the override's options
    /// merged on top.
    pub fn resolve(
        &self,
        value: &ReplValue,
        overrides: &Overrides,
    ) -> Result<Option<RenderRule>, ViewError> {
        let tag = value.tag();
        let exact = self.rules.get(tag);

        if overrides.method.is_some() && overrides.class.is_some() {
            return Err(ViewError::ConflictingStrategies(tag.to_string()));
        }

        let override_strategy = if let Some(method) = &overrides.method {
            Some(self.helper_strategy(method)?)
        } else if let Some(class) = &overrides.class {
            Some(self.formatter_strategy(class)?)
        } else {
            None
        };

        if let Some(strategy) = override_strategy {
            let configured = exact.map(|entry| entry.options.clone()).unwrap_or_default();
            let options = merge_options(&configured, &overrides.options);
            return Ok(Some(RenderRule { strategy, options }));
        }

        if let Some(entry) = exact {
            if let Some(strategy) = &entry.strategy {
                let options = merge_options(&entry.options, &overrides.options);
                return Ok(Some(RenderRule {
                    strategy: strategy.clone(),
                    options,
                }));
            }
        }

        for ancestor in self.types.ancestors(tag) {
            let entry = match self.rules.get(&ancestor) {
                Some(entry) if entry.inherit => entry,
                _ => continue,
            };
            if let Some(strategy) = &entry.strategy {
                // Options layer outward-in: ancestor, then the tag's own
                // options-only entry, then the per-call overrides.
                let mut options = entry.options.clone();
                if let Some(exact) = exact {
                    options = merge_options(&options, &exact.options);
                }
                options = merge_options(&options, &overrides.options);
                return Ok(Some(RenderRule {
                    strategy: strategy.clone(),
                    options,
                }));
            }
        }

        Ok(None)
    }

    fn entry_from_spec(&self, tag: &str, spec: &RuleSpec) -> Result<RuleEntry, ViewError> {
        let strategy = match (&spec.method, &spec.class) {
            (Some(_), Some(_)) => {
                return Err(ViewError::ConflictingStrategies(tag.to_string()))
            }
            (Some(method), None) => Some(self.helper_strategy(method)?),
            (None, Some(class)) => Some(self.formatter_strategy(class)?),
            (None, None) => None,
        };
        Ok(RuleEntry {
            strategy,
            options: spec.options.clone(),
            inherit: spec.ancestor,
        })
    }

    fn helper_strategy(&self, name: &str) -> Result<Strategy, ViewError> {
        let func = self
            .helpers
            .get(name)
            .cloned()
            .ok_or_else(|| ViewError::UnknownHelper(name.to_string()))?;
        Ok(Strategy::Helper {
            name: name.to_string(),
            func,
        })
    }

    fn formatter_strategy(&self, name: &str) -> Result<Strategy, ViewError> {
        let formatter = self
            .formatters
            .get(name)
            .cloned()
            .ok_or_else(|| ViewError::UnknownFormatter(name.to_string()))?;
        Ok(Strategy::Formatter {
            name: name.to_string(),
            formatter,
        })
    }
}

impl fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterRegistry")
            .field("formatters", &self.formatters.keys().collect::<Vec<_>>())
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::Options;
    use serde_json::json;

    fn value(tag: &str) -> ReplValue {
        ReplValue::new(tag, json!("payload"))
    }

    fn registry_with_helpers() -> FormatterRegistry {
        let mut registry = FormatterRegistry::new();
        registry.add_helper("plain", |value: &ReplValue, _: &Options| {
            Ok(value.data().as_str().unwrap_or_default().to_string())
        });
        registry.add_helper("shout", |value: &ReplValue, _: &Options| {
            Ok(value.data().as_str().unwrap_or_default().to_uppercase())
        });
        registry.add_formatter("Quote", |value: &ReplValue, _: &Options| {
            Ok(format!("<<{}>>", value.data().as_str().unwrap_or_default()))
        });
        registry
    }

    #[test]
    fn graph_ancestors_nearest_first() {
        let mut graph = TypeGraph::new();
        graph.declare("C", "B");
        graph.declare("B", "A");
        assert_eq!(graph.ancestors("C"), vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn graph_same_depth_keeps_declaration_order() {
        let mut graph = TypeGraph::new();
        graph.declare("C", "First");
        graph.declare("C", "Second");
        graph.declare("First", "Top");
        assert_eq!(
            graph.ancestors("C"),
            vec!["First".to_string(), "Second".to_string(), "Top".to_string()]
        );
    }

    #[test]
    fn graph_survives_cycles() {
        let mut graph = TypeGraph::new();
        graph.declare("A", "B");
        graph.declare("B", "A");
        assert_eq!(graph.ancestors("A"), vec!["B".to_string()]);
    }

    #[test]
    fn graph_deduplicates_repeat_declarations() {
        let mut graph = TypeGraph::new();
        graph.declare("C", "A");
        graph.declare("C", "A");
        assert_eq!(graph.parents("C"), ["A".to_string()]);
    }

    #[test]
    fn add_rule_rejects_unknown_helper() {
        let mut registry = FormatterRegistry::new();
        let result = registry.add_rule("T", RuleSpec::method("missing"));
        match result {
            Err(ViewError::UnknownHelper(name)) => assert_eq!(name, "missing"),
            other => panic!("expected UnknownHelper, got {:?}", other),
        }
    }

    #[test]
    fn add_rule_rejects_conflicting_spec() {
        let mut registry = registry_with_helpers();
        let spec = RuleSpec {
            method: Some("plain".into()),
            class: Some("Quote".into()),
            ..Default::default()
        };
        assert!(matches!(
            registry.add_rule("T", spec),
            Err(ViewError::ConflictingStrategies(_))
        ));
    }

    #[test]
    fn resolve_exact_match() {
        let mut registry = registry_with_helpers();
        registry.add_rule("Text", RuleSpec::method("shout")).unwrap();

        let rule = registry
            .resolve(&value("Text"), &Overrides::new())
            .unwrap()
            .unwrap();
        assert_eq!(rule.apply(&value("Text")).unwrap(), "PAYLOAD");
    }

    #[test]
    fn resolve_unregistered_is_none() {
        let registry = registry_with_helpers();
        let resolved = registry.resolve(&value("Mystery"), &Overrides::new()).unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn method_override_beats_registered_rule() {
        let mut registry = registry_with_helpers();
        registry.add_rule("Text", RuleSpec::class("Quote")).unwrap();

        let rule = registry
            .resolve(&value("Text"), &Overrides::new().method("shout"))
            .unwrap()
            .unwrap();
        assert_eq!(rule.apply(&value("Text")).unwrap(), "PAYLOAD");
    }

    #[test]
    fn class_override_beats_registered_rule() {
        let mut registry = registry_with_helpers();
        registry.add_rule("Text", RuleSpec::method("shout")).unwrap();

        let rule = registry
            .resolve(&value("Text"), &Overrides::new().class("Quote"))
            .unwrap()
            .unwrap();
        assert_eq!(rule.apply(&value("Text")).unwrap(), "<<payload>>");
    }

    #[test]
    fn override_with_both_strategies_errors() {
        let registry = registry_with_helpers();
        let overrides = Overrides::new().method("plain").class("Quote");
        assert!(matches!(
            registry.resolve(&value("Text"), &overrides),
            Err(ViewError::ConflictingStrategies(_))
        ));
    }

    #[test]
    fn override_with_unknown_method_errors() {
        let registry = registry_with_helpers();
        let result = registry.resolve(&value("Text"), &Overrides::new().method("missing"));
        assert!(matches!(result, Err(ViewError::UnknownHelper(_))));
    }

    #[test]
    fn override_with_unknown_class_errors() {
        let registry = registry_with_helpers();
        let result = registry.resolve(&value("Text"), &Overrides::new().class("Missing"));
        assert!(matches!(result, Err(ViewError::UnknownFormatter(_))));
    }

    #[test]
    fn ancestor_rule_requires_inherit_flag() {
        let mut registry = registry_with_helpers();
        registry.declare_subtype("Child", "Parent");
        registry.add_rule("Parent", RuleSpec::method("plain")).unwrap();

        let resolved = registry.resolve(&value("Child"), &Overrides::new()).unwrap();
        assert!(resolved.is_none());
    }

    #[test]
    fn exact_match_does_not_require_inherit() {
        let mut registry = registry_with_helpers();
        registry.add_rule("Text", RuleSpec::method("plain")).unwrap();

        let resolved = registry.resolve(&value("Text"), &Overrides::new()).unwrap();
        assert!(resolved.is_some());
    }

    #[test]
    fn inheriting_ancestor_rule_applies() {
        let mut registry = registry_with_helpers();
        registry.declare_subtype("Child", "Parent");
        registry
            .add_rule("Parent", RuleSpec::method("shout").inherit())
            .unwrap();

        let rule = registry
            .resolve(&value("Child"), &Overrides::new())
            .unwrap()
            .unwrap();
        assert_eq!(rule.apply(&value("Child")).unwrap(), "PAYLOAD");
    }

    #[test]
    fn nearest_ancestor_wins() {
        let mut registry = registry_with_helpers();
        registry.declare_subtype("C", "B");
        registry.declare_subtype("B", "A");
        registry.add_rule("A", RuleSpec::method("plain").inherit()).unwrap();
        registry.add_rule("B", RuleSpec::class("Quote").inherit()).unwrap();

        let rule = registry
            .resolve(&value("C"), &Overrides::new())
            .unwrap()
            .unwrap();
        assert_eq!(rule.apply(&value("C")).unwrap(), "<<payload>>");
    }

    #[test]
    fn same_depth_tie_goes_to_earliest_declared_parent() {
        let mut registry = registry_with_helpers();
        registry.declare_subtype("C", "First");
        registry.declare_subtype("C", "Second");
        registry
            .add_rule("First", RuleSpec::method("shout").inherit())
            .unwrap();
        registry
            .add_rule("Second", RuleSpec::class("Quote").inherit())
            .unwrap();

        let rule = registry
            .resolve(&value("C"), &Overrides::new())
            .unwrap()
            .unwrap();
        assert_eq!(rule.apply(&value("C")).unwrap(), "PAYLOAD");
    }

    #[test]
    fn non_inheriting_ancestor_is_skipped_for_deeper_one() {
        let mut registry = registry_with_helpers();
        registry.declare_subtype("C", "B");
        registry.declare_subtype("B", "A");
        registry.add_rule("B", RuleSpec::method("plain")).unwrap();
        registry.add_rule("A", RuleSpec::class("Quote").inherit()).unwrap();

        let rule = registry
            .resolve(&value("C"), &Overrides::new())
            .unwrap()
            .unwrap();
        assert_eq!(rule.apply(&value("C")).unwrap(), "<<payload>>");
    }

    #[test]
    fn override_options_merge_over_rule_options() {
        let mut registry = registry_with_helpers();
        registry.add_helper("opts", |_: &ReplValue, options: &Options| {
            Ok(serde_json::to_string(options).unwrap_or_default())
        });
        registry
            .add_rule(
                "T",
                RuleSpec::method("opts")
                    .option("a", json!(1))
                    .option("b", json!(2)),
            )
            .unwrap();

        let rule = registry
            .resolve(&value("T"), &Overrides::new().option("b", json!(9)))
            .unwrap()
            .unwrap();
        assert_eq!(rule.options["a"], json!(1));
        assert_eq!(rule.options["b"], json!(9));
    }

    #[test]
    fn explicit_override_keeps_configured_options() {
        let mut registry = registry_with_helpers();
        registry
            .add_rule("T", RuleSpec::method("plain").option("max_width", json!(90)))
            .unwrap();

        let rule = registry
            .resolve(&value("T"), &Overrides::new().method("shout"))
            .unwrap()
            .unwrap();
        assert_eq!(rule.options["max_width"], json!(90));
        assert_eq!(rule.apply(&value("T")).unwrap(), "PAYLOAD");
    }

    #[test]
    fn options_only_entry_layers_over_inherited_rule() {
        let mut registry = registry_with_helpers();
        registry.declare_subtype("Child", "Parent");
        registry
            .add_rule(
                "Parent",
                RuleSpec::method("plain").option("pad", json!(1)).inherit(),
            )
            .unwrap();
        registry
            .add_rule(
                "Child",
                RuleSpec::default().option("pad", json!(4)),
            )
            .unwrap();

        let rule = registry
            .resolve(&value("Child"), &Overrides::new())
            .unwrap()
            .unwrap();
        assert_eq!(rule.options["pad"], json!(4));
    }

    #[test]
    fn rules_round_trip_through_specs() {
        let mut registry = registry_with_helpers();
        let spec = RuleSpec::method("shout").option("a", json!(1)).inherit();
        registry.add_rule("T", spec.clone()).unwrap();
        registry.add_rule("U", RuleSpec::class("Quote")).unwrap();

        let specs = registry.to_specs();
        assert_eq!(specs["T"], spec);
        assert_eq!(specs["U"], RuleSpec::class("Quote"));

        let mut rebuilt = registry_with_helpers();
        rebuilt.load_specs(&specs).unwrap();
        assert!(rebuilt.has_rule("T"));
        assert!(rebuilt.has_rule("U"));
    }

    #[test]
    fn unknown_transform_errors() {
        let registry = registry_with_helpers();
        assert!(matches!(
            registry.transform("missing"),
            Err(ViewError::UnknownTransform(_))
        ));
    }
}
