//! The render dispatcher and its builder.
//!
//! [`Viewer`] is the engine behind every entry point: given a value and
//! optional per-call overrides it resolves exactly one strategy, runs it,
//! and hands the text to the sink. [`ViewerBuilder`] assembles a viewer
//! from configuration overrides plus programmatic registrations, and is
//! `Clone` so a host can keep it around as a blueprint for rebuilding the
//! same viewer later.
//!
//! # Dispatch
//!
//! [`Viewer::render_block`] and friends try, in order:
//!
//! 1. the inline block, when one is supplied; it always wins;
//! 2. the registry's resolved rule for the value's tag;
//! 3. nothing: `render` returns `Ok(false)` and the sink is not touched,
//!    leaving the fallback to the caller.
//!
//! The `format` family runs the same resolution but returns the text
//! instead of sending it, so it never pages or prints.
//!
//! # Sinks
//!
//! Without a custom sink, rendered text is paged when the pager is
//! enabled and the text overflows the terminal, and printed otherwise.
//! A custom sink replaces both behaviors.
//!
//! # Single-Threaded Design
//!
//! A viewer is built for one REPL loop on one thread. Rules, helpers, and
//! sinks are shared through `Rc`; nothing here is `Send`. Configuration
//! is only mutated through the explicit `add_*`, `resize`, and `reload`
//! calls between renders, never during one.

use std::fmt;
use std::rc::Rc;

use vantage_pager::{term, PageMode, Pager};

use crate::config::{recursive_merge, RuleSpec, ViewConfig};
use crate::error::ViewError;
use crate::formatter::{Formatter, InlineFn, Options};
use crate::registry::{FormatterRegistry, Overrides};
use crate::value::ReplValue;

/// The final consumer of rendered text.
pub type SinkFn = Rc<dyn Fn(&str)>;

/// Builds a [`Viewer`] from configuration and registrations.
///
/// Cheap to clone; a clone is a blueprint that builds an equivalent
/// viewer with a freshly merged configuration.
#[derive(Clone)]
pub struct ViewerBuilder {
    config: serde_json::Value,
    registry: FormatterRegistry,
    rules: Vec<(String, RuleSpec)>,
    sink: Option<SinkFn>,
    pager: Option<Pager>,
}

impl ViewerBuilder {
    /// Creates a builder with no overrides and an empty registry.
    pub fn new() -> Self {
        Self {
            config: serde_json::Value::Object(serde_json::Map::new()),
            registry: FormatterRegistry::new(),
            rules: Vec::new(),
            sink: None,
            pager: None,
        }
    }

    /// Merge configuration overrides over what the builder holds so far.
    ///
    /// Accepts the recognized keys (`width`, `height`, `pager`,
    /// `pager_command`, `output`); later calls win key-by-key.
    pub fn config(mut self, overrides: serde_json::Value) -> Self {
        self.config = recursive_merge(self.config, overrides);
        self
    }

    /// Register a named helper function.
    pub fn helper<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&ReplValue, &Options) -> Result<String, anyhow::Error> + 'static,
    {
        self.registry.add_helper(name, func);
        self
    }

    /// Register a formatter under a capability identifier.
    pub fn formatter<F: Formatter + 'static>(mut self, name: impl Into<String>, formatter: F) -> Self {
        self.registry.add_formatter(name, formatter);
        self
    }

    /// Register a named value transform.
    pub fn transform<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&ReplValue) -> Result<ReplValue, anyhow::Error> + 'static,
    {
        self.registry.add_transform(name, func);
        self
    }

    /// Declare `child` a subtype of `parent` for ancestor resolution.
    pub fn subtype(mut self, child: impl Into<String>, parent: impl Into<String>) -> Self {
        self.registry.declare_subtype(child, parent);
        self
    }

    /// Register a rule for a type tag.
    ///
    /// Applied after configured rules, so a programmatic rule replaces a
    /// configured one for the same tag.
    pub fn rule(mut self, tag: impl Into<String>, spec: RuleSpec) -> Self {
        self.rules.push((tag.into(), spec));
        self
    }

    /// Replace the default page-or-print sink.
    pub fn sink<F: Fn(&str) + 'static>(mut self, sink: F) -> Self {
        self.sink = Some(Rc::new(sink));
        self
    }

    /// Use a pre-built pager instead of the detected one.
    ///
    /// The pager's dimensions are overwritten with the configured ones at
    /// build time; its runner and any explicit command are kept.
    pub fn pager(mut self, pager: Pager) -> Self {
        self.pager = Some(pager);
        self
    }

    /// Build the viewer.
    ///
    /// Merges the overrides over defaults, validates every configured
    /// rule against the registered names, and sizes the pager from the
    /// effective dimensions. Unknown helper or formatter names fail here
    /// rather than at render time.
    pub fn build(self) -> Result<Viewer, ViewError> {
        let mut config = ViewConfig::load(self.config, term::detect_dimensions())?;

        let mut registry = self.registry;
        registry.load_specs(&config.output)?;
        for (tag, spec) in self.rules {
            registry.add_rule(tag, spec)?;
        }
        config.output = registry.to_specs();

        let mut pager = self
            .pager
            .unwrap_or_else(|| Pager::new(config.width, config.height));
        pager.resize(config.width, config.height);
        if let Some(command) = &config.pager_command {
            pager.set_command(Some(command.clone()));
        }

        Ok(Viewer {
            config,
            registry,
            pager,
            sink: self.sink,
        })
    }
}

impl Default for ViewerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ViewerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerBuilder")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("rules", &self.rules)
            .field("sink", &self.sink.as_ref().map(|_| "<sink>"))
            .field("pager", &self.pager)
            .finish()
    }
}

/// The render dispatcher.
pub struct Viewer {
    config: ViewConfig,
    registry: FormatterRegistry,
    pager: Pager,
    sink: Option<SinkFn>,
}

impl Viewer {
    /// Starts a [`ViewerBuilder`].
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    /// Render `value` through its resolved rule and send the text to the
    /// sink.
    ///
    /// Returns `Ok(true)` when a rule matched and the sink received the
    /// text, `Ok(false)` when nothing matched. `false` is the normal
    /// "caller should print its own representation" outcome, not a
    /// failure. The sink is invoked exactly once on success and never
    /// otherwise.
    pub fn render(&self, value: &ReplValue) -> Result<bool, ViewError> {
        self.render_with(value, &Overrides::new())
    }

    /// [`render`](Self::render) with per-call overrides.
    pub fn render_with(&self, value: &ReplValue, overrides: &Overrides) -> Result<bool, ViewError> {
        match self.dispatch(value, overrides, None)? {
            Some(text) => {
                self.send(&text);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// [`render`](Self::render) with an inline block.
    ///
    /// The block bypasses resolution entirely; it runs even when no rule
    /// is registered for the value, and beats any rule that is. The
    /// block receives the value and the override options and is free to
    /// ignore either.
    pub fn render_block<F>(
        &self,
        value: &ReplValue,
        overrides: &Overrides,
        block: F,
    ) -> Result<bool, ViewError>
    where
        F: Fn(&ReplValue, &Options) -> Result<String, anyhow::Error> + 'static,
    {
        let block: InlineFn = Rc::new(block);
        match self.dispatch(value, overrides, Some(&block))? {
            Some(text) => {
                self.send(&text);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Resolve and run the rule for `value`, returning the text.
    ///
    /// Same resolution as [`render`](Self::render), but the sink is never
    /// touched: no paging, no printing. `Ok(None)` means no rule matched.
    pub fn format(&self, value: &ReplValue) -> Result<Option<String>, ViewError> {
        self.dispatch(value, &Overrides::new(), None)
    }

    /// [`format`](Self::format) with per-call overrides.
    pub fn format_with(
        &self,
        value: &ReplValue,
        overrides: &Overrides,
    ) -> Result<Option<String>, ViewError> {
        self.dispatch(value, overrides, None)
    }

    /// [`format`](Self::format) with an inline block.
    pub fn format_block<F>(
        &self,
        value: &ReplValue,
        overrides: &Overrides,
        block: F,
    ) -> Result<Option<String>, ViewError>
    where
        F: Fn(&ReplValue, &Options) -> Result<String, anyhow::Error> + 'static,
    {
        let block: InlineFn = Rc::new(block);
        self.dispatch(value, overrides, Some(&block))
    }

    fn dispatch(
        &self,
        value: &ReplValue,
        overrides: &Overrides,
        block: Option<&InlineFn>,
    ) -> Result<Option<String>, ViewError> {
        if let Some(block) = block {
            let text =
                block(value, &overrides.options).map_err(|err| ViewError::format("inline", err))?;
            return Ok(Some(text));
        }

        let rule = match self.registry.resolve(value, overrides)? {
            Some(rule) => rule,
            None => return Ok(None),
        };

        let transformed;
        let value = match &overrides.output_method {
            Some(name) => {
                let transform = self.registry.transform(name)?;
                transformed = transform(value).map_err(|err| ViewError::format(name, err))?;
                &transformed
            }
            None => value,
        };

        rule.apply(value).map(Some)
    }

    fn send(&self, text: &str) {
        match &self.sink {
            Some(sink) => sink(text),
            None => self.page_or_print(text),
        }
    }

    fn page_or_print(&self, text: &str) {
        if self.config.pager && self.pager.activated_by(text, PageMode::Rendered) {
            match self.pager.page(text, PageMode::Rendered) {
                Ok(()) => return,
                Err(err) => eprintln!("vantage: pager failed, printing instead: {err}"),
            }
        }
        println!("{text}");
    }

    /// The effective configuration.
    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// The live registry.
    pub fn registry(&self) -> &FormatterRegistry {
        &self.registry
    }

    /// The pager behind the default sink.
    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    /// Register (or replace) the rule for a type tag at runtime.
    ///
    /// The effective configuration's `output` table is kept in sync, so
    /// the rule survives [`reload`](Self::reload).
    pub fn add_rule(&mut self, tag: impl Into<String>, spec: RuleSpec) -> Result<(), ViewError> {
        self.registry.add_rule(tag, spec)?;
        self.config.output = self.registry.to_specs();
        Ok(())
    }

    /// Register a named helper function at runtime.
    pub fn add_helper<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&ReplValue, &Options) -> Result<String, anyhow::Error> + 'static,
    {
        self.registry.add_helper(name, func);
    }

    /// Register a formatter at runtime.
    pub fn add_formatter<F: Formatter + 'static>(&mut self, name: impl Into<String>, formatter: F) {
        self.registry.add_formatter(name, formatter);
    }

    /// Register a named value transform at runtime.
    pub fn add_transform<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&ReplValue) -> Result<ReplValue, anyhow::Error> + 'static,
    {
        self.registry.add_transform(name, func);
    }

    /// Declare `child` a subtype of `parent` at runtime.
    pub fn declare_subtype(&mut self, child: impl Into<String>, parent: impl Into<String>) {
        self.registry.declare_subtype(child, parent);
    }

    /// Replace the sink.
    pub fn set_sink<F: Fn(&str) + 'static>(&mut self, sink: F) {
        self.sink = Some(Rc::new(sink));
    }

    /// Restore the default page-or-print sink.
    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    /// Update terminal dimensions.
    ///
    /// A dimension left `None` is auto-detected; when detection fails it
    /// falls back to the fixed defaults. The pager follows the new
    /// dimensions immediately.
    pub fn resize(&mut self, width: Option<usize>, height: Option<usize>) {
        let detected = term::detect_dimensions();
        let (width, height) = crate::config::resolve_dimensions(width, height, detected);
        self.config.width = width;
        self.config.height = height;
        self.pager.resize(width, height);
    }

    /// Re-merge the current configuration over defaults.
    ///
    /// The live registry's rule table wins over whatever the previous
    /// configuration held, so rules registered at runtime survive.
    pub fn reload(&mut self) -> Result<(), ViewError> {
        let mut config = ViewConfig::load(self.config.to_value()?, term::detect_dimensions())?;
        config.output = self.registry.to_specs();
        self.config = config;
        self.pager.resize(self.config.width, self.config.height);
        if let Some(command) = &self.config.pager_command {
            self.pager.set_command(Some(command.clone()));
        }
        Ok(())
    }
}

impl fmt::Debug for Viewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Viewer")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("pager", &self.pager)
            .field("sink", &self.sink.as_ref().map(|_| "<sink>"))
            .finish()
    }
}
