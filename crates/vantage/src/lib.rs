//! # Vantage - View Rendering for Interactive Consoles
//!
//! Vantage decides how the value a REPL user just evaluated gets shown:
//! rendered through a registered formatter, paged when it overflows the
//! terminal, or left to the host's ordinary printing. It provides:
//!
//! - Rule-based dispatch from a value's type tag to a rendering strategy
//! - Declared type ancestry with opt-in rule inheritance
//! - Per-call overrides and inline rendering blocks
//! - Layered configuration with recursive merging and live reload
//! - Terminal-aware paging through `vantage-pager`
//!
//! Vantage never renders anything itself - formatters are external
//! capabilities the host registers. The engine's job is picking exactly
//! one of them per value and routing the text it produces.
//!
//! ## Core Concepts
//!
//! - [`ReplValue`]: a host value as the pipeline sees it - type tag,
//!   structured payload, raw inspect text
//! - [`Strategy`]: how a value gets rendered - an inline block, a named
//!   helper function, or a registered [`Formatter`]
//! - [`RuleSpec`]: a configured rule tying a type tag to a strategy,
//!   options, and an inheritance flag
//! - [`Viewer`]: the dispatcher; [`ViewerBuilder`] assembles one
//! - [`Session`]: enable/disable lifecycle plus the host output hook
//! - [`console`]: shorthand token-based invocations
//!
//! ## Quick Start
//!
//! ```rust
//! use serde_json::json;
//! use vantage::{Options, ReplValue, RuleSpec, Viewer};
//!
//! let viewer = Viewer::builder()
//!     .config(json!({ "width": 100, "height": 40 }))
//!     .helper("headline", |value: &ReplValue, _: &Options| {
//!         Ok(format!("== {} ==", value.data().as_str().unwrap_or_default()))
//!     })
//!     .rule("Article", RuleSpec::method("headline"))
//!     .build()?;
//!
//! let article = ReplValue::new("Article", json!("launch day"));
//! assert_eq!(viewer.format(&article)?.as_deref(), Some("== launch day =="));
//!
//! // No rule, no override: the value is not the pipeline's to handle.
//! let blob = ReplValue::new("Blob", json!(1));
//! assert_eq!(viewer.format(&blob)?, None);
//! # Ok::<(), vantage::ViewError>(())
//! ```
//!
//! [`Viewer::render`] runs the same resolution but sends the text to the
//! sink - by default paging it when it overflows the terminal and
//! printing it otherwise - and reports with a `bool` whether it handled
//! the value at all.
//!
//! ## Ancestor Rules
//!
//! Type ancestry is declared, not reflected: the host names each tag's
//! parents, and a rule marked [`RuleSpec::inherit`] covers every
//! descendant without its own rule. The nearest ancestor wins; ties at
//! the same depth go to the earliest declared parent.
//!
//! ```rust
//! use serde_json::json;
//! use vantage::{Options, ReplValue, RuleSpec, Viewer};
//!
//! let viewer = Viewer::builder()
//!     .config(json!({ "width": 100, "height": 40 }))
//!     .formatter("Table", |value: &ReplValue, _: &Options| {
//!         Ok(format!("[table of {}]", value.tag()))
//!     })
//!     .subtype("SortedTable", "Table")
//!     .rule("Table", RuleSpec::class("Table").inherit())
//!     .build()?;
//!
//! let sorted = ReplValue::new("SortedTable", json!([]));
//! assert_eq!(
//!     viewer.format(&sorted)?.as_deref(),
//!     Some("[table of SortedTable]"),
//! );
//! # Ok::<(), vantage::ViewError>(())
//! ```
//!
//! ## Session Integration
//!
//! A host wires its output hook to [`Session::display`], which falls
//! back from rendering, to paging the raw inspect text, to
//! "you print it" - and absorbs formatter errors so the REPL loop
//! survives anything a formatter does.
//!
//! ```rust
//! use serde_json::json;
//! use vantage::{Options, ReplValue, RuleSpec, Session, Viewer};
//!
//! let blueprint = Viewer::builder()
//!     .config(json!({ "width": 100, "height": 40, "pager": false }))
//!     .helper("plain", |value: &ReplValue, _: &Options| {
//!         Ok(value.data().to_string())
//!     })
//!     .rule("Count", RuleSpec::method("plain"));
//!
//! let mut session = Session::new(blueprint);
//! session.enable()?;
//!
//! let outcome = session.display(&ReplValue::new("Count", json!(3)));
//! assert!(outcome.is_handled());
//!
//! assert!(session.disable());
//! # Ok::<(), vantage::ViewError>(())
//! ```
//!
//! ## Shorthand Console Calls
//!
//! REPL-facing helpers can accept a loose token and option map instead
//! of typed overrides; the [`console`] module resolves the token against
//! what is registered and silently ignores tokens that match nothing.
//!
//! ```rust
//! use serde_json::json;
//! use vantage::{console, Options, ReplValue, Viewer};
//!
//! let viewer = Viewer::builder()
//!     .config(json!({ "width": 100, "height": 40 }))
//!     .formatter("AutoTable", |_: &ReplValue, _: &Options| {
//!         Ok("| a | b |".to_string())
//!     })
//!     .build()?;
//!
//! let rows = ReplValue::new("Rows", json!([["a", "b"]]));
//! let text = console::format(&viewer, &rows, Some("auto_table"), Options::new())?;
//! assert_eq!(text.as_deref(), Some("| a | b |"));
//! # Ok::<(), vantage::ViewError>(())
//! ```

pub mod config;
pub mod console;
pub mod error;
pub mod formatter;
pub mod registry;
pub mod session;
pub mod value;
pub mod viewer;

// Configuration exports
pub use config::{recursive_merge, RuleSpec, ViewConfig, DEFAULT_HEIGHT, DEFAULT_WIDTH};

// Error type
pub use error::ViewError;

// Strategy and capability exports
pub use formatter::{Formatter, HelperFn, InlineFn, Options, Strategy, TransformFn};

// Registry exports
pub use registry::{FormatterRegistry, Overrides, RenderRule, TypeGraph};

// Session exports
pub use session::{DisplayOutcome, EnableOutcome, Session};

// Value wrapper
pub use value::ReplValue;

// Dispatcher exports
pub use viewer::{SinkFn, Viewer, ViewerBuilder};

// Paging layer (re-export from vantage-pager)
pub use vantage_pager as pager;
pub use vantage_pager::{PageMode, Pager};
