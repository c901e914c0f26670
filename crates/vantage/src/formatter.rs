//! Formatting strategy contracts.
//!
//! Three strategies can format a value, collected in one closed enum:
//!
//! - [`Strategy::Inline`]: a per-call closure passed alongside a single
//!   render call
//! - [`Strategy::Helper`]: a named formatting function registered globally
//! - [`Strategy::Formatter`]: a formatter object registered under a
//!   capability identifier
//!
//! All three share one shape: value and options in, text out. Errors cross
//! the boundary as `anyhow::Error`, so strategy code is free to use its
//! own error types.
//!
//! # Single-Threaded Design
//!
//! The pipeline lives inside a REPL loop, which is single-threaded, so the
//! function tables hold `Rc` and don't require `Send + Sync` bounds.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::error::ViewError;
use crate::value::ReplValue;

/// Option map attached to rules and per-call overrides.
pub type Options = serde_json::Map<String, Value>;

/// A named global formatting function.
pub type HelperFn = Rc<dyn Fn(&ReplValue, &Options) -> Result<String, anyhow::Error>>;

/// A per-call formatting closure. Optionality lives at the call site:
/// entry points without a block simply never reach the inline tier.
pub type InlineFn = Rc<dyn Fn(&ReplValue, &Options) -> Result<String, anyhow::Error>>;

/// A named value transform, applied before a strategy formats.
pub type TransformFn = Rc<dyn Fn(&ReplValue) -> Result<ReplValue, anyhow::Error>>;

/// A formatter capability object.
///
/// Implementing this trait is what makes a type usable under a `class`
/// rule, so a registered identifier can never lack the render capability;
/// the failure mode that remains is an unknown identifier, which fails
/// fast at resolution time.
///
/// A blanket implementation covers plain closures:
///
/// ```rust
/// use vantage::{Formatter, Options, ReplValue};
///
/// let upper = |value: &ReplValue, _opts: &Options| -> Result<String, anyhow::Error> {
///     Ok(value.data().as_str().unwrap_or_default().to_uppercase())
/// };
///
/// let value = ReplValue::new("Text", serde_json::json!("quiet"));
/// assert_eq!(upper.render(&value, &Options::new()).unwrap(), "QUIET");
/// ```
pub trait Formatter {
    /// Format the value into display text.
    fn render(&self, value: &ReplValue, options: &Options) -> Result<String, anyhow::Error>;
}

/// Blanket implementation so plain closures register as formatters.
impl<F> Formatter for F
where
    F: Fn(&ReplValue, &Options) -> Result<String, anyhow::Error>,
{
    fn render(&self, value: &ReplValue, options: &Options) -> Result<String, anyhow::Error> {
        (self)(value, options)
    }
}

/// The formatting strategy of a resolved rule.
#[derive(Clone)]
pub enum Strategy {
    /// A per-call closure. Never stored in the registry; it exists only
    /// for the duration of the call that supplied it.
    Inline(InlineFn),
    /// A named global function from the helper table.
    Helper {
        /// The registered helper name.
        name: String,
        func: HelperFn,
    },
    /// A formatter object from the formatter table.
    Formatter {
        /// The registered capability identifier.
        name: String,
        formatter: Rc<dyn Formatter>,
    },
}

impl Strategy {
    /// Name used in error reports.
    pub fn label(&self) -> &str {
        match self {
            Strategy::Inline(_) => "inline",
            Strategy::Helper { name, .. } => name,
            Strategy::Formatter { name, .. } => name,
        }
    }

    /// Returns true for the inline variant.
    pub fn is_inline(&self) -> bool {
        matches!(self, Strategy::Inline(_))
    }

    /// Run the strategy against a value.
    pub fn apply(&self, value: &ReplValue, options: &Options) -> Result<String, ViewError> {
        let rendered = match self {
            Strategy::Inline(block) => block(value, options),
            Strategy::Helper { func, .. } => func(value, options),
            Strategy::Formatter { formatter, .. } => formatter.render(value, options),
        };
        rendered.map_err(|e| ViewError::format(self.label(), e))
    }
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Inline(_) => f.write_str("Strategy::Inline"),
            Strategy::Helper { name, .. } => write!(f, "Strategy::Helper({})", name),
            Strategy::Formatter { name, .. } => write!(f, "Strategy::Formatter({})", name),
        }
    }
}
