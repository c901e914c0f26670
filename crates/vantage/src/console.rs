//! Shorthand console invocations.
//!
//! REPL users type `view(value, "table", ...)` rather than building an
//! [`Overrides`] by hand. This module turns that shorthand into the
//! canonical form: a name token plus a loose option map become the
//! overrides [`Viewer::render_with`] expects.
//!
//! A token resolves against what is actually registered: a token naming a
//! helper becomes a `method` override; otherwise its capitalized form
//! naming a formatter becomes a `class` override; otherwise the token is
//! dropped and resolution falls through to the configured rules. An
//! unresolvable token is not an error.
//!
//! The keys `method`, `class`, and `output_method` are strategy metadata,
//! not renderer options, so they are lifted out of the option map into
//! the override fields before dispatch. Explicit keys beat the token.

use serde_json::Value;

use crate::error::ViewError;
use crate::formatter::Options;
use crate::registry::Overrides;
use crate::value::ReplValue;
use crate::viewer::Viewer;

/// Render `value` through `viewer` from shorthand form.
pub fn render(
    viewer: &Viewer,
    value: &ReplValue,
    token: Option<&str>,
    options: Options,
) -> Result<bool, ViewError> {
    let overrides = expand(viewer, token, options);
    viewer.render_with(value, &overrides)
}

/// Format `value` from shorthand form without touching the sink.
pub fn format(
    viewer: &Viewer,
    value: &ReplValue,
    token: Option<&str>,
    options: Options,
) -> Result<Option<String>, ViewError> {
    let overrides = expand(viewer, token, options);
    viewer.format_with(value, &overrides)
}

/// Expand a shorthand `(token, options)` pair into [`Overrides`].
///
/// Strategy keys in `options` are lifted into the override fields first;
/// the token is consulted only when no explicit strategy key named one.
pub fn expand(viewer: &Viewer, token: Option<&str>, mut options: Options) -> Overrides {
    let mut overrides = Overrides::new();
    overrides.method = take_string(&mut options, "method");
    overrides.class = take_string(&mut options, "class");
    overrides.output_method = take_string(&mut options, "output_method");

    if overrides.method.is_none() && overrides.class.is_none() {
        if let Some(token) = token {
            if viewer.registry().has_helper(token) {
                overrides.method = Some(token.to_string());
            } else {
                let candidate = capitalize(token);
                if viewer.registry().has_formatter(&candidate) {
                    overrides.class = Some(candidate);
                }
            }
        }
    }

    overrides.options = options;
    overrides
}

/// Turn a console token into a formatter identifier: `auto_table`
/// becomes `AutoTable`.
pub fn capitalize(token: &str) -> String {
    token
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn take_string(options: &mut Options, key: &str) -> Option<String> {
    match options.remove(key) {
        Some(Value::String(name)) => Some(name),
        Some(other) => {
            options.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}
