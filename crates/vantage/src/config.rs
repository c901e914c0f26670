//! Effective configuration for a view session.
//!
//! Configuration flows in as loose JSON overrides, merges over the
//! built-in defaults with [`recursive_merge`], and materializes into a
//! typed [`ViewConfig`]. The rule table under `output` stays in spec form
//! here; the registry resolves specs into live rules.
//!
//! Dimensions are special: the defaults carry none, so any dimension the
//! overrides leave out resolves against terminal detection, and a failed
//! detection falls back to [`DEFAULT_WIDTH`] x [`DEFAULT_HEIGHT`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ViewError;
use crate::formatter::Options;

/// Terminal width used when detection fails.
pub const DEFAULT_WIDTH: usize = 150;
/// Terminal height used when detection fails.
pub const DEFAULT_HEIGHT: usize = 50;

/// Serde-facing form of a rendering rule.
///
/// At most one of `method` (a helper name) or `class` (a formatter
/// identifier) names the strategy; naming both fails fast at load time. A
/// spec with neither is options-only: it contributes options when an
/// override or an inherited rule supplies the strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Helper function name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Formatter identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    /// Options handed to the strategy on every use of this rule.
    #[serde(default, skip_serializing_if = "Options::is_empty")]
    pub options: Options,
    /// Whether subtypes inherit this rule.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ancestor: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl RuleSpec {
    /// Rule spec naming a helper function.
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            method: Some(name.into()),
            ..Default::default()
        }
    }

    /// Rule spec naming a formatter identifier.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            class: Some(name.into()),
            ..Default::default()
        }
    }

    /// Add an option entry.
    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }

    /// Mark the rule as inherited by subtypes.
    pub fn inherit(mut self) -> Self {
        self.ancestor = true;
        self
    }
}

/// Serde intermediate: every key optional, so the merge result can be
/// read back regardless of which keys the overrides carried.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    width: Option<usize>,
    height: Option<usize>,
    pager: Option<bool>,
    pager_command: Option<String>,
    output: BTreeMap<String, RuleSpec>,
}

/// Typed effective configuration for one view session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewConfig {
    /// Terminal width in columns.
    pub width: usize,
    /// Terminal height in rows.
    pub height: usize,
    /// Whether oversized output goes to the pager.
    pub pager: bool,
    /// Explicit pager command; `None` means detect (`$PAGER`, `less`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pager_command: Option<String>,
    /// Rule specs keyed by type tag.
    pub output: BTreeMap<String, RuleSpec>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            pager: true,
            pager_command: None,
            output: BTreeMap::new(),
        }
    }
}

impl ViewConfig {
    /// Built-in defaults the overrides merge over.
    ///
    /// Dimensions are deliberately absent; they resolve through detection
    /// in [`load`](Self::load).
    pub fn defaults() -> Value {
        serde_json::json!({
            "pager": true,
            "output": {},
        })
    }

    /// Merge `overrides` over the defaults and materialize.
    ///
    /// `detected` is the terminal detection result; dimensions the
    /// overrides leave out come from it, and from the fixed defaults when
    /// it is `None`. Unknown keys in the overrides are ignored.
    pub fn load(overrides: Value, detected: Option<(usize, usize)>) -> Result<Self, ViewError> {
        let merged = recursive_merge(Self::defaults(), overrides);
        let raw: RawConfig = serde_json::from_value(merged)
            .map_err(|e| ViewError::InvalidConfig(e.to_string()))?;

        for (tag, spec) in &raw.output {
            if spec.method.is_some() && spec.class.is_some() {
                return Err(ViewError::ConflictingStrategies(tag.clone()));
            }
        }

        let (width, height) = resolve_dimensions(raw.width, raw.height, detected);
        Ok(Self {
            width,
            height,
            pager: raw.pager.unwrap_or(true),
            pager_command: raw.pager_command,
            output: raw.output,
        })
    }

    /// The effective config as loose JSON, usable as overrides again.
    pub fn to_value(&self) -> Result<Value, ViewError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Merge `overrides` over `defaults`, recursing into objects.
///
/// Wherever both sides hold an object the merge recurses; any other
/// override value replaces the default wholesale. Merging the same
/// overrides twice yields the same result.
pub fn recursive_merge(defaults: Value, overrides: Value) -> Value {
    match (defaults, overrides) {
        (Value::Object(mut base), Value::Object(over)) => {
            for (key, value) in over {
                let merged = match base.remove(&key) {
                    Some(existing) => recursive_merge(existing, value),
                    None => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overrides) => overrides,
    }
}

/// [`recursive_merge`] over bare option maps.
pub(crate) fn merge_options(base: &Options, over: &Options) -> Options {
    let mut merged = base.clone();
    for (key, value) in over {
        let entry = match merged.remove(key) {
            Some(existing) => recursive_merge(existing, value.clone()),
            None => value.clone(),
        };
        merged.insert(key.clone(), entry);
    }
    merged
}

/// Resolve requested dimensions against a detection result.
///
/// A requested dimension always wins. Missing dimensions come from
/// detection, and when detection failed, from the fixed defaults.
pub fn resolve_dimensions(
    width: Option<usize>,
    height: Option<usize>,
    detected: Option<(usize, usize)>,
) -> (usize, usize) {
    let (detected_width, detected_height) = detected.unzip();
    (
        width.or(detected_width).unwrap_or(DEFAULT_WIDTH),
        height.or(detected_height).unwrap_or(DEFAULT_HEIGHT),
    )
}
