//! Error types for the rendering pipeline.

use thiserror::Error;

/// Errors surfaced by the rendering pipeline.
///
/// A value with no applicable rule is not an error: dispatch reports that
/// as `Ok(false)` / `Ok(None)` so the host can fall back to its default
/// printing. Errors are reserved for malformed requests and failing
/// strategies, and they surface at resolution time with the offending
/// name.
#[derive(Debug, Error)]
pub enum ViewError {
    /// A rule or override named both a helper (`method`) and a formatter
    /// (`class`). The field is the type tag the conflict was found on.
    #[error("rule for `{0}` specifies both a method and a class strategy")]
    ConflictingStrategies(String),

    /// A rule or override named a helper that was never registered.
    #[error("unknown helper `{0}`")]
    UnknownHelper(String),

    /// A rule or override named a formatter that was never registered.
    #[error("unknown formatter `{0}`")]
    UnknownFormatter(String),

    /// An override named an output transform that was never registered.
    #[error("unknown transform `{0}`")]
    UnknownTransform(String),

    /// The configuration overrides could not be interpreted.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A formatting strategy ran and failed.
    #[error("formatter `{strategy}` failed: {source}")]
    Format {
        /// The helper or formatter name, or `inline`.
        strategy: String,
        #[source]
        source: anyhow::Error,
    },

    /// A value payload or config snapshot could not be serialized.
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ViewError {
    /// Wrap a strategy failure with the name of the strategy that failed.
    pub fn format(strategy: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Format {
            strategy: strategy.into(),
            source,
        }
    }
}
