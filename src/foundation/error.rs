/// Convenience result type used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Only configuration problems, malformed documents and renderer failures surface as
/// errors. Action and stage-callback failures, missing settings and malformed stages are
/// logged and processing continues. [`EngineError::Abort`] returned by an action, a
/// condition or a stage callback is not a failure: it aborts the stage list.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// Missing or under-versioned dependency, conflicting registration, bad pipeline definition.
    #[error("configuration error: {0}")]
    Config(String),

    /// A renderer failed; re-raised to the caller of stage processing.
    #[error("render error in '{renderer}': {source}")]
    Render {
        /// Name the renderer was registered under.
        renderer: String,
        /// Error returned by the renderer callback.
        #[source]
        source: anyhow::Error,
    },

    /// Settings data that an API could not work with.
    #[error("settings error: {0}")]
    Settings(String),

    /// Returned by an action, condition or stage callback to abort the current stage list.
    #[error("stage list aborted")]
    Abort,

    /// A stage description that could not be interpreted.
    #[error("stage error: {0}")]
    Stage(String),

    /// Errors when serializing or deserializing documents and settings.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    /// Build a [`EngineError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`EngineError::Render`] value.
    pub fn render(renderer: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Render {
            renderer: renderer.into(),
            source,
        }
    }

    /// Build a [`EngineError::Settings`] value.
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Build a [`EngineError::Stage`] value.
    pub fn stage(msg: impl Into<String>) -> Self {
        Self::Stage(msg.into())
    }

    /// Build a [`EngineError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// An [`EngineError::Abort`] as the `anyhow::Error` callbacks return.
    pub fn abort() -> anyhow::Error {
        anyhow::Error::new(Self::Abort)
    }

    /// True for errors that must abort the operation that raised them.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// True for malformed settings data.
    pub fn is_settings(&self) -> bool {
        matches!(self, Self::Settings(_))
    }

    /// True when a callback error is the abort signal.
    pub fn is_abort_signal(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<Self>(), Some(Self::Abort))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
