/// Result alias that carries the custom [`ImagicError`] type.
pub type Result<T> = std::result::Result<T, ImagicError>;

/// Structural problems found while loading a stage graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationKind {
    #[error("duplicate stage id")]
    DuplicateStageId,
    #[error("duplicate trigger id")]
    DuplicateTriggerId,
    #[error("trigger targets an unknown stage")]
    DanglingTarget,
    #[error("blow threshold must be a finite dBFS value <= 0")]
    InvalidBlowThreshold,
}

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum ImagicError {
    /// A graph was rejected before activation.
    #[error("invalid stage graph: {kind} (`{offending_id}`)")]
    Validation {
        kind: ValidationKind,
        offending_id: String,
    },
    /// A stage's media could not be produced. The previous frame stays visible.
    #[error("failed to load media `{locator}`: {reason}")]
    MediaLoad { locator: String, reason: String },
    /// Persistence of the trick config is unavailable.
    #[error("config persistence failed: {0}")]
    ConfigIo(String),
    /// The engine's control queue has no consumer anymore.
    #[error("engine event queue has been closed")]
    Disconnected,
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),
}

impl ImagicError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn validation(kind: ValidationKind, offending_id: impl Into<String>) -> Self {
        Self::Validation {
            kind,
            offending_id: offending_id.into(),
        }
    }

    pub(crate) fn media(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MediaLoad {
            locator: locator.into(),
            reason: reason.into(),
        }
    }
}

impl From<&str> for ImagicError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ImagicError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
