/// Result alias that carries the custom [`LedlineError`] type.
pub type Result<T> = std::result::Result<T, LedlineError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum LedlineError {
    /// System defaults could not be resolved or describe an unusable strip.
    #[error("configuration error: {0}")]
    Config(String),
    /// The pixel sink could not be constructed or refused a write.
    #[error("pixel sink error: {0}")]
    Sink(String),
    /// A step payload does not match the kind it declares.
    #[error("cannot decode step: {0}")]
    Decode(String),
    /// Outbound trigger request failed at the transport level.
    #[error("trigger request failed: {0}")]
    Trigger(#[from] reqwest::Error),
    #[error("invalid trigger verb {0:?}")]
    InvalidMethod(String),
    #[error("invalid trigger header {0:?}")]
    InvalidHeader(String),
    /// The scheduler control loop has exited and no longer accepts requests.
    #[error("scheduler is not running")]
    SchedulerClosed,
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Free-form message for errors without a dedicated variant.
    #[error("{0}")]
    Message(String),
}

impl LedlineError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::Config(msg.into())
    }

    pub fn sink<T: Into<String>>(msg: T) -> Self {
        Self::Sink(msg.into())
    }

    pub fn decode<T: Into<String>>(msg: T) -> Self {
        Self::Decode(msg.into())
    }
}
