/// Caller or programmer mistakes. These are never retried: the call that
/// raised one must not be repeated with the same input.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("{procedure}: event beyond end-of-stream")]
    EventBeyondEndOfStream { procedure: String },

    #[error("{component} was not initialized: {missing}")]
    NotInitialized {
        component: String,
        missing: &'static str,
    },

    #[error("invalid property index: {0}")]
    InvalidPropertyIndex(i64),

    #[error(
        "invalid attempt to add a property index as property name: \"{0}\", consider using add_property_index()"
    )]
    PropertyIndexAsName(String),

    #[error("invalid timestamp format \"{0}\"")]
    InvalidTimestampFormat(String),

    #[error("empty query expression")]
    EmptyQuery,
}

/// Failures tied to one specific event. The procedure that raised one is
/// still usable for the next event.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Format error: {0}")]
    FormatError(String),

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: u64, message: String },

    #[error("Line too long: {length} > {max_length}")]
    LineTooLong { length: usize, max_length: usize },
}

/// The single error type returned by procedures.
#[derive(Debug, thiserror::Error)]
pub enum ProcedureError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("event processing failed: {0}")]
    Processing(#[from] ProcessingError),
}

impl ProcedureError {
    /// Fatal errors terminate the call; processing errors leave the
    /// procedure able to accept further events.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProcedureError::Usage(_))
    }
}

impl From<std::io::Error> for ProcedureError {
    fn from(err: std::io::Error) -> Self {
        ProcedureError::Processing(ProcessingError::IoError(err))
    }
}
