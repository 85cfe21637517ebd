use thiserror::Error;

/// Result type for mail pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while building or running a pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An operation was invoked on a stage that does not support it
    /// (`drive` on anything but a source, `process` on a source)
    #[error("{stage} stage does not support {operation}")]
    Unsupported {
        stage: &'static str,
        operation: &'static str,
    },

    /// Reading the input feed or writing an output feed failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline definition text could not be parsed
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Pipeline definition is structurally invalid
    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),
}

impl PipelineError {
    pub(crate) fn unsupported(stage: &'static str, operation: &'static str) -> Self {
        PipelineError::Unsupported { stage, operation }
    }
}
