use crate::input_format::InputFormat;

/// Configuration for pipeline behavior
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub error_strategy: ErrorStrategy,
    pub buffer_size: usize,
    pub max_line_length: usize,
    pub input_format: InputFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            error_strategy: ErrorStrategy::Skip,
            buffer_size: 65536,       // 64KB
            max_line_length: 1048576, // 1MB
            input_format: InputFormat::default(),
        }
    }
}

/// What to do with a recoverable failure. Fatal errors always stop the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorStrategy {
    /// Count the failure, log it and continue with the next line
    #[default]
    Skip,
    /// Stop processing on first error
    FailFast,
}
