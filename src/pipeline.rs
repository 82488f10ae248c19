// Line-driven event pipeline feeding one procedure

pub mod config;
pub mod context;
pub mod stream;

pub use config::{ErrorStrategy, PipelineConfig};
pub use context::{ParseErrorInfo, ProcessingStats};
pub use stream::EventPipeline;
