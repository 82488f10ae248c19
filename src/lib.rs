// src/lib.rs
pub mod error;
pub mod event;
pub mod factory;
pub mod formatters;
pub mod input_format;
pub mod logging;
pub mod pipeline;
pub mod procedure;
pub mod procedures;
pub mod query;
pub mod text_output;

pub use error::*;

pub use event::{
    EndOfStreamEvent, Event, GenericEvent, Property, PropertyType, PropertyValue, TimedEvent,
};
pub use factory::{
    ApplicationSpecificBehavior, DefaultProcedureFactory, ProcedureFactory, Registration, Resolved,
};
pub use formatters::{OutputFormat, OutputFormatFactory, Rendering};
pub use input_format::InputFormat;
pub use pipeline::{ErrorStrategy, EventPipeline, PipelineConfig, ProcessingStats};
pub use procedure::{InvocationCounter, Lifecycle, Procedure, ProcedureExt};
pub use procedures::{Count, Describe, Exclude, Help, Output, TimeGaps};
pub use query::{parse_query, Query};
pub use text_output::{MemorySink, Sink, TextOutput, TextOutputProcedure};
