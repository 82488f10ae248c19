//! Stock procedures

pub mod count;
pub mod describe;
pub mod exclude;
pub mod help;
pub mod output;
pub mod time_gaps;

pub use count::Count;
pub use describe::{signature, Describe, SignatureStyle};
pub use exclude::Exclude;
pub use help::{Help, ProcedureSummary};
pub use output::{clean_commas, parse_field_selection, FieldSelection, Output, OUTPUT_FORMAT_OPTION};
pub use time_gaps::TimeGaps;
