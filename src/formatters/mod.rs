use crate::error::{ProcessingError, UsageError};
use crate::event::Event;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use std::fmt;

pub mod default;
pub mod factory;
pub mod fields;
pub mod header;

pub use default::DefaultOutputFormat;
pub use factory::{DefaultOutputFormatFactory, OutputFormatFactory};
pub use fields::FieldOutputFormat;
pub use header::{DefaultHeaderOutputStrategy, HeaderOutputStrategy, NoHeaderOutputStrategy};

/// Prefix of every header line, so header lines can be told apart from data
/// lines by downstream tools
pub const HEADER_MARKER: &str = "# ";

pub const DEFAULT_SEPARATOR: &str = ", ";

/// Outcome of rendering one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendering {
    /// The event matches the format; the text may be empty
    Matched(String),
    /// The event does not match the format and should produce no output
    NoMatch,
}

impl Rendering {
    pub fn is_match(&self) -> bool {
        matches!(self, Rendering::Matched(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Rendering::Matched(s) => Some(s),
            Rendering::NoMatch => None,
        }
    }
}

/// A property selected for rendering, by name or by 0-based position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyIdentifier {
    Name(String),
    Index(usize),
}

impl fmt::Display for PropertyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyIdentifier::Name(name) => f.write_str(name),
            PropertyIdentifier::Index(index) => write!(f, "{}", index),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeZoneMode {
    Utc,
    Local,
}

/// strftime-style pattern used to render epoch-millisecond timestamps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormat {
    pattern: String,
    zone: TimeZoneMode,
}

impl TimestampFormat {
    pub const DEFAULT_PATTERN: &'static str = "%m/%d/%y %H:%M:%S";

    pub fn new(pattern: impl Into<String>) -> Result<Self, UsageError> {
        let pattern = pattern.into();
        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(UsageError::InvalidTimestampFormat(pattern));
        }
        Ok(TimestampFormat {
            pattern,
            zone: TimeZoneMode::Utc,
        })
    }

    pub fn with_zone(mut self, zone: TimeZoneMode) -> Self {
        self.zone = zone;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn zone(&self) -> TimeZoneMode {
        self.zone
    }

    /// Out-of-range timestamps render as the raw millisecond value.
    pub fn format(&self, millis: i64) -> String {
        let Some(utc) = DateTime::<Utc>::from_timestamp_millis(millis) else {
            return millis.to_string();
        };
        match self.zone {
            TimeZoneMode::Utc => utc.format(&self.pattern).to_string(),
            TimeZoneMode::Local => utc.with_timezone(&Local).format(&self.pattern).to_string(),
        }
    }
}

impl Default for TimestampFormat {
    fn default() -> Self {
        TimestampFormat {
            pattern: Self::DEFAULT_PATTERN.to_string(),
            zone: TimeZoneMode::Utc,
        }
    }
}

/// Turns events into output lines, and optionally into a header line that
/// describes the columns.
pub trait OutputFormat: fmt::Debug + Send {
    /// Short name, for diagnostics
    fn name(&self) -> &'static str;

    /// A header line for events shaped like `event`, or `None` when no
    /// header applies
    fn format_header(&self, event: &dyn Event) -> Result<Option<String>, ProcessingError>;

    /// The rendered line, without line terminator
    fn format(&self, event: &dyn Event) -> Result<Rendering, ProcessingError>;

    fn separator(&self) -> &str;

    fn timestamp_format(&self) -> &TimestampFormat;

    fn set_timestamp_format(&mut self, format: TimestampFormat);

    /// Configured field selection; empty for formats that do not select
    fn property_identifiers(&self) -> &[PropertyIdentifier] {
        &[]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timestamp_format() {
        let f = TimestampFormat::default();
        assert_eq!(f.format(0), "01/01/70 00:00:00");
        assert_eq!(f.format(1_500_000_000_000), "07/14/17 02:40:00");
    }

    #[test]
    fn test_custom_pattern() {
        let f = TimestampFormat::new("%-S").unwrap();
        assert_eq!(f.format(1000), "1");
        assert_eq!(f.format(3000), "3");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = TimestampFormat::new("%Q").unwrap_err();
        assert!(err.to_string().contains("%Q"));
    }

    #[test]
    fn test_rendering_accessors() {
        assert!(Rendering::Matched(String::new()).is_match());
        assert_eq!(Rendering::Matched("x".to_string()).text(), Some("x"));
        assert!(!Rendering::NoMatch.is_match());
        assert_eq!(Rendering::NoMatch.text(), None);
    }
}
