use crate::error::ProcessingError;
use crate::event::{Event, TIMESTAMP_PROPERTY_NAME};
use crate::formatters::{OutputFormat, Rendering, TimestampFormat, HEADER_MARKER};

/// Zero-configuration fallback format.
///
/// Uses, in order: the event's preferred representation (with the event's
/// preferred header, if any), its raw representation (no header), or its type
/// name preceded by the timestamp when the event has one. Every event matches.
#[derive(Debug, Clone, Default)]
pub struct DefaultOutputFormat {
    timestamp_format: TimestampFormat,
}

impl DefaultOutputFormat {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputFormat for DefaultOutputFormat {
    fn name(&self) -> &'static str {
        "default"
    }

    fn format_header(&self, event: &dyn Event) -> Result<Option<String>, ProcessingError> {
        if event.preferred_representation().is_some() {
            return Ok(event.preferred_representation_header().map(str::to_string));
        }
        if event.raw_representation().is_some() {
            return Ok(None);
        }
        let header = if event.is_timed() {
            format!("{}{} type", HEADER_MARKER, TIMESTAMP_PROPERTY_NAME)
        } else {
            format!("{}type", HEADER_MARKER)
        };
        Ok(Some(header))
    }

    fn format(&self, event: &dyn Event) -> Result<Rendering, ProcessingError> {
        if let Some(preferred) = event.preferred_representation() {
            return Ok(Rendering::Matched(preferred.to_string()));
        }
        if let Some(raw) = event.raw_representation() {
            return Ok(Rendering::Matched(raw.to_string()));
        }
        let line = match event.timestamp() {
            Some(t) => format!("{} {}", self.timestamp_format.format(t), event.type_name()),
            None => event.type_name().to_string(),
        };
        Ok(Rendering::Matched(line))
    }

    fn separator(&self) -> &str {
        " "
    }

    fn timestamp_format(&self) -> &TimestampFormat {
        &self.timestamp_format
    }

    fn set_timestamp_format(&mut self, format: TimestampFormat) {
        self.timestamp_format = format;
    }
}
