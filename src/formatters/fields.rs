use crate::error::{ProcessingError, UsageError};
use crate::event::{Event, TIMESTAMP_PROPERTY_NAME};
use crate::formatters::{
    OutputFormat, PropertyIdentifier, Rendering, TimestampFormat, DEFAULT_SEPARATOR, HEADER_MARKER,
};
use once_cell::sync::Lazy;
use regex::Regex;

static NUMERIC_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[+-]?\d+\s*$").expect("valid numeric identifier regex"));

/// Renders an explicit, ordered list of properties, selected by name or
/// position.
///
/// Column N of every rendered line corresponds to identifier N: properties an
/// event does not have leave an empty field instead of shifting the rest.
#[derive(Debug, Clone)]
pub struct FieldOutputFormat {
    identifiers: Vec<PropertyIdentifier>,
    separator: String,
    timestamp_format: TimestampFormat,
    header_enabled: bool,
}

impl Default for FieldOutputFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldOutputFormat {
    pub fn new() -> Self {
        FieldOutputFormat {
            identifiers: Vec::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            timestamp_format: TimestampFormat::default(),
            header_enabled: true,
        }
    }

    /// Convenience constructor from property names
    pub fn with_property_names(names: &[&str]) -> Result<Self, UsageError> {
        let mut format = FieldOutputFormat::new();
        for name in names {
            format.add_property_name(name)?;
        }
        Ok(format)
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Numeric-looking names are rejected: positions go through
    /// `add_property_index`.
    pub fn add_property_name(&mut self, name: &str) -> Result<(), UsageError> {
        if NUMERIC_IDENTIFIER.is_match(name) {
            return Err(UsageError::PropertyIndexAsName(name.to_string()));
        }
        self.identifiers
            .push(PropertyIdentifier::Name(name.to_string()));
        Ok(())
    }

    pub fn add_property_index(&mut self, index: i64) -> Result<(), UsageError> {
        let index = usize::try_from(index).map_err(|_| UsageError::InvalidPropertyIndex(index))?;
        self.identifiers.push(PropertyIdentifier::Index(index));
        Ok(())
    }

    pub fn set_header_enabled(&mut self, enabled: bool) {
        self.header_enabled = enabled;
    }

    pub fn is_header_enabled(&self) -> bool {
        self.header_enabled
    }

    fn resolve(&self, identifier: &PropertyIdentifier, event: &dyn Event) -> Option<String> {
        let property = match identifier {
            PropertyIdentifier::Name(name) => event.property(name),
            PropertyIdentifier::Index(index) => event.property_by_index(*index),
        };
        property.and_then(|p| p.value()).map(|v| v.to_string())
    }

    /// Splits the separator into the delimiter that marks every column and
    /// the padding written before a value. A separator made only of
    /// whitespace is all delimiter.
    fn split_separator(&self) -> (&str, &str) {
        let delimiter = self.separator.trim_end();
        if delimiter.is_empty() {
            (self.separator.as_str(), "")
        } else {
            self.separator.split_at(delimiter.len())
        }
    }

    fn column_label(&self, identifier: &PropertyIdentifier, event: &dyn Event) -> String {
        match identifier {
            PropertyIdentifier::Name(name) => name.clone(),
            PropertyIdentifier::Index(index) => event
                .property_by_index(*index)
                .map(|p| p.name().to_string())
                .unwrap_or_default(),
        }
    }
}

impl OutputFormat for FieldOutputFormat {
    fn name(&self) -> &'static str {
        "fields"
    }

    fn format_header(&self, event: &dyn Event) -> Result<Option<String>, ProcessingError> {
        if !self.header_enabled {
            return Ok(None);
        }

        let mut columns = Vec::with_capacity(self.identifiers.len() + 1);
        if event.is_timed() {
            columns.push(TIMESTAMP_PROPERTY_NAME.to_string());
        }
        for identifier in &self.identifiers {
            columns.push(self.column_label(identifier, event));
        }

        Ok(Some(format!(
            "{}{}",
            HEADER_MARKER,
            columns.join(&self.separator)
        )))
    }

    fn format(&self, event: &dyn Event) -> Result<Rendering, ProcessingError> {
        let (delimiter, padding) = self.split_separator();
        let mut line: Option<String> = None;

        for (i, identifier) in self.identifiers.iter().enumerate() {
            let value = self.resolve(identifier, event);
            if let Some(l) = line.as_mut() {
                l.push_str(delimiter);
                if let Some(v) = value {
                    l.push_str(padding);
                    l.push_str(&v);
                }
            } else if let Some(v) = value {
                // Empty leading columns each take a full separator
                line = Some(format!("{}{}", self.separator.repeat(i), v));
            }
        }

        let Some(mut line) = line else {
            return Ok(Rendering::NoMatch);
        };

        if let Some(timestamp) = event.timestamp().filter(|_| event.is_timed()) {
            line = format!(
                "{}{}{}",
                self.timestamp_format.format(timestamp),
                self.separator,
                line
            );
        }

        Ok(Rendering::Matched(line))
    }

    fn separator(&self) -> &str {
        &self.separator
    }

    fn timestamp_format(&self) -> &TimestampFormat {
        &self.timestamp_format
    }

    fn set_timestamp_format(&mut self, format: TimestampFormat) {
        self.timestamp_format = format;
    }

    fn property_identifiers(&self) -> &[PropertyIdentifier] {
        &self.identifiers
    }
}
