// src/input_format.rs - turning input lines into events

use crate::error::ProcessingError;
use crate::event::{
    Event, GenericEvent, Property, PropertyType, PropertyValue, TimedEvent, TIMESTAMP_PROPERTY_NAME,
};
use serde_json::Value;

/// Keys checked, in order, for an event timestamp in structured input
pub const TIMESTAMP_KEYS: &[&str] = &["timestamp", "ts", "time"];

/// Property holding the text of a plain input line
pub const LINE_PROPERTY_NAME: &str = "line";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    #[value(name = "jsonl")]
    Jsonl,
    #[value(name = "csv")]
    Csv,
    #[default]
    #[value(name = "line")]
    Line,
}

impl InputFormat {
    pub fn parser(self) -> Box<dyn EventParser> {
        match self {
            InputFormat::Jsonl => Box::new(JsonlParser::new()),
            InputFormat::Csv => Box::new(CsvParser::new()),
            InputFormat::Line => Box::new(LineParser::new()),
        }
    }
}

pub trait EventParser {
    fn format_name(&self) -> &'static str;

    /// `Ok(None)` for lines that carry no event, such as blank lines or a CSV
    /// header row.
    fn parse_line(
        &mut self,
        line: &str,
        line_number: u64,
    ) -> Result<Option<Box<dyn Event>>, ProcessingError>;
}

fn parse_error(line: u64, message: impl Into<String>) -> ProcessingError {
    ProcessingError::ParseError {
        line,
        message: message.into(),
    }
}

/// Every line, blank or not, becomes an event
#[derive(Debug, Default)]
pub struct LineParser;

impl LineParser {
    pub fn new() -> Self {
        Self
    }
}

impl EventParser for LineParser {
    fn format_name(&self) -> &'static str {
        "line"
    }

    fn parse_line(
        &mut self,
        line: &str,
        line_number: u64,
    ) -> Result<Option<Box<dyn Event>>, ProcessingError> {
        let mut event =
            GenericEvent::with_properties(vec![Property::string(LINE_PROPERTY_NAME, line)]);
        event.set_raw_representation(line);
        event.set_line_number(line_number);
        Ok(Some(Box::new(event)))
    }
}

fn property_value(value: &Value) -> Option<PropertyValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(PropertyValue::Boolean(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(PropertyValue::Long)
            .or_else(|| n.as_f64().map(PropertyValue::Double)),
        Value::String(s) => Some(PropertyValue::String(s.clone())),
        // nulls inside containers are dropped
        Value::Array(items) => Some(PropertyValue::List(
            items.iter().filter_map(property_value).collect(),
        )),
        Value::Object(map) => Some(PropertyValue::Map(
            map.iter()
                .filter_map(|(k, v)| property_value(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
    }
}

fn timestamp_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => dateparser::parse(s).ok().map(|dt| dt.timestamp_millis()),
        _ => None,
    }
}

/// Builds a timed event when one of `TIMESTAMP_KEYS` yields a timestamp,
/// a generic one otherwise. The timestamp key itself is not kept as an
/// ordinary property.
fn structured_event<'a>(
    fields: impl Iterator<Item = (&'a str, Property)>,
    timestamp: Option<(&'a str, i64)>,
    line: &str,
    line_number: u64,
) -> Box<dyn Event> {
    match timestamp {
        Some((key, millis)) => {
            let properties = fields
                .filter(|(name, _)| *name != key && *name != TIMESTAMP_PROPERTY_NAME)
                .map(|(_, p)| p)
                .collect();
            let mut event = TimedEvent::with_properties(Some(millis), properties);
            event.set_raw_representation(line);
            event.set_line_number(line_number);
            Box::new(event)
        }
        None => {
            let mut event = GenericEvent::with_properties(fields.map(|(_, p)| p).collect());
            event.set_raw_representation(line);
            event.set_line_number(line_number);
            Box::new(event)
        }
    }
}

/// One JSON object per line; properties keep document order
#[derive(Debug, Default)]
pub struct JsonlParser;

impl JsonlParser {
    pub fn new() -> Self {
        Self
    }
}

impl EventParser for JsonlParser {
    fn format_name(&self) -> &'static str {
        "JSON"
    }

    fn parse_line(
        &mut self,
        line: &str,
        line_number: u64,
    ) -> Result<Option<Box<dyn Event>>, ProcessingError> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        let value: Value = serde_json::from_str(line.trim())
            .map_err(|e| parse_error(line_number, format!("Failed to parse JSONL: {}", e)))?;
        let Value::Object(object) = value else {
            return Err(parse_error(line_number, "expected a JSON object"));
        };

        let timestamp = TIMESTAMP_KEYS.iter().find_map(|key| {
            object
                .get(*key)
                .and_then(timestamp_millis)
                .map(|millis| (*key, millis))
        });
        let fields = object.iter().map(|(k, v)| {
            let property = match property_value(v) {
                Some(value) => Property::new(k.as_str(), value),
                None => Property::absent(k.as_str(), PropertyType::String),
            };
            (k.as_str(), property)
        });

        Ok(Some(structured_event(fields, timestamp, line, line_number)))
    }
}

/// The first non-blank line is the header row; every later row becomes an
/// event keyed by it, with string values.
#[derive(Debug, Default)]
pub struct CsvParser {
    headers: Option<Vec<String>>,
}

impl CsvParser {
    pub fn new() -> Self {
        Self { headers: None }
    }

    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    fn parse_fields(line: &str, line_number: u64) -> Result<Vec<String>, ProcessingError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(line.as_bytes());
        match reader.records().next() {
            Some(Ok(record)) => Ok(record.iter().map(str::to_string).collect()),
            Some(Err(e)) => Err(parse_error(line_number, format!("Failed to parse CSV: {}", e))),
            None => Ok(Vec::new()),
        }
    }
}

impl EventParser for CsvParser {
    fn format_name(&self) -> &'static str {
        "CSV"
    }

    fn parse_line(
        &mut self,
        line: &str,
        line_number: u64,
    ) -> Result<Option<Box<dyn Event>>, ProcessingError> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        let values = Self::parse_fields(line, line_number)?;
        let Some(headers) = &self.headers else {
            if values.iter().all(|h| h.is_empty()) {
                return Err(parse_error(line_number, "CSV headers cannot be empty"));
            }
            self.headers = Some(values);
            return Ok(None);
        };

        if values.len() != headers.len() {
            return Err(parse_error(
                line_number,
                format!(
                    "CSV line has {} fields but expected {} headers",
                    values.len(),
                    headers.len()
                ),
            ));
        }

        let timestamp = TIMESTAMP_KEYS.iter().find_map(|key| {
            let index = headers.iter().position(|h| h == key)?;
            dateparser::parse(&values[index])
                .ok()
                .map(|dt| (*key, dt.timestamp_millis()))
        });
        let fields = headers
            .iter()
            .zip(values.iter())
            .map(|(h, v)| (h.as_str(), Property::string(h.as_str(), v.as_str())));

        Ok(Some(structured_event(fields, timestamp, line, line_number)))
    }
}
