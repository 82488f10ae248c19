use crate::error::UsageError;
use crate::formatters::{DefaultOutputFormat, FieldOutputFormat, OutputFormat};
use std::fmt;
use tracing::debug;

/// Builds an output format from normalized field-selection tokens
pub trait OutputFormatFactory: fmt::Debug + Send + Sync {
    fn from_arguments(&self, tokens: &[String]) -> Result<Box<dyn OutputFormat>, UsageError>;
}

/// No tokens yield the default format. Otherwise each token that parses as
/// an integer becomes a property index, anything else a property name.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultOutputFormatFactory;

impl OutputFormatFactory for DefaultOutputFormatFactory {
    fn from_arguments(&self, tokens: &[String]) -> Result<Box<dyn OutputFormat>, UsageError> {
        debug!(?tokens, "building output format");

        if tokens.is_empty() {
            return Ok(Box::new(DefaultOutputFormat::new()));
        }

        let mut format = FieldOutputFormat::new();
        for token in tokens {
            match token.trim().parse::<i64>() {
                Ok(index) => format.add_property_index(index)?,
                Err(_) => format.add_property_name(token)?,
            }
        }

        debug!(?format, "built output format");
        Ok(Box::new(format))
    }
}
