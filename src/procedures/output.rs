use crate::error::{ProcedureError, UsageError};
use crate::event::Event;
use crate::factory::ApplicationSpecificBehavior;
use crate::formatters::{
    DefaultOutputFormat, HeaderOutputStrategy, OutputFormat, OutputFormatFactory, Rendering,
};
use crate::procedure::{Lifecycle, Procedure};
use crate::text_output::{Sink, TextOutput, TextOutputProcedure};
use std::sync::Arc;
use tracing::debug;

/// Introduces the field selection; every argument after it is a field
pub const OUTPUT_FORMAT_OPTION: &str = "-o";

/// Splits one command line argument into field tokens, tolerating stray
/// commas and whitespace: `",,,1,,,"` and `" 1 "` both yield `["1"]`.
pub fn clean_commas(argument: &str) -> Vec<String> {
    argument
        .trim()
        .trim_matches(',')
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(String::from)
        .collect()
}

/// Result of scanning an argument list for `-o`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSelection {
    /// Normalized tokens following `-o`, in order
    pub tokens: Vec<String>,
    /// Arguments not consumed by the selection
    pub remaining: Vec<String>,
    pub option_present: bool,
}

/// Scans `arguments` from `from` onwards. Arguments before `from` and before
/// `-o` are kept; `-o` and everything after it is consumed.
pub fn parse_field_selection(arguments: &[String], from: usize) -> FieldSelection {
    let mut selection = FieldSelection::default();
    let mut collecting = false;

    for (i, argument) in arguments.iter().enumerate() {
        if i < from {
            selection.remaining.push(argument.clone());
        } else if collecting {
            selection.tokens.extend(clean_commas(argument));
        } else if argument == OUTPUT_FORMAT_OPTION {
            collecting = true;
            selection.option_present = true;
        } else {
            selection.remaining.push(argument.clone());
        }
    }

    selection
}

/// Renders events through a pluggable format, with a header line written
/// whenever the header strategy says one is owed.
#[derive(Debug)]
pub struct Output {
    lifecycle: Lifecycle,
    output: TextOutput,
    format: Box<dyn OutputFormat>,
    header_strategy: Box<dyn HeaderOutputStrategy>,
    format_factory: Arc<dyn OutputFormatFactory>,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub const COMMAND_LINE_LABELS: &'static [&'static str] = &["output"];

    pub fn new() -> Self {
        Output::with_behavior(&ApplicationSpecificBehavior::default())
    }

    /// An output whose header strategy and format factory come from
    /// `behavior`; the format starts as the default one.
    pub fn with_behavior(behavior: &ApplicationSpecificBehavior) -> Self {
        Output {
            lifecycle: Lifecycle::new(),
            output: TextOutput::new(format!("{} procedure", Self::COMMAND_LINE_LABELS[0])),
            format: Box::new(DefaultOutputFormat::new()),
            header_strategy: behavior.header_output_strategy(),
            format_factory: behavior.output_format_factory(),
        }
    }

    pub fn with_sink(sink: Sink) -> Self {
        let mut output = Output::new();
        output.set_output_stream(sink);
        output
    }

    /// Applies the `-o` field selection found at or after `from`, returning
    /// the arguments it did not consume.
    pub fn configure_from_command_line(
        &mut self,
        from: usize,
        arguments: &[String],
    ) -> Result<Vec<String>, UsageError> {
        let selection = parse_field_selection(arguments, from);
        if selection.option_present {
            self.format = self.format_factory.from_arguments(&selection.tokens)?;
        }
        debug!(format = self.format.name(), remaining = ?selection.remaining, "output configured");
        Ok(selection.remaining)
    }

    pub fn format(&self) -> &dyn OutputFormat {
        self.format.as_ref()
    }

    pub fn format_mut(&mut self) -> &mut dyn OutputFormat {
        self.format.as_mut()
    }

    pub fn set_output_format(&mut self, format: Box<dyn OutputFormat>) {
        self.format = format;
    }

    pub fn header_output_strategy(&self) -> &dyn HeaderOutputStrategy {
        self.header_strategy.as_ref()
    }

    pub fn set_header_output_strategy(&mut self, strategy: Box<dyn HeaderOutputStrategy>) {
        self.header_strategy = strategy;
    }

    pub fn output_format_factory(&self) -> &Arc<dyn OutputFormatFactory> {
        &self.format_factory
    }
}

impl Procedure for Output {
    fn command_line_labels(&self) -> &'static [&'static str] {
        Self::COMMAND_LINE_LABELS
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn handle(&mut self, invocation: u64, event: &dyn Event) -> Result<(), ProcedureError> {
        if event.is_end_of_stream() {
            return Ok(());
        }

        if self.header_strategy.should_display_header(event) {
            if let Some(header) = self.format.format_header(event)? {
                self.output.println(header)?;
                self.header_strategy.header_displayed(event);
            }
        }

        match self.format.format(event)? {
            Rendering::Matched(line) => self.output.println(line),
            Rendering::NoMatch => {
                debug!(invocation, "event does not match the output format");
                Ok(())
            }
        }
    }
}

impl TextOutputProcedure for Output {
    fn text_output(&self) -> &TextOutput {
        &self.output
    }

    fn text_output_mut(&mut self) -> &mut TextOutput {
        &mut self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::ProcedureExt;
    use crate::error::ProcessingError;
    use crate::event::{EndOfStreamEvent, GenericEvent, Property, TimedEvent};
    use crate::formatters::{
        DefaultHeaderOutputStrategy, FieldOutputFormat, NoHeaderOutputStrategy, TimestampFormat,
    };
    use crate::text_output::MemorySink;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_clean_commas() {
        assert_eq!(clean_commas("1,"), vec!["1"]);
        assert_eq!(clean_commas(",1"), vec!["1"]);
        assert!(clean_commas(",").is_empty());
        assert_eq!(clean_commas("1,2"), vec!["1", "2"]);
        assert_eq!(clean_commas(",,,1,,,"), vec!["1"]);
        assert_eq!(clean_commas(" a , b "), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_field_selection_spaces_and_commas() {
        let selection = parse_field_selection(&args(&["-o", "1", ",", "2,", "a,b"]), 0);
        assert_eq!(selection.tokens, vec!["1", "2", "a", "b"]);
        assert!(selection.remaining.is_empty());
        assert!(selection.option_present);
    }

    #[test]
    fn test_parse_field_selection_keeps_leading_arguments() {
        let arguments = args(&["output", "--keep", "-o", "x", "-o"]);
        let selection = parse_field_selection(&arguments, 1);
        assert_eq!(selection.remaining, vec!["output", "--keep"]);
        assert_eq!(selection.tokens, vec!["x", "-o"]);
    }

    #[test]
    fn test_parse_field_selection_respects_offset() {
        let arguments = args(&["-o", "a", "b"]);
        let selection = parse_field_selection(&arguments, 1);
        assert!(!selection.option_present);
        assert_eq!(selection.remaining, arguments);
    }

    #[test]
    fn test_configure_indices_against_timed_event() {
        let sink = MemorySink::new();
        let mut output = Output::with_sink(sink.boxed());
        let remaining = output
            .configure_from_command_line(0, &args(&["-o", "1", ",", "2"]))
            .unwrap();
        assert!(remaining.is_empty());
        output.set_header_output_strategy(Box::new(NoHeaderOutputStrategy));

        let e = TimedEvent::with_properties(
            None,
            vec![
                Property::string("green", "box"),
                Property::string("yellow", "cat"),
                Property::string("big", "balloon"),
            ],
        );
        output.process(&e).unwrap();
        assert_eq!(sink.contents(), "box, cat\n");
    }

    #[test]
    fn test_configure_without_option_keeps_default_format() {
        let mut output = Output::new();
        let remaining = output
            .configure_from_command_line(0, &args(&["extra"]))
            .unwrap();
        assert_eq!(remaining, vec!["extra"]);
        assert_eq!(output.format().name(), "default");
    }

    #[test]
    fn test_configure_rejects_negative_index() {
        let mut output = Output::new();
        let err = output
            .configure_from_command_line(0, &args(&["-o", "-2"]))
            .unwrap_err();
        assert!(err.to_string().contains("invalid property index"));
    }

    #[test]
    fn test_header_written_once_then_lines() {
        let sink = MemorySink::new();
        let mut output = Output::with_sink(sink.boxed());
        output.set_output_format(Box::new(
            FieldOutputFormat::with_property_names(&["a", "b"]).unwrap(),
        ));

        let first = GenericEvent::with_properties(vec![Property::string("a", "1")]);
        let second = GenericEvent::with_properties(vec![Property::string("b", "2")]);
        let neither = GenericEvent::with_properties(vec![Property::string("c", "3")]);
        output
            .process_all(&[&first, &second, &neither, &EndOfStreamEvent])
            .unwrap();

        assert_eq!(sink.contents(), "# a, b\n1,\n, 2\n");
        assert_eq!(output.invocation_count(), 4);
    }

    #[test]
    fn test_timed_header_and_timestamp_prefix() {
        let sink = MemorySink::new();
        let mut output = Output::with_sink(sink.boxed());
        let mut format = FieldOutputFormat::with_property_names(&["test-property"]).unwrap();
        format.set_timestamp_format(TimestampFormat::new("%-S").unwrap());
        output.set_output_format(Box::new(format));

        let mut e = TimedEvent::new(Some(3000));
        e.set_string_property("test-property", "A");
        output.process(&e).unwrap();

        assert_eq!(sink.contents(), "# timestamp, test-property\n3, A\n");
    }

    #[test]
    fn test_default_format_raw_lines_have_no_header() {
        let sink = MemorySink::new();
        let mut output = Output::with_sink(sink.boxed());
        output.set_header_output_strategy(Box::new(DefaultHeaderOutputStrategy::new()));

        let mut e = GenericEvent::new();
        e.set_raw_representation("hello");
        output.process_all(&[&e, &e]).unwrap();

        assert_eq!(sink.contents(), "hello\nhello\n");
        assert!(output.header_output_strategy().should_display_header(&e));
    }

    #[derive(Debug)]
    struct FailingFormat(TimestampFormat);

    impl OutputFormat for FailingFormat {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn format_header(&self, _event: &dyn Event) -> Result<Option<String>, ProcessingError> {
            Ok(None)
        }

        fn format(&self, _event: &dyn Event) -> Result<Rendering, ProcessingError> {
            Err(ProcessingError::FormatError("cannot render".to_string()))
        }

        fn separator(&self) -> &str {
            " "
        }

        fn timestamp_format(&self) -> &TimestampFormat {
            &self.0
        }

        fn set_timestamp_format(&mut self, format: TimestampFormat) {
            self.0 = format;
        }
    }

    #[test]
    fn test_format_failure_is_recoverable() {
        let sink = MemorySink::new();
        let mut output = Output::with_sink(sink.boxed());
        output.set_output_format(Box::new(FailingFormat(TimestampFormat::default())));

        let err = output.process(&GenericEvent::new()).unwrap_err();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("cannot render"));

        output.process(&EndOfStreamEvent).unwrap();
        assert!(output.is_exit_loop());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_output_without_sink_is_fatal() {
        let mut output = Output::new();
        let mut e = GenericEvent::new();
        e.set_raw_representation("x");
        let err = output.process(&e).unwrap_err();
        assert!(err.is_fatal());
    }
}
