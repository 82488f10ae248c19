use crate::error::{ProcedureError, UsageError};
use crate::event::Event;
use crate::procedure::{Lifecycle, Procedure};
use crate::query::Query;
use crate::text_output::{Sink, TextOutput, TextOutputProcedure};

/// Writes every event its query does not select
#[derive(Debug)]
pub struct Exclude {
    lifecycle: Lifecycle,
    output: TextOutput,
    query: Option<Box<dyn Query>>,
}

impl Default for Exclude {
    fn default() -> Self {
        Self::new()
    }
}

impl Exclude {
    pub const COMMAND_LINE_LABELS: &'static [&'static str] = &["exclude", "-x"];

    pub fn new() -> Self {
        Exclude {
            lifecycle: Lifecycle::new(),
            output: TextOutput::new(format!("{} procedure", Self::COMMAND_LINE_LABELS[0])),
            query: None,
        }
    }

    pub fn with_sink(sink: Sink) -> Self {
        let mut exclude = Exclude::new();
        exclude.set_output_stream(sink);
        exclude
    }

    pub fn set_query(&mut self, query: Box<dyn Query>) {
        self.query = Some(query);
    }

    pub fn query(&self) -> Option<&dyn Query> {
        self.query.as_deref()
    }
}

impl Procedure for Exclude {
    fn command_line_labels(&self) -> &'static [&'static str] {
        Self::COMMAND_LINE_LABELS
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn handle(&mut self, _invocation: u64, event: &dyn Event) -> Result<(), ProcedureError> {
        let query = self.query.as_deref().ok_or_else(|| UsageError::NotInitialized {
            component: self.name(),
            missing: "no query",
        })?;

        if event.is_end_of_stream() || query.selects(event) {
            return Ok(());
        }

        match event.raw_representation() {
            Some(raw) => self.output.println(raw),
            None => self.output.println(event),
        }
    }
}

impl TextOutputProcedure for Exclude {
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
    use crate::event::{EndOfStreamEvent, GenericEvent, Property};
    use crate::query::{parse_query, KeywordQuery};
    use crate::text_output::MemorySink;

    fn line(raw: &str) -> GenericEvent {
        let mut e = GenericEvent::new();
        e.set_raw_representation(raw);
        e
    }

    #[test]
    fn test_selected_event_produces_nothing() {
        let sink = MemorySink::new();
        let mut exclude = Exclude::with_sink(sink.boxed());
        exclude.set_query(Box::new(KeywordQuery::new("noise")));

        exclude.process(&line("some noise here")).unwrap();
        assert!(sink.bytes().is_empty());
    }

    #[test]
    fn test_unselected_event_written_raw() {
        let sink = MemorySink::new();
        let mut exclude = Exclude::with_sink(sink.boxed());
        exclude.set_query(Box::new(KeywordQuery::new("noise")));

        exclude.process(&line("a signal")).unwrap();
        exclude.process(&EndOfStreamEvent).unwrap();
        assert_eq!(sink.contents(), "a signal\n");
    }

    #[test]
    fn test_event_without_raw_representation_uses_display() {
        let sink = MemorySink::new();
        let mut exclude = Exclude::with_sink(sink.boxed());
        exclude.set_query(parse_query(&["level:debug".to_string()]).unwrap());

        let kept = GenericEvent::with_properties(vec![Property::string("level", "info")]);
        let dropped = GenericEvent::with_properties(vec![Property::string("level", "debug")]);
        exclude.process_all(&[&kept, &dropped]).unwrap();

        assert_eq!(sink.contents(), "GenericEvent[level=info]\n");
    }

    #[test]
    fn test_missing_query_is_fatal() {
        let mut exclude = Exclude::new();
        let err = exclude.process(&line("x")).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("was not initialized: no query"));
    }

    #[test]
    fn test_missing_query_reported_before_missing_sink() {
        let mut exclude = Exclude::new();
        let err = exclude.process(&line("x")).unwrap_err();
        assert!(!err.to_string().contains("no output stream"));

        exclude.set_query(Box::new(KeywordQuery::new("y")));
        let err = exclude.process(&line("x")).unwrap_err();
        assert!(err.to_string().contains("no output stream"));
    }
}
