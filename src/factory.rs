use crate::error::{ProcedureError, UsageError};
use crate::formatters::{
    DefaultHeaderOutputStrategy, DefaultOutputFormatFactory, HeaderOutputStrategy,
    OutputFormatFactory,
};
use crate::procedure::Procedure;
use crate::procedures::{Count, Describe, Exclude, Help, Output, ProcedureSummary, TimeGaps};
use crate::query::parse_query;
use crate::text_output::{Sink, TextOutputProcedure};
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::debug;

pub type HeaderStrategyConstructor = fn() -> Box<dyn HeaderOutputStrategy>;

/// Application-level overrides handed to every procedure the factory builds
#[derive(Debug, Clone, Default)]
pub struct ApplicationSpecificBehavior {
    header_output_strategy: Option<HeaderStrategyConstructor>,
    output_format_factory: Option<Arc<dyn OutputFormatFactory>>,
}

impl ApplicationSpecificBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header_output_strategy(mut self, constructor: HeaderStrategyConstructor) -> Self {
        self.header_output_strategy = Some(constructor);
        self
    }

    pub fn with_output_format_factory(mut self, factory: Arc<dyn OutputFormatFactory>) -> Self {
        self.output_format_factory = Some(factory);
        self
    }

    /// A fresh header strategy; the default one when none was configured
    pub fn header_output_strategy(&self) -> Box<dyn HeaderOutputStrategy> {
        match self.header_output_strategy {
            Some(constructor) => constructor(),
            None => Box::new(DefaultHeaderOutputStrategy::new()),
        }
    }

    pub fn output_format_factory(&self) -> Arc<dyn OutputFormatFactory> {
        match &self.output_format_factory {
            Some(factory) => Arc::clone(factory),
            None => Arc::new(DefaultOutputFormatFactory),
        }
    }
}

/// A procedure resolved from the command line, with the arguments it did not
/// consume
pub struct Resolved {
    pub procedure: Box<dyn Procedure>,
    pub remaining_arguments: Vec<String>,
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("procedure", &self.procedure.name())
            .field("remaining_arguments", &self.remaining_arguments)
            .finish()
    }
}

pub trait ProcedureFactory {
    /// Builds the procedure selected by `label`, configured from
    /// `arguments[from..]`. Unknown labels yield `None`.
    fn find(
        &self,
        label: &str,
        from: usize,
        arguments: &[String],
    ) -> Result<Option<Resolved>, ProcedureError>;
}

/// Everything a constructor gets to build one procedure
pub struct ProcedureRequest<'a> {
    pub from: usize,
    pub arguments: &'a [String],
    pub sink: Sink,
    pub behavior: &'a ApplicationSpecificBehavior,
    pub catalog: Vec<ProcedureSummary>,
}

pub type Constructor = fn(ProcedureRequest<'_>) -> Result<Resolved, UsageError>;

/// A registry entry
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    pub labels: &'static [&'static str],
    pub description: &'static str,
    pub constructor: Constructor,
}

impl Registration {
    pub fn summary(&self) -> ProcedureSummary {
        ProcedureSummary {
            labels: self.labels,
            description: self.description,
        }
    }
}

pub type SinkSupplier = Arc<dyn Fn() -> Sink + Send + Sync>;

fn untouched(request: &ProcedureRequest<'_>) -> Vec<String> {
    request.arguments.to_vec()
}

fn build_count(request: ProcedureRequest<'_>) -> Result<Resolved, UsageError> {
    Ok(Resolved {
        remaining_arguments: untouched(&request),
        procedure: Box::new(Count::with_sink(request.sink)),
    })
}

fn build_describe(request: ProcedureRequest<'_>) -> Result<Resolved, UsageError> {
    Ok(Resolved {
        remaining_arguments: untouched(&request),
        procedure: Box::new(Describe::with_sink(request.sink)),
    })
}

fn build_exclude(request: ProcedureRequest<'_>) -> Result<Resolved, UsageError> {
    let from = request.from.min(request.arguments.len());
    let (kept, trailing) = request.arguments.split_at(from);

    let mut exclude = Exclude::with_sink(request.sink);
    if !trailing.is_empty() {
        exclude.set_query(parse_query(trailing)?);
    }
    Ok(Resolved {
        procedure: Box::new(exclude),
        remaining_arguments: kept.to_vec(),
    })
}

fn build_output(request: ProcedureRequest<'_>) -> Result<Resolved, UsageError> {
    let mut output = Output::with_behavior(request.behavior);
    output.set_output_stream(request.sink);
    let remaining_arguments = output.configure_from_command_line(request.from, request.arguments)?;
    Ok(Resolved {
        procedure: Box::new(output),
        remaining_arguments,
    })
}

fn build_time_gaps(request: ProcedureRequest<'_>) -> Result<Resolved, UsageError> {
    Ok(Resolved {
        remaining_arguments: untouched(&request),
        procedure: Box::new(TimeGaps::with_sink(request.sink)),
    })
}

fn build_help(request: ProcedureRequest<'_>) -> Result<Resolved, UsageError> {
    Ok(Resolved {
        remaining_arguments: untouched(&request),
        procedure: Box::new(Help::with_sink(request.catalog, request.sink)),
    })
}

/// The stock procedures
pub fn default_registrations() -> Vec<Registration> {
    vec![
        Registration {
            labels: Count::COMMAND_LINE_LABELS,
            description: "count events",
            constructor: build_count,
        },
        Registration {
            labels: Describe::COMMAND_LINE_LABELS,
            description: "write the signature of every new event shape",
            constructor: build_describe,
        },
        Registration {
            labels: Exclude::COMMAND_LINE_LABELS,
            description: "write events not selected by the query (keywords or name:value)",
            constructor: build_exclude,
        },
        Registration {
            labels: Output::COMMAND_LINE_LABELS,
            description: "write events, or selected fields with -o",
            constructor: build_output,
        },
        Registration {
            labels: TimeGaps::COMMAND_LINE_LABELS,
            description: "report the largest gaps between consecutive timed events",
            constructor: build_time_gaps,
        },
        Registration {
            labels: Help::COMMAND_LINE_LABELS,
            description: "show this listing",
            constructor: build_help,
        },
    ]
}

/// Label-driven factory over an explicit registry. Later registrations
/// shadow earlier ones sharing a label.
pub struct DefaultProcedureFactory {
    registry: Vec<Registration>,
    behavior: ApplicationSpecificBehavior,
    sink_supplier: SinkSupplier,
}

impl Default for DefaultProcedureFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultProcedureFactory {
    pub fn new() -> Self {
        DefaultProcedureFactory::with_behavior(ApplicationSpecificBehavior::default())
    }

    pub fn with_behavior(behavior: ApplicationSpecificBehavior) -> Self {
        DefaultProcedureFactory {
            registry: default_registrations(),
            behavior,
            sink_supplier: Arc::new(|| Box::new(io::stdout()) as Sink),
        }
    }

    /// Replaces the standard output default
    pub fn with_sink_supplier<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> Sink + Send + Sync + 'static,
    {
        self.sink_supplier = Arc::new(supplier);
        self
    }

    pub fn register(&mut self, registration: Registration) {
        self.registry.push(registration);
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registry
    }

    pub fn behavior(&self) -> &ApplicationSpecificBehavior {
        &self.behavior
    }

    /// Usage listing rows, one per distinct procedure, in registration order
    pub fn catalog(&self) -> Vec<ProcedureSummary> {
        let mut catalog: Vec<ProcedureSummary> = Vec::with_capacity(self.registry.len());
        for registration in self.registry.iter().rev() {
            let shadowed = catalog
                .iter()
                .any(|seen| seen.labels.iter().any(|l| registration.labels.contains(l)));
            if !shadowed {
                catalog.push(registration.summary());
            }
        }
        catalog.reverse();
        catalog
    }

    fn lookup(&self, label: &str) -> Option<&Registration> {
        self.registry
            .iter()
            .rev()
            .find(|registration| registration.labels.contains(&label))
    }
}

impl fmt::Debug for DefaultProcedureFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultProcedureFactory")
            .field("registry", &self.registry)
            .field("behavior", &self.behavior)
            .finish_non_exhaustive()
    }
}

impl ProcedureFactory for DefaultProcedureFactory {
    fn find(
        &self,
        label: &str,
        from: usize,
        arguments: &[String],
    ) -> Result<Option<Resolved>, ProcedureError> {
        let Some(registration) = self.lookup(label) else {
            debug!(label, "no procedure registered under this label");
            return Ok(None);
        };

        let request = ProcedureRequest {
            from,
            arguments,
            sink: (self.sink_supplier)(),
            behavior: &self.behavior,
            catalog: self.catalog(),
        };
        let resolved = (registration.constructor)(request)?;
        debug!(
            label,
            procedure = %resolved.procedure.name(),
            remaining = ?resolved.remaining_arguments,
            "procedure resolved"
        );
        Ok(Some(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::ProcedureExt;
    use crate::error::ProcessingError;
    use crate::event::{EndOfStreamEvent, Event, GenericEvent, Property};
    use crate::formatters::{NoHeaderOutputStrategy, OutputFormat};
    use crate::procedure::Lifecycle;
    use crate::text_output::MemorySink;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn factory(sink: &MemorySink) -> DefaultProcedureFactory {
        let sink = sink.clone();
        DefaultProcedureFactory::new().with_sink_supplier(move || sink.boxed())
    }

    #[test]
    fn test_find_by_every_label() {
        let f = factory(&MemorySink::new());
        let labels = [
            "count", "-c", "describe", "exclude", "-x", "output", "time-gaps", "help", "-help",
            "--help",
        ];
        for label in labels {
            let resolved = f.find(label, 0, &[]).unwrap();
            let resolved = resolved.unwrap_or_else(|| panic!("{} not found", label));
            assert!(resolved.procedure.command_line_labels().contains(&label));
        }
    }

    #[test]
    fn test_unknown_label() {
        let f = factory(&MemorySink::new());
        assert!(f.find("no-such-procedure", 0, &[]).unwrap().is_none());
    }

    #[test]
    fn test_count_leaves_arguments() {
        let sink = MemorySink::new();
        let f = factory(&sink);
        let mut resolved = f.find("-c", 0, &args(&["stray"])).unwrap().unwrap();
        assert_eq!(resolved.remaining_arguments, vec!["stray"]);

        resolved.procedure.process(&GenericEvent::new()).unwrap();
        resolved.procedure.process(&EndOfStreamEvent).unwrap();
        assert_eq!(sink.contents(), "1\n");
    }

    #[test]
    fn test_output_consumes_field_selection() {
        let sink = MemorySink::new();
        let f = factory(&sink);
        let mut resolved = f
            .find("output", 0, &args(&["-o", "color,", "size"]))
            .unwrap()
            .unwrap();
        assert!(resolved.remaining_arguments.is_empty());

        let e = GenericEvent::with_properties(vec![
            Property::string("size", "L"),
            Property::string("color", "red"),
        ]);
        resolved.procedure.process(&e).unwrap();
        assert_eq!(sink.contents(), "# color, size\nred, L\n");
    }

    #[test]
    fn test_output_rejects_bad_index() {
        let f = factory(&MemorySink::new());
        let err = f.find("output", 0, &args(&["-o", "-1"])).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_exclude_builds_query_from_trailing_arguments() {
        let sink = MemorySink::new();
        let f = factory(&sink);
        let mut resolved = f
            .find("-x", 0, &args(&["level:debug", "heartbeat"]))
            .unwrap()
            .unwrap();
        assert!(resolved.remaining_arguments.is_empty());

        let mut noisy = GenericEvent::new();
        noisy.set_raw_representation("heartbeat ok");
        let mut kept = GenericEvent::with_properties(vec![Property::string("level", "info")]);
        kept.set_raw_representation("started");
        resolved.procedure.process(&noisy).unwrap();
        resolved.procedure.process(&kept).unwrap();
        assert_eq!(sink.contents(), "started\n");
    }

    #[test]
    fn test_exclude_without_query_fails_on_first_event() {
        let f = factory(&MemorySink::new());
        let mut resolved = f.find("exclude", 0, &[]).unwrap().unwrap();
        let err = resolved.procedure.process(&GenericEvent::new()).unwrap_err();
        assert!(err.to_string().contains("no query"));
    }

    #[test]
    fn test_help_lists_registered_procedures() {
        let sink = MemorySink::new();
        let f = factory(&sink);
        let mut resolved = f.find("--help", 0, &[]).unwrap().unwrap();
        assert!(resolved.procedure.is_exit_loop());

        resolved.procedure.process(&EndOfStreamEvent).unwrap();
        let out = sink.contents();
        assert!(out.contains("count, -c"));
        assert!(out.contains("time-gaps"));
        assert!(out.contains("help, -help, --help"));
    }

    #[test]
    fn test_behavior_header_strategy_reaches_output() {
        let sink = MemorySink::new();
        let behavior = ApplicationSpecificBehavior::new()
            .with_header_output_strategy(|| Box::new(NoHeaderOutputStrategy) as Box<dyn HeaderOutputStrategy>);
        let shared = sink.clone();
        let f = DefaultProcedureFactory::with_behavior(behavior)
            .with_sink_supplier(move || shared.boxed());

        let mut resolved = f.find("output", 0, &args(&["-o", "a"])).unwrap().unwrap();
        resolved
            .procedure
            .process(&GenericEvent::with_properties(vec![Property::string("a", "1")]))
            .unwrap();
        assert_eq!(sink.contents(), "1\n");
    }

    #[derive(Debug)]
    struct UpperCaseFactory;

    impl OutputFormatFactory for UpperCaseFactory {
        fn from_arguments(&self, tokens: &[String]) -> Result<Box<dyn OutputFormat>, UsageError> {
            let upper: Vec<String> = tokens.iter().map(|t| t.to_uppercase()).collect();
            DefaultOutputFormatFactory.from_arguments(&upper)
        }
    }

    #[test]
    fn test_behavior_format_factory_reaches_output() {
        let sink = MemorySink::new();
        let behavior =
            ApplicationSpecificBehavior::new().with_output_format_factory(Arc::new(UpperCaseFactory));
        let shared = sink.clone();
        let f = DefaultProcedureFactory::with_behavior(behavior)
            .with_sink_supplier(move || shared.boxed());

        let mut resolved = f.find("output", 0, &args(&["-o", "a"])).unwrap().unwrap();
        resolved
            .procedure
            .process(&GenericEvent::with_properties(vec![Property::string("A", "x")]))
            .unwrap();
        assert_eq!(sink.contents(), "# A\nx\n");
    }

    struct Silent {
        lifecycle: Lifecycle,
    }

    impl Procedure for Silent {
        fn command_line_labels(&self) -> &'static [&'static str] {
            &["count"]
        }

        fn lifecycle(&self) -> &Lifecycle {
            &self.lifecycle
        }

        fn handle(&mut self, _invocation: u64, _event: &dyn Event) -> Result<(), ProcedureError> {
            Err(ProcessingError::FormatError("silent".to_string()).into())
        }
    }

    fn build_silent(request: ProcedureRequest<'_>) -> Result<Resolved, UsageError> {
        Ok(Resolved {
            procedure: Box::new(Silent {
                lifecycle: Lifecycle::new(),
            }),
            remaining_arguments: request.arguments.to_vec(),
        })
    }

    #[test]
    fn test_registration_shadows_stock_label() {
        let mut f = factory(&MemorySink::new());
        f.register(Registration {
            labels: &["count"],
            description: "replacement",
            constructor: build_silent,
        });

        let mut resolved = f.find("count", 0, &[]).unwrap().unwrap();
        assert!(resolved.procedure.process(&GenericEvent::new()).is_err());

        // the abbreviated stock label is still served by the stock procedure
        let mut stock = f.find("-c", 0, &[]).unwrap().unwrap();
        assert!(stock.procedure.process(&GenericEvent::new()).is_ok());

        assert_eq!(f.catalog().len(), default_registrations().len());
    }
}
