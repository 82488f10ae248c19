use crate::error::{ProcedureError, UsageError};
use crate::event::Event;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Read handle on a procedure's invocation count. Clones share the same
/// counter and may be polled from any thread while events are delivered.
#[derive(Debug, Clone, Default)]
pub struct InvocationCounter(Arc<AtomicU64>);

impl InvocationCounter {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// State shared by every procedure: invocation accounting and the
/// ACTIVE -> TERMINATED transition on end-of-stream.
#[derive(Debug, Default)]
pub struct Lifecycle {
    invocations: InvocationCounter,
    end_of_stream: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocation_count(&self) -> u64 {
        self.invocations.get()
    }

    pub fn counter(&self) -> InvocationCounter {
        self.invocations.clone()
    }

    pub fn is_terminated(&self) -> bool {
        self.end_of_stream.load(Ordering::Acquire)
    }

    fn record_invocation(&self) -> u64 {
        self.invocations.increment()
    }

    fn terminate(&self) {
        self.end_of_stream.store(true, Ordering::Release);
    }
}

/// A pluggable consumer of an event stream.
///
/// Implementations provide `handle`, their per-event logic. Callers deliver
/// events through [`ProcedureExt::process`], which wraps it with the
/// lifecycle rules.
pub trait Procedure: Send {
    /// Labels selecting this procedure on the command line, the full one
    /// first. Never empty.
    fn command_line_labels(&self) -> &'static [&'static str];

    fn lifecycle(&self) -> &Lifecycle;

    /// Per-event logic. `invocation` is the 1-based number of the current
    /// `process` call.
    fn handle(&mut self, invocation: u64, event: &dyn Event) -> Result<(), ProcedureError>;

    fn invocation_count(&self) -> u64 {
        self.lifecycle().invocation_count()
    }

    fn invocation_counter(&self) -> InvocationCounter {
        self.lifecycle().counter()
    }

    /// Advisory: true when the procedure does not want more events.
    fn is_exit_loop(&self) -> bool {
        self.lifecycle().is_terminated()
    }

    fn name(&self) -> String {
        let label = self
            .command_line_labels()
            .first()
            .copied()
            .unwrap_or("anonymous");
        format!("{} procedure", label)
    }
}

/// Event delivery for every [`Procedure`].
///
/// Every call is counted, events after end-of-stream are rejected, and the
/// end-of-stream marker is handed to `handle` before the procedure
/// terminates. The blanket impl is the only one, so implementations cannot
/// replace these rules:
///
/// ```compile_fail
/// use evproc::{Event, Lifecycle, Procedure, ProcedureError};
///
/// struct Uncounted(Lifecycle);
///
/// impl Procedure for Uncounted {
///     fn command_line_labels(&self) -> &'static [&'static str] {
///         &["uncounted"]
///     }
///
///     fn lifecycle(&self) -> &Lifecycle {
///         &self.0
///     }
///
///     fn handle(&mut self, _: u64, _: &dyn Event) -> Result<(), ProcedureError> {
///         Ok(())
///     }
///
///     fn process(&mut self, _: &dyn Event) -> Result<(), ProcedureError> {
///         Ok(())
///     }
/// }
/// ```
pub trait ProcedureExt: Procedure {
    fn process(&mut self, event: &dyn Event) -> Result<(), ProcedureError> {
        let invocation = self.lifecycle().record_invocation();

        if self.lifecycle().is_terminated() {
            return Err(UsageError::EventBeyondEndOfStream {
                procedure: self.name(),
            }
            .into());
        }

        let result = self.handle(invocation, event);

        if event.is_end_of_stream() {
            debug!(procedure = %self.name(), invocation, "end-of-stream reached");
            self.lifecycle().terminate();
        }

        result
    }

    /// Delivers the events in order; the first failure stops delivery.
    fn process_all(&mut self, events: &[&dyn Event]) -> Result<(), ProcedureError> {
        for event in events {
            self.process(*event)?;
        }
        Ok(())
    }
}

impl<P: Procedure + ?Sized> ProcedureExt for P {}

impl fmt::Display for dyn Procedure + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessingError;
    use crate::event::{EndOfStreamEvent, GenericEvent, TimedEvent};

    #[derive(Default)]
    struct Recorder {
        lifecycle: Lifecycle,
        seen: Vec<(u64, bool)>,
        fail_on: Option<u64>,
    }

    impl Procedure for Recorder {
        fn command_line_labels(&self) -> &'static [&'static str] {
            &["recorder", "-r"]
        }

        fn lifecycle(&self) -> &Lifecycle {
            &self.lifecycle
        }

        fn handle(&mut self, invocation: u64, event: &dyn Event) -> Result<(), ProcedureError> {
            self.seen.push((invocation, event.is_end_of_stream()));
            if self.fail_on == Some(invocation) {
                return Err(ProcessingError::FormatError("boom".to_string()).into());
            }
            Ok(())
        }
    }

    #[test]
    fn test_invocation_count_includes_end_of_stream() {
        let mut p = Recorder::default();
        for _ in 0..3 {
            p.process(&GenericEvent::new()).unwrap();
        }
        p.process(&EndOfStreamEvent).unwrap();

        assert_eq!(p.invocation_count(), 4);
        assert_eq!(p.seen.last(), Some(&(4, true)));
        assert!(p.is_exit_loop());
    }

    #[test]
    fn test_event_beyond_end_of_stream_is_fatal_and_counted() {
        let mut p = Recorder::default();
        p.process(&EndOfStreamEvent).unwrap();

        let err = p.process(&TimedEvent::new(None)).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("event beyond end-of-stream"));
        assert!(err.to_string().contains("recorder procedure"));
        assert_eq!(p.invocation_count(), 2);
        assert_eq!(p.seen.len(), 1);
        assert!(p.is_exit_loop());
    }

    #[test]
    fn test_process_all_stops_at_first_failure() {
        let mut p = Recorder {
            fail_on: Some(2),
            ..Default::default()
        };
        let a = GenericEvent::new();
        let b = GenericEvent::new();
        let c = GenericEvent::new();

        let err = p.process_all(&[&a, &b, &c]).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(p.invocation_count(), 2);
        assert!(!p.is_exit_loop());

        // a processing failure leaves the procedure usable
        p.process(&c).unwrap();
        assert_eq!(p.invocation_count(), 3);
    }

    #[test]
    fn test_end_of_stream_inside_batch() {
        let mut p = Recorder::default();
        let eos = EndOfStreamEvent;
        let late = TimedEvent::new(Some(1));

        let err = p.process_all(&[&eos, &late]).unwrap_err();
        assert!(err.to_string().contains("event beyond end-of-stream"));
        assert!(p.is_exit_loop());
    }

    #[test]
    fn test_display_uses_first_label() {
        let p: Box<dyn Procedure> = Box::new(Recorder::default());
        assert_eq!(p.to_string(), "recorder procedure");
    }

    #[test]
    fn test_counter_readable_from_another_thread() {
        let mut p = Recorder::default();
        let counter = p.invocation_counter();
        p.process(&GenericEvent::new()).unwrap();

        let observed = std::thread::spawn(move || counter.get()).join().unwrap();
        assert_eq!(observed, 1);
    }
}
