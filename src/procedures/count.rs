use crate::error::ProcedureError;
use crate::event::Event;
use crate::procedure::{Lifecycle, Procedure};
use crate::text_output::{Sink, TextOutput, TextOutputProcedure};
use std::sync::atomic::{AtomicU64, Ordering};

/// Tallies the events it sees and writes the tally when the stream ends
#[derive(Debug)]
pub struct Count {
    lifecycle: Lifecycle,
    output: TextOutput,
    count: AtomicU64,
}

impl Default for Count {
    fn default() -> Self {
        Self::new()
    }
}

impl Count {
    pub const COMMAND_LINE_LABELS: &'static [&'static str] = &["count", "-c"];

    pub fn new() -> Self {
        Count {
            lifecycle: Lifecycle::new(),
            output: TextOutput::new(format!("{} procedure", Self::COMMAND_LINE_LABELS[0])),
            count: AtomicU64::new(0),
        }
    }

    pub fn with_sink(sink: Sink) -> Self {
        let mut count = Count::new();
        count.set_output_stream(sink);
        count
    }

    /// Events seen so far, end-of-stream excluded
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl Procedure for Count {
    fn command_line_labels(&self) -> &'static [&'static str] {
        Self::COMMAND_LINE_LABELS
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn handle(&mut self, _invocation: u64, event: &dyn Event) -> Result<(), ProcedureError> {
        if event.is_end_of_stream() {
            return self.output.println(self.count());
        }
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl TextOutputProcedure for Count {
    fn text_output(&self) -> &TextOutput {
        &self.output
    }

    fn text_output_mut(&mut self) -> &mut TextOutput {
        &mut self.output
    }
}
