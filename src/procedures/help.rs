use crate::error::ProcedureError;
use crate::event::Event;
use crate::procedure::{Lifecycle, Procedure};
use crate::text_output::{Sink, TextOutput, TextOutputProcedure};

/// One line of the usage listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcedureSummary {
    pub labels: &'static [&'static str],
    pub description: &'static str,
}

/// Writes a usage listing on the first event it receives.
///
/// Help consumes no input: it asks to leave the event loop from the start,
/// so a driver honoring `is_exit_loop` only hands it the end-of-stream
/// marker.
#[derive(Debug)]
pub struct Help {
    lifecycle: Lifecycle,
    output: TextOutput,
    procedures: Vec<ProcedureSummary>,
    printed: bool,
}

impl Help {
    pub const COMMAND_LINE_LABELS: &'static [&'static str] = &["help", "-help", "--help"];

    pub fn new(procedures: Vec<ProcedureSummary>) -> Self {
        Help {
            lifecycle: Lifecycle::new(),
            output: TextOutput::new(format!("{} procedure", Self::COMMAND_LINE_LABELS[0])),
            procedures,
            printed: false,
        }
    }

    pub fn with_sink(procedures: Vec<ProcedureSummary>, sink: Sink) -> Self {
        let mut help = Help::new(procedures);
        help.set_output_stream(sink);
        help
    }

    pub fn usage(&self) -> String {
        let rows: Vec<(String, &str)> = self
            .procedures
            .iter()
            .map(|p| (p.labels.join(", "), p.description))
            .collect();
        let width = rows.iter().map(|(labels, _)| labels.len()).max().unwrap_or(0);

        let mut usage = String::from(
            "usage: evproc [OPTIONS] <PROCEDURE> [ARGS]...\n\nprocedures:\n",
        );
        for (labels, description) in rows {
            usage.push_str(&format!("  {:<width$}  {}\n", labels, description, width = width));
        }
        usage.push_str(
            "\noutput options:\n  -o <FIELD>...  property names or 0-based indices, space or comma separated\n",
        );
        usage
    }
}

impl Procedure for Help {
    fn command_line_labels(&self) -> &'static [&'static str] {
        Self::COMMAND_LINE_LABELS
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn handle(&mut self, _invocation: u64, _event: &dyn Event) -> Result<(), ProcedureError> {
        if self.printed {
            return Ok(());
        }
        let usage = self.usage();
        self.output.print(usage)?;
        self.printed = true;
        Ok(())
    }

    fn is_exit_loop(&self) -> bool {
        true
    }
}

impl TextOutputProcedure for Help {
    fn text_output(&self) -> &TextOutput {
        &self.output
    }

    fn text_output_mut(&mut self) -> &mut TextOutput {
        &mut self.output
    }
}
