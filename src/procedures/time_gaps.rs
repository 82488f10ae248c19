use crate::error::ProcedureError;
use crate::event::Event;
use crate::procedure::{Lifecycle, Procedure};
use crate::text_output::{Sink, TextOutput, TextOutputProcedure};
use tracing::warn;

/// Gaps wider than this are assumed to be restarts, not slowness
pub const DEFAULT_IGNORED_GAP_MS: u64 = 60 * 60 * 1000;

#[derive(Debug, Clone)]
struct Sample {
    timestamp: i64,
    line_number: Option<u64>,
    rendering: String,
}

impl Sample {
    fn of(event: &dyn Event, timestamp: i64) -> Self {
        let rendering = match event.raw_representation() {
            Some(raw) => raw.to_string(),
            None => event.to_string(),
        };
        Sample {
            timestamp,
            line_number: event.line_number(),
            rendering,
        }
    }

    fn line(&self) -> String {
        self.line_number
            .map(|n| n.to_string())
            .unwrap_or_else(|| "?".to_string())
    }
}

/// Reports each new largest gap between consecutive timed events
#[derive(Debug)]
pub struct TimeGaps {
    lifecycle: Lifecycle,
    output: TextOutput,
    ignored_gap_ms: u64,
    previous: Option<Sample>,
    max_gap: u64,
}

impl Default for TimeGaps {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeGaps {
    pub const COMMAND_LINE_LABELS: &'static [&'static str] = &["time-gaps"];

    pub fn new() -> Self {
        TimeGaps {
            lifecycle: Lifecycle::new(),
            output: TextOutput::new(format!("{} procedure", Self::COMMAND_LINE_LABELS[0])),
            ignored_gap_ms: DEFAULT_IGNORED_GAP_MS,
            previous: None,
            max_gap: 0,
        }
    }

    pub fn with_sink(sink: Sink) -> Self {
        let mut gaps = TimeGaps::new();
        gaps.set_output_stream(sink);
        gaps
    }

    /// Gaps strictly larger than `millis` are ignored
    pub fn with_ignored_gap(mut self, millis: u64) -> Self {
        self.ignored_gap_ms = millis;
        self
    }

    /// Largest gap reported so far, in milliseconds; 0 until one is found
    pub fn max_gap(&self) -> u64 {
        self.max_gap
    }

    fn report(&mut self, gap: u64, first: &Sample, second: &Sample) -> Result<(), ProcedureError> {
        self.output.printf(format_args!(
            "{} ms, lines {}, {}\n",
            gap,
            first.line(),
            second.line()
        ))?;
        self.output.println(format_args!("line {}:", first.line()))?;
        self.output.println(&first.rendering)?;
        self.output.println(format_args!("line {}:", second.line()))?;
        self.output.println(&second.rendering)
    }
}

impl Procedure for TimeGaps {
    fn command_line_labels(&self) -> &'static [&'static str] {
        Self::COMMAND_LINE_LABELS
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn handle(&mut self, invocation: u64, event: &dyn Event) -> Result<(), ProcedureError> {
        if event.is_end_of_stream() || !event.is_timed() {
            return Ok(());
        }

        let Some(timestamp) = event.timestamp() else {
            warn!(procedure = %self.name(), invocation, "timed event without a timestamp, skipping");
            return Ok(());
        };

        let current = Sample::of(event, timestamp);
        let Some(previous) = self.previous.replace(current.clone()) else {
            return Ok(());
        };

        // Out-of-order events count by magnitude
        let gap = timestamp.abs_diff(previous.timestamp);
        if gap > self.ignored_gap_ms {
            warn!(
                procedure = %self.name(),
                gap_ms = gap,
                line = %current.line(),
                "ignoring gap wider than {} ms",
                self.ignored_gap_ms
            );
            return Ok(());
        }

        if gap > self.max_gap {
            self.max_gap = gap;
            self.report(gap, &previous, &current)?;
        }
        Ok(())
    }
}

impl TextOutputProcedure for TimeGaps {
    fn text_output(&self) -> &TextOutput {
        &self.output
    }

    fn text_output_mut(&mut self) -> &mut TextOutput {
        &mut self.output
    }
}
