// src/pipeline/stream.rs
use std::io::{self, BufRead, BufReader, Read};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::{ProcedureError, ProcessingError};
use crate::event::EndOfStreamEvent;
use crate::pipeline::config::{ErrorStrategy, PipelineConfig};
use crate::pipeline::context::{ParseErrorInfo, ProcessingStats};
use crate::procedure::{Procedure, ProcedureExt};

fn is_broken_pipe(err: &ProcedureError) -> bool {
    matches!(
        err,
        ProcedureError::Processing(ProcessingError::IoError(e)) if e.kind() == io::ErrorKind::BrokenPipe
    )
}

/// Reads lines, parses them into events and feeds them to one procedure,
/// finishing with the end-of-stream marker.
#[derive(Debug)]
pub struct EventPipeline {
    config: PipelineConfig,
    stats: ProcessingStats,
}

impl EventPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        EventPipeline {
            config,
            stats: ProcessingStats::default(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Stats accumulated over every run
    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Like `run`, buffering `input` with the configured buffer size
    pub fn run_reader<R: Read>(
        &mut self,
        input: R,
        procedure: &mut dyn Procedure,
    ) -> Result<ProcessingStats, ProcedureError> {
        let reader = BufReader::with_capacity(self.config.buffer_size, input);
        self.run(reader, procedure)
    }

    /// Processes one stream.
    ///
    /// Reading stops early once the procedure asks to exit the loop. The
    /// end-of-stream marker is delivered unless the run was aborted by an
    /// error or the output pipe was closed.
    pub fn run<R: BufRead>(
        &mut self,
        input: R,
        procedure: &mut dyn Procedure,
    ) -> Result<ProcessingStats, ProcedureError> {
        let start_time = Instant::now();
        let mut file_stats = ProcessingStats::default();
        let mut parser = self.config.input_format.parser();
        let mut lines = input.lines();
        let mut line_number: u64 = 0;

        loop {
            if procedure.is_exit_loop() {
                debug!(procedure = %procedure.name(), line_number, "procedure requested loop exit");
                break;
            }

            let line = match lines.next() {
                None => break,
                Some(Ok(line)) => line,
                Some(Err(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Some(Err(e)) => return Err(ProcessingError::IoError(e).into()),
            };

            line_number += 1;
            file_stats.lines_seen += 1;

            // Check line length
            if line.len() > self.config.max_line_length {
                let error = ProcessingError::LineTooLong {
                    length: line.len(),
                    max_length: self.config.max_line_length,
                };
                self.recover(error.into(), line_number, &mut file_stats)?;
                continue;
            }

            let event = match parser.parse_line(&line, line_number) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(error) => {
                    file_stats.parse_errors.push(ParseErrorInfo {
                        line_number,
                        format_name: parser.format_name().to_string(),
                        error: error.to_string(),
                    });
                    self.recover(error.into(), line_number, &mut file_stats)?;
                    continue;
                }
            };

            if let Some(timestamp) = event.timestamp() {
                file_stats.update_timestamp_range(timestamp);
            }
            file_stats.events_processed += 1;

            if let Err(error) = procedure.process(event.as_ref()) {
                if is_broken_pipe(&error) {
                    debug!(line_number, "output closed, stopping");
                    return Ok(self.finish(file_stats, start_time));
                }
                self.recover(error, line_number, &mut file_stats)?;
            }
        }

        if !procedure.lifecycle().is_terminated() {
            match procedure.process(&EndOfStreamEvent) {
                Err(error) if is_broken_pipe(&error) => {}
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => self.recover(error, line_number, &mut file_stats)?,
                Ok(()) => {}
            }
        }

        Ok(self.finish(file_stats, start_time))
    }

    fn recover(
        &self,
        error: ProcedureError,
        line_number: u64,
        stats: &mut ProcessingStats,
    ) -> Result<(), ProcedureError> {
        if error.is_fatal() || self.config.error_strategy == ErrorStrategy::FailFast {
            return Err(error);
        }
        stats.errors += 1;
        warn!(line = line_number, error = %error, "skipping");
        Ok(())
    }

    fn finish(&mut self, mut file_stats: ProcessingStats, start_time: Instant) -> ProcessingStats {
        file_stats.processing_time = start_time.elapsed();

        // Update global stats
        self.stats.lines_seen += file_stats.lines_seen;
        self.stats.events_processed += file_stats.events_processed;
        self.stats.errors += file_stats.errors;
        self.stats.processing_time += file_stats.processing_time;
        self.stats
            .parse_errors
            .extend(file_stats.parse_errors.iter().cloned());
        for timestamp in [file_stats.earliest_timestamp, file_stats.latest_timestamp]
            .into_iter()
            .flatten()
        {
            self.stats.update_timestamp_range(timestamp);
        }

        file_stats
    }
}
