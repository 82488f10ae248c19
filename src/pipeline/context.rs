use std::time::Duration;

/// Parse error details for deferred reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseErrorInfo {
    pub line_number: u64,
    pub format_name: String,
    pub error: String,
}

/// Runtime statistics of one pipeline run
#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    /// Total input lines, including unparseable ones
    pub lines_seen: u64,
    /// Events handed to the procedure, end-of-stream excluded
    pub events_processed: u64,
    pub errors: u64,
    pub parse_errors: Vec<ParseErrorInfo>,
    pub processing_time: Duration,
    pub earliest_timestamp: Option<i64>,
    pub latest_timestamp: Option<i64>,
}

impl ProcessingStats {
    /// Widens the observed timestamp range
    pub fn update_timestamp_range(&mut self, timestamp: i64) {
        self.earliest_timestamp = Some(
            self.earliest_timestamp
                .map_or(timestamp, |earliest| earliest.min(timestamp)),
        );
        self.latest_timestamp = Some(
            self.latest_timestamp
                .map_or(timestamp, |latest| latest.max(timestamp)),
        );
    }

    /// Events per second, when any time elapsed
    pub fn rate(&self) -> Option<f64> {
        let secs = self.processing_time.as_secs_f64();
        (secs > 0.0).then(|| self.events_processed as f64 / secs)
    }
}
