use crate::event::Event;
use std::fmt;

/// Decides when a header line is owed, independently of how it is formatted
pub trait HeaderOutputStrategy: fmt::Debug + Send {
    fn should_display_header(&self, event: &dyn Event) -> bool;

    /// Called after a header line was written for `event`
    fn header_displayed(&mut self, event: &dyn Event);
}

/// Owes exactly one header for the lifetime of the strategy, until reset
#[derive(Debug, Clone)]
pub struct DefaultHeaderOutputStrategy {
    header_owed: bool,
}

impl Default for DefaultHeaderOutputStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultHeaderOutputStrategy {
    pub fn new() -> Self {
        DefaultHeaderOutputStrategy { header_owed: true }
    }

    /// Owe a header again
    pub fn reset(&mut self) {
        self.header_owed = true;
    }
}

impl HeaderOutputStrategy for DefaultHeaderOutputStrategy {
    fn should_display_header(&self, _event: &dyn Event) -> bool {
        self.header_owed
    }

    fn header_displayed(&mut self, _event: &dyn Event) {
        self.header_owed = false;
    }
}

/// Never owes a header
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHeaderOutputStrategy;

impl HeaderOutputStrategy for NoHeaderOutputStrategy {
    fn should_display_header(&self, _event: &dyn Event) -> bool {
        false
    }

    fn header_displayed(&mut self, _event: &dyn Event) {}
}
