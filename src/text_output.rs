use crate::error::{ProcedureError, UsageError};
use crate::procedure::Procedure;
use std::fmt::{self, Display};
use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Rendering of an absent value
pub const NULL: &str = "null";

pub type Sink = Box<dyn Write + Send>;

/// Line-oriented text emission over a replaceable sink.
///
/// Every primitive flushes before returning so that lines written for the
/// same event reach the sink in order.
pub struct TextOutput {
    owner: String,
    writer: Option<BufWriter<Sink>>,
}

impl TextOutput {
    /// An output with no sink installed. `owner` names the component in
    /// error messages.
    pub fn new(owner: impl Into<String>) -> Self {
        TextOutput {
            owner: owner.into(),
            writer: None,
        }
    }

    pub fn with_sink(owner: impl Into<String>, sink: Sink) -> Self {
        let mut output = TextOutput::new(owner);
        output.set_output_stream(sink);
        output
    }

    /// Installs `sink`, flushing and releasing the previous one. A failure to
    /// flush the previous sink is logged and otherwise ignored.
    pub fn set_output_stream(&mut self, sink: Sink) {
        if let Some(mut previous) = self.writer.take() {
            if let Err(e) = previous.flush() {
                warn!(owner = %self.owner, error = %e, "failed to close the current writer");
            }
        }
        self.writer = Some(BufWriter::new(sink));
    }

    pub fn output_stream(&self) -> Option<&(dyn Write + Send)> {
        self.writer.as_ref().map(|w| w.get_ref().as_ref())
    }

    pub fn is_initialized(&self) -> bool {
        self.writer.is_some()
    }

    fn writer(&mut self) -> Result<&mut BufWriter<Sink>, UsageError> {
        let owner = &self.owner;
        self.writer.as_mut().ok_or_else(|| UsageError::NotInitialized {
            component: owner.clone(),
            missing: "no output stream",
        })
    }

    pub fn print(&mut self, value: impl Display) -> Result<(), ProcedureError> {
        let w = self.writer()?;
        write!(w, "{}", value)?;
        w.flush()?;
        Ok(())
    }

    pub fn println(&mut self, value: impl Display) -> Result<(), ProcedureError> {
        let w = self.writer()?;
        writeln!(w, "{}", value)?;
        w.flush()?;
        Ok(())
    }

    /// Like `println`, rendering an absent value as `null`
    pub fn println_or_null<T: Display>(&mut self, value: Option<T>) -> Result<(), ProcedureError> {
        match value {
            Some(v) => self.println(v),
            None => self.println(NULL),
        }
    }

    pub fn newline(&mut self) -> Result<(), ProcedureError> {
        let w = self.writer()?;
        writeln!(w)?;
        w.flush()?;
        Ok(())
    }

    pub fn printf(&mut self, args: fmt::Arguments<'_>) -> Result<(), ProcedureError> {
        let w = self.writer()?;
        w.write_fmt(args)?;
        w.flush()?;
        Ok(())
    }
}

impl fmt::Debug for TextOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextOutput")
            .field("owner", &self.owner)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// A procedure that writes text to a sink it owns
pub trait TextOutputProcedure: Procedure {
    fn text_output(&self) -> &TextOutput;

    fn text_output_mut(&mut self) -> &mut TextOutput;

    fn set_output_stream(&mut self, sink: Sink) {
        self.text_output_mut().set_output_stream(sink);
    }

    /// `None` until a sink is installed
    fn output_stream(&self) -> Option<&(dyn Write + Send)> {
        self.text_output().output_stream()
    }
}

/// A cloneable in-memory sink; clones share the same buffer, so one clone can
/// be installed in a procedure while another reads back what was written.
#[derive(Debug, Clone, Default)]
pub struct MemorySink(Arc<Mutex<Vec<u8>>>);

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    pub fn boxed(&self) -> Sink {
        Box::new(self.clone())
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
