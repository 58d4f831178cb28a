//! Line-oriented trace output.
//!
//! A [`TraceObserver`] writes one line per event to any writer, either in the
//! human-readable form
//!
//! ```text
//! enter Widget#build([0])
//! exit_exception Widget#build([0])
//! ```
//!
//! or as one JSON object per line.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use minstrel_core::{CallError, CallResult};
use minstrel_intercept::{CallEvent, Observer};

use crate::events::RecordedEvent;

/// Output format of a trace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceFormat {
    /// `kind Type#method(args)`
    #[default]
    Human,
    /// One JSON object per event.
    Json,
}

impl FromStr for TraceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(TraceFormat::Human),
            "json" => Ok(TraceFormat::Json),
            other => Err(format!("unknown trace format '{other}' (expected human or json)")),
        }
    }
}

impl fmt::Display for TraceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceFormat::Human => f.write_str("human"),
            TraceFormat::Json => f.write_str("json"),
        }
    }
}

/// Format an event as a human-readable trace line, without a newline.
pub fn format_line(event: &CallEvent<'_>) -> String {
    format!(
        "{} {}#{}({})",
        event.kind, event.type_name, event.method, event.args
    )
}

/// An observer that writes a trace line per event.
///
/// Writes are serialised; lines from concurrent calls never interleave.
pub struct TraceObserver<W: Write + Send> {
    writer: Mutex<W>,
    format: TraceFormat,
}

impl TraceObserver<io::Stderr> {
    /// Trace to standard error.
    pub fn stderr(format: TraceFormat) -> Self {
        Self::new(io::stderr(), format)
    }
}

impl<W: Write + Send> TraceObserver<W> {
    /// Trace to `writer`.
    pub fn new(writer: W, format: TraceFormat) -> Self {
        Self {
            writer: Mutex::new(writer),
            format,
        }
    }

    /// The output format.
    pub fn format(&self) -> TraceFormat {
        self.format
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn render(&self, event: &CallEvent<'_>) -> CallResult<String> {
        match self.format {
            TraceFormat::Human => Ok(format_line(event)),
            TraceFormat::Json => serde_json::to_string(&RecordedEvent::from(event))
                .map_err(|e| CallError::Observer(format!("trace encoding failed: {e}"))),
        }
    }
}

impl<W: Write + Send> Observer for TraceObserver<W> {
    fn observe(&self, event: &CallEvent<'_>) -> CallResult<()> {
        let line = self.render(event)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{line}")
            .and_then(|()| writer.flush())
            .map_err(|e| CallError::Observer(format!("trace write failed: {e}")))
    }
}

impl<W: Write + Send> fmt::Debug for TraceObserver<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceObserver")
            .field("format", &self.format)
            .finish()
    }
}
