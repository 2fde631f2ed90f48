//! Event sink for progress and diagnostic reporting
//!
//! Core conversion logic never writes to the console directly; everything is
//! routed through an [`EventSink`] so library callers can capture or redirect
//! diagnostics.

use std::error::Error;
use std::sync::Mutex;

use colored::Colorize;

/// Receiver for conversion progress and diagnostics.
///
/// Events are informational only; they never influence control flow.
pub trait EventSink {
    /// Normal progress messages ("Writing stored procedure x")
    fn status(&self, message: &str);

    /// Recoverable problems (missing file, malformed map row)
    fn warning(&self, message: &str);

    /// Fatal problems, with the underlying error when one exists
    fn error(&self, message: &str, source: Option<&(dyn Error + 'static)>);

    /// Verbose-only diagnostics (rewritten name-map blocks)
    fn debug(&self, message: &str);
}

/// Console implementation: status/debug to stdout, warnings/errors to stderr.
pub struct ConsoleSink {
    show_debug: bool,
}

impl ConsoleSink {
    pub fn new(show_debug: bool) -> Self {
        Self { show_debug }
    }
}

impl EventSink for ConsoleSink {
    fn status(&self, message: &str) {
        println!("{message}");
    }

    fn warning(&self, message: &str) {
        eprintln!("{}", format!("Warning: {message}").yellow());
    }

    fn error(&self, message: &str, source: Option<&(dyn Error + 'static)>) {
        eprintln!("{}", format!("Error: {message}").red());
        if let Some(cause) = source {
            eprintln!("{}", format!("  caused by: {cause}").red());
        }
    }

    fn debug(&self, message: &str) {
        if self.show_debug {
            println!("{}", message.dimmed());
        }
    }
}

/// Event severity recorded by [`CollectingSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Status,
    Warning,
    Error,
    Debug,
}

/// Sink that records events in memory, for tests and embedding.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<(Severity, String)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, in order.
    pub fn events(&self) -> Vec<(Severity, String)> {
        self.events.lock().unwrap().clone()
    }

    /// Messages recorded at the given severity.
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn record(&self, severity: Severity, message: &str) {
        self.events
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
}

impl EventSink for CollectingSink {
    fn status(&self, message: &str) {
        self.record(Severity::Status, message);
    }

    fn warning(&self, message: &str) {
        self.record(Severity::Warning, message);
    }

    fn error(&self, message: &str, source: Option<&(dyn Error + 'static)>) {
        match source {
            Some(cause) => self.record(Severity::Error, &format!("{message}: {cause}")),
            None => self.record(Severity::Error, message),
        }
    }

    fn debug(&self, message: &str) {
        self.record(Severity::Debug, message);
    }
}
