//! Logger component.
//!
//! A leveled logger that stacks key/value metadata onto its entries while
//! staying immutable: `with` returns a new logger whose metadata list points
//! back at its parent's, the parent is never modified.
//!
//! Output goes to an explicitly provided `Printer`. The default one forwards
//! to `tracing`; `WriterPrinter` writes plain lines to any `io::Write`.

use std::collections::HashSet;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::registry::{init, Component, Configurable, InitError, Mutator};

/// Verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(text)
    }
}

/// Destination of log entries.
pub trait Printer: Send + Sync {
    fn print(&self, level: Level, message: &str, meta: &[(String, String)]);
}

fn join_meta(meta: &[(String, String)]) -> String {
    meta.iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Forwards entries to `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPrinter;

impl Printer for TracingPrinter {
    fn print(&self, level: Level, message: &str, meta: &[(String, String)]) {
        let meta = join_meta(meta);
        match level {
            Level::Debug => tracing::debug!(meta = %meta, "{message}"),
            Level::Info => tracing::info!(meta = %meta, "{message}"),
            Level::Warning => tracing::warn!(meta = %meta, "{message}"),
            Level::Error => tracing::error!(meta = %meta, "{message}"),
        }
    }
}

/// Writes one line per entry: `LEVEL message\tkey=value ...`.
pub struct WriterPrinter<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Printer for WriterPrinter<W> {
    fn print(&self, level: Level, message: &str, meta: &[(String, String)]) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let result = if meta.is_empty() {
            writeln!(out, "{level} {message}")
        } else {
            writeln!(out, "{level} {message}\t{}", join_meta(meta))
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to write log entry");
        }
    }
}

// Backward-linked list: each node owns a reference to the older entries.
struct Entry {
    name: String,
    value: String,
    prev: Option<Arc<Entry>>,
}

/// Immutable metadata attached to a logger.
#[derive(Clone, Default)]
pub struct Meta {
    head: Option<Arc<Entry>>,
}

impl Meta {
    /// A new list with `name` set to `value`; `self` is unchanged.
    pub fn with(&self, name: impl Into<String>, value: impl fmt::Display) -> Meta {
        Meta {
            head: Some(Arc::new(Entry {
                name: name.into(),
                value: value.to_string(),
                prev: self.head.clone(),
            })),
        }
    }

    /// Effective fields, newest value per name, oldest name first.
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        let mut cursor = self.head.as_deref();
        while let Some(entry) = cursor {
            if seen.insert(entry.name.as_str()) {
                fields.push((entry.name.clone(), entry.value.clone()));
            }
            cursor = entry.prev.as_deref();
        }
        fields.reverse();
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.fields()).finish()
    }
}

/// Leveled logger with stacked metadata.
#[derive(Clone)]
pub struct Logger {
    level: Level,
    printer: Arc<dyn Printer>,
    meta: Meta,
}

impl Configurable for Logger {
    fn defaults(&mut self) {
        self.level = Level::Debug;
        self.printer = Arc::new(TracingPrinter);
    }
}

impl Component for Logger {}

impl Logger {
    pub fn new(mutators: &[Mutator]) -> Result<Self, InitError> {
        let mut logger = Self {
            level: Level::Debug,
            printer: Arc::new(TracingPrinter),
            meta: Meta::default(),
        };
        init(&mut logger, mutators)?;
        Ok(logger)
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// A copy of this logger carrying one more metadata field.
    pub fn with(&self, name: impl Into<String>, value: impl fmt::Display) -> Logger {
        Logger {
            level: self.level,
            printer: Arc::clone(&self.printer),
            meta: self.meta.with(name, value),
        }
    }

    pub fn log(&self, level: Level, message: impl fmt::Display) {
        if level < self.level {
            return;
        }
        self.printer
            .print(level, &message.to_string(), &self.meta.fields());
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(Level::Debug, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(Level::Info, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(Level::Warning, message);
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(Level::Error, message);
    }
}

/// A logger prints into its own printer, below its own level filter and metadata.
impl Printer for Logger {
    fn print(&self, level: Level, message: &str, meta: &[(String, String)]) {
        if level < self.level {
            return;
        }
        let mut merged = self.meta.clone();
        for (key, value) in meta {
            merged = merged.with(key.clone(), value);
        }
        self.printer.print(level, message, &merged.fields());
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("meta", &self.meta)
            .finish()
    }
}

/// Minimum level printed. Defaults to Debug.
pub fn with_level(level: Level) -> Mutator {
    Mutator::new(move |l: &mut Logger| {
        l.level = level;
        Ok(())
    })
}

/// Destination of the entries. Defaults to `TracingPrinter`.
pub fn with_printer(printer: Arc<dyn Printer>) -> Mutator {
    Mutator::new(move |l: &mut Logger| {
        l.printer = Arc::clone(&printer);
        Ok(())
    })
}
