//! Hooks for reporting how table loading went.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::IngestionError;

use super::unified::IngestionFormat;

/// Severity of an ingestion failure, used for alert thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    Info,
    /// Non-fatal.
    Warning,
    /// The input could not be turned into a table (bad header, unparsable cell, ...).
    Error,
    /// The input could not be read at all.
    Critical,
}

impl IngestionSeverity {
    pub(crate) fn of(error: &IngestionError) -> Self {
        match error {
            IngestionError::Io(_) => IngestionSeverity::Critical,
            IngestionError::Csv(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => {
                IngestionSeverity::Critical
            }
            IngestionError::Csv(_)
            | IngestionError::SchemaMismatch { .. }
            | IngestionError::ParseError { .. } => IngestionSeverity::Error,
        }
    }
}

/// What was being loaded.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    pub path: PathBuf,
    /// `None` when no format could be resolved for the path.
    pub format: Option<IngestionFormat>,
    /// The schema was inferred from the data rather than supplied.
    pub inferred_schema: bool,
}

impl fmt::Display for IngestionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            Some(format) => write!(f, "format={format:?}")?,
            None => f.write_str("format=unknown")?,
        }
        write!(f, " path={}", self.path.display())?;
        if self.inferred_schema {
            f.write_str(" schema=inferred")?;
        }
        Ok(())
    }
}

/// Shape of a successfully loaded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    pub rows: usize,
    pub columns: usize,
}

/// Receives the outcome of every load.
pub trait IngestionObserver: Send + Sync {
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called in addition to `on_failure` when the severity meets the configured threshold.
    ///
    /// Defaults to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Forwards every callback to each inner observer, in order.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }

    pub fn push(&mut self, observer: Arc<dyn IngestionObserver>) {
        self.observers.push(observer);
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.observers.iter().for_each(|o| o.on_success(ctx, stats));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.observers
            .iter()
            .for_each(|o| o.on_failure(ctx, severity, error));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.observers
            .iter()
            .for_each(|o| o.on_alert(ctx, severity, error));
    }
}

fn success_line(ctx: &IngestionContext, stats: IngestionStats) -> String {
    format!("loaded {ctx} rows={} columns={}", stats.rows, stats.columns)
}

fn failure_line(tag: &str, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) -> String {
    format!("{tag} severity={severity:?} {ctx} err={error}")
}

/// Logs loads to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl IngestionObserver for StdErrObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        eprintln!("[pivot-broker][ingest] {}", success_line(ctx, stats));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        eprintln!("[pivot-broker][ingest] {}", failure_line("failed", ctx, severity, error));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        eprintln!("[pivot-broker][ingest] {}", failure_line("ALERT", ctx, severity, error));
    }
}

/// Appends one line per load to a log file.
///
/// Logging is best effort: a log file that cannot be opened or written is skipped silently.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append(&self, line: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(file, "{ts} {line}");
        }
    }
}

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append(&success_line(ctx, stats));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append(&failure_line("failed", ctx, severity, error));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append(&failure_line("ALERT", ctx, severity, error));
    }
}
