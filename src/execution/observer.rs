use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Events emitted while filtering rows and computing pivots.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    /// A filtering pass over `row_count` rows began.
    RunStarted { row_count: usize },
    ThrottleWaited { duration: Duration },
    ChunkStarted { start_row: usize, row_count: usize },
    ChunkFinished { output_rows: usize },
    RunFinished {
        elapsed: Duration,
        metrics: ExecutionMetricsSnapshot,
    },
    /// A pivot request passed validation and is about to touch rows.
    PivotStarted {
        rows: Vec<String>,
        cols: Vec<String>,
        aggs: Vec<String>,
    },
    /// A pivot finished; `input_rows` passed the filters, the result has the given shape.
    PivotFinished {
        input_rows: usize,
        result_rows: usize,
        result_cols: usize,
        elapsed: Duration,
    },
}

impl fmt::Display for ExecutionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionEvent::RunStarted { row_count } => write!(f, "filter started rows={row_count}"),
            ExecutionEvent::ThrottleWaited { duration } => {
                write!(f, "throttled for {duration:?}")
            }
            ExecutionEvent::ChunkStarted {
                start_row,
                row_count,
            } => write!(f, "chunk started at row {start_row} ({row_count} rows)"),
            ExecutionEvent::ChunkFinished { output_rows } => {
                write!(f, "chunk finished, {output_rows} rows kept")
            }
            ExecutionEvent::RunFinished { elapsed, metrics } => {
                write!(f, "filter finished in {elapsed:?}: {metrics}")
            }
            ExecutionEvent::PivotStarted { rows, cols, aggs } => {
                write!(f, "pivot started rows={rows:?} cols={cols:?} aggs={aggs:?}")
            }
            ExecutionEvent::PivotFinished {
                input_rows,
                result_rows,
                result_cols,
                elapsed,
            } => write!(
                f,
                "pivot finished in {elapsed:?}: {input_rows} input rows -> {result_rows}x{result_cols}"
            ),
        }
    }
}

/// Observer hook for execution events.
pub trait ExecutionObserver: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// Logs every event as one line on stderr.
#[derive(Debug, Default)]
pub struct StdErrExecutionObserver;

impl ExecutionObserver for StdErrExecutionObserver {
    fn on_event(&self, event: &ExecutionEvent) {
        eprintln!("[pivot-broker] {event}");
    }
}

/// Live counters for the current filtering run.
///
/// The engine updates these while it works; callers can snapshot them at any time.
#[derive(Debug)]
pub struct ExecutionMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    rows_processed: AtomicU64,
    rows_accepted: AtomicU64,
    chunks_started: AtomicU64,
    chunks_finished: AtomicU64,
    throttle_wait_ns: AtomicU64,

    active_chunks: AtomicUsize,
    max_active_chunks: AtomicUsize,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            rows_processed: AtomicU64::new(0),
            rows_accepted: AtomicU64::new(0),
            chunks_started: AtomicU64::new(0),
            chunks_finished: AtomicU64::new(0),
            throttle_wait_ns: AtomicU64::new(0),
            active_chunks: AtomicUsize::new(0),
            max_active_chunks: AtomicUsize::new(0),
        }
    }

    /// Reset per-run counters and bump the run id.
    pub fn begin_run(&self) {
        self.run_id.fetch_add(1, Ordering::SeqCst);
        for counter in [
            &self.elapsed_ns,
            &self.rows_processed,
            &self.rows_accepted,
            &self.chunks_started,
            &self.chunks_finished,
            &self.throttle_wait_ns,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
        self.active_chunks.store(0, Ordering::SeqCst);
        self.max_active_chunks.store(0, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns.store(saturating_nanos(elapsed), Ordering::SeqCst);
    }

    pub fn on_rows(&self, processed: usize, accepted: usize) {
        self.rows_processed.fetch_add(processed as u64, Ordering::SeqCst);
        self.rows_accepted.fetch_add(accepted as u64, Ordering::SeqCst);
    }

    pub fn on_chunk_start(&self) {
        self.chunks_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_chunks.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_chunks.fetch_max(now, Ordering::SeqCst);
    }

    pub fn on_chunk_end(&self) {
        self.chunks_finished.fetch_add(1, Ordering::SeqCst);
        self.active_chunks.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_throttle_wait(&self, d: Duration) {
        self.throttle_wait_ns
            .fetch_add(saturating_nanos(d), Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ExecutionMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        ExecutionMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed: (elapsed_ns > 0).then(|| Duration::from_nanos(elapsed_ns)),
            rows_processed: self.rows_processed.load(Ordering::SeqCst),
            rows_accepted: self.rows_accepted.load(Ordering::SeqCst),
            chunks_started: self.chunks_started.load(Ordering::SeqCst),
            chunks_finished: self.chunks_finished.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            max_active_chunks: self.max_active_chunks.load(Ordering::SeqCst),
        }
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn saturating_nanos(d: Duration) -> u64 {
    d.as_nanos().min(u64::MAX as u128) as u64
}

/// Immutable snapshot of [`ExecutionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub rows_processed: u64,
    pub rows_accepted: u64,
    pub chunks_started: u64,
    pub chunks_finished: u64,
    pub throttle_wait: Duration,
    pub max_active_chunks: usize,
}

impl fmt::Display for ExecutionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, rows={}/{} kept, chunks={}/{}, max_active_chunks={}, throttle_wait={:?}",
            self.run_id,
            self.rows_accepted,
            self.rows_processed,
            self.chunks_finished,
            self.chunks_started,
            self.max_active_chunks,
            self.throttle_wait,
        )
    }
}
